//! Input checks that run before anything touches the database.

use log::info;

use crate::accounts::{AccountStatus, AccountType};
use crate::error::{LedgerError, LedgerResult};

pub const ACCOUNT_NUMBER_LEN: usize = 18;
pub const ACCOUNT_NUMBER_PREFIX: &str = "ID--";

/// Drops everything but ASCII letters and whitespace, then splits on whitespace.
///
/// Apostrophes and hyphens are removed rather than kept, so
/// `"John  O'Brien-Smith"` becomes `["John", "OBrienSmith"]`.
pub fn valid_full_name(full_name: &str) -> Vec<String> {
    let cleaned: String = full_name
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// First cleaned part is the name, the remaining parts form the surname.
/// A missing part comes back empty.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = valid_full_name(full_name).into_iter();
    let name = parts.next().unwrap_or_default();
    let surname = parts.collect::<Vec<_>>().join(" ");
    (name, surname)
}

/// Checks an account number and returns it normalized.
///
/// `#`, `%`, `_`, `?` and `&` are read as `-`. The result must be exactly
/// 18 characters, start with `ID--` and contain a letter-hyphen-digit run.
pub fn validate_account_number(account_number: &str) -> LedgerResult<String> {
    let normalized: String = account_number
        .chars()
        .map(|c| match c {
            '#' | '%' | '_' | '?' | '&' => '-',
            other => other,
        })
        .collect();

    let len = normalized.chars().count();
    if len > ACCOUNT_NUMBER_LEN {
        return Err(LedgerError::validation(format!(
            "account number '{normalized}' has too many chars ({len} > {ACCOUNT_NUMBER_LEN})"
        )));
    }
    if len < ACCOUNT_NUMBER_LEN {
        return Err(LedgerError::validation(format!(
            "account number '{normalized}' has too few chars ({len} < {ACCOUNT_NUMBER_LEN})"
        )));
    }

    if !normalized.starts_with(ACCOUNT_NUMBER_PREFIX) {
        return Err(LedgerError::validation(format!(
            "account number '{normalized}' should start with '{ACCOUNT_NUMBER_PREFIX}'"
        )));
    }

    if !has_letter_digit_segment(&normalized) {
        return Err(LedgerError::validation(format!(
            "account number '{normalized}' has no letters-hyphen-digits segment"
        )));
    }

    info!("account number {normalized} validation successful");
    Ok(normalized)
}

// 1-3 letters, '-', at least one digit. A longer letter run still contains a
// 1-letter match right before the hyphen.
fn has_letter_digit_segment(value: &str) -> bool {
    let chars: Vec<char> = value.chars().collect();
    chars.windows(3).any(|w| {
        w[0].is_ascii_alphabetic() && w[1] == '-' && w[2].is_ascii_digit()
    })
}

/// Parses the `type` / `status` pair into the closed account enums.
pub fn validate_account_fields(
    account_type: &str,
    status: &str,
) -> LedgerResult<(AccountType, AccountStatus)> {
    Ok((account_type.parse()?, status.parse()?))
}
