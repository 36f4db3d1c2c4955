use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use log::info;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::accounts::NewAccount;
use crate::banks::NewBank;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{Ledger, DATE_FORMAT};
use crate::users::NewUser;
use crate::validation::validate_account_fields;

/// `users.csv`: `Name,Birth_day[,Accounts]`. The `Accounts` column, if
/// present, is ignored; ownership lives on `Account.User_id`.
#[derive(Debug, Deserialize)]
struct UserCsvRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Birth_day", default)]
    birth_day: Option<String>,
}

/// `banks.csv`: `Id,Bank`.
#[derive(Debug, Deserialize)]
struct BankCsvRow {
    #[serde(rename = "Id")]
    id: Option<i64>,
    #[serde(rename = "Bank")]
    name: String,
}

/// `accounts.csv`: `User_id,Type,Account Number,Bank_id,Currency,Amount,Status`.
#[derive(Debug, Deserialize)]
struct AccountCsvRow {
    #[serde(rename = "User_id")]
    user_id: i64,
    #[serde(rename = "Type")]
    account_type: String,
    #[serde(rename = "Account Number")]
    account_number: String,
    #[serde(rename = "Bank_id")]
    bank_id: i64,
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Amount")]
    amount: Decimal,
    #[serde(rename = "Status")]
    status: String,
}

fn read_rows<R, T>(reader: R) -> LedgerResult<Vec<T>>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result?;
        rows.push(record);
    }
    Ok(rows)
}

fn parse_birth_day(raw: Option<&str>) -> LedgerResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Some)
            .map_err(|e| LedgerError::validation(format!("bad birth day '{text}': {e}"))),
    }
}

pub fn add_users_from_reader<R: Read>(ledger: &mut Ledger, reader: R) -> LedgerResult<Vec<i64>> {
    let users = read_rows::<_, UserCsvRow>(reader)?
        .into_iter()
        .map(|row| {
            Ok(NewUser::new(
                row.name,
                parse_birth_day(row.birth_day.as_deref())?,
            ))
        })
        .collect::<LedgerResult<Vec<_>>>()?;
    ledger.add_users(&users)
}

pub fn add_banks_from_reader<R: Read>(ledger: &mut Ledger, reader: R) -> LedgerResult<Vec<i64>> {
    let banks: Vec<NewBank> = read_rows::<_, BankCsvRow>(reader)?
        .into_iter()
        .map(|row| NewBank::new(row.id, row.name))
        .collect();
    ledger.add_banks(&banks)
}

pub fn add_accounts_from_reader<R: Read>(ledger: &mut Ledger, reader: R) -> LedgerResult<Vec<i64>> {
    let accounts = read_rows::<_, AccountCsvRow>(reader)?
        .into_iter()
        .map(|row| {
            let (account_type, status) = validate_account_fields(&row.account_type, &row.status)?;
            Ok(NewAccount {
                user_id: row.user_id,
                account_type,
                account_number: row.account_number,
                bank_id: row.bank_id,
                currency: row.currency,
                amount: row.amount,
                status,
            })
        })
        .collect::<LedgerResult<Vec<_>>>()?;
    ledger.add_accounts(&accounts)
}

pub fn add_users_from_csv<P: AsRef<Path>>(ledger: &mut Ledger, path: P) -> LedgerResult<Vec<i64>> {
    info!("loading users from {}", path.as_ref().display());
    add_users_from_reader(ledger, File::open(path)?)
}

pub fn add_banks_from_csv<P: AsRef<Path>>(ledger: &mut Ledger, path: P) -> LedgerResult<Vec<i64>> {
    info!("loading banks from {}", path.as_ref().display());
    add_banks_from_reader(ledger, File::open(path)?)
}

pub fn add_accounts_from_csv<P: AsRef<Path>>(
    ledger: &mut Ledger,
    path: P,
) -> LedgerResult<Vec<i64>> {
    info!("loading accounts from {}", path.as_ref().display());
    add_accounts_from_reader(ledger, File::open(path)?)
}
