use std::fmt;
use std::str::FromStr;

use log::info;
use rusqlite::types::{Type, Value};
use rusqlite::{named_params, params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::storage::{self, decimal_column, Ledger};
use crate::validation::validate_account_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Credit,
    Debit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Credit => "credit",
            AccountType::Debit => "debit",
        }
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "credit" => Ok(AccountType::Credit),
            "debit" => Ok(AccountType::Debit),
            other => Err(LedgerError::validation(format!(
                "not allowed value '{other}' for field 'Type'"
            ))),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Gold,
    Silver,
    Platinum,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Gold => "gold",
            AccountStatus::Silver => "silver",
            AccountStatus::Platinum => "platinum",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gold" => Ok(AccountStatus::Gold),
            "silver" => Ok(AccountStatus::Silver),
            "platinum" => Ok(AccountStatus::Platinum),
            other => Err(LedgerError::validation(format!(
                "not allowed value '{other}' for field 'Status'"
            ))),
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the `Account` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub account_type: AccountType,
    pub account_number: String,
    pub bank_id: i64,
    pub currency: String,
    pub amount: Decimal,
    pub status: AccountStatus,
}

/// Input for [`Ledger::add_accounts`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub user_id: i64,
    pub account_type: AccountType,
    pub account_number: String,
    pub bank_id: i64,
    pub currency: String,
    pub amount: Decimal,
    pub status: AccountStatus,
}

/// One column change for [`Ledger::modify_account`].
#[derive(Debug, Clone, PartialEq)]
pub enum AccountUpdate {
    UserId(i64),
    Type(AccountType),
    AccountNumber(String),
    BankId(i64),
    Currency(String),
    Amount(Decimal),
    Status(AccountStatus),
}

impl AccountUpdate {
    fn assignment(&self) -> LedgerResult<(&'static str, Value)> {
        Ok(match self {
            AccountUpdate::UserId(id) => ("User_id", Value::Integer(*id)),
            AccountUpdate::Type(kind) => ("Type", Value::Text(kind.as_str().to_string())),
            AccountUpdate::AccountNumber(number) => (
                "Account_Number",
                Value::Text(validate_account_number(number)?),
            ),
            AccountUpdate::BankId(id) => ("Bank_id", Value::Integer(*id)),
            AccountUpdate::Currency(code) => ("Currency", Value::Text(normalize_currency(code)?)),
            AccountUpdate::Amount(amount) => ("Amount", Value::Text(amount.to_string())),
            AccountUpdate::Status(status) => ("Status", Value::Text(status.as_str().to_string())),
        })
    }
}

pub(crate) const ACCOUNT_COLUMNS: &str =
    "Id, User_id, Type, Account_Number, Bank_id, Currency, Amount, Status";

impl Account {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get(2)?;
        let status: String = row.get(7)?;
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            account_type: kind.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
            })?,
            account_number: row.get(3)?,
            bank_id: row.get(4)?,
            currency: row.get(5)?,
            amount: decimal_column(row, 6)?,
            status: status.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e))
            })?,
        })
    }
}

/// Uppercased three-letter ISO code.
pub fn normalize_currency(code: &str) -> LedgerResult<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(LedgerError::validation(format!(
            "currency '{code}' is not a three-letter code"
        )));
    }
    Ok(code)
}

pub(crate) fn find_by_number(
    conn: &Connection,
    account_number: &str,
) -> LedgerResult<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM Account WHERE Account_Number = ?1"),
            params![account_number],
            Account::from_row,
        )
        .optional()?;
    Ok(account)
}

pub(crate) fn set_amount(conn: &Connection, id: i64, amount: Decimal) -> LedgerResult<()> {
    storage::update_by_id(
        conn,
        "Account",
        "Account",
        id,
        vec![("Amount", Value::Text(amount.to_string()))],
    )
}

pub(crate) fn delete_orphans(conn: &Connection) -> LedgerResult<usize> {
    let rows = conn.execute(
        "DELETE FROM Account WHERE User_id NOT IN (SELECT Id FROM User)",
        [],
    )?;
    info!("{rows} account(s) without an owner deleted");
    Ok(rows)
}

impl Ledger {
    /// Inserts all accounts or none. Numbers and currencies are checked
    /// before the first insert; returns the new row ids.
    pub fn add_accounts(&mut self, accounts: &[NewAccount]) -> LedgerResult<Vec<i64>> {
        let checked = accounts
            .iter()
            .map(|account| {
                Ok((
                    account,
                    validate_account_number(&account.account_number)?,
                    normalize_currency(&account.currency)?,
                ))
            })
            .collect::<LedgerResult<Vec<_>>>()?;

        let ids = self.unit_of_work(|tx| {
            let mut stmt = tx.prepare(
                "INSERT INTO Account
                     (User_id, Type, Account_Number, Bank_id, Currency, Amount, Status)
                 VALUES (:user_id, :type, :number, :bank_id, :currency, :amount, :status)",
            )?;
            let mut ids = Vec::with_capacity(checked.len());
            for (account, number, currency) in &checked {
                stmt.execute(named_params! {
                    ":user_id": account.user_id,
                    ":type": account.account_type.as_str(),
                    ":number": number,
                    ":bank_id": account.bank_id,
                    ":currency": currency,
                    ":amount": account.amount.to_string(),
                    ":status": account.status.as_str(),
                })?;
                ids.push(tx.last_insert_rowid());
            }
            Ok(ids)
        })?;

        info!("{} account(s) added successfully", ids.len());
        Ok(ids)
    }

    pub fn modify_account(&mut self, id: i64, updates: &[AccountUpdate]) -> LedgerResult<()> {
        let assignments = updates
            .iter()
            .map(AccountUpdate::assignment)
            .collect::<LedgerResult<Vec<_>>>()?;
        self.unit_of_work(|tx| storage::update_by_id(tx, "Account", "Account", id, assignments))
    }

    pub fn delete_account(&mut self, id: i64) -> LedgerResult<()> {
        self.unit_of_work(|tx| storage::delete_by_id(tx, "Account", "Account", id))
    }

    /// Removes accounts whose `User_id` no longer exists in `User`.
    pub fn delete_orphan_accounts(&mut self) -> LedgerResult<usize> {
        self.unit_of_work(|tx| delete_orphans(tx))
    }

    pub fn account(&self, id: i64) -> LedgerResult<Account> {
        self.conn()
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM Account WHERE Id = ?1"),
                params![id],
                Account::from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("Account", id))
    }

    pub fn account_by_number(&self, account_number: &str) -> LedgerResult<Account> {
        find_by_number(self.conn(), account_number)?
            .ok_or_else(|| LedgerError::not_found("Account", account_number))
    }

    pub fn accounts(&self) -> LedgerResult<Vec<Account>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM Account ORDER BY Id"))?;
        let accounts = stmt
            .query_map([], Account::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    pub fn accounts_of_user(&self, user_id: i64) -> LedgerResult<Vec<Account>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM Account WHERE User_id = ?1 ORDER BY Id"
        ))?;
        let accounts = stmt
            .query_map(params![user_id], Account::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }
}
