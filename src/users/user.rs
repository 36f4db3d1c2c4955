use chrono::NaiveDate;
use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::{named_params, params, OptionalExtension, Row};
use serde::Serialize;

use crate::accounts::account::delete_orphans;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{self, date_column, Ledger, DATE_FORMAT};
use crate::validation::split_full_name;

/// A row of the `User` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub birth_day: Option<NaiveDate>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            surname: row.get(2)?,
            birth_day: date_column(row, 3)?,
        })
    }
}

/// Input for [`Ledger::add_users`]. The full name is cleaned and split into
/// name and surname on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub id: Option<i64>,
    pub full_name: String,
    pub birth_day: Option<NaiveDate>,
}

impl NewUser {
    pub fn new(full_name: impl Into<String>, birth_day: Option<NaiveDate>) -> Self {
        Self {
            id: None,
            full_name: full_name.into(),
            birth_day,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserUpdate {
    Name(String),
    Surname(String),
    BirthDay(Option<NaiveDate>),
}

impl UserUpdate {
    fn assignment(&self) -> (&'static str, Value) {
        match self {
            UserUpdate::Name(name) => ("Name", Value::Text(name.clone())),
            UserUpdate::Surname(surname) => ("Surname", Value::Text(surname.clone())),
            UserUpdate::BirthDay(Some(day)) => {
                ("Birth_day", Value::Text(day.format(DATE_FORMAT).to_string()))
            }
            UserUpdate::BirthDay(None) => ("Birth_day", Value::Null),
        }
    }
}

/// Rows removed by [`Ledger::purge_incomplete_records`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub users_removed: usize,
    pub accounts_removed: usize,
}

const USER_COLUMNS: &str = "Id, Name, Surname, Birth_day";

fn delete_incomplete(conn: &rusqlite::Connection) -> LedgerResult<usize> {
    let rows = conn.execute(
        "DELETE FROM User
         WHERE Name IS NULL OR TRIM(Name) = ''
            OR Surname IS NULL OR TRIM(Surname) = ''
            OR Birth_day IS NULL OR TRIM(Birth_day) = ''",
        [],
    )?;
    if rows == 0 {
        info!("no users with missing fields found");
    } else {
        info!("{rows} user(s) with missing fields deleted");
    }
    Ok(rows)
}

impl Ledger {
    /// Inserts all users or none; returns the new row ids.
    pub fn add_users(&mut self, users: &[NewUser]) -> LedgerResult<Vec<i64>> {
        let rows: Vec<(Option<i64>, String, String, Option<String>)> = users
            .iter()
            .map(|user| {
                let (name, surname) = split_full_name(&user.full_name);
                if name.is_empty() {
                    warn!("user '{}' has no usable name", user.full_name);
                }
                (
                    user.id,
                    name,
                    surname,
                    user.birth_day.map(|day| day.format(DATE_FORMAT).to_string()),
                )
            })
            .collect();

        let ids = self.unit_of_work(|tx| {
            let mut stmt = tx.prepare(
                "INSERT INTO User (Id, Name, Surname, Birth_day)
                 VALUES (:id, :name, :surname, :birth_day)",
            )?;
            let mut ids = Vec::with_capacity(rows.len());
            for (id, name, surname, birth_day) in &rows {
                stmt.execute(named_params! {
                    ":id": id,
                    ":name": name,
                    ":surname": surname,
                    ":birth_day": birth_day,
                })?;
                ids.push(tx.last_insert_rowid());
            }
            Ok(ids)
        })?;

        info!("{} user(s) added successfully", ids.len());
        Ok(ids)
    }

    pub fn modify_user(&mut self, id: i64, updates: &[UserUpdate]) -> LedgerResult<()> {
        let assignments = updates.iter().map(UserUpdate::assignment).collect();
        self.unit_of_work(|tx| storage::update_by_id(tx, "User", "User", id, assignments))
    }

    pub fn delete_user(&mut self, id: i64) -> LedgerResult<()> {
        self.unit_of_work(|tx| storage::delete_by_id(tx, "User", "User", id))
    }

    /// Removes users with an empty or missing name, surname or birth day.
    pub fn delete_incomplete_users(&mut self) -> LedgerResult<usize> {
        self.unit_of_work(|tx| delete_incomplete(tx))
    }

    /// Incomplete users first, then the accounts they leave without an owner,
    /// in one transaction.
    pub fn purge_incomplete_records(&mut self) -> LedgerResult<CleanupReport> {
        self.unit_of_work(|tx| {
            let users_removed = delete_incomplete(tx)?;
            let accounts_removed = delete_orphans(tx)?;
            Ok(CleanupReport {
                users_removed,
                accounts_removed,
            })
        })
    }

    pub fn user(&self, id: i64) -> LedgerResult<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM User WHERE Id = ?1"),
                params![id],
                User::from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("User", id))
    }

    pub fn users(&self) -> LedgerResult<Vec<User>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {USER_COLUMNS} FROM User ORDER BY Id"))?;
        let users = stmt
            .query_map([], User::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{AccountStatus, AccountType, NewAccount};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn account_for(user_id: i64, number: &str) -> NewAccount {
        NewAccount {
            user_id,
            account_type: AccountType::Credit,
            account_number: number.to_string(),
            bank_id: 1,
            currency: "USD".to_string(),
            amount: dec!(100),
            status: AccountStatus::Gold,
        }
    }

    #[test]
    fn test_add_users_splits_names() {
        let mut ledger = Ledger::in_memory().unwrap();
        let ids = ledger
            .add_users(&[
                NewUser::new("John  O'Brien-Smith", date(1992, 3, 17)),
                NewUser::new("Jane Babel", date(1984, 7, 10)),
            ])
            .unwrap();

        let john = ledger.user(ids[0]).unwrap();
        assert_eq!(john.name, "John");
        assert_eq!(john.surname, "OBrienSmith");
        assert_eq!(john.birth_day, date(1992, 3, 17));
        assert_eq!(ledger.user(ids[1]).unwrap().full_name(), "Jane Babel");
    }

    #[test]
    fn test_add_users_keeps_explicit_id() {
        let mut ledger = Ledger::in_memory().unwrap();
        let ids = ledger
            .add_users(&[NewUser {
                id: Some(5385),
                full_name: "John O".to_string(),
                birth_day: None,
            }])
            .unwrap();
        assert_eq!(ids, vec![5385]);
        assert_eq!(ledger.user(5385).unwrap().surname, "O");
    }

    #[test]
    fn test_modify_and_delete_user() {
        let mut ledger = Ledger::in_memory().unwrap();
        let ids = ledger
            .add_users(&[NewUser::new("Jane Babel", date(1984, 7, 10))])
            .unwrap();

        ledger
            .modify_user(ids[0], &[UserUpdate::Name("Bob".to_string())])
            .unwrap();
        assert_eq!(ledger.user(ids[0]).unwrap().name, "Bob");

        ledger.delete_user(ids[0]).unwrap();
        assert!(ledger.users().unwrap().is_empty());
        assert!(ledger.delete_user(ids[0]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_incomplete_users() {
        let mut ledger = Ledger::in_memory().unwrap();
        ledger
            .add_users(&[
                NewUser::new("Complete Person", date(1990, 1, 1)),
                NewUser::new("Nobirthday Person", None),
                NewUser::new("Mononym", date(1990, 1, 1)),
            ])
            .unwrap();

        assert_eq!(ledger.delete_incomplete_users().unwrap(), 2);
        let remaining = ledger.users().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "Complete");
        assert_eq!(ledger.delete_incomplete_users().unwrap(), 0);
    }

    #[test]
    fn test_purge_removes_orphaned_accounts() {
        let mut ledger = Ledger::in_memory().unwrap();
        let ids = ledger
            .add_users(&[
                NewUser::new("Kept Owner", date(1980, 5, 5)),
                NewUser::new("Dropped", date(1985, 5, 5)),
            ])
            .unwrap();
        ledger
            .add_accounts(&[
                account_for(ids[0], "ID--abc-1234567890"),
                account_for(ids[1], "ID--abd-1234567890"),
                account_for(999, "ID--abe-1234567890"),
            ])
            .unwrap();

        let report = ledger.purge_incomplete_records().unwrap();
        assert_eq!(
            report,
            CleanupReport {
                users_removed: 1,
                accounts_removed: 2
            }
        );

        let accounts = ledger.accounts().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].user_id, ids[0]);
    }

    #[test]
    fn test_deleted_owner_leaves_accounts_for_cleanup() {
        let mut ledger = Ledger::in_memory().unwrap();
        let ids = ledger
            .add_users(&[
                NewUser::new("Kept Owner", date(1980, 5, 5)),
                NewUser::new("Gone Owner", date(1985, 5, 5)),
            ])
            .unwrap();
        ledger
            .add_accounts(&[
                account_for(ids[0], "ID--abc-1234567890"),
                account_for(ids[1], "ID--abd-1234567890"),
                account_for(ids[1], "ID--abe-1234567890"),
            ])
            .unwrap();

        ledger.delete_user(ids[1]).unwrap();
        assert_eq!(ledger.accounts_of_user(ids[1]).unwrap().len(), 2);

        let report = ledger.purge_incomplete_records().unwrap();
        assert_eq!(
            report,
            CleanupReport {
                users_removed: 0,
                accounts_removed: 2
            }
        );
        assert_eq!(ledger.accounts().unwrap().len(), 1);
        assert!(ledger.accounts_of_user(ids[1]).unwrap().is_empty());
    }

    #[test]
    fn test_purge_removes_incomplete_owner_of_accounts() {
        let mut ledger = Ledger::in_memory().unwrap();
        let ids = ledger
            .add_users(&[NewUser::new("Mononym", date(1990, 1, 1))])
            .unwrap();
        ledger
            .add_accounts(&[account_for(ids[0], "ID--abc-1234567890")])
            .unwrap();

        let report = ledger.purge_incomplete_records().unwrap();
        assert_eq!(report.users_removed, 1);
        assert_eq!(report.accounts_removed, 1);
        assert!(ledger.users().unwrap().is_empty());
        assert!(ledger.accounts().unwrap().is_empty());
    }
}
