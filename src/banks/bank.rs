use log::info;
use rusqlite::types::Value;
use rusqlite::{named_params, params, OptionalExtension, Row};
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::storage::{self, Ledger};

/// A row of the `Bank` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bank {
    pub id: i64,
    pub name: String,
}

impl Bank {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

/// Input for [`Ledger::add_banks`]. Without an id SQLite assigns one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBank {
    pub id: Option<i64>,
    pub name: String,
}

impl NewBank {
    pub fn new(id: Option<i64>, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankUpdate {
    Id(i64),
    Name(String),
}

impl BankUpdate {
    fn assignment(&self) -> (&'static str, Value) {
        match self {
            BankUpdate::Id(id) => ("Id", Value::Integer(*id)),
            BankUpdate::Name(name) => ("Name", Value::Text(name.trim().to_string())),
        }
    }
}

impl Ledger {
    pub fn add_banks(&mut self, banks: &[NewBank]) -> LedgerResult<Vec<i64>> {
        if let Some(blank) = banks.iter().find(|bank| bank.name.trim().is_empty()) {
            return Err(LedgerError::validation(format!(
                "bank {:?} has an empty name",
                blank.id
            )));
        }

        let ids = self.unit_of_work(|tx| {
            let mut stmt = tx.prepare("INSERT INTO Bank (Id, Name) VALUES (:id, :name)")?;
            let mut ids = Vec::with_capacity(banks.len());
            for bank in banks {
                stmt.execute(named_params! {
                    ":id": bank.id,
                    ":name": bank.name.trim(),
                })?;
                ids.push(tx.last_insert_rowid());
            }
            Ok(ids)
        })?;

        info!("{} bank(s) added successfully", ids.len());
        Ok(ids)
    }

    pub fn modify_bank(&mut self, id: i64, updates: &[BankUpdate]) -> LedgerResult<()> {
        let assignments = updates.iter().map(BankUpdate::assignment).collect();
        self.unit_of_work(|tx| storage::update_by_id(tx, "Bank", "Bank", id, assignments))
    }

    pub fn delete_bank(&mut self, id: i64) -> LedgerResult<()> {
        self.unit_of_work(|tx| storage::delete_by_id(tx, "Bank", "Bank", id))
    }

    pub fn bank(&self, id: i64) -> LedgerResult<Bank> {
        self.conn()
            .query_row(
                "SELECT Id, Name FROM Bank WHERE Id = ?1",
                params![id],
                Bank::from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("Bank", id))
    }

    pub fn banks(&self) -> LedgerResult<Vec<Bank>> {
        let mut stmt = self.conn().prepare("SELECT Id, Name FROM Bank ORDER BY Id")?;
        let banks = stmt
            .query_map([], Bank::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(banks)
    }
}
