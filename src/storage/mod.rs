pub mod schema;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, info, warn};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
pub use schema::{create_schema, SchemaOptions};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Handle to the ledger database.
///
/// Owns a single connection. Reads go straight through it; every write runs
/// inside one [`Ledger::unit_of_work`], so a failed operation leaves no
/// partial rows behind.
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Opens (or creates) the database file and makes sure the tables exist.
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> LedgerResult<Self> {
        Self::open_with(path, busy_timeout, SchemaOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(
        path: P,
        busy_timeout: Duration,
        options: SchemaOptions,
    ) -> LedgerResult<Self> {
        debug!("opening ledger database at {}", path.as_ref().display());
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn, options)
    }

    /// In-memory ledger, used by tests and dry runs.
    pub fn in_memory() -> LedgerResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, SchemaOptions::default())
    }

    fn from_connection(conn: Connection, options: SchemaOptions) -> LedgerResult<Self> {
        // Accounts may outlive their user or bank; the orphan pass cleans them up.
        conn.pragma_update(None, "foreign_keys", false)?;
        create_schema(&conn, options)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Runs `work` in a single database transaction.
    ///
    /// Commits when `work` returns `Ok`; on `Err` the transaction is dropped
    /// and rusqlite rolls it back.
    pub fn unit_of_work<T, F>(&mut self, work: F) -> LedgerResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> LedgerResult<T>,
    {
        let tx = self.conn.transaction()?;
        let value = work(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// `UPDATE <table> SET col = ?, ... WHERE Id = ?` with every value bound.
///
/// `table` and the column names are compile-time constants chosen by the
/// caller's update enum, never user input.
pub(crate) fn update_by_id(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: i64,
    assignments: Vec<(&'static str, Value)>,
) -> LedgerResult<()> {
    if assignments.is_empty() {
        return Err(LedgerError::validation(format!("no fields to update in {table}")));
    }

    let mut clauses = Vec::with_capacity(assignments.len());
    let mut values = Vec::with_capacity(assignments.len() + 1);
    for (idx, (column, value)) in assignments.into_iter().enumerate() {
        clauses.push(format!("{column} = ?{}", idx + 1));
        values.push(value);
    }
    values.push(Value::Integer(id));

    let sql = format!(
        "UPDATE {table} SET {} WHERE Id = ?{}",
        clauses.join(", "),
        values.len()
    );
    let rows = conn.execute(&sql, params_from_iter(values.iter()))?;
    if rows == 0 {
        warn!("{entity} with Id {id} not found in {table}");
        return Err(LedgerError::not_found(entity, id));
    }

    info!("row in {table} with Id {id} modified successfully");
    Ok(())
}

pub(crate) fn delete_by_id(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: i64,
) -> LedgerResult<()> {
    let rows = conn.execute(&format!("DELETE FROM {table} WHERE Id = ?1"), params![id])?;
    if rows == 0 {
        warn!("row with Id {id} not found in {table}");
        return Err(LedgerError::not_found(entity, id));
    }

    info!("row with Id {id} deleted from {table}");
    Ok(())
}

pub(crate) fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(raw.trim())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}
