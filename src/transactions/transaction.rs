use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{named_params, params, Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::LedgerResult;
use crate::storage::{decimal_column, Ledger, DATETIME_FORMAT};

/// A row of `TransactionTable`: an append-only record of a completed transfer.
///
/// Bank and account columns are snapshots taken at transfer time, not
/// foreign keys. `sent_amount` is what the receiver was credited, in
/// `sent_currency`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub bank_sender_name: String,
    pub account_sender_id: String,
    pub bank_receiver_name: String,
    pub account_receiver_id: String,
    pub sent_currency: String,
    pub sent_amount: Decimal,
    pub datetime: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct NewTransaction<'a> {
    pub bank_sender_name: &'a str,
    pub account_sender_id: &'a str,
    pub bank_receiver_name: &'a str,
    pub account_receiver_id: &'a str,
    pub sent_currency: &'a str,
    pub sent_amount: Decimal,
    pub datetime: NaiveDateTime,
}

pub(crate) const TRANSACTION_COLUMNS: &str = "Id, Bank_sender_name, Account_sender_id, \
     Bank_receiver_name, Account_receiver_id, Sent_Currency, Sent_Amount, Datetime";

impl TransactionRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw_datetime: String = row.get(7)?;
        let datetime = NaiveDateTime::parse_from_str(&raw_datetime, DATETIME_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
        Ok(Self {
            id: row.get(0)?,
            bank_sender_name: row.get(1)?,
            account_sender_id: row.get(2)?,
            bank_receiver_name: row.get(3)?,
            account_receiver_id: row.get(4)?,
            sent_currency: row.get(5)?,
            sent_amount: decimal_column(row, 6)?,
            datetime,
        })
    }
}

pub(crate) fn append(conn: &Connection, tx: &NewTransaction<'_>) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO TransactionTable (Bank_sender_name, Account_sender_id, Bank_receiver_name,
             Account_receiver_id, Sent_Currency, Sent_Amount, Datetime)
         VALUES (:bank_sender, :account_sender, :bank_receiver, :account_receiver,
             :currency, :amount, :datetime)",
        named_params! {
            ":bank_sender": tx.bank_sender_name,
            ":account_sender": tx.account_sender_id,
            ":bank_receiver": tx.bank_receiver_name,
            ":account_receiver": tx.account_receiver_id,
            ":currency": tx.sent_currency,
            ":amount": tx.sent_amount.to_string(),
            ":datetime": tx.datetime.format(DATETIME_FORMAT).to_string(),
        },
    )?;
    Ok(conn.last_insert_rowid())
}

impl Ledger {
    pub fn transactions(&self) -> LedgerResult<Vec<TransactionRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM TransactionTable ORDER BY Id"
        ))?;
        let records = stmt
            .query_map([], TransactionRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Log rows sent from `account_number`, oldest first.
    pub fn transactions_from_account(
        &self,
        account_number: &str,
    ) -> LedgerResult<Vec<TransactionRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM TransactionTable
             WHERE Account_sender_id = ?1 ORDER BY Datetime, Id"
        ))?;
        let records = stmt
            .query_map(params![account_number], TransactionRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 8, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn entry(sender: &str, hour: u32) -> NewTransaction<'_> {
        NewTransaction {
            bank_sender_name: "AlphaBank",
            account_sender_id: sender,
            bank_receiver_name: "PrivatBank",
            account_receiver_id: "ID--zz-00000000001",
            sent_currency: "USD",
            sent_amount: dec!(100.25),
            datetime: at(hour),
        }
    }

    #[test]
    fn test_append_and_list() {
        let mut ledger = Ledger::in_memory().unwrap();
        let id = ledger
            .unit_of_work(|tx| append(tx, &entry("ID--aa-00000000001", 9)))
            .unwrap();

        let records = ledger.transactions().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].sent_amount, dec!(100.25));
        assert_eq!(records[0].datetime, at(9));
        assert_eq!(records[0].bank_receiver_name, "PrivatBank");
    }

    #[test]
    fn test_transactions_from_account_filters_and_orders() {
        let mut ledger = Ledger::in_memory().unwrap();
        ledger
            .unit_of_work(|tx| {
                append(tx, &entry("ID--aa-00000000001", 12))?;
                append(tx, &entry("ID--bb-00000000001", 10))?;
                append(tx, &entry("ID--aa-00000000001", 8))?;
                Ok(())
            })
            .unwrap();

        let records = ledger.transactions_from_account("ID--aa-00000000001").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].datetime, at(8));
        assert_eq!(records[1].datetime, at(12));
    }
}
