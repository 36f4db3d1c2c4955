use chrono::{NaiveDateTime, SubsecRound, Utc};
use log::{info, warn};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use crate::accounts::account::{find_by_number, set_amount};
use crate::error::{LedgerError, LedgerResult};
use crate::exchange::{convert, RateProvider};
use crate::storage::Ledger;
use crate::transactions::transaction::{append, NewTransaction};
use crate::validation::validate_account_number;

/// Move `amount` (in the sender's currency) from one account number to another.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: Decimal,
    /// Log timestamp; current UTC time when `None`.
    pub at: Option<NaiveDateTime>,
}

impl TransferRequest {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: Decimal) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            at: None,
        }
    }

    pub fn at(mut self, at: NaiveDateTime) -> Self {
        self.at = Some(at);
        self
    }
}

/// What a committed transfer did.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub transaction_id: i64,
    pub debited: Decimal,
    pub debit_currency: String,
    pub credited: Decimal,
    pub credit_currency: String,
    pub sender_balance: Decimal,
    pub receiver_balance: Decimal,
    pub datetime: NaiveDateTime,
}

// Falls back to the numeric id when the bank row is gone.
fn bank_name(conn: &Connection, bank_id: i64) -> LedgerResult<String> {
    let name = conn.query_row(
        "SELECT COALESCE((SELECT Name FROM Bank WHERE Id = ?1), CAST(?1 AS TEXT))",
        params![bank_id],
        |row| row.get(0),
    )?;
    Ok(name)
}

impl Ledger {
    /// Debit, credit and log append happen in one database transaction.
    ///
    /// `Ok` means all three were committed. Any `Err` (unknown account,
    /// insufficient balance, conversion failure, database error) means none
    /// of them were.
    pub fn transfer(
        &mut self,
        request: &TransferRequest,
        rates: &dyn RateProvider,
    ) -> LedgerResult<TransferReceipt> {
        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "transfer amount must be positive, got {}",
                request.amount
            )));
        }
        let sender_number = validate_account_number(&request.sender)?;
        let receiver_number = validate_account_number(&request.receiver)?;
        if sender_number == receiver_number {
            return Err(LedgerError::validation(format!(
                "sender and receiver are the same account {sender_number}"
            )));
        }

        let result = self.unit_of_work(|tx| {
            let sender = find_by_number(tx, &sender_number)?;
            let receiver = find_by_number(tx, &receiver_number)?;
            let (sender, receiver) = match (sender, receiver) {
                (Some(sender), Some(receiver)) => (sender, receiver),
                (None, _) => return Err(LedgerError::not_found("Account", &sender_number)),
                (_, None) => return Err(LedgerError::not_found("Account", &receiver_number)),
            };

            if sender.amount < request.amount {
                return Err(LedgerError::InsufficientFunds {
                    needed: request.amount,
                    available: sender.amount,
                });
            }

            let credited = convert(rates, &sender.currency, &receiver.currency, request.amount)?;

            let sender_balance = sender.amount - request.amount;
            let receiver_balance = receiver
                .amount
                .checked_add(credited)
                .ok_or_else(LedgerError::overflow)?;
            set_amount(tx, sender.id, sender_balance)?;
            set_amount(tx, receiver.id, receiver_balance)?;

            let datetime = request
                .at
                .unwrap_or_else(|| Utc::now().naive_utc())
                .trunc_subsecs(0);
            let bank_sender_name = bank_name(tx, sender.bank_id)?;
            let bank_receiver_name = bank_name(tx, receiver.bank_id)?;
            let transaction_id = append(
                tx,
                &NewTransaction {
                    bank_sender_name: &bank_sender_name,
                    account_sender_id: &sender.account_number,
                    bank_receiver_name: &bank_receiver_name,
                    account_receiver_id: &receiver.account_number,
                    sent_currency: &receiver.currency,
                    sent_amount: credited,
                    datetime,
                },
            )?;

            Ok(TransferReceipt {
                transaction_id,
                debited: request.amount,
                debit_currency: sender.currency,
                credited,
                credit_currency: receiver.currency,
                sender_balance,
                receiver_balance,
                datetime,
            })
        });

        match &result {
            Ok(receipt) => info!(
                "money transfer successful: {} {} from {} -> {} {} to {}",
                receipt.debited,
                receipt.debit_currency,
                sender_number,
                receipt.credited,
                receipt.credit_currency,
                receiver_number
            ),
            Err(e) => warn!("money transfer {sender_number} -> {receiver_number} aborted: {e}"),
        }
        result
    }
}
