use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime, Utc};
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::params;
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::exchange::RateProvider;
use crate::storage::{decimal_column, Ledger, DATETIME_FORMAT};
use crate::transactions::transaction::TRANSACTION_COLUMNS;
use crate::transactions::TransactionRecord;

pub const DISCOUNTS: [u32; 3] = [25, 30, 50];
pub const MAX_DISCOUNT_USERS: usize = 10;
pub const RECENT_WINDOW_DAYS: i64 = 90;
pub const REPORT_CURRENCY: &str = "USD";

impl Ledger {
    /// Picks between one and ten distinct users (never more than exist) and
    /// gives each a discount from [`DISCOUNTS`].
    pub fn discount_candidates<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> LedgerResult<Vec<(i64, u32)>> {
        let mut stmt = self.conn().prepare("SELECT Id FROM User ORDER BY Id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let count = rng.gen_range(1..=ids.len().min(MAX_DISCOUNT_USERS));
        let chosen: Vec<i64> = ids.choose_multiple(rng, count).copied().collect();
        let picks = chosen
            .into_iter()
            .map(|id| (id, *DISCOUNTS.choose(rng).unwrap_or(&DISCOUNTS[0])))
            .collect();
        Ok(picks)
    }

    /// "Name Surname" of every user owning at least one negative account.
    pub fn debtor_names(&self) -> LedgerResult<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT u.Id, u.Name, u.Surname, a.Amount
             FROM User u JOIN Account a ON a.User_id = u.Id
             ORDER BY u.Id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    decimal_column(row, 3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut names: Vec<String> = Vec::new();
        let mut last_id = None;
        for (id, name, surname, amount) in rows {
            if amount < Decimal::ZERO && last_id != Some(id) {
                names.push(format!("{name} {surname}").trim().to_string());
                last_id = Some(id);
            }
        }

        if names.is_empty() {
            info!("users who have debts not found");
        } else {
            info!("users who have debts: {names:?}");
        }
        Ok(names)
    }

    /// Bank whose accounts add up to the most money in USD. One rate lookup
    /// per distinct foreign currency; ties go to the lower bank id.
    pub fn richest_bank(&self, rates: &dyn RateProvider) -> LedgerResult<Option<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT b.Id, b.Name, a.Currency, a.Amount
             FROM Account a JOIN Bank b ON b.Id = a.Bank_id
             ORDER BY b.Id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    decimal_column(row, 3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rate_cache: HashMap<String, Decimal> = HashMap::new();
        let mut capital: Vec<(i64, String, Decimal)> = Vec::new();
        for (bank_id, bank_name, currency, amount) in rows {
            let in_usd = if currency.eq_ignore_ascii_case(REPORT_CURRENCY) {
                amount
            } else {
                let rate = match rate_cache.get(&currency) {
                    Some(rate) => *rate,
                    None => {
                        let rate = rates.rate(&currency, REPORT_CURRENCY)?;
                        rate_cache.insert(currency.clone(), rate);
                        rate
                    }
                };
                amount
                    .checked_mul(rate)
                    .ok_or_else(LedgerError::overflow)?
                    .round_dp(2)
            };

            match capital.last_mut() {
                Some((id, _, total)) if *id == bank_id => {
                    *total = total.checked_add(in_usd).ok_or_else(LedgerError::overflow)?;
                }
                _ => capital.push((bank_id, bank_name, in_usd)),
            }
        }

        let richest = capital
            .into_iter()
            .fold(None::<(i64, String, Decimal)>, |best, current| match best {
                Some(best) if best.2 >= current.2 => Some(best),
                _ => Some(current),
            })
            .map(|(_, name, total)| {
                info!("bank with the biggest capital: {name} ({total} {REPORT_CURRENCY})");
                name
            });
        Ok(richest)
    }

    /// Names of the banks holding accounts of the user with the earliest
    /// birth day. Users without a birth day are not considered.
    pub fn oldest_client_banks(&self) -> LedgerResult<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT b.Name
             FROM Bank b JOIN Account a ON a.Bank_id = b.Id
             WHERE a.User_id = (
                 SELECT Id FROM User
                 WHERE Birth_day IS NOT NULL AND TRIM(Birth_day) <> ''
                 ORDER BY Birth_day, Id
                 LIMIT 1
             )
             ORDER BY b.Name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        info!("{names:?} - banks which serve the oldest client");
        Ok(names)
    }

    /// Log rows sent from any of the user's accounts at or after `cutoff`.
    pub fn user_transactions_since(
        &self,
        user_id: i64,
        cutoff: NaiveDateTime,
    ) -> LedgerResult<Vec<TransactionRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM TransactionTable
             WHERE Account_sender_id IN (SELECT Account_Number FROM Account WHERE User_id = ?1)
               AND Datetime >= ?2
             ORDER BY Datetime, Id"
        ))?;
        let records = stmt
            .query_map(
                params![user_id, cutoff.format(DATETIME_FORMAT).to_string()],
                TransactionRecord::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// [`Ledger::user_transactions_since`] over the last 90 days.
    pub fn user_recent_transactions(&self, user_id: i64) -> LedgerResult<Vec<TransactionRecord>> {
        let cutoff = Utc::now().naive_utc() - Duration::days(RECENT_WINDOW_DAYS);
        self.user_transactions_since(user_id, cutoff)
    }

    /// Sender bank with the most distinct sending accounts.
    pub fn most_active_bank(&self) -> LedgerResult<Option<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT Bank_sender_name, COUNT(DISTINCT Account_sender_id) AS senders
             FROM TransactionTable
             GROUP BY Bank_sender_name
             ORDER BY senders DESC, Bank_sender_name
             LIMIT 1",
        )?;
        let mut rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let bank = rows.next().transpose()?;
        if let Some(name) = &bank {
            info!("bank with the highest number of unique outbound senders is {name}");
        }
        Ok(bank)
    }
}
