use std::path::PathBuf;
use std::process;

use bank_ledger::orchestrator::{add_accounts_from_csv, add_banks_from_csv, add_users_from_csv};
use bank_ledger::storage::DATETIME_FORMAT;
use bank_ledger::{Config, FreeCurrencyApi, Ledger, LedgerResult, SchemaOptions, TransferRequest};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;

/// Bank ledger: users, banks, accounts and currency-converting transfers on SQLite.
#[derive(Parser)]
#[command(name = "bank-ledger", version, about)]
struct Cli {
    /// Database file (overrides LEDGER_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the tables if they do not exist
    Init {
        /// Make user names and surnames unique
        #[arg(long)]
        unique_user_names: bool,
    },
    /// Bulk-load a CSV file
    Import { kind: ImportKind, path: PathBuf },
    /// Move money between two account numbers
    Transfer {
        sender: String,
        receiver: String,
        amount: Decimal,
        /// Log timestamp, "YYYY-MM-DD HH:MM:SS" (UTC); defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Delete incomplete users and the accounts left without an owner
    Cleanup,
    /// Run one of the canned reports
    Report {
        kind: ReportKind,
        /// Required by `user-transactions`
        #[arg(long)]
        user_id: Option<i64>,
    },
    /// Print a table as JSON
    List { kind: ListKind },
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportKind {
    Users,
    Banks,
    Accounts,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    Discounts,
    Debtors,
    RichestBank,
    OldestClientBanks,
    UserTransactions,
    MostActiveBank,
}

#[derive(Clone, Copy, ValueEnum)]
enum ListKind {
    Users,
    Banks,
    Accounts,
    Transactions,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn rate_provider(config: &Config) -> LedgerResult<FreeCurrencyApi> {
    FreeCurrencyApi::from_config(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let schema = match cli.command {
        Command::Init { unique_user_names } => SchemaOptions { unique_user_names },
        _ => SchemaOptions::default(),
    };
    let mut ledger = Ledger::open_with(&config.db_path, config.busy_timeout, schema)?;

    match cli.command {
        Command::Init { .. } => {
            info!("database ready at {}", config.db_path.display());
        }
        Command::Import { kind, path } => {
            let ids = match kind {
                ImportKind::Users => add_users_from_csv(&mut ledger, &path)?,
                ImportKind::Banks => add_banks_from_csv(&mut ledger, &path)?,
                ImportKind::Accounts => add_accounts_from_csv(&mut ledger, &path)?,
            };
            println!("imported {} row(s) from {}", ids.len(), path.display());
        }
        Command::Transfer {
            sender,
            receiver,
            amount,
            at,
        } => {
            let mut request = TransferRequest::new(sender, receiver, amount);
            if let Some(at) = at {
                request = request.at(NaiveDateTime::parse_from_str(&at, DATETIME_FORMAT)?);
            }
            let receipt = ledger.transfer(&request, &rate_provider(&config)?)?;
            println!(
                "transfer #{}: -{} {} / +{} {}",
                receipt.transaction_id,
                receipt.debited,
                receipt.debit_currency,
                receipt.credited,
                receipt.credit_currency
            );
        }
        Command::Cleanup => {
            let report = ledger.purge_incomplete_records()?;
            println!(
                "removed {} user(s) and {} account(s)",
                report.users_removed, report.accounts_removed
            );
        }
        Command::Report { kind, user_id } => match kind {
            ReportKind::Discounts => {
                print_json(&ledger.discount_candidates(&mut rand::thread_rng())?)?
            }
            ReportKind::Debtors => print_json(&ledger.debtor_names()?)?,
            ReportKind::RichestBank => print_json(&ledger.richest_bank(&rate_provider(&config)?)?)?,
            ReportKind::OldestClientBanks => print_json(&ledger.oldest_client_banks()?)?,
            ReportKind::UserTransactions => {
                let user_id = user_id.ok_or("--user-id is required for user-transactions")?;
                print_json(&ledger.user_recent_transactions(user_id)?)?
            }
            ReportKind::MostActiveBank => print_json(&ledger.most_active_bank()?)?,
        },
        Command::List { kind } => match kind {
            ListKind::Users => print_json(&ledger.users()?)?,
            ListKind::Banks => print_json(&ledger.banks()?)?,
            ListKind::Accounts => print_json(&ledger.accounts()?)?,
            ListKind::Transactions => print_json(&ledger.transactions()?)?,
        },
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    // Initialize logger (respect RUST_LOG env var if set)
    env_logger::init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
