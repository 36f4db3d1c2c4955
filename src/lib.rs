pub mod accounts;
pub mod banks;
pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod orchestrator;
pub mod reports;
pub mod storage;
pub mod transactions;
pub mod users;
pub mod validation;

pub use accounts::{Account, AccountStatus, AccountType, AccountUpdate, NewAccount};
pub use banks::{Bank, BankUpdate, NewBank};
pub use config::Config;
pub use engine::{TransferReceipt, TransferRequest};
pub use error::{LedgerError, LedgerResult};
pub use exchange::{FixedRates, FreeCurrencyApi, RateProvider};
pub use storage::{Ledger, SchemaOptions};
pub use transactions::TransactionRecord;
pub use users::{CleanupReport, NewUser, User, UserUpdate};
