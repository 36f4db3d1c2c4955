pub mod bank;

pub use bank::{Bank, BankUpdate, NewBank};
