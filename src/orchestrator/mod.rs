pub mod orchestrator;

pub use orchestrator::{
    add_accounts_from_csv, add_accounts_from_reader, add_banks_from_csv, add_banks_from_reader,
    add_users_from_csv, add_users_from_reader,
};
