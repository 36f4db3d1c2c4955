pub mod engine;

pub use engine::{TransferReceipt, TransferRequest};
