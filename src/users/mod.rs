pub mod user;

pub use user::{CleanupReport, NewUser, User, UserUpdate};
