pub mod reports;

pub use reports::{DISCOUNTS, MAX_DISCOUNT_USERS, RECENT_WINDOW_DAYS, REPORT_CURRENCY};
