pub mod rates;

pub use rates::{convert, FixedRates, FreeCurrencyApi, RateProvider};
