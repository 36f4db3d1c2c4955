use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{LedgerError, LedgerResult};

/// Source of exchange rates: how many units of `to` one unit of `from` buys.
pub trait RateProvider {
    fn rate(&self, from: &str, to: &str) -> LedgerResult<Decimal>;
}

/// Converts `amount` and rounds to cents. Equal currencies skip the lookup.
pub fn convert(
    rates: &dyn RateProvider,
    from: &str,
    to: &str,
    amount: Decimal,
) -> LedgerResult<Decimal> {
    if from.eq_ignore_ascii_case(to) {
        return Ok(amount);
    }
    let rate = rates.rate(from, to)?;
    amount
        .checked_mul(rate)
        .map(|converted| converted.round_dp(2))
        .ok_or_else(LedgerError::overflow)
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    data: HashMap<String, f64>,
}

/// Client for the freecurrencyapi.com `latest` endpoint.
///
/// Response shape: `{"data": {"EUR": 0.92}}`.
pub struct FreeCurrencyApi {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl FreeCurrencyApi {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> LedgerResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> LedgerResult<Self> {
        Self::new(
            config.currency_api_url.clone(),
            config.currency_api_key.clone(),
            config.currency_api_timeout,
        )
    }
}

impl RateProvider for FreeCurrencyApi {
    fn rate(&self, from: &str, to: &str) -> LedgerResult<Decimal> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| {
                LedgerError::ExternalService("currency API key is not configured".to_string())
            })?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", api_key), ("base_currency", from), ("currencies", to)])
            .send()?
            .error_for_status()?;
        let body: LatestRatesResponse = response.json()?;

        let rate = rate_from_response(&body, to)?;
        debug!("exchange rate {from}->{to} = {rate}");
        Ok(rate)
    }
}

fn rate_from_response(body: &LatestRatesResponse, to: &str) -> LedgerResult<Decimal> {
    let raw = body
        .data
        .get(to)
        .ok_or_else(|| LedgerError::ExternalService(format!("no rate for {to} in response")))?;
    Decimal::from_f64(*raw)
        .filter(|rate| rate.is_sign_positive() && !rate.is_zero())
        .ok_or_else(|| LedgerError::ExternalService(format!("unusable rate {raw} for {to}")))
}

/// Rates from a fixed table, for offline runs and tests.
///
/// A missing direct pair falls back to the inverse of the reverse pair.
#[derive(Debug, Clone, Default)]
pub struct FixedRates {
    rates: HashMap<(String, String), Decimal>,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates
            .insert((from.to_ascii_uppercase(), to.to_ascii_uppercase()), rate);
        self
    }
}

impl RateProvider for FixedRates {
    fn rate(&self, from: &str, to: &str) -> LedgerResult<Decimal> {
        let from = from.to_ascii_uppercase();
        let to = to.to_ascii_uppercase();
        if from == to {
            return Ok(Decimal::ONE);
        }
        if let Some(rate) = self.rates.get(&(from.clone(), to.clone())) {
            return Ok(*rate);
        }
        self.rates
            .get(&(to.clone(), from.clone()))
            .filter(|rate| !rate.is_zero())
            .map(|rate| Decimal::ONE / *rate)
            .ok_or_else(|| LedgerError::ExternalService(format!("no rate for {from}->{to}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_convert_same_currency_is_identity() {
        let rates = FixedRates::new();
        assert_eq!(convert(&rates, "USD", "usd", dec!(150)).unwrap(), dec!(150));
    }

    #[test]
    fn test_convert_rounds_to_cents() {
        let rates = FixedRates::new().with_rate("USD", "EUR", dec!(1.1));
        assert_eq!(convert(&rates, "USD", "EUR", dec!(150)).unwrap(), dec!(165.0));

        let rates = FixedRates::new().with_rate("USD", "JPY", dec!(149.33333));
        assert_eq!(convert(&rates, "USD", "JPY", dec!(1.5)).unwrap(), dec!(224.00));
    }

    #[test]
    fn test_convert_overflow_is_an_error() {
        let rates = FixedRates::new().with_rate("USD", "JPY", dec!(150));
        assert!(matches!(
            convert(&rates, "USD", "JPY", Decimal::MAX),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_fixed_rates_inverse_and_missing() {
        let rates = FixedRates::new().with_rate("EUR", "USD", dec!(2));
        assert_eq!(rates.rate("USD", "EUR").unwrap(), dec!(0.5));
        assert!(matches!(
            rates.rate("USD", "GBP"),
            Err(LedgerError::ExternalService(_))
        ));
    }

    #[test]
    fn test_response_parsing() {
        let body: LatestRatesResponse =
            serde_json::from_str(r#"{"data": {"EUR": 0.92}}"#).unwrap();
        assert_eq!(rate_from_response(&body, "EUR").unwrap(), dec!(0.92));
        assert!(rate_from_response(&body, "GBP").is_err());

        let zero: LatestRatesResponse = serde_json::from_str(r#"{"data": {"EUR": 0}}"#).unwrap();
        assert!(rate_from_response(&zero, "EUR").is_err());
    }

    #[test]
    fn test_missing_api_key_fails_without_network() {
        let api = FreeCurrencyApi::new("http://127.0.0.1:9/latest", None, Duration::from_secs(1))
            .unwrap();
        assert!(matches!(
            api.rate("USD", "EUR"),
            Err(LedgerError::ExternalService(_))
        ));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        assert!(serde_json::from_str::<LatestRatesResponse>(r#"{"rates": {}}"#).is_err());
    }
}
