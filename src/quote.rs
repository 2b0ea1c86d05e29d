//! Live quote fetching
//!
//! A single aggregator quote enriches the advice prompt with current market
//! conditions. Quotes are advisory only: a failed fetch surfaces as
//! [`Error::UpstreamUnavailable`](crate::Error::UpstreamUnavailable) and the
//! caller proceeds without one. No retries; a stale quote is worse than none.

use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::Deserialize;

/// An aggregator's estimate for a prospective swap.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteResult {
    /// Expected output in the destination token's base units.
    pub estimated_amount_out: U256,
    pub estimated_gas: u64,
}

#[async_trait]
pub trait QuoteClient: Send + Sync {
    async fn quote(&self, from: Address, to: Address, amount: U256) -> Result<QuoteResult>;
}

/// 1inch aggregator quote API client
pub struct OneInchClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl OneInchClient {
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            api_key,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    /// Base-units integer, serialized as a decimal string.
    dst_amount: String,
    #[serde(default)]
    gas: u64,
}

#[async_trait]
impl QuoteClient for OneInchClient {
    async fn quote(&self, from: Address, to: Address, amount: U256) -> Result<QuoteResult> {
        let mut request = self.http.get(&self.url).query(&[
            ("src", from.to_string()),
            ("dst", to.to_string()),
            ("amount", amount.to_string()),
            ("includeGas", "true".to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("quote request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "quote API returned {}",
                response.status()
            )));
        }

        let body: QuoteResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("malformed quote response: {}", e)))?;

        let estimated_amount_out = U256::from_str_radix(&body.dst_amount, 10)
            .map_err(|_| Error::UpstreamUnavailable("quote amount not an integer".to_string()))?;

        Ok(QuoteResult {
            estimated_amount_out,
            estimated_gas: body.gas,
        })
    }
}

/// Render a base-units amount as a decimal string, trailing zeros trimmed.
pub fn format_base_units(value: U256, decimals: u8) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / divisor;
    let frac = value % divisor;

    if frac.is_zero() {
        return whole.to_string();
    }

    let frac = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_base_units_with_decimals() {
        assert_eq!(format_base_units(U256::from(2_514_000_000u64), 6), "2514");
        assert_eq!(format_base_units(U256::from(2_514_500_000u64), 6), "2514.5");
        assert_eq!(
            format_base_units(U256::from(1_000_000_000_000_000_000u64), 18),
            "1"
        );
        assert_eq!(format_base_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(format_base_units(U256::ZERO, 18), "0");
    }

    #[test]
    fn quote_response_parses_decimal_string_amount() {
        let body: QuoteResponse = serde_json::from_value(serde_json::json!({
            "dstAmount": "2514000000",
            "gas": 180000
        }))
        .unwrap();
        assert_eq!(body.dst_amount, "2514000000");
        assert_eq!(body.gas, 180000);
    }

    #[test]
    fn quote_response_gas_defaults_to_zero() {
        let body: QuoteResponse =
            serde_json::from_value(serde_json::json!({ "dstAmount": "1" })).unwrap();
        assert_eq!(body.gas, 0);
    }
}
