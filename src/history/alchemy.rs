//! Alchemy transfer-log client
//!
//! Wraps the `alchemy_getAssetTransfers` JSON-RPC method. Each logical fetch
//! issues one request per direction (sent, received) and merges the results
//! newest first. Transient failures retry with exponential backoff; rate
//! limits back off twice as long.

use super::{Direction, TransferLogFetcher, TransferRecord};
use crate::config::RetryPolicy;
use crate::{Error, Result};
use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

const ASSET_TRANSFERS_METHOD: &str = "alchemy_getAssetTransfers";

pub struct AlchemyClient {
    http: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

impl AlchemyClient {
    pub fn new(api_key: &str, retry: RetryPolicy) -> Self {
        Self::with_url(
            format!("https://eth-mainnet.g.alchemy.com/v2/{}", api_key),
            retry,
        )
    }

    /// Point at an explicit endpoint, used against test servers.
    pub fn with_url(url: String, retry: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            retry,
        }
    }

    async fn request(&self, params: serde_json::Value) -> Result<TransfersResult> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": ASSET_TRANSFERS_METHOD,
            "params": [params],
        });

        let mut last_error = String::new();
        for attempt in 0..self.retry.max_attempts {
            let response = match self.http.post(&self.url).json(&payload).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "transfer log request failed");
                    last_error = e.to_string();
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                    continue;
                }
            };

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(attempt, "transfer log provider rate limited");
                last_error = "rate limited".to_string();
                tokio::time::sleep(self.retry.rate_limit_backoff(attempt)).await;
                continue;
            }

            let body: RpcResponse = response.error_for_status()?.json().await?;
            if let Some(error) = body.error {
                if error.message.to_lowercase().contains("rate limit") {
                    tracing::warn!(attempt, "transfer log provider rate limited");
                    last_error = error.message;
                    tokio::time::sleep(self.retry.rate_limit_backoff(attempt)).await;
                    continue;
                }
                return Err(Error::UpstreamUnavailable(format!(
                    "transfer log provider error {}: {}",
                    error.code, error.message
                )));
            }

            return body.result.ok_or_else(|| {
                Error::UpstreamUnavailable("transfer log response had no result".to_string())
            });
        }

        Err(Error::UpstreamUnavailable(format!(
            "transfer log provider unreachable after {} attempts: {}",
            self.retry.max_attempts, last_error
        )))
    }

    async fn transfers(
        &self,
        wallet: Address,
        categories: &[&str],
        max_results: usize,
    ) -> Result<Vec<TransferRecord>> {
        let max_count = format_max_count(max_results);

        let sent = self
            .request(json!({
                "fromBlock": "0x0",
                "toBlock": "latest",
                "fromAddress": wallet.to_string(),
                "category": categories,
                "withMetadata": true,
                "maxCount": max_count,
            }))
            .await?;

        let received = self
            .request(json!({
                "fromBlock": "0x0",
                "toBlock": "latest",
                "toAddress": wallet.to_string(),
                "category": categories,
                "withMetadata": true,
                "maxCount": max_count,
            }))
            .await?;

        let mut records: Vec<TransferRecord> = sent
            .transfers
            .into_iter()
            .map(|t| t.into_record(Direction::Sent))
            .chain(
                received
                    .transfers
                    .into_iter()
                    .map(|t| t.into_record(Direction::Received)),
            )
            .collect();

        records.sort_by(|a, b| b.block_number.cmp(&a.block_number));
        Ok(records)
    }
}

#[async_trait]
impl TransferLogFetcher for AlchemyClient {
    async fn external_transfers(
        &self,
        wallet: Address,
        max_results: usize,
    ) -> Result<Vec<TransferRecord>> {
        self.transfers(wallet, &["external"], max_results).await
    }

    async fn token_transfers(
        &self,
        wallet: Address,
        max_results: usize,
    ) -> Result<Vec<TransferRecord>> {
        self.transfers(wallet, &["erc20"], max_results).await
    }
}

/// The provider rejects maxCount outside 1..=1000; clamp and hex-format.
fn format_max_count(max_results: usize) -> String {
    format!("0x{:x}", max_results.clamp(1, 1000))
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<TransfersResult>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct TransfersResult {
    #[serde(default)]
    transfers: Vec<RawTransfer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransfer {
    hash: Option<String>,
    block_num: Option<String>,
    from: Option<String>,
    to: Option<String>,
    value: Option<f64>,
    asset: Option<String>,
    #[serde(default)]
    raw_contract: RawContract,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Deserialize, Default)]
struct RawContract {
    address: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    block_timestamp: Option<DateTime<Utc>>,
}

impl RawTransfer {
    fn into_record(self, direction: Direction) -> TransferRecord {
        let parse_addr = |s: Option<String>| s.and_then(|s| s.parse::<Address>().ok());

        TransferRecord {
            hash: self.hash.unwrap_or_default(),
            block_number: self
                .block_num
                .and_then(|hex| u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok())
                .unwrap_or(0),
            timestamp: self.metadata.block_timestamp,
            direction,
            from: parse_addr(self.from),
            to: parse_addr(self.to),
            asset: self.asset,
            value: self.value,
            contract: parse_addr(self.raw_contract.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_count_is_clamped_and_hex_formatted() {
        assert_eq!(format_max_count(100), "0x64");
        assert_eq!(format_max_count(0), "0x1");
        assert_eq!(format_max_count(5000), "0x3e8");
    }

    #[test]
    fn raw_transfer_normalizes_wire_fields() {
        let raw: RawTransfer = serde_json::from_value(serde_json::json!({
            "hash": "0xabc",
            "blockNum": "0x112a880",
            "from": "0x7a250d5630b4cf539739df2c5dacb4c659f2488d",
            "to": "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
            "value": 1.5,
            "asset": "WETH",
            "rawContract": { "address": "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2" },
            "metadata": { "blockTimestamp": "2024-01-15T12:00:00Z" }
        }))
        .unwrap();

        let record = raw.into_record(Direction::Received);
        assert_eq!(record.hash, "0xabc");
        assert_eq!(record.block_number, 0x112a880);
        assert_eq!(record.asset.as_deref(), Some("WETH"));
        assert_eq!(record.value, Some(1.5));
        assert!(record.to.is_some());
        assert!(record.contract.is_some());
        assert!(record.timestamp.is_some());
    }

    #[test]
    fn missing_optional_fields_do_not_fail_parsing() {
        let raw: RawTransfer = serde_json::from_value(serde_json::json!({
            "hash": "0xdef",
            "blockNum": "0x10",
            "value": null
        }))
        .unwrap();

        let record = raw.into_record(Direction::Sent);
        assert_eq!(record.block_number, 16);
        assert!(record.value.is_none());
        assert!(record.contract.is_none());
    }
}
