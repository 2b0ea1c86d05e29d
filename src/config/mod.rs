//! Configuration for the swap advisor

pub mod rpc;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use rpc::RpcConfig;

/// Groq API key environment variable name
pub const LLM_API_KEY_ENV: &str = "GROQ_API_KEY";
/// Alchemy API key environment variable name (transfer-log fetcher)
pub const CHAIN_DATA_API_KEY_ENV: &str = "ALCHEMY_API_KEY";
/// 1inch aggregator API key environment variable name
pub const QUOTE_API_KEY_ENV: &str = "ONE_INCH_API_KEY";

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Sepolia,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => rpc::chains::MAINNET,
            Network::Sepolia => rpc::chains::SEPOLIA,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Sepolia => "sepolia",
        }
    }
}

/// Bounded-retry policy for the transfer-log fetcher.
///
/// Injected rather than hardcoded so tests can use a zero-wait variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl RetryPolicy {
    /// Backoff before retrying a failed attempt (0-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(1u64 << attempt.min(16)))
    }

    /// Rate-limit responses back off twice as long as transport failures.
    pub fn rate_limit_backoff(&self, attempt: u32) -> Duration {
        self.backoff(attempt).saturating_mul(2)
    }

    /// A policy that never sleeps, for tests.
    pub fn no_wait(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_backoff_ms: 0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 2_000,
        }
    }
}

/// Transaction building and confirmation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// On-chain deadline attached to router calls (minutes from now).
    pub deadline_minutes: u64,
    /// Gas limit applied when estimation fails.
    pub fallback_gas_limit: u64,
    /// Safety margin applied to successful gas estimates (percent).
    pub gas_margin_percent: u64,
    /// Confirmation wait for the swap transaction (seconds).
    pub swap_timeout_secs: u64,
    /// Confirmation wait for the token-approval sub-step (seconds).
    pub approval_timeout_secs: u64,
    /// Receipt polling interval (milliseconds).
    pub poll_interval_ms: u64,
}

impl ExecutionConfig {
    pub fn swap_timeout(&self) -> Duration {
        Duration::from_secs(self.swap_timeout_secs)
    }

    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            deadline_minutes: 30,
            fallback_gas_limit: 300_000,
            gas_margin_percent: 20,
            swap_timeout_secs: 300,
            approval_timeout_secs: 120,
            poll_interval_ms: 5_000,
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions endpoint.
    pub api_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.5,
            max_tokens: 2048,
        }
    }
}

/// External collaborator endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Quote aggregator base URL (1inch-style).
    pub quote_url: String,
    /// Vector-index query endpoint for historical swap similarity search.
    /// `None` disables the historical contribution.
    pub similarity_url: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            quote_url: "https://api.1inch.dev/swap/v5.2/1/quote".to_string(),
            similarity_url: None,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = Config::default();
        assert_eq!(config.network.chain_id(), 1);
        assert_eq!(config.execution.deadline_minutes, 30);
        assert_eq!(config.execution.fallback_gas_limit, 300_000);
        assert_eq!(config.execution.swap_timeout_secs, 300);
        assert_eq!(config.execution.approval_timeout_secs, 120);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn retry_backoff_doubles() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.backoff(0), Duration::from_secs(2));
        assert_eq!(retry.backoff(1), Duration::from_secs(4));
        assert_eq!(retry.backoff(2), Duration::from_secs(8));
        assert_eq!(retry.rate_limit_backoff(0), Duration::from_secs(4));
    }

    #[test]
    fn no_wait_policy_never_sleeps() {
        let retry = RetryPolicy::no_wait(3);
        assert_eq!(retry.backoff(2), Duration::ZERO);
        assert_eq!(retry.rate_limit_backoff(2), Duration::ZERO);
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let parsed: Config = serde_json::from_value(serde_json::json!({
            "network": "sepolia",
            "execution": {
                "deadline_minutes": 10,
                "fallback_gas_limit": 250000,
                "gas_margin_percent": 20,
                "swap_timeout_secs": 60,
                "approval_timeout_secs": 30,
                "poll_interval_ms": 100
            }
        }))
        .expect("parse config");
        assert_eq!(parsed.network, Network::Sepolia);
        assert_eq!(parsed.execution.deadline_minutes, 10);
        assert_eq!(parsed.retry.max_attempts, 3);
    }
}
