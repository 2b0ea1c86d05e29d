//! RPC endpoint configuration
//!
//! Supports the usual Ethereum ecosystem conventions:
//! 1. Per-chain env vars (ETH_RPC_URL, SEPOLIA_RPC_URL) - highest priority
//! 2. ALCHEMY_API_KEY - builds URLs automatically
//! 3. Public RPC fallbacks - for testing only

use std::collections::HashMap;

/// Chain ID constants
pub mod chains {
    pub const MAINNET: u64 = 1;
    pub const SEPOLIA: u64 = 11155111;
}

mod env_vars {
    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    pub const SEPOLIA_RPC_URL: &str = "SEPOLIA_RPC_URL";
    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const MAINNET: &str = "https://eth.llamarpc.com";
    pub const SEPOLIA: &str = "https://ethereum-sepolia-rpc.publicnode.com";
}

/// RPC URLs indexed by chain ID
#[derive(Debug, Clone)]
pub struct RpcConfig {
    urls: HashMap<u64, String>,
}

impl RpcConfig {
    /// Create RPC config from environment variables.
    pub fn from_env() -> Self {
        let mut urls = HashMap::new();

        if let Ok(url) = std::env::var(env_vars::ETH_RPC_URL) {
            tracing::debug!("Using ETH_RPC_URL for mainnet");
            urls.insert(chains::MAINNET, url);
        }
        if let Ok(url) = std::env::var(env_vars::SEPOLIA_RPC_URL) {
            tracing::debug!("Using SEPOLIA_RPC_URL for Sepolia");
            urls.insert(chains::SEPOLIA, url);
        }

        if urls.is_empty() {
            if let Ok(key) = std::env::var(env_vars::ALCHEMY_API_KEY) {
                tracing::info!("Building RPC URLs from ALCHEMY_API_KEY");
                urls.insert(
                    chains::MAINNET,
                    format!("https://eth-mainnet.g.alchemy.com/v2/{}", key),
                );
                urls.insert(
                    chains::SEPOLIA,
                    format!("https://eth-sepolia.g.alchemy.com/v2/{}", key),
                );
            }
        }

        if !urls.contains_key(&chains::MAINNET) {
            tracing::warn!("No RPC configured for mainnet, using public RPC (rate limited)");
        }
        urls.entry(chains::MAINNET)
            .or_insert_with(|| public_rpcs::MAINNET.to_string());
        urls.entry(chains::SEPOLIA)
            .or_insert_with(|| public_rpcs::SEPOLIA.to_string());

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_urls_resolve() {
        let mut urls = HashMap::new();
        urls.insert(1, "https://custom.rpc".to_string());
        let config = RpcConfig::with_urls(urls);

        assert_eq!(config.get(1), Some("https://custom.rpc"));
        assert_eq!(config.get(999), None);
    }

    #[test]
    fn from_env_covers_both_chains() {
        let config = RpcConfig::from_env();
        assert!(config.get(chains::MAINNET).is_some());
        assert!(config.get(chains::SEPOLIA).is_some());
    }
}
