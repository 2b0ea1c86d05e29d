//! Wallet transfer history and swap extraction
//!
//! Raw asset-transfer records come from a [`TransferLogFetcher`] (Alchemy in
//! production, mocks in tests). [`extract_swaps`] then joins external
//! transactions addressed to known DEX routers with the ERC-20 transfers
//! sharing their hash, yielding the wallet's historical swaps.

pub mod alchemy;

use crate::registry::Registry;
use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use alchemy::AlchemyClient;

/// Which side of the transfer the wallet was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// One asset-transfer record, normalized from the upstream wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub direction: Direction,
    pub from: Option<Address>,
    pub to: Option<Address>,
    /// Token ticker as reported upstream ("ETH" for external transfers).
    pub asset: Option<String>,
    /// Decimal-adjusted amount as reported upstream.
    pub value: Option<f64>,
    /// Token contract, when the transfer is an ERC-20 movement.
    pub contract: Option<Address>,
}

/// Fetches a wallet's transfer logs from an indexing provider.
#[async_trait]
pub trait TransferLogFetcher: Send + Sync {
    /// Plain value transfers in both directions, newest first.
    async fn external_transfers(
        &self,
        wallet: Address,
        max_results: usize,
    ) -> crate::Result<Vec<TransferRecord>>;

    /// ERC-20 transfers in both directions, newest first.
    async fn token_transfers(
        &self,
        wallet: Address,
        max_results: usize,
    ) -> crate::Result<Vec<TransferRecord>>;
}

/// One token leg of a historical swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMovement {
    pub symbol: Option<String>,
    pub token_address: Option<Address>,
    pub amount: f64,
}

/// A wallet transaction recognized as a DEX swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSwap {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub dex: String,
    pub router: Address,
    /// Native value attached to the router call.
    pub value_native: f64,
    pub input_tokens: Vec<TokenMovement>,
    pub output_tokens: Vec<TokenMovement>,
    /// "A → B" when both legs were identified.
    pub path: Option<String>,
    /// Output per unit input, for single-input single-output swaps.
    pub rate: Option<f64>,
}

impl HistoricalSwap {
    /// Prose summary in the form the similarity index embeds.
    pub fn description(&self) -> String {
        let mut parts = Vec::new();

        if let Some(path) = &self.path {
            parts.push(format!("Swap path: {} on {}", path, self.dex));
        }

        if !self.input_tokens.is_empty() && !self.output_tokens.is_empty() {
            let side = |tokens: &[TokenMovement]| {
                tokens
                    .iter()
                    .filter_map(|t| t.symbol.as_ref().map(|s| format!("{} {}", t.amount, s)))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            parts.push(format!(
                "Swapped {} for {}",
                side(&self.input_tokens),
                side(&self.output_tokens)
            ));
        }

        if let Some(rate) = self.rate {
            parts.push(format!("Exchange rate: {}", rate));
        }

        parts.join(" ")
    }
}

/// Join external router calls with the token transfers sharing their hash.
///
/// A transaction counts as a swap when the wallet sent it directly to a
/// recognized DEX router. Token legs are attached by hash and direction;
/// the rate is only computed for clean one-in one-out swaps. Results are
/// sorted newest first.
pub fn extract_swaps(
    registry: &Registry,
    external: &[TransferRecord],
    tokens: &[TransferRecord],
) -> Vec<HistoricalSwap> {
    let mut swaps: Vec<HistoricalSwap> = Vec::new();

    for tx in external {
        if tx.direction != Direction::Sent {
            continue;
        }
        let Some(router) = tx.to else { continue };
        let Some(dex) = registry.dex_for_router(&router) else {
            continue;
        };

        swaps.push(HistoricalSwap {
            hash: tx.hash.clone(),
            block_number: tx.block_number,
            timestamp: tx.timestamp,
            dex: dex.to_string(),
            router,
            value_native: tx.value.unwrap_or(0.0),
            input_tokens: Vec::new(),
            output_tokens: Vec::new(),
            path: None,
            rate: None,
        });
    }

    for transfer in tokens {
        let Some(swap) = swaps.iter_mut().find(|s| s.hash == transfer.hash) else {
            continue;
        };

        let movement = TokenMovement {
            symbol: transfer.asset.clone(),
            token_address: transfer.contract,
            amount: transfer.value.unwrap_or(0.0),
        };
        match transfer.direction {
            Direction::Sent => swap.input_tokens.push(movement),
            Direction::Received => swap.output_tokens.push(movement),
        }
    }

    for swap in &mut swaps {
        if swap.input_tokens.is_empty() || swap.output_tokens.is_empty() {
            continue;
        }

        let symbols: Vec<&str> = swap
            .input_tokens
            .iter()
            .chain(&swap.output_tokens)
            .filter_map(|t| t.symbol.as_deref())
            .collect();
        swap.path = Some(symbols.join(" → "));

        if swap.input_tokens.len() == 1 && swap.output_tokens.len() == 1 {
            let input = swap.input_tokens[0].amount;
            let output = swap.output_tokens[0].amount;
            if input > 0.0 {
                swap.rate = Some(output / input);
            }
        }
    }

    swaps.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then(b.block_number.cmp(&a.block_number))
    });
    swaps
}
