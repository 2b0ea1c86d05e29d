//! Transaction construction
//!
//! Turns a finalized [`SwapDecision`] into an immutable [`UnsignedTransaction`]
//! ready for signing. Validation happens up front and each violation is a
//! distinct error kind; everything after validation is read-only chain
//! queries (balance, decimals, nonce, gas). Nothing here signs or submits.

use super::router::{approve_calldata, RouterCall};
use crate::advisor::SwapDecision;
use crate::chain::ChainClient;
use crate::config::ExecutionConfig;
use crate::quote::format_base_units;
use crate::registry::Registry;
use crate::{Error, Result};
use alloy::network::TransactionBuilder as _;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use chrono::Utc;
use std::sync::Arc;

/// A fully-specified transaction awaiting signature.
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub nonce: u64,
    pub chain_id: u64,
    /// The decision this transaction realizes, kept for display and audit.
    pub decision: SwapDecision,
    /// Slippage-bounded output floor, zero for approval transactions.
    pub min_amount_out: U256,
    pub path: Vec<Address>,
}

impl UnsignedTransaction {
    pub fn to_request(&self, from: Address) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(from)
            .with_to(self.to)
            .with_input(self.data.clone())
            .with_value(self.value)
            .with_nonce(self.nonce)
            .with_chain_id(self.chain_id)
            .with_gas_limit(self.gas_limit)
            .with_gas_price(self.gas_price)
    }
}

pub struct TransactionBuilder {
    chain: Arc<dyn ChainClient>,
    registry: Arc<Registry>,
    config: ExecutionConfig,
}

impl TransactionBuilder {
    pub fn new(chain: Arc<dyn ChainClient>, registry: Arc<Registry>, config: ExecutionConfig) -> Self {
        Self {
            chain,
            registry,
            config,
        }
    }

    /// Build the swap transaction itself.
    ///
    /// `destination` overrides the recipient of the swapped tokens; it
    /// defaults to the sending wallet.
    pub async fn build_swap(
        &self,
        decision: &SwapDecision,
        from: Address,
        destination: Option<&str>,
    ) -> Result<UnsignedTransaction> {
        validate_decision(decision)?;

        let from_native = Registry::is_native(&decision.from_token);
        let to_native = Registry::is_native(&decision.to_token);

        let from_entry = self.lookup_token(&decision.from_token)?;
        self.lookup_token(&decision.to_token)?;

        let router = self
            .registry
            .router(&decision.dex)
            .ok_or_else(|| Error::UnknownDex(decision.dex.clone()))?;

        let recipient = match destination {
            Some(raw) => raw
                .parse::<Address>()
                .map_err(|_| Error::InvalidAddress(raw.to_string()))?,
            None => from,
        };

        let decimals = if from_native {
            18
        } else {
            self.chain.token_decimals(from_entry).await?
        };
        let amount_in = to_base_units(decision.amount, decimals)?;

        self.check_balance(&decision.from_token, from_entry, from, from_native, amount_in, decimals)
            .await?;

        let path = self.resolve_path(&decision.from_token, &decision.to_token)?;
        let deadline = U256::from(
            (Utc::now() + chrono::Duration::minutes(self.config.deadline_minutes as i64))
                .timestamp() as u64,
        );
        let min_amount_out = min_amount_out(amount_in, decision.slippage_pct);

        let call = RouterCall::select(
            from_native,
            to_native,
            amount_in,
            min_amount_out,
            path.clone(),
            recipient,
            deadline,
        );
        let data = Bytes::from(call.calldata());
        let value = call.value();

        let nonce = self.chain.nonce(from).await?;
        let gas_price = self.chain.gas_price().await?;
        let gas_limit = self.estimate_with_fallback(from, router, value, &data).await;

        tracing::info!(
            from_token = %decision.from_token,
            to_token = %decision.to_token,
            dex = %decision.dex,
            %amount_in,
            %min_amount_out,
            gas_limit,
            "swap transaction built"
        );

        Ok(UnsignedTransaction {
            to: router,
            data,
            value,
            gas_limit,
            gas_price,
            nonce,
            chain_id: self.chain.chain_id(),
            decision: decision.clone(),
            min_amount_out,
            path,
        })
    }

    /// Build the allowance grant that must confirm before a token-funded
    /// swap. Returns `None` when the source is the native asset.
    pub async fn build_approval(
        &self,
        decision: &SwapDecision,
        from: Address,
    ) -> Result<Option<UnsignedTransaction>> {
        if Registry::is_native(&decision.from_token) {
            return Ok(None);
        }

        let token = self.lookup_token(&decision.from_token)?;
        let router = self
            .registry
            .router(&decision.dex)
            .ok_or_else(|| Error::UnknownDex(decision.dex.clone()))?;

        let data = Bytes::from(approve_calldata(router));
        let nonce = self.chain.nonce(from).await?;
        let gas_price = self.chain.gas_price().await?;
        let gas_limit = self
            .estimate_with_fallback(from, token, U256::ZERO, &data)
            .await;

        tracing::info!(token = %decision.from_token, dex = %decision.dex, "approval transaction built");

        Ok(Some(UnsignedTransaction {
            to: token,
            data,
            value: U256::ZERO,
            gas_limit,
            gas_price,
            nonce,
            chain_id: self.chain.chain_id(),
            decision: decision.clone(),
            min_amount_out: U256::ZERO,
            path: Vec::new(),
        }))
    }

    fn lookup_token(&self, symbol: &str) -> Result<Address> {
        self.registry
            .token(symbol)
            .map(|t| t.address)
            .ok_or_else(|| Error::UnknownToken(symbol.to_string()))
    }

    fn resolve_path(&self, from_token: &str, to_token: &str) -> Result<Vec<Address>> {
        // Direct pairs only; router paths always run over wrapped-native.
        let first = self
            .registry
            .resolve_hop(from_token)
            .ok_or_else(|| Error::UnknownToken(from_token.to_string()))?;
        let second = self
            .registry
            .resolve_hop(to_token)
            .ok_or_else(|| Error::UnknownToken(to_token.to_string()))?;
        Ok(vec![first, second])
    }

    async fn check_balance(
        &self,
        symbol: &str,
        token: Address,
        owner: Address,
        native: bool,
        needed: U256,
        decimals: u8,
    ) -> Result<()> {
        let have = if native {
            self.chain.native_balance(owner).await?
        } else {
            self.chain.token_balance(token, owner).await?
        };

        if have < needed {
            return Err(Error::InsufficientBalance {
                symbol: symbol.to_string(),
                have: format_base_units(have, decimals),
                need: format_base_units(needed, decimals),
            });
        }
        Ok(())
    }

    /// Dry-run estimation with margin; a node that refuses to simulate gets
    /// the conservative fixed limit instead of failing the build.
    async fn estimate_with_fallback(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: &Bytes,
    ) -> u64 {
        let probe = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_value(value)
            .with_input(data.clone());

        match self.chain.estimate_gas(probe).await {
            Ok(estimate) => estimate.saturating_mul(100 + self.config.gas_margin_percent) / 100,
            Err(e) => {
                tracing::warn!(error = %e, fallback = self.config.fallback_gas_limit, "gas estimation failed");
                self.config.fallback_gas_limit
            }
        }
    }
}

fn validate_decision(decision: &SwapDecision) -> Result<()> {
    if !(decision.amount > 0.0) {
        return Err(Error::InvalidDecision(format!(
            "amount must be positive, got {}",
            decision.amount
        )));
    }
    if decision.from_token == decision.to_token {
        return Err(Error::InvalidDecision(format!(
            "cannot swap {} to itself",
            decision.from_token
        )));
    }
    if !(0.0..100.0).contains(&decision.slippage_pct) {
        return Err(Error::InvalidDecision(format!(
            "slippage must be in [0, 100), got {}",
            decision.slippage_pct
        )));
    }
    Ok(())
}

/// Convert a human-readable amount to base units at the given precision.
///
/// Goes through a fixed-point decimal string rather than float
/// multiplication so representable amounts convert exactly.
pub fn to_base_units(amount: f64, decimals: u8) -> Result<U256> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidDecision(format!(
            "amount not representable: {}",
            amount
        )));
    }

    let fixed = format!("{:.*}", decimals as usize, amount);
    let digits: String = fixed.chars().filter(|c| *c != '.').collect();
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(trimmed, 10)
        .map_err(|_| Error::InvalidDecision(format!("amount not representable: {}", amount)))
}

/// Slippage-bounded output floor.
///
/// Slippage is floored to whole parts-per-million and applied with integer
/// flooring division, so the bound is never looser than requested.
pub fn min_amount_out(amount_in: U256, slippage_pct: f64) -> U256 {
    let ppm = (slippage_pct * 10_000.0).floor() as u64;
    let ppm = ppm.min(1_000_000);
    amount_in * U256::from(1_000_000 - ppm) / U256::from(1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_amount_out_floors_at_half_percent() {
        assert_eq!(
            min_amount_out(U256::from(1_000_000u64), 0.5),
            U256::from(995_000u64)
        );
    }

    #[test]
    fn min_amount_out_edge_slippages() {
        assert_eq!(
            min_amount_out(U256::from(1_000u64), 0.0),
            U256::from(1_000u64)
        );
        // 0.33% of 1000 floors down
        assert_eq!(
            min_amount_out(U256::from(1_000u64), 0.33),
            U256::from(996u64)
        );
        assert_eq!(min_amount_out(U256::from(1_000u64), 100.0), U256::ZERO);
    }

    #[test]
    fn sub_ppm_slippage_never_loosens_the_floor() {
        // 0.00006% is 0.6 ppm; flooring keeps the full amount rather than
        // rounding up to a whole ppm of slack
        assert_eq!(
            min_amount_out(U256::from(1_000_000u64), 0.00006),
            U256::from(1_000_000u64)
        );
    }

    #[test]
    fn base_unit_conversion_is_exact_for_decimal_amounts() {
        assert_eq!(
            to_base_units(2.5, 18).unwrap(),
            U256::from(2_500_000_000_000_000_000u128)
        );
        assert_eq!(to_base_units(100.0, 6).unwrap(), U256::from(100_000_000u64));
        assert_eq!(to_base_units(0.000001, 6).unwrap(), U256::from(1u64));
        assert_eq!(to_base_units(0.0, 18).unwrap(), U256::ZERO);
    }

    #[test]
    fn base_unit_conversion_rejects_non_finite() {
        assert!(to_base_units(f64::NAN, 18).is_err());
        assert!(to_base_units(f64::INFINITY, 18).is_err());
        assert!(to_base_units(-1.0, 18).is_err());
    }

    #[test]
    fn decision_invariants_are_enforced() {
        let decision = |amount: f64, from: &str, to: &str, slippage: f64| SwapDecision {
            from_token: from.to_string(),
            to_token: to.to_string(),
            amount,
            dex: "Uniswap V2".to_string(),
            slippage_pct: slippage,
        };

        assert!(validate_decision(&decision(1.0, "ETH", "USDC", 0.5)).is_ok());
        assert!(matches!(
            validate_decision(&decision(0.0, "ETH", "USDC", 0.5)),
            Err(Error::InvalidDecision(_))
        ));
        assert!(matches!(
            validate_decision(&decision(1.0, "ETH", "ETH", 0.5)),
            Err(Error::InvalidDecision(_))
        ));
        assert!(matches!(
            validate_decision(&decision(1.0, "ETH", "USDC", 100.0)),
            Err(Error::InvalidDecision(_))
        ));
        assert!(matches!(
            validate_decision(&decision(1.0, "ETH", "USDC", -0.1)),
            Err(Error::InvalidDecision(_))
        ));
    }
}
