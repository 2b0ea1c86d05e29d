//! Swap execution state machine
//!
//! Drives a built transaction through sign, submit, and confirmation:
//! `Idle → Built → Signed → Submitted → Confirmed | Reverted | TimedOut`.
//! The swap is validated and built before anything is broadcast; only then
//! do token-funded swaps run their prerequisite approval through the same
//! cycle, and the swap is rebuilt on fresh chain state once the approval
//! has confirmed. Simulate mode stops after building and never touches the
//! broadcast path.

pub mod builder;
pub mod router;

use crate::advisor::SwapDecision;
use crate::chain::ChainClient;
use crate::config::ExecutionConfig;
use crate::wallet::SessionWallet;
use crate::{Error, Result};
use alloy::consensus::TxEnvelope;
use alloy::network::TransactionBuilder as _;
use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use builder::{min_amount_out, to_base_units, TransactionBuilder, UnsignedTransaction};
pub use router::RouterCall;

/// Placeholder identifier returned for simulate-mode runs.
pub const SIMULATED_TX_ID: &str = "simulated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Idle,
    Built,
    Signed,
    Submitted,
    Confirmed,
    Reverted,
    /// Confirmation wait elapsed; the transaction may still land later.
    TimedOut,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Confirmed | ExecutionState::Reverted | ExecutionState::TimedOut
        )
    }
}

/// Terminal outcome of one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub state: ExecutionState,
    pub tx_identifier: Option<String>,
    pub error: Option<String>,
}

impl ExecutionResult {
    fn confirmed(tx_identifier: String) -> Self {
        Self {
            state: ExecutionState::Confirmed,
            tx_identifier: Some(tx_identifier),
            error: None,
        }
    }
}

pub struct SwapExecutor {
    chain: Arc<dyn ChainClient>,
    builder: TransactionBuilder,
    config: ExecutionConfig,
}

impl SwapExecutor {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        builder: TransactionBuilder,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            chain,
            builder,
            config,
        }
    }

    /// Run a decision to a terminal state.
    ///
    /// Build-precondition violations (unknown token, insufficient balance,
    /// bad destination) and broadcast rejections surface as errors; outcomes
    /// of an accepted broadcast (confirmed, reverted, timed out) come back
    /// as an [`ExecutionResult`].
    pub async fn execute(
        &self,
        decision: &SwapDecision,
        wallet: &SessionWallet,
        destination: Option<&str>,
        simulate: bool,
    ) -> Result<ExecutionResult> {
        let from = wallet.address();

        // The swap is validated and built before anything goes out. A
        // decision that cannot produce a valid swap (unknown token, short
        // balance, bad destination) must not leave an allowance behind.
        let mut tx = self.builder.build_swap(decision, from, destination).await?;

        if simulate {
            tracing::info!(
                to = %tx.to,
                min_amount_out = %tx.min_amount_out,
                "simulated swap, nothing broadcast"
            );
            return Ok(ExecutionResult::confirmed(SIMULATED_TX_ID.to_string()));
        }

        if let Some(approval) = self.builder.build_approval(decision, from).await? {
            let (state, hash) = self
                .run_to_terminal(&approval, wallet, self.config.approval_timeout())
                .await?;
            if state != ExecutionState::Confirmed {
                tracing::warn!(?state, %hash, "token approval did not confirm");
                return Ok(ExecutionResult {
                    state,
                    tx_identifier: Some(hash.to_string()),
                    error: Some(format!(
                        "token approval for {} did not confirm",
                        decision.from_token
                    )),
                });
            }
            tracing::info!(%hash, token = %decision.from_token, "token approval confirmed");

            // The approval consumed a nonce; rebuild on fresh chain state.
            tx = self.builder.build_swap(decision, from, destination).await?;
        }

        let (state, hash) = self
            .run_to_terminal(&tx, wallet, self.config.swap_timeout())
            .await?;

        let error = match state {
            ExecutionState::Confirmed => None,
            ExecutionState::Reverted => Some("swap reverted on-chain".to_string()),
            _ => Some("confirmation wait elapsed, outcome unknown".to_string()),
        };
        Ok(ExecutionResult {
            state,
            tx_identifier: Some(hash.to_string()),
            error,
        })
    }

    /// Sign, submit, and await inclusion of one built transaction.
    async fn run_to_terminal(
        &self,
        tx: &UnsignedTransaction,
        wallet: &SessionWallet,
        timeout: Duration,
    ) -> Result<(ExecutionState, B256)> {
        let envelope = self.sign(tx, wallet).await?;
        let hash = self.chain.submit(envelope).await?;
        tracing::info!(%hash, "transaction submitted");

        let state = self.await_inclusion(hash, timeout).await;
        Ok((state, hash))
    }

    async fn sign(&self, tx: &UnsignedTransaction, wallet: &SessionWallet) -> Result<TxEnvelope> {
        tx.to_request(wallet.address())
            .build(&wallet.ethereum_wallet())
            .await
            .map_err(|e| Error::Wallet(format!("signing failed: {}", e)))
    }

    async fn await_inclusion(&self, hash: B256, timeout: Duration) -> ExecutionState {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.chain.receipt_status(hash).await {
                Ok(Some(true)) => return ExecutionState::Confirmed,
                Ok(Some(false)) => return ExecutionState::Reverted,
                Ok(None) => {}
                // transient RPC trouble while polling is not an outcome
                Err(e) => tracing::warn!(%hash, error = %e, "receipt poll failed"),
            }

            if tokio::time::Instant::now() >= deadline {
                return ExecutionState::TimedOut;
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use alloy::consensus::Transaction as _;
    use alloy::primitives::{Address, Bytes, U256};
    use alloy::rpc::types::TransactionRequest;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::sync::Mutex;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn selector(data: &[u8]) -> String {
        data.iter().take(4).map(|b| format!("{:02x}", b)).collect()
    }

    struct MockChain {
        native_balance: U256,
        token_balance: U256,
        receipt: Option<bool>,
        calls: Mutex<Vec<String>>,
    }

    impl MockChain {
        fn funded() -> Self {
            Self {
                native_balance: U256::from(10u64) * U256::from(10u64).pow(U256::from(18)),
                token_balance: U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(18)),
                receipt: Some(true),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn log(&self, entry: String) {
            self.calls.lock().unwrap().push(entry);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainClient for MockChain {
        fn chain_id(&self) -> u64 {
            1
        }

        async fn native_balance(&self, _owner: Address) -> crate::Result<U256> {
            self.log("native_balance".to_string());
            Ok(self.native_balance)
        }

        async fn token_balance(&self, _token: Address, _owner: Address) -> crate::Result<U256> {
            self.log("token_balance".to_string());
            Ok(self.token_balance)
        }

        async fn token_decimals(&self, _token: Address) -> crate::Result<u8> {
            Ok(18)
        }

        async fn gas_price(&self) -> crate::Result<u128> {
            Ok(30_000_000_000)
        }

        async fn nonce(&self, _owner: Address) -> crate::Result<u64> {
            Ok(7)
        }

        async fn estimate_gas(&self, tx: TransactionRequest) -> crate::Result<u64> {
            let data = tx.input.input().cloned().unwrap_or_else(Bytes::new);
            self.log(format!("estimate:{}", selector(&data)));
            Ok(100_000)
        }

        async fn submit(&self, tx: TxEnvelope) -> crate::Result<B256> {
            self.log(format!("submit:{}", selector(tx.input())));
            Ok(*tx.tx_hash())
        }

        async fn receipt_status(&self, _hash: B256) -> crate::Result<Option<bool>> {
            self.log("receipt".to_string());
            Ok(self.receipt)
        }
    }

    fn test_config() -> ExecutionConfig {
        ExecutionConfig {
            swap_timeout_secs: 0,
            approval_timeout_secs: 0,
            poll_interval_ms: 1,
            ..ExecutionConfig::default()
        }
    }

    fn executor(chain: Arc<MockChain>) -> SwapExecutor {
        let registry = Arc::new(Registry::new());
        let builder = TransactionBuilder::new(chain.clone(), registry, test_config());
        SwapExecutor::new(chain, builder, test_config())
    }

    fn wallet() -> SessionWallet {
        SessionWallet::from_key(&SecretString::from(DEV_KEY)).unwrap()
    }

    fn decision(from: &str, to: &str) -> SwapDecision {
        SwapDecision {
            from_token: from.to_string(),
            to_token: to.to_string(),
            amount: 1.5,
            dex: "Uniswap V2".to_string(),
            slippage_pct: 0.5,
        }
    }

    const APPROVE: &str = "095ea7b3";
    const SWAP_TOKENS_FOR_ETH: &str = "18cbafe5";
    const SWAP_ETH_FOR_TOKENS: &str = "7ff36ab5";

    #[tokio::test]
    async fn simulate_never_broadcasts_and_reports_placeholder() {
        let chain = Arc::new(MockChain::funded());
        let result = executor(chain.clone())
            .execute(&decision("ETH", "USDC"), &wallet(), None, true)
            .await
            .unwrap();

        assert_eq!(result.state, ExecutionState::Confirmed);
        assert_eq!(result.tx_identifier.as_deref(), Some(SIMULATED_TX_ID));
        assert!(chain.calls().iter().all(|c| !c.starts_with("submit")));
    }

    #[tokio::test]
    async fn native_source_swap_skips_approval() {
        let chain = Arc::new(MockChain::funded());
        let result = executor(chain.clone())
            .execute(&decision("ETH", "USDC"), &wallet(), None, false)
            .await
            .unwrap();

        assert_eq!(result.state, ExecutionState::Confirmed);
        let submits: Vec<String> = chain
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("submit"))
            .collect();
        assert_eq!(submits, vec![format!("submit:{}", SWAP_ETH_FOR_TOKENS)]);
    }

    #[tokio::test]
    async fn approval_confirms_before_swap_is_submitted() {
        let chain = Arc::new(MockChain::funded());
        let result = executor(chain.clone())
            .execute(&decision("DAI", "ETH"), &wallet(), None, false)
            .await
            .unwrap();
        assert_eq!(result.state, ExecutionState::Confirmed);

        let calls = chain.calls();
        let position = |entry: &str| {
            calls
                .iter()
                .position(|c| c == entry)
                .unwrap_or_else(|| panic!("{} missing from {:?}", entry, calls))
        };

        let balance_read = position("token_balance");
        let approval_submitted = position(&format!("submit:{}", APPROVE));
        let swap_submitted = position(&format!("submit:{}", SWAP_TOKENS_FOR_ETH));
        let swap_rebuilt = calls
            .iter()
            .rposition(|c| c == &format!("estimate:{}", SWAP_TOKENS_FOR_ETH))
            .unwrap();

        // swap validated first, then approval, then the swap rebuilt and sent
        assert!(balance_read < approval_submitted);
        assert!(approval_submitted < swap_rebuilt);
        assert!(swap_rebuilt < swap_submitted);
    }

    #[tokio::test]
    async fn token_source_short_balance_grants_no_allowance() {
        let mut chain = MockChain::funded();
        chain.token_balance = U256::from(1u64);
        let chain = Arc::new(chain);

        let err = executor(chain.clone())
            .execute(&decision("DAI", "ETH"), &wallet(), None, false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientBalance { symbol, .. } if symbol == "DAI"));
        assert!(chain.calls().iter().all(|c| !c.starts_with("submit")));
    }

    #[tokio::test]
    async fn token_source_bad_destination_grants_no_allowance() {
        let chain = Arc::new(MockChain::funded());
        let err = executor(chain.clone())
            .execute(&decision("DAI", "ETH"), &wallet(), Some("0xnope"), false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidAddress(_)));
        assert!(chain.calls().iter().all(|c| !c.starts_with("submit")));
    }

    #[tokio::test]
    async fn unknown_token_fails_before_any_submission() {
        let chain = Arc::new(MockChain::funded());
        let err = executor(chain.clone())
            .execute(&decision("DOGE", "USDC"), &wallet(), None, false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnknownToken(symbol) if symbol == "DOGE"));
        assert!(chain.calls().iter().all(|c| !c.starts_with("submit")));
    }

    #[tokio::test]
    async fn insufficient_balance_fails_before_any_submission() {
        let mut chain = MockChain::funded();
        chain.native_balance = U256::from(1u64);
        let chain = Arc::new(chain);

        let err = executor(chain.clone())
            .execute(&decision("ETH", "USDC"), &wallet(), None, false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientBalance { symbol, .. } if symbol == "ETH"));
        assert!(chain.calls().iter().all(|c| !c.starts_with("submit")));
    }

    #[tokio::test]
    async fn invalid_destination_is_rejected() {
        let chain = Arc::new(MockChain::funded());
        let err = executor(chain)
            .execute(&decision("ETH", "USDC"), &wallet(), Some("0xnope"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn reverted_inclusion_is_reported_not_errored() {
        let mut chain = MockChain::funded();
        chain.receipt = Some(false);
        let chain = Arc::new(chain);

        let result = executor(chain)
            .execute(&decision("ETH", "USDC"), &wallet(), None, false)
            .await
            .unwrap();

        assert_eq!(result.state, ExecutionState::Reverted);
        assert!(result.tx_identifier.is_some());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn missing_receipt_times_out_as_indeterminate() {
        let mut chain = MockChain::funded();
        chain.receipt = None;
        let chain = Arc::new(chain);

        let result = executor(chain)
            .execute(&decision("ETH", "USDC"), &wallet(), None, false)
            .await
            .unwrap();

        assert_eq!(result.state, ExecutionState::TimedOut);
        assert!(result.tx_identifier.is_some());
    }

    #[tokio::test]
    async fn unconfirmed_approval_halts_before_swap() {
        let mut chain = MockChain::funded();
        chain.receipt = None; // approval never confirms
        let chain = Arc::new(chain);

        let result = executor(chain.clone())
            .execute(&decision("DAI", "ETH"), &wallet(), None, false)
            .await
            .unwrap();

        assert_eq!(result.state, ExecutionState::TimedOut);
        assert!(result.error.as_deref().unwrap().contains("approval"));
        let calls = chain.calls();
        assert!(!calls.contains(&format!("submit:{}", SWAP_TOKENS_FOR_ETH)));
        let submits = calls.iter().filter(|c| c.starts_with("submit")).count();
        assert_eq!(submits, 1);
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(ExecutionState::Confirmed.is_terminal());
        assert!(ExecutionState::Reverted.is_terminal());
        assert!(ExecutionState::TimedOut.is_terminal());
        assert!(!ExecutionState::Submitted.is_terminal());
        assert!(!ExecutionState::Built.is_terminal());
    }
}
