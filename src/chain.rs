//! Chain RPC access
//!
//! [`ChainClient`] is the seam between the swap pipeline and the node:
//! balance and decimals queries, gas price, nonce, gas estimation, raw
//! transaction submission, and receipt polling. The production
//! implementation talks JSON-RPC through an alloy HTTP provider; tests
//! substitute a mock.

use crate::config::RpcConfig;
use crate::{Error, Result};
use alloy::consensus::TxEnvelope;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    async fn native_balance(&self, owner: Address) -> Result<U256>;

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256>;

    async fn token_decimals(&self, token: Address) -> Result<u8>;

    async fn gas_price(&self) -> Result<u128>;

    async fn nonce(&self, owner: Address) -> Result<u64>;

    /// Dry-run gas estimation for a prospective transaction.
    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64>;

    /// Broadcast a signed transaction. Single attempt: retrying a broadcast
    /// risks duplicate submission.
    async fn submit(&self, tx: TxEnvelope) -> Result<B256>;

    /// Inclusion status for a submitted transaction: `None` while pending,
    /// `Some(true)` on success, `Some(false)` when reverted.
    async fn receipt_status(&self, hash: B256) -> Result<Option<bool>>;
}

/// JSON-RPC chain client over an alloy HTTP provider
pub struct RpcChainClient {
    rpc_url: url::Url,
    chain_id: u64,
}

impl RpcChainClient {
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let rpc_url: url::Url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid RPC URL: {}", e)))?;
        Ok(Self { rpc_url, chain_id })
    }

    pub fn from_rpc_config(config: &RpcConfig, chain_id: u64) -> Result<Self> {
        let url = config
            .get(chain_id)
            .ok_or_else(|| Error::Config(format!("no RPC URL configured for chain {}", chain_id)))?;
        Self::new(url, chain_id)
    }

    fn provider(&self) -> impl Provider {
        ProviderBuilder::new().connect_http(self.rpc_url.clone())
    }

    /// eth_call against an ERC-20 view function, returning the raw word.
    async fn call_erc20_word(&self, token: Address, calldata: Vec<u8>) -> Result<U256> {
        let tx = TransactionRequest::default()
            .to(token)
            .input(Bytes::from(calldata).into());

        let result = self
            .provider()
            .call(tx)
            .await
            .map_err(|e| Error::Rpc(format!("eth_call failed: {}", e)))?;

        if result.len() >= 32 {
            Ok(U256::from_be_slice(&result[..32]))
        } else {
            Ok(U256::ZERO)
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        self.provider()
            .get_balance(owner)
            .await
            .map_err(|e| Error::Rpc(format!("failed to get balance: {}", e)))
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        // balanceOf(address) selector + padded owner
        let mut calldata = vec![0x70, 0xa0, 0x82, 0x31];
        calldata.extend_from_slice(&[0u8; 12]);
        calldata.extend_from_slice(owner.as_slice());

        self.call_erc20_word(token, calldata).await
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        // decimals() selector
        let calldata = vec![0x31, 0x3c, 0xe5, 0x67];
        let word = self.call_erc20_word(token, calldata).await?;
        Ok(word.saturating_to::<u8>())
    }

    async fn gas_price(&self) -> Result<u128> {
        self.provider()
            .get_gas_price()
            .await
            .map_err(|e| Error::Rpc(format!("failed to get gas price: {}", e)))
    }

    async fn nonce(&self, owner: Address) -> Result<u64> {
        self.provider()
            .get_transaction_count(owner)
            .await
            .map_err(|e| Error::Rpc(format!("failed to get nonce: {}", e)))
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64> {
        self.provider()
            .estimate_gas(tx)
            .await
            .map_err(|e| Error::Rpc(format!("gas estimation failed: {}", e)))
    }

    async fn submit(&self, tx: TxEnvelope) -> Result<B256> {
        let pending = self
            .provider()
            .send_tx_envelope(tx)
            .await
            .map_err(|e| Error::SubmissionFailure(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn receipt_status(&self, hash: B256) -> Result<Option<bool>> {
        let receipt = self
            .provider()
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| Error::Rpc(format!("receipt lookup failed: {}", e)))?;
        Ok(receipt.map(|r| r.status()))
    }
}
