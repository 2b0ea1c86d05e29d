//! Swap service
//!
//! One context object wiring the whole pipeline together: query parsing,
//! historical ranking, live quotes, advice synthesis, and transaction
//! execution. The session wallet lives here behind a lock; it is the only
//! mutable state shared between requests, and replacing it mid-flight is
//! the caller's responsibility.

use crate::advisor::{Advice, Advisor, Completion, GroqClient, QuoteContext, SwapDecision};
use crate::chain::{ChainClient, RpcChainClient};
use crate::config::{Config, RpcConfig};
use crate::executor::{ExecutionResult, SwapExecutor, TransactionBuilder};
use crate::history::{extract_swaps, AlchemyClient, HistoricalSwap, TransferLogFetcher};
use crate::intent;
use crate::quote::{OneInchClient, QuoteClient};
use crate::registry::Registry;
use crate::similarity::{rank, RestSimilarityIndex, SimilaritySearch};
use crate::wallet::SessionWallet;
use crate::{Error, Result};
use alloy::primitives::Address;
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Nearest-neighbor matches requested per historical ranking.
const HISTORY_TOP_K: usize = 10;
/// Transfer records requested per direction when listing swap history.
const HISTORY_MAX_RESULTS: usize = 100;

pub struct SwapService {
    registry: Arc<Registry>,
    fetcher: Arc<dyn TransferLogFetcher>,
    similarity: Option<Arc<dyn SimilaritySearch>>,
    quote_client: Arc<dyn QuoteClient>,
    advisor: Advisor,
    executor: SwapExecutor,
    wallet: RwLock<Option<SessionWallet>>,
}

impl SwapService {
    pub fn new(
        config: &Config,
        registry: Arc<Registry>,
        chain: Arc<dyn ChainClient>,
        fetcher: Arc<dyn TransferLogFetcher>,
        similarity: Option<Arc<dyn SimilaritySearch>>,
        quote_client: Arc<dyn QuoteClient>,
        llm: Box<dyn Completion>,
    ) -> Self {
        let builder =
            TransactionBuilder::new(chain.clone(), registry.clone(), config.execution.clone());
        let executor = SwapExecutor::new(chain, builder, config.execution.clone());

        Self {
            registry,
            fetcher,
            similarity,
            quote_client,
            advisor: Advisor::new(llm),
            executor,
            wallet: RwLock::new(None),
        }
    }

    /// Assemble the production service from configuration and environment.
    pub fn from_env(config: &Config) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let rpc = RpcConfig::from_env();
        let chain: Arc<dyn ChainClient> = Arc::new(RpcChainClient::from_rpc_config(
            &rpc,
            config.network.chain_id(),
        )?);

        let chain_data_key = std::env::var(crate::config::CHAIN_DATA_API_KEY_ENV)
            .map_err(|_| {
                Error::Config(format!(
                    "{} not set",
                    crate::config::CHAIN_DATA_API_KEY_ENV
                ))
            })?;
        let fetcher: Arc<dyn TransferLogFetcher> =
            Arc::new(AlchemyClient::new(&chain_data_key, config.retry.clone()));

        let similarity: Option<Arc<dyn SimilaritySearch>> = config
            .endpoints
            .similarity_url
            .clone()
            .map(|url| Arc::new(RestSimilarityIndex::new(url)) as Arc<dyn SimilaritySearch>);

        let quote_key = std::env::var(crate::config::QUOTE_API_KEY_ENV).ok();
        let quote_client: Arc<dyn QuoteClient> = Arc::new(OneInchClient::new(
            config.endpoints.quote_url.clone(),
            quote_key,
        ));

        let llm = Box::new(GroqClient::from_env(config.llm.clone())?);

        Ok(Self::new(
            config,
            registry,
            chain,
            fetcher,
            similarity,
            quote_client,
            llm,
        ))
    }

    /// Parse a free-text query and synthesize swap advice for it.
    ///
    /// Historical ranking and live quote are both best-effort contributions;
    /// either collaborator failing narrows the prompt, never the response.
    pub async fn parse_and_get_best_path(&self, query: &str) -> Advice {
        let intent = intent::parse(query);
        tracing::debug!(?intent, "parsed swap query");

        if !intent.is_complete() {
            return self.advisor.synthesize(query, &intent, &[], None).await;
        }

        let historical = match (&self.similarity, &intent.from_token, &intent.to_token) {
            (Some(index), Some(from), Some(to)) => {
                rank(index.as_ref(), from, to, HISTORY_TOP_K).await
            }
            _ => Vec::new(),
        };

        let quote = self.fetch_quote(&intent).await;

        self.advisor
            .synthesize(query, &intent, &historical, quote.as_ref())
            .await
    }

    async fn fetch_quote(&self, intent: &intent::SwapIntent) -> Option<QuoteContext> {
        let amount = intent.amount?;
        let from = self.registry.token(intent.from_token.as_deref()?)?;
        let to = self.registry.token(intent.to_token.as_deref()?)?;

        let amount_in = crate::executor::to_base_units(amount, from.decimals).ok()?;
        match self
            .quote_client
            .quote(from.address, to.address, amount_in)
            .await
        {
            Ok(quote) => Some(QuoteContext {
                quote,
                to_decimals: to.decimals,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "quote unavailable, advising without it");
                None
            }
        }
    }

    /// Load a session wallet from a private key, replacing any previous one.
    pub async fn load_wallet(&self, key: &SecretString) -> Result<Address> {
        let wallet = SessionWallet::from_key(key)?;
        let address = wallet.address();
        *self.wallet.write().await = Some(wallet);
        tracing::info!(%address, "session wallet loaded");
        Ok(address)
    }

    pub async fn wallet_address(&self) -> Option<Address> {
        self.wallet.read().await.as_ref().map(|w| w.address())
    }

    /// Build and execute (or simulate) a finalized swap decision.
    pub async fn build_and_execute(
        &self,
        decision: &SwapDecision,
        destination: Option<&str>,
        simulate: bool,
    ) -> Result<ExecutionResult> {
        let wallet = self
            .wallet
            .read()
            .await
            .clone()
            .ok_or(Error::NoWallet)?;

        self.executor
            .execute(decision, &wallet, destination, simulate)
            .await
    }

    /// A wallet's historical swaps, newest first.
    pub async fn swap_history(&self, wallet: &str) -> Result<Vec<HistoricalSwap>> {
        let address = wallet
            .parse::<Address>()
            .map_err(|_| Error::InvalidAddress(wallet.to_string()))?;

        let external = self
            .fetcher
            .external_transfers(address, HISTORY_MAX_RESULTS)
            .await?;
        let tokens = self
            .fetcher
            .token_transfers(address, HISTORY_MAX_RESULTS)
            .await?;

        let swaps = extract_swaps(&self.registry, &external, &tokens);
        tracing::debug!(wallet = %address, count = swaps.len(), "extracted swap history");
        Ok(swaps)
    }
}
