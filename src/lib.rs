//! DEX Swap Advisor
//!
//! Recommends and optionally executes token-swap paths on decentralized
//! exchanges. A free-text query is parsed into a structured intent, enriched
//! with the wallet's historical swap activity and a live aggregator quote,
//! and handed to a language model for a recommendation. A finalized decision
//! can then be built into a slippage-bounded router transaction and executed
//! (or simulated) against the chain.
//!
//! # Security Model
//!
//! - Private keys are accepted per session, held only in memory, and never
//!   logged or written to disk
//! - The language model's output is untrusted: every decision is re-validated
//!   against the token registry and live balances before anything is signed
//! - Simulate mode runs the full build pipeline but never broadcasts

pub mod advisor;
pub mod chain;
pub mod config;
pub mod executor;
pub mod history;
pub mod intent;
pub mod quote;
pub mod registry;
pub mod server;
pub mod service;
pub mod similarity;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use advisor::{Advice, SwapDecision};
pub use config::{Config, Network, RpcConfig};
pub use error::{Error, Result};
pub use executor::{ExecutionResult, ExecutionState};
pub use service::SwapService;
