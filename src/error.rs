//! Error types for the swap advisor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("unknown DEX: {0}")]
    UnknownDex(String),

    #[error("no wallet connected")]
    NoWallet,

    #[error("insufficient {symbol} balance: have {have}, need {need}")]
    InsufficientBalance {
        symbol: String,
        have: String,
        need: String,
    },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid swap decision: {0}")]
    InvalidDecision(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("transaction broadcast rejected: {0}")]
    SubmissionFailure(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
