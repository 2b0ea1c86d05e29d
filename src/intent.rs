//! Free-text swap query parsing
//!
//! Turns requests like "swap 2.5 ETH to USDC" into a structured [`SwapIntent`].
//! The matching is deliberately lenient and never errors: an indeterminate
//! query yields an empty intent and callers fall back to generic advice.
//! Keeping the strategy behind this one module means it can be replaced by a
//! stricter grammar without touching callers.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A parsed swap request. Symbols are uppercase tickers, not yet resolved
/// to addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapIntent {
    pub from_token: Option<String>,
    pub to_token: Option<String>,
    pub amount: Option<f64>,
}

impl SwapIntent {
    pub fn empty() -> Self {
        Self {
            from_token: None,
            to_token: None,
            amount: None,
        }
    }

    /// Whether both endpoints were recognized.
    pub fn is_complete(&self) -> bool {
        self.from_token.is_some() && self.to_token.is_some()
    }
}

fn directional_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:from|swap|convert|exchange)\s+(\d+(?:\.\d+)?)?\s*([A-Za-z]+)\s+(?:to|for|into)\s+([A-Za-z]+)",
        )
        .expect("directional pattern")
    })
}

fn ticker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z]{2,}").expect("ticker pattern"))
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*([A-Za-z]+)").expect("amount pattern"))
}

/// Parse a free-text swap query.
///
/// A directional cue ("swap X to Y") wins; otherwise the first two distinct
/// ticker-like tokens are taken in order of appearance, with the amount
/// attached only when its adjacent ticker matches the first token. Fewer than
/// two tickers yields an empty intent.
pub fn parse(text: &str) -> SwapIntent {
    if let Some(caps) = directional_re().captures(text) {
        let amount = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
        let from_token = caps[2].to_uppercase();
        let to_token = caps[3].to_uppercase();
        return SwapIntent {
            from_token: Some(from_token),
            to_token: Some(to_token),
            amount,
        };
    }

    // Ticker-like tokens after case folding, deduplicated in order of
    // first appearance.
    let folded = text.to_uppercase();
    let mut tickers: Vec<&str> = Vec::new();
    for m in ticker_re().find_iter(&folded) {
        if !tickers.contains(&m.as_str()) {
            tickers.push(m.as_str());
        }
    }

    if tickers.len() < 2 {
        return SwapIntent::empty();
    }

    let from_token = tickers[0].to_string();
    let to_token = tickers[1].to_string();

    // First number/ticker pair whose ticker matches the first token.
    let amount = amount_re().captures_iter(text).find_map(|caps| {
        if caps[2].to_uppercase() == from_token {
            caps[1].parse::<f64>().ok()
        } else {
            None
        }
    });

    SwapIntent {
        from_token: Some(from_token),
        to_token: Some(to_token),
        amount,
    }
}
