//! Advice synthesis
//!
//! Combines the parsed intent, historical path statistics, and a live quote
//! into a prompt for the language model, then extracts the machine-readable
//! swap decision from the model's reply. The model is untrusted: its output
//! is advice plus an optional [`SwapDecision`] that downstream validation
//! (token registry, balance checks) must still approve before anything is
//! built or signed.

pub mod llm;

use crate::intent::SwapIntent;
use crate::quote::{format_base_units, QuoteResult};
use crate::similarity::HistoricalPathStat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub use llm::{Completion, GroqClient};

const SYSTEM_PROMPT: &str = "\
You are an expert in cryptocurrency swap optimization, specializing in DeFi and DEX routing strategies.
Your goal is to provide clear, accurate, and efficient swap paths based on:
1. Historical transaction data (when provided)
2. Current market conditions
3. Gas optimization techniques
4. DEX-specific advantages and liquidity patterns

For each swap recommendation:
- First recommend the optimal path(s) in a concise format
- Explain WHY this path is optimal (considering fees, slippage, gas, etc.)
- If relevant, suggest alternative paths for different priorities (speed vs. cost)
- Provide step-by-step instructions on how to execute the swap

When responding to queries with historical data, analyze patterns to identify consistently efficient routes.";

/// The machine-readable decision embedded at the end of the model's advice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapDecision {
    pub from_token: String,
    pub to_token: String,
    pub amount: f64,
    pub dex: String,
    #[serde(rename = "slippage")]
    pub slippage_pct: f64,
}

/// Synthesized advice: prose for the user, an optional decision for the
/// transaction builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub text: String,
    pub decision: Option<SwapDecision>,
}

/// A live-quote contribution to the prompt, pre-resolved to the destination
/// token's display precision.
#[derive(Debug, Clone)]
pub struct QuoteContext {
    pub quote: QuoteResult,
    pub to_decimals: u8,
}

pub struct Advisor {
    llm: Box<dyn Completion>,
}

impl Advisor {
    pub fn new(llm: Box<dyn Completion>) -> Self {
        Self { llm }
    }

    /// Generate advice for a query. Never errors: a failed completion
    /// produces an apologetic message with no decision attached.
    pub async fn synthesize(
        &self,
        query: &str,
        intent: &SwapIntent,
        historical: &[HistoricalPathStat],
        quote: Option<&QuoteContext>,
    ) -> Advice {
        if !intent.is_complete() {
            let fallback_query = format!(
                "Could not parse swap details from query: '{}'. \
                 Please advise on best practices for crypto swaps.",
                query
            );
            let text = self.complete_or_apologize(&fallback_query).await;
            return Advice {
                text,
                decision: None,
            };
        }

        let prompt = enriched_prompt(intent, historical, quote);
        let text = self.complete_or_apologize(&prompt).await;
        let decision = extract_decision(&text);

        Advice { text, decision }
    }

    async fn complete_or_apologize(&self, prompt: &str) -> String {
        match self.llm.complete(SYSTEM_PROMPT, prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "completion backend failed");
                format!(
                    "Unable to generate swap advice. Please try again later. Error: {}",
                    e
                )
            }
        }
    }
}

fn enriched_prompt(
    intent: &SwapIntent,
    historical: &[HistoricalPathStat],
    quote: Option<&QuoteContext>,
) -> String {
    let from_token = intent.from_token.as_deref().unwrap_or_default();
    let to_token = intent.to_token.as_deref().unwrap_or_default();

    let amount_line = intent
        .amount
        .map(|a| format!("- Amount: {} {}\n", a, from_token))
        .unwrap_or_default();

    let historical_context = historical
        .first()
        .map(|best| {
            format!(
                "Based on historical swap data:\n\
                 - Path: {} on {}\n\
                 - Average Rate: {:.6}\n\
                 - Times Used: {}\n",
                best.path, best.dex, best.avg_rate, best.count
            )
        })
        .unwrap_or_default();

    let quote_context = quote
        .map(|q| {
            format!(
                "Based on aggregator quote data:\n\
                 - Estimated Amount Out: {} {}\n\
                 - Estimated Gas: {}\n",
                format_base_units(q.quote.estimated_amount_out, q.to_decimals),
                to_token,
                q.quote.estimated_gas
            )
        })
        .unwrap_or_default();

    let amount_json = intent
        .amount
        .map(|a| a.to_string())
        .unwrap_or_else(|| "null".to_string());

    format!(
        "I need to find the best swap path for the following:\n\
         - From: {from_token}\n\
         - To: {to_token}\n\
         {amount_line}\n\
         {historical_context}\n\
         {quote_context}\n\
         Based on the above data and your knowledge of DeFi, what is the optimal swap path?\n\
         Consider gas costs, slippage, and overall efficiency.\n\
         Please provide step-by-step instructions on how to execute this swap.\n\
         \n\
         At the end of your response, include a JSON object with the following structure:\n\
         {{\n\
             \"from_token\": \"{from_token}\",\n\
             \"to_token\": \"{to_token}\",\n\
             \"amount\": {amount_json},\n\
             \"dex\": \"Uniswap V3\",\n\
             \"slippage\": 0.5\n\
         }}\n"
    )
}

fn decision_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Greedy across lines: first '{' through last '}', so prose braces
    // earlier in the reply do not truncate the block.
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("decision pattern"))
}

/// Pull the trailing JSON decision out of free-form advice text.
pub fn extract_decision(text: &str) -> Option<SwapDecision> {
    let block = decision_re().find(text)?;
    match serde_json::from_str::<SwapDecision>(block.as_str()) {
        Ok(decision) => Some(decision),
        Err(e) => {
            tracing::debug!(error = %e, "advice contained no parseable decision");
            None
        }
    }
}
