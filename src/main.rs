//! Swap Advisor CLI
//!
//! Command-line interface for the swap-path advisor and executor.

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use swap_advisor::{Config, Error, Result, SwapDecision, SwapService};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "swap-advisor")]
#[command(about = "AI-assisted DEX swap-path advisor and executor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
    },

    /// Ask for swap advice from a free-text query
    Advise {
        /// e.g. "swap 2.5 ETH to USDC"
        query: String,
    },

    /// List a wallet's historical DEX swaps
    History {
        /// Wallet address (0x...)
        wallet: String,
    },

    /// Build and execute (or simulate) a swap
    Swap {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Amount in the source token's units
        #[arg(long)]
        amount: f64,

        #[arg(long, default_value = "Uniswap V2")]
        dex: String,

        /// Maximum acceptable slippage percentage
        #[arg(long, default_value_t = 0.5)]
        slippage: f64,

        /// Recipient of the swapped tokens (defaults to the wallet)
        #[arg(long)]
        destination: Option<String>,

        /// Broadcast for real instead of simulating
        #[arg(long)]
        execute: bool,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load config
    let config = if let Some(config_path) = cli.config {
        let content =
            std::fs::read_to_string(&config_path).map_err(|e| Error::Config(e.to_string()))?;
        serde_json::from_str(&content)?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Serve { port } => {
            let service = Arc::new(SwapService::from_env(&config)?);
            load_wallet_from_env(&service).await;
            swap_advisor::server::serve(service, port).await?;
        }
        Commands::Advise { query } => {
            let service = SwapService::from_env(&config)?;
            let advice = service.parse_and_get_best_path(&query).await;
            println!("{}", advice.text);
            if let Some(decision) = advice.decision {
                println!("\n{}", serde_json::to_string_pretty(&decision)?);
            }
        }
        Commands::History { wallet } => {
            let service = SwapService::from_env(&config)?;
            let swaps = service.swap_history(&wallet).await?;
            println!("{}", serde_json::to_string_pretty(&swaps)?);
        }
        Commands::Swap {
            from,
            to,
            amount,
            dex,
            slippage,
            destination,
            execute,
        } => {
            let service = SwapService::from_env(&config)?;
            load_wallet_from_env(&service).await;

            let decision = SwapDecision {
                from_token: from.to_uppercase(),
                to_token: to.to_uppercase(),
                amount,
                dex,
                slippage_pct: slippage,
            };

            if !execute {
                tracing::info!("simulate mode, pass --execute to broadcast");
            }
            let result = service
                .build_and_execute(&decision, destination.as_deref(), !execute)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn load_wallet_from_env(service: &SwapService) {
    if let Ok(private_key) = std::env::var("WALLET_PRIVATE_KEY") {
        match service.load_wallet(&SecretString::from(private_key)).await {
            Ok(address) => {
                tracing::info!(%address, "Loaded wallet from WALLET_PRIVATE_KEY");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load wallet from WALLET_PRIVATE_KEY");
            }
        }
    } else {
        tracing::warn!("No WALLET_PRIVATE_KEY set - running in advisory-only mode");
    }
}
