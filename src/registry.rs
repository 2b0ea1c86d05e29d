//! Token and DEX registry
//!
//! Single source of truth for the token symbols and DEX routers the advisor
//! understands. Router contracts operate on wrapped tokens only, so the
//! registry also knows the wrapped-native address to substitute whenever the
//! native asset appears at a path endpoint.

use alloy::primitives::{address, Address};
use std::collections::HashMap;

/// Symbol used for the native asset.
pub const NATIVE_SYMBOL: &str = "ETH";

/// Well-known mainnet addresses
pub mod addresses {
    use super::*;

    /// Conventional placeholder for native ETH in aggregator APIs.
    pub const NATIVE_ETH: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
    pub const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    pub const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    pub const USDT: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");
    pub const DAI: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
    pub const WBTC: Address = address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599");
}

/// DEX router addresses (mainnet)
pub mod routers {
    use super::*;

    pub const UNISWAP_V2: Address = address!("7a250d5630b4cf539739df2c5dacb4c659f2488d");
    pub const UNISWAP_V3: Address = address!("e592427a0aece92de3edee1f18e0157c05861564");
    pub const SUSHISWAP: Address = address!("d9e1ce17f2641f24ae83637ab66a2cca9c378b9f");
    pub const ONE_INCH: Address = address!("1111111254fb6c44bac0bed2854e76f90643097d");

    // Routers recognized in transfer history but not offered for execution.
    pub const ZEROX: Address = address!("def1c0ded9bec7f1a1670819833240f027b25eff");
    pub const ONE_INCH_V4: Address = address!("11111112542d85b3ef69ae05771c2dccff4faa26");
    pub const UNISWAP_V3_ROUTER_2: Address = address!("68b3465833fb72a70ecdf485e0e4c7bd8665fc45");
}

/// Token metadata
#[derive(Debug, Clone, Copy)]
pub struct TokenEntry {
    pub symbol: &'static str,
    pub address: Address,
    /// Known decimal precision, used when formatting quote amounts. The
    /// transaction builder still queries the token contract itself.
    pub decimals: u8,
}

/// Registry of supported tokens and DEX routers
pub struct Registry {
    tokens: HashMap<&'static str, TokenEntry>,
    dexes: HashMap<&'static str, Address>,
    router_names: HashMap<Address, &'static str>,
}

impl Registry {
    pub fn new() -> Self {
        use addresses::*;

        let mut tokens = HashMap::new();
        for entry in [
            TokenEntry {
                symbol: NATIVE_SYMBOL,
                address: NATIVE_ETH,
                decimals: 18,
            },
            TokenEntry {
                symbol: "WETH",
                address: WETH,
                decimals: 18,
            },
            TokenEntry {
                symbol: "USDC",
                address: USDC,
                decimals: 6,
            },
            TokenEntry {
                symbol: "USDT",
                address: USDT,
                decimals: 6,
            },
            TokenEntry {
                symbol: "DAI",
                address: DAI,
                decimals: 18,
            },
            TokenEntry {
                symbol: "WBTC",
                address: WBTC,
                decimals: 8,
            },
        ] {
            tokens.insert(entry.symbol, entry);
        }

        let mut dexes = HashMap::new();
        dexes.insert("Uniswap V2", routers::UNISWAP_V2);
        dexes.insert("Uniswap V3", routers::UNISWAP_V3);
        dexes.insert("SushiSwap", routers::SUSHISWAP);
        dexes.insert("1inch", routers::ONE_INCH);

        let mut router_names = HashMap::new();
        router_names.insert(routers::UNISWAP_V2, "Uniswap V2");
        router_names.insert(routers::UNISWAP_V3, "Uniswap V3");
        router_names.insert(routers::SUSHISWAP, "SushiSwap");
        router_names.insert(routers::ONE_INCH, "1inch");
        router_names.insert(routers::ZEROX, "0x Protocol");
        router_names.insert(routers::ONE_INCH_V4, "1inch V4");
        router_names.insert(routers::UNISWAP_V3_ROUTER_2, "Uniswap V3 Router 2");

        Self {
            tokens,
            dexes,
            router_names,
        }
    }

    /// Look up a token by its (uppercase) symbol.
    pub fn token(&self, symbol: &str) -> Option<&TokenEntry> {
        self.tokens.get(symbol)
    }

    /// Whether a symbol names the native asset.
    pub fn is_native(symbol: &str) -> bool {
        symbol == NATIVE_SYMBOL
    }

    /// The wrapped-native token address.
    pub fn wrapped_native(&self) -> Address {
        addresses::WETH
    }

    /// Resolve a symbol to a router-path hop, substituting wrapped-native
    /// for the native asset.
    pub fn resolve_hop(&self, symbol: &str) -> Option<Address> {
        if Self::is_native(symbol) {
            Some(self.wrapped_native())
        } else {
            self.token(symbol).map(|t| t.address)
        }
    }

    /// Router address for a DEX name.
    pub fn router(&self, dex: &str) -> Option<Address> {
        self.dexes.get(dex).copied()
    }

    /// DEX name for a router address, if recognized. Used when classifying
    /// historical transactions.
    pub fn dex_for_router(&self, router: &Address) -> Option<&'static str> {
        self.router_names.get(router).copied()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
