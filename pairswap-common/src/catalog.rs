//! Static, chain-scoped registry of swappable tokens.
use std::collections::HashMap;

use serde::Deserialize;

use crate::models::{error::SwapError, token::Token, Chain};

/// Placeholder address used for the native asset of EVM chains.
const EVM_NATIVE_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Address, symbol, name and decimals of a builtin token.
type BuiltinToken = (&'static str, &'static str, &'static str, u32);

const SOLANA_TOKENS: &[BuiltinToken] = &[
    ("So11111111111111111111111111111111111111112", "SOL", "Solana", 9),
    ("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USDC", "USD Coin", 6),
    ("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT", "Tether USD", 6),
    ("4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R", "RAY", "Raydium", 6),
    ("SRMuApVNdxXokk5GT7XD5cUUgXMBCoAz2LHeuAoKWRt", "SRM", "Serum", 6),
];

const ETHEREUM_TOKENS: &[BuiltinToken] = &[
    (EVM_NATIVE_ADDRESS, "ETH", "Ether", 18),
    ("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "USDC", "USD Coin", 6),
    ("0xdac17f958d2ee523a2206206994597c13d831ec7", "USDT", "Tether USD", 6),
    ("0x6b175474e89094c44da98b954eedeac495271d0f", "DAI", "Dai Stablecoin", 18),
    ("0x2260fac5e5542a773aa44fbcfedf7c193bc2c599", "WBTC", "Wrapped BTC", 8),
];

const BSC_TOKENS: &[BuiltinToken] = &[
    (EVM_NATIVE_ADDRESS, "BNB", "BNB", 18),
    ("0xe9e7cea3dedca5984780bafc599bd69add087d56", "BUSD", "Binance USD", 18),
    ("0x55d398326f99059ff775485246999027b3197955", "USDT", "Tether USD", 18),
    ("0x0e09fabb73bd3ade0a17ecc321fd13a19e81ce82", "CAKE", "PancakeSwap", 18),
    ("0x7130d2a12b9bcbfae4f2634d864a1ee1ce3ead9c", "BTCB", "Bitcoin BEP2", 18),
];

#[derive(Debug, Clone, Default)]
pub struct TokenCatalog {
    tokens: HashMap<Chain, Vec<Token>>,
}

#[derive(Deserialize)]
struct CatalogEntry {
    address: String,
    symbol: String,
    name: String,
    decimals: u32,
}

impl TokenCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shipped with the widget: the native asset of each chain first, followed by
    /// its most traded stablecoins and majors.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        let builtin = [
            (Chain::Solana, SOLANA_TOKENS),
            (Chain::Ethereum, ETHEREUM_TOKENS),
            (Chain::Bsc, BSC_TOKENS),
        ];
        for (chain, entries) in builtin {
            let tokens = entries
                .iter()
                .map(|&(address, symbol, name, decimals)| {
                    Token::new(address, symbol, name, decimals, chain)
                })
                .collect();
            catalog.insert(chain, tokens);
        }
        catalog
    }

    /// Load a catalog from JSON shaped as `{"<chain>": [{address, symbol, name, decimals}, ..]}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<Chain, Vec<CatalogEntry>> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (chain, entries) in raw {
            let tokens = entries
                .into_iter()
                .map(|e| Token::new(&e.address, &e.symbol, &e.name, e.decimals, chain))
                .collect();
            catalog.insert(chain, tokens);
        }
        Ok(catalog)
    }

    /// Replace the token list of `chain`. Order is preserved.
    pub fn insert(&mut self, chain: Chain, tokens: Vec<Token>) {
        self.tokens.insert(chain, tokens);
    }

    pub fn list_tokens(&self, chain: Chain) -> Result<&[Token], SwapError> {
        self.tokens
            .get(&chain)
            .filter(|tokens| !tokens.is_empty())
            .map(Vec::as_slice)
            .ok_or_else(|| SwapError::UnsupportedChain(chain.to_string()))
    }

    /// Initial selection: the native asset as `from`, nothing as `to`.
    pub fn default_pair(&self, chain: Chain) -> Result<(Token, Option<Token>), SwapError> {
        let tokens = self.list_tokens(chain)?;
        Ok((tokens[0].clone(), None))
    }

    /// The token proposed when the user asks to pick a `to` token without choosing one: the
    /// second entry, or the only one.
    pub fn suggested_to_token(&self, chain: Chain) -> Result<Token, SwapError> {
        let tokens = self.list_tokens(chain)?;
        Ok(tokens
            .get(1)
            .unwrap_or(&tokens[0])
            .clone())
    }

    pub fn find(&self, chain: Chain, symbol: &str) -> Result<Option<&Token>, SwapError> {
        Ok(self
            .list_tokens(chain)?
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol)))
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.list_tokens(token.chain)
            .map(|tokens| tokens.contains(token))
            .unwrap_or(false)
    }

    /// Case-insensitive substring search on symbol or name, catalog order preserved.
    pub fn search(&self, chain: Chain, query: &str) -> Result<Vec<&Token>, SwapError> {
        let query = query.to_lowercase();
        Ok(self
            .list_tokens(chain)?
            .iter()
            .filter(|t| {
                t.symbol.to_lowercase().contains(&query) || t.name.to_lowercase().contains(&query)
            })
            .collect())
    }
}
