use std::{
    fmt::{Display, Formatter},
    hash::{Hash, Hasher},
};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::{Address, Chain};

/// A swappable token. Immutable once the catalog is loaded.
///
/// Two tokens are equal when they live on the same chain under the same address; symbols are
/// only unique within a single chain's catalog.
#[derive(Debug, Clone, Deserialize, Serialize, Eq)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
    #[serde(default)]
    pub chain: Chain,
}

impl Token {
    pub fn new(address: &str, symbol: &str, name: &str, decimals: u32, chain: Chain) -> Self {
        Self {
            address: address.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            chain,
        }
    }

    /// One whole token in base units.
    pub fn one(&self) -> BigUint {
        BigUint::from(10u32).pow(self.decimals)
    }

    /// Whether both tokens carry the same symbol, the identity used by the pair invariant.
    pub fn same_symbol(&self, other: &Token) -> bool {
        self.symbol == other.symbol
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.chain == other.chain && self.address == other.address
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain.hash(state);
        self.address.hash(state);
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
