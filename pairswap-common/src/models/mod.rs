pub mod balance;
pub mod error;
pub mod quote;
pub mod token;
pub mod transaction;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Chain-native identifier of a token: a contract address on EVM chains, a mint on Solana.
pub type Address = String;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Chain {
    #[default]
    Solana,
    Ethereum,
    Bsc,
}

impl Chain {
    /// Parses a chain name, mapping unknown names onto [`SwapError::UnsupportedChain`].
    ///
    /// [`SwapError::UnsupportedChain`]: error::SwapError::UnsupportedChain
    pub fn parse(name: &str) -> Result<Self, error::SwapError> {
        name.to_lowercase()
            .parse()
            .map_err(|_| error::SwapError::UnsupportedChain(name.to_string()))
    }
}
