use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::{balance::Account, Chain};

/// Unsigned swap transaction as built by an aggregator, ready to be handed to a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub chain: Chain,
    /// The account expected to sign and pay for the transaction.
    pub signer: Account,
    /// Serialized, chain-specific transaction payload.
    pub payload: Vec<u8>,
}

/// Identifier of a sent transaction: a signature on Solana, a hash on EVM chains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub String);

impl Display for TxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusion status of a sent transaction as reported by the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ChainTxStatus {
    Pending,
    Confirmed,
    Failed,
}
