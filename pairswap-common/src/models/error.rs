use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

/// Classification of every failure the swap core can observe or surface.
///
/// `InvalidAmountInput` exists for completeness of the taxonomy: invalid keystrokes are rejected
/// at the input boundary as a no-op and never reach a caller as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ErrorKind {
    UnsupportedChain,
    InvalidAmountInput,
    NetworkUnavailable,
    RpcError,
    NoRoute,
    RateLimited,
    QuoteExpired,
    UserRejected,
    WalletDisconnected,
    TransactionFailed,
}

/// Errors produced by the collaborators (wallet, chain RPC, aggregator) and by the amount and
/// catalog helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("Invalid amount input: {0}")]
    InvalidAmountInput(String),

    /// Transport failures, including requests that did not resolve within their time bound.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    /// The aggregator could not find a path between the two tokens.
    #[error("No route found: {0}")]
    NoRoute(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Quote expired")]
    QuoteExpired,

    #[error("User rejected the request")]
    UserRejected,

    #[error("Wallet disconnected")]
    WalletDisconnected,

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

impl SwapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwapError::UnsupportedChain(_) => ErrorKind::UnsupportedChain,
            SwapError::InvalidAmountInput(_) => ErrorKind::InvalidAmountInput,
            SwapError::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
            SwapError::RpcError(_) => ErrorKind::RpcError,
            SwapError::NoRoute(_) => ErrorKind::NoRoute,
            SwapError::RateLimited(_) => ErrorKind::RateLimited,
            SwapError::QuoteExpired => ErrorKind::QuoteExpired,
            SwapError::UserRejected => ErrorKind::UserRejected,
            SwapError::WalletDisconnected => ErrorKind::WalletDisconnected,
            SwapError::TransactionFailed(_) => ErrorKind::TransactionFailed,
        }
    }
}
