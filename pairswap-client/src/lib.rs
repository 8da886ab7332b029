//! Orchestration core of a token-swap widget.
//!
//! [`SwapOrchestrator`] owns the selected pair and drives quotes, balances and the swap
//! transaction through the [`WalletAdapter`](pairswap_common::traits::WalletAdapter),
//! [`ChainRpc`](pairswap_common::traits::ChainRpc) and
//! [`Aggregator`](pairswap_common::traits::Aggregator) collaborators it is given.
pub mod balance;
pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod pair;
pub mod quote;
pub mod simulated;

pub use balance::BalanceSource;
pub use config::OrchestratorConfig;
pub use orchestrator::{
    OrchestratorError, SwapOrchestrator, SwapStatus, SwapTransaction, TransactionStatus, Update,
};
pub use pair::{AmountField, PairState, Side};
pub use quote::QuoteEngine;
