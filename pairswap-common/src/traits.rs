use async_trait::async_trait;
use num_bigint::BigUint;

use crate::models::{
    balance::Account,
    error::SwapError,
    quote::{AggregatorQuote, Quote, QuoteRequest},
    token::Token,
    transaction::{ChainTxStatus, TransactionRequest, TxId},
};

/// Connected wallet capability, injected into the orchestrator instead of being read from an
/// ambient provider.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// The currently connected account, if any. Cheap and synchronous; connection changes are
    /// pushed to the orchestrator separately.
    fn get_connected_account(&self) -> Option<Account>;

    /// Asks the wallet to approve, sign and broadcast `request`.
    ///
    /// # Errors
    /// * `SwapError::UserRejected` - the user declined in the wallet UI.
    /// * `SwapError::WalletDisconnected` - the wallet went away while waiting.
    async fn sign_and_send(&self, request: TransactionRequest) -> Result<TxId, SwapError>;
}

/// Read access to chain state.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Balance of `token` held by `account`, in base units.
    async fn get_balance(&self, account: &Account, token: &Token) -> Result<BigUint, SwapError>;

    async fn get_transaction_status(&self, tx_id: &TxId) -> Result<ChainTxStatus, SwapError>;
}

/// DEX aggregator computing routes, amounts and swap transactions.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Prices `request`.
    ///
    /// # Errors
    /// * `SwapError::NoRoute` - no path exists between the two tokens for this amount.
    /// * `SwapError::RateLimited` - the service refused the request for now.
    /// * `SwapError::NetworkUnavailable` - the service could not be reached.
    async fn quote(&self, request: &QuoteRequest) -> Result<AggregatorQuote, SwapError>;

    /// Builds the unsigned transaction executing `quote` for `account`.
    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        account: &Account,
    ) -> Result<TransactionRequest, SwapError>;
}
