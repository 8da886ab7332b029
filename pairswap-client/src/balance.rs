//! Balance lookups for the connected account, with a small cache of the last observed values.
use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use lru::LruCache;
use pairswap_common::{traits::ChainRpc, Account, Balance, SwapError, Token};
use tokio::time::timeout;
use tracing::{debug, Instrument};

use crate::config::OrchestratorConfig;

pub struct BalanceSource<R> {
    rpc: Arc<R>,
    timeout: Duration,
    cache: LruCache<(Account, Token), Balance>,
}

impl<R> BalanceSource<R>
where
    R: ChainRpc + 'static,
{
    pub fn new(rpc: Arc<R>, config: &OrchestratorConfig) -> Self {
        Self {
            rpc,
            timeout: config.balance_timeout(),
            cache: LruCache::new(config.balance_cache_size()),
        }
    }

    /// Returns a future resolving the balance of `token` held by `account`.
    ///
    /// The future owns everything it needs so it can be spawned; the result is not cached until
    /// it is handed back through [`BalanceSource::record`].
    pub fn fetch_balance(
        &self,
        account: Account,
        token: Token,
    ) -> impl Future<Output = Result<Balance, SwapError>> + Send + 'static {
        let rpc = Arc::clone(&self.rpc);
        let bound = self.timeout;
        let span = tracing::debug_span!("fetch_balance", %account, %token);
        async move {
            let amount = timeout(bound, rpc.get_balance(&account, &token))
                .await
                .map_err(|_| {
                    SwapError::NetworkUnavailable(format!(
                        "balance request timed out after {}ms",
                        bound.as_millis()
                    ))
                })??;
            debug!(%amount, "Received balance");
            Ok::<_, SwapError>(Balance::new(account, token, amount, Utc::now().naive_utc()))
        }
        .instrument(span)
    }

    pub fn record(&mut self, balance: Balance) {
        self.cache
            .put((balance.account.clone(), balance.token.clone()), balance);
    }

    /// Last recorded balance, possibly outdated.
    pub fn cached(&self, account: &Account, token: &Token) -> Option<&Balance> {
        self.cache
            .peek(&(account.clone(), token.clone()))
    }
}
