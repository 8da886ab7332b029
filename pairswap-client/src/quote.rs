//! Turns a [`QuoteRequest`] into a time-bounded [`Quote`] using an [`Aggregator`].
use std::{sync::Arc, time::Duration};

use pairswap_common::{traits::Aggregator, Quote, QuoteRequest, SwapError};
use tokio::time::{timeout, Instant};
use tracing::{debug, instrument};

use crate::config::OrchestratorConfig;

pub struct QuoteEngine<A> {
    aggregator: Arc<A>,
    ttl: Duration,
    timeout: Duration,
}

impl<A> Clone for QuoteEngine<A> {
    fn clone(&self) -> Self {
        Self { aggregator: Arc::clone(&self.aggregator), ttl: self.ttl, timeout: self.timeout }
    }
}

impl<A> QuoteEngine<A>
where
    A: Aggregator,
{
    pub fn new(aggregator: Arc<A>, config: &OrchestratorConfig) -> Self {
        Self { aggregator, ttl: config.quote_ttl(), timeout: config.quote_timeout() }
    }

    pub fn aggregator(&self) -> &Arc<A> {
        &self.aggregator
    }

    /// Prices `request`.
    ///
    /// Zero amounts are answered locally with a zero quote. Aggregator calls that do not resolve
    /// within the configured timeout fail with `SwapError::NetworkUnavailable`.
    #[instrument(skip(self), fields(%request))]
    pub async fn get_quote(&self, request: QuoteRequest) -> Result<Quote, SwapError> {
        if request.is_zero() {
            return Ok(self.zero_quote(request));
        }
        let answer = timeout(self.timeout, self.aggregator.quote(&request))
            .await
            .map_err(|_| {
                SwapError::NetworkUnavailable(format!(
                    "quote request timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })??;
        debug!(amount = %answer.amount, route = ?answer.route, "Received quote");
        Ok(Quote::new(request, answer, now(), self.ttl))
    }

    pub fn zero_quote(&self, request: QuoteRequest) -> Quote {
        Quote::zero(request, now(), self.ttl)
    }

    /// Whether `quote` may be used to submit a swap for `request` right now.
    pub fn is_usable(&self, quote: &Quote, request: &QuoteRequest) -> bool {
        quote.answers(request) && !quote.is_expired(now())
    }
}

/// Current instant, following tokio's clock so paused test time applies to quote expiry.
pub(crate) fn now() -> std::time::Instant {
    Instant::now().into_std()
}
