use std::{num::NonZeroUsize, time::Duration};

const DEFAULT_BALANCE_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(size) => size,
    None => panic!("balance cache size must be non-zero"),
};

/// Timing and sizing knobs of a [`SwapOrchestrator`](crate::SwapOrchestrator).
///
/// Aggregator and RPC latency vary a lot between providers, so every bound is configurable.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    debounce: Duration,
    quote_timeout: Duration,
    balance_timeout: Duration,
    quote_ttl: Duration,
    confirmation_poll_interval: Duration,
    confirmation_timeout: Duration,
    balance_cache_size: NonZeroUsize,
    event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            quote_timeout: Duration::from_secs(5),
            balance_timeout: Duration::from_secs(5),
            quote_ttl: Duration::from_secs(10),
            confirmation_poll_interval: Duration::from_secs(1),
            confirmation_timeout: Duration::from_secs(90),
            balance_cache_size: DEFAULT_BALANCE_CACHE_SIZE,
            event_buffer: 64,
        }
    }
}

impl OrchestratorConfig {
    /// Quiet window after the last amount edit before a quote is requested.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_quote_timeout(mut self, timeout: Duration) -> Self {
        self.quote_timeout = timeout;
        self
    }

    pub fn with_balance_timeout(mut self, timeout: Duration) -> Self {
        self.balance_timeout = timeout;
        self
    }

    /// How long a quote may be used for submission after it was received.
    pub fn with_quote_ttl(mut self, ttl: Duration) -> Self {
        self.quote_ttl = ttl;
        self
    }

    pub fn with_confirmation_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.confirmation_poll_interval = interval;
        self.confirmation_timeout = timeout;
        self
    }

    pub fn with_balance_cache_size(mut self, size: NonZeroUsize) -> Self {
        self.balance_cache_size = size;
        self
    }

    /// Capacity of the channel carrying asynchronous results back to the orchestrator. Minimum 1.
    pub fn with_event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size.max(1);
        self
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn quote_timeout(&self) -> Duration {
        self.quote_timeout
    }

    pub fn balance_timeout(&self) -> Duration {
        self.balance_timeout
    }

    pub fn quote_ttl(&self) -> Duration {
        self.quote_ttl
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        self.confirmation_poll_interval
    }

    pub fn confirmation_timeout(&self) -> Duration {
        self.confirmation_timeout
    }

    pub fn balance_cache_size(&self) -> NonZeroUsize {
        self.balance_cache_size
    }

    pub fn event_buffer(&self) -> usize {
        self.event_buffer
    }
}
