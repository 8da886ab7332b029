//! Owner of the pair, the held quote, the balance and the current swap transaction.
//!
//! Every asynchronous operation (debounce windows, quote and balance requests, signing,
//! confirmation polling) runs in a spawned task that reports back through a channel. Results are
//! only applied by [`SwapOrchestrator::next_update`], which checks that they still answer the
//! current state before touching it; superseded results are dropped there.
use std::{future::Future, sync::Arc, time::Duration};

use pairswap_common::{
    display::opt,
    traits::{Aggregator, ChainRpc, WalletAdapter},
    Account, Balance, Chain, ChainTxStatus, ErrorKind, Quote, QuoteRequest, SwapError, Token,
    TokenCatalog, TxId,
};
use strum_macros::Display;
use thiserror::Error;
use tokio::{
    sync::mpsc::{channel, Receiver, Sender},
    time::{sleep, timeout},
};
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use crate::{
    balance::BalanceSource,
    config::OrchestratorConfig,
    pair::{PairState, Side},
    quote::{now, QuoteEngine},
};

pub mod transaction;

pub use transaction::{SwapTransaction, TransactionStatus};

/// What the widget shows and allows at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SwapStatus {
    /// No valid amount entered, or no wallet connected.
    Idle,
    /// A quote for the current pair is being debounced or is in flight.
    Quoting,
    /// A quote answers the current pair and a wallet is connected; submission is enabled.
    Ready,
    AwaitingSignature,
    Submitted,
    Confirmed,
    Failed(ErrorKind),
    Cancelled,
}

impl From<TransactionStatus> for SwapStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::AwaitingSignature => SwapStatus::AwaitingSignature,
            TransactionStatus::Submitted => SwapStatus::Submitted,
            TransactionStatus::Confirmed => SwapStatus::Confirmed,
            TransactionStatus::Failed(kind) => SwapStatus::Failed(kind),
            TransactionStatus::Cancelled => SwapStatus::Cancelled,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error(transparent)]
    Swap(#[from] SwapError),
    #[error("The pair cannot change while a transaction is in flight")]
    PairFrozen,
    #[error("Swap is not ready: {0}")]
    NotReady(SwapStatus),
    #[error("A transaction is already in progress")]
    TransactionInProgress,
    #[error("The previous transaction must be dismissed first")]
    AwaitingDismissal,
    #[error("No transaction to act upon")]
    NoTransaction,
    #[error("Token {0} is not listed on {1}")]
    UnknownToken(String, Chain),
}

/// What applying one asynchronous result did to the orchestrator's state.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// The debounce window settled and a quote was requested.
    QuoteRequested(QuoteRequest),
    /// A debounce window elapsed after further edits; nothing was requested.
    DebounceSuperseded,
    QuoteApplied(Quote),
    /// A quote arrived for a request that no longer matches the pair.
    QuoteDiscarded(QuoteRequest),
    /// The current request failed; the derived amount stays stale.
    QuoteFailed(ErrorKind),
    BalanceApplied(Balance),
    /// A balance arrived for a token or account that is no longer selected.
    BalanceDiscarded,
    BalanceFailed(ErrorKind),
    TransactionChanged(SwapStatus),
    /// Progress of a transaction that was cancelled or dismissed meanwhile.
    TransactionDiscarded,
}

#[derive(Debug)]
enum PendingQuote {
    Debouncing { seq: u64 },
    InFlight { seq: u64 },
}

#[derive(Debug)]
enum TxProgress {
    Sent(TxId),
    Confirmed,
    Failed(SwapError),
}

/// What spawned tasks report back. Every task ends with `TaskDone`.
#[derive(Debug)]
enum Message {
    Event(Event),
    TaskDone,
}

#[derive(Debug)]
enum Event {
    DebounceElapsed { seq: u64 },
    QuoteResolved { request: QuoteRequest, result: Result<Quote, SwapError> },
    BalanceResolved { seq: u64, result: Result<Balance, SwapError> },
    Transaction { id: Uuid, progress: TxProgress },
}

pub struct SwapOrchestrator<W, R, A> {
    wallet: Arc<W>,
    rpc: Arc<R>,
    quotes: QuoteEngine<A>,
    balances: BalanceSource<R>,
    config: OrchestratorConfig,
    chain: Chain,
    catalog: TokenCatalog,
    pair: PairState,
    quote: Option<Quote>,
    last_quote_error: Option<SwapError>,
    pending_quote: Option<PendingQuote>,
    quote_seq: u64,
    account: Option<Account>,
    balance: Option<Balance>,
    balance_stale: bool,
    balance_seq: u64,
    last_balance_error: Option<SwapError>,
    transaction: Option<SwapTransaction>,
    submit_after_quote: bool,
    events_tx: Sender<Message>,
    events_rx: Receiver<Message>,
    /// Spawned tasks that have not reported `TaskDone` yet.
    live_tasks: usize,
}

impl<W, R, A> SwapOrchestrator<W, R, A>
where
    W: WalletAdapter + 'static,
    R: ChainRpc + 'static,
    A: Aggregator + 'static,
{
    /// Creates an orchestrator showing the default pair of `chain`.
    ///
    /// Must be called from within a Tokio runtime: the balance of a connected wallet is fetched
    /// right away.
    pub fn new(
        chain: Chain,
        catalog: TokenCatalog,
        wallet: Arc<W>,
        rpc: Arc<R>,
        aggregator: Arc<A>,
        config: OrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        let (from, to) = catalog.default_pair(chain)?;
        let (events_tx, events_rx) = channel(config.event_buffer());
        let account = wallet.get_connected_account();
        let mut orchestrator = Self {
            quotes: QuoteEngine::new(aggregator, &config),
            balances: BalanceSource::new(Arc::clone(&rpc), &config),
            wallet,
            rpc,
            config,
            chain,
            catalog,
            pair: PairState::new(from, to),
            quote: None,
            last_quote_error: None,
            pending_quote: None,
            quote_seq: 0,
            account,
            balance: None,
            balance_stale: false,
            balance_seq: 0,
            last_balance_error: None,
            transaction: None,
            submit_after_quote: false,
            events_tx,
            events_rx,
            live_tasks: 0,
        };
        info!(%chain, from = opt(&orchestrator.pair.from_token()), "Swap orchestrator ready");
        orchestrator.refresh_balance();
        Ok(orchestrator)
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn catalog(&self) -> &TokenCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn pair(&self) -> &PairState {
        &self.pair
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// The held quote, if it answers the current pair. It may be expired.
    pub fn quote(&self) -> Option<&Quote> {
        let request = self.pair.quote_request()?;
        self.quote
            .as_ref()
            .filter(|quote| quote.answers(&request))
    }

    pub fn last_quote_error(&self) -> Option<&SwapError> {
        self.last_quote_error.as_ref()
    }

    /// Balance of the `from` token for the connected account. While a refresh is pending this is
    /// the last cached value, if any, and [`Self::balance_is_stale`] is true.
    pub fn balance(&self) -> Option<&Balance> {
        self.balance.as_ref()
    }

    pub fn balance_is_stale(&self) -> bool {
        self.balance_stale
    }

    pub fn last_balance_error(&self) -> Option<&SwapError> {
        self.last_balance_error.as_ref()
    }

    pub fn transaction(&self) -> Option<&SwapTransaction> {
        self.transaction.as_ref()
    }

    pub fn status(&self) -> SwapStatus {
        if let Some(tx) = &self.transaction {
            return tx.status().into();
        }
        let Some(request) = self.pair.quote_request() else {
            return SwapStatus::Idle;
        };
        if request.is_zero() {
            return SwapStatus::Idle;
        }
        if self.pending_quote.is_some() {
            return SwapStatus::Quoting;
        }
        if self.account.is_none() {
            return SwapStatus::Idle;
        }
        match &self.quote {
            Some(quote) if quote.answers(&request) => SwapStatus::Ready,
            _ => SwapStatus::Idle,
        }
    }

    pub fn select_from_token(&mut self, token: Token) -> Result<(), OrchestratorError> {
        self.ensure_unfrozen()?;
        self.ensure_listed(&token)?;
        if self.pair.set_from_token(token) {
            self.pair_changed(true, false);
        }
        Ok(())
    }

    pub fn select_to_token(&mut self, token: Token) -> Result<(), OrchestratorError> {
        self.ensure_unfrozen()?;
        self.ensure_listed(&token)?;
        let from = self.pair.from_token().cloned();
        if self.pair.set_to_token(token) {
            let from_changed = self.pair.from_token() != from.as_ref();
            self.pair_changed(from_changed, false);
        }
        Ok(())
    }

    /// Records an amount typed into `side`. Returns whether the input was accepted; rejected input
    /// leaves everything untouched.
    pub fn set_amount(&mut self, side: Side, value: &str) -> Result<bool, OrchestratorError> {
        self.ensure_unfrozen()?;
        if !self.pair.set_amount(side, value) {
            trace!(%side, value, "Ignoring invalid amount input");
            return Ok(false);
        }
        self.pair_changed(false, true);
        Ok(true)
    }

    pub fn reverse(&mut self) -> Result<(), OrchestratorError> {
        self.ensure_unfrozen()?;
        self.pair.reverse();
        self.pair_changed(true, false);
        Ok(())
    }

    /// Re-reads the wallet connection. Call whenever the wallet reports a change.
    pub fn wallet_changed(&mut self) {
        let account = self.wallet.get_connected_account();
        if account == self.account {
            return;
        }
        info!(account = opt(&account), "Wallet connection changed");
        self.account = account;
        self.refresh_balance();
    }

    /// Starts a swap for the held quote.
    ///
    /// An expired quote is replaced first: a fresh quote is requested and the swap starts as soon
    /// as it is applied, so the status passes through `Quoting` instead of failing.
    #[instrument(skip(self))]
    pub fn submit(&mut self) -> Result<(), OrchestratorError> {
        if let Some(tx) = &self.transaction {
            return Err(if tx.is_terminal() {
                OrchestratorError::AwaitingDismissal
            } else {
                OrchestratorError::TransactionInProgress
            });
        }
        self.wallet_changed();
        if self.account.is_none() {
            return Err(SwapError::WalletDisconnected.into());
        }
        let status = self.status();
        if status != SwapStatus::Ready {
            return Err(OrchestratorError::NotReady(status));
        }
        let (Some(request), Some(quote)) = (self.pair.quote_request(), self.quote.clone()) else {
            return Err(OrchestratorError::NotReady(status));
        };
        if quote.is_expired(now()) {
            debug!(%request, "Held quote expired, re-quoting before submission");
            self.submit_after_quote = true;
            let seq = self.next_quote_seq();
            self.issue_quote(seq, request);
            return Ok(());
        }
        self.start_submission(quote);
        Ok(())
    }

    /// Aborts the current transaction, or a submission still waiting for its re-quote.
    ///
    /// A transaction already handed to the chain cannot be revoked; cancelling it only stops
    /// tracking its outcome.
    pub fn cancel(&mut self) -> Result<SwapStatus, OrchestratorError> {
        if self.transaction.is_none() && self.submit_after_quote {
            self.submit_after_quote = false;
            return Ok(self.status());
        }
        let Some(tx) = self.transaction.as_mut() else {
            return Err(OrchestratorError::NoTransaction);
        };
        if !tx.cancel() {
            return Err(OrchestratorError::AwaitingDismissal);
        }
        info!(id = %tx.id, "Transaction cancelled");
        Ok(SwapStatus::Cancelled)
    }

    /// Acknowledges a terminal transaction and hands it back. After a confirmed swap the balance
    /// is refreshed and the pair re-quoted, the executed quote is never reused.
    pub fn dismiss(&mut self) -> Result<SwapTransaction, OrchestratorError> {
        match &self.transaction {
            None => return Err(OrchestratorError::NoTransaction),
            Some(tx) if !tx.is_terminal() => return Err(OrchestratorError::TransactionInProgress),
            Some(_) => {}
        }
        let tx = self
            .transaction
            .take()
            .ok_or(OrchestratorError::NoTransaction)?;
        debug!(id = %tx.id, status = %tx.status(), "Transaction dismissed");
        if tx.status() == TransactionStatus::Confirmed {
            self.quote = None;
            self.refresh_balance();
            self.pair.mark_derived_stale();
            self.schedule_quote(false);
        }
        Ok(tx)
    }

    /// Waits for the next asynchronous result and applies it. Returns `None` once no spawned work
    /// is left.
    pub async fn next_update(&mut self) -> Option<Update> {
        loop {
            let message = match self.events_rx.try_recv() {
                Ok(message) => message,
                Err(_) if self.live_tasks == 0 => return None,
                Err(_) => self.events_rx.recv().await?,
            };
            match message {
                Message::Event(event) => return Some(self.apply(event)),
                Message::TaskDone => self.live_tasks = self.live_tasks.saturating_sub(1),
            }
        }
    }

    /// Applies every result that is already available without waiting.
    pub fn drain_ready(&mut self) -> Vec<Update> {
        let mut updates = Vec::new();
        while let Ok(message) = self.events_rx.try_recv() {
            match message {
                Message::Event(event) => updates.push(self.apply(event)),
                Message::TaskDone => self.live_tasks = self.live_tasks.saturating_sub(1),
            }
        }
        updates
    }

    /// Applies results until no spawned work is left.
    pub async fn settle(&mut self) -> Vec<Update> {
        let mut updates = Vec::new();
        while let Some(update) = self.next_update().await {
            updates.push(update);
        }
        updates
    }

    fn ensure_unfrozen(&self) -> Result<(), OrchestratorError> {
        match &self.transaction {
            Some(tx) if tx.is_in_flight() => Err(OrchestratorError::PairFrozen),
            _ => Ok(()),
        }
    }

    fn ensure_listed(&self, token: &Token) -> Result<(), OrchestratorError> {
        if token.chain == self.chain && self.catalog.contains(token) {
            Ok(())
        } else {
            Err(OrchestratorError::UnknownToken(token.symbol.clone(), self.chain))
        }
    }

    fn pair_changed(&mut self, from_changed: bool, debounce: bool) {
        self.submit_after_quote = false;
        if from_changed {
            self.refresh_balance();
        }
        self.schedule_quote(debounce);
    }

    fn next_quote_seq(&mut self) -> u64 {
        self.quote_seq += 1;
        self.quote_seq
    }

    /// Brings the derived amount in line with the pair: answered locally when possible,
    /// otherwise requested, after the debounce window if `debounce` is set.
    fn schedule_quote(&mut self, debounce: bool) {
        let seq = self.next_quote_seq();
        self.last_quote_error = None;
        let Some(request) = self.pair.quote_request() else {
            self.pending_quote = None;
            return;
        };
        if request.is_zero() {
            self.pending_quote = None;
            let quote = self.quotes.zero_quote(request);
            self.pair.apply_quote(&quote);
            self.quote = Some(quote);
            return;
        }
        if let Some(quote) = self
            .quote
            .as_ref()
            .filter(|quote| self.quotes.is_usable(quote, &request))
        {
            trace!(%request, "Held quote still answers the pair");
            self.pending_quote = None;
            self.pair.apply_quote(quote);
            return;
        }
        if debounce {
            self.pending_quote = Some(PendingQuote::Debouncing { seq });
            let window = self.config.debounce();
            self.spawn_event(async move {
                sleep(window).await;
                Event::DebounceElapsed { seq }
            });
        } else {
            self.issue_quote(seq, request);
        }
    }

    fn issue_quote(&mut self, seq: u64, request: QuoteRequest) {
        debug!(%request, seq, "Requesting quote");
        self.pending_quote = Some(PendingQuote::InFlight { seq });
        let engine = self.quotes.clone();
        self.spawn_event(async move {
            let result = engine.get_quote(request.clone()).await;
            Event::QuoteResolved { request, result }
        });
    }

    fn refresh_balance(&mut self) {
        self.balance_seq += 1;
        self.last_balance_error = None;
        let (Some(account), Some(token)) = (self.account.clone(), self.pair.from_token().cloned())
        else {
            self.balance = None;
            self.balance_stale = false;
            return;
        };
        self.balance = self
            .balances
            .cached(&account, &token)
            .cloned();
        self.balance_stale = true;
        let seq = self.balance_seq;
        let fetch = self.balances.fetch_balance(account, token);
        self.spawn_event(async move { Event::BalanceResolved { seq, result: fetch.await } });
    }

    fn start_submission(&mut self, quote: Quote) {
        let Some(account) = self.account.clone() else {
            warn!("Wallet disconnected before submission");
            return;
        };
        let tx = SwapTransaction::new(quote.clone());
        let id = tx.id;
        info!(%id, request = %quote.request, "Requesting wallet signature");
        self.transaction = Some(tx);

        let aggregator = Arc::clone(self.quotes.aggregator());
        let wallet = Arc::clone(&self.wallet);
        let rpc = Arc::clone(&self.rpc);
        let interval = self.config.confirmation_poll_interval();
        let bound = self.config.confirmation_timeout();
        self.spawn(move |events| async move {
            let sent = match aggregator
                .build_swap_transaction(&quote, &account)
                .await
            {
                Ok(request) => wallet.sign_and_send(request).await,
                Err(err) => Err(err),
            };
            let tx_id = match sent {
                Ok(tx_id) => tx_id,
                Err(err) => {
                    let progress = TxProgress::Failed(err);
                    send(&events, Event::Transaction { id, progress }).await;
                    return;
                }
            };
            let progress = TxProgress::Sent(tx_id.clone());
            send(&events, Event::Transaction { id, progress }).await;
            let progress = await_confirmation(rpc, tx_id, interval, bound).await;
            send(&events, Event::Transaction { id, progress }).await;
        });
    }

    fn spawn<F, Fut>(&mut self, task: F)
    where
        F: FnOnce(Sender<Message>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.live_tasks += 1;
        let events = self.events_tx.clone();
        let fut = task(events.clone());
        tokio::spawn(async move {
            fut.await;
            if events.send(Message::TaskDone).await.is_err() {
                trace!("Orchestrator dropped before task completion");
            }
        });
    }

    fn spawn_event<Fut>(&mut self, fut: Fut)
    where
        Fut: Future<Output = Event> + Send + 'static,
    {
        self.spawn(|events| async move {
            let event = fut.await;
            send(&events, event).await;
        });
    }

    fn apply(&mut self, event: Event) -> Update {
        match event {
            Event::DebounceElapsed { seq } => self.apply_debounce(seq),
            Event::QuoteResolved { request, result } => self.apply_quote(request, result),
            Event::BalanceResolved { seq, result } => self.apply_balance(seq, result),
            Event::Transaction { id, progress } => self.apply_transaction(id, progress),
        }
    }

    fn apply_debounce(&mut self, seq: u64) -> Update {
        let settled =
            matches!(self.pending_quote, Some(PendingQuote::Debouncing { seq: s }) if s == seq);
        match self.pair.quote_request() {
            Some(request) if settled => {
                self.issue_quote(seq, request.clone());
                Update::QuoteRequested(request)
            }
            _ => Update::DebounceSuperseded,
        }
    }

    fn apply_quote(&mut self, request: QuoteRequest, result: Result<Quote, SwapError>) -> Update {
        if self.pair.quote_request().as_ref() != Some(&request) {
            debug!(%request, "Discarding quote for a superseded request");
            return Update::QuoteDiscarded(request);
        }
        // A response for the current pair is valid even if a newer request for the same pair was
        // issued in between. It only concludes the pending request when it is the latest one.
        let latest = matches!(
            self.pending_quote,
            Some(PendingQuote::InFlight { seq }) if seq == self.quote_seq
        );
        match result {
            Ok(quote) => {
                self.pending_quote = None;
                self.last_quote_error = None;
                self.pair.apply_quote(&quote);
                debug!(%request, rate = %quote.display_rate(), "Applied quote");
                self.quote = Some(quote.clone());
                if std::mem::take(&mut self.submit_after_quote) {
                    self.start_submission(quote.clone());
                }
                Update::QuoteApplied(quote)
            }
            Err(err) => {
                warn!(%request, error = %err, "Quote request failed");
                let kind = err.kind();
                self.last_quote_error = Some(err);
                if latest {
                    self.pending_quote = None;
                    self.submit_after_quote = false;
                    if self
                        .quote
                        .as_ref()
                        .is_some_and(|quote| quote.answers(&request))
                    {
                        self.quote = None;
                    }
                    self.pair.mark_derived_stale();
                }
                Update::QuoteFailed(kind)
            }
        }
    }

    fn apply_balance(&mut self, seq: u64, result: Result<Balance, SwapError>) -> Update {
        if seq != self.balance_seq {
            debug!(seq, current = self.balance_seq, "Discarding balance for a previous selection");
            return Update::BalanceDiscarded;
        }
        match result {
            Ok(balance) => {
                self.balances.record(balance.clone());
                self.balance = Some(balance.clone());
                self.balance_stale = false;
                Update::BalanceApplied(balance)
            }
            Err(err) => {
                warn!(error = %err, "Balance request failed");
                let kind = err.kind();
                self.last_balance_error = Some(err);
                Update::BalanceFailed(kind)
            }
        }
    }

    fn apply_transaction(&mut self, id: Uuid, progress: TxProgress) -> Update {
        let Some(tx) = self
            .transaction
            .as_mut()
            .filter(|tx| tx.id == id)
        else {
            debug!(%id, "Discarding progress of a dismissed transaction");
            return Update::TransactionDiscarded;
        };
        let changed = match progress {
            TxProgress::Sent(tx_id) => {
                info!(%id, %tx_id, "Transaction submitted");
                tx.mark_submitted(tx_id)
            }
            TxProgress::Confirmed => tx.mark_confirmed(),
            TxProgress::Failed(err) => {
                warn!(%id, error = %err, "Transaction failed");
                tx.mark_failed(err)
            }
        };
        if !changed {
            debug!(%id, status = %tx.status(), "Discarding progress of a finished transaction");
            return Update::TransactionDiscarded;
        }
        if tx.status() == TransactionStatus::Confirmed {
            info!(%id, tx_id = opt(&tx.tx_id()), "Transaction confirmed");
        }
        Update::TransactionChanged(tx.status().into())
    }
}

async fn send(events: &Sender<Message>, event: Event) {
    if events.send(Message::Event(event)).await.is_err() {
        trace!("Orchestrator dropped, discarding event");
    }
}

/// Polls the chain until `tx_id` settles or `bound` elapses. Transport errors are retried on the
/// next poll.
async fn await_confirmation<R: ChainRpc>(
    rpc: Arc<R>,
    tx_id: TxId,
    interval: Duration,
    bound: Duration,
) -> TxProgress {
    let poll = async {
        loop {
            match rpc.get_transaction_status(&tx_id).await {
                Ok(ChainTxStatus::Confirmed) => return TxProgress::Confirmed,
                Ok(ChainTxStatus::Failed) => {
                    return TxProgress::Failed(SwapError::TransactionFailed(format!(
                        "{tx_id} failed on chain"
                    )))
                }
                Ok(ChainTxStatus::Pending) => trace!(%tx_id, "Transaction pending"),
                Err(err) => warn!(%tx_id, error = %err, "Failed to poll transaction status"),
            }
            sleep(interval).await;
        }
    };
    match timeout(bound, poll).await {
        Ok(progress) => progress,
        Err(_) => TxProgress::Failed(SwapError::TransactionFailed(format!(
            "{tx_id} not confirmed within {}s",
            bound.as_secs()
        ))),
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use num_bigint::BigUint;
    use pairswap_common::{
        traits::{MockAggregator, MockChainRpc, MockWalletAdapter},
        AggregatorQuote, TransactionRequest,
    };
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::simulated::{SimulatedAggregator, SimulatedChain, SimulatedWallet};

    fn token(symbol: &str) -> Token {
        TokenCatalog::builtin()
            .find(Chain::Solana, symbol)
            .unwrap()
            .unwrap()
            .clone()
    }

    fn account() -> Account {
        Account::new("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU")
    }

    fn sol(amount: &str) -> BigUint {
        pairswap_common::amount::parse_units(amount, 9).unwrap()
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_debounce(Duration::from_millis(400))
            .with_quote_timeout(Duration::from_secs(5))
            .with_quote_ttl(Duration::from_secs(10))
            .with_confirmation_polling(Duration::from_secs(1), Duration::from_secs(30))
            .with_event_buffer(8)
    }

    fn sol_usdc() -> SimulatedAggregator {
        SimulatedAggregator::new(Duration::from_millis(100)).with_rate("SOL", "USDC", 100.0)
    }

    fn chain() -> SimulatedChain {
        SimulatedChain::new(2)
            .with_latency(Duration::from_millis(50))
            .with_balance(account(), token("SOL"), sol("5"))
    }

    fn connected() -> Arc<SimulatedWallet> {
        Arc::new(SimulatedWallet::new(Some(account())))
    }

    fn orchestrator<W, A>(
        chain: SimulatedChain,
        wallet: Arc<W>,
        aggregator: Arc<A>,
    ) -> SwapOrchestrator<W, SimulatedChain, A>
    where
        W: WalletAdapter + 'static,
        A: Aggregator + 'static,
    {
        SwapOrchestrator::new(
            Chain::Solana,
            TokenCatalog::builtin(),
            wallet,
            Arc::new(chain),
            aggregator,
            config(),
        )
        .unwrap()
    }

    /// Brings the pair to `Ready` for 2 SOL -> USDC.
    async fn ready<W, R, A>(orchestrator: &mut SwapOrchestrator<W, R, A>)
    where
        W: WalletAdapter + 'static,
        R: ChainRpc + 'static,
        A: Aggregator + 'static,
    {
        orchestrator
            .select_to_token(token("USDC"))
            .unwrap();
        orchestrator
            .set_amount(Side::From, "2")
            .unwrap();
        orchestrator.settle().await;
        assert_eq!(orchestrator.status(), SwapStatus::Ready);
    }

    /// Answers at a rate of 100 USDC per SOL. A request for exactly 1 SOL takes much longer than
    /// any other.
    #[derive(Default)]
    struct DelayedAggregator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Aggregator for DelayedAggregator {
        async fn quote(&self, request: &QuoteRequest) -> Result<AggregatorQuote, SwapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = if request.amount == request.given_token().one() {
                Duration::from_secs(3)
            } else {
                Duration::from_millis(100)
            };
            sleep(delay).await;
            Ok(AggregatorQuote {
                amount: &request.amount / BigUint::from(10u32),
                route: vec![],
                fee_estimate: BigUint::from(0u32),
            })
        }

        async fn build_swap_transaction(
            &self,
            _quote: &Quote,
            _account: &Account,
        ) -> Result<TransactionRequest, SwapError> {
            Err(SwapError::NoRoute("quotes only".to_string()))
        }
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_end_to_end_swap() {
        let mut orchestrator = orchestrator(chain(), connected(), Arc::new(sol_usdc()));
        assert_eq!(orchestrator.pair().from_token(), Some(&token("SOL")));
        assert_eq!(orchestrator.pair().to_token(), None);
        assert_eq!(orchestrator.status(), SwapStatus::Idle);

        orchestrator
            .select_to_token(token("USDC"))
            .unwrap();
        assert!(orchestrator
            .set_amount(Side::From, "2")
            .unwrap());
        assert_eq!(orchestrator.status(), SwapStatus::Quoting);

        let updates = orchestrator.settle().await;

        let request = QuoteRequest::exact_in(token("SOL"), token("USDC"), sol("2"));
        assert!(updates.contains(&Update::QuoteRequested(request)));
        assert_eq!(orchestrator.pair().to_amount().value(), "200");
        assert!(!orchestrator.pair().to_amount().is_stale());
        assert_eq!(orchestrator.status(), SwapStatus::Ready);
        let quote = orchestrator.quote().unwrap();
        assert_eq!(quote.rate(), 100.0);
        assert_eq!(quote.display_rate(), "1 SOL ≈ 100 USDC");
        assert_eq!(
            orchestrator
                .balance()
                .unwrap()
                .display(),
            "5.0000"
        );

        orchestrator.submit().unwrap();
        assert_eq!(orchestrator.status(), SwapStatus::AwaitingSignature);

        let updates = orchestrator.settle().await;

        assert_eq!(
            updates,
            vec![
                Update::TransactionChanged(SwapStatus::Submitted),
                Update::TransactionChanged(SwapStatus::Confirmed)
            ]
        );
        assert_eq!(orchestrator.status(), SwapStatus::Confirmed);
        let tx = orchestrator.transaction().unwrap();
        assert_eq!(tx.result(), Some(Ok(&TxId("sim-solana-00000001".to_string()))));
        assert_eq!(tx.quote_used.output_amount, BigUint::from(200_000_000u64));
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_unsupported_chain() {
        let result = SwapOrchestrator::new(
            Chain::Bsc,
            TokenCatalog::new(),
            connected(),
            Arc::new(chain()),
            Arc::new(sol_usdc()),
            config(),
        );

        let Err(err) = result else { panic!("empty catalog accepted") };
        assert_eq!(err, OrchestratorError::Swap(SwapError::UnsupportedChain("bsc".to_string())));
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_no_route_leaves_derived_amount_stale() {
        let mut orchestrator = orchestrator(chain(), connected(), Arc::new(sol_usdc()));
        ready(&mut orchestrator).await;

        orchestrator
            .select_to_token(token("RAY"))
            .unwrap();
        let updates = orchestrator.settle().await;

        assert_eq!(updates, vec![Update::QuoteFailed(ErrorKind::NoRoute)]);
        assert_eq!(orchestrator.pair().to_amount().value(), "200");
        assert!(orchestrator.pair().to_amount().is_stale());
        assert_eq!(orchestrator.status(), SwapStatus::Idle);
        assert_eq!(
            orchestrator
                .last_quote_error()
                .map(SwapError::kind),
            Some(ErrorKind::NoRoute)
        );
        assert_eq!(orchestrator.submit(), Err(OrchestratorError::NotReady(SwapStatus::Idle)));
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_out_of_order_quote_is_discarded() {
        let aggregator = Arc::new(DelayedAggregator::default());
        let wallet = Arc::new(SimulatedWallet::new(None));
        let mut orchestrator = orchestrator(chain(), wallet, Arc::clone(&aggregator));
        orchestrator
            .select_to_token(token("USDC"))
            .unwrap();

        orchestrator
            .set_amount(Side::From, "1")
            .unwrap();
        assert!(matches!(orchestrator.next_update().await, Some(Update::QuoteRequested(_))));
        orchestrator
            .set_amount(Side::From, "2")
            .unwrap();
        assert!(matches!(orchestrator.next_update().await, Some(Update::QuoteRequested(_))));
        assert!(matches!(orchestrator.next_update().await, Some(Update::QuoteApplied(_))));
        assert_eq!(orchestrator.pair().to_amount().value(), "200");

        let superseded = QuoteRequest::exact_in(token("SOL"), token("USDC"), sol("1"));
        assert_eq!(orchestrator.next_update().await, Some(Update::QuoteDiscarded(superseded)));
        assert_eq!(orchestrator.pair().to_amount().value(), "200");
        assert_eq!(orchestrator.next_update().await, None);
        assert_eq!(aggregator.calls.load(Ordering::SeqCst), 2);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_debounce_coalesces_edits() {
        let aggregator = Arc::new(sol_usdc());
        let wallet = Arc::new(SimulatedWallet::new(None));
        let mut orchestrator = orchestrator(chain(), wallet, Arc::clone(&aggregator));
        orchestrator
            .select_to_token(token("USDC"))
            .unwrap();

        for value in ["1", "1.", "1.5"] {
            orchestrator
                .set_amount(Side::From, value)
                .unwrap();
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        let updates = orchestrator.settle().await;

        let requested: Vec<_> = updates
            .iter()
            .filter(|u| matches!(u, Update::QuoteRequested(_)))
            .collect();
        let expected = Update::QuoteRequested(QuoteRequest::exact_in(
            token("SOL"),
            token("USDC"),
            sol("1.5"),
        ));
        assert_eq!(requested, vec![&expected]);
        assert_eq!(
            updates
                .iter()
                .filter(|u| **u == Update::DebounceSuperseded)
                .count(),
            2
        );
        assert_eq!(aggregator.calls(), 1);
        assert_eq!(orchestrator.pair().to_amount().value(), "150");
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_invalid_input_is_ignored() {
        let mut orchestrator = orchestrator(chain(), connected(), Arc::new(sol_usdc()));
        ready(&mut orchestrator).await;

        assert_eq!(orchestrator.set_amount(Side::From, "2.x"), Ok(false));
        assert_eq!(orchestrator.set_amount(Side::To, "1.0000001"), Ok(false));

        assert_eq!(orchestrator.pair().from_amount().value(), "2");
        assert_eq!(orchestrator.status(), SwapStatus::Ready);
        assert!(orchestrator.settle().await.is_empty());
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_quote_timeout() {
        let aggregator =
            SimulatedAggregator::new(Duration::from_secs(60)).with_rate("SOL", "USDC", 100.0);
        let mut orchestrator = orchestrator(chain(), connected(), Arc::new(aggregator));
        orchestrator
            .select_to_token(token("USDC"))
            .unwrap();
        orchestrator
            .set_amount(Side::From, "2")
            .unwrap();

        let updates = orchestrator.settle().await;

        assert!(updates.contains(&Update::QuoteFailed(ErrorKind::NetworkUnavailable)));
        assert!(orchestrator.pair().to_amount().is_stale());
        assert_eq!(orchestrator.status(), SwapStatus::Idle);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_expired_quote_is_requoted_before_submission() {
        let aggregator = Arc::new(sol_usdc());
        let mut orchestrator = orchestrator(chain(), connected(), Arc::clone(&aggregator));
        ready(&mut orchestrator).await;
        assert_eq!(aggregator.calls(), 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(orchestrator.status(), SwapStatus::Ready);
        assert!(orchestrator
            .quote()
            .unwrap()
            .is_expired(now()));

        orchestrator.submit().unwrap();
        assert_eq!(orchestrator.status(), SwapStatus::Quoting);
        assert!(orchestrator.transaction().is_none());

        assert!(matches!(orchestrator.next_update().await, Some(Update::QuoteApplied(_))));
        assert_eq!(orchestrator.status(), SwapStatus::AwaitingSignature);
        assert_eq!(aggregator.calls(), 2);
        let tx = orchestrator.transaction().unwrap();
        assert!(!tx.quote_used.is_expired(now()));

        orchestrator.settle().await;
        assert_eq!(orchestrator.status(), SwapStatus::Confirmed);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_edit_during_requote_drops_submission() {
        let mut orchestrator = orchestrator(chain(), connected(), Arc::new(sol_usdc()));
        ready(&mut orchestrator).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        orchestrator.submit().unwrap();
        orchestrator
            .set_amount(Side::From, "3")
            .unwrap();
        orchestrator.settle().await;

        assert!(orchestrator.transaction().is_none());
        assert_eq!(orchestrator.status(), SwapStatus::Ready);
        assert_eq!(orchestrator.pair().to_amount().value(), "300");
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_pair_frozen_while_in_flight() {
        let wallet =
            Arc::new(SimulatedWallet::new(Some(account())).with_latency(Duration::from_secs(5)));
        let mut orchestrator = orchestrator(chain(), wallet, Arc::new(sol_usdc()));
        ready(&mut orchestrator).await;

        orchestrator.submit().unwrap();

        assert_eq!(orchestrator.set_amount(Side::From, "3"), Err(OrchestratorError::PairFrozen));
        assert_eq!(orchestrator.select_to_token(token("USDT")), Err(OrchestratorError::PairFrozen));
        assert_eq!(orchestrator.reverse(), Err(OrchestratorError::PairFrozen));
        assert_eq!(orchestrator.submit(), Err(OrchestratorError::TransactionInProgress));
        assert_eq!(
            orchestrator.dismiss().map(|tx| tx.id),
            Err(OrchestratorError::TransactionInProgress)
        );
        assert_eq!(orchestrator.pair().from_amount().value(), "2");
        assert_eq!(orchestrator.pair().to_amount().value(), "200");

        orchestrator.settle().await;
        assert_eq!(orchestrator.status(), SwapStatus::Confirmed);

        assert_eq!(orchestrator.set_amount(Side::From, "3"), Ok(true));
        assert_eq!(orchestrator.submit(), Err(OrchestratorError::AwaitingDismissal));
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_submit_requires_quote_and_wallet() {
        let wallet = Arc::new(SimulatedWallet::new(None));
        let mut disconnected = orchestrator(chain(), wallet, Arc::new(sol_usdc()));
        let mut orchestrator = orchestrator(chain(), connected(), Arc::new(sol_usdc()));
        assert_eq!(orchestrator.submit(), Err(OrchestratorError::NotReady(SwapStatus::Idle)));

        orchestrator
            .select_to_token(token("USDC"))
            .unwrap();
        orchestrator
            .set_amount(Side::From, "2")
            .unwrap();
        assert_eq!(orchestrator.submit(), Err(OrchestratorError::NotReady(SwapStatus::Quoting)));

        orchestrator
            .set_amount(Side::From, "0")
            .unwrap();
        assert_eq!(orchestrator.pair().to_amount().value(), "0");
        assert_eq!(orchestrator.submit(), Err(OrchestratorError::NotReady(SwapStatus::Idle)));

        assert_eq!(
            disconnected.submit(),
            Err(OrchestratorError::Swap(SwapError::WalletDisconnected))
        );
        assert!(orchestrator.transaction().is_none());
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_wallet_rejection() {
        let wallet = connected();
        wallet.set_approve(false);
        let mut orchestrator = orchestrator(chain(), wallet, Arc::new(sol_usdc()));
        ready(&mut orchestrator).await;

        orchestrator.submit().unwrap();
        let updates = orchestrator.settle().await;

        assert_eq!(
            updates,
            vec![Update::TransactionChanged(SwapStatus::Failed(ErrorKind::UserRejected))]
        );
        assert_eq!(
            orchestrator
                .transaction()
                .and_then(SwapTransaction::error),
            Some(&SwapError::UserRejected)
        );
        assert_eq!(orchestrator.submit(), Err(OrchestratorError::AwaitingDismissal));

        let tx = orchestrator.dismiss().unwrap();
        assert_eq!(tx.status(), TransactionStatus::Failed(ErrorKind::UserRejected));
        assert_eq!(orchestrator.status(), SwapStatus::Ready);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_wallet_disconnects_while_signing() {
        let mut wallet = MockWalletAdapter::new();
        wallet
            .expect_get_connected_account()
            .returning(|| Some(account()));
        wallet
            .expect_sign_and_send()
            .times(1)
            .returning(|_| Err(SwapError::WalletDisconnected));
        let mut orchestrator = orchestrator(chain(), Arc::new(wallet), Arc::new(sol_usdc()));
        ready(&mut orchestrator).await;

        orchestrator.submit().unwrap();
        orchestrator.settle().await;

        assert_eq!(orchestrator.status(), SwapStatus::Failed(ErrorKind::WalletDisconnected));
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_cancel_awaiting_signature() {
        let wallet =
            Arc::new(SimulatedWallet::new(Some(account())).with_latency(Duration::from_secs(5)));
        let mut orchestrator = orchestrator(chain(), wallet, Arc::new(sol_usdc()));
        ready(&mut orchestrator).await;
        assert_eq!(orchestrator.cancel(), Err(OrchestratorError::NoTransaction));

        orchestrator.submit().unwrap();
        assert_eq!(orchestrator.cancel(), Ok(SwapStatus::Cancelled));
        let updates = orchestrator.settle().await;

        assert_eq!(updates, vec![Update::TransactionDiscarded, Update::TransactionDiscarded]);
        assert_eq!(orchestrator.status(), SwapStatus::Cancelled);
        assert_eq!(orchestrator.cancel(), Err(OrchestratorError::AwaitingDismissal));
        assert!(orchestrator.dismiss().is_ok());
        assert_eq!(orchestrator.dismiss().map(|tx| tx.id), Err(OrchestratorError::NoTransaction));
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_dismiss_after_confirmation_requotes() {
        let aggregator = Arc::new(sol_usdc());
        let mut orchestrator = orchestrator(chain(), connected(), Arc::clone(&aggregator));
        ready(&mut orchestrator).await;
        orchestrator.submit().unwrap();
        orchestrator.settle().await;

        let tx = orchestrator.dismiss().unwrap();

        assert_eq!(tx.status(), TransactionStatus::Confirmed);
        assert!(orchestrator.transaction().is_none());
        assert_eq!(orchestrator.status(), SwapStatus::Quoting);
        assert!(orchestrator.balance_is_stale());

        orchestrator.settle().await;

        assert_eq!(aggregator.calls(), 2);
        assert_eq!(orchestrator.status(), SwapStatus::Ready);
        assert!(!orchestrator.balance_is_stale());
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_confirmation_failures() {
        let failing = chain().with_outcome(ChainTxStatus::Failed);
        let mut reverted = orchestrator(failing, connected(), Arc::new(sol_usdc()));
        ready(&mut reverted).await;
        reverted.submit().unwrap();
        reverted.settle().await;

        let never = SimulatedChain::new(usize::MAX).with_balance(account(), token("SOL"), sol("5"));
        let mut dropped = orchestrator(never, connected(), Arc::new(sol_usdc()));
        ready(&mut dropped).await;
        dropped.submit().unwrap();
        dropped.settle().await;

        for orchestrator in [&reverted, &dropped] {
            assert_eq!(orchestrator.status(), SwapStatus::Failed(ErrorKind::TransactionFailed));
            assert!(orchestrator
                .transaction()
                .and_then(SwapTransaction::tx_id)
                .is_some());
        }
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_stale_balance_is_discarded() {
        let chain = chain().with_balance(account(), token("USDC"), BigUint::from(12_500_000u64));
        let mut orchestrator = orchestrator(chain, connected(), Arc::new(sol_usdc()));

        orchestrator
            .select_from_token(token("USDC"))
            .unwrap();
        let updates = orchestrator.settle().await;

        assert_eq!(updates.len(), 2);
        assert!(updates.contains(&Update::BalanceDiscarded));
        let balance = orchestrator.balance().unwrap();
        assert_eq!(balance.token, token("USDC"));
        assert_eq!(balance.display(), "12.5000");
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_wallet_changed() {
        let wallet = connected();
        let mut orchestrator = orchestrator(chain(), Arc::clone(&wallet), Arc::new(sol_usdc()));
        ready(&mut orchestrator).await;

        wallet.disconnect();
        orchestrator.wallet_changed();

        assert_eq!(orchestrator.status(), SwapStatus::Idle);
        assert_eq!(orchestrator.balance(), None);
        assert_eq!(
            orchestrator.submit(),
            Err(OrchestratorError::Swap(SwapError::WalletDisconnected))
        );

        wallet.connect(account());
        orchestrator.wallet_changed();
        orchestrator.settle().await;

        assert_eq!(orchestrator.status(), SwapStatus::Ready);
        assert_eq!(orchestrator.account(), Some(&account()));
        assert!(orchestrator.balance().is_some());
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_reverse_requotes() {
        let mut orchestrator = orchestrator(chain(), connected(), Arc::new(sol_usdc()));
        ready(&mut orchestrator).await;

        orchestrator.reverse().unwrap();
        assert_eq!(orchestrator.status(), SwapStatus::Quoting);
        assert!(orchestrator.pair().from_amount().is_stale());
        orchestrator.settle().await;

        assert_eq!(orchestrator.pair().from_token(), Some(&token("USDC")));
        assert_eq!(orchestrator.pair().from_amount().value(), "200");
        assert_eq!(orchestrator.pair().to_amount().value(), "2");
        assert_eq!(
            orchestrator
                .quote()
                .map(|q| q.request.direction),
            Some(pairswap_common::QuoteDirection::AmountOut)
        );
        assert_eq!(
            orchestrator
                .balance()
                .map(|b| b.token.clone()),
            Some(token("USDC"))
        );

        orchestrator.reverse().unwrap();
        orchestrator.settle().await;

        assert_eq!(orchestrator.pair().from_token(), Some(&token("SOL")));
        assert_eq!(orchestrator.pair().to_token(), Some(&token("USDC")));
        assert_eq!(orchestrator.pair().to_amount().value(), "200");
        assert_eq!(orchestrator.status(), SwapStatus::Ready);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_unknown_token_is_rejected() {
        let mut orchestrator = orchestrator(chain(), connected(), Arc::new(sol_usdc()));
        let ethereum_usdc = TokenCatalog::builtin()
            .find(Chain::Ethereum, "USDC")
            .unwrap()
            .unwrap()
            .clone();

        assert_eq!(
            orchestrator.select_to_token(ethereum_usdc),
            Err(OrchestratorError::UnknownToken("USDC".to_string(), Chain::Solana))
        );
        assert_eq!(orchestrator.pair().to_token(), None);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_failed_requote_disables_submission() {
        let mut aggregator = MockAggregator::new();
        let mut calls = 0;
        aggregator
            .expect_quote()
            .times(2)
            .returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Ok(AggregatorQuote {
                        amount: BigUint::from(200_000_000u64),
                        route: vec!["Orca".to_string()],
                        fee_estimate: BigUint::from(5_000u64),
                    })
                } else {
                    Err(SwapError::NoRoute("SOL->USDC".to_string()))
                }
            });
        let mut orchestrator = orchestrator(chain(), connected(), Arc::new(aggregator));
        ready(&mut orchestrator).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        orchestrator.submit().unwrap();
        let updates = orchestrator.settle().await;

        assert_eq!(updates, vec![Update::QuoteFailed(ErrorKind::NoRoute)]);
        assert_eq!(orchestrator.status(), SwapStatus::Idle);
        assert!(orchestrator.quote().is_none());
        assert!(orchestrator.transaction().is_none());
        assert_eq!(orchestrator.pair().to_amount().value(), "200");
        assert!(orchestrator.pair().to_amount().is_stale());
        assert_eq!(orchestrator.submit(), Err(OrchestratorError::NotReady(SwapStatus::Idle)));
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_submit_picks_up_account_switch() {
        let other = Account::new("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM");
        let wallet = connected();
        let mut orchestrator = orchestrator(chain(), Arc::clone(&wallet), Arc::new(sol_usdc()));
        ready(&mut orchestrator).await;
        assert_eq!(
            orchestrator
                .balance()
                .map(|b| b.display()),
            Some("5.0000".to_string())
        );

        wallet.connect(other.clone());
        orchestrator.submit().unwrap();

        assert_eq!(orchestrator.account(), Some(&other));
        assert_eq!(orchestrator.balance(), None);
        assert!(orchestrator.balance_is_stale());

        let updates = orchestrator.settle().await;

        assert!(updates
            .iter()
            .any(|u| matches!(u, Update::BalanceApplied(b) if b.account == other)));
        let balance = orchestrator.balance().unwrap();
        assert_eq!(balance.account, other);
        assert_eq!(balance.display(), "0.0000");
        assert_eq!(orchestrator.status(), SwapStatus::Confirmed);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_balance_failure_does_not_block_quoting() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_balance()
            .returning(|_, _| Err(SwapError::RpcError("node unhealthy".to_string())));
        let mut orchestrator = SwapOrchestrator::new(
            Chain::Solana,
            TokenCatalog::builtin(),
            connected(),
            Arc::new(rpc),
            Arc::new(sol_usdc()),
            config(),
        )
        .unwrap();

        orchestrator
            .select_to_token(token("USDC"))
            .unwrap();
        orchestrator
            .set_amount(Side::From, "2")
            .unwrap();
        let updates = orchestrator.settle().await;

        assert!(updates.contains(&Update::BalanceFailed(ErrorKind::RpcError)));
        assert_eq!(orchestrator.balance(), None);
        assert!(orchestrator.balance_is_stale());
        assert_eq!(
            orchestrator
                .last_balance_error()
                .map(SwapError::kind),
            Some(ErrorKind::RpcError)
        );
        assert_eq!(orchestrator.pair().to_amount().value(), "200");
        assert_eq!(orchestrator.status(), SwapStatus::Ready);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_confirmation_polling_retries_rpc_errors() {
        let mut rpc = MockChainRpc::new();
        let mut polls = 0;
        rpc.expect_get_transaction_status()
            .times(3)
            .returning(move |_| {
                polls += 1;
                match polls {
                    1 => Err(SwapError::RpcError("connection reset".to_string())),
                    2 => Ok(ChainTxStatus::Pending),
                    _ => Ok(ChainTxStatus::Confirmed),
                }
            });

        let progress = await_confirmation(
            Arc::new(rpc),
            TxId("sim-solana-00000001".to_string()),
            Duration::from_secs(1),
            Duration::from_secs(30),
        )
        .await;

        assert!(matches!(progress, TxProgress::Confirmed));
    }
}
