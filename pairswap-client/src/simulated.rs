//! In-memory collaborators for demos and tests.
//!
//! They follow the collaborator contracts faithfully, including latency, so the orchestrator can
//! be exercised end-to-end without a wallet, a node or an aggregator service.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use num_bigint::BigUint;
use pairswap_common::{
    amount::{parse_units, to_f64},
    traits::{Aggregator, ChainRpc, WalletAdapter},
    Account, AggregatorQuote, ChainTxStatus, Quote, QuoteDirection, QuoteRequest, SwapError,
    Token, TransactionRequest, TxId,
};
use tokio::time::sleep;
use tracing::trace;

/// Prices swaps from a fixed table of exchange rates keyed by symbol.
pub struct SimulatedAggregator {
    rates: HashMap<(String, String), f64>,
    spread_bps: u32,
    latency: Duration,
    fee_estimate: BigUint,
    calls: AtomicUsize,
}

impl SimulatedAggregator {
    pub fn new(latency: Duration) -> Self {
        Self {
            rates: HashMap::new(),
            spread_bps: 0,
            latency,
            fee_estimate: BigUint::from(5_000u32),
            calls: AtomicUsize::new(0),
        }
    }

    /// Whole `to` tokens received per whole `from` token. The opposite direction is priced at the
    /// inverse rate unless set explicitly.
    pub fn with_rate(mut self, from: &str, to: &str, rate: f64) -> Self {
        self.rates
            .insert((from.to_string(), to.to_string()), rate);
        self
    }

    /// Fraction of the output kept by the venue, in basis points.
    pub fn with_spread_bps(mut self, spread_bps: u32) -> Self {
        self.spread_bps = spread_bps.min(10_000);
        self
    }

    pub fn with_fee_estimate(mut self, fee_estimate: BigUint) -> Self {
        self.fee_estimate = fee_estimate;
        self
    }

    /// Number of quote requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn rate(&self, input: &Token, output: &Token) -> Option<f64> {
        let key = (input.symbol.clone(), output.symbol.clone());
        if let Some(rate) = self.rates.get(&key) {
            return Some(*rate);
        }
        self.rates
            .get(&(key.1, key.0))
            .filter(|rate| **rate > 0.0)
            .map(|rate| 1.0 / rate)
    }
}

#[async_trait]
impl Aggregator for SimulatedAggregator {
    async fn quote(&self, request: &QuoteRequest) -> Result<AggregatorQuote, SwapError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sleep(self.latency).await;

        let rate = self
            .rate(&request.input, &request.output)
            .filter(|rate| *rate > 0.0)
            .ok_or_else(|| {
                SwapError::NoRoute(format!("{}->{}", request.input.symbol, request.output.symbol))
            })?;
        let kept = 1.0 - f64::from(self.spread_bps) / 10_000.0;
        let given = to_f64(&request.amount, request.given_token().decimals);
        let derived = match request.direction {
            QuoteDirection::AmountIn => given * rate * kept,
            QuoteDirection::AmountOut if kept > 0.0 => given / rate / kept,
            QuoteDirection::AmountOut => {
                return Err(SwapError::NoRoute("no liquidity left after spread".to_string()))
            }
        };
        let decimals = request.derived_token().decimals;
        let amount = parse_units(&format!("{:.*}", decimals as usize, derived), decimals)?;
        trace!(%amount, rate, "Simulated quote");

        Ok(AggregatorQuote {
            amount,
            route: vec![format!("Simulated {}/{}", request.input.symbol, request.output.symbol)],
            fee_estimate: self.fee_estimate.clone(),
        })
    }

    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        account: &Account,
    ) -> Result<TransactionRequest, SwapError> {
        let payload = format!(
            "swap {} {} -> {} {}",
            quote.input_amount,
            quote.input_token().address,
            quote.output_amount,
            quote.output_token().address
        );
        Ok(TransactionRequest {
            chain: quote.input_token().chain,
            signer: account.clone(),
            payload: payload.into_bytes(),
        })
    }
}

/// A wallet whose connection and approval behaviour can be switched at runtime.
pub struct SimulatedWallet {
    account: Mutex<Option<Account>>,
    approve: AtomicBool,
    latency: Duration,
    sent: AtomicUsize,
}

impl SimulatedWallet {
    pub fn new(account: Option<Account>) -> Self {
        Self {
            account: Mutex::new(account),
            approve: AtomicBool::new(true),
            latency: Duration::ZERO,
            sent: AtomicUsize::new(0),
        }
    }

    /// Time the simulated user takes to approve or reject.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn connect(&self, account: Account) {
        if let Ok(mut current) = self.account.lock() {
            *current = Some(account);
        }
    }

    pub fn disconnect(&self) {
        if let Ok(mut current) = self.account.lock() {
            *current = None;
        }
    }

    /// Whether signature requests are approved (`true`) or rejected by the user.
    pub fn set_approve(&self, approve: bool) {
        self.approve
            .store(approve, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletAdapter for SimulatedWallet {
    fn get_connected_account(&self) -> Option<Account> {
        self.account
            .lock()
            .ok()
            .and_then(|account| account.clone())
    }

    async fn sign_and_send(&self, request: TransactionRequest) -> Result<TxId, SwapError> {
        sleep(self.latency).await;
        let account = self
            .get_connected_account()
            .ok_or(SwapError::WalletDisconnected)?;
        if account != request.signer {
            return Err(SwapError::WalletDisconnected);
        }
        if !self.approve.load(Ordering::SeqCst) {
            return Err(SwapError::UserRejected);
        }
        let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxId(format!("sim-{}-{:08x}", request.chain, n)))
    }
}

/// Chain state held in memory. Every transaction stays pending for a number of status polls and
/// then settles on a fixed outcome.
pub struct SimulatedChain {
    balances: Mutex<HashMap<(Account, Token), BigUint>>,
    polls: Mutex<HashMap<TxId, usize>>,
    confirm_after: usize,
    outcome: ChainTxStatus,
    latency: Duration,
}

impl SimulatedChain {
    pub fn new(confirm_after: usize) -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            polls: Mutex::new(HashMap::new()),
            confirm_after,
            outcome: ChainTxStatus::Confirmed,
            latency: Duration::ZERO,
        }
    }

    pub fn with_balance(self, account: Account, token: Token, amount: BigUint) -> Self {
        self.set_balance(account, token, amount);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Final status of every transaction, `Confirmed` by default.
    pub fn with_outcome(mut self, outcome: ChainTxStatus) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn set_balance(&self, account: Account, token: Token, amount: BigUint) {
        if let Ok(mut balances) = self.balances.lock() {
            balances.insert((account, token), amount);
        }
    }
}

#[async_trait]
impl ChainRpc for SimulatedChain {
    async fn get_balance(&self, account: &Account, token: &Token) -> Result<BigUint, SwapError> {
        sleep(self.latency).await;
        let balances = self
            .balances
            .lock()
            .map_err(|_| SwapError::RpcError("balance store unavailable".to_string()))?;
        Ok(balances
            .get(&(account.clone(), token.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_transaction_status(&self, tx_id: &TxId) -> Result<ChainTxStatus, SwapError> {
        sleep(self.latency).await;
        let mut polls = self
            .polls
            .lock()
            .map_err(|_| SwapError::RpcError("transaction store unavailable".to_string()))?;
        let seen = polls.entry(tx_id.clone()).or_insert(0);
        *seen += 1;
        if *seen >= self.confirm_after {
            Ok(self.outcome)
        } else {
            Ok(ChainTxStatus::Pending)
        }
    }
}

#[cfg(test)]
mod test {
    use pairswap_common::{Chain, ErrorKind, TokenCatalog};
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    fn tokens() -> Vec<Token> {
        TokenCatalog::builtin()
            .list_tokens(Chain::Solana)
            .unwrap()
            .to_vec()
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_aggregator_rates() {
        let tokens = tokens();
        let (sol, usdc) = (tokens[0].clone(), tokens[1].clone());
        let aggregator =
            SimulatedAggregator::new(Duration::from_millis(50)).with_rate("SOL", "USDC", 100.0);

        let exact_in = aggregator
            .quote(&QuoteRequest::exact_in(
                sol.clone(),
                usdc.clone(),
                BigUint::from(2_000_000_000u64),
            ))
            .await
            .unwrap();
        let reversed = aggregator
            .quote(&QuoteRequest::exact_in(usdc.clone(), sol.clone(), BigUint::from(50_000_000u64)))
            .await
            .unwrap();
        let exact_out = aggregator
            .quote(&QuoteRequest::new(
                sol,
                usdc,
                BigUint::from(300_000_000u64),
                QuoteDirection::AmountOut,
            ))
            .await
            .unwrap();

        assert_eq!(exact_in.amount, BigUint::from(200_000_000u64));
        assert_eq!(reversed.amount, BigUint::from(500_000_000u64));
        assert_eq!(exact_out.amount, BigUint::from(3_000_000_000u64));
        assert_eq!(aggregator.calls(), 3);
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_aggregator_spread_and_missing_route() {
        let tokens = tokens();
        let aggregator = SimulatedAggregator::new(Duration::ZERO)
            .with_rate("SOL", "USDC", 100.0)
            .with_spread_bps(100);

        let quote = aggregator
            .quote(&QuoteRequest::exact_in(
                tokens[0].clone(),
                tokens[1].clone(),
                BigUint::from(1_000_000_000u64),
            ))
            .await
            .unwrap();
        let err = aggregator
            .quote(&QuoteRequest::exact_in(
                tokens[0].clone(),
                tokens[3].clone(),
                BigUint::from(1u32),
            ))
            .await
            .unwrap_err();

        assert_eq!(quote.amount, BigUint::from(99_000_000u64));
        assert_eq!(err.kind(), ErrorKind::NoRoute);
    }

    #[test(tokio::test)]
    async fn test_wallet() {
        let account = Account::new("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        let wallet = SimulatedWallet::new(Some(account.clone()));
        let request = TransactionRequest { chain: Chain::Solana, signer: account, payload: vec![] };

        let tx_id = wallet
            .sign_and_send(request.clone())
            .await
            .unwrap();
        assert_eq!(tx_id, TxId("sim-solana-00000001".to_string()));

        wallet.set_approve(false);
        assert_eq!(wallet.sign_and_send(request.clone()).await, Err(SwapError::UserRejected));

        wallet.disconnect();
        assert_eq!(wallet.get_connected_account(), None);
        assert_eq!(wallet.sign_and_send(request).await, Err(SwapError::WalletDisconnected));
    }

    #[test(tokio::test)]
    async fn test_chain_confirms_after_polls() {
        let chain = SimulatedChain::new(2);
        let tx_id = TxId("sim".to_string());

        assert_eq!(chain.get_transaction_status(&tx_id).await, Ok(ChainTxStatus::Pending));
        assert_eq!(chain.get_transaction_status(&tx_id).await, Ok(ChainTxStatus::Confirmed));
    }

    #[test(tokio::test)]
    async fn test_chain_balances() {
        let tokens = tokens();
        let account = Account::new("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        let chain = SimulatedChain::new(1).with_balance(
            account.clone(),
            tokens[0].clone(),
            BigUint::from(42u32),
        );

        assert_eq!(chain.get_balance(&account, &tokens[0]).await, Ok(BigUint::from(42u32)));
        assert_eq!(chain.get_balance(&account, &tokens[1]).await, Ok(BigUint::from(0u32)));
    }
}
