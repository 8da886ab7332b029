use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use pairswap_common::{amount::format_units, Account, Chain, Token, TokenCatalog};
use tracing::{debug, info};
use tracing_appender::rolling;

use crate::{
    config::OrchestratorConfig,
    orchestrator::{SwapOrchestrator, SwapStatus, Update},
    pair::Side,
    simulated::{SimulatedAggregator, SimulatedChain, SimulatedWallet},
};

/// Account used by the simulated wallet.
const DEMO_ACCOUNT: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

/// Network fee quoted by the simulated aggregator, as a fraction of one native token.
const DEMO_FEE_DIVISOR: u32 = 200_000;

/// Pairswap demo - runs one swap end-to-end against simulated collaborators
///
/// The wallet, the chain and the aggregator are in-memory stand-ins with realistic latencies, so
/// the full quote, sign and confirm cycle can be observed without any network access.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
struct CliArgs {
    /// The chain whose token list is used: solana, ethereum or bsc.
    #[clap(short = 'c', long, default_value = "solana", env = "PAIRSWAP_CHAIN")]
    chain: String,

    /// Symbol of the token to sell. Defaults to the chain's native asset.
    #[clap(long)]
    from: Option<String>,

    /// Symbol of the token to buy. Defaults to the suggested token of the chain.
    #[clap(long)]
    to: Option<String>,

    /// Amount of the `from` token to sell, as a decimal.
    #[clap(short = 'a', long, default_value = "1")]
    amount: String,

    /// Simulated exchange rate: whole `to` tokens per whole `from` token.
    #[clap(long, default_value = "100")]
    rate: f64,

    /// Quiet window after typing before a quote is requested, in milliseconds.
    #[clap(long, default_value = "400")]
    debounce_ms: u64,

    /// How long a quote stays valid for submission, in seconds.
    #[clap(long, default_value = "10")]
    quote_ttl_secs: u64,

    /// Make the simulated user reject the signature request.
    #[clap(long)]
    reject: bool,

    /// Logging folder path.
    #[clap(long, default_value = "logs")]
    log_folder: String,

    /// Enable verbose logging.
    #[clap(long)]
    verbose: bool,
}

impl CliArgs {
    fn validate(&self) -> Result<(), String> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err("rate must be a positive number".to_string());
        }
        if self.quote_ttl_secs == 0 {
            return Err("quote_ttl_secs must be at least 1".to_string());
        }
        if self.amount.is_empty() ||
            !pairswap_common::amount::is_valid_decimal_input(&self.amount) ||
            pairswap_common::amount::is_zero_input(&self.amount)
        {
            return Err(format!("amount must be a positive decimal, got '{}'", self.amount));
        }
        Ok(())
    }

    fn config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_debounce(Duration::from_millis(self.debounce_ms))
            .with_quote_ttl(Duration::from_secs(self.quote_ttl_secs))
    }
}

pub async fn run_cli() -> anyhow::Result<()> {
    // Parse CLI Args
    let args: CliArgs = CliArgs::parse();
    args.validate()
        .map_err(|e| anyhow!(e))?;

    // Setup Logging
    let log_level = if args.verbose { "debug" } else { "info" };
    let (non_blocking, _guard) =
        tracing_appender::non_blocking(rolling::never(&args.log_folder, "pairswap.log"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(non_blocking)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set up logging subscriber")?;

    run(args).await
}

fn find_token(catalog: &TokenCatalog, chain: Chain, symbol: &str) -> anyhow::Result<Token> {
    catalog
        .find(chain, symbol)?
        .cloned()
        .ok_or_else(|| anyhow!("Token {symbol} is not listed on {chain}"))
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let chain = Chain::parse(&args.chain)?;
    let catalog = TokenCatalog::builtin();
    let native = catalog.default_pair(chain)?.0;
    let from = match &args.from {
        Some(symbol) => find_token(&catalog, chain, symbol)?,
        None => native.clone(),
    };
    let to = match &args.to {
        Some(symbol) => find_token(&catalog, chain, symbol)?,
        None => catalog.suggested_to_token(chain)?,
    };
    if from.same_symbol(&to) {
        bail!("Cannot swap {from} for itself");
    }
    info!(%chain, %from, %to, amount = %args.amount, "Running demo swap");

    let account = Account::new(DEMO_ACCOUNT);
    let aggregator = SimulatedAggregator::new(Duration::from_millis(150))
        .with_rate(&from.symbol, &to.symbol, args.rate)
        .with_fee_estimate(native.one() / DEMO_FEE_DIVISOR);
    let wallet =
        SimulatedWallet::new(Some(account.clone())).with_latency(Duration::from_millis(500));
    wallet.set_approve(!args.reject);
    let rpc = SimulatedChain::new(3)
        .with_latency(Duration::from_millis(50))
        .with_balance(account, from.clone(), from.one() * 10u32);

    let mut orchestrator = SwapOrchestrator::new(
        chain,
        catalog,
        Arc::new(wallet),
        Arc::new(rpc),
        Arc::new(aggregator),
        args.config(),
    )?;
    orchestrator.select_from_token(from)?;
    orchestrator.select_to_token(to)?;
    if !orchestrator.set_amount(Side::From, &args.amount)? {
        bail!("Amount {} is more precise than the token allows", args.amount);
    }

    let mut status = orchestrator.status();
    println!("status: {status:?}");
    while let Some(update) = orchestrator.next_update().await {
        debug!(?update, "Applied update");
        match &update {
            Update::BalanceApplied(balance) => {
                println!("balance: {} {}", balance.display(), balance.token);
            }
            Update::QuoteApplied(quote) => {
                println!(
                    "quote: {} {} -> {} {} ({}), route: {}, fee: {} {}",
                    format_units(&quote.input_amount, quote.input_token().decimals),
                    quote.input_token(),
                    format_units(&quote.output_amount, quote.output_token().decimals),
                    quote.output_token(),
                    quote.display_rate(),
                    quote.route.join(" > "),
                    format_units(&quote.fee_estimate, native.decimals),
                    native
                );
            }
            Update::QuoteFailed(kind) => println!("quote failed: {kind}"),
            _ => {}
        }

        let current = orchestrator.status();
        if current != status {
            println!("status: {current:?}");
            status = current;
        }
        if current == SwapStatus::Ready && orchestrator.transaction().is_none() {
            orchestrator.submit()?;
        }
    }

    let Some(tx) = orchestrator.transaction() else {
        let reason = orchestrator
            .last_quote_error()
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("swap ended in {status:?}"));
        bail!("No swap was submitted: {reason}");
    };
    match tx.result() {
        Some(Ok(tx_id)) => {
            println!("confirmed: {tx_id}");
            Ok(())
        }
        _ => {
            let reason = tx
                .error()
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("{:?}", tx.status()));
            bail!("Swap {} did not complete: {reason}", tx.id)
        }
    }
}
