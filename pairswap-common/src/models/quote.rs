use std::time::{Duration, Instant};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::token::Token;
use crate::amount::{format_units, to_f64};

/// Determines whether a quote is for a given input amount or desired output amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum QuoteDirection {
    /// Quote is for a specific input amount, calculate output amount.
    AmountIn,
    /// Quote is for a specific output amount, calculate required input amount.
    AmountOut,
}

/// The exact question a quote answers.
///
/// Two requests are equal only if tokens, base-unit amount and direction all match, which is
/// what decides whether an arriving quote still applies to the pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteRequest {
    pub input: Token,
    pub output: Token,
    /// Base units of `input` for `AmountIn`, of `output` for `AmountOut`.
    pub amount: BigUint,
    pub direction: QuoteDirection,
}

impl QuoteRequest {
    pub fn new(input: Token, output: Token, amount: BigUint, direction: QuoteDirection) -> Self {
        Self { input, output, amount, direction }
    }

    pub fn exact_in(input: Token, output: Token, amount: BigUint) -> Self {
        Self::new(input, output, amount, QuoteDirection::AmountIn)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == BigUint::from(0u32)
    }

    /// Token whose amount was given by the user.
    pub fn given_token(&self) -> &Token {
        match self.direction {
            QuoteDirection::AmountIn => &self.input,
            QuoteDirection::AmountOut => &self.output,
        }
    }

    /// Token whose amount the aggregator computes.
    pub fn derived_token(&self) -> &Token {
        match self.direction {
            QuoteDirection::AmountIn => &self.output,
            QuoteDirection::AmountOut => &self.input,
        }
    }
}

impl std::fmt::Display for QuoteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}->{} {} {}",
            self.input.symbol,
            self.output.symbol,
            self.direction,
            format_units(&self.amount, self.given_token().decimals)
        )
    }
}

/// Raw answer of an aggregator to a [`QuoteRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorQuote {
    /// The computed amount in base units: output for `AmountIn`, input for `AmountOut`.
    pub amount: BigUint,
    /// Human readable hop labels, e.g. pool or venue names.
    pub route: Vec<String>,
    /// Estimated network fee in base units of the chain's native asset.
    pub fee_estimate: BigUint,
}

/// A time-bounded, immutable answer for one exact [`QuoteRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub request: QuoteRequest,
    pub input_amount: BigUint,
    pub output_amount: BigUint,
    pub route: Vec<String>,
    pub fee_estimate: BigUint,
    pub fetched_at: Instant,
    pub expires_at: Instant,
}

impl Quote {
    pub fn new(
        request: QuoteRequest,
        answer: AggregatorQuote,
        fetched_at: Instant,
        ttl: Duration,
    ) -> Self {
        let (input_amount, output_amount) = match request.direction {
            QuoteDirection::AmountIn => (request.amount.clone(), answer.amount),
            QuoteDirection::AmountOut => (answer.amount, request.amount.clone()),
        };
        Self {
            request,
            input_amount,
            output_amount,
            route: answer.route,
            fee_estimate: answer.fee_estimate,
            fetched_at,
            expires_at: fetched_at + ttl,
        }
    }

    /// The quote for an empty or zero amount; never requires an aggregator.
    pub fn zero(request: QuoteRequest, fetched_at: Instant, ttl: Duration) -> Self {
        let answer = AggregatorQuote {
            amount: BigUint::from(0u32),
            route: Vec::new(),
            fee_estimate: BigUint::from(0u32),
        };
        Self::new(request, answer, fetched_at, ttl)
    }

    pub fn input_token(&self) -> &Token {
        &self.request.input
    }

    pub fn output_token(&self) -> &Token {
        &self.request.output
    }

    /// Whether this quote answers exactly `request`. Any difference invalidates it regardless of
    /// expiry.
    pub fn answers(&self, request: &QuoteRequest) -> bool {
        &self.request == request
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// The amount the aggregator computed, in base units of [`QuoteRequest::derived_token`].
    pub fn derived_amount(&self) -> &BigUint {
        match self.request.direction {
            QuoteDirection::AmountIn => &self.output_amount,
            QuoteDirection::AmountOut => &self.input_amount,
        }
    }

    /// Output per unit of input, in whole tokens. Zero when the input is zero.
    pub fn rate(&self) -> f64 {
        let input = to_f64(&self.input_amount, self.input_token().decimals);
        if input == 0.0 {
            return 0.0;
        }
        to_f64(&self.output_amount, self.output_token().decimals) / input
    }

    /// Rate line as shown next to the amounts, e.g. `1 SOL ≈ 100 USDC`.
    pub fn display_rate(&self) -> String {
        let rate = format!("{:.6}", self.rate());
        let rate = rate
            .trim_end_matches('0')
            .trim_end_matches('.');
        format!("1 {} ≈ {} {}", self.input_token().symbol, rate, self.output_token().symbol)
    }
}
