//! The (from token, to token, from amount, to amount) tuple and its invariants.
//!
//! All operations are synchronous transformations. The side the user edited last is
//! authoritative; the other side is derived from a quote and flagged stale until a quote for the
//! current tuple confirms it.
use pairswap_common::{
    amount::{fraction_digits, format_units, is_valid_decimal_input, parse_units},
    Quote, QuoteDirection, QuoteRequest, Token,
};
use strum_macros::Display;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Side {
    From,
    To,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::From => Side::To,
            Side::To => Side::From,
        }
    }
}

/// A decimal amount as shown in one of the two input fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountField {
    value: String,
    stale: bool,
}

impl AmountField {
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the value no longer answers the current tuple and awaits a fresh quote.
    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

#[derive(Debug, Clone)]
pub struct PairState {
    from_token: Option<Token>,
    to_token: Option<Token>,
    from_amount: AmountField,
    to_amount: AmountField,
    last_edited: Side,
}

impl PairState {
    pub fn new(from_token: Token, to_token: Option<Token>) -> Self {
        let mut pair = Self {
            from_token: None,
            to_token: None,
            from_amount: AmountField::default(),
            to_amount: AmountField::default(),
            last_edited: Side::From,
        };
        pair.set_to_token_opt(to_token);
        pair.set_from_token(from_token);
        pair
    }

    pub fn token(&self, side: Side) -> Option<&Token> {
        match side {
            Side::From => self.from_token.as_ref(),
            Side::To => self.to_token.as_ref(),
        }
    }

    pub fn from_token(&self) -> Option<&Token> {
        self.from_token.as_ref()
    }

    pub fn to_token(&self) -> Option<&Token> {
        self.to_token.as_ref()
    }

    pub fn amount(&self, side: Side) -> &AmountField {
        match side {
            Side::From => &self.from_amount,
            Side::To => &self.to_amount,
        }
    }

    pub fn from_amount(&self) -> &AmountField {
        &self.from_amount
    }

    pub fn to_amount(&self) -> &AmountField {
        &self.to_amount
    }

    pub fn last_edited(&self) -> Side {
        self.last_edited
    }

    /// The side whose amount is computed by quotes.
    pub fn derived_side(&self) -> Side {
        self.last_edited.other()
    }

    /// Selects the `from` token. A `to` token with the same symbol is evicted rather than the
    /// selection being refused. Returns whether anything changed.
    pub fn set_from_token(&mut self, token: Token) -> bool {
        self.select(Side::From, token)
    }

    /// Selects the `to` token, evicting a `from` token with the same symbol.
    pub fn set_to_token(&mut self, token: Token) -> bool {
        self.select(Side::To, token)
    }

    fn set_to_token_opt(&mut self, token: Option<Token>) {
        if let Some(token) = token {
            self.select(Side::To, token);
        }
    }

    fn select(&mut self, side: Side, token: Token) -> bool {
        if self.token(side) == Some(&token) {
            return false;
        }
        let other = self.token_slot(side.other());
        if other
            .as_ref()
            .is_some_and(|t| t.same_symbol(&token))
        {
            trace!(%side, symbol = %token.symbol, "Evicting duplicate token from the other side");
            *other = None;
        }
        *self.token_slot(side) = Some(token);
        self.mark_derived_stale();
        true
    }

    fn token_slot(&mut self, side: Side) -> &mut Option<Token> {
        match side {
            Side::From => &mut self.from_token,
            Side::To => &mut self.to_token,
        }
    }

    fn amount_slot(&mut self, side: Side) -> &mut AmountField {
        match side {
            Side::From => &mut self.from_amount,
            Side::To => &mut self.to_amount,
        }
    }

    /// Records a user edit of `side`. Input that is not a non-negative decimal, or that is more
    /// precise than the side's token allows, is ignored. Returns whether the edit was accepted.
    pub fn set_amount(&mut self, side: Side, value: &str) -> bool {
        if !is_valid_decimal_input(value) {
            return false;
        }
        if let Some(token) = self.token(side) {
            if fraction_digits(value) > token.decimals as usize {
                return false;
            }
        }
        *self.amount_slot(side) = AmountField { value: value.to_string(), stale: false };
        self.last_edited = side;
        self.mark_derived_stale();
        true
    }

    /// Swaps tokens and amounts between the sides and flips the authoritative side.
    ///
    /// The swapped amounts were a matched pair, but the reversed trade is priced differently, so
    /// the derived side is still flagged for re-quoting.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.from_token, &mut self.to_token);
        std::mem::swap(&mut self.from_amount, &mut self.to_amount);
        self.last_edited = self.last_edited.other();
        self.mark_derived_stale();
    }

    pub fn mark_derived_stale(&mut self) {
        self.amount_slot(self.derived_side())
            .stale = true;
    }

    /// The quote that would confirm the derived side, if the tuple is complete.
    ///
    /// `None` when a token is missing or when the authoritative amount is more precise than its
    /// token, which can happen after the token of an already typed amount is changed.
    pub fn quote_request(&self) -> Option<QuoteRequest> {
        let from = self.from_token.clone()?;
        let to = self.to_token.clone()?;
        let given = self.last_edited;
        let token = self.token(given)?;
        let amount = parse_units(self.amount(given).value(), token.decimals).ok()?;
        let direction = match given {
            Side::From => QuoteDirection::AmountIn,
            Side::To => QuoteDirection::AmountOut,
        };
        Some(QuoteRequest::new(from, to, amount, direction))
    }

    /// Writes the quote's result into the derived side if the quote answers the current tuple.
    pub fn apply_quote(&mut self, quote: &Quote) -> bool {
        if self.quote_request().as_ref() != Some(&quote.request) {
            return false;
        }
        let given = self.amount(self.last_edited).value();
        let value = if given.is_empty() || given == "." {
            String::new()
        } else {
            format_units(quote.derived_amount(), quote.request.derived_token().decimals)
        };
        *self.amount_slot(self.derived_side()) = AmountField { value, stale: false };
        true
    }
}
