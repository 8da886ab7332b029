use std::fmt::{Display, Formatter};

use chrono::NaiveDateTime;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::token::Token;
use crate::amount::format_units_fixed;

/// Fractional digits shown for a balance.
const DISPLAY_PRECISION: u32 = 4;

/// A wallet account, e.g. a base58 public key or a hex address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account(pub String);

impl Account {
    pub fn new(address: &str) -> Self {
        Self(address.to_string())
    }
}

impl Display for Account {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Balance of `token` held by `account`, observed at `as_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub account: Account,
    pub token: Token,
    /// Base units of `token`.
    pub amount: BigUint,
    pub as_of: NaiveDateTime,
}

impl Balance {
    pub fn new(account: Account, token: Token, amount: BigUint, as_of: NaiveDateTime) -> Self {
        Self { account, token, amount, as_of }
    }

    /// Amount in whole tokens with four fractional digits, e.g. `1.2345`.
    pub fn display(&self) -> String {
        format_units_fixed(&self.amount, self.token.decimals, DISPLAY_PRECISION)
    }
}
