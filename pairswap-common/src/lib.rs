pub mod amount;
pub mod catalog;
pub mod display;
pub mod models;
pub mod traits;

pub use catalog::TokenCatalog;
pub use models::{
    balance::{Account, Balance},
    error::{ErrorKind, SwapError},
    quote::{AggregatorQuote, Quote, QuoteDirection, QuoteRequest},
    token::Token,
    transaction::{ChainTxStatus, TransactionRequest, TxId},
    Address, Chain,
};
