use chrono::{NaiveDateTime, Utc};
use pairswap_common::{ErrorKind, Quote, SwapError, TxId};
use strum_macros::Display;
use uuid::Uuid;

/// Lifecycle of a swap transaction.
///
/// `AwaitingSignature -> Submitted -> Confirmed | Failed`, with `Failed` and `Cancelled`
/// reachable from both non-terminal states. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TransactionStatus {
    AwaitingSignature,
    Submitted,
    Confirmed,
    Failed(ErrorKind),
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Confirmed |
                TransactionStatus::Failed(_) |
                TransactionStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone)]
pub struct SwapTransaction {
    pub id: Uuid,
    status: TransactionStatus,
    /// The quote the swap was built from, kept verbatim.
    pub quote_used: Quote,
    pub submitted_at: NaiveDateTime,
    tx_id: Option<TxId>,
    error: Option<SwapError>,
}

impl SwapTransaction {
    pub fn new(quote_used: Quote) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: TransactionStatus::AwaitingSignature,
            quote_used,
            submitted_at: Utc::now().naive_utc(),
            tx_id: None,
            error: None,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn tx_id(&self) -> Option<&TxId> {
        self.tx_id.as_ref()
    }

    pub fn error(&self) -> Option<&SwapError> {
        self.error.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the pair must stay frozen: the wallet or the chain still owns the outcome.
    pub fn is_in_flight(&self) -> bool {
        matches!(self.status, TransactionStatus::AwaitingSignature | TransactionStatus::Submitted)
    }

    /// The wallet accepted and broadcast the transaction.
    pub fn mark_submitted(&mut self, tx_id: TxId) -> bool {
        if self.status != TransactionStatus::AwaitingSignature {
            return false;
        }
        self.tx_id = Some(tx_id);
        self.status = TransactionStatus::Submitted;
        true
    }

    pub fn mark_confirmed(&mut self) -> bool {
        if self.status != TransactionStatus::Submitted {
            return false;
        }
        self.status = TransactionStatus::Confirmed;
        true
    }

    pub fn mark_failed(&mut self, error: SwapError) -> bool {
        if !self.is_in_flight() {
            return false;
        }
        self.status = TransactionStatus::Failed(error.kind());
        self.error = Some(error);
        true
    }

    /// User abort. After submission this only stops tracking; the chain outcome is ignored.
    pub fn cancel(&mut self) -> bool {
        if !self.is_in_flight() {
            return false;
        }
        self.status = TransactionStatus::Cancelled;
        true
    }

    /// Terminal outcome: the chain identifier on success, the failure kind otherwise.
    pub fn result(&self) -> Option<Result<&TxId, ErrorKind>> {
        match self.status {
            TransactionStatus::Confirmed => self.tx_id.as_ref().map(Ok),
            TransactionStatus::Failed(kind) => Some(Err(kind)),
            _ => None,
        }
    }
}
