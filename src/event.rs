//! Event data model (spec 3, "Event").

use crate::block::BlockId;
use crate::transaction::TxId;

/// Kind-specific payload. Timestamps live on `ScheduledEvent`, not here.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// `sender` is about to attempt creating a new transaction.
    TransactionGen { sender: usize },
    /// `receiver` heard about `txn` (created by `txn.sender`) from `from`.
    TransactionRec { receiver: usize, from: usize, txn: TxId },
    /// `generator` is about to attempt mining a new block.
    BlockGen { generator: usize },
    /// `receiver` heard about `block` from `from`.
    BlockRec { receiver: usize, from: usize, block: BlockId },
}

/// A timestamped event. Ordering is by `timestamp` only; the scheduler
/// breaks ties by insertion order (spec 5: "FIFO per timestamp is
/// acceptable").
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub timestamp: f64,
    pub kind: EventKind,
}
