//! Transaction data model (spec 3).

/// Unique, monotonically increasing transaction id. Id 0 is reserved for
/// the genesis block's synthetic coinbase transaction.
pub type TxId = u64;

/// An immutable transaction, once created.
///
/// `receiver` is `None` for a coinbase transaction (the creator of a block
/// minting its own reward has no counterparty).
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TxId,
    pub sender: usize,
    pub receiver: Option<usize>,
    pub amount: u64,
    pub timestamp: f64,
    pub is_coinbase: bool,
}

impl Transaction {
    pub fn coinbase(id: TxId, creator: usize, amount: u64, timestamp: f64) -> Self {
        Transaction {
            id,
            sender: creator,
            receiver: None,
            amount,
            timestamp,
            is_coinbase: true,
        }
    }

    pub fn transfer(id: TxId, sender: usize, receiver: usize, amount: u64, timestamp: f64) -> Self {
        Transaction {
            id,
            sender,
            receiver: Some(receiver),
            amount,
            timestamp,
            is_coinbase: false,
        }
    }
}

/// Monotonic transaction id allocator, owned by `Simulation` (spec 5:
/// "Global monotonic counters... implementations must ensure a single
/// owner of these counters").
#[derive(Debug, Default)]
pub struct TxIdAllocator {
    next: TxId,
}

impl TxIdAllocator {
    pub fn next(&mut self) -> TxId {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic() {
        let mut alloc = TxIdAllocator::default();
        let ids: Vec<TxId> = (0..5).map(|_| alloc.next()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn coinbase_has_no_receiver() {
        let tx = Transaction::coinbase(0, 2, 50, 100);
        assert!(tx.receiver.is_none());
        assert!(tx.is_coinbase);
    }
}
