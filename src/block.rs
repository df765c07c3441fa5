//! Block data model (spec 3).
//!
//! A block is immutable once created: its `balances` vector is the
//! snapshot of every peer's account balance *after* applying the block's
//! own transactions on top of its parent. Blocks are stored by id in a
//! content-addressed arena (`Simulation::blocks`) and referenced by id
//! from every peer's `Ledger`, per the "ownership by id, not by pointer
//! cycle" design note.

use crate::transaction::Transaction;

pub type BlockId = u64;

pub const GENESIS_ID: BlockId = 0;

/// Coinbase reward minted by every block.
pub const COINBASE_REWARD: u64 = 50;

/// Max number of transactions (including the coinbase) a block may carry.
pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub parent_id: BlockId,
    pub length: u64,
    pub timestamp: f64,
    pub creator: usize,
    pub txns: Vec<Transaction>,
    pub balances: Vec<i64>,
}

impl Block {
    /// The single genesis block, identical across every peer.
    pub fn genesis(num_peers: usize, initial_balance: i64) -> Block {
        Block {
            id: GENESIS_ID,
            parent_id: GENESIS_ID,
            length: 1,
            timestamp: 0.0,
            creator: usize::MAX, // no creator; never read for the genesis block
            txns: Vec::new(),
            balances: vec![initial_balance; num_peers],
        }
    }

    pub fn total_balance(&self) -> i64 {
        self.balances.iter().sum()
    }
}

/// Monotonic block id allocator. Genesis is id 0 and is never produced by
/// this allocator; the first call returns 1.
#[derive(Debug)]
pub struct BlockIdAllocator {
    next: BlockId,
}

impl Default for BlockIdAllocator {
    fn default() -> Self {
        BlockIdAllocator { next: 1 }
    }
}

impl BlockIdAllocator {
    pub fn next(&mut self) -> BlockId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Total number of blocks ever allocated, including genesis.
    pub fn total_blocks(&self) -> u64 {
        self.next
    }
}

/// Replay `txns` on top of `parent_balances`, crediting the coinbase to
/// `creator`. Used both when constructing a new block (spec 4.3) and when
/// validating a received one (spec 4.4 step 4).
///
/// Returns the resulting balance vector. Does not enforce
/// `maxTransactions` or insufficient-balance skipping -- that is the
/// caller's job when *constructing* a block (spec 4.3 step 3); this
/// function is a straight-line replay used for validation, where a block
/// that reached an impossible state is simply rejected by the caller
/// comparing the result to `block.balances`.
pub fn replay_balances(parent_balances: &[i64], creator: usize, txns: &[Transaction]) -> Vec<i64> {
    let mut balances = parent_balances.to_vec();
    for txn in txns {
        match txn.receiver {
            None => balances[txn.sender] += txn.amount as i64,
            Some(receiver) => {
                balances[txn.sender] -= txn.amount as i64;
                balances[receiver] += txn.amount as i64;
            }
        }
    }
    let _ = creator; // coinbase credit already folded into the coinbase txn above
    balances
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_length_one_and_uniform_balances() {
        let g = Block::genesis(4, 114);
        assert_eq!(g.length, 1);
        assert_eq!(g.balances, vec![114, 114, 114, 114]);
    }

    #[test]
    fn block_ids_start_at_one() {
        let mut alloc = BlockIdAllocator::default();
        assert_eq!(alloc.next(), 1);
        assert_eq!(alloc.next(), 2);
        assert_eq!(alloc.total_blocks(), 3);
    }

    #[test]
    fn replay_applies_coinbase_and_transfers_in_order() {
        let parent = vec![100, 100, 100];
        let coinbase = Transaction::coinbase(0, 0, 50, 0);
        let transfer = Transaction::transfer(1, 1, 2, 30, 0);
        let result = replay_balances(&parent, 0, &[coinbase, transfer]);
        assert_eq!(result, vec![150, 70, 130]);
    }

    /// Testable property 1 (spec 8): `sum(balances) == n*initial_balance +
    /// COINBASE_REWARD*(length-1)` at every point along a chain, since
    /// transfers only move value between peers while each block's coinbase
    /// mints exactly one reward. Plain transfers must not perturb the
    /// total, only the mint does.
    #[test]
    fn total_balance_grows_by_one_coinbase_reward_per_block() {
        const N: usize = 3;
        let genesis = Block::genesis(N, 114);
        assert_eq!(genesis.total_balance(), (N as i64) * 114);

        let mut balances = genesis.balances.clone();
        let mut parent_id = genesis.id;
        for i in 1..=4u64 {
            let coinbase = Transaction::coinbase(i, 0, COINBASE_REWARD, i as f64);
            let transfer = Transaction::transfer(100 + i, 1, 2, 7, i as f64);
            balances = replay_balances(&balances, 0, &[coinbase.clone(), transfer.clone()]);
            let block = Block {
                id: i,
                parent_id,
                length: i + 1,
                timestamp: i as f64,
                creator: 0,
                txns: vec![coinbase, transfer],
                balances: balances.clone(),
            };
            assert_eq!(
                block.total_balance(),
                (N as i64) * 114 + COINBASE_REWARD as i64 * i as i64,
                "total balance must only grow by the coinbase reward, transfers are zero-sum"
            );
            parent_id = block.id;
        }
    }
}
