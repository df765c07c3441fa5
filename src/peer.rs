//! Peer data model and honest-peer event handlers (spec 3 "Peer", spec 4.2-4.4).
//!
//! Selfish-peer handlers live in `selfish.rs` and call back into the
//! `mine_block`/`broadcast_block`/`schedule_next_block_gen` building blocks
//! defined here rather than duplicating them -- a selfish `Block_Gen` mines
//! exactly the way an honest one does, it just doesn't always broadcast.

use std::collections::{BTreeSet, HashSet};

use crate::block::{Block, BlockId, COINBASE_REWARD, MAX_TRANSACTIONS_PER_BLOCK};
use crate::event::EventKind;
use crate::latency::LatencyModel;
use crate::ledger::{Integration, Ledger};
use crate::selfish::SelfishState;
use crate::simulation::Simulation;
use crate::transaction::{Transaction, TxId};

/// Tags which of the two selfish identities a peer plays, purely for
/// reporting (spec 4.7: "peers with ids 0 and 1 are `selfish1` and
/// `selfish2` respectively").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerLabel {
    Selfish1,
    Selfish2,
    Honest,
}

impl PeerLabel {
    pub fn for_id(id: usize) -> PeerLabel {
        match id {
            0 => PeerLabel::Selfish1,
            1 => PeerLabel::Selfish2,
            _ => PeerLabel::Honest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeerLabel::Selfish1 => "selfish1",
            PeerLabel::Selfish2 => "selfish2",
            PeerLabel::Honest => "honest",
        }
    }
}

pub struct Peer {
    pub id: usize,
    pub label: PeerLabel,
    pub fast: bool,
    pub neighbors: Vec<usize>,
    pub ledger: Ledger,
    /// Known-but-not-yet-mined transactions, by id. A `BTreeSet` gives the
    /// "stable order" mining iteration spec 4.3 step 3 requires for free,
    /// since transaction ids are allocated monotonically.
    pub pending: BTreeSet<TxId>,
    /// Transactions already committed on this peer's longest chain.
    pub pushed: HashSet<TxId>,
    pub blocks_created: HashSet<BlockId>,
    /// `Some` only for peers 0 and 1 (spec 4.7).
    pub selfish: Option<SelfishState>,
}

impl Peer {
    pub fn new(id: usize, fast: bool, neighbors: Vec<usize>) -> Peer {
        let label = PeerLabel::for_id(id);
        let selfish = match label {
            PeerLabel::Honest => None,
            PeerLabel::Selfish1 | PeerLabel::Selfish2 => Some(SelfishState::new(crate::block::GENESIS_ID)),
        };
        Peer {
            id,
            label,
            fast,
            neighbors,
            ledger: Ledger::new(),
            pending: BTreeSet::new(),
            pushed: HashSet::new(),
            blocks_created: HashSet::new(),
            selfish,
        }
    }

    pub fn is_selfish(&self) -> bool {
        self.selfish.is_some()
    }

    pub fn balance(&self, blocks: &crate::ledger::BlockArena) -> i64 {
        blocks[&self.ledger.long_block].balances[self.id]
    }
}

/// Spec 4.2 `Transaction_Gen`. Balance-gated self-throttling: once a peer's
/// spendable balance drops to 1 or below it stops generating transactions
/// for the rest of the run (no reschedule), per spec step 1.
pub fn handle_transaction_gen(sim: &mut Simulation, peer_id: usize, t: f64) {
    let balance = sim.peers[peer_id].balance(&sim.blocks);
    if balance <= 1 {
        return;
    }

    let neighbors = sim.peers[peer_id].neighbors.clone();
    let &receiver = sim.rng.choose(&neighbors).expect("every peer has at least MIN_DEGREE neighbors");

    let amount = sim.rng.integer(1, balance) / 10;
    if amount < balance {
        let txn_id = sim.next_tx_id();
        let txn = Transaction::transfer(txn_id, peer_id, receiver, amount as u64, t);
        sim.peers[peer_id].pending.insert(txn_id);
        sim.transactions.insert(txn_id, txn);

        for r in neighbors {
            let latency = LatencyModel::latency(&mut sim.rng, sim.peers[peer_id].fast, sim.peers[r].fast, 1);
            sim.scheduler.push(t + latency, EventKind::TransactionRec { receiver: r, from: peer_id, txn: txn_id });
        }
    }

    let next = t + sim.rng.exponential(sim.config.mean_txn_interval);
    sim.scheduler.push(next, EventKind::TransactionGen { sender: peer_id });
}

/// Spec 4.2 `Transaction_Rec`.
///
/// One literal-preservation note from spec 9 (do not silently fix):
/// forwarding skips the neighbor matching the transaction's original
/// sender, not the peer that just relayed it to us, so the immediate
/// forwarder gets sent its own relay back (over-forwarding).
///
/// The add/relay condition mirrors the original's `if txn not in
/// self.pending_txns or txn in self.pushed_txns` -- act (add to pending,
/// relay) whenever the txn is new, or when it's already been mined into a
/// block; skip only the one case where it's sitting in `pending`
/// unmined.
pub fn handle_transaction_rec(sim: &mut Simulation, peer_id: usize, from: usize, txn_id: TxId, t: f64) {
    let _ = from;
    let pending_unmined = sim.peers[peer_id].pending.contains(&txn_id) && !sim.peers[peer_id].pushed.contains(&txn_id);
    if pending_unmined {
        return;
    }
    sim.peers[peer_id].pending.insert(txn_id);

    let sender = sim.transactions[&txn_id].sender;
    let neighbors = sim.peers[peer_id].neighbors.clone();
    for r in neighbors {
        if r != sender {
            let latency = LatencyModel::latency(&mut sim.rng, sim.peers[peer_id].fast, sim.peers[r].fast, 1);
            sim.scheduler.push(t + latency, EventKind::TransactionRec { receiver: r, from: peer_id, txn: txn_id });
        }
    }
}

/// Builds and inserts a block mined by `peer_id` at time `t` (spec 4.3
/// steps 1-4): coinbase first, then `pending` walked in stable order,
/// skipping (without removing) any transaction that would overflow
/// `MAX_TRANSACTIONS_PER_BLOCK` or that the running balance can't cover.
/// Shared by the honest and selfish `Block_Gen` handlers -- a selfish
/// miner mines exactly this way, it just may not broadcast afterward.
pub fn mine_block(sim: &mut Simulation, peer_id: usize, t: f64) -> BlockId {
    let parent_id = sim.peers[peer_id].ledger.long_block;
    let mut balances = sim.blocks[&parent_id].balances.clone();

    let coinbase_id = sim.next_tx_id();
    let coinbase = Transaction::coinbase(coinbase_id, peer_id, COINBASE_REWARD, t);
    balances[peer_id] += COINBASE_REWARD as i64;
    let mut txns = vec![coinbase.clone()];
    sim.transactions.insert(coinbase_id, coinbase);

    let candidates: Vec<TxId> = sim.peers[peer_id].pending.iter().copied().collect();
    let mut included = Vec::new();
    for txn_id in candidates {
        if txns.len() >= MAX_TRANSACTIONS_PER_BLOCK {
            break;
        }
        let txn = sim.transactions[&txn_id].clone();
        if balances[txn.sender] >= txn.amount as i64 {
            balances[txn.sender] -= txn.amount as i64;
            if let Some(receiver) = txn.receiver {
                balances[receiver] += txn.amount as i64;
            }
            txns.push(txn);
            included.push(txn_id);
        }
        // else: insufficient balance, skip without removing from pending.
    }
    for txn_id in &included {
        sim.peers[peer_id].pending.remove(txn_id);
        sim.peers[peer_id].pushed.insert(*txn_id);
    }

    let block_id = sim.next_block_id();
    let block = Block {
        id: block_id,
        parent_id,
        length: sim.blocks[&parent_id].length + 1,
        timestamp: t,
        creator: peer_id,
        txns,
        balances,
    };
    sim.peers[peer_id].ledger.accept_own_block(&block, t);
    sim.peers[peer_id].blocks_created.insert(block_id);
    sim.blocks.insert(block_id, block);
    block_id
}

/// Broadcasts an already-accepted block to every neighbor of `peer_id`
/// (spec 4.3 step 5 / spec 4.5 releases).
pub fn broadcast_block(sim: &mut Simulation, peer_id: usize, block_id: BlockId, t: f64) {
    let neighbors = sim.peers[peer_id].neighbors.clone();
    let txn_count = sim.blocks[&block_id].txns.len();
    for r in neighbors {
        let latency = LatencyModel::latency(&mut sim.rng, sim.peers[peer_id].fast, sim.peers[r].fast, txn_count);
        sim.scheduler.push(t + latency, EventKind::BlockRec { receiver: r, from: peer_id, block: block_id });
    }
}

/// Schedules `peer_id`'s next mining attempt (spec 4.3 step 6 / spec 4.5
/// step 4): inter-arrival drawn from `Exp(I / hp_peer)`.
pub fn schedule_next_block_gen(sim: &mut Simulation, peer_id: usize, t: f64) {
    let mean = sim.hashpower.mean_inter_arrival(peer_id, sim.config.mean_block_interval);
    let next = t + sim.rng.exponential(mean);
    sim.scheduler.push(next, EventKind::BlockGen { generator: peer_id });
}

/// Honest `Block_Gen` (spec 4.3).
pub fn handle_block_gen_honest(sim: &mut Simulation, peer_id: usize, t: f64) {
    let block_id = mine_block(sim, peer_id, t);
    broadcast_block(sim, peer_id, block_id, t);
    schedule_next_block_gen(sim, peer_id, t);
}

/// Honest `Block_Rec` (spec 4.4): integrate, relay every newly accepted
/// block to all neighbors except its creator, then update `long_block`
/// only on strict length improvement.
pub fn handle_block_rec_honest(sim: &mut Simulation, peer_id: usize, block_id: BlockId, t: f64) {
    let outcome = sim.peers[peer_id].ledger.integrate_received(&sim.blocks, block_id, t);
    if let Integration::Integrated { newly_accepted, prev_block } = outcome {
        for id in newly_accepted {
            relay_to_neighbors_except_creator(sim, peer_id, id, t);
        }
        sim.peers[peer_id].ledger.apply_honest_tip_update(&sim.blocks, prev_block);
    }
}

fn relay_to_neighbors_except_creator(sim: &mut Simulation, peer_id: usize, block_id: BlockId, t: f64) {
    let creator = sim.blocks[&block_id].creator;
    let txn_count = sim.blocks[&block_id].txns.len();
    let neighbors = sim.peers[peer_id].neighbors.clone();
    for r in neighbors {
        if r != creator {
            let latency = LatencyModel::latency(&mut sim.rng, sim.peers[peer_id].fast, sim.peers[r].fast, txn_count);
            sim.scheduler.push(t + latency, EventKind::BlockRec { receiver: r, from: peer_id, block: block_id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn selfish_ids_are_labeled_correctly() {
        assert_eq!(PeerLabel::for_id(0), PeerLabel::Selfish1);
        assert_eq!(PeerLabel::for_id(1), PeerLabel::Selfish2);
        assert_eq!(PeerLabel::for_id(2), PeerLabel::Honest);
    }

    #[test]
    fn mining_skips_overdrawn_transactions_without_dropping_them() {
        let mut config = Config::default_for_tests();
        config.n = 3;
        config.initial_balance = 10;
        let mut sim = Simulation::new(config).expect("sim should build");

        // peer 2 tries to send more than it has.
        let txn_id = sim.next_tx_id();
        let txn = Transaction::transfer(txn_id, 2, 0, 9999, 0.0);
        sim.transactions.insert(txn_id, txn);
        sim.peers[2].pending.insert(txn_id);

        mine_block(&mut sim, 2, 1.0);
        assert!(sim.peers[2].pending.contains(&txn_id), "overdrawn txn must stay pending, not be dropped");
        assert!(!sim.peers[2].pushed.contains(&txn_id));
    }
}
