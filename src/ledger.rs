//! Per-peer block-tree ledger (spec 3 "Ledger (per peer)", spec 4.4).
//!
//! Blocks live once in a shared, content-addressed arena
//! (`Simulation::blocks`); a `Ledger` never owns a `Block` value, only the
//! ids of the blocks it has accepted or orphaned and the parent->children
//! tree edges among its accepted set. This is the "arena keyed by id,
//! peers reference by id" ownership model from the design notes --
//! it also means two peers that both accept the same block share the one
//! `Block` allocation instead of cloning it per-ledger.

use std::collections::{HashMap, HashSet};

use crate::block::{Block, BlockId, GENESIS_ID};

pub type BlockArena = HashMap<BlockId, Block>;

/// Outcome of attempting to integrate a received block into a ledger.
/// Step 7 of spec 4.4 (updating `long_Block`) is deliberately left to the
/// caller: honest and selfish peers apply different update rules to the
/// same integration result (spec 4.4 step 7 vs. spec 4.5's four-row
/// table).
pub enum Integration {
    /// Already accepted or already parked as an orphan -- spec 4.4 step 1.
    Duplicate,
    /// Parent not yet accepted -- parked in the orphan pool, spec 4.4 step 3.
    Orphaned,
    /// Balance replay didn't match the block's declared balances -- spec
    /// 4.4 step 4, dropped silently.
    Invalid,
    /// `block_id` and (transitively) any orphan subtree rooted at it were
    /// accepted, in BFS order. `prev_block` is the deepest block reached
    /// (ties go to whichever was discovered first, spec 4.4 step 6).
    Integrated {
        newly_accepted: Vec<BlockId>,
        prev_block: BlockId,
    },
}

pub struct Ledger {
    pub accepted: HashSet<BlockId>,
    pub orphans: HashSet<BlockId>,
    /// parent id -> children ids, accepted blocks only.
    pub children: HashMap<BlockId, Vec<BlockId>>,
    pub arrival_time: HashMap<BlockId, f64>,
    pub long_block: BlockId,
}

impl Ledger {
    pub fn new() -> Self {
        let mut accepted = HashSet::new();
        accepted.insert(GENESIS_ID);
        let mut arrival_time = HashMap::new();
        arrival_time.insert(GENESIS_ID, 0.0);
        Ledger {
            accepted,
            orphans: HashSet::new(),
            children: HashMap::new(),
            arrival_time,
            long_block: GENESIS_ID,
        }
    }

    pub fn long_block_length(&self, arena: &BlockArena) -> u64 {
        arena[&self.long_block].length
    }

    /// Insert a block this peer itself just mined (spec 4.3 step 4). A
    /// freshly mined block always extends the peer's own prior tip, so it
    /// unconditionally becomes the new `long_block` -- no length
    /// comparison needed.
    pub fn accept_own_block(&mut self, block: &Block, arrival_time: f64) {
        self.accepted.insert(block.id);
        self.children.entry(block.parent_id).or_default().push(block.id);
        self.arrival_time.insert(block.id, arrival_time);
        self.long_block = block.id;
    }

    /// Attempt to integrate a received block (spec 4.4 steps 1-6). Does
    /// not mutate `long_block`.
    pub fn integrate_received(&mut self, arena: &BlockArena, block_id: BlockId, arrival_time: f64) -> Integration {
        if self.accepted.contains(&block_id) || self.orphans.contains(&block_id) {
            return Integration::Duplicate;
        }
        self.arrival_time.insert(block_id, arrival_time);

        let block = &arena[&block_id];
        if !self.accepted.contains(&block.parent_id) {
            self.orphans.insert(block_id);
            return Integration::Orphaned;
        }

        let parent_balances = &arena[&block.parent_id].balances;
        let replayed = crate::block::replay_balances(parent_balances, block.creator, &block.txns);
        if replayed != block.balances {
            return Integration::Invalid;
        }

        // BFS over `block` and any orphan subtree rooted at it.
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(block_id);
        let mut newly_accepted = Vec::new();
        let mut prev_block = block_id;
        let mut prev_len = block.length;

        while let Some(id) = queue.pop_front() {
            let blk = &arena[&id];
            self.accepted.insert(id);
            self.children.entry(blk.parent_id).or_default().push(id);
            self.arrival_time.insert(id, arrival_time);
            newly_accepted.push(id);

            if blk.length > prev_len {
                prev_block = id;
                prev_len = blk.length;
            }

            let children_in_orphan: Vec<BlockId> = self
                .orphans
                .iter()
                .copied()
                .filter(|oid| arena[oid].parent_id == id)
                .collect();
            for child_id in children_in_orphan {
                self.orphans.remove(&child_id);
                queue.push_back(child_id);
            }
        }

        Integration::Integrated { newly_accepted, prev_block }
    }

    /// Honest update rule (spec 4.4 step 7): strict improvement only,
    /// ties broken by first-seen (never overwritten).
    pub fn apply_honest_tip_update(&mut self, arena: &BlockArena, candidate: BlockId) {
        if arena[&candidate].length > self.long_block_length(arena) {
            self.long_block = candidate;
        }
    }

    /// Reconstructs the longest-chain block-id ordering from tip to
    /// genesis (inclusive), used for reporting (spec 6).
    pub fn longest_chain_ids(&self, arena: &BlockArena) -> Vec<BlockId> {
        let mut ids = Vec::new();
        let mut cur = self.long_block;
        loop {
            ids.push(cur);
            if cur == GENESIS_ID {
                break;
            }
            cur = arena[&cur].parent_id;
        }
        ids
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    fn arena_with_chain(n: usize) -> (BlockArena, Vec<BlockId>) {
        let mut arena = BlockArena::new();
        arena.insert(GENESIS_ID, Block::genesis(4, 114));
        let mut ids = vec![GENESIS_ID];
        for i in 1..n {
            let parent = ids[i - 1];
            let parent_balances = arena[&parent].balances.clone();
            let blk = Block {
                id: i as BlockId,
                parent_id: parent,
                length: i as u64 + 1,
                timestamp: i as f64,
                creator: 0,
                txns: vec![],
                balances: parent_balances,
            };
            arena.insert(blk.id, blk);
            ids.push(i as BlockId);
        }
        (arena, ids)
    }

    #[test]
    fn orphan_promotes_once_parent_arrives() {
        let (arena, ids) = arena_with_chain(3);
        let mut ledger = Ledger::new();
        // receive child (id 2) before parent (id 1): it parks as an orphan.
        match ledger.integrate_received(&arena, ids[2], 50) {
            Integration::Orphaned => {}
            _ => panic!("expected orphan"),
        }
        assert!(ledger.orphans.contains(&ids[2]));
        assert!(!ledger.accepted.contains(&ids[2]));

        // now the parent arrives: both 1 and 2 should integrate in BFS order.
        match ledger.integrate_received(&arena, ids[1], 100) {
            Integration::Integrated { newly_accepted, prev_block } => {
                assert_eq!(newly_accepted, vec![ids[1], ids[2]]);
                assert_eq!(prev_block, ids[2]);
            }
            _ => panic!("expected integration"),
        }
        assert!(ledger.accepted.contains(&ids[1]));
        assert!(ledger.accepted.contains(&ids[2]));
        assert!(ledger.orphans.is_empty());
        assert_eq!(ledger.children[&ids[1]], vec![ids[2]]);
    }

    #[test]
    fn honest_tip_update_is_strict_and_first_seen_wins_ties() {
        let (arena, ids) = arena_with_chain(2);
        let mut ledger = Ledger::new();
        ledger.integrate_received(&arena, ids[1], 10);
        ledger.apply_honest_tip_update(&arena, ids[1]);
        assert_eq!(ledger.long_block, ids[1]);

        // a same-length competing block must not overwrite the existing tip.
        let mut arena2 = arena.clone();
        let competing = Block {
            id: 99,
            parent_id: GENESIS_ID,
            length: 2,
            timestamp: 20.0,
            creator: 1,
            txns: vec![],
            balances: arena2[&GENESIS_ID].balances.clone(),
        };
        arena2.insert(99, competing);
        ledger.integrate_received(&arena2, 99, 30);
        ledger.apply_honest_tip_update(&arena2, 99);
        assert_eq!(ledger.long_block, ids[1], "tie must not overwrite first-seen tip");
    }

    #[test]
    fn duplicate_block_is_dropped() {
        let (arena, ids) = arena_with_chain(2);
        let mut ledger = Ledger::new();
        ledger.integrate_received(&arena, ids[1], 10);
        match ledger.integrate_received(&arena, ids[1], 20) {
            Integration::Duplicate => {}
            _ => panic!("expected duplicate"),
        }
    }

    #[test]
    fn invalid_balances_are_rejected() {
        let mut arena = BlockArena::new();
        arena.insert(GENESIS_ID, Block::genesis(2, 114));
        let bogus = Block {
            id: 1,
            parent_id: GENESIS_ID,
            length: 2,
            timestamp: 5.0,
            creator: 0,
            txns: vec![],
            balances: vec![9999, 114], // doesn't match replay of zero txns
        };
        arena.insert(1, bogus);
        let mut ledger = Ledger::new();
        match ledger.integrate_received(&arena, 1, 5) {
            Integration::Invalid => {}
            _ => panic!("expected invalid"),
        }
    }
}
