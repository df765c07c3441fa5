//! Selfish-miner state machine (spec 3 "Selfish extension", spec 4.5).
//!
//! Layered on top of a selfish `Peer`: a hidden-block pool keyed by
//! parent id, a `reveal_blk_id` pointer to the latest publicly-announced
//! ancestor, and the `zero_state` flag for the post-race stance where the
//! attacker must reveal its very next block immediately. This is the
//! canonical Eyal-Sirer strategy reduced to four triggers (design note,
//! spec 9).

use std::collections::HashMap;

use crate::block::BlockId;
use crate::ledger::Integration;
use crate::simulation::Simulation;

/// Per-selfish-peer hidden state.
pub struct SelfishState {
    pub reveal_blk_id: BlockId,
    /// parent id -> child id, the private chain above `reveal_blk_id`.
    pub hidden_blks: HashMap<BlockId, BlockId>,
    pub zero_state: bool,
}

impl SelfishState {
    pub fn new(genesis: BlockId) -> Self {
        SelfishState {
            reveal_blk_id: genesis,
            hidden_blks: HashMap::new(),
            zero_state: false,
        }
    }
}

/// Release every hidden block between `reveal_blk_id` and the current
/// private tip (`long_block`), broadcasting each one as it's revealed.
/// Used by selfish-miner rows 1 and 3 of the trigger table, and by the
/// freeze-mode flush.
pub fn release_all_hidden(sim: &mut Simulation, peer: usize, t: f64) {
    loop {
        let long_block = sim.peers[peer].ledger.long_block;
        let reveal = sim.peers[peer].selfish.as_ref().unwrap().reveal_blk_id;
        if reveal == long_block {
            break;
        }
        let next = *sim.peers[peer].selfish.as_ref().unwrap().hidden_blks.get(&reveal).expect(
            "hidden_blks must chain from reveal_blk_id to long_block without gaps (selfish invariant, spec 8 property 7)",
        );
        sim.peers[peer].selfish.as_mut().unwrap().reveal_blk_id = next;
        crate::peer::broadcast_block(sim, peer, next, t);
    }
}

/// Release hidden blocks one step at a time until the chain from
/// `reveal_blk_id` reaches `target_len`. Selfish-miner row 4: the honest
/// chain is still behind but narrowed the lead, so only as many blocks as
/// needed to match the new honest tip length are revealed -- preserved
/// literally per spec 9's open question (a lead narrowed by more than one
/// block in a single event still releases more than one block here,
/// matching the original `while` loop rather than a hardcoded single
/// release).
pub fn release_until_length(sim: &mut Simulation, peer: usize, t: f64, target_len: u64) {
    loop {
        let reveal = sim.peers[peer].selfish.as_ref().unwrap().reveal_blk_id;
        if sim.blocks[&reveal].length >= target_len {
            break;
        }
        let next = *sim.peers[peer].selfish.as_ref().unwrap().hidden_blks.get(&reveal).expect(
            "hidden_blks must chain past reveal_blk_id while its length is still behind target_len",
        );
        sim.peers[peer].selfish.as_mut().unwrap().reveal_blk_id = next;
        crate::peer::broadcast_block(sim, peer, next, t);
    }
}

/// Selfish miner's `Block_Gen` handler (spec 4.5).
pub fn handle_block_gen(sim: &mut Simulation, peer: usize, t: f64) {
    let block_id = crate::peer::mine_block(sim, peer, t);
    let parent_id = sim.blocks[&block_id].parent_id;
    sim.peers[peer].selfish.as_mut().unwrap().hidden_blks.insert(parent_id, block_id);

    if sim.peers[peer].selfish.as_ref().unwrap().zero_state {
        crate::peer::broadcast_block(sim, peer, block_id, t);
        sim.peers[peer].selfish.as_mut().unwrap().zero_state = false;
    }
    // otherwise withhold: nothing further to do, the block is already the
    // peer's long_block and stays unannounced.

    crate::peer::schedule_next_block_gen(sim, peer, t);
}

/// Selfish miner's `Block_Rec` handler (spec 4.5's four-row trigger table).
pub fn handle_block_rec(sim: &mut Simulation, peer: usize, block_id: BlockId, t: f64) {
    let l_priv = sim.peers[peer].ledger.long_block_length(&sim.blocks);

    // Selfish peers never relay during BFS integration -- this is what
    // keeps the private chain hidden during bulk orphan catch-up (spec 9
    // design note, preserved literally).
    let outcome = sim.peers[peer].ledger.integrate_received(&sim.blocks, block_id, t);

    let prev_block = match outcome {
        Integration::Integrated { prev_block, .. } => prev_block,
        _ => return,
    };
    let prev_len = sim.blocks[&prev_block].length;
    let own_tip_creator = sim.blocks[&sim.peers[peer].ledger.long_block].creator;

    if prev_len == l_priv.saturating_sub(1) {
        // Row 1: honest chain just caught to one behind the private tip.
        // Release everything. Preserved literally even though this is the
        // Eyal-Sirer "lead of 2 narrowed to 1" trigger (spec 9).
        release_all_hidden(sim, peer, t);
    } else if prev_len > l_priv {
        // Row 2: honest overtook: the private fork is dead.
        let state = sim.peers[peer].selfish.as_mut().unwrap();
        state.zero_state = false;
        state.reveal_blk_id = prev_block;
        sim.peers[peer].ledger.long_block = prev_block;
    } else if prev_len == l_priv && own_tip_creator == peer {
        // Row 3: 1 -> 0' race -- the public just matched our private tip,
        // which we mined. Bias toward releasing the next private block
        // immediately, and release what we're holding now.
        sim.peers[peer].selfish.as_mut().unwrap().zero_state = true;
        release_all_hidden(sim, peer, t);
    } else {
        // Row 4: honest chain still behind; release one step of lead.
        release_until_length(sim, peer, t, prev_len);
    }
}

/// Freeze-mode flush (spec 4.1, 4.5): any selfish `Block_Gen` or
/// `Block_Rec` after termination releases all remaining hidden blocks and
/// does nothing further.
pub fn freeze_flush_on_block_gen(sim: &mut Simulation, peer: usize, t: f64) {
    release_all_hidden(sim, peer, t);
}

pub fn freeze_flush_on_block_rec(sim: &mut Simulation, peer: usize, block_id: BlockId, t: f64) {
    let _ = sim.peers[peer].ledger.integrate_received(&sim.blocks, block_id, t);
    release_all_hidden(sim, peer, t);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn selfish_invariant_hidden_chain_reaches_long_block() {
        let mut config = Config::default_for_tests();
        config.n = 10;
        config.h0 = 0.45;
        config.h1 = 1e-4;
        let mut sim = Simulation::new(config).expect("sim should build");
        sim.run();

        for (id, peer) in sim.peers.iter().enumerate() {
            if let Some(state) = &peer.selfish {
                let mut cur = state.reveal_blk_id;
                let mut last_len = sim.blocks[&cur].length;
                while cur != peer.ledger.long_block {
                    let next = state.hidden_blks[&cur];
                    let next_len = sim.blocks[&next].length;
                    assert_eq!(next_len, last_len + 1, "peer {id} hidden chain must increase length by 1 per step");
                    cur = next;
                    last_len = next_len;
                }
            }
        }
    }
}
