//! The `Simulation` struct: owns every global counter and piece of shared
//! state the design notes call for instead of process-wide mutable
//! globals (spec 9) -- the seeded `RandomSource`, the event queue, the
//! block/transaction id allocators, and the content-addressed block and
//! transaction arenas peers reference by id.

use std::collections::HashMap;

use crate::block::{Block, BlockId, BlockIdAllocator, GENESIS_ID};
use crate::config::Config;
use crate::errors::SimError;
use crate::event::{EventKind, ScheduledEvent};
use crate::hashpower::HashPower;
use crate::ledger::BlockArena;
use crate::peer::{self, Peer};
use crate::rng::RandomSource;
use crate::scheduler::Scheduler;
use crate::selfish;
use crate::topology::Topology;
use crate::transaction::{Transaction, TxId, TxIdAllocator};

pub struct Simulation {
    pub config: Config,
    pub rng: RandomSource,
    pub scheduler: Scheduler,
    pub blocks: BlockArena,
    pub block_ids: BlockIdAllocator,
    pub tx_ids: TxIdAllocator,
    pub transactions: HashMap<TxId, Transaction>,
    pub peers: Vec<Peer>,
    pub topology: Topology,
    pub hashpower: HashPower,
    /// Set once the block-limit is reached and `-stop` keeps the scheduler
    /// draining in freeze mode (spec 4.1).
    pub freeze: bool,
    limit_reached: bool,
    /// Per-peer event log lines, populated only when `-s` is set (spec 6,
    /// `Events/*.txt`).
    pub event_log: HashMap<usize, Vec<String>>,
}

impl Simulation {
    pub fn new(config: Config) -> Result<Simulation, SimError> {
        let mut rng = RandomSource::new(config.seed);
        let topology = Topology::generate(&mut rng, config.n, config.max_topology_attempts)?;
        let hashpower = HashPower::new(config.n, config.h0, config.h1);

        let mut fast = vec![true; config.n];
        let mut shuffled: Vec<usize> = (0..config.n).collect();
        rng.shuffle(&mut shuffled);
        for &id in shuffled.iter().take(config.percent_slow_count()) {
            fast[id] = false;
        }

        let mut blocks = BlockArena::new();
        blocks.insert(GENESIS_ID, Block::genesis(config.n, config.initial_balance));

        let peers = (0..config.n).map(|id| Peer::new(id, fast[id], topology.neighbors[id].clone())).collect();

        let mut sim = Simulation {
            config,
            rng,
            scheduler: Scheduler::new(),
            blocks,
            block_ids: BlockIdAllocator::default(),
            tx_ids: TxIdAllocator::default(),
            transactions: HashMap::new(),
            peers,
            topology,
            hashpower,
            freeze: false,
            limit_reached: false,
            event_log: HashMap::new(),
        };

        for id in 0..sim.config.n {
            sim.scheduler.push(0.0, EventKind::TransactionGen { sender: id });
            sim.scheduler.push(0.0, EventKind::BlockGen { generator: id });
        }

        Ok(sim)
    }

    pub fn next_tx_id(&mut self) -> TxId {
        self.tx_ids.next()
    }

    pub fn next_block_id(&mut self) -> BlockId {
        self.block_ids.next()
    }

    /// Drains the scheduler's queue until it is empty (spec 4.1 `drain`),
    /// entering freeze mode once the block-limit termination condition is
    /// reached if `-stop` was requested, or stopping immediately otherwise.
    pub fn run(&mut self) {
        while let Some(ev) = self.scheduler.pop() {
            self.dispatch(ev);

            if !self.limit_reached && self.check_limit_reached() {
                self.limit_reached = true;
                if self.config.stop {
                    self.freeze = true;
                    log::info!("block limit {} reached; continuing in freeze mode", self.config.block_limit);
                } else {
                    log::info!("block limit {} reached; terminating", self.config.block_limit);
                    self.scheduler.mark_terminated();
                    break;
                }
            }
        }
    }

    /// Appends a line to the relevant peer's event log (spec 6 `-s` flag).
    /// Trivial by design -- per-event logging is an out-of-scope
    /// collaborator (spec 1); only its shape (one line per event, filed
    /// under the peer it happened to) is specified here.
    fn log_event(&mut self, ev: &ScheduledEvent) {
        let (peer_id, line) = match &ev.kind {
            EventKind::TransactionGen { sender } => (*sender, format!("t={:.3} TransactionGen", ev.timestamp)),
            EventKind::TransactionRec { receiver, from, txn } => {
                (*receiver, format!("t={:.3} TransactionRec txn={} from={}", ev.timestamp, txn, from))
            }
            EventKind::BlockGen { generator } => (*generator, format!("t={:.3} BlockGen", ev.timestamp)),
            EventKind::BlockRec { receiver, from, block } => {
                (*receiver, format!("t={:.3} BlockRec block={} from={}", ev.timestamp, block, from))
            }
        };
        self.event_log.entry(peer_id).or_default().push(line);
    }

    fn check_limit_reached(&self) -> bool {
        self.peers.iter().any(|p| p.ledger.accepted.len() as u64 >= self.config.block_limit)
    }

    fn dispatch(&mut self, ev: ScheduledEvent) {
        let t = ev.timestamp;
        if self.config.log_events {
            self.log_event(&ev);
        }
        match ev.kind {
            EventKind::TransactionGen { sender } => {
                if self.freeze {
                    return; // spec 4.1 freeze mode: transactions are dropped.
                }
                peer::handle_transaction_gen(self, sender, t);
            }
            EventKind::TransactionRec { receiver, from, txn } => {
                if self.freeze {
                    return;
                }
                peer::handle_transaction_rec(self, receiver, from, txn, t);
            }
            EventKind::BlockGen { generator } => {
                if self.freeze {
                    if self.peers[generator].is_selfish() {
                        selfish::freeze_flush_on_block_gen(self, generator, t);
                    }
                    // honest Block_Gen is ignored outright in freeze mode.
                    return;
                }
                if self.peers[generator].is_selfish() {
                    selfish::handle_block_gen(self, generator, t);
                } else {
                    peer::handle_block_gen_honest(self, generator, t);
                }
            }
            EventKind::BlockRec { receiver, from: _, block } => {
                if self.freeze {
                    if self.peers[receiver].is_selfish() {
                        selfish::freeze_flush_on_block_rec(self, receiver, block, t);
                    } else {
                        peer::handle_block_rec_honest(self, receiver, block, t);
                    }
                    return;
                }
                if self.peers[receiver].is_selfish() {
                    selfish::handle_block_rec(self, receiver, block, t);
                } else {
                    peer::handle_block_rec_honest(self, receiver, block, t);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_terminates_without_stop_flag() {
        let mut config = Config::default_for_tests();
        config.stop = false;
        let mut sim = Simulation::new(config).unwrap();
        sim.run();
        assert!(!sim.freeze);
        assert!(sim.peers.iter().any(|p| p.ledger.accepted.len() as u64 >= sim.config.block_limit));
    }

    #[test]
    fn freeze_mode_flushes_every_selfish_peer() {
        let mut config = Config::default_for_tests();
        config.stop = true;
        config.h0 = 0.4;
        let mut sim = Simulation::new(config).unwrap();
        sim.run();
        assert!(sim.freeze);
        for peer in &sim.peers {
            if let Some(state) = &peer.selfish {
                assert_eq!(state.reveal_blk_id, peer.ledger.long_block, "no hidden block should remain after freeze flush");
            }
        }
    }

    #[test]
    fn deterministic_given_same_seed() {
        let config_a = Config::default_for_tests();
        let config_b = config_a.clone();
        let mut sim_a = Simulation::new(config_a).unwrap();
        let mut sim_b = Simulation::new(config_b).unwrap();
        sim_a.run();
        sim_b.run();

        for (a, b) in sim_a.peers.iter().zip(sim_b.peers.iter()) {
            assert_eq!(a.ledger.longest_chain_ids(&sim_a.blocks), b.ledger.longest_chain_ids(&sim_b.blocks));
        }
    }
}
