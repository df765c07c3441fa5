//! Random network topology generation (spec 4.7).
//!
//! Out of scope per spec 1 ("only its output contract matters to the
//! core"), but implemented here for a runnable crate. Follows
//! `generate_network` in
//! `examples/original_source/.../utils.py` literally: repeatedly connect
//! an under-degree node to a random non-neighbor that's also under the
//! degree-6 cap, restarting from scratch whenever the candidate graph
//! turns out to be disconnected.

use crate::errors::SimError;
use crate::rng::RandomSource;

const MIN_DEGREE: usize = 3;
const MAX_DEGREE: usize = 6;

/// An undirected adjacency-list graph over peer ids `0..n`.
#[derive(Debug, Clone)]
pub struct Topology {
    pub neighbors: Vec<Vec<usize>>,
}

impl Topology {
    pub fn n(&self) -> usize {
        self.neighbors.len()
    }

    pub fn degree(&self, node: usize) -> usize {
        self.neighbors[node].len()
    }

    fn has_edge(&self, a: usize, b: usize) -> bool {
        self.neighbors[a].contains(&b)
    }

    fn add_edge(&mut self, a: usize, b: usize) {
        if !self.has_edge(a, b) {
            self.neighbors[a].push(b);
            self.neighbors[b].push(a);
        }
    }

    fn is_connected(&self) -> bool {
        let n = self.n();
        if n == 0 {
            return true;
        }
        let mut visited = vec![false; n];
        let mut stack = vec![0usize];
        visited[0] = true;
        let mut count = 1;
        while let Some(node) = stack.pop() {
            for &nbr in &self.neighbors[node] {
                if !visited[nbr] {
                    visited[nbr] = true;
                    count += 1;
                    stack.push(nbr);
                }
            }
        }
        count == n
    }

    /// Generate a connected graph on `n` nodes with every node's degree in
    /// `[3, 6]`, restarting whenever a candidate attempt is stuck (no
    /// eligible partner for some under-degree node) or ends up
    /// disconnected. Bounded by `max_attempts` -- the original Python
    /// script restarts forever, which is fine for a throwaway script but
    /// not for a library; we surface `SimError::TopologyFailure` instead
    /// of looping forever.
    pub fn generate(rng: &mut RandomSource, n: usize, max_attempts: u32) -> Result<Topology, SimError> {
        for _ in 0..max_attempts {
            if let Some(topology) = Self::try_once(rng, n) {
                return Ok(topology);
            }
        }
        Err(SimError::TopologyFailure { n, attempts: max_attempts })
    }

    fn try_once(rng: &mut RandomSource, n: usize) -> Option<Topology> {
        let mut topo = Topology { neighbors: vec![Vec::new(); n] };
        let mut targets: Vec<usize> = (0..n).map(|_| rng.integer_inclusive(MIN_DEGREE as i64, MAX_DEGREE as i64) as usize).collect();
        // Clamp: a node can never need more than MAX_DEGREE-1 partners
        // among n-1 others; with n <= MAX_DEGREE this loop would spin
        // forever, so cap against the achievable degree.
        for t in targets.iter_mut() {
            *t = (*t).min(n.saturating_sub(1));
        }

        let mut stalled_rounds = 0usize;
        loop {
            let under_degree: Vec<usize> = (0..n).filter(|&node| topo.degree(node) < targets[node]).collect();
            if under_degree.is_empty() {
                break;
            }
            let &node_x = rng.choose(&under_degree)?;

            let candidates: Vec<usize> = (0..n)
                .filter(|&y| y != node_x && !topo.has_edge(node_x, y) && topo.degree(y) < MAX_DEGREE)
                .collect();
            if candidates.is_empty() {
                stalled_rounds += 1;
                if stalled_rounds > n * n + 16 {
                    return None;
                }
                continue;
            }
            stalled_rounds = 0;
            let &node_y = rng.choose(&candidates)?;
            topo.add_edge(node_x, node_y);
        }

        if topo.is_connected() {
            Some(topo)
        } else {
            None
        }
    }
}
