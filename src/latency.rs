//! Per-link latency model (spec 4.6).
//!
//! `getLatency` in `examples/original_source/.../generators.py` draws a
//! fresh queuing delay and a fresh propagation delay on every call -- link
//! "constants" are not memoized per pair. We keep that: `LatencyModel` is
//! stateless except for the shared `RandomSource` it borrows per call.

use crate::rng::RandomSource;

/// Link capacity in Mbps for a fast<->fast link vs. any link touching a
/// slow peer.
const FAST_LINK_MBPS: f64 = 100.0;
const SLOW_LINK_MBPS: f64 = 5.0;

/// Computes message latency for a link between two peers of known speed.
pub struct LatencyModel;

impl LatencyModel {
    /// `message_size` is the transaction count carried (1 for a plain
    /// transaction message, `block.txns.len()` for a block).
    pub fn latency(rng: &mut RandomSource, a_fast: bool, b_fast: bool, message_size: usize) -> f64 {
        let capacity = if a_fast && b_fast {
            FAST_LINK_MBPS
        } else {
            SLOW_LINK_MBPS
        };
        let queuing_delay = rng.exponential(96.0 / capacity);
        let propagation_delay = rng.uniform(10.0, 500.0);
        propagation_delay + (message_size as f64 * 8.0) / capacity + queuing_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_link_uses_higher_capacity_and_is_usually_lower_latency() {
        let mut rng = RandomSource::new(42);
        let fast_total: f64 = (0..200).map(|_| LatencyModel::latency(&mut rng, true, true, 1)).sum();
        let slow_total: f64 = (0..200).map(|_| LatencyModel::latency(&mut rng, false, false, 1)).sum();
        assert!(fast_total < slow_total);
    }

    #[test]
    fn latency_is_always_positive() {
        let mut rng = RandomSource::new(1);
        for _ in 0..100 {
            assert!(LatencyModel::latency(&mut rng, true, false, 50) > 0.0);
        }
    }
}
