//! Hash-power distribution (spec 4.8).

/// Selfish fractions are clamped to a floor so a "disabled" selfish miner
/// (fraction 0) still draws from a well-defined (if glacially slow)
/// exponential distribution rather than dividing by zero.
const MIN_SELFISH_FRACTION: f64 = 1e-4;

pub struct HashPower {
    /// Fractional hash power per peer id, selfish miners included.
    pub fraction: Vec<f64>,
}

impl HashPower {
    /// `h0`/`h1` are the requested fractions for peers 0 and 1 (selfish1,
    /// selfish2); every other peer splits the remainder evenly, per spec
    /// 4.8 and `getHashDist` in
    /// `examples/original_source/.../generators.py`.
    pub fn new(n: usize, h0: f64, h1: f64) -> HashPower {
        let h0 = h0.max(MIN_SELFISH_FRACTION);
        let h1 = h1.max(MIN_SELFISH_FRACTION);
        let honest_count = n.saturating_sub(2);
        let honest_fraction = if honest_count == 0 {
            0.0
        } else {
            (1.0 - h0 - h1) / honest_count as f64
        };

        let mut fraction = vec![honest_fraction; n];
        if n > 0 {
            fraction[0] = h0;
        }
        if n > 1 {
            fraction[1] = h1;
        }
        HashPower { fraction }
    }

    /// Mean inter-arrival time for peer `id`'s block mining, given the
    /// global mean mining time `mean_block_time` (the `-I` flag).
    pub fn mean_inter_arrival(&self, id: usize, mean_block_time: f64) -> f64 {
        mean_block_time / self.fraction[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn honest_peers_split_the_remainder_evenly() {
        let hp = HashPower::new(10, 0.3, 0.3);
        assert!((hp.fraction[0] - 0.3).abs() < 1e-9);
        assert!((hp.fraction[1] - 0.3).abs() < 1e-9);
        for &f in &hp.fraction[2..] {
            assert!((f - 0.05).abs() < 1e-9);
        }
    }

    #[test]
    fn near_zero_selfish_fractions_are_floored() {
        let hp = HashPower::new(5, 0.0, 0.0);
        assert!(hp.fraction[0] >= MIN_SELFISH_FRACTION);
        assert!(hp.fraction[1] >= MIN_SELFISH_FRACTION);
    }
}
