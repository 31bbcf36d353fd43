use rand::Rng;

use crate::config::ExplorationConfig;

/// Linearly annealed epsilon schedule.
///
/// `epsilon(i)` walks from `initial` at iteration 0 to `final_value` at
/// `horizon − 1` and stays clamped there for every later iteration.
#[derive(Debug, Clone)]
pub struct EpsilonSchedule {
    initial: f32,
    final_value: f32,
    horizon: usize,
}

impl EpsilonSchedule {
    pub fn new(cfg: &ExplorationConfig) -> Self {
        Self {
            initial: cfg.initial,
            final_value: cfg.final_value,
            horizon: cfg.horizon.get(),
        }
    }

    /// The exploration probability at the given worker iteration.
    pub fn epsilon(&self, iteration: usize) -> f32 {
        let last = self.horizon - 1;
        if last == 0 {
            return self.final_value;
        }

        let i = iteration.min(last);
        self.initial + (self.final_value - self.initial) * (i as f32 / last as f32)
    }
}

/// Samples an index from a categorical distribution.
///
/// Probabilities are consumed cumulatively; any residual mass from rounding
/// falls onto the last index.
pub fn sample_index<R: Rng>(rng: &mut R, probs: &[f32]) -> usize {
    debug_assert!(!probs.is_empty());

    let draw: f32 = rng.random();
    let mut acc = 0.;

    for (i, p) in probs.iter().enumerate() {
        acc += p;
        if draw < acc {
            return i;
        }
    }

    probs.len() - 1
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn schedule(initial: f32, final_value: f32, horizon: usize) -> EpsilonSchedule {
        EpsilonSchedule::new(&ExplorationConfig {
            initial,
            final_value,
            horizon: NonZeroUsize::new(horizon).unwrap(),
            fallback_probs: vec![0.95, 0.05],
        })
    }

    #[test]
    fn test_endpoints_and_clamping() {
        const HORIZON: usize = 101;

        let s = schedule(0.5, 0.1, HORIZON);
        assert_eq!(s.epsilon(0), 0.5);
        assert!((s.epsilon(HORIZON) - 0.1).abs() < 1e-6);
        assert!((s.epsilon(HORIZON * 10) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_anneal_is_non_increasing() {
        const HORIZON: usize = 50;

        let s = schedule(1.0, 0.0, HORIZON);
        let mut prev = s.epsilon(0);

        for i in 1..HORIZON + 10 {
            let eps = s.epsilon(i);
            assert!(eps <= prev + 1e-7, "epsilon increased at iteration {i}");
            prev = eps;
        }
    }

    #[test]
    fn test_degenerate_horizon_is_constant() {
        let s = schedule(0.9, 0.2, 1);
        assert_eq!(s.epsilon(0), 0.2);
        assert_eq!(s.epsilon(100), 0.2);
    }

    #[test]
    fn test_sample_index_respects_support() {
        let mut rng = StdRng::seed_from_u64(7);
        let probs = [0., 1., 0.];

        for _ in 0..100 {
            assert_eq!(sample_index(&mut rng, &probs), 1);
        }
    }

    #[test]
    fn test_sample_index_covers_all_actions() {
        let mut rng = StdRng::seed_from_u64(7);
        let probs = [0.5, 0.5];
        let mut seen = [false; 2];

        for _ in 0..100 {
            seen[sample_index(&mut rng, &probs)] = true;
        }

        assert_eq!(seen, [true, true]);
    }
}
