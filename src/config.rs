use std::num::NonZeroUsize;

use crate::{checkpoint::CheckpointConfig, optimization::AdamConfig};

/// Coefficients of the bootstrapped generalized-advantage loss.
#[derive(Debug, Clone)]
pub struct LossConfig {
    pub discount: f32,
    pub entropy_coeff: f32,
    pub value_loss_coeff: f32,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            discount: 0.99,
            entropy_coeff: 0.01,
            value_loss_coeff: 0.5,
        }
    }
}

/// Epsilon-greedy exploration bounds and the fixed fallback distribution.
#[derive(Debug, Clone)]
pub struct ExplorationConfig {
    /// Epsilon at iteration zero.
    pub initial: f32,
    /// Epsilon at and beyond the anneal horizon.
    pub final_value: f32,
    /// Iterations over which epsilon anneals linearly.
    pub horizon: NonZeroUsize,
    /// Action probabilities used when the fallback fires. Must not be longer
    /// than the policy's action distribution; workers reject a wider fallback
    /// as a fatal configuration error on their first step.
    pub fallback_probs: Vec<f32>,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            initial: 0.1,
            final_value: 0.0001,
            horizon: NonZeroUsize::new(1_000_000).unwrap(),
            fallback_probs: vec![0.95, 0.05],
        }
    }
}

/// The complete training configuration, constructed once and threaded through
/// the coordinator to every worker.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Number of concurrent workers.
    pub workers: NonZeroUsize,
    /// Per-worker iteration budget.
    pub iterations: usize,
    /// Buffer length that triggers an optimization flush.
    pub flush_threshold: NonZeroUsize,
    /// Maximum global gradient norm before an apply.
    pub max_grad_norm: f32,
    /// Base RNG seed; worker `i` uses `seed + i`.
    pub seed: u64,
    pub loss: LossConfig,
    pub exploration: ExplorationConfig,
    pub optimizer: AdamConfig,
    /// Periodic shared-snapshot writes; `None` disables them.
    pub checkpoint: Option<CheckpointConfig>,
    /// Iterations between loss reports to the metrics sink.
    pub metrics_interval: NonZeroUsize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            workers: NonZeroUsize::new(4).unwrap(),
            iterations: 1_000_000,
            flush_threshold: NonZeroUsize::new(30).unwrap(),
            max_grad_norm: 40.,
            seed: 0,
            loss: LossConfig::default(),
            exploration: ExplorationConfig::default(),
            optimizer: AdamConfig::default(),
            checkpoint: None,
            metrics_interval: NonZeroUsize::new(100).unwrap(),
        }
    }
}
