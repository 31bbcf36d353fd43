use super::Optimizer;

/// Hyperparameters for the shared Adam optimizer.
#[derive(Debug, Clone)]
pub struct AdamConfig {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-4,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// Bias-corrected adaptive-moment update for one tensor.
///
/// Bias correction uses the store's global step counter, so a tensor skipped
/// by some apply calls is still corrected with the shared `t`. All tensors
/// share one notion of training time, whatever subset each call touches.
#[derive(Debug)]
pub struct Adam {
    cfg: AdamConfig,
    exp_avg: Box<[f32]>,
    exp_avg_sq: Box<[f32]>,
}

impl Adam {
    /// Creates a new `Adam` with zeroed moments.
    ///
    /// # Arguments
    /// * `len` - The tensor length this instance will update.
    /// * `cfg` - Learning rate, decay rates and epsilon.
    pub fn new(len: usize, cfg: AdamConfig) -> Self {
        Self {
            cfg,
            exp_avg: vec![0.; len].into_boxed_slice(),
            exp_avg_sq: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Adam {
    fn update(&mut self, step: u64, grad: &[f32], weights: &mut [f32]) {
        let AdamConfig {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
        } = self.cfg;

        let bc1 = 1. - b1.powi(step as i32);
        let bc2 = 1. - b2.powi(step as i32);
        let step_size = lr * bc2.sqrt() / bc1;

        weights
            .iter_mut()
            .zip(grad)
            .zip(self.exp_avg.iter_mut())
            .zip(self.exp_avg_sq.iter_mut())
            .for_each(|(((w, g), m), v)| {
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g.powi(2);
                *w -= step_size * *m / (v.sqrt() + eps);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_matches_hand_computation() {
        let cfg = AdamConfig {
            learning_rate: 0.1,
            ..AdamConfig::default()
        };
        let mut adam = Adam::new(1, cfg.clone());
        let mut weights = [1.0f32];

        adam.update(1, &[0.5], &mut weights);

        // m = 0.1 * 0.5, v = 0.001 * 0.25, t = 1.
        let m = (1. - cfg.beta1) * 0.5;
        let v = (1. - cfg.beta2) * 0.25;
        let step_size =
            cfg.learning_rate * (1. - cfg.beta2).sqrt() / (1. - cfg.beta1);
        let expected = 1.0 - step_size * m / (v.sqrt() + cfg.epsilon);

        assert!((weights[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_shared_step_drives_bias_correction() {
        // Two instances with identical moments but different global steps must
        // produce different step sizes.
        let cfg = AdamConfig {
            learning_rate: 0.1,
            ..AdamConfig::default()
        };
        let mut early = Adam::new(1, cfg.clone());
        let mut late = Adam::new(1, cfg);

        let mut w_early = [1.0f32];
        let mut w_late = [1.0f32];

        early.update(1, &[0.5], &mut w_early);
        late.update(100, &[0.5], &mut w_late);

        assert!((w_early[0] - w_late[0]).abs() > 1e-6);
    }

    #[test]
    fn test_descends_against_constant_gradient() {
        let mut adam = Adam::new(2, AdamConfig::default());
        let mut weights = [1.0f32, -1.0];

        for step in 1..=100 {
            adam.update(step, &[1., -1.], &mut weights);
        }

        assert!(weights[0] < 1.0);
        assert!(weights[1] > -1.0);
    }
}
