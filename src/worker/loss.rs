use crate::{config::LossConfig, model::StepSignal};

use super::Experience;

/// The scalar losses of one flushed buffer plus the per-step signals the
/// backward pass needs.
#[derive(Debug, Clone)]
pub struct LossTerms {
    pub policy: f32,
    pub value: f32,
    pub total: f32,
    /// One signal per buffered step, oldest first.
    pub signals: Vec<StepSignal>,
}

/// Computes the bootstrapped generalized-advantage loss over a completed
/// buffer.
///
/// Iterates the buffer in reverse chronological order, accumulating a
/// discounted value target from the bootstrap, the squared-advantage value
/// loss, and the GAE-weighted policy loss. The GAE weights are returned as
/// frozen constants; no gradient flows through them.
///
/// A deterministic function of its inputs: the same records, bootstrap and
/// coefficients always produce the same terms.
///
/// # Arguments
/// * `records` - The flushed experience, oldest first.
/// * `bootstrap` - Value of the state after the last record; zero if that
///   state was terminal.
/// * `cfg` - Discount and loss coefficients.
pub fn advantage_loss(records: &[Experience], bootstrap: f32, cfg: &LossConfig) -> LossTerms {
    let mut policy = 0.;
    let mut value = 0.;
    let mut gae = 0.;
    let mut target = bootstrap;
    let mut next_value = bootstrap;

    let mut signals = Vec::with_capacity(records.len());

    for record in records.iter().rev() {
        target = record.reward + cfg.discount * target;
        let advantage = target - record.value;
        value += advantage * advantage;

        let delta = record.reward + cfg.discount * next_value - record.value;
        gae = gae * cfg.discount + delta;
        policy -= record.log_prob * gae - cfg.entropy_coeff * record.entropy;

        signals.push(StepSignal {
            action: record.action,
            pg_weight: gae,
            value_error: advantage,
        });

        next_value = record.value;
    }

    signals.reverse();

    LossTerms {
        policy,
        value,
        total: policy + cfg.value_loss_coeff * value,
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: f32, log_prob: f32, reward: f32, entropy: f32) -> Experience {
        Experience {
            action: 0,
            value,
            log_prob,
            reward,
            entropy,
        }
    }

    fn test_config() -> LossConfig {
        LossConfig {
            discount: 0.99,
            entropy_coeff: 0.01,
            value_loss_coeff: 0.5,
        }
    }

    #[test]
    fn test_single_terminal_step_by_hand() {
        let cfg = test_config();
        let records = [record(0.4, -0.7, 1., 0.6)];

        // Terminal flush: bootstrap is zero.
        let terms = advantage_loss(&records, 0., &cfg);

        // target = 1.0, advantage = 0.6, delta = 1.0 − 0.4 = 0.6 = gae.
        assert!((terms.value - 0.36).abs() < 1e-6);
        let expected_policy = -(-0.7 * 0.6 - 0.01 * 0.6);
        assert!((terms.policy - expected_policy).abs() < 1e-6);
        assert!((terms.total - (terms.policy + 0.5 * terms.value)).abs() < 1e-6);

        assert_eq!(terms.signals.len(), 1);
        assert!((terms.signals[0].pg_weight - 0.6).abs() < 1e-6);
        assert!((terms.signals[0].value_error - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_two_steps_accumulate_in_reverse() {
        let cfg = LossConfig {
            discount: 0.5,
            entropy_coeff: 0.,
            value_loss_coeff: 1.,
        };
        let records = [record(1., -1., 1., 0.), record(2., -2., 3., 0.)];
        let bootstrap = 4.;

        let terms = advantage_loss(&records, bootstrap, &cfg);

        // Reverse pass, step 1 first:
        //   target = 3 + 0.5·4 = 5, advantage = 3, delta = 3 + 0.5·4 − 2 = 3, gae = 3.
        // Then step 0:
        //   target = 1 + 0.5·5 = 3.5, advantage = 2.5,
        //   delta = 1 + 0.5·2 − 1 = 1, gae = 3·0.5 + 1 = 2.5.
        assert!((terms.value - (9. + 6.25)).abs() < 1e-6);
        let expected_policy = -(-2. * 3.) - (-1. * 2.5);
        assert!((terms.policy - expected_policy).abs() < 1e-6);

        // Signals come back in chronological order.
        assert!((terms.signals[0].pg_weight - 2.5).abs() < 1e-6);
        assert!((terms.signals[1].pg_weight - 3.).abs() < 1e-6);
        assert!((terms.signals[0].value_error - 2.5).abs() < 1e-6);
        assert!((terms.signals[1].value_error - 3.).abs() < 1e-6);
    }

    #[test]
    fn test_deterministic_for_fixed_inputs() {
        let cfg = test_config();
        let records = [
            record(0.2, -0.4, 1., 0.5),
            record(0.3, -0.6, 0., 0.4),
            record(0.1, -0.2, 1., 0.7),
        ];

        let a = advantage_loss(&records, 0.25, &cfg);
        let b = advantage_loss(&records, 0.25, &cfg);

        assert_eq!(a.policy, b.policy);
        assert_eq!(a.value, b.value);
        assert_eq!(a.total, b.total);
    }

    #[test]
    fn test_entropy_coefficient_raises_the_loss() {
        let records = [record(0.2, -0.4, 1., 0.5)];
        let without = advantage_loss(&records, 0., &LossConfig {
            entropy_coeff: 0.,
            ..test_config()
        });
        let with = advantage_loss(&records, 0., &test_config());

        assert!(with.policy > without.policy);
    }
}
