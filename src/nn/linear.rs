use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    model::{ModelErr, PolicyModel, PolicyOutput, StepSignal},
    parameters::{GradientSet, ParameterSnapshot, TensorData},
};

const INIT_SPREAD: f32 = 0.01;
const INIT_BIAS: f32 = 0.01;

/// A softmax actor and a linear critic over flat observations.
///
/// The smallest model satisfying the `PolicyModel` contract: its gradients
/// are analytic, its tape is a vector of retained forward passes. Meant for
/// demos and tests; real feature extractors plug in through the same trait.
pub struct LinearPolicy {
    obs_dim: usize,
    num_actions: usize,
    /// Row-major `[num_actions, obs_dim]`.
    actor_weight: Vec<f32>,
    actor_bias: Vec<f32>,
    critic_weight: Vec<f32>,
    critic_bias: Vec<f32>,
    tape: Vec<TapeEntry>,
}

struct TapeEntry {
    obs: Vec<f32>,
    probs: Vec<f32>,
}

impl LinearPolicy {
    /// Creates a new `LinearPolicy` with uniformly initialized weights.
    ///
    /// # Arguments
    /// * `obs_dim` - Length of the flat observation vector.
    /// * `num_actions` - Size of the discrete action space.
    /// * `seed` - Seed of the initializer's random stream.
    pub fn new(obs_dim: usize, num_actions: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut uniform = |len: usize| -> Vec<f32> {
            (0..len)
                .map(|_| rng.random_range(-INIT_SPREAD..INIT_SPREAD))
                .collect()
        };

        Self {
            obs_dim,
            num_actions,
            actor_weight: uniform(num_actions * obs_dim),
            actor_bias: vec![INIT_BIAS; num_actions],
            critic_weight: uniform(obs_dim),
            critic_bias: vec![INIT_BIAS],
            tape: Vec::new(),
        }
    }

    fn output(&self, obs: &[f32]) -> (Vec<f32>, f32) {
        let mut logits = self.actor_bias.clone();
        for a in 0..self.num_actions {
            let row = &self.actor_weight[a * self.obs_dim..(a + 1) * self.obs_dim];
            logits[a] += row.iter().zip(obs).map(|(w, x)| w * x).sum::<f32>();
        }

        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let mut probs: Vec<f32> = logits.iter().map(|z| (z - max).exp()).collect();
        let sum: f32 = probs.iter().sum();
        probs.iter_mut().for_each(|p| *p /= sum);

        let value = self.critic_bias[0]
            + self
                .critic_weight
                .iter()
                .zip(obs)
                .map(|(w, x)| w * x)
                .sum::<f32>();

        (probs, value)
    }

    fn tensors(&self) -> [(&'static str, Vec<usize>, &Vec<f32>); 4] {
        [
            (
                "actor.weight",
                vec![self.num_actions, self.obs_dim],
                &self.actor_weight,
            ),
            ("actor.bias", vec![self.num_actions], &self.actor_bias),
            ("critic.weight", vec![self.obs_dim], &self.critic_weight),
            ("critic.bias", vec![1], &self.critic_bias),
        ]
    }
}

impl PolicyModel for LinearPolicy {
    type Obs = Vec<f32>;

    fn forward(&mut self, obs: &Self::Obs) -> Result<PolicyOutput, ModelErr> {
        let (probs, value) = self.output(obs);

        self.tape.push(TapeEntry {
            obs: obs.clone(),
            probs: probs.clone(),
        });

        Ok(PolicyOutput {
            action_probs: probs,
            value,
        })
    }

    fn evaluate(&self, obs: &Self::Obs) -> Result<PolicyOutput, ModelErr> {
        let (probs, value) = self.output(obs);
        Ok(PolicyOutput {
            action_probs: probs,
            value,
        })
    }

    fn backward(
        &mut self,
        signals: &[StepSignal],
        entropy_coeff: f32,
        value_coeff: f32,
    ) -> Result<GradientSet, ModelErr> {
        if signals.len() != self.tape.len() {
            let err = ModelErr::TapeLength {
                got: signals.len(),
                expected: self.tape.len(),
            };
            self.tape.clear();
            return Err(err);
        }

        let mut g_actor_w = vec![0.; self.actor_weight.len()];
        let mut g_actor_b = vec![0.; self.actor_bias.len()];
        let mut g_critic_w = vec![0.; self.critic_weight.len()];
        let mut g_critic_b = vec![0.; 1];

        for (entry, signal) in self.tape.drain(..).zip(signals) {
            let probs = &entry.probs;
            let entropy = -probs
                .iter()
                .filter(|&&p| p > 0.)
                .map(|&p| p * p.ln())
                .sum::<f32>();

            // d(−log p[a]·gae)/dz_j = gae·(p_j − 1{j=a});
            // dH/dz_j = −p_j·(ln p_j + H), scaled by the entropy coefficient.
            for j in 0..self.num_actions {
                let indicator = if j == signal.action { 1. } else { 0. };
                let d_policy = signal.pg_weight * (probs[j] - indicator);
                let d_entropy = -probs[j] * (probs[j].max(1e-12).ln() + entropy);
                let dz = d_policy + entropy_coeff * d_entropy;

                g_actor_b[j] += dz;
                let row = &mut g_actor_w[j * self.obs_dim..(j + 1) * self.obs_dim];
                row.iter_mut().zip(&entry.obs).for_each(|(g, x)| *g += dz * x);
            }

            // d(coeff·(target − v)²)/dv = −2·coeff·value_error.
            let dv = -2. * value_coeff * signal.value_error;
            g_critic_b[0] += dv;
            g_critic_w
                .iter_mut()
                .zip(&entry.obs)
                .for_each(|(g, x)| *g += dv * x);
        }

        Ok(GradientSet::new(vec![
            Some(g_actor_w),
            Some(g_actor_b),
            Some(g_critic_w),
            Some(g_critic_b),
        ]))
    }

    fn clear_graph(&mut self) {
        self.tape.clear();
    }

    fn load(&mut self, snapshot: &ParameterSnapshot) -> Result<(), ModelErr> {
        // Stale activations would no longer match the replaced weights.
        self.tape.clear();

        for tensor in &snapshot.tensors {
            let target = match tensor.name.as_str() {
                "actor.weight" => &mut self.actor_weight,
                "actor.bias" => &mut self.actor_bias,
                "critic.weight" => &mut self.critic_weight,
                "critic.bias" => &mut self.critic_bias,
                other => {
                    return Err(ModelErr::UnknownTensor {
                        tensor: other.to_string(),
                    });
                }
            };

            if tensor.len() != target.len() {
                return Err(ModelErr::SnapshotShape {
                    tensor: tensor.name.clone(),
                    got: tensor.len(),
                    expected: target.len(),
                });
            }

            target.copy_from_slice(&tensor.data);
        }

        Ok(())
    }

    fn export(&self) -> ParameterSnapshot {
        ParameterSnapshot::new(
            self.tensors()
                .into_iter()
                .map(|(name, shape, data)| TensorData::new(name, shape, data.clone()))
                .collect(),
        )
    }
}
