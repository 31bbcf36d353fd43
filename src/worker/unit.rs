use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use log::{debug, error, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    checkpoint,
    config::TrainConfig,
    env::{EnvErr, EnvStep, Environment},
    error::{Result, WorkerErr},
    metrics::MetricsSink,
    model::PolicyModel,
    optimization::Optimizer,
    parameters::{ParameterSnapshot, SharedParameterStore},
};

use super::{Experience, ExperienceBuffer, EpsilonSchedule, exploration, loss};

/// Counters reported by a worker on graceful completion.
#[derive(Debug, Default, Clone)]
pub struct WorkerReport {
    /// Collection iterations actually executed.
    pub iterations: u64,
    /// Episodes finished.
    pub episodes: u64,
    /// Gradient pushes applied to the shared store.
    pub updates: u64,
    /// Optimization cycles skipped over a non-finite loss.
    pub skipped: u64,
}

/// One concurrent training unit.
///
/// Runs the state machine `SYNCED → COLLECTING → OPTIMIZING → (SYNCED |
/// TERMINAL)`: collect experience into the bounded buffer, flush it on the
/// threshold or on termination, push gradients to the shared store, pull a
/// whole fresh snapshot back, repeat until the iteration budget is exhausted
/// or the shared stop flag is raised.
pub struct WorkerUnit<M, E, O>
where
    M: PolicyModel,
    E: Environment<Obs = M::Obs>,
    O: Optimizer,
{
    id: usize,
    cfg: TrainConfig,
    model: M,
    env: E,
    rng: StdRng,
    schedule: EpsilonSchedule,
    buffer: ExperienceBuffer,
    /// Reused local copy of the shared parameters; replaced whole on sync.
    local: ParameterSnapshot,
    store: SharedParameterStore<O>,
    metrics: Arc<dyn MetricsSink>,
    stop: Arc<AtomicBool>,
    episode_length: usize,
    report: WorkerReport,
}

impl<M, E, O> WorkerUnit<M, E, O>
where
    M: PolicyModel,
    E: Environment<Obs = M::Obs>,
    O: Optimizer + Send + Sync,
{
    /// Creates a new `WorkerUnit`.
    ///
    /// # Arguments
    /// * `id` - Identifier used for observability and the RNG stream.
    /// * `cfg` - The training configuration shared by every worker.
    /// * `model` - The worker's private policy model; its parameters become
    ///   the local copy.
    /// * `env` - The worker's private environment instance.
    /// * `store` - Handle onto the shared parameter set.
    /// * `metrics` - Scalar sink; `NullSink` when nothing observes.
    /// * `stop` - Shared flag raised on fatal failures.
    pub fn new(
        id: usize,
        cfg: TrainConfig,
        model: M,
        env: E,
        store: SharedParameterStore<O>,
        metrics: Arc<dyn MetricsSink>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let rng = StdRng::seed_from_u64(cfg.seed.wrapping_add(id as u64));
        let schedule = EpsilonSchedule::new(&cfg.exploration);
        let buffer = ExperienceBuffer::new(cfg.flush_threshold);
        let local = model.export();

        Self {
            id,
            cfg,
            model,
            env,
            rng,
            schedule,
            buffer,
            local,
            store,
            metrics,
            stop,
            episode_length: 0,
            report: WorkerReport::default(),
        }
    }

    /// Runs the interact→buffer→optimize→sync loop to completion.
    ///
    /// # Errors
    /// `WorkerErr::Environment` aborts this worker only. Synchronization and
    /// model contract violations raise the shared stop flag before returning,
    /// aborting the whole run.
    pub fn run(mut self) -> Result<WorkerReport> {
        debug!(worker_id = self.id; "worker synced, starting collection");

        // The initial observation comes from a no-op step; the environment
        // resets itself and exposes no separate reset call.
        let mut state = self.env_step(0, 0)?.observation;
        let mut last_loss = None;

        for i in 1..=self.cfg.iterations {
            if self.stop.load(Ordering::Relaxed) {
                debug!(worker_id = self.id, iteration = i; "stop flag observed, leaving");
                break;
            }

            let eps = self.schedule.epsilon(i);
            let output = self
                .model
                .forward(&state)
                .map_err(|source| self.fatal_model(i, source))?;

            if i == 1 && self.cfg.exploration.fallback_probs.len() > output.action_probs.len() {
                return Err(self.fatal_config(
                    i,
                    format!(
                        "fallback distribution has {} entries but the policy has {} actions",
                        self.cfg.exploration.fallback_probs.len(),
                        output.action_probs.len()
                    ),
                ));
            }

            let action = self.select_action(&output.action_probs, eps);
            let (log_prob, entropy) = policy_stats(&output.action_probs, action);

            let EnvStep {
                observation,
                reward,
                done,
            } = self.env_step(i, action)?;

            self.buffer.push(Experience {
                action,
                value: output.value,
                log_prob,
                reward,
                entropy,
            });
            self.episode_length += 1;
            self.report.iterations += 1;

            if self.buffer.is_full() || done {
                if let Some(total) = self.optimize(i, &observation, done)? {
                    last_loss = Some(total);
                }

                if done {
                    info!(
                        worker_id = self.id,
                        iteration = i,
                        episode_length = self.episode_length;
                        "episode finished"
                    );
                    self.metrics.scalar(
                        &format!("episode_length/worker_{}", self.id),
                        i,
                        self.episode_length as f32,
                    );
                    self.report.episodes += 1;
                    self.episode_length = 0;
                }
            }

            if let Some(ck) = &self.cfg.checkpoint
                && i % ck.interval == 0
            {
                let snapshot = self.store.snapshot();
                match checkpoint::write_checkpoint(ck, i, &snapshot) {
                    Ok(path) => {
                        debug!(worker_id = self.id, iteration = i, path = path.display().to_string(); "checkpoint written")
                    }
                    Err(e) => {
                        warn!(worker_id = self.id, iteration = i; "checkpoint write failed: {e}")
                    }
                }
            }

            if i % self.cfg.metrics_interval == 0
                && let Some(total) = last_loss
            {
                self.metrics
                    .scalar(&format!("loss/worker_{}", self.id), i, total);
            }

            state = observation;
        }

        info!(
            worker_id = self.id,
            iterations = self.report.iterations,
            episodes = self.report.episodes,
            updates = self.report.updates;
            "worker terminal"
        );
        Ok(self.report)
    }

    /// One optimization flush: bootstrap, loss, backward, clip, push, pull.
    ///
    /// # Returns
    /// The total loss, or `None` when the cycle was skipped over a non-finite
    /// loss (shared state untouched).
    fn optimize(&mut self, iteration: usize, next_obs: &M::Obs, done: bool) -> Result<Option<f32>> {
        debug!(
            worker_id = self.id,
            iteration = iteration,
            buffered = self.buffer.len(),
            done = done;
            "optimizing"
        );

        let bootstrap = if done {
            0.
        } else {
            self.model
                .evaluate(next_obs)
                .map_err(|source| self.fatal_model(iteration, source))?
                .value
        };

        let terms = loss::advantage_loss(self.buffer.records(), bootstrap, &self.cfg.loss);

        if !terms.total.is_finite() {
            warn!(
                worker_id = self.id,
                iteration = iteration;
                "non-finite loss, skipping gradient push"
            );
            self.model.clear_graph();
            self.buffer.clear();
            self.report.skipped += 1;
            return Ok(None);
        }

        let mut grads = self
            .model
            .backward(
                &terms.signals,
                self.cfg.loss.entropy_coeff,
                self.cfg.loss.value_loss_coeff,
            )
            .map_err(|source| self.fatal_model(iteration, source))?;

        grads.clip_global_norm(self.cfg.max_grad_norm);

        self.store
            .apply_gradients(&grads)
            .map_err(|source| self.fatal_sync(iteration, source))?;
        self.report.updates += 1;

        // The pull is the only synchronization boundary: the local copy is
        // replaced whole, never merged, so the worker trains against weights
        // at most one optimization cycle stale.
        self.store
            .pull_snapshot_into(&mut self.local)
            .map_err(|source| self.fatal_sync(iteration, source))?;
        self.model
            .load(&self.local)
            .map_err(|source| self.fatal_model(iteration, source))?;

        self.buffer.clear();
        Ok(Some(terms.total))
    }

    /// Samples the policy's distribution, or the fallback with probability `eps`.
    fn select_action(&mut self, probs: &[f32], eps: f32) -> usize {
        let draw: f32 = self.rng.random();

        if draw <= eps {
            exploration::sample_index(&mut self.rng, &self.cfg.exploration.fallback_probs)
        } else {
            exploration::sample_index(&mut self.rng, probs)
        }
    }

    fn env_step(&mut self, iteration: usize, action: usize) -> Result<EnvStep<M::Obs>> {
        let step = self
            .env
            .step(action)
            .map_err(|source| self.env_failure(iteration, source))?;

        if !step.reward.is_finite() {
            let source = EnvErr::MalformedOutput {
                detail: format!("non-finite reward {}", step.reward),
            };
            return Err(self.env_failure(iteration, source));
        }

        Ok(step)
    }

    fn env_failure(&self, iteration: usize, source: EnvErr) -> WorkerErr {
        error!(worker_id = self.id, iteration = iteration; "environment failure: {source}");
        WorkerErr::Environment {
            worker_id: self.id,
            iteration,
            source,
        }
    }

    fn fatal_sync(&self, iteration: usize, source: crate::parameters::SyncErr) -> WorkerErr {
        error!(worker_id = self.id, iteration = iteration; "fatal synchronization failure: {source}");
        self.stop.store(true, Ordering::Relaxed);
        WorkerErr::Synchronization {
            worker_id: self.id,
            iteration,
            source,
        }
    }

    fn fatal_config(&self, iteration: usize, detail: String) -> WorkerErr {
        error!(worker_id = self.id, iteration = iteration; "invalid configuration: {detail}");
        self.stop.store(true, Ordering::Relaxed);
        WorkerErr::Config {
            worker_id: self.id,
            detail,
        }
    }

    fn fatal_model(&self, iteration: usize, source: crate::model::ModelErr) -> WorkerErr {
        error!(worker_id = self.id, iteration = iteration; "fatal model failure: {source}");
        self.stop.store(true, Ordering::Relaxed);
        WorkerErr::Model {
            worker_id: self.id,
            iteration,
            source,
        }
    }
}

/// Log-probability of the chosen action and entropy of the distribution.
fn policy_stats(probs: &[f32], action: usize) -> (f32, f32) {
    let entropy = -probs
        .iter()
        .filter(|&&p| p > 0.)
        .map(|&p| p * p.ln())
        .sum::<f32>();
    let log_prob = probs[action].max(1e-12).ln();

    (log_prob, entropy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_stats_uniform_distribution() {
        let (log_prob, entropy) = policy_stats(&[0.5, 0.5], 1);

        assert!((log_prob - 0.5f32.ln()).abs() < 1e-6);
        assert!((entropy - 2.0f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_policy_stats_degenerate_distribution() {
        let (log_prob, entropy) = policy_stats(&[1., 0.], 0);

        assert_eq!(log_prob, 0.);
        assert_eq!(entropy, 0.);
    }
}
