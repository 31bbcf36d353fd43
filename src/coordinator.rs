use std::{
    sync::{Arc, atomic::AtomicBool},
    thread,
};

use log::{error, info};

use crate::{
    config::TrainConfig,
    env::Environment,
    error::{Result, WorkerErr},
    metrics::MetricsSink,
    model::PolicyModel,
    optimization::Adam,
    parameters::SharedParameterStore,
    worker::WorkerUnit,
};

/// Constructs the shared store and optimizer, spawns the workers and joins
/// them. It has no other runtime responsibility: everything the workers
/// learned already lives in the shared state by the time they are joined.
pub struct Coordinator {
    cfg: TrainConfig,
}

impl Coordinator {
    /// Creates a new `Coordinator`.
    ///
    /// # Arguments
    /// * `cfg` - The training configuration threaded through to every worker.
    pub fn new(cfg: TrainConfig) -> Self {
        Self { cfg }
    }

    /// Runs the full training session and blocks until every worker is
    /// terminal.
    ///
    /// The shared parameters are seeded from worker 0's freshly built model;
    /// every worker's local model is then loaded from that same snapshot, so
    /// all of them start synced. Each worker receives an isolated environment
    /// instance and an isolated seeded random stream.
    ///
    /// # Arguments
    /// * `model_factory` - Builds one policy model per worker id.
    /// * `env_factory` - Builds one private environment per worker id.
    /// * `metrics` - Scalar sink shared by all workers.
    ///
    /// # Returns
    /// The shared parameter store, for snapshotting or evaluation.
    ///
    /// # Errors
    /// The first fatal worker failure. Independent environment failures are
    /// logged, leave the siblings running and do not fail the session.
    pub fn run<M, E, FM, FE>(
        &self,
        model_factory: FM,
        env_factory: FE,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<SharedParameterStore<Adam>>
    where
        M: PolicyModel + Send,
        E: Environment<Obs = M::Obs> + Send,
        FM: FnMut(usize) -> M,
        FE: FnMut(usize) -> E,
    {
        let mut model_factory = model_factory;
        let mut env_factory = env_factory;

        let workers = self.cfg.workers.get();
        let optimizer_cfg = self.cfg.optimizer.clone();

        let mut models = Vec::with_capacity(workers);
        for id in 0..workers {
            models.push(model_factory(id));
        }

        let initial = models[0].export();
        let store: SharedParameterStore<Adam> =
            SharedParameterStore::new(initial.clone(), |len| {
                Adam::new(len, optimizer_cfg.clone())
            });

        for (id, model) in models.iter_mut().enumerate() {
            model.load(&initial).map_err(|source| WorkerErr::Model {
                worker_id: id,
                iteration: 0,
                source,
            })?;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let mut outcomes: Vec<Result<()>> = Vec::with_capacity(workers);

        info!(workers = workers, iterations = self.cfg.iterations; "spawning workers");

        thread::scope(|s| {
            let mut handles = Vec::with_capacity(workers);

            for (id, model) in models.into_iter().enumerate() {
                let env = env_factory(id);
                let unit = WorkerUnit::new(
                    id,
                    self.cfg.clone(),
                    model,
                    env,
                    store.clone(),
                    Arc::clone(&metrics),
                    Arc::clone(&stop),
                );

                handles.push(s.spawn(move || unit.run().map(|_| ())));
            }

            for (id, handle) in handles.into_iter().enumerate() {
                let outcome = handle
                    .join()
                    .unwrap_or(Err(WorkerErr::Panicked { worker_id: id }));
                outcomes.push(outcome);
            }
        });

        let mut first_fatal = None;
        for outcome in outcomes {
            if let Err(e) = outcome {
                error!("worker failed: {e}");
                if e.is_fatal() && first_fatal.is_none() {
                    first_fatal = Some(e);
                }
            }
        }

        match first_fatal {
            Some(e) => Err(e),
            None => {
                info!(global_steps = store.step_count(); "all workers joined");
                Ok(store)
            }
        }
    }
}
