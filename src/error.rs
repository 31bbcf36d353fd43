use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::{env::EnvErr, model::ModelErr, parameters::SyncErr};

/// The crate's result type for worker and coordinator operations.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures.
///
/// `Environment` aborts only the owning worker; `Synchronization` and `Model`
/// are structural contract violations against the shared parameter set and
/// abort the whole training run.
#[derive(Debug)]
pub enum WorkerErr {
    Environment {
        worker_id: usize,
        iteration: usize,
        source: EnvErr,
    },
    Synchronization {
        worker_id: usize,
        iteration: usize,
        source: SyncErr,
    },
    Model {
        worker_id: usize,
        iteration: usize,
        source: ModelErr,
    },
    Config {
        worker_id: usize,
        detail: String,
    },
    Panicked {
        worker_id: usize,
    },
}

impl WorkerErr {
    /// True for failures that must abort the whole training run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WorkerErr::Environment { .. })
    }
}

impl Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Environment {
                worker_id,
                iteration,
                source,
            } => write!(f, "worker {worker_id} at iteration {iteration}: {source}"),
            WorkerErr::Synchronization {
                worker_id,
                iteration,
                source,
            } => write!(
                f,
                "worker {worker_id} at iteration {iteration}: shared parameter contract violated: {source}"
            ),
            WorkerErr::Model {
                worker_id,
                iteration,
                source,
            } => write!(
                f,
                "worker {worker_id} at iteration {iteration}: policy model contract violated: {source}"
            ),
            WorkerErr::Config { worker_id, detail } => {
                write!(f, "worker {worker_id}: invalid configuration: {detail}")
            }
            WorkerErr::Panicked { worker_id } => {
                write!(f, "worker {worker_id} panicked")
            }
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Environment { source, .. } => Some(source),
            WorkerErr::Synchronization { source, .. } => Some(source),
            WorkerErr::Model { source, .. } => Some(source),
            WorkerErr::Config { .. } | WorkerErr::Panicked { .. } => None,
        }
    }
}
