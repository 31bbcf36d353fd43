use std::{
    error::Error,
    fmt::{self, Display},
};

/// The specific result type for structural checks inside the parameters module.
pub type Result<T> = std::result::Result<T, SyncErr>;

/// Structural mismatch between a gradient set (or output buffer) and the
/// shared parameter set's tensor identities.
///
/// Always a contract violation between a worker's local model and the global
/// model, so callers treat it as fatal for the whole training run.
#[derive(Debug)]
pub enum SyncErr {
    TensorCount {
        got: usize,
        expected: usize,
    },
    TensorLength {
        index: usize,
        name: String,
        got: usize,
        expected: usize,
    },
}

impl Display for SyncErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncErr::TensorCount { got, expected } => write!(
                f,
                "tensor count mismatch against the shared parameter set: got {got}, expected {expected}"
            ),
            SyncErr::TensorLength {
                index,
                name,
                got,
                expected,
            } => write!(
                f,
                "tensor {index} ({name}) length mismatch: got {got}, expected {expected}"
            ),
        }
    }
}

impl Error for SyncErr {}
