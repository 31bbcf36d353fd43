use std::{
    error::Error,
    fmt::{self, Display},
};

/// The outcome of one environment step.
#[derive(Debug, Clone)]
pub struct EnvStep<Obs> {
    pub observation: Obs,
    pub reward: f32,
    pub done: bool,
}

/// A simulated environment, one private instance per worker.
///
/// After a terminal step (`done == true`) the environment resets itself
/// internally; there is no separate reset call. Action `0` is the no-op used
/// to obtain the initial observation.
pub trait Environment {
    type Obs;

    /// Advances the simulation by one step.
    ///
    /// # Arguments
    /// * `action` - The index of the discrete action to take.
    ///
    /// # Errors
    /// `EnvErr` if the simulation fails; the owning worker aborts its own
    /// context only.
    fn step(&mut self, action: usize) -> Result<EnvStep<Self::Obs>, EnvErr>;
}

/// Environment step failures.
#[derive(Debug)]
pub enum EnvErr {
    Step { detail: String },
    MalformedOutput { detail: String },
}

impl Display for EnvErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvErr::Step { detail } => write!(f, "environment step failed: {detail}"),
            EnvErr::MalformedOutput { detail } => {
                write!(f, "environment returned malformed output: {detail}")
            }
        }
    }
}

impl Error for EnvErr {}
