use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::parameters::{GradientSet, ParameterSnapshot};

/// The actor/critic outputs of one forward pass.
#[derive(Debug, Clone)]
pub struct PolicyOutput {
    /// Probability of each discrete action, summing to one.
    pub action_probs: Vec<f32>,
    /// The critic's value estimate for the observed state.
    pub value: f32,
}

/// Per-step coefficients handed to the backward pass.
///
/// `pg_weight` is the generalized-advantage estimate for the step, frozen as
/// a constant with respect to gradients; the backward pass must not
/// differentiate through it.
#[derive(Debug, Clone, Copy)]
pub struct StepSignal {
    /// The action chosen at this step.
    pub action: usize,
    /// Frozen GAE weight for the policy-gradient term.
    pub pg_weight: f32,
    /// `target − value` for this step; drives the value-head gradient.
    pub value_error: f32,
}

/// An opaque policy model: convolutional stacks, linear heads or anything
/// else with a forward/backward contract over flat parameter tensors.
///
/// `forward` retains a per-step graph (tape); `backward` consumes the tape,
/// one `StepSignal` per retained step in chronological order, and yields the
/// accumulated gradients keyed by the model's tensor identities.
pub trait PolicyModel {
    type Obs;

    /// Graph-retaining forward pass used during collection.
    fn forward(&mut self, obs: &Self::Obs) -> Result<PolicyOutput, ModelErr>;

    /// Inference-only forward pass (bootstrap values, evaluation).
    fn evaluate(&self, obs: &Self::Obs) -> Result<PolicyOutput, ModelErr>;

    /// Consumes the retained graph and returns gradients for the whole
    /// parameter set.
    ///
    /// # Arguments
    /// * `signals` - One entry per retained forward pass, oldest first.
    /// * `entropy_coeff` - Scale of the entropy term of the policy loss.
    /// * `value_coeff` - Scale of the value loss in the total loss.
    fn backward(
        &mut self,
        signals: &[StepSignal],
        entropy_coeff: f32,
        value_coeff: f32,
    ) -> Result<GradientSet, ModelErr>;

    /// Discards the retained graph without producing gradients.
    fn clear_graph(&mut self);

    /// Overwrites the local parameter copy with `snapshot`, whole.
    fn load(&mut self, snapshot: &ParameterSnapshot) -> Result<(), ModelErr>;

    /// Exports the local parameter copy.
    fn export(&self) -> ParameterSnapshot;
}

/// Structural failures of a policy model.
#[derive(Debug)]
pub enum ModelErr {
    TapeLength {
        got: usize,
        expected: usize,
    },
    SnapshotShape {
        tensor: String,
        got: usize,
        expected: usize,
    },
    UnknownTensor {
        tensor: String,
    },
}

impl Display for ModelErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelErr::TapeLength { got, expected } => write!(
                f,
                "retained graph length mismatch: got {got} signals, expected {expected}"
            ),
            ModelErr::SnapshotShape {
                tensor,
                got,
                expected,
            } => write!(
                f,
                "snapshot tensor {tensor} length mismatch: got {got}, expected {expected}"
            ),
            ModelErr::UnknownTensor { tensor } => {
                write!(f, "snapshot tensor {tensor} is unknown to this model")
            }
        }
    }
}

impl Error for ModelErr {}
