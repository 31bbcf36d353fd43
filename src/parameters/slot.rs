use parking_lot::{Mutex, RwLock};

use crate::optimization::Optimizer;

/// One shared parameter tensor and its optimizer moment state.
///
/// Exclusion is strictly per tensor: a write here never blocks readers or
/// writers of any other slot.
#[derive(Debug)]
pub struct TensorSlot<O: Optimizer> {
    len: usize,
    weights: RwLock<Box<[f32]>>,
    optimizer: Mutex<O>,
}

impl<O: Optimizer> TensorSlot<O> {
    /// Creates a new `TensorSlot`.
    ///
    /// # Arguments
    /// * `weights` - The initial state of the tensor.
    /// * `optimizer` - The optimization algorithm holding this tensor's moments.
    pub fn new(weights: Vec<f32>, optimizer: O) -> Self {
        let len = weights.len();

        Self {
            len,
            weights: RwLock::new(weights.into_boxed_slice()),
            optimizer: Mutex::new(optimizer),
        }
    }

    /// Returns the number of parameters in this tensor.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Applies a pre-validated gradient to the tensor under its write lock.
    ///
    /// # Arguments
    /// * `step` - The shared global step counter value for this apply call.
    /// * `grad` - The gradient, already checked to match `self.len()`.
    pub fn apply(&self, step: u64, grad: &[f32]) {
        debug_assert_eq!(grad.len(), self.len);

        let mut weights = self.weights.write();
        self.optimizer.lock().update(step, grad, &mut weights);
    }

    /// Copies the tensor's weights into `out` under its read lock.
    ///
    /// # Panics
    /// If `out.len()` doesn't match this slot's length; callers validate first.
    pub fn pull(&self, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.len);

        let weights = self.weights.read();
        out.copy_from_slice(&weights);
    }
}
