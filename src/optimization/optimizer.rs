/// Defines the strategy for updating one parameter tensor from its gradient.
///
/// The `Optimizer` is responsible for the mathematical transition of weights
/// from state `t` to `t+1`. The step counter is owned by the store and shared
/// across every tensor, so it arrives as an argument instead of being tracked
/// per instance.
pub trait Optimizer {
    /// Updates the provided slice of weights using the given gradient.
    ///
    /// # Arguments
    /// * `step` - The shared global step counter value for this apply call.
    /// * `grad` - The gradient corresponding to the `weights` slice.
    /// * `weights` - A mutable slice of the current values of one tensor.
    fn update(&mut self, step: u64, grad: &[f32], weights: &mut [f32]);
}
