mod error;
mod slot;
mod store;
mod tensor;

pub use error::{Result, SyncErr};
pub use slot::TensorSlot;
pub use store::SharedParameterStore;
pub use tensor::{GradientSet, ParameterSnapshot, TensorData, TensorSpec};
