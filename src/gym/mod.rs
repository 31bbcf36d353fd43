//! Reference environments implementing the [`Environment`](crate::env::Environment) contract.

mod corridor;

pub use corridor::{
    ACTION_LEFT, ACTION_RIGHT, ACTION_STAY, Corridor, NUM_ACTIONS,
};
