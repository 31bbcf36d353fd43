//! Reference models implementing the [`PolicyModel`](crate::model::PolicyModel) contract.

mod linear;

pub use linear::LinearPolicy;
