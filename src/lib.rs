pub mod checkpoint;
pub mod config;
pub mod coordinator;
pub mod env;
pub mod error;
pub mod gym;
pub mod metrics;
pub mod model;
pub mod nn;
pub mod optimization;
pub mod parameters;
pub mod worker;

pub use checkpoint::CheckpointConfig;
pub use config::TrainConfig;
pub use coordinator::Coordinator;
pub use env::Environment;
pub use error::WorkerErr;
pub use model::PolicyModel;
pub use parameters::SharedParameterStore;
pub use worker::WorkerUnit;
