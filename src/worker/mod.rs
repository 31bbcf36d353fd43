mod buffer;
pub mod exploration;
pub mod loss;
mod unit;

pub use buffer::{Experience, ExperienceBuffer};
pub use exploration::EpsilonSchedule;
pub use unit::{WorkerReport, WorkerUnit};
