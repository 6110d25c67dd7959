pub mod config;
pub mod core;
pub mod error;
pub mod scheduler;
pub mod sim;

pub use config::SimConfig;
pub use error::SimError;
pub use scheduler::Algorithm;
pub use sim::Engine;
