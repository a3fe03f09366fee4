pub mod config;
pub mod error;
pub mod sync;
pub mod types;

pub use config::EngineConfig;
pub use error::{Result, SignalError};
