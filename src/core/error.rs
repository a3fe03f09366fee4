use thiserror::Error;

use crate::core::types::{EnergyLevel, EntityId, SubsystemId};
use crate::solver::SolveError;

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Subsystem not found: {0:?}")]
    SubsystemNotFound(SubsystemId),

    #[error("Registry slot {slot} out of range (0..{len})")]
    RegistrySlotOutOfRange { slot: usize, len: usize },

    #[error("Energy level {0} out of range (0..=5)")]
    InvalidEnergyLevel(EnergyLevel),

    #[error("Subsystem {0} is not powered")]
    NotPowered(String),

    #[error("Program not found: {0}")]
    ProgramNotFound(String),

    #[error("{0}")]
    Solve(#[from] SolveError),

    #[error("Malformed symbol: {0}")]
    MalformedSymbol(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command refused: {0}")]
    CommandRefused(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SignalError>;
