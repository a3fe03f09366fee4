//! Command pipeline
//!
//! Solved symbols -> `extract_commands` -> command text -> `CommandDispatcher`
//! -> `Actor::execute`. Extraction is purely structural; whether a command
//! makes sense is up to the actor that receives it.

pub mod actor;
pub mod dispatch;
pub mod extract;

pub use actor::{Actor, RecordingActor};
pub use dispatch::{CommandDispatcher, DispatchResult};
pub use extract::{extract_command, extract_commands};
