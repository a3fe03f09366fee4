//! Subsystem power graph
//!
//! Reactors burn fuel into energy, batteries buffer it, engines and radars
//! spend it. Energy only moves along links, once per global tick.

pub mod grid;
pub mod subsystem;
pub mod ticker;

pub use grid::{PowerEvent, PowerGrid, SharedGrid, SubsystemStatus};
pub use subsystem::{Subsystem, SubsystemKind};
pub use ticker::PowerTicker;
