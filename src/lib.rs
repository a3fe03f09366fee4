//! Signal Core - autonomous ship cores
//!
//! Logic-program simulation loops for programmable AI cores, and the
//! subsystem power graph that keeps them running.

pub mod ai_core;
pub mod command;
pub mod compiler;
pub mod core;
pub mod power;
pub mod program;
pub mod registry;
pub mod scheduler;
pub mod sensor;
pub mod solver;
pub mod space;
pub mod vehicle;
