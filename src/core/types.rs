//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for simulatable entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a subsystem inside one power grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubsystemId(pub u32);

impl SubsystemId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Global tick counter (power-grid time unit)
pub type Tick = u64;

/// Discrete energy level assigned to a powered subsystem
pub type EnergyLevel = u8;

/// Highest level a subsystem can be assigned
pub const MAX_ENERGY_LEVEL: EnergyLevel = 5;

/// Turn an arbitrary display name into a constant usable inside fact text.
///
/// Lowercases, replaces anything outside `[a-z0-9_]` with `_`, and prefixes
/// `o_` when the result would not start with a lowercase letter.
pub fn fact_constant(name: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !out.starts_with(|c: char| c.is_ascii_lowercase()) {
        out.insert_str(0, "o_");
    }
    out
}
