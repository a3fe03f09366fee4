//! Registry - fixed array of toggleable fact slots
//!
//! Each slot holds an optional fact line and an independent on/off toggle.
//! Only slots that are both on and non-empty reach the compiled program.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SignalError};

/// Default number of registry slots on a core
pub const REGISTRY_SLOTS: usize = 16;

/// One registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySlot {
    pub fact: Option<String>,
    pub enabled: bool,
}

impl Default for RegistrySlot {
    fn default() -> Self {
        Self {
            fact: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    slots: Vec<RegistrySlot>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_slots(REGISTRY_SLOTS)
    }

    pub fn with_slots(len: usize) -> Self {
        Self {
            slots: vec![RegistrySlot::default(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_index(&self, slot: usize) -> Result<usize> {
        if slot < self.slots.len() {
            Ok(slot)
        } else {
            Err(SignalError::RegistrySlotOutOfRange {
                slot,
                len: self.slots.len(),
            })
        }
    }

    /// Store or clear a slot's fact. Blank text clears.
    pub fn set(&mut self, slot: usize, fact: Option<String>) -> Result<()> {
        let idx = self.slot_index(slot)?;
        self.slots[idx].fact = fact.filter(|f| !f.trim().is_empty());
        Ok(())
    }

    /// The slot's fact if it is toggled on
    pub fn get(&self, slot: usize) -> Result<Option<&str>> {
        let entry = &self.slots[self.slot_index(slot)?];
        Ok(if entry.enabled {
            entry.fact.as_deref()
        } else {
            None
        })
    }

    /// Flip a slot's toggle, returning the new state
    pub fn toggle(&mut self, slot: usize) -> Result<bool> {
        let idx = self.slot_index(slot)?;
        let entry = &mut self.slots[idx];
        entry.enabled = !entry.enabled;
        Ok(entry.enabled)
    }

    pub fn slot(&self, slot: usize) -> Result<&RegistrySlot> {
        Ok(&self.slots[self.slot_index(slot)?])
    }

    /// Visible facts, one per line, in slot order
    pub fn compile(&self) -> String {
        self.slots
            .iter()
            .filter(|s| s.enabled)
            .filter_map(|s| s.fact.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Human-readable listing of every slot
    pub fn show(&self) -> String {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let toggle = if s.enabled { "on " } else { "off" };
                format!("{:>2} [{}] {}", i, toggle, s.fact.as_deref().unwrap_or(""))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
