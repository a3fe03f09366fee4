//! User programs and their lifecycle
//!
//! A program is a named block of rule/fact text owned by one core. The
//! library holds every program the core knows; the slots track which of them
//! are loaded and which of the loaded ones are running.

pub mod slots;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::sensor::FactSource;

pub use slots::ProgramSlots;

/// A named rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub content: String,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
        }
    }

    pub fn with_content(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

impl FactSource for Program {
    fn to_fact(&self) -> Option<String> {
        if self.content.trim().is_empty() {
            None
        } else {
            Some(self.content.clone())
        }
    }
}

/// Every program a core owns, keyed by name
#[derive(Debug, Clone, Default)]
pub struct ProgramLibrary {
    programs: AHashMap<String, Program>,
}

impl ProgramLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty program. Returns false if the name is taken.
    pub fn create(&mut self, name: &str) -> bool {
        if self.programs.contains_key(name) {
            return false;
        }
        self.programs.insert(name.to_string(), Program::new(name));
        true
    }

    /// Replace a program's text, creating it if needed
    pub fn write(&mut self, name: &str, content: &str) {
        self.programs
            .entry(name.to_string())
            .or_insert_with(|| Program::new(name))
            .content = content.to_string();
    }

    pub fn get(&self, name: &str) -> Option<&Program> {
        self.programs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Program> {
        self.programs.remove(name)
    }

    /// Program names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.programs.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
