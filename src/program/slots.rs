//! Loaded/running program bookkeeping
//!
//! Misuse (running something that isn't loaded, loading past capacity) is
//! reported as `false` and leaves the state untouched.

use ahash::AHashSet;

use crate::program::ProgramLibrary;

#[derive(Debug, Clone)]
pub struct ProgramSlots {
    capacity: usize,
    /// Loaded program names in load order
    loaded: Vec<String>,
    running: AHashSet<String>,
}

impl ProgramSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            loaded: Vec::new(),
            running: AHashSet::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Load a program from the library.
    ///
    /// Loading an already-loaded program succeeds without using a slot.
    pub fn load(&mut self, library: &ProgramLibrary, name: &str) -> bool {
        if self.is_loaded(name) {
            return true;
        }
        if !library.contains(name) || self.loaded.len() >= self.capacity {
            return false;
        }
        self.loaded.push(name.to_string());
        true
    }

    /// Start a loaded program
    pub fn run(&mut self, name: &str) -> bool {
        if !self.is_loaded(name) {
            return false;
        }
        self.running.insert(name.to_string());
        true
    }

    /// Stop a running program; it stays loaded
    pub fn kill(&mut self, name: &str) -> bool {
        self.running.remove(name)
    }

    /// Kill and remove a program from its slot
    pub fn unload(&mut self, name: &str) -> bool {
        self.kill(name);
        let before = self.loaded.len();
        self.loaded.retain(|n| n != name);
        self.loaded.len() != before
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.iter().any(|n| n == name)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains(name)
    }

    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }

    /// Running programs, in the order they were loaded
    pub fn running_in_load_order(&self) -> Vec<&str> {
        self.loaded
            .iter()
            .filter(|n| self.running.contains(n.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }
}
