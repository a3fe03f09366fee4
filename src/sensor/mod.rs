//! Fact protocol
//!
//! Anything a core can observe renders itself as zero or more lines of fact
//! text. Sensors are snapshotted onto a core at power-on; the order they were
//! attached in is the order their facts appear in the compiled program.

/// An object that can describe itself as logic-program facts
pub trait FactSource: Send + Sync {
    /// Fact text, or `None` when there is nothing to report right now
    fn to_fact(&self) -> Option<String>;
}

/// A fixed block of fact text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFacts(pub String);

impl FactSource for StaticFacts {
    fn to_fact(&self) -> Option<String> {
        if self.0.trim().is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}
