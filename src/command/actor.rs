//! Message/command recipients

use crate::core::error::{Result, SignalError};
use crate::core::sync::lock;
use std::sync::Mutex;

/// Something that can be told things and asked to do things
pub trait Actor: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver a plain text message
    fn msg(&self, text: &str);

    /// Run a command as if this actor had typed it
    fn execute(&self, command: &str) -> Result<()>;
}

/// In-memory actor that records everything it receives
#[derive(Debug, Default)]
pub struct RecordingActor {
    name: String,
    messages: Mutex<Vec<String>>,
    commands: Mutex<Vec<String>>,
    refuse: Vec<String>,
}

impl RecordingActor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Refuse any command starting with one of these prefixes
    pub fn refusing(mut self, prefixes: &[&str]) -> Self {
        self.refuse = prefixes.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }

    pub fn commands(&self) -> Vec<String> {
        lock(&self.commands).clone()
    }
}

impl Actor for RecordingActor {
    fn name(&self) -> &str {
        &self.name
    }

    fn msg(&self, text: &str) {
        lock(&self.messages).push(text.to_string());
    }

    fn execute(&self, command: &str) -> Result<()> {
        if self.refuse.iter().any(|p| command.starts_with(p.as_str())) {
            return Err(SignalError::CommandRefused(command.to_string()));
        }
        lock(&self.commands).push(command.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_messages_and_commands() {
        let actor = RecordingActor::new("pilot");
        actor.msg("hello");
        actor.execute("thrust n").unwrap();
        assert_eq!(actor.name(), "pilot");
        assert_eq!(actor.messages(), vec!["hello"]);
        assert_eq!(actor.commands(), vec!["thrust n"]);
    }

    #[test]
    fn test_refused_command_is_not_recorded() {
        let actor = RecordingActor::new("pilot").refusing(&["self destruct"]);
        assert!(matches!(
            actor.execute("self destruct now"),
            Err(SignalError::CommandRefused(_))
        ));
        assert!(actor.commands().is_empty());
    }
}
