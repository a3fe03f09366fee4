//! Command dispatch - hands extracted commands to an actor

use tracing::{debug, warn};

use crate::command::actor::Actor;

/// Executes command text against an actor
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute every command in order. A failing command does not stop the rest.
    pub fn dispatch<S: AsRef<str>>(actor: &dyn Actor, commands: &[S]) -> DispatchResult {
        let mut result = DispatchResult::default();

        for command in commands {
            let command = command.as_ref();
            result.matched.push(command.to_string());
            match actor.execute(command) {
                Ok(()) => {
                    debug!(actor = actor.name(), command, "command executed");
                    result.executed += 1;
                }
                Err(e) => {
                    warn!(actor = actor.name(), command, error = %e, "command failed");
                    result.errors.push(format!("{}: {}", command, e));
                }
            }
        }

        result
    }
}

/// Result of dispatching one model's commands
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub matched: Vec<String>,
    pub executed: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::actor::RecordingActor;

    #[test]
    fn test_dispatch_continues_after_error() {
        let actor = RecordingActor::new("pilot").refusing(&["jump"]);
        let result = CommandDispatcher::dispatch(&actor, &["thrust n", "jump", "pulse"]);
        assert_eq!(result.matched.len(), 3);
        assert_eq!(result.executed, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("jump"));
        assert_eq!(actor.commands(), vec!["thrust n", "pulse"]);
    }
}
