//! Logic solver boundary
//!
//! The simulation loop only needs one thing from a solver: hand it program
//! text, get back the symbols of the first model (plus any informational
//! diagnostics) or an error. Everything about the grammar stays behind the
//! [`Solver`] trait. [`DatalogSolver`] is the bundled implementation.

pub mod datalog;
pub mod parser;
pub mod symbol;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use datalog::DatalogSolver;
pub use symbol::Symbol;

/// Severity of a non-fatal solver message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

/// A soft diagnostic reported during an otherwise successful solve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}

/// Result of one successful solve
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveOutcome {
    /// Shown symbols of the first model, in derivation order
    pub symbols: Vec<Symbol>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Hard solver failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("line {line}: syntax error, {message}")]
    Syntax { line: usize, message: String },

    #[error("unsafe variable {variable} in: {statement}")]
    Unsafe { variable: String, statement: String },

    #[error("grounding stopped: more than {0} atoms derived")]
    AtomLimit(usize),

    #[error("solve timed out after {0:?}")]
    Timeout(Duration),

    #[error("solver aborted: {0}")]
    Aborted(String),
}

/// Shared flag asking a running solve to stop.
///
/// Clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A logic solver.
///
/// Every call must build its own grounding/solving context; implementations
/// are shared across entity loops and must not carry state between calls.
pub trait Solver: Send + Sync {
    fn solve(&self, program: &str) -> Result<SolveOutcome, SolveError>;

    /// Solve, giving up with [`SolveError::Aborted`] once `cancel` is set.
    ///
    /// Solvers that cannot be interrupted just run to completion.
    fn solve_with_cancel(&self, program: &str, cancel: &CancelFlag) -> Result<SolveOutcome, SolveError> {
        let _ = cancel;
        self.solve(program)
    }
}

impl<S: Solver + ?Sized> Solver for Arc<S> {
    fn solve(&self, program: &str) -> Result<SolveOutcome, SolveError> {
        (**self).solve(program)
    }

    fn solve_with_cancel(&self, program: &str, cancel: &CancelFlag) -> Result<SolveOutcome, SolveError> {
        (**self).solve_with_cancel(program, cancel)
    }
}
