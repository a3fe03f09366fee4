//! Per-entity scheduler state
//!
//! Idle -> Running -> (Idle | Failed). Failed sticks until `clear` is called,
//! and while it sticks the entity cannot be started again.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::sync::lock;
use crate::core::types::EntityId;
use crate::solver::{Diagnostic, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    Failed,
}

/// Point-in-time copy of a status
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: SchedulerState,
    pub last_error: Option<String>,
    pub iterations: u64,
}

#[derive(Debug, Default)]
pub struct SimulationStatus {
    inner: Mutex<StatusSnapshot>,
}

impl SimulationStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        lock(&self.inner).state
    }

    pub fn is_failed(&self) -> bool {
        self.state() == SchedulerState::Failed
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Failure report of the last hard error, while Failed
    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner).last_error.clone()
    }

    pub fn iterations(&self) -> u64 {
        lock(&self.inner).iterations
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        lock(&self.inner).clone()
    }

    /// Idle -> Running. False if already running or failed.
    pub fn try_begin(&self) -> bool {
        let mut inner = lock(&self.inner);
        if inner.state != SchedulerState::Idle {
            return false;
        }
        inner.state = SchedulerState::Running;
        true
    }

    /// Running -> Idle after a loop ends naturally
    pub fn finish(&self) {
        let mut inner = lock(&self.inner);
        if inner.state == SchedulerState::Running {
            inner.state = SchedulerState::Idle;
        }
    }

    pub fn fail(&self, report: String) {
        let mut inner = lock(&self.inner);
        inner.state = SchedulerState::Failed;
        inner.last_error = Some(report);
    }

    /// Failed -> Idle. Returns whether there was a failure to clear.
    pub fn clear(&self) -> bool {
        let mut inner = lock(&self.inner);
        if inner.state != SchedulerState::Failed {
            return false;
        }
        inner.state = SchedulerState::Idle;
        inner.last_error = None;
        true
    }

    pub fn record_iteration(&self) {
        lock(&self.inner).iterations += 1;
    }
}

/// An entity the scheduler can run a logic loop for
pub trait Simulatable: Send + Sync + 'static {
    fn entity_id(&self) -> EntityId;

    fn label(&self) -> &str;

    /// Full program text for the next solve; empty means nothing to do
    fn program(&self) -> String;

    /// Apply a solved model to the entity
    fn update(&self, symbols: &[Symbol]) -> Result<()>;

    /// Soft solver messages for this entity's program
    fn on_diagnostic(&self, _diagnostic: &Diagnostic) {}

    fn status(&self) -> &SimulationStatus;
}
