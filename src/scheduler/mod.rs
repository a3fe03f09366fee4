//! Simulation scheduler - one logic loop per tracked entity
//!
//! Each tracked entity gets its own tokio task that compiles, solves and
//! applies the model, then sleeps out the rest of the tick interval. Loops
//! never share a solver context and a failure in one never touches another.
//!
//! Cancellation is cooperative: `ignore` only removes the entity from the
//! live set, and the loop notices at the top of its next iteration.

pub mod status;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ahash::AHashMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::config::EngineConfig;
use crate::core::error::{Result, SignalError};
use crate::core::sync::lock;
use crate::core::types::EntityId;
use crate::solver::{CancelFlag, Severity, SolveError, Solver};

pub use status::{SchedulerState, SimulationStatus, Simulatable, StatusSnapshot};

type LiveSet = Arc<Mutex<AHashMap<EntityId, Arc<dyn Simulatable>>>>;

/// What a loop task needs, cloned into each spawned task
#[derive(Clone)]
struct LoopContext {
    solver: Arc<dyn Solver>,
    live: LiveSet,
    tick_interval: Duration,
    solve_timeout: Option<Duration>,
}

pub struct Scheduler {
    ctx: LoopContext,
    runtime: Handle,
    tasks: Mutex<AHashMap<EntityId, JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler on the current tokio runtime
    pub fn new(solver: Arc<dyn Solver>, config: &EngineConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| SignalError::Runtime(format!("scheduler needs a tokio runtime: {}", e)))?;
        Ok(Self::with_handle(solver, config, runtime))
    }

    pub fn with_handle(solver: Arc<dyn Solver>, config: &EngineConfig, runtime: Handle) -> Self {
        Self {
            ctx: LoopContext {
                solver,
                live: Arc::new(Mutex::new(AHashMap::new())),
                tick_interval: config.tick_interval(),
                solve_timeout: config.solve_timeout(),
            },
            runtime,
            tasks: Mutex::new(AHashMap::new()),
        }
    }

    /// Add an entity to the live set and start its loop if none is active.
    ///
    /// A Failed entity is registered but not started; see [`Self::clear_failure`].
    pub fn track(&self, entity: Arc<dyn Simulatable>) {
        let id = entity.entity_id();

        // Insert and start under the live lock so a loop that is just exiting
        // cannot miss the re-registration.
        let start = {
            let mut live = lock(&self.ctx.live);
            live.insert(id, Arc::clone(&entity));
            if entity.status().is_failed() {
                warn!(entity = %id, label = entity.label(), "tracked while failed, not starting");
                false
            } else {
                entity.status().try_begin()
            }
        };

        if start {
            let handle = self.runtime.spawn(run_loop(self.ctx.clone(), entity));
            lock(&self.tasks).insert(id, handle);
        }
    }

    /// Remove an entity from the live set. Returns whether it was tracked.
    pub fn ignore(&self, id: EntityId) -> bool {
        let removed = lock(&self.ctx.live).remove(&id).is_some();
        if removed {
            debug!(entity = %id, "entity ignored");
        }
        removed
    }

    pub fn is_tracked(&self, id: EntityId) -> bool {
        lock(&self.ctx.live).contains_key(&id)
    }

    /// Status of a tracked entity
    pub fn snapshot(&self, id: EntityId) -> Result<StatusSnapshot> {
        lock(&self.ctx.live)
            .get(&id)
            .map(|entity| entity.status().snapshot())
            .ok_or(SignalError::EntityNotFound(id))
    }

    pub fn tracked_count(&self) -> usize {
        lock(&self.ctx.live).len()
    }

    /// Reset a Failed entity to Idle and track it again. Safe to call twice.
    pub fn clear_failure(&self, entity: Arc<dyn Simulatable>) {
        if entity.status().clear() {
            info!(entity = %entity.entity_id(), label = entity.label(), "failure cleared");
        }
        self.track(entity);
    }

    /// Ignore every entity and wait for all loops to exit
    pub async fn shutdown(&self) {
        lock(&self.ctx.live).clear();
        let handles: Vec<JoinHandle<()>> = lock(&self.tasks).drain().map(|(_, h)| h).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "simulation task ended abnormally");
            }
        }
        info!("scheduler shut down");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        lock(&self.ctx.live).clear();
    }
}

async fn run_loop(ctx: LoopContext, entity: Arc<dyn Simulatable>) {
    let id = entity.entity_id();
    info!(entity = %id, label = entity.label(), interval = ?ctx.tick_interval, "simulation loop started");

    loop {
        {
            let live = lock(&ctx.live);
            if !live.contains_key(&id) {
                entity.status().finish();
                info!(entity = %id, label = entity.label(), "simulation loop stopped");
                return;
            }
        }

        let started = Instant::now();
        if let Err(report) = simulate(&ctx, &entity).await {
            error!(entity = %id, label = entity.label(), "simulation failed, loop terminated");
            entity.status().fail(report);
            return;
        }
        entity.status().record_iteration();

        tokio::time::sleep(ctx.tick_interval.saturating_sub(started.elapsed())).await;
    }
}

/// Run an entity callback, turning a panic into an error
fn guarded<T>(callback: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(SignalError::Runtime(format!("entity callback panicked: {}", message)))
        }
    }
}

/// One solve-and-apply pass. `Err` carries the failure report.
async fn simulate(ctx: &LoopContext, entity: &Arc<dyn Simulatable>) -> std::result::Result<(), String> {
    let program = guarded(|| Ok(entity.program())).map_err(|e| failure_report(&e, ""))?;
    if program.trim().is_empty() {
        return Ok(());
    }

    let solver = Arc::clone(&ctx.solver);
    let text = program.clone();
    let cancel = CancelFlag::new();
    let job_cancel = cancel.clone();
    let job = tokio::task::spawn_blocking(move || solver.solve_with_cancel(&text, &job_cancel));

    let joined = match ctx.solve_timeout {
        Some(limit) => match tokio::time::timeout(limit, job).await {
            Ok(joined) => joined,
            Err(_) => {
                // The blocking job stops at its next cancel check
                cancel.cancel();
                let err = SignalError::Solve(SolveError::Timeout(limit));
                return Err(failure_report(&err, &program));
            }
        },
        None => job.await,
    };

    let outcome = match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return Err(failure_report(&SignalError::Solve(e), &program)),
        Err(e) => return Err(failure_report(&SignalError::Runtime(e.to_string()), &program)),
    };

    for diagnostic in &outcome.diagnostics {
        match diagnostic.severity {
            Severity::Info => debug!(entity = %entity.entity_id(), %diagnostic, "solver diagnostic"),
            Severity::Warning => warn!(entity = %entity.entity_id(), %diagnostic, "solver diagnostic"),
        }
        guarded(|| {
            entity.on_diagnostic(diagnostic);
            Ok(())
        })
        .map_err(|e| failure_report(&e, &program))?;
    }

    guarded(|| entity.update(&outcome.symbols)).map_err(|e| failure_report(&e, &program))
}

/// Text stored as an entity's last error
pub fn failure_report(error: &SignalError, program: &str) -> String {
    format!("ERROR: {}\n% Program that caused the error:\n{}", error, program)
}
