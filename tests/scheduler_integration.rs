//! Integration tests for the simulation scheduler
//!
//! These run real tokio loops with a short tick interval:
//! - A core's program drives ship commands through the cockpit
//! - Hard failures stop exactly one loop and keep the failing program text
//! - `clear_failure` restarts a failed loop, `ignore` stops a healthy one
//! - Slow solves are cut off by the solve timeout, and the solver is told to stop
//! - A panicking entity fails instead of staying Running

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use signal_core::command::RecordingActor;
use signal_core::core::error::{Result, SignalError};
use signal_core::core::types::EntityId;
use signal_core::core::EngineConfig;
use signal_core::scheduler::{SchedulerState, Scheduler, SimulationStatus, Simulatable};
use signal_core::solver::{CancelFlag, DatalogSolver, SolveError, SolveOutcome, Solver, Symbol};
use signal_core::space::SpaceSimulation;
use signal_core::vehicle::{KinematicBody, KinematicState, Vehicle};

fn fast_config() -> EngineConfig {
    EngineConfig {
        tick_interval_ms: 20,
        power_tick_interval_ms: 20,
        solve_timeout_ms: 1000,
        ..EngineConfig::default()
    }
}

fn scheduler(config: &EngineConfig) -> Arc<Scheduler> {
    let solver: Arc<dyn Solver> = Arc::new(DatalogSolver::new());
    Arc::new(Scheduler::new(solver, config).unwrap())
}

async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Minimal simulatable entity with a swappable program
struct Scripted {
    id: EntityId,
    program: Mutex<String>,
    updates: AtomicUsize,
    panic_on_update: bool,
    status: SimulationStatus,
}

impl Scripted {
    fn new(program: &str) -> Arc<Self> {
        Arc::new(Self {
            id: EntityId::new(),
            program: Mutex::new(program.to_string()),
            updates: AtomicUsize::new(0),
            panic_on_update: false,
            status: SimulationStatus::new(),
        })
    }

    fn panicking(program: &str) -> Arc<Self> {
        Arc::new(Self {
            id: EntityId::new(),
            program: Mutex::new(program.to_string()),
            updates: AtomicUsize::new(0),
            panic_on_update: true,
            status: SimulationStatus::new(),
        })
    }

    fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn set_program(&self, program: &str) {
        *self.program.lock().unwrap() = program.to_string();
    }
}

impl Simulatable for Scripted {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> &str {
        "scripted"
    }

    fn program(&self) -> String {
        self.program.lock().unwrap().clone()
    }

    fn update(&self, _symbols: &[Symbol]) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_update {
            panic!("update blew up");
        }
        Ok(())
    }

    fn status(&self) -> &SimulationStatus {
        &self.status
    }
}

/// Solver that never finishes in time
struct SlowSolver;

impl Solver for SlowSolver {
    fn solve(&self, _program: &str) -> std::result::Result<SolveOutcome, SolveError> {
        thread::sleep(Duration::from_millis(300));
        Ok(SolveOutcome::default())
    }
}

/// Solver that spins until it is cancelled, then records that it saw the flag
#[derive(Default)]
struct SpinningSolver {
    saw_cancel: AtomicBool,
}

impl Solver for SpinningSolver {
    fn solve(&self, program: &str) -> std::result::Result<SolveOutcome, SolveError> {
        self.solve_with_cancel(program, &CancelFlag::new())
    }

    fn solve_with_cancel(
        &self,
        _program: &str,
        cancel: &CancelFlag,
    ) -> std::result::Result<SolveOutcome, SolveError> {
        let started = Instant::now();
        while !cancel.is_cancelled() {
            if started.elapsed() > Duration::from_secs(10) {
                return Ok(SolveOutcome::default());
            }
            thread::sleep(Duration::from_millis(5));
        }
        self.saw_cancel.store(true, Ordering::SeqCst);
        Err(SolveError::Aborted("solve cancelled".into()))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_core_program_drives_ship_commands() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let ship = Arc::new(Vehicle::stock("ship", &config).unwrap().with_scheduler(scheduler.clone()));
    let pilot = Arc::new(RecordingActor::new("pilot"));
    ship.board(pilot.clone());

    let core = ship.core();
    core.write_program(
        "autopilot",
        "command(\"thrust e\") :- body(_, _, _, _, _, FX, _, _), FX < 1.\n#show command/1.",
    )
    .unwrap();
    assert!(core.load("autopilot"));
    assert!(core.run("autopilot"));
    ship.power_on().unwrap();

    assert!(wait_until(Duration::from_secs(3), || ship.body().state().fx == 1).await);
    assert!(core
        .log_entries(256)
        .iter()
        .any(|entry| entry.line == "matched command: thrust e"));
    // Ship commands are handled by the cockpit, not forwarded to the pilot
    assert!(pilot.commands().is_empty());

    // Once force is applied the rule stops firing
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(ship.body().state().fx, 1);
    assert_eq!(core.status().state(), SchedulerState::Running);

    ship.power_off().unwrap();
    assert!(wait_until(Duration::from_secs(2), || core.status().state() == SchedulerState::Idle).await);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_syntax_error_fails_entity_and_keeps_program() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let entity = Scripted::new("hello(world) #show hello/1.");
    scheduler.track(entity.clone());

    assert!(wait_until(Duration::from_secs(2), || entity.status().is_failed()).await);
    let report = entity.status().last_error().unwrap();
    assert!(report.starts_with("ERROR"));
    assert!(report.contains("hello(world) #show hello/1."));
    assert_eq!(entity.updates(), 0);

    // Tracking again does not restart a failed entity
    scheduler.track(entity.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(entity.status().is_failed());
    assert_eq!(entity.status().iterations(), 0);

    // Fix the program and clear: the loop comes back
    entity.set_program("hello(world). #show hello/1.");
    scheduler.clear_failure(entity.clone());
    assert!(wait_until(Duration::from_secs(2), || entity.updates() >= 2).await);
    assert_eq!(entity.status().last_error(), None);

    // Clearing again is harmless
    scheduler.clear_failure(entity.clone());
    assert_eq!(entity.status().state(), SchedulerState::Running);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_core_log_stops_growing() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let ship = Arc::new(Vehicle::stock("ship", &config).unwrap().with_scheduler(scheduler.clone()));

    let core = ship.core();
    core.write_program("broken", "hello(world) #show hello/1.").unwrap();
    core.load("broken");
    core.run("broken");
    ship.power_on().unwrap();

    assert!(wait_until(Duration::from_secs(2), || core.status().is_failed()).await);
    let report = core.last_error().unwrap();
    assert!(report.contains("% Program that caused the error:"));
    assert!(report.contains("% program: broken"));

    let written = core.log_total();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(core.log_total(), written);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failure_is_isolated_per_entity() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let broken = Scripted::new("p(X) :- q(1). q(1).");
    let healthy = Scripted::new("a. b :- a.");
    scheduler.track(broken.clone());
    scheduler.track(healthy.clone());

    assert!(wait_until(Duration::from_secs(2), || broken.status().is_failed()).await);
    let before = healthy.updates();
    assert!(wait_until(Duration::from_secs(2), || healthy.updates() >= before + 3).await);
    assert_eq!(healthy.status().state(), SchedulerState::Running);
    assert!(broken.status().last_error().unwrap().contains("unsafe variable X"));
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ignore_stops_loop() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let entity = Scripted::new("a.");
    scheduler.track(entity.clone());
    assert!(scheduler.is_tracked(entity.entity_id()));

    assert!(wait_until(Duration::from_secs(2), || entity.updates() >= 2).await);
    assert!(scheduler.ignore(entity.entity_id()));
    assert!(!scheduler.ignore(entity.entity_id()));

    assert!(wait_until(Duration::from_secs(2), || entity.status().state() == SchedulerState::Idle).await);
    let stopped_at = entity.updates();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(entity.updates(), stopped_at);
    assert_eq!(scheduler.tracked_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_double_track_runs_one_loop() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let entity = Scripted::new("a.");
    scheduler.track(entity.clone());
    scheduler.track(entity.clone());

    tokio::time::sleep(Duration::from_millis(300)).await;
    // One loop at 20ms per tick manages at most ~15 iterations in 300ms
    assert!(entity.updates() <= 18, "updates = {}", entity.updates());
    assert_eq!(scheduler.tracked_count(), 1);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_program_is_skipped() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let entity = Scripted::new("");
    scheduler.track(entity.clone());

    assert!(wait_until(Duration::from_secs(2), || entity.status().iterations() >= 2).await);
    assert_eq!(entity.updates(), 0);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_solve_times_out() {
    let config = EngineConfig {
        solve_timeout_ms: 50,
        ..fast_config()
    };
    let solver: Arc<dyn Solver> = Arc::new(SlowSolver);
    let scheduler = Scheduler::new(solver, &config).unwrap();
    let entity = Scripted::new("a.");
    scheduler.track(entity.clone());

    assert!(wait_until(Duration::from_secs(2), || entity.status().is_failed()).await);
    assert!(entity.status().last_error().unwrap().contains("timed out"));
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timeout_cancels_running_solve() {
    let config = EngineConfig {
        solve_timeout_ms: 50,
        ..fast_config()
    };
    let solver = Arc::new(SpinningSolver::default());
    let scheduler = Scheduler::new(solver.clone(), &config).unwrap();
    let entity = Scripted::new("a.");
    scheduler.track(entity.clone());

    assert!(wait_until(Duration::from_secs(2), || entity.status().is_failed()).await);
    assert!(entity.status().last_error().unwrap().contains("timed out"));
    assert!(wait_until(Duration::from_secs(2), || solver.saw_cancel.load(Ordering::SeqCst)).await);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_runaway_program_is_stopped_by_timeout() {
    let config = EngineConfig {
        solve_timeout_ms: 100,
        ..fast_config()
    };
    let scheduler = scheduler(&config);
    let mut program: String = (0..400).map(|i| format!("n({}). ", i)).collect();
    program.push_str("p(A, B, C) :- n(A), n(B), n(C), A + B + C < 0.");
    let entity = Scripted::new(&program);
    scheduler.track(entity.clone());

    assert!(wait_until(Duration::from_secs(3), || entity.status().is_failed()).await);
    assert!(entity.status().last_error().unwrap().contains("timed out"));
    assert_eq!(entity.updates(), 0);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panicking_update_fails_entity() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let entity = Scripted::panicking("a.");
    scheduler.track(entity.clone());

    assert!(wait_until(Duration::from_secs(2), || entity.status().is_failed()).await);
    let report = entity.status().last_error().unwrap();
    assert!(report.contains("panicked: update blew up"), "report = {}", report);
    assert_eq!(entity.updates(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(entity.updates(), 1);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_quiet_core_reports_diagnostics_to_pilot() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let ship = Arc::new(Vehicle::stock("ship", &config).unwrap().with_scheduler(scheduler.clone()));
    let pilot = Arc::new(RecordingActor::new("pilot"));
    ship.board(pilot.clone());

    let core = ship.core();
    assert!(!core.is_noisy());
    core.write_program("lonely", "a :- missing(1).").unwrap();
    core.load("lonely");
    core.run("lonely");
    ship.power_on().unwrap();

    assert!(wait_until(Duration::from_secs(3), || {
        pilot
            .messages()
            .iter()
            .any(|m| m.starts_with("info:") && m.contains("missing/1"))
    })
    .await);
    assert_eq!(core.status().state(), SchedulerState::Running);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_snapshot_of_tracked_and_unknown_entities() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let entity = Scripted::new("a.");
    scheduler.track(entity.clone());

    assert!(wait_until(Duration::from_secs(2), || entity.status().iterations() >= 1).await);
    let snapshot = scheduler.snapshot(entity.entity_id()).unwrap();
    assert_eq!(snapshot.state, SchedulerState::Running);
    assert!(snapshot.iterations >= 1);

    let stranger = EntityId::new();
    assert!(matches!(
        scheduler.snapshot(stranger),
        Err(SignalError::EntityNotFound(id)) if id == stranger
    ));
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_space_loop_moves_bodies() {
    let config = fast_config();
    let scheduler = scheduler(&config);
    let space = Arc::new(SpaceSimulation::new("sector"));
    let body = Arc::new(KinematicBody::new(
        "rock",
        KinematicState {
            vx: 1,
            ..Default::default()
        },
    ));
    space.add_body(body.clone());
    scheduler.track(space.clone());

    assert!(wait_until(Duration::from_secs(2), || body.state().x >= 3).await);
    assert_eq!(body.state().vx, 1);
    assert_eq!(body.state().y, 0);
    scheduler.shutdown().await;
}
