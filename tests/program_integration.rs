//! Integration tests for the AI core's program workflow
//!
//! Covers the path a player takes from an empty core to a running program:
//! - Create, edit, load and run programs within the slot limit
//! - Registry and sensor facts reaching the compiled program
//! - Test runs that report to the controller without touching the loop status

use std::sync::Arc;

use signal_core::ai_core::AiCore;
use signal_core::command::RecordingActor;
use signal_core::core::error::SignalError;
use signal_core::core::EngineConfig;
use signal_core::scheduler::{SchedulerState, Simulatable};
use signal_core::sensor::StaticFacts;
use signal_core::solver::DatalogSolver;

fn core_with_slots(slots: usize) -> AiCore {
    let config = EngineConfig {
        program_slots: slots,
        ..EngineConfig::default()
    };
    AiCore::new("core", &config)
}

#[test]
fn test_slot_limit_and_unload() {
    let core = core_with_slots(2);
    for name in ["a", "b", "c"] {
        assert!(core.create_program(name));
    }

    assert!(core.load("a"));
    assert!(core.load("b"));
    assert!(!core.load("c"), "third program should not fit in two slots");
    // Loading again is a no-op success
    assert!(core.load("a"));

    assert!(core.run("a"));
    assert!(core.unload("a"));
    assert!(!core.is_running("a"));
    assert!(core.load("c"));
    assert_eq!(core.loaded_programs(), vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn test_running_programs_compile_in_load_order() {
    let core = core_with_slots(4);
    core.write_program("second", "two.").unwrap();
    core.write_program("first", "one.").unwrap();
    core.load("first");
    core.load("second");
    core.run("second");
    core.run("first");

    assert_eq!(core.running_programs(), vec!["first".to_string(), "second".to_string()]);
    let text = core.compile(0);
    let first = text.find("% program: first").unwrap();
    let second = text.find("% program: second").unwrap();
    assert!(first < second);
}

#[test]
fn test_edits_reach_running_program() {
    let core = core_with_slots(4);
    let pilot = Arc::new(RecordingActor::new("pilot"));
    core.set_controller(Some(pilot.clone()));
    core.write_program("nav", "old_rule.").unwrap();
    core.load("nav");
    core.run("nav");

    let mut buffer = core.edit_program("nav").unwrap();
    buffer.set_text("new_rule.");
    assert!(buffer.is_modified());
    buffer.save().unwrap();
    buffer.quit();

    let text = core.program();
    assert!(text.contains("new_rule."));
    assert!(!text.contains("old_rule."));
    assert_eq!(pilot.messages().last().unwrap(), "Exited editor for nav.");
}

#[test]
fn test_discarded_edit_leaves_program() {
    let core = core_with_slots(4);
    core.write_program("nav", "keep.").unwrap();

    let mut buffer = core.edit_program("nav").unwrap();
    buffer.push_line("discard.");
    buffer.quit();
    assert_eq!(core.program_text("nav").as_deref(), Some("keep."));

    assert!(matches!(
        core.edit_program("missing"),
        Err(SignalError::ProgramNotFound(_))
    ));
}

#[test]
fn test_registry_visibility_in_compiled_program() {
    let core = core_with_slots(4);
    core.set_registry(0, Some("mode(cruise).".to_string())).unwrap();
    core.set_registry(1, Some("target(station).".to_string())).unwrap();

    assert!(!core.toggle_registry(1).unwrap());
    let text = core.compile(0);
    assert!(text.contains("mode(cruise)."));
    assert!(!text.contains("target(station)."));
    assert_eq!(core.registry_fact(1).unwrap(), None);

    assert!(core.toggle_registry(1).unwrap());
    assert!(core.compile(0).contains("target(station)."));

    assert!(matches!(
        core.set_registry(99, None),
        Err(SignalError::RegistrySlotOutOfRange { .. })
    ));
}

#[test]
fn test_program_reports_to_controller() {
    let core = core_with_slots(4);
    let pilot = Arc::new(RecordingActor::new("pilot"));
    core.set_controller(Some(pilot.clone()));
    core.attach_sensor(Arc::new(StaticFacts("fuel(3).".to_string())));
    core.write_program(
        "check",
        "low :- fuel(F), F < 5.\n#show low/0.",
    )
    .unwrap();

    // A test run does not need the program loaded
    let symbols = core.test_program("check", &DatalogSolver::new()).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].to_string(), "low");
    assert_eq!(pilot.messages().last().unwrap(), "Test run of check: low");
    assert_eq!(core.status().state(), SchedulerState::Idle);
    assert_eq!(core.log_total(), 0);
}

#[test]
fn test_program_surfaces_solver_errors() {
    let core = core_with_slots(4);
    core.write_program("bad", "broken(").unwrap();

    let err = core.test_program("bad", &DatalogSolver::new()).unwrap_err();
    assert!(matches!(err, SignalError::Solve(_)));
    assert!(!core.status().is_failed());

    assert!(matches!(
        core.test_program("missing", &DatalogSolver::new()),
        Err(SignalError::ProgramNotFound(_))
    ));
}

#[test]
fn test_delete_program_unloads_it() {
    let core = core_with_slots(4);
    core.write_program("nav", "a.").unwrap();
    core.load("nav");
    core.run("nav");

    assert!(core.delete_program("nav"));
    assert!(!core.is_loaded("nav"));
    assert!(core.program_names().is_empty());
    assert_eq!(core.program(), "");
}
