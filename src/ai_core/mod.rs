//! AI core - a programmable subsystem that runs logic programs
//!
//! The core composes three independent parts:
//! - a handle into the power grid (`subsystem`)
//! - schedulable state: programs, registry, sensors, rolling log, status
//! - a link to the actor that carries out its commands (`controller`)
//!
//! Each part sits behind its own lock and no method holds two of them at once.

pub mod editor;
pub mod log;

use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};

use crate::command::{extract_commands, Actor, CommandDispatcher};
use crate::compiler::{compile_program, unix_timestamp};
use crate::core::config::EngineConfig;
use crate::core::error::{Result, SignalError};
use crate::core::sync::{lock, read, write};
use crate::core::types::{EntityId, SubsystemId};
use crate::program::{Program, ProgramLibrary, ProgramSlots};
use crate::registry::Registry;
use crate::scheduler::{SimulationStatus, Simulatable};
use crate::sensor::FactSource;
use crate::solver::{Diagnostic, Solver, Symbol};

pub use editor::ProgramBuffer;
pub use log::{LogEntry, RollingLog};

/// Program-side state, guarded together
#[derive(Debug, Clone)]
struct CoreState {
    library: ProgramLibrary,
    slots: ProgramSlots,
    registry: Registry,
    noisy: bool,
}

pub struct AiCore {
    id: EntityId,
    name: String,
    subsystem: Option<SubsystemId>,
    status: SimulationStatus,
    state: Mutex<CoreState>,
    sensors: Mutex<Vec<Arc<dyn FactSource>>>,
    log: Mutex<RollingLog>,
    controller: RwLock<Option<Arc<dyn Actor>>>,
    log_view: usize,
}

impl AiCore {
    pub fn new(name: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            subsystem: None,
            status: SimulationStatus::new(),
            state: Mutex::new(CoreState {
                library: ProgramLibrary::new(),
                slots: ProgramSlots::new(config.program_slots),
                registry: Registry::with_slots(config.registry_slots),
                noisy: false,
            }),
            sensors: Mutex::new(Vec::new()),
            log: Mutex::new(RollingLog::new(config.log_capacity)),
            controller: RwLock::new(None),
            log_view: config.log_view,
        }
    }

    /// Bind the core to its subsystem in a power grid
    pub fn with_subsystem(mut self, id: SubsystemId) -> Self {
        self.subsystem = Some(id);
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subsystem(&self) -> Option<SubsystemId> {
        self.subsystem
    }

    // === CONTROLLER ===

    pub fn set_controller(&self, actor: Option<Arc<dyn Actor>>) {
        *write(&self.controller) = actor;
    }

    pub fn controller(&self) -> Option<Arc<dyn Actor>> {
        read(&self.controller).clone()
    }

    /// Message whoever controls the core, if anyone
    pub fn notify(&self, text: &str) {
        match self.controller() {
            Some(actor) => actor.msg(text),
            None => debug!(core = %self.name, text, "no controller to notify"),
        }
    }

    pub fn set_noisy(&self, noisy: bool) {
        lock(&self.state).noisy = noisy;
    }

    pub fn is_noisy(&self) -> bool {
        lock(&self.state).noisy
    }

    // === PROGRAMS ===

    /// Create an empty program. False if the name is taken.
    pub fn create_program(&self, name: &str) -> bool {
        lock(&self.state).library.create(name)
    }

    /// Replace a program's text, creating the program if needed
    pub fn write_program(&self, name: &str, content: &str) -> Result<()> {
        lock(&self.state).library.write(name, content);
        debug!(core = %self.name, program = name, "program saved");
        Ok(())
    }

    pub fn program_text(&self, name: &str) -> Option<String> {
        lock(&self.state).library.get(name).map(|p| p.content.clone())
    }

    pub fn program_names(&self) -> Vec<String> {
        lock(&self.state).library.names()
    }

    /// Unload and remove a program
    pub fn delete_program(&self, name: &str) -> bool {
        let mut state = lock(&self.state);
        state.slots.unload(name);
        state.library.remove(name).is_some()
    }

    /// Open an edit buffer on an existing program
    pub fn edit_program(&self, name: &str) -> Result<ProgramBuffer<'_>> {
        let text = self
            .program_text(name)
            .ok_or_else(|| SignalError::ProgramNotFound(name.to_string()))?;
        Ok(ProgramBuffer::new(self, name.to_string(), text))
    }

    pub fn load(&self, name: &str) -> bool {
        let mut state = lock(&self.state);
        let CoreState { library, slots, .. } = &mut *state;
        slots.load(library, name)
    }

    pub fn run(&self, name: &str) -> bool {
        let started = lock(&self.state).slots.run(name);
        if started {
            info!(core = %self.name, program = name, "program running");
        }
        started
    }

    pub fn kill(&self, name: &str) -> bool {
        let killed = lock(&self.state).slots.kill(name);
        if killed {
            info!(core = %self.name, program = name, "program killed");
        }
        killed
    }

    pub fn unload(&self, name: &str) -> bool {
        lock(&self.state).slots.unload(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        lock(&self.state).slots.is_loaded(name)
    }

    pub fn is_running(&self, name: &str) -> bool {
        lock(&self.state).slots.is_running(name)
    }

    pub fn loaded_programs(&self) -> Vec<String> {
        lock(&self.state).slots.loaded().to_vec()
    }

    pub fn running_programs(&self) -> Vec<String> {
        lock(&self.state)
            .slots
            .running_in_load_order()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Solve one program once against the current registry and sensors.
    ///
    /// Results go to the controller; scheduler state is left alone.
    pub fn test_program(&self, name: &str, solver: &dyn Solver) -> Result<Vec<Symbol>> {
        let (program, registry) = {
            let state = lock(&self.state);
            let program = state
                .library
                .get(name)
                .cloned()
                .ok_or_else(|| SignalError::ProgramNotFound(name.to_string()))?;
            (program, state.registry.clone())
        };
        let sensors = self.sensors();

        let text = compile_program(unix_timestamp(), &registry, &sensors, &[&program]);
        let outcome = solver.solve(&text)?;

        for diagnostic in &outcome.diagnostics {
            self.notify(&diagnostic.to_string());
        }
        let rendered: Vec<String> = outcome.symbols.iter().map(|s| s.to_string()).collect();
        self.notify(&format!("Test run of {}: {}", name, rendered.join(" ")));
        Ok(outcome.symbols)
    }

    // === REGISTRY ===

    pub fn set_registry(&self, slot: usize, fact: Option<String>) -> Result<()> {
        lock(&self.state).registry.set(slot, fact)
    }

    pub fn toggle_registry(&self, slot: usize) -> Result<bool> {
        lock(&self.state).registry.toggle(slot)
    }

    pub fn registry_fact(&self, slot: usize) -> Result<Option<String>> {
        Ok(lock(&self.state).registry.get(slot)?.map(String::from))
    }

    pub fn show_registry(&self) -> String {
        lock(&self.state).registry.show()
    }

    // === SENSORS ===

    pub fn attach_sensor(&self, sensor: Arc<dyn FactSource>) {
        lock(&self.sensors).push(sensor);
    }

    /// Replace the sensor snapshot
    pub fn set_sensors(&self, sensors: Vec<Arc<dyn FactSource>>) {
        *lock(&self.sensors) = sensors;
    }

    pub fn clear_sensors(&self) {
        lock(&self.sensors).clear();
    }

    pub fn sensors(&self) -> Vec<Arc<dyn FactSource>> {
        lock(&self.sensors).clone()
    }

    /// Every fact the attached sensors report right now
    pub fn view_data_stream(&self) -> String {
        self.sensors()
            .iter()
            .filter_map(|s| s.to_fact())
            .collect::<Vec<_>>()
            .join("\n")
    }

    // === LOG & STATUS ===

    /// The last `log_view` log lines, oldest first
    pub fn logs(&self) -> Vec<String> {
        lock(&self.log)
            .tail(self.log_view)
            .into_iter()
            .map(|e| e.line)
            .collect()
    }

    pub fn log_entries(&self, n: usize) -> Vec<LogEntry> {
        lock(&self.log).tail(n)
    }

    pub fn log_total(&self) -> u64 {
        lock(&self.log).total_written()
    }

    pub fn append_log(&self, line: impl Into<String>) {
        lock(&self.log).push(line);
    }

    pub fn last_error(&self) -> Option<String> {
        self.status.last_error()
    }

    /// Full program text for a given timestamp
    pub fn compile(&self, timestamp: u64) -> String {
        let (registry, programs) = {
            let state = lock(&self.state);
            let programs: Vec<Program> = state
                .slots
                .running_in_load_order()
                .into_iter()
                .filter_map(|name| state.library.get(name).cloned())
                .collect();
            (state.registry.clone(), programs)
        };
        let sensors = self.sensors();
        let refs: Vec<&Program> = programs.iter().collect();
        compile_program(timestamp, &registry, &sensors, &refs)
    }
}

impl Simulatable for AiCore {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> &str {
        &self.name
    }

    /// Empty while no program is running
    fn program(&self) -> String {
        if lock(&self.state).slots.running_count() == 0 {
            return String::new();
        }
        self.compile(unix_timestamp())
    }

    fn update(&self, symbols: &[Symbol]) -> Result<()> {
        let commands: Vec<String> = extract_commands(symbols)
            .into_iter()
            .map(String::from)
            .collect();

        {
            let mut log = lock(&self.log);
            for symbol in symbols {
                log.push(symbol.to_string());
            }
            for command in &commands {
                log.push(format!("matched command: {}", command));
            }
        }

        let controller = self.controller();
        if self.is_noisy() {
            if let Some(actor) = &controller {
                let model: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
                actor.msg(&format!("Model: {}", model.join(" ")));
            }
        }

        if commands.is_empty() {
            return Ok(());
        }

        let Some(actor) = controller else {
            warn!(core = %self.name, count = commands.len(), "commands matched with no controller");
            let mut log = lock(&self.log);
            for command in &commands {
                log.push(format!("no controller for command: {}", command));
            }
            return Ok(());
        };

        let result = CommandDispatcher::dispatch(actor.as_ref(), &commands);
        if !result.errors.is_empty() {
            let mut log = lock(&self.log);
            for error in &result.errors {
                log.push(format!("command error: {}", error));
            }
        }
        for error in &result.errors {
            actor.msg(&format!("Core command failed: {}", error));
        }
        Ok(())
    }

    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        let text = diagnostic.to_string();
        self.append_log(text.clone());
        self.notify(&text);
    }

    fn status(&self) -> &SimulationStatus {
        &self.status
    }
}
