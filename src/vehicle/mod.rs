//! Vehicles - containers for a core, its power grid and a kinematic body
//!
//! Boarding routes the core's commands through a [`Cockpit`]: ship commands
//! are handled here, everything else goes to the pilot.

pub mod controls;
pub mod kinematics;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ai_core::AiCore;
use crate::command::Actor;
use crate::core::config::EngineConfig;
use crate::core::error::{Result, SignalError};
use crate::core::sync::{lock, read, write};
use crate::core::types::{EnergyLevel, EntityId, SubsystemId};
use crate::power::{PowerTicker, SharedGrid, Subsystem, SubsystemKind, SubsystemStatus};
use crate::power::PowerGrid;
use crate::scheduler::{Scheduler, StatusSnapshot};
use crate::sensor::FactSource;

pub use controls::{execute_ship_command, Cockpit, Direction};
pub use kinematics::{KinematicBody, KinematicState};

type PilotSlot = Arc<RwLock<Option<Arc<dyn Actor>>>>;

/// Reports one subsystem's facts out of a shared grid
pub struct SubsystemSensor {
    grid: SharedGrid,
    id: SubsystemId,
}

impl SubsystemSensor {
    pub fn new(grid: SharedGrid, id: SubsystemId) -> Self {
        Self { grid, id }
    }
}

impl FactSource for SubsystemSensor {
    fn to_fact(&self) -> Option<String> {
        lock(&self.grid).get(self.id).ok()?.to_fact()
    }
}

/// Serializable vehicle report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub name: String,
    pub powered: bool,
    pub kinematics: KinematicState,
    pub subsystems: Vec<SubsystemStatus>,
    pub core: StatusSnapshot,
    pub hud: String,
}

pub struct Vehicle {
    id: EntityId,
    name: String,
    grid: SharedGrid,
    core: Arc<AiCore>,
    core_subsystem: SubsystemId,
    body: Arc<KinematicBody>,
    pilot: PilotSlot,
    powered: AtomicBool,
    scheduler: Option<Arc<Scheduler>>,
    config: EngineConfig,
}

impl Vehicle {
    /// A vehicle with the stock core -> reactor -> battery -> {engine, radar} grid
    pub fn stock(name: &str, config: &EngineConfig) -> Result<Self> {
        let mut grid = PowerGrid::new();
        let core_id = grid.add(Subsystem::new(SubsystemKind::Core));
        let reactor = grid.add(Subsystem::new(SubsystemKind::Reactor));
        let battery = grid.add(Subsystem::new(SubsystemKind::Battery));
        let engine = grid.add(Subsystem::new(SubsystemKind::Engine));
        let radar = grid.add(Subsystem::new(SubsystemKind::Radar));
        grid.link(core_id, reactor)?;
        grid.link(reactor, battery)?;
        grid.link(battery, engine)?;
        grid.link(battery, radar)?;

        Ok(Self::with_grid(name, grid, core_id, config))
    }

    /// Build around an existing grid whose core subsystem is `core_subsystem`
    pub fn with_grid(
        name: &str,
        grid: PowerGrid,
        core_subsystem: SubsystemId,
        config: &EngineConfig,
    ) -> Self {
        let core = AiCore::new(format!("{} core", name), config).with_subsystem(core_subsystem);
        Self {
            id: EntityId::new(),
            name: name.to_string(),
            grid: grid.into_shared(),
            core: Arc::new(core),
            core_subsystem,
            body: Arc::new(KinematicBody::new(name, KinematicState::default())),
            pilot: Arc::new(RwLock::new(None)),
            powered: AtomicBool::new(false),
            scheduler: None,
            config: config.clone(),
        }
    }

    /// Track the core on this scheduler while powered
    pub fn with_scheduler(mut self, scheduler: Arc<Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn core(&self) -> &Arc<AiCore> {
        &self.core
    }

    pub fn grid(&self) -> &SharedGrid {
        &self.grid
    }

    pub fn body(&self) -> &Arc<KinematicBody> {
        &self.body
    }

    pub fn is_powered(&self) -> bool {
        self.powered.load(Ordering::SeqCst)
    }

    fn find_kind(&self, kind: SubsystemKind) -> Option<SubsystemId> {
        let grid = lock(&self.grid);
        let found = grid
            .ids()
            .find(|id| grid.get(*id).map(|s| s.kind == kind).unwrap_or(false));
        found
    }

    // === PILOT ===

    /// Seat a pilot; the core's commands now run in the cockpit
    pub fn board(self: &Arc<Self>, pilot: Arc<dyn Actor>) {
        info!(vehicle = %self.name, pilot = pilot.name(), "pilot boarded");
        *write(&self.pilot) = Some(Arc::clone(&pilot));
        let cockpit = Cockpit::new(Arc::downgrade(self), pilot);
        self.core.set_controller(Some(Arc::new(cockpit)));
    }

    pub fn disembark(&self) -> Option<Arc<dyn Actor>> {
        self.core.set_controller(None);
        let pilot = write(&self.pilot).take();
        if let Some(p) = &pilot {
            info!(vehicle = %self.name, pilot = p.name(), "pilot disembarked");
        }
        pilot
    }

    pub fn pilot(&self) -> Option<Arc<dyn Actor>> {
        read(&self.pilot).clone()
    }

    fn tell_pilot(&self, text: &str) {
        if let Some(pilot) = self.pilot() {
            pilot.msg(text);
        }
    }

    // === POWER ===

    /// Power the whole grid on from the core and start the core's loop
    pub fn power_on(&self) -> Result<()> {
        if self.powered.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let others: Vec<SubsystemId> = {
            let mut grid = lock(&self.grid);
            grid.chained_power(self.core_subsystem, true)?;
            grid.ids().filter(|id| *id != self.core_subsystem).collect()
        };

        // The core snapshots everything aboard that can report facts
        let mut sensors: Vec<Arc<dyn FactSource>> = vec![self.body.clone()];
        for id in others {
            sensors.push(Arc::new(SubsystemSensor::new(Arc::clone(&self.grid), id)));
        }
        self.core.set_sensors(sensors);

        if let Some(scheduler) = &self.scheduler {
            scheduler.track(self.core.clone());
        }

        info!(vehicle = %self.name, "vehicle powered on");
        self.tell_pilot("You feel the engines rumble to life. Your HUD begins to boot, and blinking lights spring to life.");
        Ok(())
    }

    pub fn power_off(&self) -> Result<()> {
        if !self.powered.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        lock(&self.grid).chained_power(self.core_subsystem, false)?;
        self.core.clear_sensors();
        if let Some(scheduler) = &self.scheduler {
            scheduler.ignore(self.core.id());
        }

        info!(vehicle = %self.name, "vehicle powered off");
        self.tell_pilot("You feel the vehicle land softly and watch as your subsystems power off.");
        Ok(())
    }

    /// Start the global power tick for this vehicle's grid.
    ///
    /// Power notices are delivered to whoever is piloting at the time.
    pub fn start_power_ticker(&self) -> Result<PowerTicker> {
        let pilot = Arc::clone(&self.pilot);
        PowerTicker::spawn(
            Arc::clone(&self.grid),
            self.config.power_tick_interval(),
            move |event| {
                if let Some(p) = read(&pilot).as_ref() {
                    p.msg(&event.notice());
                }
            },
        )
    }

    pub fn set_level(&self, hud_name: &str, level: EnergyLevel) -> Result<()> {
        let mut grid = lock(&self.grid);
        let id = grid
            .find_by_hud(hud_name)
            .ok_or_else(|| SignalError::CommandRefused(format!("no subsystem named {}", hud_name)))?;
        grid.set_level(id, level)
    }

    // === ENGINE ===

    /// Add one unit of force in a direction if the engine can sustain it
    pub fn thrust(&self, direction: Direction) -> Result<bool> {
        let engine = self
            .find_kind(SubsystemKind::Engine)
            .ok_or_else(|| SignalError::CommandRefused("no engine installed".to_string()))?;

        let max = {
            let grid = lock(&self.grid);
            let engine = grid.get(engine)?;
            if !engine.powered {
                return Err(SignalError::NotPowered(engine.name.clone()));
            }
            engine.thrust_per_level as i64 * engine.assigned_level as i64
        };

        let (dx, dy) = direction.delta();
        Ok(self.body.modify(|s| {
            let (fx, fy) = (s.fx + dx, s.fy + dy);
            if fx.abs() <= max && fy.abs() <= max {
                s.fx = fx;
                s.fy = fy;
                true
            } else {
                false
            }
        }))
    }

    pub fn thrust_reset(&self) {
        self.body.modify(|s| {
            s.fx = 0;
            s.fy = 0;
        });
    }

    /// Kill all force and velocity, then power down
    pub fn emergency_stop(&self) -> Result<()> {
        self.tell_pilot("You feel your guts slam around as the emergency stop is performed, alarm sirens blaring.");
        self.body.modify(|s| {
            s.fx = 0;
            s.fy = 0;
            s.vx = 0;
            s.vy = 0;
        });
        self.power_off()
    }

    // === RADAR ===

    /// Spend one draw's worth of radar energy. False if it isn't charged.
    pub fn pulse_radar(&self) -> Result<bool> {
        let radar = self
            .find_kind(SubsystemKind::Radar)
            .ok_or_else(|| SignalError::CommandRefused("no radar installed".to_string()))?;
        let pulsed = lock(&self.grid).discharge(radar)?;
        if pulsed {
            self.tell_pilot("You feel a brief burst of electrical energy as your radar pulses and its capacitors drain.");
        }
        Ok(pulsed)
    }

    // === DISPLAY ===

    pub fn hud_prompt(&self) -> String {
        let state = self.body.state();
        let subsystems: Vec<String> = lock(&self.grid)
            .status_huds()
            .into_iter()
            .map(|hud| format!("[{}]", hud))
            .collect();
        let power = if self.is_powered() { "on" } else { "off" };
        format!(
            "{} x:{},y:{} {} {} >",
            self.name,
            state.x,
            state.y,
            power,
            subsystems.join(" ")
        )
    }

    pub fn status(&self) -> VehicleStatus {
        use crate::scheduler::Simulatable;

        VehicleStatus {
            name: self.name.clone(),
            powered: self.is_powered(),
            kinematics: self.body.state(),
            subsystems: lock(&self.grid).status(),
            core: self.core.status().snapshot(),
            hud: self.hud_prompt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RecordingActor;

    fn ship() -> Arc<Vehicle> {
        Arc::new(Vehicle::stock("ship", &EngineConfig::default()).unwrap())
    }

    #[test]
    fn test_power_on_chains_through_grid_and_attaches_sensors() {
        let ship = ship();
        ship.power_on().unwrap();
        {
            let grid = lock(ship.grid());
            assert!(grid.status().iter().all(|s| s.powered && s.level == 1));
        }
        let stream = ship.core().view_data_stream();
        assert!(stream.contains("body(ship, 0, 0, 0, 0, 0, 0, 1)."));
        assert!(stream.contains("reactor(reactor, 10, 10, 0, 1, 30, 10, 0)."));
        assert!(stream.contains("radar(radar, 1, 10, 0)."));

        ship.power_off().unwrap();
        assert!(lock(ship.grid()).status().iter().all(|s| !s.powered));
        assert_eq!(ship.core().view_data_stream(), "");
    }

    #[test]
    fn test_thrust_limited_by_engine_level() {
        let ship = ship();
        assert!(matches!(
            ship.thrust(Direction::North),
            Err(SignalError::NotPowered(_))
        ));
        ship.power_on().unwrap();
        assert!(ship.thrust(Direction::North).unwrap());
        assert!(!ship.thrust(Direction::North).unwrap());
        assert!(ship.thrust(Direction::East).unwrap());
        assert!(ship.thrust(Direction::South).unwrap());
        assert!(ship.thrust(Direction::South).unwrap());
        assert!(!ship.thrust(Direction::South).unwrap());

        ship.set_level("engine", 2).unwrap();
        assert!(ship.thrust(Direction::East).unwrap());
        let state = ship.body().state();
        assert_eq!((state.fx, state.fy), (2, -1));

        ship.thrust_reset();
        let state = ship.body().state();
        assert_eq!((state.fx, state.fy), (0, 0));
    }

    #[test]
    fn test_emergency_stop_zeroes_motion_and_powers_off() {
        let ship = ship();
        ship.power_on().unwrap();
        ship.body().modify(|s| {
            s.vx = 4;
            s.fy = 1;
        });
        execute_ship_command(&ship, "emergency stop").unwrap();
        let state = ship.body().state();
        assert_eq!((state.vx, state.vy, state.fx, state.fy), (0, 0, 0, 0));
        assert!(!ship.is_powered());
    }

    #[test]
    fn test_cockpit_routes_ship_commands_and_forwards_the_rest() {
        let ship = ship();
        let pilot = Arc::new(RecordingActor::new("pilot"));
        ship.board(pilot.clone());
        ship.power_on().unwrap();

        let controller = ship.core().controller().unwrap();
        controller.execute("thrust e").unwrap();
        controller.execute("say hello").unwrap();

        assert_eq!(ship.body().state().fx, 1);
        assert_eq!(pilot.commands(), vec!["say hello"]);
        assert!(matches!(
            controller.execute("thrust e"),
            Err(SignalError::CommandRefused(_))
        ));

        ship.disembark();
        assert!(ship.core().controller().is_none());
    }

    #[test]
    fn test_pulse_needs_charge() {
        let ship = ship();
        ship.power_on().unwrap();
        assert!(!ship.pulse_radar().unwrap());
        {
            let mut grid = lock(ship.grid());
            for _ in 0..3 {
                grid.tick();
            }
        }
        assert!(ship.pulse_radar().unwrap());
    }

    #[test]
    fn test_hud_prompt() {
        let ship = ship();
        assert_eq!(
            ship.hud_prompt(),
            "ship x:0,y:0 off [-core:0(E0)] [-reactor:0(F30)(E0)] [-battery:0(E0)] [-engine:0(E0)] [-radar:0(E0)] >"
        );
    }
}
