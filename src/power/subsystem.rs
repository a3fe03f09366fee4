//! Subsystems - generate, store, transfer and consume energy
//!
//! All quantities are whole units. `stored_energy` never exceeds
//! `energy_capacity`, and powering off drops whatever was stored. An
//! unpowered subsystem can still be filled by a powered upstream link.

use serde::{Deserialize, Serialize};

use crate::core::types::{EnergyLevel, SubsystemId};

/// Stock subsystem kinds and their default ratings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubsystemKind {
    Core,
    Reactor,
    Battery,
    Engine,
    Radar,
    Generic,
}

impl SubsystemKind {
    pub fn default_name(self) -> &'static str {
        match self {
            SubsystemKind::Core => "Stock AI Core",
            SubsystemKind::Reactor => "Stock Reactor",
            SubsystemKind::Battery => "Stock Battery",
            SubsystemKind::Engine => "Stock Engine",
            SubsystemKind::Radar => "Stock Radar",
            SubsystemKind::Generic => "Subsystem",
        }
    }

    pub fn default_hud_name(self) -> &'static str {
        match self {
            SubsystemKind::Core => "core",
            SubsystemKind::Reactor => "reactor",
            SubsystemKind::Battery => "battery",
            SubsystemKind::Engine => "engine",
            SubsystemKind::Radar => "radar",
            SubsystemKind::Generic => "subname",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsystem {
    pub kind: SubsystemKind,
    pub name: String,
    /// Short name shown in the HUD and used in facts
    pub hud_name: String,

    // === FUEL ===
    pub fuel_capacity: u32,
    pub stored_fuel: u32,
    pub fuel_per_tick_per_level: u32,

    // === ENERGY ===
    pub energy_capacity: u32,
    pub stored_energy: u32,
    pub energy_provided_per_tick: u32,
    pub energy_transferred_per_tick: u32,
    pub energy_consumed_per_tick_per_level: u32,

    /// Engines only: force units available per assigned level
    pub thrust_per_level: u32,

    pub assigned_level: EnergyLevel,
    pub powered: bool,

    links: Vec<SubsystemId>,
}

impl Subsystem {
    /// A subsystem with the stock ratings for its kind
    pub fn new(kind: SubsystemKind) -> Self {
        let mut sub = Self {
            kind,
            name: kind.default_name().to_string(),
            hud_name: kind.default_hud_name().to_string(),
            fuel_capacity: 0,
            stored_fuel: 0,
            fuel_per_tick_per_level: 0,
            energy_capacity: 10,
            stored_energy: 0,
            energy_provided_per_tick: 0,
            energy_transferred_per_tick: 0,
            energy_consumed_per_tick_per_level: 10,
            thrust_per_level: 0,
            assigned_level: 0,
            powered: false,
            links: Vec::new(),
        };

        match kind {
            SubsystemKind::Core => {
                sub.energy_consumed_per_tick_per_level = 0;
            }
            SubsystemKind::Reactor => {
                sub.energy_provided_per_tick = 10;
                sub.energy_transferred_per_tick = 10;
                sub.energy_consumed_per_tick_per_level = 0;
                sub.fuel_per_tick_per_level = 1;
                sub.fuel_capacity = 30;
                sub.stored_fuel = 30;
            }
            SubsystemKind::Battery => {
                sub.energy_capacity = 30;
                sub.energy_transferred_per_tick = 5;
                sub.energy_consumed_per_tick_per_level = 0;
            }
            SubsystemKind::Engine => {
                sub.energy_consumed_per_tick_per_level = 1;
                sub.thrust_per_level = 1;
            }
            SubsystemKind::Radar => {
                sub.energy_consumed_per_tick_per_level = 1;
            }
            SubsystemKind::Generic => {}
        }

        sub
    }

    pub fn named(mut self, name: impl Into<String>, hud_name: impl Into<String>) -> Self {
        self.name = name.into();
        self.hud_name = hud_name.into();
        self
    }

    /// Downstream subsystems in link order
    pub fn links(&self) -> &[SubsystemId] {
        &self.links
    }

    pub(crate) fn add_link(&mut self, to: SubsystemId) -> bool {
        if self.links.contains(&to) {
            return false;
        }
        self.links.push(to);
        true
    }

    pub(crate) fn remove_link(&mut self, to: SubsystemId) -> bool {
        let before = self.links.len();
        self.links.retain(|l| *l != to);
        self.links.len() != before
    }

    pub fn headroom(&self) -> u32 {
        self.energy_capacity.saturating_sub(self.stored_energy)
    }

    /// Energy this subsystem needs each tick at its current level
    pub fn power_draw(&self) -> u32 {
        self.energy_consumed_per_tick_per_level * self.assigned_level as u32
    }

    /// Fuel burned per tick at the current level
    pub fn fuel_draw(&self) -> u32 {
        self.fuel_per_tick_per_level * self.assigned_level as u32
    }

    /// Burn fuel and store generated energy. False when the fuel ran out.
    pub fn generate(&mut self) -> bool {
        let fuel_draw = self.fuel_draw();
        if self.stored_fuel < fuel_draw {
            return false;
        }
        self.stored_fuel -= fuel_draw;
        self.stored_energy += self.energy_provided_per_tick.min(self.headroom());
        true
    }

    /// Top up stored fuel, never past capacity. Returns the fuel actually added.
    pub fn refuel(&mut self, amount: u32) -> u32 {
        let added = amount.min(self.fuel_capacity.saturating_sub(self.stored_fuel));
        self.stored_fuel += added;
        added
    }

    /// Pay this tick's power draw. False when there isn't enough stored.
    pub fn consume(&mut self) -> bool {
        let draw = self.power_draw();
        if self.stored_energy < draw {
            return false;
        }
        self.stored_energy -= draw;
        true
    }

    pub(crate) fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
        if powered {
            self.assigned_level = 1;
        } else {
            self.assigned_level = 0;
            self.stored_energy = 0;
        }
    }

    /// HUD text: `+reactor:1(F29)(E10)`
    pub fn hud_text(&self) -> String {
        let sign = if self.powered { '+' } else { '-' };
        let fuel = if self.stored_fuel > 0 {
            format!("(F{})", self.stored_fuel)
        } else {
            String::new()
        };
        format!(
            "{}{}:{}{}(E{})",
            sign, self.hud_name, self.assigned_level, fuel, self.stored_energy
        )
    }

    /// Fact text describing this subsystem, if its kind has one
    pub fn to_fact(&self) -> Option<String> {
        let hud = crate::core::types::fact_constant(&self.hud_name);
        let text = match self.kind {
            SubsystemKind::Reactor => format!(
                "% reactor(HUDname, energyProvidedPerTick, energyTransferredPerTick, energyConsumedPerTickPerLevel, fuelConsumedPerTickPerLevel, storedFuel, energyCapacity, storedEnergy).\n\
                 reactor({}, {}, {}, {}, {}, {}, {}, {}).",
                hud,
                self.energy_provided_per_tick,
                self.energy_transferred_per_tick,
                self.energy_consumed_per_tick_per_level,
                self.fuel_per_tick_per_level,
                self.stored_fuel,
                self.energy_capacity,
                self.stored_energy
            ),
            SubsystemKind::Battery => format!(
                "% battery(HUDname, energyTransferredPerTick, energyCapacity, storedEnergy).\n\
                 battery({}, {}, {}, {}).",
                hud, self.energy_transferred_per_tick, self.energy_capacity, self.stored_energy
            ),
            SubsystemKind::Engine => format!(
                "% engine(HUDname, thrustOutputPerLevel, energyConsumedPerTickPerLevel, energyCapacity, storedEnergy).\n\
                 engine({}, {}, {}, {}, {}).",
                hud,
                self.thrust_per_level,
                self.energy_consumed_per_tick_per_level,
                self.energy_capacity,
                self.stored_energy
            ),
            SubsystemKind::Radar => format!(
                "% radar(HUDname, energyConsumedPerTickPerLevel, energyCapacity, storedEnergy).\n\
                 radar({}, {}, {}, {}).",
                hud, self.energy_consumed_per_tick_per_level, self.energy_capacity, self.stored_energy
            ),
            SubsystemKind::Core | SubsystemKind::Generic => return None,
        };
        Some(text)
    }
}
