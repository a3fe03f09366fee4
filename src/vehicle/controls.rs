//! Ship command handling
//!
//! Commands a core (or pilot) can issue against the vehicle it sits in:
//!
//! - `thrust n|s|e|w`, `thrust reset`, `thrust emergency_stop`
//! - `emergency stop`
//! - `power on`, `power off`
//! - `pulse`
//! - `level <hud> <0-5>`

use std::sync::{Arc, Weak};

use crate::command::Actor;
use crate::core::error::{Result, SignalError};
use crate::vehicle::Vehicle;

/// Compass direction for thrust commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "n" | "north" => Some(Direction::North),
            "s" | "south" => Some(Direction::South),
            "e" | "east" => Some(Direction::East),
            "w" | "west" => Some(Direction::West),
            _ => None,
        }
    }

    /// Unit force change on (x, y)
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

/// Run a ship command. Unrecognised text yields `UnknownCommand`.
pub fn execute_ship_command(vehicle: &Vehicle, command: &str) -> Result<()> {
    let words: Vec<&str> = command.split_whitespace().collect();
    match words.as_slice() {
        ["thrust", "reset"] => {
            vehicle.thrust_reset();
            Ok(())
        }
        ["thrust", "emergency_stop"] | ["emergency", "stop"] => vehicle.emergency_stop(),
        ["thrust", dir] => {
            let direction =
                Direction::parse(dir).ok_or_else(|| SignalError::UnknownCommand(command.to_string()))?;
            if vehicle.thrust(direction)? {
                Ok(())
            } else {
                Err(SignalError::CommandRefused(format!(
                    "{}: engine output exceeded",
                    command
                )))
            }
        }
        ["power", "on"] => vehicle.power_on(),
        ["power", "off"] => vehicle.power_off(),
        ["pulse"] => {
            if vehicle.pulse_radar()? {
                Ok(())
            } else {
                Err(SignalError::CommandRefused(
                    "radar doesn't have enough energy to pulse yet".to_string(),
                ))
            }
        }
        ["level", hud, level] => {
            let level: u8 = level
                .parse()
                .map_err(|_| SignalError::UnknownCommand(command.to_string()))?;
            vehicle.set_level(hud, level)
        }
        _ => Err(SignalError::UnknownCommand(command.to_string())),
    }
}

/// The actor a core talks to while a pilot is aboard.
///
/// Ship commands are handled by the vehicle; everything else is passed to
/// the pilot as if they had typed it.
pub struct Cockpit {
    vehicle: Weak<Vehicle>,
    pilot: Arc<dyn Actor>,
}

impl Cockpit {
    pub fn new(vehicle: Weak<Vehicle>, pilot: Arc<dyn Actor>) -> Self {
        Self { vehicle, pilot }
    }
}

impl Actor for Cockpit {
    fn name(&self) -> &str {
        self.pilot.name()
    }

    fn msg(&self, text: &str) {
        self.pilot.msg(text);
    }

    fn execute(&self, command: &str) -> Result<()> {
        let Some(vehicle) = self.vehicle.upgrade() else {
            return self.pilot.execute(command);
        };
        match execute_ship_command(&vehicle, command) {
            Err(SignalError::UnknownCommand(_)) => self.pilot.execute(command),
            other => other,
        }
    }
}
