//! Power grid - subsystem arena, links and the global tick
//!
//! Subsystems live in one arena and refer to each other by [`SubsystemId`].
//! A tick visits every registered (powered-on) subsystem once, in root-first
//! breadth-first order, and runs generate -> transfer -> consume on each.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::error::{Result, SignalError};
use crate::core::types::{EnergyLevel, SubsystemId, Tick, MAX_ENERGY_LEVEL};
use crate::power::subsystem::Subsystem;

/// A grid shared between its owner and the ticker task
pub type SharedGrid = Arc<Mutex<PowerGrid>>;

/// Something noteworthy that happened during a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerEvent {
    OutOfFuel {
        id: SubsystemId,
        name: String,
    },
    Underpowered {
        id: SubsystemId,
        name: String,
        stored: u32,
        draw: u32,
    },
}

impl PowerEvent {
    pub fn subsystem(&self) -> SubsystemId {
        match self {
            PowerEvent::OutOfFuel { id, .. } | PowerEvent::Underpowered { id, .. } => *id,
        }
    }

    /// Message delivered to whoever is aboard
    pub fn notice(&self) -> String {
        match self {
            PowerEvent::OutOfFuel { name, .. } => {
                format!("{} falters and powers off as it runs out of fuel.", name)
            }
            PowerEvent::Underpowered {
                name, stored, draw, ..
            } => format!(
                "{} falters as it cannot draw enough power. Stored Energy: {} Power Draw: {}",
                name, stored, draw
            ),
        }
    }
}

/// Snapshot of one subsystem for status displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsystemStatus {
    pub id: SubsystemId,
    pub name: String,
    pub hud: String,
    pub powered: bool,
    pub level: EnergyLevel,
    pub fuel: u32,
    pub energy: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PowerGrid {
    subsystems: Vec<Subsystem>,
    /// Registration list; the periodic callback set
    ticking: Vec<SubsystemId>,
    tick_count: Tick,
}

impl PowerGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedGrid {
        Arc::new(Mutex::new(self))
    }

    pub fn add(&mut self, subsystem: Subsystem) -> SubsystemId {
        let id = SubsystemId(self.subsystems.len() as u32);
        self.subsystems.push(subsystem);
        id
    }

    pub fn get(&self, id: SubsystemId) -> Result<&Subsystem> {
        self.subsystems
            .get(id.index())
            .ok_or(SignalError::SubsystemNotFound(id))
    }

    pub fn get_mut(&mut self, id: SubsystemId) -> Result<&mut Subsystem> {
        self.subsystems
            .get_mut(id.index())
            .ok_or(SignalError::SubsystemNotFound(id))
    }

    pub fn find_by_hud(&self, hud_name: &str) -> Option<SubsystemId> {
        self.subsystems
            .iter()
            .position(|s| s.hud_name == hud_name)
            .map(|i| SubsystemId(i as u32))
    }

    pub fn ids(&self) -> impl Iterator<Item = SubsystemId> + '_ {
        (0..self.subsystems.len()).map(|i| SubsystemId(i as u32))
    }

    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }

    pub fn tick_count(&self) -> Tick {
        self.tick_count
    }

    // === LINKS ===

    /// Link `to` downstream of `from`. Returns false if already linked.
    pub fn link(&mut self, from: SubsystemId, to: SubsystemId) -> Result<bool> {
        self.get(to)?;
        if from == to {
            return Ok(false);
        }
        Ok(self.get_mut(from)?.add_link(to))
    }

    pub fn unlink(&mut self, from: SubsystemId, to: SubsystemId) -> Result<bool> {
        Ok(self.get_mut(from)?.remove_link(to))
    }

    // === POWER ===

    pub fn is_registered(&self, id: SubsystemId) -> bool {
        self.ticking.contains(&id)
    }

    /// Register for ticking and come up at level 1
    pub fn power_on(&mut self, id: SubsystemId) -> Result<()> {
        let sub = self.get_mut(id)?;
        sub.set_powered(true);
        debug!(subsystem = %sub.name, "power on");
        if !self.ticking.contains(&id) {
            self.ticking.push(id);
        }
        Ok(())
    }

    /// Deregister, drop to level 0 and lose stored energy
    pub fn power_off(&mut self, id: SubsystemId) -> Result<()> {
        let sub = self.get_mut(id)?;
        sub.set_powered(false);
        debug!(subsystem = %sub.name, "power off");
        self.ticking.retain(|t| *t != id);
        Ok(())
    }

    /// Power `root` and everything reachable from it on or off.
    ///
    /// Returns the subsystems touched, in visit order.
    pub fn chained_power(&mut self, root: SubsystemId, on: bool) -> Result<Vec<SubsystemId>> {
        self.get(root)?;
        let mut visited = AHashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if on {
                self.power_on(id)?;
            } else {
                self.power_off(id)?;
            }
            order.push(id);
            // Reverse so the first link is visited first
            stack.extend(self.get(id)?.links().iter().rev().copied());
        }

        info!(root = ?root, on, count = order.len(), "chained power");
        Ok(order)
    }

    pub fn set_level(&mut self, id: SubsystemId, level: EnergyLevel) -> Result<()> {
        if level > MAX_ENERGY_LEVEL {
            return Err(SignalError::InvalidEnergyLevel(level));
        }
        let sub = self.get_mut(id)?;
        if !sub.powered {
            return Err(SignalError::NotPowered(sub.name.clone()));
        }
        sub.assigned_level = level;
        Ok(())
    }

    /// Spend one tick's worth of a subsystem's draw on demand (radar pulse).
    ///
    /// Returns false, leaving energy untouched, when there isn't enough stored.
    pub fn discharge(&mut self, id: SubsystemId) -> Result<bool> {
        let sub = self.get_mut(id)?;
        if !sub.powered {
            return Err(SignalError::NotPowered(sub.name.clone()));
        }
        Ok(sub.consume())
    }

    /// Add fuel to a subsystem's tank. Returns the fuel actually added.
    pub fn refuel(&mut self, id: SubsystemId, amount: u32) -> Result<u32> {
        let sub = self.get_mut(id)?;
        let added = sub.refuel(amount);
        debug!(subsystem = %sub.name, added, fuel = sub.stored_fuel, "refuel");
        Ok(added)
    }

    // === TICK ===

    /// Registered subsystems in the order a tick visits them
    pub fn tick_order(&self) -> Vec<SubsystemId> {
        let mut has_parent = vec![false; self.subsystems.len()];
        for sub in &self.subsystems {
            for link in sub.links() {
                if let Some(flag) = has_parent.get_mut(link.index()) {
                    *flag = true;
                }
            }
        }

        let registered: AHashSet<SubsystemId> = self.ticking.iter().copied().collect();
        let mut seen = AHashSet::new();
        let mut order = Vec::with_capacity(self.ticking.len());

        for root in self.ids().filter(|id| !has_parent[id.index()]) {
            let mut queue = VecDeque::from([root]);
            seen.insert(root);
            while let Some(id) = queue.pop_front() {
                if registered.contains(&id) {
                    order.push(id);
                }
                for &next in self.subsystems[id.index()].links() {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        for &id in &self.ticking {
            if !seen.contains(&id) {
                seen.insert(id);
                order.push(id);
            }
        }

        order
    }

    /// Run one global tick over every registered subsystem
    pub fn tick(&mut self) -> Vec<PowerEvent> {
        self.tick_count += 1;
        let mut events = Vec::new();
        for id in self.tick_order() {
            self.tick_subsystem(id, &mut events);
        }
        for event in &events {
            warn!(tick = self.tick_count, "{}", event.notice());
        }
        events
    }

    /// Generate, transfer to each link, consume. No-op for unpowered subsystems.
    pub fn tick_subsystem(&mut self, id: SubsystemId, events: &mut Vec<PowerEvent>) {
        let Some(sub) = self.subsystems.get_mut(id.index()) else {
            return;
        };
        if !sub.powered {
            return;
        }

        if sub.energy_provided_per_tick > 0 && !sub.generate() {
            events.push(PowerEvent::OutOfFuel {
                id,
                name: sub.name.clone(),
            });
            sub.set_powered(false);
            self.ticking.retain(|t| *t != id);
            return;
        }

        let rate = sub.energy_transferred_per_tick;
        if rate > 0 {
            let links = sub.links().to_vec();
            for to in links {
                self.transfer(id, to, rate);
            }
        }

        let sub = &mut self.subsystems[id.index()];
        if sub.energy_consumed_per_tick_per_level > 0 && !sub.consume() {
            events.push(PowerEvent::Underpowered {
                id,
                name: sub.name.clone(),
                stored: sub.stored_energy,
                draw: sub.power_draw(),
            });
            sub.set_powered(false);
            self.ticking.retain(|t| *t != id);
        }
    }

    /// Move `min(rate, receiver headroom, sender stored)` from one subsystem to another
    fn transfer(&mut self, from: SubsystemId, to: SubsystemId, rate: u32) -> u32 {
        if from == to {
            return 0;
        }
        let (Some(sender), Some(receiver)) =
            (self.subsystems.get(from.index()), self.subsystems.get(to.index()))
        else {
            return 0;
        };
        // Receivers fill whether or not they are powered; only the sender must be on
        if !sender.powered {
            return 0;
        }

        let amount = rate.min(receiver.headroom()).min(sender.stored_energy);
        self.subsystems[from.index()].stored_energy -= amount;
        self.subsystems[to.index()].stored_energy += amount;
        amount
    }

    pub fn status(&self) -> Vec<SubsystemStatus> {
        self.subsystems
            .iter()
            .enumerate()
            .map(|(i, s)| SubsystemStatus {
                id: SubsystemId(i as u32),
                name: s.name.clone(),
                hud: s.hud_name.clone(),
                powered: s.powered,
                level: s.assigned_level,
                fuel: s.stored_fuel,
                energy: s.stored_energy,
            })
            .collect()
    }

    /// HUD text of every subsystem, in arena order
    pub fn status_huds(&self) -> Vec<String> {
        self.subsystems.iter().map(Subsystem::hud_text).collect()
    }

    /// Total stored energy across the grid
    pub fn total_energy(&self) -> u64 {
        self.subsystems.iter().map(|s| s.stored_energy as u64).sum()
    }
}
