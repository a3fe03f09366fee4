//! Kinematic bodies - integer position, velocity and applied force

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::core::sync::lock;
use crate::core::types::{fact_constant, EntityId};
use crate::sensor::FactSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinematicState {
    pub x: i64,
    pub y: i64,
    pub vx: i64,
    pub vy: i64,
    pub fx: i64,
    pub fy: i64,
    pub mass: i64,
}

impl Default for KinematicState {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            vx: 0,
            vy: 0,
            fx: 0,
            fy: 0,
            mass: 1,
        }
    }
}

impl KinematicState {
    pub fn at(x: i64, y: i64) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }
}

/// A body whose state can be read by sensors and written by the space loop
#[derive(Debug)]
pub struct KinematicBody {
    id: EntityId,
    label: String,
    state: Mutex<KinematicState>,
}

impl KinematicBody {
    pub fn new(name: &str, state: KinematicState) -> Self {
        Self {
            id: EntityId::new(),
            label: fact_constant(name),
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Constant naming this body in facts
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> KinematicState {
        *lock(&self.state)
    }

    pub fn set_state(&self, state: KinematicState) {
        *lock(&self.state) = state;
    }

    pub fn modify<R>(&self, f: impl FnOnce(&mut KinematicState) -> R) -> R {
        f(&mut lock(&self.state))
    }
}

impl FactSource for KinematicBody {
    fn to_fact(&self) -> Option<String> {
        let s = self.state();
        Some(format!(
            "body({}, {}, {}, {}, {}, {}, {}, {}).",
            self.label, s.x, s.y, s.vx, s.vy, s.fx, s.fy, s.mass
        ))
    }
}
