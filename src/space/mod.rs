//! Space - a simulatable region that integrates the bodies inside it
//!
//! Physics is itself a logic program: each tick the body facts are solved
//! against [`PHYSICS_RULES`] and the resulting `velocity/3` and `position/3`
//! atoms are written back onto the bodies.

use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use tracing::debug;

use crate::core::error::{Result, SignalError};
use crate::core::sync::{read, write};
use crate::core::types::EntityId;
use crate::scheduler::{SimulationStatus, Simulatable};
use crate::sensor::FactSource;
use crate::solver::Symbol;
use crate::vehicle::KinematicBody;

/// One explicit Euler step over `body(B, X, Y, VX, VY, FX, FY, M)` facts
pub const PHYSICS_RULES: &str = "\
velocity(B, VX + FX / M, VY + FY / M) :- body(B, _, _, VX, VY, FX, FY, M).
position(B, X + VX, Y + VY) :- body(B, X, Y, _, _, _, _, _), velocity(B, VX, VY).
#show position/3.
#show velocity/3.";

pub struct SpaceSimulation {
    id: EntityId,
    name: String,
    bodies: RwLock<Vec<Arc<KinematicBody>>>,
    status: SimulationStatus,
}

impl SpaceSimulation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            bodies: RwLock::new(Vec::new()),
            status: SimulationStatus::new(),
        }
    }

    pub fn add_body(&self, body: Arc<KinematicBody>) {
        let mut bodies = write(&self.bodies);
        if !bodies.iter().any(|b| b.id() == body.id()) {
            bodies.push(body);
        }
    }

    pub fn remove_body(&self, id: EntityId) -> bool {
        let mut bodies = write(&self.bodies);
        let before = bodies.len();
        bodies.retain(|b| b.id() != id);
        bodies.len() != before
    }

    pub fn bodies(&self) -> Vec<Arc<KinematicBody>> {
        read(&self.bodies).clone()
    }
}

fn numeric_args(symbol: &Symbol) -> Result<(&str, i64, i64)> {
    let malformed = || SignalError::MalformedSymbol(symbol.to_string());
    match symbol.args() {
        [Symbol::Constant(label), a, b] => Ok((
            label.as_str(),
            a.as_number().ok_or_else(malformed)?,
            b.as_number().ok_or_else(malformed)?,
        )),
        _ => Err(malformed()),
    }
}

impl Simulatable for SpaceSimulation {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn program(&self) -> String {
        let bodies = self.bodies();
        if bodies.is_empty() {
            return String::new();
        }
        let facts: Vec<String> = bodies.iter().filter_map(|b| b.to_fact()).collect();
        format!(
            "% Physics\n{}\n\n% Bodies\n{}",
            PHYSICS_RULES,
            facts.join("\n")
        )
    }

    fn update(&self, symbols: &[Symbol]) -> Result<()> {
        let bodies: AHashMap<String, Arc<KinematicBody>> = self
            .bodies()
            .into_iter()
            .map(|b| (b.label().to_string(), b))
            .collect();

        for symbol in symbols {
            let is_position = symbol.is_predicate("position", 3);
            if !is_position && !symbol.is_predicate("velocity", 3) {
                continue;
            }
            let (label, a, b) = numeric_args(symbol)?;
            let Some(body) = bodies.get(label) else {
                debug!(space = %self.name, body = label, "model names an unknown body");
                continue;
            };
            body.modify(|s| {
                if is_position {
                    s.x = a;
                    s.y = b;
                } else {
                    s.vx = a;
                    s.vy = b;
                }
            });
        }
        Ok(())
    }

    fn status(&self) -> &SimulationStatus {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{DatalogSolver, Solver};
    use crate::vehicle::KinematicState;

    #[test]
    fn test_one_step_integrates_force_velocity_position() {
        let space = SpaceSimulation::new("sector");
        let body = Arc::new(KinematicBody::new(
            "ship",
            KinematicState {
                vx: 1,
                vy: -2,
                fx: 3,
                ..Default::default()
            },
        ));
        space.add_body(Arc::clone(&body));

        let outcome = DatalogSolver::new().solve(&space.program()).unwrap();
        space.update(&outcome.symbols).unwrap();

        let state = body.state();
        assert_eq!((state.vx, state.vy), (4, -2));
        assert_eq!((state.x, state.y), (4, -2));
        assert_eq!(state.fx, 3);
    }

    #[test]
    fn test_empty_space_has_no_program() {
        let space = SpaceSimulation::new("void");
        assert_eq!(space.program(), "");
    }

    #[test]
    fn test_malformed_position_is_an_error() {
        let space = SpaceSimulation::new("sector");
        let bad = Symbol::function(
            "position",
            vec![Symbol::constant("ship"), Symbol::constant("left"), Symbol::Number(0)],
        );
        assert!(matches!(
            space.update(&[bad]),
            Err(SignalError::MalformedSymbol(_))
        ));
    }

    #[test]
    fn test_add_body_is_idempotent() {
        let space = SpaceSimulation::new("sector");
        let body = Arc::new(KinematicBody::new("ship", KinematicState::default()));
        space.add_body(Arc::clone(&body));
        space.add_body(Arc::clone(&body));
        assert_eq!(space.bodies().len(), 1);
        assert!(space.remove_body(body.id()));
        assert!(!space.remove_body(body.id()));
    }
}
