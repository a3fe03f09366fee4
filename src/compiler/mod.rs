//! Program compiler - assembles the text a core hands to the solver
//!
//! Section order is fixed: timestamp, registry, sensors, running programs.
//! Each section starts with a `%` comment header and sections are separated
//! by a blank line. Nothing is validated here; the solver reports bad text.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::program::Program;
use crate::registry::Registry;
use crate::sensor::FactSource;

/// Seconds since the Unix epoch, used for the `time/1` fact
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Build the full program text for one core
pub fn compile_program(
    timestamp: u64,
    registry: &Registry,
    sensors: &[Arc<dyn FactSource>],
    programs: &[&Program],
) -> String {
    let mut sections = Vec::with_capacity(4);

    sections.push(format!("% Current time\ntime({}).", timestamp));

    let mut registry_section = String::from("% Registry");
    let registry_facts = registry.compile();
    if !registry_facts.is_empty() {
        registry_section.push('\n');
        registry_section.push_str(&registry_facts);
    }
    sections.push(registry_section);

    let mut sensor_section = String::from("% Sensors");
    for fact in sensors.iter().filter_map(|s| s.to_fact()) {
        if fact.trim().is_empty() {
            continue;
        }
        sensor_section.push('\n');
        sensor_section.push_str(fact.trim_end());
    }
    sections.push(sensor_section);

    let mut program_section = String::from("% Programs");
    for program in programs {
        program_section.push_str(&format!("\n% program: {}", program.name));
        if let Some(body) = program.to_fact() {
            program_section.push('\n');
            program_section.push_str(body.trim_end());
        }
    }
    sections.push(program_section);

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::StaticFacts;

    #[test]
    fn test_section_order_and_headers() {
        let mut registry = Registry::new();
        registry.set(0, Some("mode(cruise).".into())).unwrap();
        let sensors: Vec<Arc<dyn FactSource>> = vec![
            Arc::new(StaticFacts("beacon(a).".into())),
            Arc::new(StaticFacts(String::new())),
            Arc::new(StaticFacts("beacon(b).".into())),
        ];
        let nav = Program::with_content("nav", "go :- beacon(a).");

        let text = compile_program(42, &registry, &sensors, &[&nav]);
        assert_eq!(
            text,
            "% Current time\ntime(42).\n\n\
             % Registry\nmode(cruise).\n\n\
             % Sensors\nbeacon(a).\nbeacon(b).\n\n\
             % Programs\n% program: nav\ngo :- beacon(a)."
        );
    }

    #[test]
    fn test_empty_sections_keep_headers() {
        let text = compile_program(7, &Registry::new(), &[], &[]);
        assert_eq!(
            text,
            "% Current time\ntime(7).\n\n% Registry\n\n% Sensors\n\n% Programs"
        );
    }

    #[test]
    fn test_compiled_text_solves() {
        use crate::solver::{DatalogSolver, Solver};

        let program = Program::with_content("p", "late :- time(T), T > 100.\n#show late/0.");
        let text = compile_program(500, &Registry::new(), &[], &[&program]);
        let outcome = DatalogSolver::new().solve(&text).unwrap();
        assert_eq!(outcome.symbols.len(), 1);
        assert!(outcome.symbols[0].is_predicate("late", 0));
    }
}
