//! `command("...")` extraction from a solved model

use crate::solver::Symbol;

/// Command text if the symbol is exactly `command("<text>")`
pub fn extract_command(symbol: &Symbol) -> Option<&str> {
    if !symbol.is_predicate("command", 1) {
        return None;
    }
    symbol.args().first().and_then(Symbol::as_str)
}

/// Every command in a model, in model order
pub fn extract_commands(symbols: &[Symbol]) -> Vec<&str> {
    symbols.iter().filter_map(extract_command).collect()
}
