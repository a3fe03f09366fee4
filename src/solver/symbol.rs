//! Ground symbols returned by a solve

use serde::{Deserialize, Serialize};

/// A ground term of the logic language.
///
/// Variant order gives the total order used by comparison literals:
/// numbers < constants < strings < compound terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    Number(i64),
    Constant(String),
    Str(String),
    Function { name: String, args: Vec<Symbol> },
}

impl Symbol {
    pub fn constant(name: impl Into<String>) -> Self {
        Symbol::Constant(name.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Symbol::Str(text.into())
    }

    pub fn function(name: impl Into<String>, args: Vec<Symbol>) -> Self {
        let name = name.into();
        if args.is_empty() {
            Symbol::Constant(name)
        } else {
            Symbol::Function { name, args }
        }
    }

    /// Predicate name for constants and compound terms
    pub fn name(&self) -> Option<&str> {
        match self {
            Symbol::Constant(name) | Symbol::Function { name, .. } => Some(name),
            Symbol::Number(_) | Symbol::Str(_) => None,
        }
    }

    pub fn args(&self) -> &[Symbol] {
        match self {
            Symbol::Function { args, .. } => args,
            _ => &[],
        }
    }

    pub fn arity(&self) -> usize {
        self.args().len()
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Symbol::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Symbol::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Nesting depth; atomic symbols count as 1
    pub fn height(&self) -> usize {
        1 + self.args().iter().map(Symbol::height).max().unwrap_or(0)
    }

    /// True for `name/arity` compound terms and constants
    pub fn is_predicate(&self, name: &str, arity: usize) -> bool {
        self.name() == Some(name) && self.arity() == arity
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Number(n) => write!(f, "{}", n),
            Symbol::Constant(name) => write!(f, "{}", name),
            Symbol::Str(text) => {
                write!(f, "\"")?;
                for c in text.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            Symbol::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_fact_syntax() {
        let sym = Symbol::function(
            "body",
            vec![Symbol::constant("ship"), Symbol::Number(-3), Symbol::string("a\"b")],
        );
        assert_eq!(sym.to_string(), "body(ship,-3,\"a\\\"b\")");
    }

    #[test]
    fn test_height_counts_nesting() {
        assert_eq!(Symbol::Number(3).height(), 1);
        let nested = Symbol::function("n", vec![Symbol::function("s", vec![Symbol::constant("z")])]);
        assert_eq!(nested.height(), 3);
    }

    #[test]
    fn test_zero_arity_function_is_constant() {
        assert_eq!(Symbol::function("go", vec![]), Symbol::constant("go"));
        assert!(Symbol::constant("go").is_predicate("go", 0));
    }

    #[test]
    fn test_symbol_ordering() {
        assert!(Symbol::Number(100) < Symbol::constant("a"));
        assert!(Symbol::constant("z") < Symbol::string("a"));
        assert!(Symbol::string("z") < Symbol::function("f", vec![Symbol::Number(1)]));
    }
}
