//! Program text → rules
//!
//! Grammar accepted by the bundled solver:
//!
//! ```text
//! program    := { statement }
//! statement  := "#show" [ name "/" arity ] "." | atom [ ":-" literal { "," literal } ] "."
//! literal    := term cmp term | atom
//! term       := product { ("+" | "-") product }
//! product    := primary { ("*" | "/" | "\") primary }
//! primary    := integer | "string" | Variable | name [ "(" term { "," term } ")" ] | "(" term ")"
//! ```
//!
//! `%` starts a comment that runs to the end of the line.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{char, i64 as integer, multispace1, not_line_ending, satisfy, u32 as natural};
use nom::combinator::{map, opt, recognize, value};
use nom::error::{Error as NomError, ErrorKind};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded};
use nom::{IResult, Parser};

use crate::solver::SolveError;

type PResult<'a, T> = IResult<&'a str, T>;

/// Deepest term the parser accepts, counting both bracket nesting and
/// arithmetic chains
pub const MAX_TERM_DEPTH: usize = 128;

/// Arithmetic operators usable inside terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Comparison operators usable as body literals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A possibly non-ground term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Number(i64),
    Constant(String),
    Str(String),
    Var(String),
    Function { name: String, args: Vec<Term> },
    BinOp {
        op: ArithOp,
        left: Box<Term>,
        right: Box<Term>,
    },
}

impl Term {
    fn binary(op: ArithOp, left: Term, right: Term) -> Self {
        Term::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `_` matches anything and never binds
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Term::Var(v) if v == "_")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub name: String,
    pub args: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Atom(Atom),
    Compare { op: CmpOp, left: Term, right: Term },
}

/// `head :- body.`; facts have an empty body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub head: Atom,
    pub body: Vec<Literal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    Rule(Rule),
    Show(Option<(String, usize)>),
}

/// Parsed form of a whole program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedProgram {
    pub rules: Vec<Rule>,
    /// `#show name/arity.` signatures
    pub shows: Vec<(String, usize)>,
    /// Set by a bare `#show.`
    pub hide_all: bool,
}

impl ParsedProgram {
    /// Whether a derived atom is part of the reported model
    pub fn is_shown(&self, name: &str, arity: usize) -> bool {
        if self.shows.is_empty() && !self.hide_all {
            return true;
        }
        self.shows.iter().any(|(n, a)| n == name && *a == arity)
    }
}

/// Parse a complete program
pub fn parse_program(source: &str) -> Result<ParsedProgram, SolveError> {
    let mut program = ParsedProgram::default();
    let mut rest = source;

    loop {
        let (after_ws, _) = ws(rest).map_err(|e| error_at(source, e))?;
        if after_ws.is_empty() {
            break;
        }

        let (after, statement) = alt((show_directive, rule))
            .parse(after_ws)
            .map_err(|e| error_at(source, e))?;

        match statement {
            Statement::Rule(rule) => program.rules.push(rule),
            Statement::Show(Some(signature)) => program.shows.push(signature),
            Statement::Show(None) => program.hide_all = true,
        }
        rest = after;
    }

    Ok(program)
}

fn error_at(source: &str, err: nom::Err<NomError<&str>>) -> SolveError {
    let (remaining, code) = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => (e.input, e.code),
        nom::Err::Incomplete(_) => ("", ErrorKind::Eof),
    };
    let offset = source.len() - remaining.len();
    let line = source[..offset].matches('\n').count() + 1;

    if code == ErrorKind::TooLarge {
        return SolveError::Syntax {
            line,
            message: format!("term nested deeper than {} levels", MAX_TERM_DEPTH),
        };
    }

    let snippet: String = remaining
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .take(24)
        .collect();
    let message = if snippet.is_empty() {
        "unexpected EOF".to_string()
    } else {
        format!("unexpected \"{}\"", snippet)
    };

    SolveError::Syntax { line, message }
}

// === LEXICAL ===

fn comment(input: &str) -> PResult<'_, ()> {
    value((), pair(char('%'), not_line_ending)).parse(input)
}

fn ws(input: &str) -> PResult<'_, ()> {
    value((), many0(alt((value((), multispace1), comment)))).parse(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn name(input: &str) -> PResult<'_, String> {
    map(
        recognize(pair(satisfy(|c| c.is_ascii_lowercase()), take_while(is_ident_char))),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

fn variable(input: &str) -> PResult<'_, String> {
    map(
        recognize(pair(
            satisfy(|c| c.is_ascii_uppercase() || c == '_'),
            take_while(is_ident_char),
        )),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

fn string_literal(input: &str) -> PResult<'_, String> {
    let (mut rest, _) = char('"').parse(input)?;
    let mut out = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None => return Err(nom::Err::Error(NomError::new(rest, ErrorKind::Char))),
            Some('"') => return Ok((chars.as_str(), out)),
            Some('\\') => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(c) => out.push(c),
                None => return Err(nom::Err::Error(NomError::new(rest, ErrorKind::Char))),
            },
            Some(c) => out.push(c),
        }
        rest = chars.as_str();
    }
}

// === TERMS ===
//
// Term parsers carry the bracket nesting level they were entered at and
// return the height of the tree they built. Both are capped at
// `MAX_TERM_DEPTH`, so neither parsing nor evaluation recurses without bound.

fn too_deep(input: &str) -> nom::Err<NomError<&str>> {
    nom::Err::Failure(NomError::new(input, ErrorKind::TooLarge))
}

fn arguments(input: &str, nesting: usize) -> PResult<'_, (Vec<Term>, usize)> {
    if nesting > MAX_TERM_DEPTH {
        return Err(too_deep(input));
    }
    let (rest, args) = delimited(
        char('('),
        separated_list1(preceded(ws, char(',')), |i| sized_term(i, nesting + 1)),
        preceded(ws, char(')')),
    )
    .parse(input)?;

    let height = args.iter().map(|(_, h)| *h).max().unwrap_or(0);
    Ok((rest, (args.into_iter().map(|(t, _)| t).collect(), height)))
}

fn function_term(input: &str, nesting: usize) -> PResult<'_, (Term, usize)> {
    let (rest, name) = name(input)?;
    let (rest, args) = opt(|i| arguments(i, nesting)).parse(rest)?;
    match args {
        Some((_, height)) if height >= MAX_TERM_DEPTH => Err(too_deep(input)),
        Some((args, height)) => Ok((rest, (Term::Function { name, args }, height + 1))),
        None => Ok((rest, (Term::Constant(name), 1))),
    }
}

fn primary(input: &str, nesting: usize) -> PResult<'_, (Term, usize)> {
    if nesting > MAX_TERM_DEPTH {
        return Err(too_deep(input));
    }
    preceded(
        ws,
        alt((
            map(integer, |n| (Term::Number(n), 1)),
            map(string_literal, |s| (Term::Str(s), 1)),
            map(variable, |v| (Term::Var(v), 1)),
            |i| function_term(i, nesting),
            delimited(char('('), |i| sized_term(i, nesting + 1), preceded(ws, char(')'))),
        )),
    )
    .parse(input)
}

/// Fold one more operand into a left-associative chain
fn combine(
    input: &str,
    op: ArithOp,
    (left, left_height): (Term, usize),
    (right, right_height): (Term, usize),
) -> Result<(Term, usize), nom::Err<NomError<&str>>> {
    let height = left_height.max(right_height) + 1;
    if height > MAX_TERM_DEPTH {
        return Err(too_deep(input));
    }
    Ok((Term::binary(op, left, right), height))
}

fn product(input: &str, nesting: usize) -> PResult<'_, (Term, usize)> {
    let (mut rest, mut left) = primary(input, nesting)?;
    loop {
        let op = alt((
            value(ArithOp::Mul, char('*')),
            value(ArithOp::Div, char('/')),
            value(ArithOp::Mod, char('\\')),
        ));
        match preceded(ws, op).parse(rest) {
            Ok((after, op)) => {
                let (after, right) = primary(after, nesting)?;
                left = combine(rest, op, left, right)?;
                rest = after;
            }
            Err(nom::Err::Error(_)) => return Ok((rest, left)),
            Err(e) => return Err(e),
        }
    }
}

fn sized_term(input: &str, nesting: usize) -> PResult<'_, (Term, usize)> {
    let (mut rest, mut left) = product(input, nesting)?;
    loop {
        let op = alt((value(ArithOp::Add, char('+')), value(ArithOp::Sub, char('-'))));
        match preceded(ws, op).parse(rest) {
            Ok((after, op)) => {
                let (after, right) = product(after, nesting)?;
                left = combine(rest, op, left, right)?;
                rest = after;
            }
            Err(nom::Err::Error(_)) => return Ok((rest, left)),
            Err(e) => return Err(e),
        }
    }
}

/// Additive expression; the entry point for any term position
pub fn term(input: &str) -> PResult<'_, Term> {
    map(|i| sized_term(i, 0), |(t, _)| t).parse(input)
}

// === LITERALS & STATEMENTS ===

fn atom(input: &str) -> PResult<'_, Atom> {
    let (rest, _) = ws(input)?;
    let (rest, name) = name(rest)?;
    let (rest, args) = opt(|i| arguments(i, 0)).parse(rest)?;
    Ok((
        rest,
        Atom {
            name,
            args: args.map(|(args, _)| args).unwrap_or_default(),
        },
    ))
}

fn cmp_op(input: &str) -> PResult<'_, CmpOp> {
    alt((
        value(CmpOp::Ne, tag("!=")),
        value(CmpOp::Le, tag("<=")),
        value(CmpOp::Ge, tag(">=")),
        value(CmpOp::Eq, tag("==")),
        value(CmpOp::Eq, tag("=")),
        value(CmpOp::Lt, tag("<")),
        value(CmpOp::Gt, tag(">")),
    ))
    .parse(input)
}

fn comparison(input: &str) -> PResult<'_, Literal> {
    let (rest, left) = term(input)?;
    let (rest, op) = preceded(ws, cmp_op).parse(rest)?;
    let (rest, right) = term(rest)?;
    Ok((rest, Literal::Compare { op, left, right }))
}

fn literal(input: &str) -> PResult<'_, Literal> {
    alt((comparison, map(atom, Literal::Atom))).parse(input)
}

fn rule(input: &str) -> PResult<'_, Statement> {
    let (rest, head) = atom(input)?;
    let (rest, body) = opt(preceded(
        preceded(ws, tag(":-")),
        separated_list1(preceded(ws, char(',')), literal),
    ))
    .parse(rest)?;
    let (rest, _) = preceded(ws, char('.')).parse(rest)?;
    Ok((
        rest,
        Statement::Rule(Rule {
            head,
            body: body.unwrap_or_default(),
        }),
    ))
}

fn show_directive(input: &str) -> PResult<'_, Statement> {
    let (rest, _) = tag("#show").parse(input)?;
    let (rest, signature) = opt(pair(
        preceded(ws, name),
        preceded(preceded(ws, char('/')), preceded(ws, natural)),
    ))
    .parse(rest)?;
    let (rest, _) = preceded(ws, char('.')).parse(rest)?;
    Ok((
        rest,
        Statement::Show(signature.map(|(name, arity)| (name, arity as usize))),
    ))
}

// === DISPLAY ===

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Number(n) => write!(f, "{}", n),
            Term::Constant(name) | Term::Var(name) => write!(f, "{}", name),
            Term::Str(text) => write!(f, "{:?}", text),
            Term::Function { name, args } => {
                write!(f, "{}(", name)?;
                write_joined(f, args)?;
                write!(f, ")")
            }
            Term::BinOp { op, left, right } => {
                let symbol = match op {
                    ArithOp::Add => "+",
                    ArithOp::Sub => "-",
                    ArithOp::Mul => "*",
                    ArithOp::Div => "/",
                    ArithOp::Mod => "\\",
                };
                write!(f, "({}{}{})", left, symbol, right)
            }
        }
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            write_joined(f, &self.args)?;
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Atom(atom) => write!(f, "{}", atom),
            Literal::Compare { op, left, right } => {
                let symbol = match op {
                    CmpOp::Eq => "=",
                    CmpOp::Ne => "!=",
                    CmpOp::Lt => "<",
                    CmpOp::Le => "<=",
                    CmpOp::Gt => ">",
                    CmpOp::Ge => ">=",
                };
                write!(f, "{}{}{}", left, symbol, right)
            }
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.body.is_empty() {
            write!(f, " :- ")?;
            write_joined(f, &self.body)?;
        }
        write!(f, ".")
    }
}

fn write_joined<T: std::fmt::Display>(f: &mut std::fmt::Formatter<'_>, items: &[T]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}
