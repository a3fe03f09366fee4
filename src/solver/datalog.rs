//! Bundled bottom-up solver
//!
//! Positive programs have exactly one model, so "first model" is the least
//! fixpoint of the rules. Evaluation is naive: every round re-matches every
//! rule against everything derived so far, until a round adds nothing.

use ahash::{AHashMap, AHashSet};

use crate::solver::parser::{
    parse_program, ArithOp, Atom, CmpOp, Literal, ParsedProgram, Rule, Term, MAX_TERM_DEPTH,
};
use crate::solver::{CancelFlag, Diagnostic, SolveError, SolveOutcome, Solver, Symbol};

/// Upper bound on derived atoms before grounding gives up
pub const DEFAULT_ATOM_LIMIT: usize = 100_000;

type Bindings = AHashMap<String, Symbol>;

/// Stateless Datalog-with-arithmetic solver
#[derive(Debug, Clone)]
pub struct DatalogSolver {
    atom_limit: usize,
}

impl Default for DatalogSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DatalogSolver {
    pub fn new() -> Self {
        Self {
            atom_limit: DEFAULT_ATOM_LIMIT,
        }
    }

    pub fn with_atom_limit(atom_limit: usize) -> Self {
        Self { atom_limit }
    }
}

impl Solver for DatalogSolver {
    fn solve(&self, program: &str) -> Result<SolveOutcome, SolveError> {
        self.solve_with_cancel(program, &CancelFlag::new())
    }

    fn solve_with_cancel(&self, program: &str, cancel: &CancelFlag) -> Result<SolveOutcome, SolveError> {
        let parsed = parse_program(program)?;
        let plans = plan_rules(&parsed.rules)?;
        let mut diagnostics = undefined_predicates(&parsed);
        diagnostics.extend(unmatched_shows(&parsed));

        let store = evaluate(&plans, self.atom_limit, cancel)?;
        let symbols = store
            .order
            .into_iter()
            .filter(|sym| {
                sym.name()
                    .map(|name| parsed.is_shown(name, sym.arity()))
                    .unwrap_or(false)
            })
            .collect();

        Ok(SolveOutcome {
            symbols,
            diagnostics,
        })
    }
}

// === FACT STORE ===

#[derive(Default)]
struct FactStore {
    order: Vec<Symbol>,
    seen: AHashSet<Symbol>,
    by_predicate: AHashMap<(String, usize), Vec<usize>>,
}

impl FactStore {
    fn insert(&mut self, sym: Symbol) -> bool {
        if self.seen.contains(&sym) {
            return false;
        }
        let key = (sym.name().unwrap_or_default().to_string(), sym.arity());
        self.by_predicate.entry(key).or_default().push(self.order.len());
        self.seen.insert(sym.clone());
        self.order.push(sym);
        true
    }

    fn contains(&self, sym: &Symbol) -> bool {
        self.seen.contains(sym)
    }

    fn candidates<'a>(&'a self, name: &str, arity: usize) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.by_predicate
            .get(&(name.to_string(), arity))
            .into_iter()
            .flatten()
            .map(move |&i| &self.order[i])
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

// === PLANNING & SAFETY ===

/// A rule with its body reordered so every comparison runs once its inputs are bound
struct Plan<'a> {
    head: &'a Atom,
    body: Vec<&'a Literal>,
}

fn collect_vars(term: &Term, out: &mut Vec<String>) {
    match term {
        Term::Var(v) if v != "_" => out.push(v.clone()),
        Term::Function { args, .. } => args.iter().for_each(|a| collect_vars(a, out)),
        Term::BinOp { left, right, .. } => {
            collect_vars(left, out);
            collect_vars(right, out);
        }
        _ => {}
    }
}

/// Variables an atom argument binds by unification (not inside arithmetic)
fn binding_vars(term: &Term, out: &mut Vec<String>) {
    match term {
        Term::Var(v) if v != "_" => out.push(v.clone()),
        Term::Function { args, .. } => args.iter().for_each(|a| binding_vars(a, out)),
        _ => {}
    }
}

/// Variables that must already be bound before an atom argument can be matched
fn required_vars(term: &Term, out: &mut Vec<String>) {
    match term {
        Term::Function { args, .. } => args.iter().for_each(|a| required_vars(a, out)),
        Term::BinOp { .. } => collect_vars(term, out),
        _ => {}
    }
}

fn unbound_var<'a>(term: &'a Term, bound: &AHashSet<String>) -> Option<&'a str> {
    match term {
        Term::Var(v) if v != "_" && !bound.contains(v) => Some(v),
        _ => None,
    }
}

/// Returns the variables a literal binds if it can run now, `None` if it must wait
fn ready(literal: &Literal, bound: &AHashSet<String>) -> Option<Vec<String>> {
    match literal {
        Literal::Atom(atom) => {
            let mut required = Vec::new();
            atom.args.iter().for_each(|a| required_vars(a, &mut required));
            if required.iter().any(|v| !bound.contains(v)) {
                return None;
            }
            let mut binds = Vec::new();
            atom.args.iter().for_each(|a| binding_vars(a, &mut binds));
            Some(binds)
        }
        Literal::Compare { op, left, right } => {
            let all_bound = |term: &Term| {
                let mut vars = Vec::new();
                collect_vars(term, &mut vars);
                vars.iter().all(|v| bound.contains(v))
            };
            if all_bound(left) && all_bound(right) {
                return Some(Vec::new());
            }
            if *op == CmpOp::Eq {
                if let Some(v) = unbound_var(left, bound) {
                    if all_bound(right) {
                        return Some(vec![v.to_string()]);
                    }
                }
                if let Some(v) = unbound_var(right, bound) {
                    if all_bound(left) {
                        return Some(vec![v.to_string()]);
                    }
                }
            }
            None
        }
    }
}

fn unsafe_error(rule: &Rule, vars: Vec<String>, bound: &AHashSet<String>) -> SolveError {
    let variable = vars
        .into_iter()
        .find(|v| !bound.contains(v))
        .unwrap_or_else(|| "_".to_string());
    SolveError::Unsafe {
        variable,
        statement: rule.to_string(),
    }
}

fn plan_rule(rule: &Rule) -> Result<Plan<'_>, SolveError> {
    let mut bound: AHashSet<String> = AHashSet::new();
    let mut remaining: Vec<&Literal> = rule.body.iter().collect();
    let mut body = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .enumerate()
            .find_map(|(i, lit)| ready(lit, &bound).map(|binds| (i, binds)));

        match next {
            Some((i, binds)) => {
                bound.extend(binds);
                body.push(remaining.remove(i));
            }
            None => {
                let mut vars = Vec::new();
                for lit in &remaining {
                    match lit {
                        Literal::Atom(atom) => atom.args.iter().for_each(|a| collect_vars(a, &mut vars)),
                        Literal::Compare { left, right, .. } => {
                            collect_vars(left, &mut vars);
                            collect_vars(right, &mut vars);
                        }
                    }
                }
                return Err(unsafe_error(rule, vars, &bound));
            }
        }
    }

    let mut head_vars = Vec::new();
    rule.head.args.iter().for_each(|a| collect_vars(a, &mut head_vars));
    if head_vars.iter().any(|v| !bound.contains(v)) {
        return Err(unsafe_error(rule, head_vars, &bound));
    }

    Ok(Plan {
        head: &rule.head,
        body,
    })
}

fn plan_rules(rules: &[Rule]) -> Result<Vec<Plan<'_>>, SolveError> {
    rules.iter().map(plan_rule).collect()
}

/// Body atoms whose predicate no rule can ever derive
fn undefined_predicates(program: &ParsedProgram) -> Vec<Diagnostic> {
    let heads: AHashSet<(&str, usize)> = program
        .rules
        .iter()
        .map(|r| (r.head.name.as_str(), r.head.args.len()))
        .collect();

    let mut reported: AHashSet<(&str, usize)> = AHashSet::new();
    let mut diagnostics = Vec::new();
    for rule in &program.rules {
        for lit in &rule.body {
            if let Literal::Atom(atom) = lit {
                let key = (atom.name.as_str(), atom.args.len());
                if !heads.contains(&key) && reported.insert(key) {
                    diagnostics.push(Diagnostic::info(format!(
                        "atom does not occur in any rule head: {}/{}",
                        key.0, key.1
                    )));
                }
            }
        }
    }
    diagnostics
}

/// `#show` signatures that no rule head can produce
fn unmatched_shows(program: &ParsedProgram) -> Vec<Diagnostic> {
    program
        .shows
        .iter()
        .filter(|(name, arity)| {
            !program
                .rules
                .iter()
                .any(|r| r.head.name == *name && r.head.args.len() == *arity)
        })
        .map(|(name, arity)| {
            Diagnostic::warning(format!("no atoms over signature occur in program: {}/{}", name, arity))
        })
        .collect()
}

// === EVALUATION ===

fn eval(term: &Term, bindings: &Bindings) -> Option<Symbol> {
    match term {
        Term::Number(n) => Some(Symbol::Number(*n)),
        Term::Constant(name) => Some(Symbol::Constant(name.clone())),
        Term::Str(text) => Some(Symbol::Str(text.clone())),
        Term::Var(v) => bindings.get(v).cloned(),
        Term::Function { name, args } => {
            let args = args.iter().map(|a| eval(a, bindings)).collect::<Option<Vec<_>>>()?;
            Some(Symbol::function(name.clone(), args))
        }
        Term::BinOp { op, left, right } => {
            let l = eval(left, bindings)?.as_number()?;
            let r = eval(right, bindings)?.as_number()?;
            let value = match op {
                ArithOp::Add => l.checked_add(r),
                ArithOp::Sub => l.checked_sub(r),
                ArithOp::Mul => l.checked_mul(r),
                ArithOp::Div => l.checked_div(r),
                ArithOp::Mod => l.checked_rem(r),
            }?;
            Some(Symbol::Number(value))
        }
    }
}

fn unify(term: &Term, sym: &Symbol, bindings: &mut Bindings) -> bool {
    match term {
        Term::Var(v) if v == "_" => true,
        Term::Var(v) => match bindings.get(v) {
            Some(bound) => bound == sym,
            None => {
                bindings.insert(v.clone(), sym.clone());
                true
            }
        },
        Term::Number(n) => *sym == Symbol::Number(*n),
        Term::Constant(name) => matches!(sym, Symbol::Constant(s) if s == name),
        Term::Str(text) => matches!(sym, Symbol::Str(s) if s == text),
        Term::Function { name, args } => {
            sym.is_predicate(name, args.len())
                && args.iter().zip(sym.args()).all(|(t, s)| unify(t, s, bindings))
        }
        Term::BinOp { .. } => eval(term, bindings).map_or(false, |value| value == *sym),
    }
}

fn compare(op: CmpOp, left: &Term, right: &Term, bindings: &Bindings) -> Option<Bindings> {
    if op == CmpOp::Eq {
        for (target, source) in [(left, right), (right, left)] {
            if let Term::Var(v) = target {
                if v != "_" && !bindings.contains_key(v) {
                    let value = eval(source, bindings)?;
                    let mut extended = bindings.clone();
                    extended.insert(v.clone(), value);
                    return Some(extended);
                }
            }
        }
    }

    let l = eval(left, bindings)?;
    let r = eval(right, bindings)?;
    let holds = match op {
        CmpOp::Eq => l == r,
        CmpOp::Ne => l != r,
        CmpOp::Lt => l < r,
        CmpOp::Le => l <= r,
        CmpOp::Gt => l > r,
        CmpOp::Ge => l >= r,
    };
    holds.then(|| bindings.clone())
}

/// Search steps between two looks at the cancel flag
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Limits one evaluation runs under
struct Budget<'a> {
    atom_limit: usize,
    cancel: &'a CancelFlag,
    steps: usize,
}

impl Budget<'_> {
    fn check_cancel(&self) -> Result<(), SolveError> {
        if self.cancel.is_cancelled() {
            return Err(SolveError::Aborted("solve cancelled".to_string()));
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), SolveError> {
        self.steps += 1;
        if self.steps % CANCEL_CHECK_INTERVAL == 0 {
            self.check_cancel()?;
        }
        Ok(())
    }
}

fn ground_head(head: &Atom, bindings: &Bindings) -> Result<Option<Symbol>, SolveError> {
    let Some(args) = head.args.iter().map(|a| eval(a, bindings)).collect::<Option<Vec<_>>>() else {
        return Ok(None);
    };
    let sym = Symbol::function(head.name.clone(), args);
    if sym.height() > MAX_TERM_DEPTH {
        return Err(SolveError::Aborted(format!(
            "derived {}/{} term nested deeper than {} levels",
            head.name,
            head.args.len(),
            MAX_TERM_DEPTH
        )));
    }
    Ok(Some(sym))
}

/// Match one rule body depth-first, pushing each new head atom onto `derived`.
///
/// Stops with [`SolveError::AtomLimit`] as soon as the store plus the heads
/// found so far would exceed the budget.
fn derive_rule(
    plan: &Plan<'_>,
    store: &FactStore,
    derived: &mut Vec<Symbol>,
    pending: &mut AHashSet<Symbol>,
    budget: &mut Budget<'_>,
) -> Result<(), SolveError> {
    let mut stack: Vec<(usize, Bindings)> = vec![(0, Bindings::new())];

    while let Some((index, bindings)) = stack.pop() {
        budget.step()?;

        let Some(literal) = plan.body.get(index) else {
            if let Some(head) = ground_head(plan.head, &bindings)? {
                if !store.contains(&head) && pending.insert(head.clone()) {
                    derived.push(head);
                    if store.len() + derived.len() > budget.atom_limit {
                        return Err(SolveError::AtomLimit(budget.atom_limit));
                    }
                }
            }
            continue;
        };

        match literal {
            Literal::Atom(atom) => {
                let mut extensions = Vec::new();
                for fact in store.candidates(&atom.name, atom.args.len()) {
                    let mut extended = bindings.clone();
                    let matched = atom
                        .args
                        .iter()
                        .zip(fact.args())
                        .all(|(t, s)| unify(t, s, &mut extended));
                    if matched {
                        extensions.push((index + 1, extended));
                    }
                }
                // Reversed so facts are explored in store order
                stack.extend(extensions.into_iter().rev());
            }
            Literal::Compare { op, left, right } => {
                if let Some(extended) = compare(*op, left, right, &bindings) {
                    stack.push((index + 1, extended));
                }
            }
        }
    }
    Ok(())
}

fn evaluate(plans: &[Plan<'_>], atom_limit: usize, cancel: &CancelFlag) -> Result<FactStore, SolveError> {
    let mut store = FactStore::default();
    let mut budget = Budget {
        atom_limit,
        cancel,
        steps: 0,
    };

    loop {
        budget.check_cancel()?;

        let mut derived = Vec::new();
        let mut pending = AHashSet::new();
        for plan in plans {
            derive_rule(plan, &store, &mut derived, &mut pending, &mut budget)?;
        }

        if derived.is_empty() {
            return Ok(store);
        }
        for sym in derived {
            store.insert(sym);
        }
    }
}
