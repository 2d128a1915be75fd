//! The tagged expression tree, its constructors, and both pretty printers.

use crate::errors::CausalError;
use crate::expression::literal::Literal;
use crate::symbols::event::{EqualityEvent, InterventionEvent};
use crate::symbols::value::Value;
use crate::symbols::variable::Variable;

use rand::prelude::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fmt;
use std::ops;

/// One item to the left of the conditioning bar of a probability: a bare
/// variable or a variable pinned to a value.
#[derive(Clone, Debug, PartialEq)]
pub enum PVar {
    Var(Variable),
    Event(EqualityEvent),
}

impl PVar {
    pub fn var(&self) -> &Variable {
        match self {
            PVar::Var(var) => var,
            PVar::Event(event) => &event.var,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            PVar::Var(_) => None,
            PVar::Event(event) => Some(&event.val),
        }
    }

    pub fn to_latex(&self) -> String {
        match self {
            PVar::Var(var) => var.to_latex(),
            PVar::Event(event) => event.to_latex(),
        }
    }
}

impl From<Variable> for PVar {
    fn from(var: Variable) -> Self {
        PVar::Var(var)
    }
}

impl From<EqualityEvent> for PVar {
    fn from(event: EqualityEvent) -> Self {
        PVar::Event(event)
    }
}

impl fmt::Display for PVar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PVar::Var(var) => write!(f, "{var}"),
            PVar::Event(event) => write!(f, "{event}"),
        }
    }
}

/// One item behind the conditioning bar of a probability: a bare variable,
/// an equality event, or an intervention.
#[derive(Clone, Debug, PartialEq)]
pub enum PGiven {
    Var(Variable),
    Event(EqualityEvent),
    Do(InterventionEvent),
}

impl PGiven {
    pub fn var(&self) -> &Variable {
        match self {
            PGiven::Var(var) => var,
            PGiven::Event(event) => &event.var,
            PGiven::Do(event) => event.var(),
        }
    }

    /// Intervene on a bare variable.
    pub fn do_var(var: Variable) -> PGiven {
        PGiven::Do(InterventionEvent::on_var(var))
    }

    /// Intervene on a variable, forcing it to a value.
    pub fn do_value(var: Variable, val: impl Into<Value>) -> PGiven {
        PGiven::Do(InterventionEvent::on_event(EqualityEvent::new(var, val)))
    }

    pub fn to_latex(&self) -> String {
        match self {
            PGiven::Var(var) => var.to_latex(),
            PGiven::Event(event) => event.to_latex(),
            PGiven::Do(event) => event.to_latex(),
        }
    }
}

impl From<Variable> for PGiven {
    fn from(var: Variable) -> Self {
        PGiven::Var(var)
    }
}

impl From<EqualityEvent> for PGiven {
    fn from(event: EqualityEvent) -> Self {
        PGiven::Event(event)
    }
}

impl From<InterventionEvent> for PGiven {
    fn from(event: InterventionEvent) -> Self {
        PGiven::Do(event)
    }
}

impl fmt::Display for PGiven {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PGiven::Var(var) => write!(f, "{var}"),
            PGiven::Event(event) => write!(f, "{event}"),
            PGiven::Do(event) => write!(f, "{event}"),
        }
    }
}

/// A probability term `P(vars | given)`, possibly conditional and possibly
/// carrying interventions behind the bar.
///
/// No variable may occur twice across `vars` and `given` combined; a bare
/// variable and an event bound to it count as the same occurrence.
#[derive(Clone, Debug, PartialEq)]
pub struct Probability {
    pub vars: Vec<PVar>,
    pub given: Vec<PGiven>,
}

impl Probability {
    /// Create a probability term, rejecting duplicate variables and
    /// interventions on the left of the bar (those are unrepresentable here
    /// by construction of [PVar]).
    pub fn new(vars: Vec<PVar>, given: Vec<PGiven>) -> Result<Probability, CausalError> {
        let mut seen: Vec<&Variable> = Vec::new();
        for var in vars.iter().map(PVar::var).chain(given.iter().map(PGiven::var)) {
            if seen.contains(&var) {
                return Err(CausalError::TypeMismatch(format!(
                    "duplicate variable {var} in probability term"
                )));
            }
            seen.push(var);
        }
        Ok(Probability { vars, given })
    }

    /// Map from measured variables to their assigned values, `None` when open.
    pub fn measured(&self) -> BTreeMap<Variable, Option<Value>> {
        self.vars
            .iter()
            .map(|item| (item.var().clone(), item.value().cloned()))
            .collect()
    }

    /// Map from intervened variables to their forced values, `None` when open.
    pub fn intervened(&self) -> BTreeMap<Variable, Option<Value>> {
        self.given
            .iter()
            .filter_map(|item| match item {
                PGiven::Do(event) => Some((event.var().clone(), event.value().cloned())),
                _ => None,
            })
            .collect()
    }

    /// Map from plainly conditioned variables to their values, `None` when open.
    pub fn conditioned(&self) -> BTreeMap<Variable, Option<Value>> {
        self.given
            .iter()
            .filter_map(|item| match item {
                PGiven::Var(var) => Some((var.clone(), None)),
                PGiven::Event(event) => Some((event.var.clone(), Some(event.val.clone()))),
                PGiven::Do(_) => None,
            })
            .collect()
    }

    pub fn has_interventions(&self) -> bool {
        self.given.iter().any(|item| matches!(item, PGiven::Do(_)))
    }

    /// Bind `var` to `val` wherever it occurs in this term. Open occurrences
    /// become equality events, open interventions become pinned interventions.
    /// Conflicting bindings are contradictions; re-binding the same value is
    /// a no-op.
    pub(crate) fn assign(&self, var: &Variable, val: &Value) -> Result<Probability, CausalError> {
        let mut vars = Vec::with_capacity(self.vars.len());
        for item in &self.vars {
            match item {
                PVar::Var(v) if v == var => {
                    vars.push(PVar::Event(EqualityEvent::new(v.clone(), val.clone())));
                }
                PVar::Event(event) if &event.var == var && &event.val != val => {
                    return Err(CausalError::Contradiction(format!(
                        "cannot set {var} to {val}, it is already constrained by {event}"
                    )));
                }
                other => vars.push(other.clone()),
            }
        }

        let mut given = Vec::with_capacity(self.given.len());
        for item in &self.given {
            match item {
                PGiven::Var(v) if v == var => {
                    given.push(PGiven::Event(EqualityEvent::new(v.clone(), val.clone())));
                }
                PGiven::Event(event) if &event.var == var && &event.val != val => {
                    return Err(CausalError::Contradiction(format!(
                        "cannot set {var} to {val}, it is already constrained by {event}"
                    )));
                }
                PGiven::Do(event) if event.var() == var => {
                    given.push(PGiven::Do(event.assign(val)?));
                }
                other => given.push(other.clone()),
            }
        }

        Ok(Probability { vars, given })
    }

    /// Wrap every occurrence of `var` behind the conditioning bar in the
    /// do-operator.
    pub(crate) fn intervene(&self, var: &Variable) -> Probability {
        let given = self
            .given
            .iter()
            .map(|item| match item {
                PGiven::Var(v) if v == var => PGiven::do_var(v.clone()),
                PGiven::Event(event) if &event.var == var => {
                    PGiven::Do(InterventionEvent::on_event(event.clone()))
                }
                other => other.clone(),
            })
            .collect();
        Probability {
            vars: self.vars.clone(),
            given,
        }
    }

    pub fn to_latex(&self) -> String {
        let vars: Vec<String> = self.vars.iter().map(PVar::to_latex).collect();
        let given: Vec<String> = self.given.iter().map(PGiven::to_latex).collect();
        if vars.is_empty() {
            return "1".to_string();
        }
        if given.is_empty() {
            format!("P({})", vars.join(", "))
        } else {
            format!("P({} \\mid {})", vars.join(", "), given.join(", "))
        }
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let vars: Vec<String> = self.vars.iter().map(|item| item.to_string()).collect();
        let given: Vec<String> = self.given.iter().map(|item| item.to_string()).collect();
        if vars.is_empty() {
            return write!(f, "1");
        }
        if given.is_empty() {
            write!(f, "P({})", vars.join(", "))
        } else {
            write!(f, "P({} | {})", vars.join(", "), given.join(", "))
        }
    }
}

/// Enum of possible node types in an expression tree.
///
/// In particular, a node can be:
///     - A probability term (the only kind of leaf carrying variables).
///     - A product, quotient, or difference of sub-expressions.
///     - A marginal sum or an expectation, both of which bind their variables
///       and shadow them from outer substitutions.
///     - The sentinel recording that identification failed.
///     - An opaque named literal used for displaying estimands.
#[derive(Clone, Debug)]
pub enum Expr {
    P(Probability),
    Product(Vec<Expr>),
    Quotient(Box<Expr>, Box<Expr>),
    Difference(Box<Expr>, Box<Expr>),
    Marginal(Vec<Variable>, Box<Expr>),
    Expectation(Variable, Box<Expr>),
    Hedge,
    Literal(Literal),
}

impl Expr {
    /// Create a probability term over the given items.
    pub fn mk_p(vars: Vec<PVar>, given: Vec<PGiven>) -> Result<Expr, CausalError> {
        Ok(Expr::P(Probability::new(vars, given)?))
    }

    /// Create a joint probability over bare variables.
    pub fn mk_joint(vars: &[Variable]) -> Result<Expr, CausalError> {
        Expr::mk_p(vars.iter().cloned().map(PVar::Var).collect(), Vec::new())
    }

    /// Create a conditional probability over bare variables.
    pub fn mk_conditional(vars: &[Variable], given: &[Variable]) -> Result<Expr, CausalError> {
        Expr::mk_p(
            vars.iter().cloned().map(PVar::Var).collect(),
            given.iter().cloned().map(PGiven::Var).collect(),
        )
    }

    /// Create a product node. Children are kept in the order given; nothing
    /// is flattened or simplified.
    pub fn mk_product(children: Vec<Expr>) -> Expr {
        Expr::Product(children)
    }

    pub fn mk_quotient(numer: Expr, denom: Expr) -> Expr {
        Expr::Quotient(Box::new(numer), Box::new(denom))
    }

    pub fn mk_difference(a: Expr, b: Expr) -> Expr {
        Expr::Difference(Box::new(a), Box::new(b))
    }

    /// Create a marginal sum over the given variables.
    pub fn mk_marginal(sub: Vec<Variable>, body: Expr) -> Expr {
        Expr::Marginal(sub, Box::new(body))
    }

    pub fn mk_expectation(sub: Variable, body: Expr) -> Expr {
        Expr::Expectation(sub, Box::new(body))
    }

    pub fn mk_hedge() -> Expr {
        Expr::Hedge
    }

    pub fn mk_literal(literal: Literal) -> Expr {
        Expr::Literal(literal)
    }

    /// True when the failure sentinel occurs anywhere in the tree.
    pub fn contains_hedge(&self) -> bool {
        match self {
            Expr::Hedge => true,
            Expr::P(_) | Expr::Literal(_) => false,
            Expr::Product(children) => children.iter().any(Expr::contains_hedge),
            Expr::Quotient(numer, denom) => numer.contains_hedge() || denom.contains_hedge(),
            Expr::Difference(a, b) => a.contains_hedge() || b.contains_hedge(),
            Expr::Marginal(_, body) => body.contains_hedge(),
            Expr::Expectation(_, body) => body.contains_hedge(),
        }
    }

    /// Render the expression as a LaTeX string.
    pub fn to_latex(&self) -> String {
        match self {
            Expr::P(p) => p.to_latex(),
            Expr::Product(children) => children
                .iter()
                .map(Expr::to_latex)
                .collect::<Vec<String>>()
                .join(" "),
            Expr::Quotient(numer, denom) => {
                format!("\\frac{{{}}}{{{}}}", numer.to_latex(), denom.to_latex())
            }
            Expr::Difference(a, b) => format!("{} - {}", a.to_latex(), b.to_latex()),
            Expr::Marginal(sub, body) => {
                let subs: Vec<String> = sub.iter().map(Variable::to_latex).collect();
                format!("\\sum_{{{}}} \\big({}\\big)", subs.join(", "), body.to_latex())
            }
            Expr::Expectation(sub, body) => {
                format!("E_{{{}}} \\big[ {} \\big]", sub.to_latex(), body.to_latex())
            }
            Expr::Hedge => "\\textbf{FAIL}".to_string(),
            Expr::Literal(literal) => literal.to_latex(),
        }
    }

    /// Create a random expression over the given variables, for randomized
    /// testing. The tree has `height` levels of products and quotients above
    /// joint probability leaves, with an occasional marginal sum in between.
    pub fn new_random(height: u8, variables: &[Variable], seed: u64) -> Expr {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::random_level(height, variables, &mut rng)
    }

    fn random_level(height: u8, variables: &[Variable], rng: &mut StdRng) -> Expr {
        if height <= 1 {
            // a joint over a random non-empty prefix of the variables
            let take = 1 + rng.gen_range(0..variables.len());
            let vars = variables[..take].iter().cloned().map(PVar::Var).collect();
            return Expr::P(Probability { vars, given: Vec::new() });
        }
        let left = Self::random_level(height - 1, variables, rng);
        let right = Self::random_level(height - 1, variables, rng);
        let node = match rng.gen_range(0..3) {
            0 => Expr::mk_product(vec![left, right]),
            1 => Expr::mk_quotient(left, right),
            _ => {
                let bound = variables[rng.gen_range(0..variables.len())].clone();
                Expr::mk_marginal(vec![bound], Expr::mk_product(vec![left, right]))
            }
        };
        node
    }
}

impl ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::mk_product(vec![self, rhs])
    }
}

impl ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::mk_quotient(self, rhs)
    }
}

impl ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::mk_difference(self, rhs)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::P(p) => write!(f, "{p}"),
            Expr::Product(children) => {
                let rendered: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "{}", rendered.join(" * "))
            }
            Expr::Quotient(numer, denom) => write!(f, "[{numer} / {denom}]"),
            Expr::Difference(a, b) => write!(f, "{a} - {b}"),
            Expr::Marginal(sub, body) => {
                let subs: Vec<String> = sub.iter().map(|v| v.to_string()).collect();
                write!(f, "Σ_({}) [ {body} ]", subs.join(", "))
            }
            Expr::Expectation(sub, body) => write!(f, "E_({sub}) [ {body} ]"),
            Expr::Hedge => write!(f, "FAIL"),
            Expr::Literal(literal) => write!(f, "{literal}"),
        }
    }
}
