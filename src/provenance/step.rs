//! Steps: the human-readable half of the ledger. A step owns an ordered log
//! of notes, assumptions, derived values, and sub-steps.

use crate::errors::CausalError;
use crate::expression::node::Expr;

use std::collections::BTreeMap;
use std::fmt;

/// A named assumption recorded during a computation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assumption {
    pub name: String,
}

impl fmt::Display for Assumption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Assume: {}", self.name)
    }
}

/// A value derived and recorded by a step.
#[derive(Clone, Debug, PartialEq)]
pub enum Recorded {
    Expression(Expr),
    Number(f64),
    Text(String),
}

impl fmt::Display for Recorded {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Recorded::Expression(expr) => write!(f, "{expr}"),
            Recorded::Number(value) => write!(f, "{value}"),
            Recorded::Text(text) => write!(f, "{text}"),
        }
    }
}

/// One entry in the ordered log of a step.
#[derive(Clone, Debug, PartialEq)]
pub enum LogEntry {
    Note(String),
    SubStep(Step),
    Assumed(Assumption),
    Derived(String, Recorded),
}

/// Human-interpretable notes on how a result was derived.
///
/// A step accumulates entries only while the entry point that owns it is
/// running; afterwards it is frozen into the resulting ledger node. Log
/// entries keep the order they were written in, and sub-steps appear at the
/// position they were opened.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Step {
    pub name: String,
    pub log: Vec<LogEntry>,
    pub assumptions: Vec<Assumption>,
    pub results: BTreeMap<String, Recorded>,
}

impl Step {
    pub fn new(name: &str) -> Step {
        Step {
            name: name.to_string(),
            log: Vec::new(),
            assumptions: Vec::new(),
            results: BTreeMap::new(),
        }
    }

    /// Append a free-text note.
    pub fn note(&mut self, text: impl Into<String>) {
        self.log.push(LogEntry::Note(text.into()));
    }

    /// Record an assumption by name.
    pub fn assume(&mut self, name: &str) {
        let assumption = Assumption {
            name: name.to_string(),
        };
        self.assumptions.push(assumption.clone());
        self.log.push(LogEntry::Assumed(assumption));
    }

    /// Record a derived value under a key.
    pub fn derive(&mut self, key: &str, value: Recorded) {
        self.log.push(LogEntry::Derived(key.to_string(), value.clone()));
        self.results.insert(key.to_string(), value);
    }

    /// Run `body` inside a named sub-step. The sub-step is logged at its
    /// opening position even when the body fails; a failure is recorded as
    /// the sub-step's last entry before the error propagates.
    pub fn substep<T>(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut Step) -> Result<T, CausalError>,
    ) -> Result<T, CausalError> {
        let mut sub = Step::new(name);
        let outcome = body(&mut sub);
        if let Err(err) = &outcome {
            sub.note(format!("Failed: {err}"));
        }
        self.log.push(LogEntry::SubStep(sub));
        outcome
    }

    /// Indented plain-text rendering of the whole log tree.
    pub fn explain(&self) -> String {
        let mut lines = vec![self.name.clone()];
        self.render_into(&mut lines, 1);
        lines.join("\n")
    }

    fn render_into(&self, lines: &mut Vec<String>, depth: usize) {
        let pad = "\t".repeat(depth);
        for entry in &self.log {
            match entry {
                LogEntry::Note(text) => lines.push(format!("{pad}{text}")),
                LogEntry::Assumed(assumption) => lines.push(format!("{pad}{assumption}")),
                LogEntry::Derived(key, value) => {
                    lines.push(format!("{pad}Derived: {key} = {value}"));
                }
                LogEntry::SubStep(sub) => {
                    lines.push(format!("{pad}{}", sub.name));
                    sub.render_into(lines, depth + 1);
                }
            }
        }
    }
}
