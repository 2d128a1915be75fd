//! Error kinds shared across the whole crate.

use std::error::Error;
use std::fmt;

/// Enum of all error kinds that the library can surface to a caller.
///
/// There is no local recovery anywhere in the crate. An error propagates to the
/// entry point that owns the current ledger step, and the step records the failure
/// as its last log entry before the error becomes the outcome of the call.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum CausalError {
    /// A constructor or operation received an argument of the wrong kind.
    TypeMismatch(String),
    /// A value does not belong to the declared domain of its variable.
    DomainValidation(String),
    /// The directed part of a graph contains a cycle.
    CyclicGraph(String),
    /// A zero denominator was encountered while the prior strength is zero.
    Positivity(String),
    /// A numerical sanity check failed during estimation.
    Numerical(String),
    /// An expression containing the identification failure sentinel cannot be estimated.
    Hedged(String),
    /// An assignment tried to bind a variable that is already bound to a different value.
    Contradiction(String),
    /// The evaluator encountered an expression kind it cannot handle.
    UnknownExpressionKind(String),
    /// A variable or column name is not known in the given context.
    UnknownVariable(String),
}

impl fmt::Display for CausalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CausalError::TypeMismatch(msg) => write!(f, "type mismatch: {msg}"),
            CausalError::DomainValidation(msg) => write!(f, "domain validation failed: {msg}"),
            CausalError::CyclicGraph(msg) => write!(f, "cyclic graph: {msg}"),
            CausalError::Positivity(msg) => write!(f, "positivity violated: {msg}"),
            CausalError::Numerical(msg) => write!(f, "numerical error: {msg}"),
            CausalError::Hedged(msg) => write!(f, "identification failed: {msg}"),
            CausalError::Contradiction(msg) => write!(f, "contradictory evidence: {msg}"),
            CausalError::UnknownExpressionKind(msg) => {
                write!(f, "unknown expression kind: {msg}")
            }
            CausalError::UnknownVariable(msg) => write!(f, "unknown variable: {msg}"),
        }
    }
}

impl Error for CausalError {}
