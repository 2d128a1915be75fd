//! The assumption and provenance ledger: steps narrate how a result was
//! derived, operations record how to replay it, and frozen nodes form the
//! dependency graph between results.

pub mod explain;
pub mod result;
pub mod step;

pub use explain::{ExplainOptions, explanation_string, print_explanation};
pub use result::{LedgerResult, OpArg, Operation, Provenance, entrypoint, nested_dependencies};
pub use step::{Assumption, LogEntry, Recorded, Step};
