//! Numeric estimation of identified expressions against tabular data.

pub mod multinomial;

pub use multinomial::MultinomialEstimator;

use crate::errors::CausalError;
use crate::provenance::result::{LedgerResult, Provenance, number_result};

use std::sync::Arc;

/// The outcome of an estimation run: the numeric value and the ledger node
/// narrating how it was computed.
#[derive(Clone, Debug)]
pub struct EstimationResult {
    pub value: f64,
    pub provenance: Arc<Provenance>,
}

impl LedgerResult for EstimationResult {
    fn expected_keys() -> &'static [&'static str] {
        &["value"]
    }

    fn from_provenance(node: Arc<Provenance>) -> Result<Self, CausalError> {
        Ok(EstimationResult {
            value: number_result(&node, "value")?,
            provenance: node,
        })
    }
}
