//! The immutable columnar dataset view consumed by estimators, with domain
//! inference, eager validation, and quantization of continuous columns.

use crate::data::domain::{Domain, DomainKind, infer_domain_kind, make_domain};
use crate::errors::CausalError;
use crate::provenance::result::{Operation, Provenance};
use crate::provenance::step::Step;
use crate::symbols::value::Value;
use crate::symbols::variable::Variable;

use std::collections::BTreeMap;
use std::sync::Arc;

/// Anything that names a dataset column: a column name or a variable.
pub trait ColumnKey {
    fn column_name(&self) -> &str;
}

impl ColumnKey for str {
    fn column_name(&self) -> &str {
        self
    }
}

impl ColumnKey for String {
    fn column_name(&self) -> &str {
        self.as_str()
    }
}

impl ColumnKey for Variable {
    fn column_name(&self) -> &str {
        self.name()
    }
}

/// How to obtain the domain of one column.
#[derive(Clone, Debug)]
pub enum DomainSpec {
    /// Build a domain of this kind over the observed values.
    Kind(DomainKind),
    /// Use this domain as given.
    Given(Domain),
}

/// One named column: the variable (carrying its domain) and the values.
#[derive(Clone, Debug)]
pub struct Column {
    pub variable: Variable,
    pub values: Vec<Value>,
}

/// A column-major view of a tabular dataset.
///
/// Construction fixes a variable with a domain for every column and records
/// the domain assumptions in a ledger step. The view is read-only afterwards,
/// with the single exception of [Dataset::quantize].
#[derive(Clone, Debug)]
pub struct Dataset {
    names: Vec<String>,
    columns: BTreeMap<String, Column>,
    rows: usize,
    step: Step,
}

impl Dataset {
    /// Create a dataset inferring every column's domain from its values.
    pub fn new(columns: Vec<(&str, Vec<Value>)>) -> Result<Dataset, CausalError> {
        Dataset::with_domains(columns, BTreeMap::new(), true)
    }

    /// Create a dataset with explicit domain requests for some or all columns.
    /// Columns without a request get an inferred domain. With `validate` set,
    /// every value is eagerly checked against its column's domain.
    pub fn with_domains(
        columns: Vec<(&str, Vec<Value>)>,
        mut domains: BTreeMap<String, DomainSpec>,
        validate: bool,
    ) -> Result<Dataset, CausalError> {
        let mut step = Step::new("Data Processing");

        let rows = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        let mut names = Vec::with_capacity(columns.len());
        let mut table = BTreeMap::new();

        for (name, values) in columns {
            if values.len() != rows {
                return Err(CausalError::TypeMismatch(format!(
                    "column {name} has {} rows, expected {rows}",
                    values.len()
                )));
            }
            if table.contains_key(name) {
                return Err(CausalError::TypeMismatch(format!(
                    "duplicate column name {name}"
                )));
            }

            let domain = match domains.remove(name) {
                Some(DomainSpec::Given(domain)) => domain,
                Some(DomainSpec::Kind(kind)) => make_domain(kind, &values)?,
                None => {
                    let domain = make_domain(infer_domain_kind(&values), &values)?;
                    step.note(format!("Inferred domain for \"{name}\": {domain}"));
                    domain
                }
            };
            if domain.cardinality().is_some_and(|size| size <= 1) {
                step.note(format!(
                    "Domain for \"{name}\" has cardinality <= 1, estimates over it are vacuous"
                ));
            }
            if validate {
                domain.validate(&values)?;
            }
            step.assume(&format!("{name} is on {domain}"));

            names.push(name.to_string());
            table.insert(
                name.to_string(),
                Column {
                    variable: Variable::with_domain(name, domain),
                    values,
                },
            );
        }

        if let Some(name) = domains.keys().next() {
            return Err(CausalError::UnknownVariable(format!(
                "domain given for \"{name}\", which is not a column"
            )));
        }

        Ok(Dataset {
            names,
            columns: table,
            rows,
            step,
        })
    }

    pub fn rows_count(&self) -> usize {
        self.rows
    }

    /// Column names in their original order.
    pub fn names(&self) -> &[String] {
        self.names.as_slice()
    }

    pub fn column(&self, key: &(impl ColumnKey + ?Sized)) -> Result<&Column, CausalError> {
        self.columns.get(key.column_name()).ok_or_else(|| {
            CausalError::UnknownVariable(format!(
                "\"{}\" is not a column of the dataset",
                key.column_name()
            ))
        })
    }

    pub fn variable(&self, key: &(impl ColumnKey + ?Sized)) -> Result<&Variable, CausalError> {
        Ok(&self.column(key)?.variable)
    }

    pub fn domain_of(&self, key: &(impl ColumnKey + ?Sized)) -> Result<&Domain, CausalError> {
        self.column(key)?.variable.domain().ok_or_else(|| {
            CausalError::DomainValidation(format!(
                "column \"{}\" has no domain",
                key.column_name()
            ))
        })
    }

    /// Row mask selecting rows where every condition holds.
    pub fn row_mask(&self, conditions: &[(String, Value)]) -> Result<Vec<bool>, CausalError> {
        let mut mask = vec![true; self.rows];
        for (name, value) in conditions {
            let column = self.column(name.as_str())?;
            for (slot, cell) in mask.iter_mut().zip(&column.values) {
                *slot = *slot && cell == value;
            }
        }
        Ok(mask)
    }

    /// Replace a continuous column by a categorical one over bin midpoints.
    /// Bin edges are taken at quantiles of the observed values, so the bins
    /// are equally populated up to ties.
    pub fn quantize(
        &mut self,
        key: &(impl ColumnKey + ?Sized),
        n_bins: usize,
    ) -> Result<(), CausalError> {
        let name = key.column_name().to_string();
        let column = self.column(&name)?;
        if n_bins == 0 {
            return Err(CausalError::TypeMismatch(
                "quantization needs at least one bin".to_string(),
            ));
        }

        let mut sorted = Vec::with_capacity(column.values.len());
        for value in &column.values {
            let number = value.as_f64().ok_or_else(|| {
                CausalError::TypeMismatch(format!(
                    "column \"{name}\" holds non-numeric values and cannot be quantized"
                ))
            })?;
            sorted.push(number);
        }
        if sorted.is_empty() {
            return Err(CausalError::DomainValidation(format!(
                "column \"{name}\" is empty and cannot be quantized"
            )));
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        // interior edges at the quantiles, outer edges at the observed extremes
        let count = sorted.len();
        let edges: Vec<f64> = (1..n_bins)
            .map(|i| {
                let rank = (count * i).div_ceil(n_bins);
                sorted[rank.saturating_sub(1)]
            })
            .collect();
        let lows: Vec<f64> = std::iter::once(sorted[0]).chain(edges.iter().copied()).collect();
        let highs: Vec<f64> = edges
            .iter()
            .copied()
            .chain(std::iter::once(sorted[count - 1]))
            .collect();
        let midpoints: Vec<f64> = lows
            .iter()
            .zip(&highs)
            .map(|(lo, hi)| (lo + hi) / 2.0)
            .collect();

        let remapped: Vec<Value> = column
            .values
            .iter()
            .map(|value| {
                let number = value.as_f64().unwrap_or(f64::NAN);
                let bin = edges.iter().filter(|edge| number > **edge).count();
                Value::Float(midpoints[bin])
            })
            .collect();

        self.step.substep(&format!("Quantizing {name} into {n_bins} bins"), |sub| {
            for bin in 0..n_bins {
                sub.note(format!(
                    "Mapping elements on ({}, {}] to {}",
                    lows[bin], highs[bin], midpoints[bin]
                ));
            }
            Ok(())
        })?;

        let domain = Domain::categorical(midpoints.into_iter().map(Value::Float));
        self.columns.insert(
            name.clone(),
            Column {
                variable: Variable::with_domain(&name, domain),
                values: remapped,
            },
        );
        Ok(())
    }

    /// Freeze the current processing step into a ledger node. Results built
    /// on this dataset record the node as a dependency.
    pub fn provenance(&self) -> Arc<Provenance> {
        Provenance::freeze(Operation::new("Dataset::new"), self.step.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::data::dataset::{Dataset, DomainSpec};
    use crate::data::domain::{Domain, DomainKind};
    use crate::errors::CausalError;
    use crate::symbols::value::Value;

    use std::collections::BTreeMap;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|v| Value::Int(*v)).collect()
    }

    #[test]
    /// Test construction with inferred domains and basic lookups.
    fn inferred_construction() {
        let data = Dataset::new(vec![
            ("x", ints(&[0, 1, 1])),
            ("y", ints(&[0, 1, 0])),
        ])
        .unwrap();

        assert_eq!(data.rows_count(), 3);
        assert_eq!(data.names(), &["x".to_string(), "y".to_string()]);
        assert_eq!(data.domain_of("x").unwrap(), &Domain::Binary);

        let explained = data.provenance().step.explain();
        assert!(explained.contains("Inferred domain for \"x\""));
        assert!(explained.contains("Assume: y is on {0, 1}"));
    }

    #[test]
    /// Test explicit domains and eager validation.
    fn explicit_domains() {
        let mut domains = BTreeMap::new();
        domains.insert("x".to_string(), DomainSpec::Kind(DomainKind::Integer));
        domains.insert(
            "y".to_string(),
            DomainSpec::Given(Domain::Integer { min: 0, max: 1 }),
        );

        let data = Dataset::with_domains(
            vec![("x", ints(&[0, 2, 1])), ("y", ints(&[0, 1, 0]))],
            domains.clone(),
            true,
        )
        .unwrap();
        assert_eq!(data.domain_of("x").unwrap(), &Domain::Integer { min: 0, max: 2 });

        // a value outside a declared domain fails eagerly
        let bad = Dataset::with_domains(
            vec![("x", ints(&[0, 2, 1])), ("y", ints(&[0, 5, 0]))],
            domains,
            true,
        );
        assert!(matches!(bad, Err(CausalError::DomainValidation(_))));
    }

    #[test]
    /// Test that ragged columns and unknown domain keys are rejected.
    fn construction_errors() {
        let ragged = Dataset::new(vec![("x", ints(&[0, 1])), ("y", ints(&[0]))]);
        assert!(ragged.is_err());

        let mut domains = BTreeMap::new();
        domains.insert("ghost".to_string(), DomainSpec::Kind(DomainKind::Binary));
        let unknown = Dataset::with_domains(vec![("x", ints(&[0, 1]))], domains, true);
        assert!(matches!(unknown, Err(CausalError::UnknownVariable(_))));
    }

    #[test]
    /// Test row masks over single and joint conditions.
    fn row_masks() {
        let data = Dataset::new(vec![
            ("x", ints(&[0, 1, 0, 1])),
            ("z", ints(&[1, 1, 0, 1])),
        ])
        .unwrap();

        let mask = data.row_mask(&[("x".to_string(), Value::Int(1))]).unwrap();
        assert_eq!(mask, vec![false, true, false, true]);

        let mask = data
            .row_mask(&[
                ("x".to_string(), Value::Int(0)),
                ("z".to_string(), Value::Int(1)),
            ])
            .unwrap();
        assert_eq!(mask.iter().filter(|hit| **hit).count(), 1);
    }

    #[test]
    /// Test quantization of a continuous column into two bins.
    fn quantization() {
        let mut data = Dataset::new(vec![(
            "w",
            vec![
                Value::Float(0.1),
                Value::Float(0.2),
                Value::Float(0.8),
                Value::Float(0.9),
            ],
        )])
        .unwrap();
        assert!(!data.domain_of("w").unwrap().is_discrete());

        data.quantize("w", 2).unwrap();
        let domain = data.domain_of("w").unwrap();
        assert!(domain.is_discrete());
        assert_eq!(domain.cardinality(), Some(2));

        // the first two rows land in the low bin, the rest in the high bin
        let column = data.column("w").unwrap();
        assert_eq!(column.values[0], column.values[1]);
        assert_eq!(column.values[2], column.values[3]);
        assert_ne!(column.values[0], column.values[3]);
    }
}
