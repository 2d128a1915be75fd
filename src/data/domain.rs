//! Domains describing the values a variable can take on, together with
//! domain inference from observed values.

use crate::errors::CausalError;
use crate::symbols::value::Value;

use std::fmt;

/// Enum of the supported variable domains.
///
/// The first three kinds are discrete and can enumerate their values; the real
/// interval is continuous and must be quantized before discrete estimation.
#[derive(Clone, Debug, PartialEq)]
pub enum Domain {
    /// The two-element domain `{0, 1}`.
    Binary,
    /// A finite set of arbitrary values.
    Categorical(Vec<Value>),
    /// All integers in the inclusive range `[min, max]`.
    Integer { min: i64, max: i64 },
    /// The closed real interval `[min, max]`.
    Real { min: f64, max: f64 },
}

impl Domain {
    /// Create a categorical domain from a list of values. Duplicates are removed
    /// and the retained values are kept in a deterministic order.
    pub fn categorical(values: impl IntoIterator<Item = Value>) -> Domain {
        let mut unique: Vec<Value> = Vec::new();
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        unique.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        Domain::Categorical(unique)
    }

    /// Create an integer range domain spanning the given values.
    pub fn integer_over(values: &[Value]) -> Result<Domain, CausalError> {
        let mut bounds: Option<(i64, i64)> = None;
        for value in values {
            let num = value.as_f64().ok_or_else(|| {
                CausalError::TypeMismatch(format!("integer domains require numeric values, got {value}"))
            })?;
            if !value.is_integral() {
                return Err(CausalError::TypeMismatch(format!(
                    "integer domains require integral values, got {value}"
                )));
            }
            let num = num as i64;
            bounds = Some(match bounds {
                None => (num, num),
                Some((lo, hi)) => (lo.min(num), hi.max(num)),
            });
        }
        let (min, max) = bounds.ok_or_else(|| {
            CausalError::TypeMismatch("integer domains require at least one value".to_string())
        })?;
        Ok(Domain::Integer { min, max })
    }

    /// Create a real interval domain spanning the given values.
    pub fn real_over(values: &[Value]) -> Result<Domain, CausalError> {
        let mut bounds: Option<(f64, f64)> = None;
        for value in values {
            let num = value.as_f64().ok_or_else(|| {
                CausalError::TypeMismatch(format!("real domains require numeric values, got {value}"))
            })?;
            bounds = Some(match bounds {
                None => (num, num),
                Some((lo, hi)) => (lo.min(num), hi.max(num)),
            });
        }
        let (min, max) = bounds.ok_or_else(|| {
            CausalError::TypeMismatch("real domains require at least one value".to_string())
        })?;
        Ok(Domain::Real { min, max })
    }

    /// Test whether a value belongs to the domain.
    pub fn contains(&self, value: &Value) -> bool {
        match self {
            Domain::Binary => value == &Value::Int(0) || value == &Value::Int(1),
            Domain::Categorical(values) => values.contains(value),
            Domain::Integer { min, max } => match value.as_f64() {
                Some(num) => value.is_integral() && *min as f64 <= num && num <= *max as f64,
                None => false,
            },
            Domain::Real { min, max } => match value.as_f64() {
                Some(num) => *min <= num && num <= *max,
                None => false,
            },
        }
    }

    /// The number of values in the domain, or `None` for continuous domains.
    pub fn cardinality(&self) -> Option<u64> {
        match self {
            Domain::Binary => Some(2),
            Domain::Categorical(values) => Some(values.len() as u64),
            Domain::Integer { min, max } => Some((max - min + 1) as u64),
            Domain::Real { .. } => None,
        }
    }

    pub fn is_discrete(&self) -> bool {
        !matches!(self, Domain::Real { .. })
    }

    /// Enumerate the values of a discrete domain.
    pub fn values(&self) -> Result<Vec<Value>, CausalError> {
        match self {
            Domain::Binary => Ok(vec![Value::Int(0), Value::Int(1)]),
            Domain::Categorical(values) => Ok(values.clone()),
            Domain::Integer { min, max } => Ok((*min..=*max).map(Value::Int).collect()),
            Domain::Real { .. } => Err(CausalError::DomainValidation(
                "continuous domains cannot enumerate their values".to_string(),
            )),
        }
    }

    /// Check that every value belongs to the domain.
    pub fn validate(&self, values: &[Value]) -> Result<(), CausalError> {
        for value in values {
            if !self.contains(value) {
                return Err(CausalError::DomainValidation(format!(
                    "value {value} is not in domain {self}"
                )));
            }
        }
        Ok(())
    }

    /// Human-readable sentence recording the assumption this domain encodes.
    pub fn describe_assumption(&self) -> String {
        match self {
            Domain::Binary => "the variable is binary".to_string(),
            Domain::Categorical(_) => {
                format!("the variable is categorical with values {self}")
            }
            Domain::Integer { min, max } => {
                format!("the variable is an integer in [{min}, {max}]")
            }
            Domain::Real { min, max } => {
                format!("the variable is a real number in [{min}, {max}]")
            }
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Domain::Binary => write!(f, "{{0, 1}}"),
            Domain::Categorical(values) => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Domain::Integer { min, max } => {
                if max - min < 4 {
                    let rendered: Vec<String> = (*min..=*max).map(|v| v.to_string()).collect();
                    write!(f, "{{{}}}", rendered.join(", "))
                } else {
                    write!(f, "{{{min}...{max}}}")
                }
            }
            Domain::Real { min, max } => write!(f, "[{min}...{max}]"),
        }
    }
}

/// Requested domain kind when constructing a dataset column.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DomainKind {
    Binary,
    Categorical,
    Integer,
    Real,
    /// Pick the most specific kind that fits the observed values.
    Infer,
}

/// Build a domain of the requested kind over the given values.
pub fn make_domain(kind: DomainKind, values: &[Value]) -> Result<Domain, CausalError> {
    match kind {
        DomainKind::Binary => Ok(Domain::Binary),
        DomainKind::Categorical => Ok(Domain::categorical(values.iter().cloned())),
        DomainKind::Integer => Domain::integer_over(values),
        DomainKind::Real => Domain::real_over(values),
        DomainKind::Infer => make_domain(infer_domain_kind(values), values),
    }
}

/// Infer the most specific domain kind that fits the values, in decreasing
/// order of specificity: binary, integer, real, categorical. Textual values
/// always force a categorical domain.
pub fn infer_domain_kind(values: &[Value]) -> DomainKind {
    let mut kind = DomainKind::Binary;
    for value in values {
        let fits_binary = matches!(value, Value::Int(0) | Value::Int(1));
        if fits_binary && kind == DomainKind::Binary {
            continue;
        }
        if value.is_integral() && (kind == DomainKind::Binary || kind == DomainKind::Integer) {
            kind = DomainKind::Integer;
        } else if value.is_numeric() && kind != DomainKind::Categorical {
            kind = DomainKind::Real;
        } else {
            return DomainKind::Categorical;
        }
    }
    kind
}
