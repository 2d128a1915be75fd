//! Variables of the causal model and convenience constructors for them.

use crate::data::domain::Domain;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A named variable of the causal model.
///
/// Two variables are equal exactly when their names are equal. The optional
/// domain is descriptive metadata and never takes part in identity, ordering,
/// or hashing. Variables are immutable once constructed and are shared freely
/// between expressions, graphs, and datasets.
#[derive(Clone, Debug)]
pub struct Variable {
    name: String,
    domain: Option<Domain>,
}

impl Variable {
    /// Create a variable without domain information. The name must be non-empty.
    pub fn new(name: &str) -> Variable {
        assert!(!name.is_empty(), "variable names must be non-empty");
        Variable {
            name: name.to_string(),
            domain: None,
        }
    }

    /// Create a variable together with its domain.
    pub fn with_domain(name: &str, domain: Domain) -> Variable {
        assert!(!name.is_empty(), "variable names must be non-empty");
        Variable {
            name: name.to_string(),
            domain: Some(domain),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    pub fn to_latex(&self) -> String {
        self.name.clone()
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Create a list of plain variables from a list of names.
pub fn make_vars(names: &[&str]) -> Vec<Variable> {
    names.iter().map(|name| Variable::new(name)).collect()
}

#[cfg(test)]
mod tests {
    use crate::data::domain::Domain;
    use crate::symbols::variable::{Variable, make_vars};

    #[test]
    /// Test that variable identity ignores the attached domain.
    fn identity_by_name() {
        let plain = Variable::new("x");
        let described = Variable::with_domain("x", Domain::Binary);
        assert_eq!(plain, described);
        assert_ne!(plain, Variable::new("y"));
    }

    #[test]
    /// Test the bulk constructor.
    fn bulk_constructor() {
        let vars = make_vars(&["x", "y", "z"]);
        assert_eq!(vars.len(), 3);
        assert_eq!(vars[0], Variable::new("x"));
        assert_eq!(vars[2].name(), "z");
    }

    #[test]
    #[should_panic]
    /// Test that the empty name is rejected.
    fn empty_name() {
        let _ = Variable::new("");
    }
}
