//! The ledger left behind by a full pipeline run: dependency ordering,
//! recorded assumptions, and the rendered explanation.

use crate::data::dataset::Dataset;
use crate::estimation::multinomial::MultinomialEstimator;
use crate::expression::node::{Expr, PGiven, PVar, Probability};
use crate::expression::substitution::Bindings;
use crate::graph::graph::Graph;
use crate::provenance::explain::{ExplainOptions, explanation_string};
use crate::provenance::result::nested_dependencies;
use crate::symbols::value::Value;
use crate::symbols::variable::make_vars;

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::Int(*v)).collect()
}

#[test]
/// Test that a full run leaves a toposortable ledger with the data and fit
/// nodes below the identification and estimation nodes.
fn ledger_dependency_order() {
    let vars = make_vars(&["x", "y", "z"]);
    let (x, y, z) = (&vars[0], &vars[1], &vars[2]);
    let g = Graph::new(vec![x << z, y << z, y << x]);

    let data = Dataset::new(vec![
        ("z", ints(&[0, 0, 0, 0, 1, 1, 1, 1])),
        ("x", ints(&[0, 0, 1, 1, 0, 0, 1, 1])),
        ("y", ints(&[0, 1, 0, 1, 1, 1, 0, 1])),
    ])
    .unwrap();
    let estimator = MultinomialEstimator::new(data, 1.0).unwrap();

    let query = Expr::P(Probability {
        vars: vec![PVar::Var(y.clone())],
        given: vec![PGiven::do_var(x.clone())],
    });
    let identified = g.identify(&query).unwrap();

    let mut bindings = Bindings::new();
    bindings.insert(x.clone(), 1.into());
    bindings.insert(y.clone(), 1.into());
    let estimate = estimator.estimate_identified(&identified, &bindings).unwrap();

    let order = nested_dependencies(&estimate.provenance).unwrap();
    let names: Vec<&str> = order.iter().map(|node| node.step.name.as_str()).collect();
    assert_eq!(names.len(), 4);

    let position = |name: &str| {
        names
            .iter()
            .position(|candidate| *candidate == name)
            .unwrap_or_else(|| panic!("missing ledger node {name}"))
    };
    assert!(position("Data Processing") < position("Fit MultinomialEstimator"));
    assert!(position("Fit MultinomialEstimator") < position("Estimation"));
    assert!(position("Identification") < position("Estimation"));
    assert_eq!(names.last(), Some(&"Estimation"));
}

#[test]
/// Test the assumptions and notes surfaced by the nested explanation.
fn ledger_explanation_content() {
    let vars = make_vars(&["x", "y", "z"]);
    let (x, y, z) = (&vars[0], &vars[1], &vars[2]);
    let g = Graph::new(vec![x << z, y << z, y << x]);

    let data = Dataset::new(vec![
        ("z", ints(&[0, 1, 0, 1])),
        ("x", ints(&[0, 0, 1, 1])),
        ("y", ints(&[0, 1, 0, 1])),
    ])
    .unwrap();
    let estimator = MultinomialEstimator::new(data, 1.0).unwrap();

    let query = Expr::P(Probability {
        vars: vec![PVar::Var(y.clone())],
        given: vec![PGiven::do_var(x.clone())],
    });
    let identified = g.identify(&query).unwrap();
    let mut bindings = Bindings::new();
    bindings.insert(x.clone(), 1.into());
    bindings.insert(y.clone(), 1.into());
    let estimate = estimator.estimate_identified(&identified, &bindings).unwrap();

    let rendered = explanation_string(&estimate.provenance, ExplainOptions::Nested).unwrap();

    // the data, the model, and the algorithm all record their assumptions
    assert!(rendered.contains("Assume: x is on {0, 1}"));
    assert!(rendered.contains("Assume: Multinomial likelihood"));
    assert!(rendered.contains("Assume: Dirichlet prior"));
    assert!(rendered.contains("Assume: Acyclicity"));
    assert!(rendered.contains("Assume: Positivity"));
    assert!(rendered.contains("Assume: Non-contradictory evidence"));

    // the identification sub-step narrates its input and output
    assert!(rendered.contains("IDC"));
    assert!(rendered.contains("P(y | do(x))"));

    // both derived values appear
    assert!(rendered.contains("Derived: identified_estimand"));
    assert!(rendered.contains("Derived: value"));

    // the single-node rendering stays local to the estimation step
    let local = explanation_string(&estimate.provenance, ExplainOptions::Single).unwrap();
    assert!(local.contains("Derived: value"));
    assert!(!local.contains("Derived: identified_estimand"));
}
