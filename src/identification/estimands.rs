//! Declarative causal-query constructors that unfold into the expression
//! algebra, together with their display literals.

use crate::errors::CausalError;
use crate::expression::literal::{Literal, LiteralArg, LiteralSpec};
use crate::expression::node::{Expr, PGiven, PVar, Probability};
use crate::symbols::event::EqualityEvent;
use crate::symbols::value::Value;
use crate::symbols::variable::Variable;

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

static ATE_LITERAL: LazyLock<Arc<LiteralSpec>> = LazyLock::new(|| {
    Arc::new(
        LiteralSpec::new("ATE", 2)
            .with_separator(" | ")
            .with_latex_name("\\text{ATE}")
            .with_latex_separator(" \\mid "),
    )
});

static CATE_LITERAL: LazyLock<Arc<LiteralSpec>> = LazyLock::new(|| {
    Arc::new(
        LiteralSpec::new("CATE", 3)
            .with_separator(" | ")
            .with_latex_name("\\text{CATE}")
            .with_latex_separator(" \\mid "),
    )
});

static GENERIC_LITERAL: LazyLock<Arc<LiteralSpec>> =
    LazyLock::new(|| Arc::new(LiteralSpec::new("CausalEstimand", 1)));

/// A causal query that can unfold itself into the expression algebra.
pub trait CausalEstimand {
    /// Human-readable name used in ledger notes.
    fn name(&self) -> &str;

    /// The query as an expression carrying interventions.
    fn expression(&self) -> Expr;

    /// The query rendered as a named literal for display.
    fn literal(&self) -> Result<Expr, CausalError>;
}

/// Any expression is a causal estimand of itself.
impl CausalEstimand for Expr {
    fn name(&self) -> &str {
        "causal estimand"
    }

    fn expression(&self) -> Expr {
        self.clone()
    }

    fn literal(&self) -> Result<Expr, CausalError> {
        let literal = Literal::new(
            &GENERIC_LITERAL,
            vec![LiteralArg::Expr(Box::new(self.clone()))],
        )?;
        Ok(Expr::mk_literal(literal))
    }
}

/// Turn a variable-to-value map into a list of equality events.
pub fn conditions(map: BTreeMap<Variable, Value>) -> Vec<EqualityEvent> {
    map.into_iter()
        .map(|(var, val)| EqualityEvent::new(var, val))
        .collect()
}

fn expectation_under(
    outcome: &Variable,
    interventions: &[EqualityEvent],
    subpopulation: &[EqualityEvent],
) -> Expr {
    let mut given: Vec<PGiven> = interventions
        .iter()
        .map(|event| PGiven::do_value(event.var.clone(), event.val.clone()))
        .collect();
    given.extend(
        subpopulation
            .iter()
            .map(|event| PGiven::Event(event.clone())),
    );
    let p = Expr::P(Probability {
        vars: vec![PVar::Var(outcome.clone())],
        given,
    });
    Expr::mk_expectation(outcome.clone(), p)
}

fn validate_condition(
    condition: &[EqualityEvent],
    outcome: &Variable,
    name: &str,
) -> Result<(), CausalError> {
    if condition.is_empty() {
        return Err(CausalError::TypeMismatch(format!(
            "{name} must constrain at least one variable"
        )));
    }
    let mut seen: Vec<&Variable> = Vec::new();
    for event in condition {
        if seen.contains(&&event.var) {
            return Err(CausalError::TypeMismatch(format!(
                "{name} constrains {} twice",
                event.var
            )));
        }
        if &event.var == outcome {
            return Err(CausalError::TypeMismatch(format!(
                "{name} must not constrain the outcome {outcome}"
            )));
        }
        seen.push(&event.var);
    }
    Ok(())
}

/// The average treatment effect: the difference between the expected outcome
/// under the treatment intervention and under the control intervention.
#[derive(Clone, Debug)]
pub struct Ate {
    outcome: Variable,
    treatment: Vec<EqualityEvent>,
    control: Vec<EqualityEvent>,
}

impl Ate {
    pub fn new(
        outcome: Variable,
        treatment: Vec<EqualityEvent>,
        control: Vec<EqualityEvent>,
    ) -> Result<Ate, CausalError> {
        validate_condition(&treatment, &outcome, "treatment condition")?;
        validate_condition(&control, &outcome, "control condition")?;
        Ok(Ate {
            outcome,
            treatment,
            control,
        })
    }

    /// Shorthand for a binary treatment variable: treatment is `{treatment = 1}`
    /// and control `{treatment = 0}`. The variable's domain, when known, must
    /// be binary.
    pub fn for_binary(outcome: Variable, treatment: Variable) -> Result<Ate, CausalError> {
        if let Some(domain) = treatment.domain() {
            if domain != &crate::data::domain::Domain::Binary {
                return Err(CausalError::DomainValidation(format!(
                    "treatment {treatment} has non-binary domain {domain}"
                )));
            }
        }
        Ate::new(
            outcome,
            vec![EqualityEvent::new(treatment.clone(), 1)],
            vec![EqualityEvent::new(treatment, 0)],
        )
    }

    pub fn outcome(&self) -> &Variable {
        &self.outcome
    }

    /// The distinct variables mentioned by the treatment and control conditions.
    pub fn treatment_vars(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = Vec::new();
        for event in self.treatment.iter().chain(self.control.iter()) {
            if !vars.contains(&event.var) {
                vars.push(event.var.clone());
            }
        }
        vars
    }
}

impl CausalEstimand for Ate {
    fn name(&self) -> &str {
        "average treatment effect"
    }

    fn expression(&self) -> Expr {
        expectation_under(&self.outcome, &self.treatment, &[])
            - expectation_under(&self.outcome, &self.control, &[])
    }

    fn literal(&self) -> Result<Expr, CausalError> {
        let literal = Literal::new(
            &ATE_LITERAL,
            vec![
                LiteralArg::Var(self.outcome.clone()),
                LiteralArg::Vars(self.treatment_vars()),
            ],
        )?;
        Ok(Expr::mk_literal(literal))
    }
}

/// The conditional average treatment effect: an average treatment effect
/// measured within the subpopulation picked out by a set of equality events.
#[derive(Clone, Debug)]
pub struct Cate {
    base: Ate,
    subpopulation: Vec<EqualityEvent>,
}

impl Cate {
    /// The subpopulation may be empty, in which case the query coincides with
    /// the unconditional effect.
    pub fn new(
        outcome: Variable,
        treatment: Vec<EqualityEvent>,
        control: Vec<EqualityEvent>,
        subpopulation: Vec<EqualityEvent>,
    ) -> Result<Cate, CausalError> {
        let base = Ate::new(outcome, treatment, control)?;
        let intervened = base.treatment_vars();
        let mut seen: Vec<&Variable> = Vec::new();
        for event in &subpopulation {
            if &event.var == base.outcome() || seen.contains(&&event.var) {
                return Err(CausalError::TypeMismatch(format!(
                    "subpopulation constrains {} twice or names the outcome",
                    event.var
                )));
            }
            if intervened.contains(&event.var) {
                return Err(CausalError::TypeMismatch(format!(
                    "subpopulation constrains the intervened variable {}",
                    event.var
                )));
            }
            seen.push(&event.var);
        }
        Ok(Cate {
            base,
            subpopulation,
        })
    }

    pub fn subpopulation_vars(&self) -> Vec<Variable> {
        self.subpopulation
            .iter()
            .map(|event| event.var.clone())
            .collect()
    }
}

impl CausalEstimand for Cate {
    fn name(&self) -> &str {
        "conditional average treatment effect"
    }

    fn expression(&self) -> Expr {
        expectation_under(&self.base.outcome, &self.base.treatment, &self.subpopulation)
            - expectation_under(&self.base.outcome, &self.base.control, &self.subpopulation)
    }

    fn literal(&self) -> Result<Expr, CausalError> {
        let literal = Literal::new(
            &CATE_LITERAL,
            vec![
                LiteralArg::Var(self.base.outcome.clone()),
                LiteralArg::Vars(self.base.treatment_vars()),
                LiteralArg::Vars(self.subpopulation_vars()),
            ],
        )?;
        Ok(Expr::mk_literal(literal))
    }
}

#[cfg(test)]
mod tests {
    use crate::data::domain::Domain;
    use crate::identification::estimands::{Ate, Cate, CausalEstimand};
    use crate::symbols::event::EqualityEvent;
    use crate::symbols::variable::{Variable, make_vars};

    #[test]
    /// Test unfolding of the average treatment effect.
    fn ate_expression() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (&vars[0], &vars[1]);

        let ate = Ate::new(
            y.clone(),
            vec![EqualityEvent::new(x.clone(), 1)],
            vec![EqualityEvent::new(x.clone(), 0)],
        )
        .unwrap();

        assert_eq!(
            ate.expression().to_string(),
            "E_(y) [ P(y | do(x = 1)) ] - E_(y) [ P(y | do(x = 0)) ]"
        );
        assert_eq!(ate.literal().unwrap().to_string(), "ATE(y | x)");
    }

    #[test]
    /// Test the binary shorthand and its domain check.
    fn ate_binary_shorthand() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (&vars[0], &vars[1]);

        let ate = Ate::for_binary(y.clone(), x.clone()).unwrap();
        assert_eq!(
            ate.expression().to_string(),
            "E_(y) [ P(y | do(x = 1)) ] - E_(y) [ P(y | do(x = 0)) ]"
        );

        let described = Variable::with_domain("x", Domain::Integer { min: 0, max: 5 });
        assert!(Ate::for_binary(y.clone(), described).is_err());
        let binary = Variable::with_domain("x", Domain::Binary);
        assert!(Ate::for_binary(y.clone(), binary).is_ok());
    }

    #[test]
    /// Test unfolding of the conditional average treatment effect.
    fn cate_expression() {
        let vars = make_vars(&["x", "y", "s"]);
        let (x, y, s) = (&vars[0], &vars[1], &vars[2]);

        let cate = Cate::new(
            y.clone(),
            vec![EqualityEvent::new(x.clone(), 1)],
            vec![EqualityEvent::new(x.clone(), 0)],
            vec![EqualityEvent::new(s.clone(), 1)],
        )
        .unwrap();

        assert_eq!(
            cate.expression().to_string(),
            "E_(y) [ P(y | do(x = 1), s = 1) ] - E_(y) [ P(y | do(x = 0), s = 1) ]"
        );
        assert_eq!(cate.literal().unwrap().to_string(), "CATE(y | x | s)");
    }

    #[test]
    /// Test rejection of malformed conditions.
    fn condition_validation() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (&vars[0], &vars[1]);

        // the outcome cannot appear in the treatment condition
        assert!(Ate::new(
            y.clone(),
            vec![EqualityEvent::new(y.clone(), 1)],
            vec![EqualityEvent::new(x.clone(), 0)],
        )
        .is_err());

        // a variable cannot be constrained twice in one condition
        assert!(Ate::new(
            y.clone(),
            vec![
                EqualityEvent::new(x.clone(), 1),
                EqualityEvent::new(x.clone(), 0),
            ],
            vec![EqualityEvent::new(x.clone(), 0)],
        )
        .is_err());

        // empty treatment conditions say nothing
        assert!(Ate::new(y.clone(), Vec::new(), vec![EqualityEvent::new(x.clone(), 0)]).is_err());

        // the subpopulation cannot constrain an intervened variable
        assert!(Cate::new(
            y.clone(),
            vec![EqualityEvent::new(x.clone(), 1)],
            vec![EqualityEvent::new(x.clone(), 0)],
            vec![EqualityEvent::new(x.clone(), 1)],
        )
        .is_err());
    }
}
