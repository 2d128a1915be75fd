//! Brute-force estimation of identified expressions against a discrete
//! dataset, using a multinomial likelihood with a symmetric Dirichlet prior.

use crate::data::dataset::Dataset;
use crate::data::domain::Domain;
use crate::errors::CausalError;
use crate::estimation::EstimationResult;
use crate::expression::node::{Expr, PGiven, PVar, Probability};
use crate::expression::substitution::Bindings;
use crate::identification::IdentificationResult;
use crate::provenance::result::{OpArg, Operation, Provenance, entrypoint};
use crate::provenance::step::{Recorded, Step};
use crate::symbols::value::Value;
use crate::symbols::variable::Variable;

use std::collections::BTreeSet;
use std::sync::Arc;

/// Tolerance for the check that probabilities under an expectation sum to one.
const PROBABILITY_SUM_TOLERANCE: f64 = 0.1;

/// Estimates expressions over the observational distribution by counting
/// rows, with a prior spread uniformly over the cells of the observed joint.
///
/// With the prior strength at zero the estimate of a probability is the plain
/// relative frequency and positivity is not guaranteed. A positive prior
/// behaves like that many virtual observations distributed evenly across the
/// joint domain of the observed variables, which guarantees positivity.
#[derive(Clone, Debug)]
pub struct MultinomialEstimator {
    data: Dataset,
    observed: BTreeSet<String>,
    prior: f64,
    cell_prior: f64,
    posterior_count: f64,
    provenance: Arc<Provenance>,
}

impl MultinomialEstimator {
    /// Fit over all columns, coercing continuous ones into two bins.
    pub fn new(data: Dataset, prior: f64) -> Result<MultinomialEstimator, CausalError> {
        MultinomialEstimator::with_options(data, None, prior, true)
    }

    /// Fit with an explicit observed set and coercion policy. With `coerce`
    /// unset, a continuous column is an error instead of being quantized.
    pub fn with_options(
        mut data: Dataset,
        observed: Option<&[Variable]>,
        prior: f64,
        coerce: bool,
    ) -> Result<MultinomialEstimator, CausalError> {
        if !(prior >= 0.0) {
            return Err(CausalError::DomainValidation(format!(
                "the prior strength must be nonnegative, got {prior}"
            )));
        }

        let mut step = Step::new("Fit MultinomialEstimator");

        for name in data.names().to_vec() {
            if data.domain_of(name.as_str())?.is_discrete() {
                continue;
            }
            if !coerce {
                return Err(CausalError::DomainValidation(format!(
                    "column \"{name}\" is continuous, quantize it or enable coercion"
                )));
            }
            step.note(format!("Coercing {name} to discrete"));
            data.quantize(name.as_str(), 2)?;
        }

        let observed: BTreeSet<String> = match observed {
            None => data.names().iter().cloned().collect(),
            Some(vars) => {
                let mut names = BTreeSet::new();
                for var in vars {
                    data.column(var)?;
                    names.insert(var.name().to_string());
                }
                names
            }
        };

        let mut joint_cells = 1.0;
        for name in &observed {
            joint_cells *= cardinality_of(data.domain_of(name.as_str())?)?;
        }
        let cell_prior = if joint_cells > 0.0 { prior / joint_cells } else { 0.0 };
        let posterior_count = prior + data.rows_count() as f64;

        step.assume("Multinomial likelihood");
        step.assume("Dirichlet prior");
        step.note(format!(
            "Total posterior mass: {posterior_count} ({} observations, {prior} virtual)",
            data.rows_count()
        ));

        let operation = Operation::new("MultinomialEstimator::new")
            .with_kwarg("data", OpArg::Result(data.provenance()))
            .with_kwarg("prior", OpArg::Number(prior))
            .with_kwarg("coerce", OpArg::Flag(coerce));

        Ok(MultinomialEstimator {
            data,
            observed,
            prior,
            cell_prior,
            posterior_count,
            provenance: Provenance::freeze(operation, step),
        })
    }

    /// The variables the estimator treats as observed.
    pub fn observed(&self) -> Result<Vec<Variable>, CausalError> {
        self.observed
            .iter()
            .map(|name| Ok(self.data.variable(name.as_str())?.clone()))
            .collect()
    }

    pub fn domain_of(&self, var: &Variable) -> Result<&Domain, CausalError> {
        self.data.domain_of(var)
    }

    /// Combined mass of real observations and virtual prior observations.
    pub fn posterior_mass(&self) -> f64 {
        self.posterior_count
    }

    /// The ledger node recording the fit.
    pub fn provenance(&self) -> Arc<Provenance> {
        Arc::clone(&self.provenance)
    }

    /// Estimate an expression, applying `bindings` first. The expression must
    /// be fully observational: interventions must have been identified away,
    /// and the failure sentinel is rejected outright.
    pub fn estimate(
        &self,
        estimand: &Expr,
        bindings: &Bindings,
    ) -> Result<EstimationResult, CausalError> {
        let operation = Operation::new("MultinomialEstimator::estimate")
            .with_arg(OpArg::Expression(estimand.clone()))
            .with_kwarg("estimator", OpArg::Result(self.provenance()));
        self.run_estimation(estimand, bindings, operation)
    }

    /// Estimate the expression carried by an identification result. The
    /// result node is recorded as a ledger dependency alongside the fit.
    pub fn estimate_identified(
        &self,
        identified: &IdentificationResult,
        bindings: &Bindings,
    ) -> Result<EstimationResult, CausalError> {
        let operation = Operation::new("MultinomialEstimator::estimate")
            .with_arg(OpArg::Expression(identified.identified_estimand.clone()))
            .with_kwarg("estimator", OpArg::Result(self.provenance()))
            .with_kwarg(
                "identification",
                OpArg::Result(Arc::clone(&identified.provenance)),
            );
        self.run_estimation(&identified.identified_estimand, bindings, operation)
    }

    fn run_estimation(
        &self,
        estimand: &Expr,
        bindings: &Bindings,
        operation: Operation,
    ) -> Result<EstimationResult, CausalError> {
        entrypoint("Estimation", operation, |step| {
            step.note(
                "Performing brute force estimation using a multinomial likelihood \
                 and Dirichlet prior.",
            );

            if estimand.contains_hedge() {
                return Err(CausalError::Hedged(
                    "the estimand contains an unidentifiable query".to_string(),
                ));
            }

            let bound = estimand.assign_all(bindings)?;
            let unobserved: Vec<String> = bound
                .free_variables()
                .iter()
                .map(|var| var.name().to_string())
                .filter(|name| !self.observed.contains(name))
                .collect();
            if !unobserved.is_empty() {
                return Err(CausalError::TypeMismatch(format!(
                    "cannot estimate an expression with unobserved free variables: {}",
                    unobserved.join(", ")
                )));
            }

            let value = self.approx(&bound)?;
            step.derive("value", Recorded::Number(value));
            Ok(())
        })
    }

    /// Recursively evaluate a fully bound expression.
    fn approx(&self, expr: &Expr) -> Result<f64, CausalError> {
        match expr {
            Expr::P(p) => self.approx_p(p),
            Expr::Product(children) => {
                let mut product = 1.0;
                for child in children {
                    product *= self.approx(child)?;
                }
                Ok(product)
            }
            Expr::Quotient(numer, denom) => {
                let denom_value = self.approx(denom)?;
                if denom_value == 0.0 {
                    return Err(CausalError::Positivity(format!(
                        "division by zero in {expr}, consider a nonzero prior strength"
                    )));
                }
                Ok(self.approx(numer)? / denom_value)
            }
            Expr::Difference(a, b) => Ok(self.approx(a)? - self.approx(b)?),
            Expr::Marginal(sub, body) => self.approx_marginal(sub, body),
            Expr::Expectation(sub, body) => self.approx_expectation(sub, body),
            Expr::Hedge => Err(CausalError::Hedged(
                "cannot estimate an unidentifiable query".to_string(),
            )),
            Expr::Literal(_) => Err(CausalError::UnknownExpressionKind(format!(
                "the estimator cannot evaluate the literal {expr}"
            ))),
        }
    }

    fn approx_p(&self, p: &Probability) -> Result<f64, CausalError> {
        let mut given_events: Vec<(String, Value)> = Vec::new();
        for item in &p.given {
            match item {
                PGiven::Event(event) => {
                    given_events.push((event.var.name().to_string(), event.val.clone()));
                }
                PGiven::Var(var) => {
                    return Err(CausalError::TypeMismatch(format!(
                        "cannot evaluate a probability containing the free variable {var}"
                    )));
                }
                PGiven::Do(event) => {
                    return Err(CausalError::TypeMismatch(format!(
                        "cannot approximate the interventional term {event}, \
                         identify the expression first"
                    )));
                }
            }
        }

        let mut var_events: Vec<(String, Value)> = Vec::new();
        for item in &p.vars {
            match item {
                PVar::Event(event) => {
                    var_events.push((event.var.name().to_string(), event.val.clone()));
                }
                PVar::Var(var) => {
                    return Err(CausalError::TypeMismatch(format!(
                        "cannot evaluate a probability containing the free variable {var}"
                    )));
                }
            }
        }

        // observed rows consistent with the conditioning, then with everything
        let condition_mask = self.data.row_mask(&given_events)?;
        let matching_condition = condition_mask.iter().filter(|hit| **hit).count() as f64;
        if matching_condition == 0.0 && self.prior == 0.0 {
            return Err(CausalError::Positivity(format!(
                "no rows are consistent with the conditioning of {p} and the prior is zero"
            )));
        }
        let mut all_events = given_events.clone();
        all_events.extend(var_events.iter().cloned());
        let full_mask = self.data.row_mask(&all_events)?;
        let matching_all = full_mask.iter().filter(|hit| **hit).count() as f64;

        // virtual counts from the prior, spread over the unconstrained cells
        let given_names: BTreeSet<&str> =
            given_events.iter().map(|(name, _)| name.as_str()).collect();
        let all_names: BTreeSet<&str> =
            all_events.iter().map(|(name, _)| name.as_str()).collect();
        let cells_after_condition = self.domain_size_excluding(&given_names)?;
        let cells_after_all = self.domain_size_excluding(&all_names)?;

        let numer = matching_all + cells_after_all * self.cell_prior;
        let denom = matching_condition + cells_after_condition * self.cell_prior;
        Ok(numer / denom)
    }

    /// Product of the domain cardinalities of the observed variables outside
    /// `excluded`.
    fn domain_size_excluding(&self, excluded: &BTreeSet<&str>) -> Result<f64, CausalError> {
        let mut size = 1.0;
        for name in &self.observed {
            if !excluded.contains(name.as_str()) {
                size *= cardinality_of(self.data.domain_of(name.as_str())?)?;
            }
        }
        Ok(size)
    }

    fn approx_marginal(&self, sub: &[Variable], body: &Expr) -> Result<f64, CausalError> {
        let Some((first, rest)) = sub.split_first() else {
            return Ok(0.0);
        };
        let inner = if rest.is_empty() {
            body.clone()
        } else {
            Expr::mk_marginal(rest.to_vec(), body.clone())
        };

        let mut total = 0.0;
        for value in self.data.domain_of(first)?.values()? {
            total += self.approx(&inner.assign(first, value)?)?;
        }
        Ok(total)
    }

    fn approx_expectation(&self, sub: &Variable, body: &Expr) -> Result<f64, CausalError> {
        let mut total = 0.0;
        let mut probability_mass = 0.0;
        for value in self.data.domain_of(sub)?.values()? {
            let weight = value.as_f64().ok_or_else(|| {
                CausalError::Numerical(format!(
                    "expectation over {sub} met the non-numeric value {value}"
                ))
            })?;
            let probability = self.approx(&body.assign(sub, value)?)?;
            probability_mass += probability;
            total += probability * weight;
        }

        if (probability_mass - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(CausalError::Numerical(format!(
                "probabilities under the expectation over {sub} sum to {probability_mass}"
            )));
        }
        Ok(total)
    }
}

fn cardinality_of(domain: &Domain) -> Result<f64, CausalError> {
    domain
        .cardinality()
        .map(|size| size as f64)
        .ok_or_else(|| {
            CausalError::DomainValidation(
                "continuous domains have no finite cell count".to_string(),
            )
        })
}
