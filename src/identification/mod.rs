//! Identification of causal queries: rewriting interventional expressions
//! into observational ones against a causal diagram, with every rewrite
//! recorded in the ledger.

pub mod algorithm;
pub mod d_separation;
pub mod estimands;

pub use estimands::{Ate, Cate, CausalEstimand, conditions};

use crate::errors::CausalError;
use crate::expression::node::{Expr, PGiven, PVar, Probability};
use crate::graph::graph::Graph;
use crate::identification::algorithm::idc;
use crate::provenance::result::{
    LedgerResult, OpArg, Operation, Provenance, entrypoint, expression_result,
};
use crate::provenance::step::{Recorded, Step};
use crate::symbols::value::Value;
use crate::symbols::variable::Variable;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The outcome of an identification run: the rewritten estimand and the
/// ledger node narrating how it was derived.
#[derive(Clone, Debug)]
pub struct IdentificationResult {
    pub identified_estimand: Expr,
    pub provenance: Arc<Provenance>,
}

impl LedgerResult for IdentificationResult {
    fn expected_keys() -> &'static [&'static str] {
        &["identified_estimand"]
    }

    fn from_provenance(node: Arc<Provenance>) -> Result<Self, CausalError> {
        Ok(IdentificationResult {
            identified_estimand: expression_result(&node, "identified_estimand")?,
            provenance: node,
        })
    }
}

/// Cache key: the sorted names of the outcome, intervention, and conditioning
/// sets of one interventional leaf.
type QueryKey = (Vec<String>, Vec<String>, Vec<String>);

fn names_of(vars: &BTreeSet<Variable>) -> Vec<String> {
    vars.iter().map(|var| var.name().to_string()).collect()
}

/// Walk the estimand and replace every probability leaf carrying
/// interventions by its identified counterpart, reapplying the value
/// assignments present at the leaf afterwards.
fn substitute_interventional(
    expr: &Expr,
    graph: &Graph,
    cache: &mut BTreeMap<QueryKey, Expr>,
    step: &mut Step,
) -> Result<Expr, CausalError> {
    match expr {
        Expr::P(p) if p.has_interventions() => {
            let measured = p.measured();
            let intervened = p.intervened();
            let conditioned = p.conditioned();

            let y: BTreeSet<Variable> = measured.keys().cloned().collect();
            let x: BTreeSet<Variable> = intervened.keys().cloned().collect();
            let z: BTreeSet<Variable> = conditioned.keys().cloned().collect();
            let key = (names_of(&y), names_of(&x), names_of(&z));

            let cached = cache.get(&key).cloned();
            let identified = match cached {
                Some(hit) => hit,
                None => {
                    let computed = step.substep("IDC", |sub| {
                        let query = Expr::P(Probability {
                            vars: y.iter().cloned().map(PVar::Var).collect(),
                            given: z
                                .iter()
                                .cloned()
                                .map(PGiven::Var)
                                .chain(x.iter().cloned().map(PGiven::do_var))
                                .collect(),
                        });
                        sub.note("Input:");
                        sub.note(query.to_string());
                        let result = idc(&y, &x, &z, graph)?;
                        sub.note("Output:");
                        sub.note(result.to_string());
                        Ok(result)
                    })?;
                    cache.insert(key, computed.clone());
                    computed
                }
            };

            // restore the concrete values the leaf carried
            let mut restored = identified;
            for (var, val) in conditioned
                .iter()
                .chain(intervened.iter())
                .chain(measured.iter())
            {
                if let Some(val) = val {
                    restored = restored.assign(var, val.clone())?;
                }
            }
            Ok(restored)
        }
        Expr::P(_) | Expr::Hedge | Expr::Literal(_) => Ok(expr.clone()),
        Expr::Product(children) => {
            let mut rebuilt = Vec::with_capacity(children.len());
            for child in children {
                rebuilt.push(substitute_interventional(child, graph, cache, step)?);
            }
            Ok(Expr::mk_product(rebuilt))
        }
        Expr::Quotient(numer, denom) => Ok(Expr::mk_quotient(
            substitute_interventional(numer, graph, cache, step)?,
            substitute_interventional(denom, graph, cache, step)?,
        )),
        Expr::Difference(a, b) => Ok(Expr::mk_difference(
            substitute_interventional(a, graph, cache, step)?,
            substitute_interventional(b, graph, cache, step)?,
        )),
        Expr::Marginal(sub, body) => Ok(Expr::mk_marginal(
            sub.clone(),
            substitute_interventional(body, graph, cache, step)?,
        )),
        Expr::Expectation(sub, body) => Ok(Expr::mk_expectation(
            sub.clone(),
            substitute_interventional(body, graph, cache, step)?,
        )),
    }
}

impl Graph {
    /// Identify an arbitrary causal estimand against this diagram.
    ///
    /// Every probability leaf of the unfolded estimand that carries an
    /// intervention is replaced by an equivalent expression over the
    /// observational distribution. When a leaf is not identifiable, the
    /// failure sentinel takes its place; the result is still returned, and
    /// rejecting it is left to downstream consumers.
    pub fn identify(
        &self,
        estimand: &dyn CausalEstimand,
    ) -> Result<IdentificationResult, CausalError> {
        let expression = estimand.expression();
        let operation =
            Operation::new("Graph::identify").with_arg(OpArg::Expression(expression.clone()));
        let name = estimand.name().to_string();

        entrypoint("Identification", operation, |step| {
            step.note(format!("We will identify the {name} using IDC."));
            step.assume("Non-contradictory evidence");
            step.assume("Acyclicity");
            step.assume("Positivity");

            let mut cache: BTreeMap<QueryKey, Expr> = BTreeMap::new();
            let identified = substitute_interventional(&expression, self, &mut cache, step)?;
            step.derive("identified_estimand", Recorded::Expression(identified));
            Ok(())
        })
    }

    /// Identify the average treatment effect of the given treatment and
    /// control conditions on the outcome.
    pub fn identify_ate(
        &self,
        outcome: &Variable,
        treatment: BTreeMap<Variable, Value>,
        control: BTreeMap<Variable, Value>,
    ) -> Result<IdentificationResult, CausalError> {
        let ate = Ate::new(outcome.clone(), conditions(treatment), conditions(control))?;
        self.identify(&ate)
    }

    /// Identify the conditional average treatment effect within the given
    /// subpopulation.
    pub fn identify_cate(
        &self,
        outcome: &Variable,
        treatment: BTreeMap<Variable, Value>,
        control: BTreeMap<Variable, Value>,
        subpopulation: BTreeMap<Variable, Value>,
    ) -> Result<IdentificationResult, CausalError> {
        let cate = Cate::new(
            outcome.clone(),
            conditions(treatment),
            conditions(control),
            conditions(subpopulation),
        )?;
        self.identify(&cate)
    }
}
