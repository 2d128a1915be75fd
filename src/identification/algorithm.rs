//! The identification algorithm for interventional queries on mixed graphs,
//! and its extension to conditional queries.
//!
//! The recursion threads a representation of the current observational
//! distribution through itself: a plain joint marginal, a product of
//! conditional factors (each rendered as a quotient of joint marginals), or a
//! general expression once marginal sums have been wrapped around a product.
//! Keeping products and quotients flat in a small normal form is what makes
//! the emitted expressions match the textbook adjustment formulas.

use crate::errors::CausalError;
use crate::expression::node::{Expr, PVar, Probability};
use crate::graph::graph::Graph;
use crate::identification::d_separation::d_separated;
use crate::symbols::variable::Variable;

use std::collections::BTreeSet;

/// A flat product of numerator factors over a flat product of denominator
/// factors. The normal form the recursion accumulates results in.
#[derive(Clone, Debug, Default)]
pub(crate) struct Fraction {
    numer: Vec<Expr>,
    denom: Vec<Expr>,
}

impl Fraction {
    fn single(expr: Expr) -> Fraction {
        Fraction {
            numer: vec![expr],
            denom: Vec::new(),
        }
    }

    /// Multiply fractions by concatenating their factor lists.
    fn merge(parts: Vec<Fraction>) -> Fraction {
        let mut merged = Fraction::default();
        for part in parts {
            merged.numer.extend(part.numer);
            merged.denom.extend(part.denom);
        }
        merged
    }

    /// Wrap the fraction in a marginal sum, collapsing it into a single
    /// numerator factor. An empty sum set leaves the fraction untouched.
    fn summed_over(self, sumset: &BTreeSet<Variable>) -> Fraction {
        if sumset.is_empty() {
            return self;
        }
        Fraction::single(Expr::mk_marginal(
            sumset.iter().cloned().collect(),
            self.into_expr(),
        ))
    }

    /// Collapse the normal form into an expression tree.
    pub(crate) fn into_expr(self) -> Expr {
        let numer = Self::product_of(self.numer);
        if self.denom.is_empty() {
            numer
        } else {
            Expr::mk_quotient(numer, Self::product_of(self.denom))
        }
    }

    fn product_of(mut factors: Vec<Expr>) -> Expr {
        match factors.len() {
            0 => joint_over(&BTreeSet::new()),
            1 => factors.remove(0),
            _ => Expr::mk_product(factors),
        }
    }
}

/// A joint probability over a sorted set of bare variables.
fn joint_over(vars: &BTreeSet<Variable>) -> Expr {
    Expr::P(Probability {
        vars: vars.iter().cloned().map(PVar::Var).collect(),
        given: Vec::new(),
    })
}

/// One conditional factor `P(var | cond)`, rendered as a quotient of joint
/// marginals of the observational distribution.
#[derive(Clone, Debug)]
struct CondFactor {
    var: Variable,
    cond: BTreeSet<Variable>,
}

impl CondFactor {
    fn to_fraction(&self) -> Fraction {
        if self.cond.is_empty() {
            let mut vars = BTreeSet::new();
            vars.insert(self.var.clone());
            return Fraction::single(joint_over(&vars));
        }
        let mut joint = self.cond.clone();
        joint.insert(self.var.clone());
        Fraction {
            numer: vec![joint_over(&joint)],
            denom: vec![joint_over(&self.cond)],
        }
    }
}

/// The distribution the recursion currently manipulates.
#[derive(Clone, Debug)]
enum Dist {
    /// A marginal of the observational joint over the given variables.
    Joint(BTreeSet<Variable>),
    /// A product of conditional factors of the observational joint.
    Factors(Vec<CondFactor>),
    /// An arbitrary expression over the given variable scope.
    General(Box<Expr>, BTreeSet<Variable>),
}

impl Dist {
    fn scope(&self) -> BTreeSet<Variable> {
        match self {
            Dist::Joint(vars) => vars.clone(),
            Dist::Factors(factors) => {
                factors.iter().map(|factor| factor.var.clone()).collect()
            }
            Dist::General(_, scope) => scope.clone(),
        }
    }

    /// Sum out `sumset`. Joint marginals shrink exactly; everything else is
    /// wrapped in a symbolic marginal sum.
    fn marginalize(self, sumset: &BTreeSet<Variable>) -> Dist {
        if sumset.is_empty() {
            return self;
        }
        match self {
            Dist::Joint(vars) => Dist::Joint(vars.difference(sumset).cloned().collect()),
            other => {
                let scope: BTreeSet<Variable> =
                    other.scope().difference(sumset).cloned().collect();
                let expr = Expr::mk_marginal(
                    sumset.iter().cloned().collect(),
                    other.into_fraction().into_expr(),
                );
                Dist::General(Box::new(expr), scope)
            }
        }
    }

    fn into_fraction(self) -> Fraction {
        match self {
            Dist::Joint(vars) => Fraction::single(joint_over(&vars)),
            Dist::Factors(factors) => Fraction::merge(
                factors.iter().map(CondFactor::to_fraction).collect(),
            ),
            Dist::General(expr, _) => Fraction::single(*expr),
        }
    }

    /// The conditional factor of `var` given `predecessors` under this
    /// distribution.
    fn factor(&self, var: &Variable, predecessors: &BTreeSet<Variable>) -> Fraction {
        match self {
            Dist::Joint(_) => CondFactor {
                var: var.clone(),
                cond: predecessors.clone(),
            }
            .to_fraction(),
            Dist::Factors(factors) => factors
                .iter()
                .find(|factor| &factor.var == var)
                .map(CondFactor::to_fraction)
                .unwrap_or_else(|| {
                    CondFactor {
                        var: var.clone(),
                        cond: predecessors.clone(),
                    }
                    .to_fraction()
                }),
            Dist::General(expr, scope) => {
                let mut kept = predecessors.clone();
                kept.insert(var.clone());
                let numer_sum: BTreeSet<Variable> =
                    scope.difference(&kept).cloned().collect();
                let denom_sum: BTreeSet<Variable> = scope
                    .difference(predecessors)
                    .cloned()
                    .collect();
                let numer =
                    Fraction::single(expr.as_ref().clone()).summed_over(&numer_sum);
                let denom =
                    Fraction::single(expr.as_ref().clone()).summed_over(&denom_sum);
                Fraction {
                    numer: vec![numer.into_expr()],
                    denom: vec![denom.into_expr()],
                }
            }
        }
    }

    /// Replace the distribution by the product, over `keep` in topological
    /// order, of each variable's conditional factor given all of its
    /// predecessors in that order.
    fn conditioned(&self, order: &[Variable], keep: &BTreeSet<Variable>) -> Dist {
        match self {
            Dist::Joint(_) => {
                let mut factors = Vec::new();
                let mut predecessors: BTreeSet<Variable> = BTreeSet::new();
                for var in order {
                    if keep.contains(var) {
                        factors.push(CondFactor {
                            var: var.clone(),
                            cond: predecessors.clone(),
                        });
                    }
                    predecessors.insert(var.clone());
                }
                Dist::Factors(factors)
            }
            Dist::Factors(factors) => Dist::Factors(
                factors
                    .iter()
                    .filter(|factor| keep.contains(&factor.var))
                    .cloned()
                    .collect(),
            ),
            general => {
                let mut parts = Vec::new();
                let mut predecessors: BTreeSet<Variable> = BTreeSet::new();
                for var in order {
                    if keep.contains(var) {
                        parts.push(general.factor(var, &predecessors));
                    }
                    predecessors.insert(var.clone());
                }
                Dist::General(Box::new(Fraction::merge(parts).into_expr()), keep.clone())
            }
        }
    }
}

/// Identify the interventional distribution `P(y | do(x))` against `graph`.
/// Returns the fraction normal form of the identified expression, or `None`
/// when the query is not identifiable.
fn id(
    y: &BTreeSet<Variable>,
    x: &BTreeSet<Variable>,
    p: Dist,
    graph: &Graph,
) -> Result<Option<Fraction>, CausalError> {
    let v = graph.nodes().clone();

    // with nothing intervened, the query is a marginal of the current joint
    if x.is_empty() {
        let rest: BTreeSet<Variable> = v.difference(y).cloned().collect();
        return Ok(Some(p.marginalize(&rest).into_fraction()));
    }

    // restrict to the ancestors of the outcome set
    let ancestors = graph.ancestors(y);
    if ancestors != v {
        let outside: BTreeSet<Variable> = v.difference(&ancestors).cloned().collect();
        let x_kept: BTreeSet<Variable> = x.intersection(&ancestors).cloned().collect();
        return id(
            y,
            &x_kept,
            p.marginalize(&outside),
            &graph.subgraph(&ancestors),
        );
    }

    // force variables that cannot influence the outcome into the intervention
    let reachable = graph.remove_incoming(x).ancestors(y);
    let forced: BTreeSet<Variable> = v
        .difference(x)
        .filter(|node| !reachable.contains(*node))
        .cloned()
        .collect();
    if !forced.is_empty() {
        let x_extended: BTreeSet<Variable> = x.union(&forced).cloned().collect();
        return id(y, &x_extended, p, graph);
    }

    // decompose over the confounded components of the unintervened part
    let rest: BTreeSet<Variable> = v.difference(x).cloned().collect();
    let components = graph.subgraph(&rest).c_components();
    if components.len() > 1 {
        let mut parts = Vec::with_capacity(components.len());
        for component in &components {
            let others: BTreeSet<Variable> = v.difference(component).cloned().collect();
            match id(component, &others, p.clone(), graph)? {
                None => return Ok(None),
                Some(part) => parts.push(part),
            }
        }
        let sumset: BTreeSet<Variable> = rest.difference(y).cloned().collect();
        return Ok(Some(Fraction::merge(parts).summed_over(&sumset)));
    }

    // a single confounded component remains
    let Some(component) = components.first() else {
        // the query degenerated to a constant
        return Ok(Some(Fraction::default()));
    };
    let anchor = component
        .first()
        .expect("confounded components are never empty");
    let enclosing = graph
        .c_components()
        .into_iter()
        .find(|candidate| candidate.contains(anchor))
        .expect("every node lies in some confounded component");

    if enclosing == v {
        // the hedge: interventions and outcomes share one confounded component
        return Ok(None);
    }

    let order = graph.topological_sort()?;
    if component == &enclosing {
        // the component factorizes against the current distribution
        let mut parts = Vec::new();
        let mut predecessors: BTreeSet<Variable> = BTreeSet::new();
        for var in &order {
            if component.contains(var) {
                parts.push(p.factor(var, &predecessors));
            }
            predecessors.insert(var.clone());
        }
        let sumset: BTreeSet<Variable> = component.difference(y).cloned().collect();
        return Ok(Some(Fraction::merge(parts).summed_over(&sumset)));
    }

    // recurse into the enclosing component with re-conditioned factors
    let p_conditioned = p.conditioned(&order, &enclosing);
    let x_kept: BTreeSet<Variable> = x.intersection(&enclosing).cloned().collect();
    id(y, &x_kept, p_conditioned, &graph.subgraph(&enclosing))
}

/// Identify the conditional interventional distribution `P(y | do(x), z)`.
///
/// Conditioning variables that are d-separated from the outcomes in the
/// appropriately mutilated graph are promoted into the intervention set one
/// at a time. Whatever conditioning remains afterwards is handled by dividing
/// the joint identification by its own sum over the outcomes.
pub(crate) fn idc(
    y: &BTreeSet<Variable>,
    x: &BTreeSet<Variable>,
    z: &BTreeSet<Variable>,
    graph: &Graph,
) -> Result<Expr, CausalError> {
    // identification is only sound on acyclic diagrams
    graph.topological_sort()?;
    for var in y.iter().chain(x.iter()).chain(z.iter()) {
        if !graph.nodes().contains(var) {
            return Err(CausalError::UnknownVariable(format!(
                "{var} is not in the graph"
            )));
        }
    }

    let mut x = x.clone();
    let mut z = z.clone();
    let mut moved = true;
    while moved {
        moved = false;
        for candidate in z.clone() {
            let mut singleton = BTreeSet::new();
            singleton.insert(candidate.clone());
            let mutilated = graph.remove_incoming(&x).remove_outgoing(&singleton);
            let mut given: BTreeSet<Variable> = x.union(&z).cloned().collect();
            given.remove(&candidate);
            if d_separated(&mutilated, y, &singleton, &given) {
                z.remove(&candidate);
                x.insert(candidate);
                moved = true;
                break;
            }
        }
    }

    let scope = graph.nodes().clone();
    if z.is_empty() {
        return match id(y, &x, Dist::Joint(scope), graph)? {
            None => Ok(Expr::Hedge),
            Some(fraction) => Ok(fraction.into_expr()),
        };
    }

    let outcomes: BTreeSet<Variable> = y.union(&z).cloned().collect();
    match id(&outcomes, &x, Dist::Joint(scope), graph)? {
        None => Ok(Expr::Hedge),
        Some(fraction) => {
            let numer = fraction.into_expr();
            let denom = Expr::mk_marginal(y.iter().cloned().collect(), numer.clone());
            Ok(Expr::mk_quotient(numer, denom))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::expression::node::Expr;
    use crate::graph::graph::Graph;
    use crate::identification::algorithm::idc;
    use crate::symbols::variable::{Variable, make_vars};

    use std::collections::BTreeSet;

    fn set(names: &[&str]) -> BTreeSet<Variable> {
        names.iter().map(|name| Variable::new(name)).collect()
    }

    fn run_idc(g: &Graph, y: &[&str], x: &[&str], z: &[&str]) -> Expr {
        idc(&set(y), &set(x), &set(z), g).unwrap()
    }

    #[test]
    /// Test the back-door adjustment formula.
    fn back_door() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (&vars[0], &vars[1], &vars[2]);
        let g = Graph::new(vec![x << z, y << z, y << x]);

        let identified = run_idc(&g, &["y"], &["x"], &[]);

        let p_z = Expr::mk_joint(&[z.clone()]).unwrap();
        let p_xyz = Expr::mk_joint(&[x.clone(), y.clone(), z.clone()]).unwrap();
        let p_xz = Expr::mk_joint(&[x.clone(), z.clone()]).unwrap();
        let expected = Expr::mk_marginal(vec![z.clone()], (p_z * p_xyz) / p_xz);
        assert_eq!(identified, expected);
    }

    #[test]
    /// Test the front-door adjustment formula.
    fn front_door() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (&vars[0], &vars[1], &vars[2]);
        let g = Graph::new(vec![z << x, y << z, x & y]);

        let identified = run_idc(&g, &["y"], &["x"], &[]);

        let p_x = Expr::mk_joint(&[x.clone()]).unwrap();
        let p_xyz = Expr::mk_joint(&[x.clone(), y.clone(), z.clone()]).unwrap();
        let p_xz = Expr::mk_joint(&[x.clone(), z.clone()]).unwrap();
        let inner = Expr::mk_marginal(
            vec![x.clone()],
            p_x.clone() * p_xyz.clone() / p_xz.clone(),
        );
        let expected = Expr::mk_marginal(vec![z.clone()], (inner * p_xz) / p_x);
        assert_eq!(identified, expected);
    }

    #[test]
    /// Test that interventions on causally irrelevant variables drop away.
    fn irrelevant_interventions() {
        let vars = make_vars(&["x", "y", "z", "m"]);
        let (x, y, z, m) = (&vars[0], &vars[1], &vars[2], &vars[3]);
        let g = Graph::new(vec![z << x, y << z, m << y]);

        let identified = run_idc(&g, &["y"], &["m"], &[]);
        assert_eq!(identified, Expr::mk_joint(&[y.clone()]).unwrap());

        let identified = run_idc(&g, &["x"], &["m", "y"], &[]);
        assert_eq!(identified, Expr::mk_joint(&[x.clone()]).unwrap());
    }

    #[test]
    /// Test that the bow diagram is not identifiable.
    fn bow_is_hedged() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (&vars[0], &vars[1]);
        let g = Graph::new(vec![y << x, x & y]);

        let identified = run_idc(&g, &["y"], &["x"], &[]);
        assert_eq!(identified, Expr::Hedge);
        assert!(identified.contains_hedge());
    }

    #[test]
    /// Test that a d-separated conditioning variable is promoted into the
    /// intervention set.
    fn conditional_promotion() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (&vars[0], &vars[1], &vars[2]);
        let g = Graph::new(vec![x << z, y << z, y << x]);

        // in the back-door diagram, z separates from y once x is intervened
        // and z is promoted, so the answer is the plain conditional
        let identified = run_idc(&g, &["y"], &["x"], &["z"]);
        let p_xyz = Expr::mk_joint(&[x.clone(), y.clone(), z.clone()]).unwrap();
        let p_xz = Expr::mk_joint(&[x.clone(), z.clone()]).unwrap();
        assert_eq!(identified, p_xyz / p_xz);
    }

    #[test]
    /// Test the quotient pattern for conditioning that cannot be promoted.
    fn conditional_quotient() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (&vars[0], &vars[1], &vars[2]);
        // z is a direct effect of y, so it never separates from y
        let g = Graph::new(vec![y << x, z << y]);

        let identified = run_idc(&g, &["y"], &["x"], &["z"]);
        let numer = run_idc(&g, &["y", "z"], &["x"], &[]);
        let expected = Expr::mk_quotient(
            numer.clone(),
            Expr::mk_marginal(vec![y.clone()], numer),
        );
        assert_eq!(identified, expected);
        assert!(matches!(identified, Expr::Quotient(..)));
    }

    #[test]
    /// Test input validation of the conditional entry point.
    fn input_validation() {
        let vars = make_vars(&["x", "y", "ghost"]);
        let (x, y) = (&vars[0], &vars[1]);
        let g = Graph::new(vec![y << x]);

        assert!(idc(&set(&["ghost"]), &set(&["x"]), &set(&[]), &g).is_err());

        let cyclic = Graph::new(vec![y << x, x << y]);
        assert!(idc(&set(&["y"]), &set(&["x"]), &set(&[]), &cyclic).is_err());
    }
}
