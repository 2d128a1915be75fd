//! Capture-avoiding substitution: binding variables to values and wrapping
//! variables in the do-operator, without descending through the namespace
//! modifiers that shadow them.

use crate::errors::CausalError;
use crate::expression::node::Expr;
use crate::expression::traversal::AdaptVisitor;
use crate::symbols::value::Value;
use crate::symbols::variable::Variable;

use std::collections::BTreeMap;

/// A map of variable bindings applied together.
pub type Bindings = BTreeMap<Variable, Value>;

struct AssignVisitor<'a> {
    var: &'a Variable,
    val: &'a Value,
}

impl AdaptVisitor for AssignVisitor<'_> {
    fn child_visitor<'a>(&'a self, node: &Expr) -> Option<&'a dyn AdaptVisitor> {
        match node {
            // leaves are handled in the transform
            Expr::P(_) => None,
            // a modifier binding the variable shadows the whole subtree
            Expr::Marginal(sub, _) if sub.contains(self.var) => None,
            Expr::Expectation(sub, _) if sub == self.var => None,
            _ => Some(self),
        }
    }

    fn transform(&self, node: Expr) -> Result<Expr, CausalError> {
        match node {
            Expr::P(p) => Ok(Expr::P(p.assign(self.var, self.val)?)),
            other => Ok(other),
        }
    }
}

struct InterveneVisitor<'a> {
    var: &'a Variable,
}

impl AdaptVisitor for InterveneVisitor<'_> {
    fn child_visitor<'a>(&'a self, node: &Expr) -> Option<&'a dyn AdaptVisitor> {
        match node {
            Expr::P(_) => None,
            Expr::Marginal(sub, _) if sub.contains(self.var) => None,
            Expr::Expectation(sub, _) if sub == self.var => None,
            _ => Some(self),
        }
    }

    fn transform(&self, node: Expr) -> Result<Expr, CausalError> {
        match node {
            Expr::P(p) => Ok(Expr::P(p.intervene(self.var))),
            other => Ok(other),
        }
    }
}

impl Expr {
    /// Bind `var` to `val` throughout the expression.
    ///
    /// The substitution rewrites open occurrences at probability leaves into
    /// equality events and pins open interventions, but does not descend
    /// through a marginal sum or expectation that binds `var`. Binding a
    /// variable that already carries a different value is a contradiction.
    pub fn assign(&self, var: &Variable, val: impl Into<Value>) -> Result<Expr, CausalError> {
        let val = val.into();
        self.r_adapt_map(&AssignVisitor { var, val: &val })
    }

    /// Apply a whole set of bindings, one variable at a time. The order does
    /// not matter: assignments to distinct variables commute.
    pub fn assign_all(&self, bindings: &Bindings) -> Result<Expr, CausalError> {
        let mut expr = self.clone();
        for (var, val) in bindings {
            expr = expr.assign(var, val.clone())?;
        }
        Ok(expr)
    }

    /// Wrap every occurrence of `var` behind a conditioning bar in the
    /// do-operator, without descending through modifiers that bind `var`.
    pub fn intervene(&self, var: &Variable) -> Expr {
        // the intervene transform cannot fail
        match self.r_adapt_map(&InterveneVisitor { var }) {
            Ok(expr) => expr,
            Err(_) => unreachable!("intervention does not produce errors"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::CausalError;
    use crate::expression::node::{Expr, PGiven, PVar};
    use crate::expression::substitution::Bindings;
    use crate::symbols::event::EqualityEvent;
    use crate::symbols::variable::make_vars;

    #[test]
    /// Test that assignment rewrites open occurrences on both sides of the bar.
    fn assign_rewrites_leaves() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (vars[0].clone(), vars[1].clone());

        let expr = Expr::mk_conditional(&[y.clone()], &[x.clone()]).unwrap();
        let bound = expr.assign(&y, 1).unwrap().assign(&x, 0).unwrap();
        assert_eq!(bound.to_string(), "P(y = 1 | x = 0)");

        // assignment reaches into open interventions as well
        let expr = Expr::mk_p(vec![PVar::Var(y.clone())], vec![PGiven::do_var(x.clone())]).unwrap();
        let bound = expr.assign(&x, 1).unwrap();
        assert_eq!(bound.to_string(), "P(y | do(x = 1))");
    }

    #[test]
    /// Test commutativity of assignments to distinct variables.
    fn assign_commutes() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (vars[0].clone(), vars[1].clone());
        let expr = Expr::mk_joint(&[x.clone(), y.clone()]).unwrap()
            / Expr::mk_joint(&[x.clone()]).unwrap();

        let ab = expr.assign(&x, 1).unwrap().assign(&y, 0).unwrap();
        let ba = expr.assign(&y, 0).unwrap().assign(&x, 1).unwrap();
        assert_eq!(ab, ba);

        let mut bindings = Bindings::new();
        bindings.insert(x.clone(), 1.into());
        bindings.insert(y.clone(), 0.into());
        assert_eq!(expr.assign_all(&bindings).unwrap(), ab);
    }

    #[test]
    /// Test that namespace modifiers shadow their bound variables.
    fn assign_respects_shadowing() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (vars[0].clone(), vars[1].clone());

        let marginal = Expr::mk_marginal(
            vec![x.clone()],
            Expr::mk_joint(&[x.clone(), y.clone()]).unwrap(),
        );
        assert_eq!(marginal.assign(&x, 1).unwrap(), marginal);
        // an unshadowed variable still gets bound inside
        assert_eq!(
            marginal.assign(&y, 1).unwrap().to_string(),
            "Σ_(x) [ P(x, y = 1) ]"
        );

        let expectation = Expr::mk_expectation(y.clone(), Expr::mk_joint(&[y.clone()]).unwrap());
        assert_eq!(expectation.assign(&y, 0).unwrap(), expectation);
    }

    #[test]
    /// Test contradiction detection on conflicting constraints.
    fn assign_detects_contradictions() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (vars[0].clone(), vars[1].clone());

        let expr = Expr::mk_p(
            vec![PVar::Var(y.clone())],
            vec![PGiven::Event(EqualityEvent::new(x.clone(), 0))],
        )
        .unwrap();
        assert!(matches!(
            expr.assign(&x, 1),
            Err(CausalError::Contradiction(_))
        ));
        // re-binding the same value is harmless
        assert!(expr.assign(&x, 0).is_ok());
    }

    #[test]
    /// Test wrapping conditioned variables in the do-operator.
    fn intervene_wraps_given() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (vars[0].clone(), vars[1].clone(), vars[2].clone());

        let expr = Expr::mk_p(
            vec![PVar::Var(y.clone())],
            vec![
                PGiven::Var(x.clone()),
                PGiven::Event(EqualityEvent::new(z.clone(), 1)),
            ],
        )
        .unwrap();

        assert_eq!(expr.intervene(&x).to_string(), "P(y | do(x), z = 1)");
        assert_eq!(expr.intervene(&z).to_string(), "P(y | x, do(z = 1))");
        // variables on the left of the bar are untouched
        assert_eq!(expr.intervene(&y).to_string(), "P(y | x, z = 1)");

        // shadowed by a marginal sum over the intervened variable
        let marginal = Expr::mk_marginal(vec![x.clone()], expr.clone());
        assert_eq!(marginal.intervene(&x), marginal);
    }
}
