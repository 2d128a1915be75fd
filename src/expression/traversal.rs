//! Canonical ordering, structural equality, and the recursive traversal
//! primitives of the expression tree.

use crate::errors::CausalError;
use crate::expression::node::{Expr, PGiven, PVar, Probability};
use crate::symbols::variable::Variable;

use std::collections::BTreeSet;

impl Probability {
    /// Canonical copy with both item lists in lexicographic order of their
    /// rendered form.
    pub fn sorted(&self) -> Probability {
        let mut vars = self.vars.clone();
        vars.sort_by_key(|item| item.to_string());
        let mut given = self.given.clone();
        given.sort_by_key(|item| item.to_string());
        Probability { vars, given }
    }
}

impl Expr {
    /// Canonical copy of the expression.
    ///
    /// Commutative children are sorted lexicographically by their rendered
    /// form: the children of a product, the two item lists of a probability,
    /// and the bound variables of a marginal. Quotients, differences,
    /// expectations, and literals keep their positional order. Sorting is
    /// recursive, and no algebraic identity is rewritten.
    pub fn sorted(&self) -> Expr {
        match self {
            Expr::P(p) => Expr::P(p.sorted()),
            Expr::Product(children) => {
                let mut sorted: Vec<Expr> = children.iter().map(Expr::sorted).collect();
                sorted.sort_by_key(|child| child.to_string());
                Expr::Product(sorted)
            }
            Expr::Quotient(numer, denom) => Expr::mk_quotient(numer.sorted(), denom.sorted()),
            Expr::Difference(a, b) => Expr::mk_difference(a.sorted(), b.sorted()),
            Expr::Marginal(sub, body) => {
                let mut sub = sub.clone();
                sub.sort();
                Expr::mk_marginal(sub, body.sorted())
            }
            Expr::Expectation(sub, body) => Expr::mk_expectation(sub.clone(), body.sorted()),
            Expr::Hedge => Expr::Hedge,
            Expr::Literal(literal) => Expr::Literal(literal.clone()),
        }
    }

    /// Strict structural comparison without canonicalization first.
    pub fn syntactic_eq(&self, other: &Expr) -> bool {
        match (self, other) {
            (Expr::P(a), Expr::P(b)) => a == b,
            (Expr::Product(a), Expr::Product(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.syntactic_eq(y))
            }
            (Expr::Quotient(an, ad), Expr::Quotient(bn, bd)) => {
                an.syntactic_eq(bn) && ad.syntactic_eq(bd)
            }
            (Expr::Difference(a1, a2), Expr::Difference(b1, b2)) => {
                a1.syntactic_eq(b1) && a2.syntactic_eq(b2)
            }
            (Expr::Marginal(asub, abody), Expr::Marginal(bsub, bbody)) => {
                asub == bsub && abody.syntactic_eq(bbody)
            }
            (Expr::Expectation(asub, abody), Expr::Expectation(bsub, bbody)) => {
                asub == bsub && abody.syntactic_eq(bbody)
            }
            (Expr::Hedge, Expr::Hedge) => true,
            (Expr::Literal(a), Expr::Literal(b)) => a == b,
            _ => false,
        }
    }

    /// Recursively map `map` over the tree, bottom-up. Children are rebuilt
    /// first, then `map` is applied to the rebuilt node. Probability terms,
    /// the failure sentinel, and literals are the leaves.
    pub fn r_map<F>(&self, map: &mut F) -> Expr
    where
        F: FnMut(Expr) -> Expr,
    {
        let rebuilt = match self {
            Expr::P(_) | Expr::Hedge | Expr::Literal(_) => self.clone(),
            Expr::Product(children) => {
                Expr::Product(children.iter().map(|child| child.r_map(map)).collect())
            }
            Expr::Quotient(numer, denom) => Expr::mk_quotient(numer.r_map(map), denom.r_map(map)),
            Expr::Difference(a, b) => Expr::mk_difference(a.r_map(map), b.r_map(map)),
            Expr::Marginal(sub, body) => Expr::mk_marginal(sub.clone(), body.r_map(map)),
            Expr::Expectation(sub, body) => Expr::mk_expectation(sub.clone(), body.r_map(map)),
        };
        map(rebuilt)
    }

    /// Recursively map a visitor over the tree, letting the visitor steer the
    /// descent. At each node, [AdaptVisitor::child_visitor] picks the visitor
    /// used for the children, or `None` to keep the subtree as a copy. The
    /// node rebuilt from the (possibly transformed) children is then passed
    /// through [AdaptVisitor::transform].
    pub fn r_adapt_map(&self, visitor: &dyn AdaptVisitor) -> Result<Expr, CausalError> {
        let rebuilt = match visitor.child_visitor(self) {
            None => self.clone(),
            Some(child_visitor) => match self {
                Expr::P(_) | Expr::Hedge | Expr::Literal(_) => self.clone(),
                Expr::Product(children) => {
                    let mut rebuilt = Vec::with_capacity(children.len());
                    for child in children {
                        rebuilt.push(child.r_adapt_map(child_visitor)?);
                    }
                    Expr::Product(rebuilt)
                }
                Expr::Quotient(numer, denom) => Expr::mk_quotient(
                    numer.r_adapt_map(child_visitor)?,
                    denom.r_adapt_map(child_visitor)?,
                ),
                Expr::Difference(a, b) => Expr::mk_difference(
                    a.r_adapt_map(child_visitor)?,
                    b.r_adapt_map(child_visitor)?,
                ),
                Expr::Marginal(sub, body) => {
                    Expr::mk_marginal(sub.clone(), body.r_adapt_map(child_visitor)?)
                }
                Expr::Expectation(sub, body) => {
                    Expr::mk_expectation(sub.clone(), body.r_adapt_map(child_visitor)?)
                }
            },
        };
        visitor.transform(rebuilt)
    }

    /// The set of variables occurring unbound at probability leaves, excluding
    /// those shadowed by an enclosing marginal sum or expectation.
    pub fn free_variables(&self) -> BTreeSet<Variable> {
        let mut free = BTreeSet::new();
        let mut bound = BTreeSet::new();
        self.collect_free(&mut bound, &mut free);
        free
    }

    fn collect_free(&self, bound: &mut BTreeSet<Variable>, free: &mut BTreeSet<Variable>) {
        match self {
            Expr::P(p) => {
                for var in p.vars.iter().filter_map(|item| match item {
                    PVar::Var(var) => Some(var),
                    _ => None,
                }) {
                    if !bound.contains(var) {
                        free.insert(var.clone());
                    }
                }
                for item in &p.given {
                    let open = match item {
                        PGiven::Var(var) => Some(var),
                        PGiven::Do(event) if event.value().is_none() => Some(event.var()),
                        _ => None,
                    };
                    if let Some(var) = open {
                        if !bound.contains(var) {
                            free.insert(var.clone());
                        }
                    }
                }
            }
            Expr::Hedge | Expr::Literal(_) => {}
            Expr::Product(children) => {
                for child in children {
                    child.collect_free(bound, free);
                }
            }
            Expr::Quotient(a, b) | Expr::Difference(a, b) => {
                a.collect_free(bound, free);
                b.collect_free(bound, free);
            }
            Expr::Marginal(sub, body) => {
                let added: Vec<Variable> = sub
                    .iter()
                    .filter(|var| bound.insert((*var).clone()))
                    .cloned()
                    .collect();
                body.collect_free(bound, free);
                for var in added {
                    bound.remove(&var);
                }
            }
            Expr::Expectation(sub, body) => {
                let added = bound.insert(sub.clone());
                body.collect_free(bound, free);
                if added {
                    bound.remove(sub);
                }
            }
        }
    }
}

/// A visitor steering [Expr::r_adapt_map]: it decides, per node, which visitor
/// the children see (or that the subtree is kept untouched), and applies a
/// post-transform to the rebuilt node.
pub trait AdaptVisitor {
    /// The visitor to use for the children of `node`, or `None` to keep the
    /// subtree below `node` as a copy. The transform still runs on the copy.
    fn child_visitor<'a>(&'a self, node: &Expr) -> Option<&'a dyn AdaptVisitor>;

    /// The transform applied to the rebuilt node.
    fn transform(&self, node: Expr) -> Result<Expr, CausalError>;
}

/// Two expressions are equal when their canonical forms coincide structurally.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.sorted().syntactic_eq(&other.sorted())
    }
}

#[cfg(test)]
mod tests {
    use crate::expression::node::{Expr, PGiven, PVar};
    use crate::symbols::event::EqualityEvent;
    use crate::symbols::variable::make_vars;

    #[test]
    /// Test canonical equality of commutative constructs.
    fn canonical_equality() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (vars[0].clone(), vars[1].clone(), vars[2].clone());

        let xy = Expr::mk_joint(&[x.clone(), y.clone()]).unwrap();
        let yx = Expr::mk_joint(&[y.clone(), x.clone()]).unwrap();
        assert_eq!(xy, yx);
        assert_eq!(xy, xy);

        let px = Expr::mk_joint(&[x.clone()]).unwrap();
        let py = Expr::mk_joint(&[y.clone()]).unwrap();
        assert_eq!(px.clone() * py.clone(), py.clone() * px.clone());

        // conditioning lists are commutative as well
        let a = Expr::mk_conditional(&[x.clone()], &[y.clone(), z.clone()]).unwrap();
        let b = Expr::mk_conditional(&[x.clone()], &[z.clone(), y.clone()]).unwrap();
        assert_eq!(a, b);

        // marginal bound lists are commutative
        let m1 = Expr::mk_marginal(vec![y.clone(), z.clone()], px.clone());
        let m2 = Expr::mk_marginal(vec![z.clone(), y.clone()], px.clone());
        assert_eq!(m1, m2);
    }

    #[test]
    /// Test that positional constructs do not commute.
    fn positional_inequality() {
        let vars = make_vars(&["x", "y"]);
        let px = Expr::mk_joint(&[vars[0].clone()]).unwrap();
        let py = Expr::mk_joint(&[vars[1].clone()]).unwrap();

        assert_ne!(px.clone() / py.clone(), py.clone() / px.clone());
        assert_ne!(px.clone() - py.clone(), py.clone() - px.clone());
    }

    #[test]
    /// Test that canonicalization does not rewrite algebraic identities.
    fn no_algebraic_rewriting() {
        let vars = make_vars(&["x"]);
        let px = Expr::mk_joint(&[vars[0].clone()]).unwrap();
        let unit = Expr::mk_p(Vec::new(), Vec::new()).unwrap();
        assert_ne!(px.clone() * unit.clone(), px.clone());
        // nested products are not flattened either
        let nested = Expr::mk_product(vec![Expr::mk_product(vec![px.clone()])]);
        assert_ne!(nested, Expr::mk_product(vec![px]));
    }

    #[test]
    /// Test bottom-up rebuilding through r_map.
    fn r_map_rebuilds_bottom_up() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (vars[0].clone(), vars[1].clone());
        let expr = Expr::mk_marginal(
            vec![x.clone()],
            Expr::mk_joint(&[x.clone()]).unwrap() * Expr::mk_joint(&[y.clone()]).unwrap(),
        );

        // count visited nodes: marginal, product, and the two leaves
        let mut count = 0;
        let mapped = expr.r_map(&mut |node| {
            count += 1;
            node
        });
        assert_eq!(count, 4);
        assert_eq!(mapped, expr);
    }

    #[test]
    /// Test free variable collection under shadowing.
    fn free_variables_shadowed() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (vars[0].clone(), vars[1].clone(), vars[2].clone());

        let leaf = Expr::mk_p(
            vec![PVar::Var(x.clone())],
            vec![
                PGiven::Var(y.clone()),
                PGiven::Event(EqualityEvent::new(z.clone(), 0)),
            ],
        )
        .unwrap();
        // the event on z is bound, so only x and y are free
        let free = leaf.free_variables();
        assert!(free.contains(&x) && free.contains(&y) && !free.contains(&z));

        let shadowed = Expr::mk_marginal(vec![x.clone()], leaf.clone()).free_variables();
        assert!(!shadowed.contains(&x) && shadowed.contains(&y));

        let expectation = Expr::mk_expectation(y.clone(), leaf).free_variables();
        assert!(expectation.contains(&x) && !expectation.contains(&y));
    }
}
