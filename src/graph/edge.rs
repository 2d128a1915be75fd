//! Edge kinds of the causal diagram and the infix construction sugar.

use crate::symbols::variable::Variable;

use std::fmt;
use std::ops::{BitAnd, Shl};

/// A directed edge `from -> to`, representing direct causal influence.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DirectedEdge {
    pub from: Variable,
    pub to: Variable,
}

impl DirectedEdge {
    pub fn new(from: Variable, to: Variable) -> DirectedEdge {
        DirectedEdge { from, to }
    }
}

impl fmt::Display for DirectedEdge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// An unordered edge `a <-> b`, representing an unobserved common cause.
#[derive(Clone, Debug, Eq)]
pub struct BidirectedEdge {
    pub a: Variable,
    pub b: Variable,
}

impl BidirectedEdge {
    pub fn new(a: Variable, b: Variable) -> BidirectedEdge {
        BidirectedEdge { a, b }
    }
}

/// Endpoint order does not matter for bidirected edges.
impl PartialEq for BidirectedEdge {
    fn eq(&self, other: &Self) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }
}

impl fmt::Display for BidirectedEdge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} <-> {}", self.a, self.b)
    }
}

/// An edge argument accepted by graph construction. Groups are flattened, so
/// the infix sugar can distribute over lists of variables.
#[derive(Clone, Debug, PartialEq)]
pub enum Edge {
    Directed(DirectedEdge),
    Bidirected(BidirectedEdge),
    Group(Vec<Edge>),
}

impl From<DirectedEdge> for Edge {
    fn from(edge: DirectedEdge) -> Self {
        Edge::Directed(edge)
    }
}

impl From<BidirectedEdge> for Edge {
    fn from(edge: BidirectedEdge) -> Self {
        Edge::Bidirected(edge)
    }
}

// `&effect << &cause` reads "effect gets an arrow from cause" and builds the
// directed edge cause -> effect.

impl Shl<&Variable> for &Variable {
    type Output = Edge;

    fn shl(self, cause: &Variable) -> Edge {
        Edge::Directed(DirectedEdge::new(cause.clone(), self.clone()))
    }
}

impl Shl<Vec<&Variable>> for &Variable {
    type Output = Edge;

    fn shl(self, causes: Vec<&Variable>) -> Edge {
        Edge::Group(causes.into_iter().map(|cause| self << cause).collect())
    }
}

impl Shl<&Variable> for Vec<&Variable> {
    type Output = Edge;

    fn shl(self, cause: &Variable) -> Edge {
        Edge::Group(self.into_iter().map(|effect| effect << cause).collect())
    }
}

// `&a & &b` builds the bidirected (confounding) edge between a and b.

impl BitAnd<&Variable> for &Variable {
    type Output = Edge;

    fn bitand(self, other: &Variable) -> Edge {
        Edge::Bidirected(BidirectedEdge::new(self.clone(), other.clone()))
    }
}

impl BitAnd<Vec<&Variable>> for &Variable {
    type Output = Edge;

    fn bitand(self, others: Vec<&Variable>) -> Edge {
        Edge::Group(others.into_iter().map(|other| self & other).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::edge::{BidirectedEdge, DirectedEdge, Edge};
    use crate::symbols::variable::make_vars;

    #[test]
    /// Test the infix sugar for single edges.
    fn infix_sugar() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (&vars[0], &vars[1]);

        assert_eq!(
            y << x,
            Edge::Directed(DirectedEdge::new(vars[0].clone(), vars[1].clone()))
        );
        assert_eq!(
            x & y,
            Edge::Bidirected(BidirectedEdge::new(vars[0].clone(), vars[1].clone()))
        );
    }

    #[test]
    /// Test that list operands distribute into edge groups.
    fn infix_distribution() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (&vars[0], &vars[1], &vars[2]);

        let fan_in = y << vec![x, z];
        assert_eq!(fan_in, Edge::Group(vec![y << x, y << z]));

        let fan_out = vec![x, y] << z;
        assert_eq!(fan_out, Edge::Group(vec![x << z, y << z]));
    }

    #[test]
    /// Test that bidirected edges ignore endpoint order.
    fn bidirected_symmetry() {
        let vars = make_vars(&["a", "b"]);
        let ab = BidirectedEdge::new(vars[0].clone(), vars[1].clone());
        let ba = BidirectedEdge::new(vars[1].clone(), vars[0].clone());
        assert_eq!(ab, ba);
    }
}
