//! The symbolic expression algebra: probabilities, products, quotients,
//! marginal sums, differences, expectations, named literals, and the
//! identification failure sentinel, together with traversal, canonical
//! equality, capture-avoiding substitution, and the JSON interchange format.

pub mod json;
pub mod literal;
pub mod node;
pub mod substitution;
pub mod traversal;

pub use literal::{Literal, LiteralArg, LiteralSpec};
pub use node::{Expr, PGiven, PVar, Probability};
pub use substitution::Bindings;
pub use traversal::AdaptVisitor;
