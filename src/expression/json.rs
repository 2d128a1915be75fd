//! Stable JSON interchange format for expressions.
//!
//! Only the kinds produced by the identification kernel are part of the
//! surface: probabilities over bare variables, products, quotients, marginal
//! sums, and the failure sentinel. Differences, expectations, and literals
//! are in-process constructs and do not serialize.

use crate::errors::CausalError;
use crate::expression::node::{Expr, PGiven, PVar};
use crate::symbols::variable::Variable;

use serde::{Deserialize, Serialize};

/// Serde mirror of the serializable subset of [Expr].
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
enum ExprJson {
    P {
        vars: Vec<String>,
        given: Vec<String>,
    },
    Product {
        exprs: Vec<ExprJson>,
    },
    Quotient {
        numer: Box<ExprJson>,
        denom: Box<ExprJson>,
    },
    Marginal {
        sub: Vec<String>,
        exp: Box<ExprJson>,
    },
    Hedge,
}

fn to_json_node(expr: &Expr) -> Result<ExprJson, CausalError> {
    match expr {
        Expr::P(p) => {
            let mut vars = Vec::with_capacity(p.vars.len());
            for item in &p.vars {
                match item {
                    PVar::Var(var) => vars.push(var.name().to_string()),
                    PVar::Event(event) => {
                        return Err(CausalError::UnknownExpressionKind(format!(
                            "the event {event} cannot be serialized, only bare variables can"
                        )));
                    }
                }
            }
            let mut given = Vec::with_capacity(p.given.len());
            for item in &p.given {
                match item {
                    PGiven::Var(var) => given.push(var.name().to_string()),
                    other => {
                        return Err(CausalError::UnknownExpressionKind(format!(
                            "the event {other} cannot be serialized, only bare variables can"
                        )));
                    }
                }
            }
            Ok(ExprJson::P { vars, given })
        }
        Expr::Product(children) => {
            let mut exprs = Vec::with_capacity(children.len());
            for child in children {
                exprs.push(to_json_node(child)?);
            }
            Ok(ExprJson::Product { exprs })
        }
        Expr::Quotient(numer, denom) => Ok(ExprJson::Quotient {
            numer: Box::new(to_json_node(numer)?),
            denom: Box::new(to_json_node(denom)?),
        }),
        Expr::Marginal(sub, body) => Ok(ExprJson::Marginal {
            sub: sub.iter().map(|var| var.name().to_string()).collect(),
            exp: Box::new(to_json_node(body)?),
        }),
        Expr::Hedge => Ok(ExprJson::Hedge),
        Expr::Difference(..) | Expr::Expectation(..) | Expr::Literal(_) => {
            Err(CausalError::UnknownExpressionKind(format!(
                "{expr} is not part of the JSON interchange surface"
            )))
        }
    }
}

fn from_json_node(node: ExprJson) -> Result<Expr, CausalError> {
    match node {
        ExprJson::P { vars, given } => Expr::mk_p(
            vars.iter().map(|name| PVar::Var(Variable::new(name))).collect(),
            given
                .iter()
                .map(|name| PGiven::Var(Variable::new(name)))
                .collect(),
        ),
        ExprJson::Product { exprs } => {
            let mut children = Vec::with_capacity(exprs.len());
            for child in exprs {
                children.push(from_json_node(child)?);
            }
            Ok(Expr::mk_product(children))
        }
        ExprJson::Quotient { numer, denom } => Ok(Expr::mk_quotient(
            from_json_node(*numer)?,
            from_json_node(*denom)?,
        )),
        ExprJson::Marginal { sub, exp } => Ok(Expr::mk_marginal(
            sub.iter().map(|name| Variable::new(name)).collect(),
            from_json_node(*exp)?,
        )),
        ExprJson::Hedge => Ok(Expr::Hedge),
    }
}

impl Expr {
    /// Serialize the expression into the interchange JSON string.
    pub fn to_json(&self) -> Result<String, CausalError> {
        let node = to_json_node(self)?;
        serde_json::to_string(&node)
            .map_err(|err| CausalError::UnknownExpressionKind(err.to_string()))
    }

    /// Parse an expression from the interchange JSON string.
    pub fn from_json(text: &str) -> Result<Expr, CausalError> {
        let node: ExprJson = serde_json::from_str(text)
            .map_err(|err| CausalError::UnknownExpressionKind(err.to_string()))?;
        from_json_node(node)
    }
}

#[cfg(test)]
mod tests {
    use crate::expression::node::{Expr, PGiven, PVar};
    use crate::symbols::event::EqualityEvent;
    use crate::symbols::variable::make_vars;

    #[test]
    /// Test the exact wire form of each serializable kind.
    fn wire_format() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (vars[0].clone(), vars[1].clone());

        let p = Expr::mk_conditional(&[y.clone()], &[x.clone()]).unwrap();
        assert_eq!(
            p.to_json().unwrap(),
            r#"{"type":"P","vars":["y"],"given":["x"]}"#
        );

        assert_eq!(Expr::mk_hedge().to_json().unwrap(), r#"{"type":"Hedge"}"#);

        let marginal = Expr::mk_marginal(vec![x.clone()], Expr::mk_joint(&[x.clone()]).unwrap());
        assert_eq!(
            marginal.to_json().unwrap(),
            r#"{"type":"Marginal","sub":["x"],"exp":{"type":"P","vars":["x"],"given":[]}}"#
        );
    }

    #[test]
    /// Test that serializing then parsing gives back a structurally equal tree.
    fn round_trip() {
        let variables = make_vars(&["x", "y", "z"]);
        for seed in 0..25u64 {
            let expr = Expr::new_random(4, &variables, seed);
            let round_tripped = Expr::from_json(&expr.to_json().unwrap()).unwrap();
            assert_eq!(round_tripped, expr);
        }
    }

    #[test]
    /// Test that kinds outside the interchange surface refuse to serialize.
    fn out_of_surface_kinds() {
        let vars = make_vars(&["x", "y"]);
        let (x, y) = (vars[0].clone(), vars[1].clone());
        let px = Expr::mk_joint(&[x.clone()]).unwrap();
        let py = Expr::mk_joint(&[y.clone()]).unwrap();

        assert!((px.clone() - py.clone()).to_json().is_err());
        assert!(Expr::mk_expectation(x.clone(), px.clone()).to_json().is_err());

        // a probability carrying events is not serializable either
        let with_event = Expr::mk_p(
            vec![PVar::Event(EqualityEvent::new(y.clone(), 1))],
            vec![PGiven::Var(x.clone())],
        )
        .unwrap();
        assert!(with_event.to_json().is_err());
    }
}
