//! Opaque named literals, used to render estimands as function calls.

use crate::errors::CausalError;
use crate::expression::node::Expr;
use crate::symbols::variable::Variable;

use std::fmt;
use std::sync::Arc;

/// Describes one family of literals: its name, arity, and the separators used
/// by the two printers. Instances of the family are created with
/// [Literal::new], which enforces the arity.
#[derive(Debug, Eq, PartialEq)]
pub struct LiteralSpec {
    name: String,
    arity: usize,
    separator: String,
    latex_name: String,
    latex_separator: String,
}

impl LiteralSpec {
    /// Define a new literal family. The display name doubles as the LaTeX name
    /// and `", "` as both separators unless overridden.
    pub fn new(name: &str, arity: usize) -> LiteralSpec {
        LiteralSpec {
            name: name.to_string(),
            arity,
            separator: ", ".to_string(),
            latex_name: name.to_string(),
            latex_separator: ", ".to_string(),
        }
    }

    pub fn with_separator(mut self, separator: &str) -> LiteralSpec {
        self.separator = separator.to_string();
        self
    }

    pub fn with_latex_name(mut self, latex_name: &str) -> LiteralSpec {
        self.latex_name = latex_name.to_string();
        self
    }

    pub fn with_latex_separator(mut self, latex_separator: &str) -> LiteralSpec {
        self.latex_separator = latex_separator.to_string();
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// A positional argument of a literal.
#[derive(Clone, Debug, PartialEq)]
pub enum LiteralArg {
    Var(Variable),
    /// A set of variables rendered without braces, e.g. the treatment set.
    Vars(Vec<Variable>),
    Expr(Box<Expr>),
}

impl LiteralArg {
    fn to_latex(&self) -> String {
        match self {
            LiteralArg::Var(var) => var.to_latex(),
            LiteralArg::Vars(vars) => vars
                .iter()
                .map(Variable::to_latex)
                .collect::<Vec<String>>()
                .join(", "),
            LiteralArg::Expr(expr) => expr.to_latex(),
        }
    }
}

impl fmt::Display for LiteralArg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LiteralArg::Var(var) => write!(f, "{var}"),
            LiteralArg::Vars(vars) => {
                let rendered: Vec<String> = vars.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", rendered.join(", "))
            }
            LiteralArg::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

/// An instantiated literal. Two literals are equal when they come from a
/// family of the same name and their arguments agree positionally.
#[derive(Clone, Debug)]
pub struct Literal {
    spec: Arc<LiteralSpec>,
    args: Vec<LiteralArg>,
}

impl Literal {
    /// Create a literal of the given family over the given arguments.
    pub fn new(spec: &Arc<LiteralSpec>, args: Vec<LiteralArg>) -> Result<Literal, CausalError> {
        if args.len() != spec.arity {
            return Err(CausalError::TypeMismatch(format!(
                "literal {} takes {} arguments, got {}",
                spec.name,
                spec.arity,
                args.len()
            )));
        }
        Ok(Literal {
            spec: Arc::clone(spec),
            args,
        })
    }

    pub fn spec(&self) -> &LiteralSpec {
        &self.spec
    }

    pub fn args(&self) -> &[LiteralArg] {
        self.args.as_slice()
    }

    pub fn to_latex(&self) -> String {
        let args: Vec<String> = self.args.iter().map(LiteralArg::to_latex).collect();
        format!(
            "{}({})",
            self.spec.latex_name,
            args.join(&self.spec.latex_separator)
        )
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.spec.name == other.spec.name && self.args == other.args
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "{}({})", self.spec.name, args.join(&self.spec.separator))
    }
}

#[cfg(test)]
mod tests {
    use crate::expression::literal::{Literal, LiteralArg, LiteralSpec};
    use crate::symbols::variable::make_vars;
    use std::sync::Arc;

    #[test]
    /// Test arity checking and both printers of a literal family.
    fn literal_family() {
        let vars = make_vars(&["y", "x", "z"]);
        let spec = Arc::new(
            LiteralSpec::new("ATE", 2)
                .with_separator(" | ")
                .with_latex_name("\\text{ATE}")
                .with_latex_separator(" \\mid "),
        );

        let literal = Literal::new(
            &spec,
            vec![
                LiteralArg::Var(vars[0].clone()),
                LiteralArg::Vars(vec![vars[1].clone(), vars[2].clone()]),
            ],
        )
        .unwrap();
        assert_eq!(literal.to_string(), "ATE(y | x, z)");
        assert_eq!(literal.to_latex(), "\\text{ATE}(y \\mid x, z)");

        assert!(Literal::new(&spec, vec![LiteralArg::Var(vars[0].clone())]).is_err());
    }

    #[test]
    /// Test literal equality by family name and positional arguments.
    fn literal_equality() {
        let vars = make_vars(&["y"]);
        let spec_a = Arc::new(LiteralSpec::new("F", 1));
        let spec_b = Arc::new(LiteralSpec::new("F", 1).with_separator(" ; "));
        let spec_c = Arc::new(LiteralSpec::new("G", 1));

        let arg = vec![LiteralArg::Var(vars[0].clone())];
        let a = Literal::new(&spec_a, arg.clone()).unwrap();
        let b = Literal::new(&spec_b, arg.clone()).unwrap();
        let c = Literal::new(&spec_c, arg).unwrap();

        // separators are presentation only, the family name decides
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
