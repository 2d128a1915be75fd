//! Events constraining variables: equality with a value, and interventions.

use crate::errors::CausalError;
use crate::symbols::value::Value;
use crate::symbols::variable::Variable;

use std::fmt;

/// The event that a variable takes on a specific value, written `x = v`.
///
/// The value is always a scalar, never another variable.
#[derive(Clone, Debug, PartialEq)]
pub struct EqualityEvent {
    pub var: Variable,
    pub val: Value,
}

impl EqualityEvent {
    pub fn new(var: Variable, val: impl Into<Value>) -> EqualityEvent {
        EqualityEvent {
            var,
            val: val.into(),
        }
    }

    pub fn to_latex(&self) -> String {
        format!("{} = {}", self.var.to_latex(), self.val)
    }
}

impl fmt::Display for EqualityEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {}", self.var, self.val)
    }
}

/// What an intervention acts on: either a bare variable, or a variable already
/// pinned to a value. Nesting interventions is unrepresentable.
#[derive(Clone, Debug, PartialEq)]
pub enum InterventionTarget {
    Var(Variable),
    Event(EqualityEvent),
}

/// The do-operator applied to a variable or to an equality event, written `do(x)`
/// or `do(x = v)`.
#[derive(Clone, Debug, PartialEq)]
pub struct InterventionEvent {
    pub target: InterventionTarget,
}

impl InterventionEvent {
    /// Intervene on a bare variable, leaving the forced value open.
    pub fn on_var(var: Variable) -> InterventionEvent {
        InterventionEvent {
            target: InterventionTarget::Var(var),
        }
    }

    /// Intervene on a variable, forcing it to a specific value.
    pub fn on_event(event: EqualityEvent) -> InterventionEvent {
        InterventionEvent {
            target: InterventionTarget::Event(event),
        }
    }

    /// The variable this intervention acts on.
    pub fn var(&self) -> &Variable {
        match &self.target {
            InterventionTarget::Var(var) => var,
            InterventionTarget::Event(event) => &event.var,
        }
    }

    /// The forced value, if one has been assigned yet.
    pub fn value(&self) -> Option<&Value> {
        match &self.target {
            InterventionTarget::Var(_) => None,
            InterventionTarget::Event(event) => Some(&event.val),
        }
    }

    /// Pin the intervention to a concrete value. Re-assigning the value already
    /// held is a no-op; assigning a different one is a contradiction.
    pub fn assign(&self, val: &Value) -> Result<InterventionEvent, CausalError> {
        match &self.target {
            InterventionTarget::Var(var) => Ok(InterventionEvent::on_event(EqualityEvent::new(
                var.clone(),
                val.clone(),
            ))),
            InterventionTarget::Event(event) => {
                if &event.val == val {
                    Ok(self.clone())
                } else {
                    Err(CausalError::Contradiction(format!(
                        "cannot set {} to {val}, it is already constrained by {self}",
                        event.var
                    )))
                }
            }
        }
    }

    pub fn to_latex(&self) -> String {
        match &self.target {
            InterventionTarget::Var(var) => format!("\\text{{do}}({})", var.to_latex()),
            InterventionTarget::Event(event) => format!("\\text{{do}}({})", event.to_latex()),
        }
    }
}

impl fmt::Display for InterventionEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.target {
            InterventionTarget::Var(var) => write!(f, "do({var})"),
            InterventionTarget::Event(event) => write!(f, "do({event})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::CausalError;
    use crate::symbols::event::{EqualityEvent, InterventionEvent};
    use crate::symbols::variable::Variable;

    #[test]
    /// Test display forms of the two event kinds.
    fn event_display() {
        let x = Variable::new("x");
        let eq = EqualityEvent::new(x.clone(), 1);
        assert_eq!(eq.to_string(), "x = 1");
        assert_eq!(InterventionEvent::on_var(x.clone()).to_string(), "do(x)");
        assert_eq!(InterventionEvent::on_event(eq).to_string(), "do(x = 1)");
    }

    #[test]
    /// Test assigning a value through the do-operator.
    fn intervention_assignment() {
        let x = Variable::new("x");
        let open = InterventionEvent::on_var(x.clone());
        assert_eq!(open.value(), None);

        let pinned = open.assign(&1.into()).unwrap();
        assert_eq!(pinned.value(), Some(&1.into()));
        assert_eq!(pinned.var(), &x);

        // same value is idempotent, a different one contradicts
        assert!(pinned.assign(&1.into()).is_ok());
        let conflict = pinned.assign(&0.into());
        assert!(matches!(conflict, Err(CausalError::Contradiction(_))));
    }
}
