//! Operations, frozen ledger nodes, and the dependency graph between results.

use crate::errors::CausalError;
use crate::expression::node::Expr;
use crate::provenance::step::{Recorded, Step};
use crate::symbols::value::Value;
use crate::symbols::variable::Variable;

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// One argument captured by an [Operation]. Arguments that are themselves
/// ledger nodes form the edges of the dependency graph.
#[derive(Clone, Debug)]
pub enum OpArg {
    Expression(Expr),
    Variables(Vec<Variable>),
    Value(Value),
    Number(f64),
    Flag(bool),
    Text(String),
    Result(Arc<Provenance>),
}

/// A record of how a result was produced: a stable identifier of the entry
/// point, its positional arguments, and its named arguments.
#[derive(Clone, Debug, Default)]
pub struct Operation {
    pub op: String,
    pub args: Vec<OpArg>,
    pub kwargs: Vec<(String, OpArg)>,
}

impl Operation {
    pub fn new(op: &str) -> Operation {
        Operation {
            op: op.to_string(),
            args: Vec::new(),
            kwargs: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: OpArg) -> Operation {
        self.args.push(arg);
        self
    }

    pub fn with_kwarg(mut self, name: &str, arg: OpArg) -> Operation {
        self.kwargs.push((name.to_string(), arg));
        self
    }
}

/// A frozen ledger node pairing the step that narrates a computation with the
/// operation that can replay it.
#[derive(Clone, Debug)]
pub struct Provenance {
    pub step: Step,
    pub operation: Operation,
}

impl Provenance {
    pub fn freeze(operation: Operation, step: Step) -> Arc<Provenance> {
        Arc::new(Provenance { step, operation })
    }

    /// The ledger nodes this node directly consumed.
    pub fn dependencies(&self) -> Vec<Arc<Provenance>> {
        self.operation
            .args
            .iter()
            .chain(self.operation.kwargs.iter().map(|(_, arg)| arg))
            .filter_map(|arg| match arg {
                OpArg::Result(node) => Some(Arc::clone(node)),
                _ => None,
            })
            .collect()
    }
}

/// Topological order of the transitive dependency closure of `node`, leaves
/// first and `node` itself last. Fails if the dependency graph contains a
/// cycle.
pub fn nested_dependencies(
    node: &Arc<Provenance>,
) -> Result<Vec<Arc<Provenance>>, CausalError> {
    // collect the closure, keyed by node address
    let mut nodes: BTreeMap<usize, Arc<Provenance>> = BTreeMap::new();
    let mut edges: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut queue = VecDeque::from([Arc::clone(node)]);
    while let Some(node) = queue.pop_front() {
        let key = Arc::as_ptr(&node) as usize;
        if nodes.contains_key(&key) {
            continue;
        }
        let deps = node.dependencies();
        let mut dep_keys: Vec<usize> =
            deps.iter().map(|dep| Arc::as_ptr(dep) as usize).collect();
        dep_keys.sort_unstable();
        dep_keys.dedup();
        edges.insert(key, dep_keys);
        nodes.insert(key, node);
        queue.extend(deps);
    }

    // Kahn's algorithm over the dependency edges, leaves first
    let mut blocked: BTreeMap<usize, usize> =
        edges.iter().map(|(key, deps)| (*key, deps.len())).collect();
    let mut order: Vec<Arc<Provenance>> = Vec::with_capacity(nodes.len());
    let mut ready: VecDeque<usize> = blocked
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(key, _)| *key)
        .collect();
    while let Some(key) = ready.pop_front() {
        if let Some(node) = nodes.get(&key) {
            order.push(Arc::clone(node));
        }
        for (dependant, deps) in &edges {
            if deps.contains(&key) {
                if let Some(count) = blocked.get_mut(dependant) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(*dependant);
                    }
                }
            }
        }
    }
    if order.len() != nodes.len() {
        return Err(CausalError::CyclicGraph(
            "the dependency graph of results contains a cycle".to_string(),
        ));
    }
    Ok(order)
}

/// A typed result produced by an entry point. Each implementor whitelists the
/// derived keys its step is expected to record.
pub trait LedgerResult: Sized {
    /// The exact set of derived keys the step must produce.
    fn expected_keys() -> &'static [&'static str];

    /// Build the typed result from a frozen ledger node whose step has
    /// already been validated against [LedgerResult::expected_keys].
    fn from_provenance(node: Arc<Provenance>) -> Result<Self, CausalError>;
}

/// Run an entry point: create a fresh step, let `body` write into it, check
/// the derived keys against the expected ones, and freeze everything into a
/// typed result. A failure in `body` is recorded as the step's last log entry
/// before it becomes the outcome of the call.
pub fn entrypoint<R: LedgerResult>(
    step_name: &str,
    operation: Operation,
    body: impl FnOnce(&mut Step) -> Result<(), CausalError>,
) -> Result<R, CausalError> {
    let mut step = Step::new(step_name);
    if let Err(err) = body(&mut step) {
        step.note(format!("Failed: {err}"));
        return Err(err);
    }

    let expected = R::expected_keys();
    for key in step.results.keys() {
        if !expected.contains(&key.as_str()) {
            return Err(CausalError::TypeMismatch(format!(
                "step {step_name} derived unexpected key {key}"
            )));
        }
    }
    for key in expected {
        if !step.results.contains_key(*key) {
            return Err(CausalError::TypeMismatch(format!(
                "step {step_name} did not derive required key {key}"
            )));
        }
    }
    R::from_provenance(Provenance::freeze(operation, step))
}

/// Fetch a derived expression out of a frozen node.
pub(crate) fn expression_result(
    node: &Arc<Provenance>,
    key: &str,
) -> Result<Expr, CausalError> {
    match node.step.results.get(key) {
        Some(Recorded::Expression(expr)) => Ok(expr.clone()),
        _ => Err(CausalError::TypeMismatch(format!(
            "step {} did not derive an expression under {key}",
            node.step.name
        ))),
    }
}

/// Fetch a derived number out of a frozen node.
pub(crate) fn number_result(node: &Arc<Provenance>, key: &str) -> Result<f64, CausalError> {
    match node.step.results.get(key) {
        Some(Recorded::Number(value)) => Ok(*value),
        _ => Err(CausalError::TypeMismatch(format!(
            "step {} did not derive a number under {key}",
            node.step.name
        ))),
    }
}
