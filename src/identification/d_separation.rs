//! d-separation on mixed graphs.
//!
//! Bidirected edges are expanded into explicit latent common causes, and the
//! query is answered on the moralized ancestral graph of the resulting DAG:
//! two sets are d-separated by a conditioning set exactly when they are
//! disconnected after moralization and removal of the conditioned nodes.

use crate::graph::graph::Graph;
use crate::symbols::variable::Variable;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A node of the canonical DAG: an observed variable, or the latent cause
/// standing in for one bidirected edge.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum DNode {
    Observed(Variable),
    Latent(usize),
}

/// Decide whether `a` and `b` are d-separated given `conditioned` in `graph`.
pub fn d_separated(
    graph: &Graph,
    a: &BTreeSet<Variable>,
    b: &BTreeSet<Variable>,
    conditioned: &BTreeSet<Variable>,
) -> bool {
    // parent relation of the canonical DAG
    let mut parents: BTreeMap<DNode, BTreeSet<DNode>> = graph
        .nodes()
        .iter()
        .map(|node| (DNode::Observed(node.clone()), BTreeSet::new()))
        .collect();
    for edge in graph.directed_edges() {
        if edge.from != edge.to {
            if let Some(set) = parents.get_mut(&DNode::Observed(edge.to.clone())) {
                set.insert(DNode::Observed(edge.from.clone()));
            }
        }
    }
    for (i, edge) in graph.bidirected_edges().iter().enumerate() {
        let latent = DNode::Latent(i);
        parents.insert(latent.clone(), BTreeSet::new());
        for endpoint in [&edge.a, &edge.b] {
            if let Some(set) = parents.get_mut(&DNode::Observed(endpoint.clone())) {
                set.insert(latent.clone());
            }
        }
    }

    // restrict to the ancestral closure of the three sets
    let mut relevant: BTreeSet<DNode> = a
        .iter()
        .chain(b.iter())
        .chain(conditioned.iter())
        .filter(|node| graph.nodes().contains(*node))
        .map(|node| DNode::Observed(node.clone()))
        .collect();
    let mut frontier: Vec<DNode> = relevant.iter().cloned().collect();
    while let Some(node) = frontier.pop() {
        if let Some(node_parents) = parents.get(&node) {
            for parent in node_parents {
                if relevant.insert(parent.clone()) {
                    frontier.push(parent.clone());
                }
            }
        }
    }

    // moralize: connect each node to its parents and marry co-parents
    fn link(adjacency: &mut BTreeMap<DNode, BTreeSet<DNode>>, x: &DNode, y: &DNode) {
        if let Some(set) = adjacency.get_mut(x) {
            set.insert(y.clone());
        }
        if let Some(set) = adjacency.get_mut(y) {
            set.insert(x.clone());
        }
    }
    let mut adjacency: BTreeMap<DNode, BTreeSet<DNode>> = relevant
        .iter()
        .map(|node| (node.clone(), BTreeSet::new()))
        .collect();
    for node in &relevant {
        let Some(node_parents) = parents.get(node) else {
            continue;
        };
        let node_parents: Vec<&DNode> = node_parents
            .iter()
            .filter(|parent| relevant.contains(*parent))
            .collect();
        for i in 0..node_parents.len() {
            link(&mut adjacency, node, node_parents[i]);
            for j in (i + 1)..node_parents.len() {
                link(&mut adjacency, node_parents[i], node_parents[j]);
            }
        }
    }

    // drop the conditioned nodes and test connectivity from a to b
    let blocked: BTreeSet<DNode> = conditioned
        .iter()
        .map(|node| DNode::Observed(node.clone()))
        .collect();
    let targets: BTreeSet<DNode> = b
        .iter()
        .filter(|node| !conditioned.contains(*node))
        .map(|node| DNode::Observed(node.clone()))
        .collect();

    let mut seen: BTreeSet<DNode> = BTreeSet::new();
    let mut queue: VecDeque<DNode> = a
        .iter()
        .filter(|node| !conditioned.contains(*node))
        .map(|node| DNode::Observed(node.clone()))
        .filter(|node| relevant.contains(node))
        .collect();
    while let Some(node) = queue.pop_front() {
        if !seen.insert(node.clone()) {
            continue;
        }
        if targets.contains(&node) {
            return false;
        }
        if let Some(neighbors) = adjacency.get(&node) {
            for neighbor in neighbors {
                if !blocked.contains(neighbor) && !seen.contains(neighbor) {
                    queue.push_back(neighbor.clone());
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use crate::graph::graph::Graph;
    use crate::identification::d_separation::d_separated;
    use crate::symbols::variable::{Variable, make_vars};

    use std::collections::BTreeSet;

    fn set(names: &[&str]) -> BTreeSet<Variable> {
        names.iter().map(|name| Variable::new(name)).collect()
    }

    #[test]
    /// Test blocking of a chain by its middle node.
    fn chain() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (&vars[0], &vars[1], &vars[2]);
        let g = Graph::new(vec![z << x, y << z]);

        assert!(!d_separated(&g, &set(&["x"]), &set(&["y"]), &set(&[])));
        assert!(d_separated(&g, &set(&["x"]), &set(&["y"]), &set(&["z"])));
    }

    #[test]
    /// Test that conditioning on a collider opens the path.
    fn collider() {
        let vars = make_vars(&["x", "y", "c"]);
        let (x, y, c) = (&vars[0], &vars[1], &vars[2]);
        let g = Graph::new(vec![c << x, c << y]);

        assert!(d_separated(&g, &set(&["x"]), &set(&["y"]), &set(&[])));
        assert!(!d_separated(&g, &set(&["x"]), &set(&["y"]), &set(&["c"])));
    }

    #[test]
    /// Test that a fork is blocked by its root.
    fn fork() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (&vars[0], &vars[1], &vars[2]);
        let g = Graph::new(vec![x << z, y << z]);

        assert!(!d_separated(&g, &set(&["x"]), &set(&["y"]), &set(&[])));
        assert!(d_separated(&g, &set(&["x"]), &set(&["y"]), &set(&["z"])));
    }

    #[test]
    /// Test that a bidirected edge behaves like a latent common cause.
    fn latent_confounder() {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (&vars[0], &vars[1], &vars[2]);

        let g = Graph::new(vec![x & y]);
        assert!(!d_separated(&g, &set(&["x"]), &set(&["y"]), &set(&[])));

        // conditioning on a confounded collider opens the path x -> z <-> y
        let g = Graph::new(vec![z << x, z & y]);
        assert!(d_separated(&g, &set(&["x"]), &set(&["y"]), &set(&[])));
        assert!(!d_separated(&g, &set(&["x"]), &set(&["y"]), &set(&["z"])));
    }
}
