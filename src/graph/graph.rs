//! The mixed causal diagram: directed and bidirected edges over named
//! variables, with the reachability and component queries used by
//! identification.

use crate::errors::CausalError;
use crate::graph::edge::{BidirectedEdge, DirectedEdge, Edge};
use crate::symbols::variable::Variable;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A causal diagram over named variables.
///
/// The edge lists tolerate duplicates; every query deduplicates through the
/// adjacency maps it builds. The directed part is only required to be acyclic
/// when an algorithm needs a topological order, and the check happens there.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: BTreeSet<Variable>,
    directed: Vec<DirectedEdge>,
    bidirected: Vec<BidirectedEdge>,
}

impl Graph {
    /// Create a graph from a list of edges. Edge groups produced by the infix
    /// sugar are flattened, arbitrarily deep.
    pub fn new(edges: Vec<Edge>) -> Graph {
        let mut graph = Graph::default();
        graph.add_edges(edges);
        graph
    }

    /// Add an isolated node.
    pub fn add_node(&mut self, node: Variable) {
        self.nodes.insert(node);
    }

    /// Add one edge, inserting its endpoints as nodes.
    pub fn add_edge(&mut self, edge: Edge) {
        match edge {
            Edge::Directed(edge) => {
                self.nodes.insert(edge.from.clone());
                self.nodes.insert(edge.to.clone());
                self.directed.push(edge);
            }
            Edge::Bidirected(edge) => {
                self.nodes.insert(edge.a.clone());
                self.nodes.insert(edge.b.clone());
                self.bidirected.push(edge);
            }
            Edge::Group(edges) => self.add_edges(edges),
        }
    }

    /// Add a list of edges, flattening nested groups.
    pub fn add_edges(&mut self, edges: Vec<Edge>) {
        for edge in edges {
            self.add_edge(edge);
        }
    }

    pub fn nodes(&self) -> &BTreeSet<Variable> {
        &self.nodes
    }

    pub fn directed_edges(&self) -> &[DirectedEdge] {
        self.directed.as_slice()
    }

    pub fn bidirected_edges(&self) -> &[BidirectedEdge] {
        self.bidirected.as_slice()
    }

    /// Deduplicated map from each node to its direct causes.
    pub fn parent_map(&self) -> BTreeMap<Variable, BTreeSet<Variable>> {
        let mut map: BTreeMap<Variable, BTreeSet<Variable>> = self
            .nodes
            .iter()
            .map(|node| (node.clone(), BTreeSet::new()))
            .collect();
        for edge in &self.directed {
            if edge.from != edge.to {
                if let Some(parents) = map.get_mut(&edge.to) {
                    parents.insert(edge.from.clone());
                }
            }
        }
        map
    }

    /// Deduplicated map from each node to its direct effects.
    pub fn child_map(&self) -> BTreeMap<Variable, BTreeSet<Variable>> {
        let mut map: BTreeMap<Variable, BTreeSet<Variable>> = self
            .nodes
            .iter()
            .map(|node| (node.clone(), BTreeSet::new()))
            .collect();
        for edge in &self.directed {
            if edge.from != edge.to {
                if let Some(children) = map.get_mut(&edge.from) {
                    children.insert(edge.to.clone());
                }
            }
        }
        map
    }

    pub fn directed_parents(&self, node: &Variable) -> BTreeSet<Variable> {
        self.parent_map().remove(node).unwrap_or_default()
    }

    pub fn directed_children(&self, node: &Variable) -> BTreeSet<Variable> {
        self.child_map().remove(node).unwrap_or_default()
    }

    /// Reflexive transitive closure of the parent relation over `seed`.
    pub fn ancestors(&self, seed: &BTreeSet<Variable>) -> BTreeSet<Variable> {
        self.closure(seed, &self.parent_map())
    }

    /// Reflexive transitive closure of the child relation over `seed`.
    pub fn descendants(&self, seed: &BTreeSet<Variable>) -> BTreeSet<Variable> {
        self.closure(seed, &self.child_map())
    }

    fn closure(
        &self,
        seed: &BTreeSet<Variable>,
        step: &BTreeMap<Variable, BTreeSet<Variable>>,
    ) -> BTreeSet<Variable> {
        let mut reached: BTreeSet<Variable> = seed
            .iter()
            .filter(|node| self.nodes.contains(*node))
            .cloned()
            .collect();
        let mut frontier: Vec<Variable> = reached.iter().cloned().collect();
        while let Some(node) = frontier.pop() {
            if let Some(next) = step.get(&node) {
                for reachable in next {
                    if reached.insert(reachable.clone()) {
                        frontier.push(reachable.clone());
                    }
                }
            }
        }
        reached
    }

    /// Connected components of the sub-graph induced by bidirected edges only.
    /// Nodes without any bidirected edge form singleton components. Components
    /// are returned sorted by their smallest member.
    pub fn c_components(&self) -> Vec<BTreeSet<Variable>> {
        let index: BTreeMap<&Variable, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node, i))
            .collect();

        // union-find over node indices, merging along bidirected edges
        let mut leader: Vec<usize> = (0..self.nodes.len()).collect();
        fn find(leader: &mut Vec<usize>, mut i: usize) -> usize {
            while leader[i] != i {
                leader[i] = leader[leader[i]];
                i = leader[i];
            }
            i
        }
        for edge in &self.bidirected {
            let (Some(&a), Some(&b)) = (index.get(&edge.a), index.get(&edge.b)) else {
                continue;
            };
            let (ra, rb) = (find(&mut leader, a), find(&mut leader, b));
            if ra != rb {
                leader[ra] = rb;
            }
        }

        let mut components: BTreeMap<usize, BTreeSet<Variable>> = BTreeMap::new();
        for (node, &i) in &index {
            let root = find(&mut leader, i);
            components.entry(root).or_default().insert((*node).clone());
        }
        let mut result: Vec<BTreeSet<Variable>> = components.into_values().collect();
        result.sort_by(|a, b| a.first().cmp(&b.first()));
        result
    }

    /// The graph restricted to `keep`: nodes in `keep` and edges with both
    /// endpoints in `keep`.
    pub fn subgraph(&self, keep: &BTreeSet<Variable>) -> Graph {
        Graph {
            nodes: self.nodes.intersection(keep).cloned().collect(),
            directed: self
                .directed
                .iter()
                .filter(|edge| keep.contains(&edge.from) && keep.contains(&edge.to))
                .cloned()
                .collect(),
            bidirected: self
                .bidirected
                .iter()
                .filter(|edge| keep.contains(&edge.a) && keep.contains(&edge.b))
                .cloned()
                .collect(),
        }
    }

    /// The mutilated graph with every directed edge into a member of `cut`
    /// removed. Bidirected edges are untouched.
    pub fn remove_incoming(&self, cut: &BTreeSet<Variable>) -> Graph {
        Graph {
            nodes: self.nodes.clone(),
            directed: self
                .directed
                .iter()
                .filter(|edge| !cut.contains(&edge.to))
                .cloned()
                .collect(),
            bidirected: self.bidirected.clone(),
        }
    }

    /// The mutilated graph with every directed edge out of a member of `cut`
    /// removed. Bidirected edges are untouched.
    pub fn remove_outgoing(&self, cut: &BTreeSet<Variable>) -> Graph {
        Graph {
            nodes: self.nodes.clone(),
            directed: self
                .directed
                .iter()
                .filter(|edge| !cut.contains(&edge.from))
                .cloned()
                .collect(),
            bidirected: self.bidirected.clone(),
        }
    }

    /// A linear extension of the directed sub-graph. Ties are broken by name,
    /// which keeps the output deterministic.
    pub fn topological_sort(&self) -> Result<Vec<Variable>, CausalError> {
        let parents = self.parent_map();
        let mut remaining: BTreeMap<Variable, BTreeSet<Variable>> = parents;
        let mut order: Vec<Variable> = Vec::with_capacity(self.nodes.len());

        while !remaining.is_empty() {
            let next = remaining
                .iter()
                .find(|(_, parents)| parents.is_empty())
                .map(|(node, _)| node.clone());
            let Some(node) = next else {
                let stuck: Vec<String> =
                    remaining.keys().map(|node| node.to_string()).collect();
                return Err(CausalError::CyclicGraph(format!(
                    "no topological order exists, a cycle runs through {{{}}}",
                    stuck.join(", ")
                )));
            };
            remaining.remove(&node);
            for parents in remaining.values_mut() {
                parents.remove(&node);
            }
            order.push(node);
        }
        Ok(order)
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<Graph n_nodes={} n_edges={}>",
            self.nodes.len(),
            self.directed.len() + self.bidirected.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::CausalError;
    use crate::graph::graph::Graph;
    use crate::symbols::variable::{Variable, make_vars};

    use std::collections::BTreeSet;

    fn set(names: &[&str]) -> BTreeSet<Variable> {
        names.iter().map(|name| Variable::new(name)).collect()
    }

    /// The front-door diagram: x -> z -> y with confounding between x and y.
    fn front_door() -> Graph {
        let vars = make_vars(&["x", "y", "z"]);
        let (x, y, z) = (&vars[0], &vars[1], &vars[2]);
        Graph::new(vec![z << x, y << z, x & y])
    }

    #[test]
    /// Test ancestor and descendant closures.
    fn closures() {
        let g = front_door();
        assert_eq!(g.ancestors(&set(&["y"])), set(&["x", "y", "z"]));
        assert_eq!(g.ancestors(&set(&["z"])), set(&["x", "z"]));
        assert_eq!(g.descendants(&set(&["x"])), set(&["x", "y", "z"]));
        assert_eq!(g.descendants(&set(&["y"])), set(&["y"]));
        // closures are reflexive
        assert_eq!(g.ancestors(&set(&["x"])), set(&["x"]));
    }

    #[test]
    /// Test confounded components, including singleton components.
    fn confounded_components() {
        let g = front_door();
        let components = g.c_components();
        assert_eq!(components, vec![set(&["x", "y"]), set(&["z"])]);

        // without bidirected edges, everything is a singleton
        let vars = make_vars(&["a", "b"]);
        let plain = Graph::new(vec![&vars[1] << &vars[0]]);
        assert_eq!(plain.c_components(), vec![set(&["a"]), set(&["b"])]);
    }

    #[test]
    /// Test restriction and the two mutilations.
    fn restriction_and_mutilation() {
        let g = front_door();

        let restricted = g.subgraph(&set(&["x", "z"]));
        assert_eq!(restricted.nodes(), &set(&["x", "z"]));
        assert_eq!(restricted.directed_edges().len(), 1);
        assert_eq!(restricted.bidirected_edges().len(), 0);

        // cutting into x leaves its outgoing edge and the confounder alone
        let no_incoming = g.remove_incoming(&set(&["z"]));
        assert_eq!(no_incoming.directed_edges().len(), 1);
        assert_eq!(no_incoming.bidirected_edges().len(), 1);
        assert_eq!(no_incoming.ancestors(&set(&["z"])), set(&["z"]));

        let no_outgoing = g.remove_outgoing(&set(&["x"]));
        assert_eq!(no_outgoing.directed_edges().len(), 1);
        assert_eq!(no_outgoing.descendants(&set(&["x"])), set(&["x"]));
    }

    #[test]
    /// Test topological sorting and cycle detection.
    fn topological_sorting() {
        let g = front_door();
        assert_eq!(
            g.topological_sort().unwrap(),
            vec![Variable::new("x"), Variable::new("z"), Variable::new("y")]
        );

        let vars = make_vars(&["a", "b"]);
        let (a, b) = (&vars[0], &vars[1]);
        let cyclic = Graph::new(vec![b << a, a << b]);
        assert!(matches!(
            cyclic.topological_sort(),
            Err(CausalError::CyclicGraph(_))
        ));
    }

    #[test]
    /// Test that duplicate edges do not distort adjacency queries.
    fn duplicate_edges_deduplicated() {
        let vars = make_vars(&["a", "b"]);
        let (a, b) = (&vars[0], &vars[1]);
        let g = Graph::new(vec![b << a, b << a, a & b, a & b]);
        assert_eq!(g.directed_parents(&vars[1]).len(), 1);
        assert_eq!(g.c_components().len(), 1);
    }
}
