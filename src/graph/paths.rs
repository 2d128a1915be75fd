//! Explicit enumeration of directed paths between two nodes.

use crate::errors::CausalError;
use crate::graph::graph::Graph;
use crate::symbols::variable::Variable;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Iterator over all simple directed paths from a start node to an end node.
/// Paths are yielded as node sequences including both endpoints.
pub struct DirectedPaths {
    children: BTreeMap<Variable, BTreeSet<Variable>>,
    end: Variable,
    /// Pending partial paths, each ending in the node still to be expanded.
    stack: Vec<Vec<Variable>>,
    /// The trivial path is yielded exactly once when start equals end.
    trivial: Option<Vec<Variable>>,
}

impl Iterator for DirectedPaths {
    type Item = Vec<Variable>;

    fn next(&mut self) -> Option<Vec<Variable>> {
        if let Some(path) = self.trivial.take() {
            return Some(path);
        }
        while let Some(path) = self.stack.pop() {
            let last = path
                .last()
                .expect("partial paths always contain at least the start node");
            let Some(children) = self.children.get(last).cloned() else {
                continue;
            };
            let mut found: Option<Vec<Variable>> = None;
            for child in children {
                if child == self.end {
                    let mut complete = path.clone();
                    complete.push(child);
                    found = Some(complete);
                } else if !path.contains(&child) {
                    // extend only into unvisited nodes to keep paths simple
                    let mut longer = path.clone();
                    longer.push(child);
                    self.stack.push(longer);
                }
            }
            if let Some(path) = found {
                return Some(path);
            }
        }
        None
    }
}

impl Graph {
    /// Enumerate every simple directed path from `start` to `end`. Both
    /// endpoints must be nodes of the graph. `dfs(a, a)` yields exactly the
    /// trivial path `[a]`.
    pub fn dfs(&self, start: &Variable, end: &Variable) -> Result<DirectedPaths, CausalError> {
        for endpoint in [start, end] {
            if !self.nodes().contains(endpoint) {
                return Err(CausalError::UnknownVariable(format!(
                    "{endpoint} is not in the graph"
                )));
            }
        }

        let trivial = (start == end).then(|| vec![start.clone()]);
        let stack = if start == end {
            Vec::new()
        } else {
            vec![vec![start.clone()]]
        };
        Ok(DirectedPaths {
            children: self.child_map(),
            end: end.clone(),
            stack,
            trivial,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::CausalError;
    use crate::graph::graph::Graph;
    use crate::symbols::variable::make_vars;

    #[test]
    /// Test path enumeration on a diamond.
    fn diamond_paths() {
        let vars = make_vars(&["a", "b", "c", "d"]);
        let (a, b, c, d) = (&vars[0], &vars[1], &vars[2], &vars[3]);
        let g = Graph::new(vec![b << a, c << a, d << b, d << c]);

        let mut paths: Vec<Vec<String>> = g
            .dfs(a, d)
            .unwrap()
            .map(|path| path.iter().map(|node| node.to_string()).collect())
            .collect();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                vec!["a".to_string(), "b".to_string(), "d".to_string()],
                vec!["a".to_string(), "c".to_string(), "d".to_string()],
            ]
        );
    }

    #[test]
    /// Test the trivial path and the empty result.
    fn trivial_and_empty() {
        let vars = make_vars(&["a", "b"]);
        let (a, b) = (&vars[0], &vars[1]);
        let g = Graph::new(vec![b << a]);

        let trivial: Vec<Vec<_>> = g.dfs(a, a).unwrap().collect();
        assert_eq!(trivial, vec![vec![vars[0].clone()]]);

        // no path runs against the arrow
        assert_eq!(g.dfs(b, a).unwrap().count(), 0);
    }

    #[test]
    /// Test that cycles do not produce paths from a descendant back up.
    fn cycles_terminate() {
        let vars = make_vars(&["a", "b", "c"]);
        let (a, b, c) = (&vars[0], &vars[1], &vars[2]);
        let g = Graph::new(vec![b << a, c << b, a << c]);

        // the cycle is walked at most once per path
        let paths: Vec<_> = g.dfs(a, c).unwrap().collect();
        assert_eq!(paths.len(), 1);
    }

    #[test]
    /// Test that missing endpoints are rejected.
    fn missing_endpoints() {
        let vars = make_vars(&["a", "b", "ghost"]);
        let g = Graph::new(vec![&vars[1] << &vars[0]]);
        assert!(matches!(
            g.dfs(&vars[0], &vars[2]),
            Err(CausalError::UnknownVariable(_))
        ));
    }
}
