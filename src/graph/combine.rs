//! Aggregate call graph keyed by qualified call path.
//!
//! Occurrences whose ancestor names are the same collapse into one graph
//! node, so `main f` is a single node however often `main` called `f`.
//! Repeated edges add up their counts instead of being emitted again.

use super::accumulator::{EdgeType, GraphAccumulator};
use super::no_match::{DelegatingVisitor, NodeMerge};
use crate::tree::Single;
use crate::utils::config::NAMESPACE_SEPARATOR;
use std::collections::HashMap;

/// Merge strategy for the combined view
#[derive(Debug, Default)]
pub struct ByNamespace {
    /// Namespace -> graph node id
    context: HashMap<String, usize>,
    /// `(source, target, kind)` -> edge index
    context_edges: HashMap<(usize, usize, EdgeType), usize>,
    namestack: Vec<String>,
}

/// Aggregated ("type-level") call graph
pub type CombineVisitor = DelegatingVisitor<ByNamespace>;

impl ByNamespace {
    fn namespace(&self, single: &Single) -> String {
        let mut path = self.namestack.clone();
        path.push(single.name_id());
        path.join(NAMESPACE_SEPARATOR)
    }
}

impl NodeMerge for ByNamespace {
    const ERASES_CALL_COUNTS: bool = false;

    fn add_node(&mut self, acc: &mut GraphAccumulator, single: &Single) -> usize {
        let namespace = self.namespace(single);
        if let Some(&node_id) = self.context.get(&namespace) {
            if let Some(node) = acc.node_mut(node_id) {
                node.absorb(single);
            }
            return node_id;
        }

        let node_id = acc.add_node(single);
        if let Some(node) = acc.node_mut(node_id) {
            node.namespace = Some(namespace.clone());
        }
        self.context.insert(namespace, node_id);
        node_id
    }

    fn add_edge(
        &mut self,
        acc: &mut GraphAccumulator,
        source: usize,
        target: usize,
        count: u64,
        kind: EdgeType,
    ) {
        let key = (source, target, kind);
        if let Some(edge) = self
            .context_edges
            .get(&key)
            .and_then(|index| acc.edge_mut(*index))
        {
            edge.count += count;
            return;
        }
        let index = acc.add_edge(source, target, count, kind);
        self.context_edges.insert(key, index);
    }

    fn enter_call(&mut self, caller: &Single) {
        self.namestack.push(caller.name_id());
    }

    fn leave_call(&mut self) {
        self.namestack.pop();
    }

    /// Every collapsed occurrence keeps its own contribution to the
    /// namespace totals, so a combined view of an id-stripped tree counts
    /// the same activations as one of the original tree.
    fn visits_every_mixed_element(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::Activation;

    #[test]
    fn test_namespace_uses_ancestors() {
        let mut merge = ByNamespace::default();
        let main = Single::new(Activation::new(0, None, "main", 0, 10).with_line(1));
        let f = Single::new(Activation::new(1, Some(0), "f", 1, 2).with_line(4));
        assert_eq!(merge.namespace(&f), "4-f");
        merge.enter_call(&main);
        assert_eq!(merge.namespace(&f), "1-main 4-f");
        merge.leave_call();
        assert_eq!(merge.namespace(&f), "4-f");
    }

    #[test]
    fn test_repeated_edges_accumulate() {
        let mut merge = ByNamespace::default();
        let mut acc = GraphAccumulator::new();
        acc.discard_initial();
        let a = merge.add_node(&mut acc, &Single::new(Activation::new(0, None, "a", 0, 4)));
        let b = merge.add_node(&mut acc, &Single::new(Activation::new(1, None, "b", 0, 6)));
        merge.add_edge(&mut acc, a, b, 1, EdgeType::Sequence);
        merge.add_edge(&mut acc, a, b, 2, EdgeType::Sequence);
        merge.add_edge(&mut acc, a, b, 1, EdgeType::Call);

        assert_eq!(acc.edges().len(), 2);
        assert_eq!(acc.edges()[0].count, 3);
    }
}
