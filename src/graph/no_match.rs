//! Deduplicated views built with edge delegation.
//!
//! A call's caller has to be linked to whatever ran before and after the
//! *whole* call, not to its direct syntactic neighbour. The visitor therefore
//! defers `call`, `return`, `sequence` and `initial` edges until the node
//! that supplies the missing endpoint is reached:
//!
//! ```text
//! visit_call(main)      defers call(main) and return(main)
//!   visit_group(f, g)   takes both, links main -> f and g -> main
//! ```
//!
//! How graph nodes and edges are merged is delegated to a [`NodeMerge`]
//! strategy, so the per-occurrence view and the combined view share the walk.

use super::accumulator::{Delegation, EdgeType, GraphAccumulator, GraphDocument};
use super::visitor::{walk, TreeVisitor};
use crate::tree::{ActivationTree, Call, Group, Mixed, NodeRef, Single};
use crate::utils::error::GraphError;
use log::debug;
use std::collections::HashMap;

/// Strategy deciding how occurrences map onto graph nodes and edges
pub trait NodeMerge: Default {
    /// Replace call and return edge counts by a placeholder at export
    const ERASES_CALL_COUNTS: bool;

    fn add_node(&mut self, acc: &mut GraphAccumulator, single: &Single) -> usize;

    fn add_edge(
        &mut self,
        acc: &mut GraphAccumulator,
        source: usize,
        target: usize,
        count: u64,
        kind: EdgeType,
    );

    /// Called after the caller's node is added, before its callee is walked
    fn enter_call(&mut self, _caller: &Single) {}

    fn leave_call(&mut self) {}

    /// Walk every element of a mixed node instead of its representative
    fn visits_every_mixed_element(&self) -> bool {
        false
    }
}

/// One graph node per occurrence
#[derive(Debug, Default)]
pub struct PerOccurrence;

impl NodeMerge for PerOccurrence {
    const ERASES_CALL_COUNTS: bool = true;

    fn add_node(&mut self, acc: &mut GraphAccumulator, single: &Single) -> usize {
        acc.add_node(single)
    }

    fn add_edge(
        &mut self,
        acc: &mut GraphAccumulator,
        source: usize,
        target: usize,
        count: u64,
        kind: EdgeType,
    ) {
        acc.add_edge(source, target, count, kind);
    }
}

/// Walk shared by the delegating views
#[derive(Debug)]
pub struct DelegatingVisitor<M: NodeMerge> {
    acc: GraphAccumulator,
    merge: M,
}

/// Per-occurrence view with call/return counts erased
pub type NoMatchVisitor = DelegatingVisitor<PerOccurrence>;

impl<M: NodeMerge> Default for DelegatingVisitor<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: NodeMerge> DelegatingVisitor<M> {
    pub fn new() -> Self {
        Self {
            acc: GraphAccumulator::new().with_erased_call_counts(M::ERASES_CALL_COUNTS),
            merge: M::default(),
        }
    }

    /// Walk the whole tree and export the graph
    ///
    /// # Errors
    /// * `GraphError::UnresolvedDelegation` - The walk left edges pending
    /// * `GraphError::UnmixedNode` - A mixed node was never resolved
    pub fn render(mut self, tree: &ActivationTree) -> Result<GraphDocument, GraphError> {
        if tree.is_empty() {
            self.acc.discard_initial();
        } else {
            walk(&mut self, tree, tree.root())?;
        }
        debug!(
            "Delegating view of trial {}: {} nodes, {} edges",
            tree.trial_id,
            self.acc.nodes().len(),
            self.acc.edges().len()
        );
        self.acc.to_document()
    }

    pub fn accumulator(&self) -> &GraphAccumulator {
        &self.acc
    }

    fn solve_delegation(&mut self, node_id: usize, node_count: u64, delegated: &Delegation) {
        self.solve_forward_delegation(node_id, node_count, delegated);
        self.solve_return_delegation(node_id, delegated);
    }

    /// Edges that end at `node_id`: call, initial and sequence
    fn solve_forward_delegation(&mut self, node_id: usize, node_count: u64, delegated: &Delegation) {
        for (kind, edge) in delegated.forward() {
            self.merge
                .add_edge(&mut self.acc, edge.node, node_id, node_count, kind);
        }
    }

    fn solve_return_delegation(&mut self, node_id: usize, delegated: &Delegation) {
        if let Some(edge) = delegated.get(EdgeType::Return) {
            self.merge
                .add_edge(&mut self.acc, node_id, edge.node, edge.count, EdgeType::Return);
        }
    }
}

impl<M: NodeMerge> TreeVisitor for DelegatingVisitor<M> {
    type Output = usize;

    fn visit_single(
        &mut self,
        _tree: &ActivationTree,
        _node: NodeRef,
        single: &Single,
    ) -> Result<usize, GraphError> {
        let delegated = self.acc.take_delegated();
        let node_id = self.merge.add_node(&mut self.acc, single);
        if !delegated.is_empty() {
            self.solve_delegation(node_id, single.count, &delegated);
        }
        Ok(node_id)
    }

    fn visit_group(
        &mut self,
        tree: &ActivationTree,
        _node: NodeRef,
        group: &Group,
    ) -> Result<usize, GraphError> {
        let delegated = self.acc.take_delegated();

        let mut node_map: HashMap<NodeRef, usize> = HashMap::with_capacity(group.elements.len());
        for element in &group.elements {
            let node_id = walk(self, tree, *element)?;
            node_map.insert(*element, node_id);
        }

        let first = node_map.get(&group.next).copied();
        if let Some(first) = first {
            self.solve_forward_delegation(first, group.count, &delegated);
        }
        if let Some(last) = node_map.get(&group.last).copied() {
            self.solve_return_delegation(last, &delegated);
        }

        for transition in &group.transitions {
            if let (Some(previous), Some(next)) = (
                node_map.get(&transition.previous),
                node_map.get(&transition.next),
            ) {
                self.merge.add_edge(
                    &mut self.acc,
                    *previous,
                    *next,
                    transition.count,
                    EdgeType::Sequence,
                );
            }
        }

        first.ok_or(GraphError::UnexpectedEmpty(group.next))
    }

    fn visit_call(
        &mut self,
        tree: &ActivationTree,
        node: NodeRef,
        call: &Call,
    ) -> Result<usize, GraphError> {
        let delegated = self.acc.take_delegated();
        let caller = tree.single(call.caller);

        let caller_id = walk(self, tree, call.caller)?;
        if let Some(caller_node) = self.acc.node_mut(caller_id) {
            caller_node.repr = tree.repr(node);
        }

        if !delegated.is_empty() {
            let caller_count = caller.map(|c| c.count).unwrap_or(1);
            self.solve_delegation(caller_id, caller_count, &delegated);
        }

        self.acc.defer(EdgeType::Call, caller_id, 1)?;
        self.acc.defer(EdgeType::Return, caller_id, 1)?;

        if let Some(caller) = caller {
            self.merge.enter_call(caller);
        }
        let called = walk(self, tree, call.called);
        if caller.is_some() {
            self.merge.leave_call();
        }
        called?;

        Ok(caller_id)
    }

    fn visit_mixed(
        &mut self,
        tree: &ActivationTree,
        node: NodeRef,
        mixed: &Mixed,
    ) -> Result<usize, GraphError> {
        if self.merge.visits_every_mixed_element() {
            let mut last = None;
            for element in &mixed.elements {
                last = Some(walk(self, tree, *element)?);
            }
            return last.ok_or(GraphError::UnexpectedEmpty(node));
        }

        let outcome = mixed.outcome().ok_or(GraphError::UnmixedNode(node))?;
        let node_id = walk(self, tree, outcome.first)?;
        if let Some(representative) = self.acc.node_mut(node_id) {
            representative.duration = outcome.duration;
        }
        Ok(node_id)
    }
}
