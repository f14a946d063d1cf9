//! Faithful unrolling of the call tree: one graph node per occurrence.

use super::accumulator::{EdgeType, GraphAccumulator, GraphDocument};
use super::visitor::{walk, TreeVisitor};
use crate::tree::{ActivationTree, Call, Group, Mixed, NodeRef, Single};
use crate::utils::error::GraphError;
use log::debug;
use std::collections::HashMap;

/// Emits every activation, call and sequence transition as recorded
///
/// Nothing is merged and every count is kept. The walk returns the graph
/// ids through which a subtree is entered, and callers link a `call` edge to
/// each of them, numbered by position.
#[derive(Debug, Default)]
pub struct FullTreeVisitor {
    acc: GraphAccumulator,
}

impl FullTreeVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the whole tree and export the graph
    pub fn render(mut self, tree: &ActivationTree) -> Result<GraphDocument, GraphError> {
        if tree.is_empty() {
            self.acc.discard_initial();
        } else {
            walk(&mut self, tree, tree.root())?;
        }
        debug!(
            "Full tree view of trial {}: {} nodes",
            tree.trial_id,
            self.acc.nodes().len()
        );
        self.acc.to_document()
    }

    pub fn accumulator(&self) -> &GraphAccumulator {
        &self.acc
    }

    fn emit(&mut self, single: &Single) -> usize {
        let id = self.acc.add_node(single);
        // The first emitted node is the entry point of the trace
        if let Some(initial) = self.acc.take_delegated_kind(EdgeType::Initial) {
            self.acc
                .add_edge(initial.node, id, initial.count, EdgeType::Initial);
        }
        id
    }
}

impl TreeVisitor for FullTreeVisitor {
    type Output = Vec<usize>;

    fn visit_single(
        &mut self,
        _tree: &ActivationTree,
        _node: NodeRef,
        single: &Single,
    ) -> Result<Self::Output, GraphError> {
        Ok(vec![self.emit(single)])
    }

    fn visit_group(
        &mut self,
        tree: &ActivationTree,
        _node: NodeRef,
        group: &Group,
    ) -> Result<Self::Output, GraphError> {
        let mut entries: HashMap<NodeRef, usize> = HashMap::with_capacity(group.elements.len());
        for element in &group.elements {
            if let Some(id) = walk(self, tree, *element)?.first() {
                entries.insert(*element, *id);
            }
        }

        for transition in &group.transitions {
            if let (Some(previous), Some(next)) = (
                entries.get(&transition.previous),
                entries.get(&transition.next),
            ) {
                self.acc
                    .add_edge(*previous, *next, transition.count, EdgeType::Sequence);
            }
        }

        Ok(entries.get(&group.next).copied().into_iter().collect())
    }

    fn visit_call(
        &mut self,
        tree: &ActivationTree,
        node: NodeRef,
        call: &Call,
    ) -> Result<Self::Output, GraphError> {
        let callers = walk(self, tree, call.caller)?;
        let Some(caller_id) = callers.first().copied() else {
            return Ok(callers);
        };
        if let Some(caller) = self.acc.node_mut(caller_id) {
            caller.repr = tree.repr(node);
        }

        let callees = walk(self, tree, call.called)?;
        for (position, callee_id) in callees.into_iter().enumerate() {
            self.acc
                .add_edge(caller_id, callee_id, position as u64 + 1, EdgeType::Call);
        }
        Ok(vec![caller_id])
    }

    fn visit_mixed(
        &mut self,
        tree: &ActivationTree,
        node: NodeRef,
        mixed: &Mixed,
    ) -> Result<Self::Output, GraphError> {
        let outcome = mixed.outcome().ok_or(GraphError::UnmixedNode(node))?;
        let ids = walk(self, tree, outcome.first)?;
        if let Some(representative) = ids.first().and_then(|id| self.acc.node_mut(*id)) {
            representative.duration = outcome.duration;
        }
        Ok(ids)
    }
}
