//! Collapse structurally identical subtrees before deduplicating.
//!
//! The rewrite copies the tree with activation ids stripped from every
//! identity key. Rebuilding each group then merges siblings that are the
//! same call shape, which turns a loop that always runs the same sequence
//! into a single element with a self transition.

use super::accumulator::GraphDocument;
use super::no_match::NoMatchVisitor;
use super::visitor::{walk, TreeVisitor};
use crate::tree::{ActivationTree, Call, Group, MixPolicy, Mixed, NodeRef, Single};
use crate::utils::error::GraphError;
use log::debug;
use std::collections::HashMap;

/// Rewrites a tree into its id-stripped equivalence form
#[derive(Debug)]
pub struct ExactMatchVisitor {
    stripped: ActivationTree,
}

impl ExactMatchVisitor {
    fn new(source: &ActivationTree) -> Self {
        Self {
            stripped: ActivationTree::with_capacity(source.trial_id, source.structural_count()),
        }
    }

    /// Build the stripped tree and mix every collapsed node
    ///
    /// **Public** - the result is ready for any graph visitor
    pub fn rewrite(tree: &ActivationTree, policy: MixPolicy) -> Result<ActivationTree, GraphError> {
        if tree.is_empty() {
            return Ok(ActivationTree::empty(tree.trial_id));
        }

        let mut visitor = Self::new(tree);
        let root = walk(&mut visitor, tree, tree.root())?;
        let mut stripped = visitor.stripped;
        stripped.set_root(root);
        stripped.mix_results(policy);

        debug!(
            "Exact match rewrite of trial {}: {} -> {} structural nodes",
            tree.trial_id,
            tree.structural_count(),
            stripped.structural_count()
        );
        Ok(stripped)
    }

    /// Rewrite, then deduplicate with a fresh [`NoMatchVisitor`]
    pub fn render(tree: &ActivationTree, policy: MixPolicy) -> Result<GraphDocument, GraphError> {
        let stripped = Self::rewrite(tree, policy)?;
        NoMatchVisitor::new().render(&stripped)
    }
}

impl TreeVisitor for ExactMatchVisitor {
    type Output = NodeRef;

    fn visit_single(
        &mut self,
        _tree: &ActivationTree,
        _node: NodeRef,
        single: &Single,
    ) -> Result<NodeRef, GraphError> {
        let mut stripped = single.clone();
        stripped.use_id = false;
        Ok(self.stripped.add_single(stripped))
    }

    fn visit_group(
        &mut self,
        tree: &ActivationTree,
        node: NodeRef,
        group: &Group,
    ) -> Result<NodeRef, GraphError> {
        let mut rewritten: HashMap<NodeRef, NodeRef> = HashMap::with_capacity(group.elements.len());
        for element in &group.elements {
            let copy = walk(self, tree, *element)?;
            rewritten.insert(*element, copy);
        }

        // Replay occurrences back to front so equivalent siblings merge
        let mut occurrences = group
            .sequence
            .iter()
            .rev()
            .filter_map(|element| rewritten.get(element).copied());
        let mut current = occurrences
            .next()
            .ok_or(GraphError::UnexpectedEmpty(node))?;
        for previous in occurrences {
            current = self.stripped.sequence(previous, current);
        }
        self.stripped.set_level(current, group.level);
        Ok(current)
    }

    fn visit_call(
        &mut self,
        tree: &ActivationTree,
        _node: NodeRef,
        call: &Call,
    ) -> Result<NodeRef, GraphError> {
        let caller = walk(self, tree, call.caller)?;
        let called = walk(self, tree, call.called)?;
        Ok(self.stripped.add_call(caller, called))
    }

    fn visit_mixed(
        &mut self,
        tree: &ActivationTree,
        _node: NodeRef,
        mixed: &Mixed,
    ) -> Result<NodeRef, GraphError> {
        let elements = mixed
            .elements
            .iter()
            .map(|element| walk(self, tree, *element))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.stripped.add_mixed(elements, mixed.level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::{Activation, ActivationTrace};
    use crate::tree::{build_activation_tree, StructuralNode};

    #[test]
    fn test_rewrite_collapses_repeated_calls() {
        let trace = ActivationTrace::new(
            1,
            vec![
                Activation::new(0, None, "main", 0, 300),
                Activation::new(1, Some(0), "f", 10, 60),
                Activation::new(2, Some(1), "g", 20, 30),
                Activation::new(3, Some(0), "f", 70, 150),
                Activation::new(4, Some(3), "g", 80, 90),
            ],
        );
        let tree = build_activation_tree(&trace).unwrap();
        let stripped = ExactMatchVisitor::rewrite(&tree, MixPolicy::Sum).unwrap();

        let StructuralNode::Call(root) = stripped.node(stripped.root()) else {
            panic!("root should be a call");
        };
        let StructuralNode::Group(group) = stripped.node(root.called) else {
            panic!("callee should be a group");
        };
        assert_eq!(group.elements.len(), 1);
        let StructuralNode::Mixed(mixed) = stripped.node(group.next) else {
            panic!("repeated call should be mixed");
        };
        let outcome = mixed.outcome().unwrap();
        assert_eq!(outcome.duration, 130);
        let StructuralNode::Call(first) = stripped.node(outcome.first) else {
            panic!("representative should be a call");
        };
        assert_eq!(stripped.single(first.caller).unwrap().activation.id, 1);
        assert_eq!(stripped.single_count(), 5);
    }

    #[test]
    fn test_rewrite_keeps_distinct_siblings() {
        let trace = ActivationTrace::new(
            1,
            vec![
                Activation::new(0, None, "main", 0, 300),
                Activation::new(1, Some(0), "f", 10, 60),
                Activation::new(2, Some(0), "g", 70, 120),
            ],
        );
        let tree = build_activation_tree(&trace).unwrap();
        let stripped = ExactMatchVisitor::rewrite(&tree, MixPolicy::Sum).unwrap();
        assert_eq!(stripped.single_count(), 3);
        assert_eq!(stripped.structural_count(), tree.structural_count());
    }

    #[test]
    fn test_rewrite_empty_tree() {
        let stripped = ExactMatchVisitor::rewrite(&ActivationTree::empty(2), MixPolicy::Max).unwrap();
        assert!(stripped.is_empty());
        assert_eq!(stripped.trial_id, 2);
    }
}
