//! Dispatch contract shared by every tree traversal.

use crate::tree::{ActivationTree, Call, Group, Mixed, NodeRef, Single, StructuralNode};
use crate::utils::error::GraphError;

/// One traversal strategy over an [`ActivationTree`]
///
/// Each method receives the tree, the reference of the visited node and the
/// node itself. `Output` is whatever the caller needs to link edges (graph
/// node ids for graph views, rewritten references for tree rewrites).
pub trait TreeVisitor {
    type Output;

    fn visit_single(
        &mut self,
        tree: &ActivationTree,
        node: NodeRef,
        single: &Single,
    ) -> Result<Self::Output, GraphError>;

    fn visit_group(
        &mut self,
        tree: &ActivationTree,
        node: NodeRef,
        group: &Group,
    ) -> Result<Self::Output, GraphError>;

    fn visit_call(
        &mut self,
        tree: &ActivationTree,
        node: NodeRef,
        call: &Call,
    ) -> Result<Self::Output, GraphError>;

    fn visit_mixed(
        &mut self,
        tree: &ActivationTree,
        node: NodeRef,
        mixed: &Mixed,
    ) -> Result<Self::Output, GraphError>;
}

/// Dispatch `node` to the matching visitor method
///
/// Empty elements only exist as the root of an empty tree; visitors check
/// for that before walking, so meeting one here is an error.
pub fn walk<V>(visitor: &mut V, tree: &ActivationTree, node: NodeRef) -> Result<V::Output, GraphError>
where
    V: TreeVisitor + ?Sized,
{
    match tree.node(node) {
        StructuralNode::Empty { .. } => Err(GraphError::UnexpectedEmpty(node)),
        StructuralNode::Single(single) => visitor.visit_single(tree, node, single),
        StructuralNode::Group(group) => visitor.visit_group(tree, node, group),
        StructuralNode::Call(call) => visitor.visit_call(tree, node, call),
        StructuralNode::Mixed(mixed) => visitor.visit_mixed(tree, node, mixed),
    }
}
