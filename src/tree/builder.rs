//! Build a call tree from a flat activation trace.
//!
//! Activations arrive ordered by start time. Nesting is recovered with a
//! stack of pending sibling lists, one per open call level. Each list
//! remembers the activation that opened it:
//!
//! ```text
//! main            level 0   stack: [-: [main]]
//!   f             level 1   stack: [-: [main], main: [f]]
//!   f             level 1   stack: [-: [main], main: [f, f]]
//! ```
//!
//! When the trace returns to a shallower level the top list is closed into
//! a `Call` on the caller one level up. At the end every open list is closed.

use super::structures::{ActivationTree, NodeRef, Single};
use crate::parser::schema::{Activation, ActivationId, ActivationTrace};
use crate::utils::error::TreeError;
use log::debug;
use std::collections::HashMap;

/// Siblings waiting for their caller to return
#[derive(Debug)]
struct PendingList {
    /// Activation every sibling must name as its parent
    caller: Option<ActivationId>,
    siblings: Vec<NodeRef>,
}

/// Build the call tree of one trial
///
/// **Public** - main entry point for tree construction
///
/// # Arguments
/// * `trace` - Activations of one trial, ordered by start time
///
/// # Returns
/// A tree whose root covers every activation. An empty trace yields a tree
/// holding a single terminal element.
///
/// # Errors
/// * `TreeError::UnknownParent` - A parent id that was never seen
/// * `TreeError::LevelGap` - A child more than one level below the last call
/// * `TreeError::NotNestedUnderCaller` - A child whose parent is not the
///   call open at its level
pub fn build_activation_tree(trace: &ActivationTrace) -> Result<ActivationTree, TreeError> {
    debug!(
        "Building activation tree for trial {} from {} activations",
        trace.trial_id,
        trace.len()
    );

    let Some((first, rest)) = trace.activations.split_first() else {
        debug!("Trial {} has no activations", trace.trial_id);
        return Ok(ActivationTree::empty(trace.trial_id));
    };

    let mut tree = ActivationTree::with_capacity(trace.trial_id, trace.len() * 2);
    let mut levels: HashMap<ActivationId, usize> = HashMap::with_capacity(trace.len());

    levels.insert(first.id, 0);
    let root = tree.add_single(Single::new(first.clone()));
    let mut stack = vec![PendingList {
        caller: None,
        siblings: vec![root],
    }];
    let mut previous = first.id;

    for activation in rest {
        let level = match activation.parent_id {
            None => 0,
            Some(parent) => {
                let parent_level = levels.get(&parent).ok_or(TreeError::UnknownParent {
                    activation: activation.id,
                    parent,
                })?;
                parent_level + 1
            }
        };
        levels.insert(activation.id, level);

        let mut single = Single::new(activation.clone());
        single.level = level;
        let node = tree.add_single(single);

        let last_level = top_level(&tree, &stack);
        if level > last_level {
            if level != last_level + 1 {
                return Err(TreeError::LevelGap {
                    activation: activation.id,
                    level,
                    deepest: last_level,
                });
            }
            check_caller(activation, Some(previous))?;
            // Descending into a call
            stack.push(PendingList {
                caller: Some(previous),
                siblings: vec![node],
            });
        } else {
            // Returning from one or more calls
            while top_level(&tree, &stack) > level {
                close_call(&mut tree, &mut stack);
            }
            if let Some(pending) = stack.last_mut() {
                check_caller(activation, pending.caller)?;
                pending.siblings.push(node);
            }
        }
        previous = activation.id;
    }

    while stack.len() > 1 {
        close_call(&mut tree, &mut stack);
    }

    // Several top-level activations become one sequence
    let mut roots = stack.pop().map(|pending| pending.siblings).unwrap_or_default();
    let mut root = roots.pop().unwrap_or(root);
    while let Some(previous) = roots.pop() {
        root = tree.sequence(previous, root);
    }
    tree.set_root(root);

    debug!(
        "Built tree with {} structural nodes",
        tree.structural_count()
    );
    Ok(tree)
}

/// Level of the most recent pending element
fn top_level(tree: &ActivationTree, stack: &[PendingList]) -> usize {
    stack
        .last()
        .and_then(|pending| pending.siblings.last())
        .map(|node| tree.level(*node))
        .unwrap_or_default()
}

/// The activation must be a child of the call open at its level
fn check_caller(activation: &Activation, caller: Option<ActivationId>) -> Result<(), TreeError> {
    if activation.parent_id == caller {
        return Ok(());
    }
    Err(TreeError::NotNestedUnderCaller {
        activation: activation.id,
        parent: activation.parent_id.unwrap_or_default(),
        caller: caller.unwrap_or_default(),
    })
}

/// Close the top pending list into a `Call` on its caller
///
/// Siblings are folded back to front through `sequence`, so a list with a
/// single element stays as it is and longer lists become a `Group`.
fn close_call(tree: &mut ActivationTree, stack: &mut Vec<PendingList>) {
    let Some(mut pending) = stack.pop() else {
        return;
    };
    let Some(mut called) = pending.siblings.pop() else {
        return;
    };
    while let Some(previous) = pending.siblings.pop() {
        called = tree.sequence(previous, called);
    }
    let Some(callers) = stack.last_mut() else {
        return;
    };
    if let Some(caller) = callers.siblings.pop() {
        let call = tree.add_call(caller, called);
        callers.siblings.push(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::Activation;
    use crate::tree::structures::StructuralNode;

    fn trace(activations: Vec<Activation>) -> ActivationTrace {
        ActivationTrace::new(1, activations)
    }

    #[test]
    fn test_empty_trace_builds_terminal_tree() {
        let tree = build_activation_tree(&trace(vec![])).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_single_activation_is_root() {
        let tree = build_activation_tree(&trace(vec![Activation::new(0, None, "main", 0, 5)])).unwrap();
        assert!(matches!(tree.node(tree.root()), StructuralNode::Single(_)));
        assert_eq!(tree.single_count(), 1);
    }

    #[test]
    fn test_sequential_children_become_group() {
        let tree = build_activation_tree(&trace(vec![
            Activation::new(0, None, "main", 0, 300),
            Activation::new(1, Some(0), "f", 10, 60),
            Activation::new(2, Some(0), "f", 70, 120),
        ]))
        .unwrap();

        let StructuralNode::Call(call) = tree.node(tree.root()) else {
            panic!("root should be a call");
        };
        assert_eq!(tree.single(call.caller).unwrap().activation.name, "main");
        let StructuralNode::Group(group) = tree.node(call.called) else {
            panic!("callee should be a group");
        };
        assert_eq!(group.elements.len(), 2);
        assert_eq!(group.level, 1);
        assert_eq!(tree.single(group.next).unwrap().activation.id, 1);
        assert_eq!(tree.single(group.last).unwrap().activation.id, 2);
    }

    #[test]
    fn test_multi_level_return() {
        // main -> a -> b -> c, then d back at level 1
        let tree = build_activation_tree(&trace(vec![
            Activation::new(0, None, "main", 0, 100),
            Activation::new(1, Some(0), "a", 1, 50),
            Activation::new(2, Some(1), "b", 2, 40),
            Activation::new(3, Some(2), "c", 3, 30),
            Activation::new(4, Some(0), "d", 60, 90),
        ]))
        .unwrap();

        assert_eq!(tree.single_count(), 5);
        let StructuralNode::Call(root) = tree.node(tree.root()) else {
            panic!("root should be a call");
        };
        let StructuralNode::Group(group) = tree.node(root.called) else {
            panic!("callee should be a group");
        };
        assert!(matches!(tree.node(group.next), StructuralNode::Call(_)));
        assert_eq!(tree.single(group.last).unwrap().activation.name, "d");
    }

    #[test]
    fn test_top_level_siblings_fold_into_group() {
        let tree = build_activation_tree(&trace(vec![
            Activation::new(0, None, "a", 0, 10),
            Activation::new(1, None, "b", 10, 20),
        ]))
        .unwrap();
        assert!(matches!(tree.node(tree.root()), StructuralNode::Group(_)));
        assert_eq!(tree.single_count(), 2);
    }

    #[test]
    fn test_unknown_parent_is_malformed() {
        let err = build_activation_tree(&trace(vec![
            Activation::new(0, None, "main", 0, 10),
            Activation::new(1, Some(9), "f", 1, 2),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            TreeError::UnknownParent {
                activation: 1,
                parent: 9
            }
        );
    }

    #[test]
    fn test_sibling_of_returned_call_is_malformed() {
        // `c` names `a` as its parent, but `a` returned before `x` started
        let err = build_activation_tree(&trace(vec![
            Activation::new(0, None, "main", 0, 100),
            Activation::new(1, Some(0), "a", 1, 20),
            Activation::new(2, Some(1), "b", 2, 10),
            Activation::new(3, Some(0), "x", 30, 90),
            Activation::new(4, Some(3), "xx", 31, 40),
            Activation::new(5, Some(1), "c", 41, 50),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            TreeError::NotNestedUnderCaller {
                activation: 5,
                parent: 1,
                caller: 3
            }
        );
    }

    #[test]
    fn test_return_to_wrong_caller_is_malformed() {
        // After `b` returns, level 1 is owned by `main`, not by `other`
        let err = build_activation_tree(&trace(vec![
            Activation::new(0, None, "main", 0, 100),
            Activation::new(1, None, "other", 0, 100),
            Activation::new(2, Some(1), "a", 1, 10),
            Activation::new(3, Some(2), "b", 2, 8),
            Activation::new(4, Some(0), "late", 20, 30),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            TreeError::NotNestedUnderCaller {
                activation: 4,
                caller: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_child_of_finished_call_is_malformed() {
        let err = build_activation_tree(&trace(vec![
            Activation::new(0, None, "main", 0, 100),
            Activation::new(1, Some(0), "a", 1, 10),
            Activation::new(2, Some(0), "b", 11, 20),
            Activation::new(3, Some(1), "late", 21, 22),
        ]))
        .unwrap_err();
        assert!(matches!(err, TreeError::NotNestedUnderCaller { .. }));
    }
}
