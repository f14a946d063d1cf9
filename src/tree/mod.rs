//! Reconstruction of nested call trees from flat activation traces.
//!
//! This module transforms an ordered activation list into:
//! - An arena of structural nodes (`Single`, `Group`, `Call`, `Mixed`)
//! - Structural merging of equivalent siblings once ids are stripped

pub mod builder;
pub mod structures;

// Re-export main types and functions
pub use builder::build_activation_tree;
pub use structures::{
    ActivationTree, Call, Group, MixOutcome, MixPolicy, Mixed, NodeRef, Single, StructuralNode,
    Transition,
};
