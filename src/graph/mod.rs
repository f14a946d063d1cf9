//! Graph views of an activation tree.
//!
//! This module walks structural trees and produces renderer-ready graphs:
//! - Full tree: every occurrence, every recorded count
//! - No match: occurrences linked through delegated edges
//! - Exact match: identical subtrees collapsed first
//! - Combine: occurrences aggregated by qualified call path

pub mod accumulator;
pub mod combine;
pub mod exact_match;
pub mod full_tree;
pub mod no_match;
pub mod visitor;

// Re-export main types
pub use accumulator::{
    Delegation, EdgeType, GraphAccumulator, GraphDocument, GraphEdge, GraphNode, NodeInfo,
    PendingEdge,
};
pub use combine::{ByNamespace, CombineVisitor};
pub use exact_match::ExactMatchVisitor;
pub use full_tree::FullTreeVisitor;
pub use no_match::{DelegatingVisitor, NoMatchVisitor, NodeMerge, PerOccurrence};
pub use visitor::{walk, TreeVisitor};
