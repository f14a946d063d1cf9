//! Mutable graph state filled in by a visitor, and its exported form.
//!
//! One accumulator belongs to exactly one traversal. Besides the node and
//! edge lists it tracks delegated edges: edges whose far endpoint is only
//! known once the visitor reaches the node that supplies it.

use crate::parser::schema::{ActivationId, TrialId};
use crate::tree::Single;
use crate::utils::config::{INITIAL_EDGE_COUNT, INITIAL_NODE_ID};
use crate::utils::error::GraphError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a graph edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Initial,
    Call,
    Return,
    Sequence,
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeType::Initial => "initial",
            EdgeType::Call => "call",
            EdgeType::Return => "return",
            EdgeType::Sequence => "sequence",
        };
        f.write_str(name)
    }
}

/// Descriptive details of a graph node
///
/// Activations are absorbed while the traversal runs; counts and timing are
/// filled in once at export, after which the info is frozen to text.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub name: String,
    pub line: u32,
    pub trial_id: TrialId,
    /// `(activation id, duration)` of every activation behind the node
    pub activations: Vec<(ActivationId, u64)>,
    pub count: u64,
    pub duration: u64,
    pub mean: f64,
}

impl NodeInfo {
    pub fn from_single(single: &Single) -> Self {
        let mut info = Self {
            name: single.activation.name.clone(),
            line: single.activation.line,
            trial_id: single.activation.trial_id,
            activations: Vec::new(),
            count: single.count,
            duration: single.duration,
            mean: 0.0,
        };
        info.add_activations(single);
        info
    }

    pub fn add_activations(&mut self, single: &Single) {
        self.activations
            .extend(single.activations().map(|a| (a.id, a.duration())));
    }

    fn update_by_node(&mut self, count: u64, duration: u64, mean: f64) {
        self.count = count;
        self.duration = duration;
        self.mean = mean;
    }
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} (line {}, trial {})",
            self.name, self.line, self.trial_id
        )?;
        writeln!(
            f,
            "count: {} | duration: {} | mean: {:.2}",
            self.count, self.duration, self.mean
        )?;
        let activations: Vec<String> = self
            .activations
            .iter()
            .map(|(id, duration)| format!("#{} ({})", id, duration))
            .collect();
        write!(f, "activations: {}", activations.join(", "))
    }
}

/// A node while the traversal is still running
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedNode {
    pub id: usize,
    pub name: String,
    pub repr: String,
    pub namespace: Option<String>,
    pub duration: u64,
    pub count: u64,
    pub trial_id: TrialId,
    pub info: NodeInfo,
}

impl AccumulatedNode {
    pub fn from_single(id: usize, single: &Single) -> Self {
        Self {
            id,
            name: single.activation.name.clone(),
            repr: single.repr(),
            namespace: None,
            duration: single.duration,
            count: single.count,
            trial_id: single.activation.trial_id,
            info: NodeInfo::from_single(single),
        }
    }

    /// Fold another occurrence into this node
    pub fn absorb(&mut self, single: &Single) {
        self.count += single.count;
        self.duration += single.duration;
        self.info.add_activations(single);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulatedEdge {
    pub source: usize,
    pub target: usize,
    pub count: u64,
    pub kind: EdgeType,
}

/// Exported graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: usize,
    pub name: String,
    pub repr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub duration: u64,
    /// `duration / count`
    pub mean: f64,
    pub count: u64,
    pub trial_id: TrialId,
    pub info: String,
}

/// Exported graph edge
///
/// `count` is `None` where counting is not meaningful (call and return
/// edges of deduplicated views).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: usize,
    pub target: usize,
    pub count: Option<u64>,
    #[serde(rename = "type")]
    pub kind: EdgeType,
}

/// Graph handed to renderers and reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub min_duration: BTreeMap<TrialId, u64>,
    pub max_duration: BTreeMap<TrialId, u64>,
}

impl GraphDocument {
    pub fn node(&self, id: usize) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_of(&self, kind: EdgeType) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }
}

/// Endpoint of an edge waiting for its other end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEdge {
    pub node: usize,
    pub count: u64,
}

/// Delegated edges, at most one per kind
///
/// Every slot is filled once and consumed once. A traversal that ends with
/// a filled slot has broken a structural invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delegation {
    initial: Option<PendingEdge>,
    call: Option<PendingEdge>,
    /// Edge from an element to whatever follows its enclosing subtree.
    /// The bundled views link group elements through `Group::transitions`
    /// and never fill this slot; other visitors may.
    sequence: Option<PendingEdge>,
    ret: Option<PendingEdge>,
}

impl Delegation {
    /// State at the start of a traversal: the synthetic entry edge
    pub fn seeded() -> Self {
        Self {
            initial: Some(PendingEdge {
                node: INITIAL_NODE_ID,
                count: INITIAL_EDGE_COUNT,
            }),
            ..Self::default()
        }
    }

    fn slot(&mut self, kind: EdgeType) -> &mut Option<PendingEdge> {
        match kind {
            EdgeType::Initial => &mut self.initial,
            EdgeType::Call => &mut self.call,
            EdgeType::Sequence => &mut self.sequence,
            EdgeType::Return => &mut self.ret,
        }
    }

    pub fn get(&self, kind: EdgeType) -> Option<PendingEdge> {
        match kind {
            EdgeType::Initial => self.initial,
            EdgeType::Call => self.call,
            EdgeType::Sequence => self.sequence,
            EdgeType::Return => self.ret,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }

    /// Kinds that still wait for an endpoint
    pub fn pending(&self) -> Vec<EdgeType> {
        [
            EdgeType::Initial,
            EdgeType::Call,
            EdgeType::Return,
            EdgeType::Sequence,
        ]
        .into_iter()
        .filter(|kind| self.get(*kind).is_some())
        .collect()
    }

    /// Hand over every pending entry, leaving this state empty
    pub fn take(&mut self) -> Delegation {
        std::mem::take(self)
    }

    pub fn take_kind(&mut self, kind: EdgeType) -> Option<PendingEdge> {
        self.slot(kind).take()
    }

    pub fn defer(&mut self, kind: EdgeType, edge: PendingEdge) -> Result<(), GraphError> {
        let slot = self.slot(kind);
        if slot.is_some() {
            return Err(GraphError::DelegationConflict { kind });
        }
        *slot = Some(edge);
        Ok(())
    }

    /// Entries whose target is the next visited node, in resolution order
    pub fn forward(&self) -> impl Iterator<Item = (EdgeType, PendingEdge)> + '_ {
        [EdgeType::Call, EdgeType::Initial, EdgeType::Sequence]
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|edge| (kind, edge)))
    }
}

/// Per-visitor graph state
#[derive(Debug, Clone)]
pub struct GraphAccumulator {
    nodes: Vec<AccumulatedNode>,
    edges: Vec<AccumulatedEdge>,
    delegation: Delegation,
    erase_call_counts: bool,
    exported: Option<GraphDocument>,
}

impl Default for GraphAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphAccumulator {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            delegation: Delegation::seeded(),
            erase_call_counts: false,
            exported: None,
        }
    }

    /// Replace call and return edge counts by a placeholder at export
    pub fn with_erased_call_counts(mut self, erase: bool) -> Self {
        self.erase_call_counts = erase;
        self
    }

    pub fn nodes(&self) -> &[AccumulatedNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[AccumulatedEdge] {
        &self.edges
    }

    pub fn add_node(&mut self, single: &Single) -> usize {
        let id = self.nodes.len();
        self.nodes.push(AccumulatedNode::from_single(id, single));
        id
    }

    pub fn node_mut(&mut self, id: usize) -> Option<&mut AccumulatedNode> {
        self.nodes.get_mut(id)
    }

    /// Append an edge and return its index
    pub fn add_edge(&mut self, source: usize, target: usize, count: u64, kind: EdgeType) -> usize {
        self.edges.push(AccumulatedEdge {
            source,
            target,
            count,
            kind,
        });
        self.edges.len() - 1
    }

    pub fn edge_mut(&mut self, index: usize) -> Option<&mut AccumulatedEdge> {
        self.edges.get_mut(index)
    }

    pub fn take_delegated(&mut self) -> Delegation {
        self.delegation.take()
    }

    pub fn take_delegated_kind(&mut self, kind: EdgeType) -> Option<PendingEdge> {
        self.delegation.take_kind(kind)
    }

    pub fn defer(&mut self, kind: EdgeType, node: usize, count: u64) -> Result<(), GraphError> {
        self.delegation.defer(kind, PendingEdge { node, count })
    }

    /// Drop the synthetic entry edge of a trace with nothing to enter
    pub fn discard_initial(&mut self) {
        self.delegation.take_kind(EdgeType::Initial);
    }

    /// Export the accumulated graph
    ///
    /// **Public** - the first call computes means, freezes node info and
    /// records duration extrema; later calls return the same document.
    ///
    /// # Errors
    /// * `GraphError::UnresolvedDelegation` - Delegated edges were never consumed
    /// * `GraphError::ZeroCount` - A node has no occurrences to average over
    pub fn to_document(&mut self) -> Result<GraphDocument, GraphError> {
        if let Some(document) = &self.exported {
            return Ok(document.clone());
        }

        if !self.delegation.is_empty() {
            return Err(GraphError::UnresolvedDelegation {
                kinds: self.delegation.pending(),
            });
        }

        let mut min_duration: BTreeMap<TrialId, u64> = BTreeMap::new();
        let mut max_duration: BTreeMap<TrialId, u64> = BTreeMap::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());

        for node in &mut self.nodes {
            if node.count == 0 {
                return Err(GraphError::ZeroCount { node: node.id });
            }
            let mean = node.duration as f64 / node.count as f64;
            node.info.update_by_node(node.count, node.duration, mean);

            min_duration
                .entry(node.trial_id)
                .and_modify(|d| *d = (*d).min(node.duration))
                .or_insert(node.duration);
            max_duration
                .entry(node.trial_id)
                .and_modify(|d| *d = (*d).max(node.duration))
                .or_insert(node.duration);

            nodes.push(GraphNode {
                id: node.id,
                name: node.name.clone(),
                repr: node.repr.clone(),
                namespace: node.namespace.clone(),
                duration: node.duration,
                mean,
                count: node.count,
                trial_id: node.trial_id,
                info: node.info.to_string(),
            });
        }

        let edges = self
            .edges
            .iter()
            .map(|edge| {
                let erased = self.erase_call_counts
                    && matches!(edge.kind, EdgeType::Call | EdgeType::Return);
                GraphEdge {
                    source: edge.source,
                    target: edge.target,
                    count: (!erased).then_some(edge.count),
                    kind: edge.kind,
                }
            })
            .collect();

        debug!(
            "Exported graph with {} nodes and {} edges",
            self.nodes.len(),
            self.edges.len()
        );

        let document = GraphDocument {
            nodes,
            edges,
            min_duration,
            max_duration,
        };
        self.exported = Some(document.clone());
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::Activation;

    fn single(id: u64, name: &str, start: u64, finish: u64) -> Single {
        Single::new(Activation::new(id, None, name, start, finish).with_trial(1))
    }

    #[test]
    fn test_delegation_seeded_with_initial() {
        let delegation = Delegation::seeded();
        assert_eq!(delegation.pending(), vec![EdgeType::Initial]);
        assert_eq!(
            delegation.get(EdgeType::Initial),
            Some(PendingEdge { node: 0, count: 1 })
        );
    }

    #[test]
    fn test_delegation_take_empties_state() {
        let mut delegation = Delegation::seeded();
        let taken = delegation.take();
        assert!(delegation.is_empty());
        assert!(!taken.is_empty());
    }

    #[test]
    fn test_delegation_rejects_double_defer() {
        let mut delegation = Delegation::default();
        let edge = PendingEdge { node: 3, count: 1 };
        delegation.defer(EdgeType::Call, edge).unwrap();
        assert_eq!(
            delegation.defer(EdgeType::Call, edge),
            Err(GraphError::DelegationConflict {
                kind: EdgeType::Call
            })
        );
    }

    #[test]
    fn test_forward_order() {
        let mut delegation = Delegation::seeded();
        delegation
            .defer(EdgeType::Call, PendingEdge { node: 2, count: 1 })
            .unwrap();
        delegation
            .defer(EdgeType::Return, PendingEdge { node: 2, count: 1 })
            .unwrap();
        let kinds: Vec<EdgeType> = delegation.forward().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![EdgeType::Call, EdgeType::Initial]);
    }

    #[test]
    fn test_sequence_slot_resolves_last() {
        let mut delegation = Delegation::seeded();
        delegation
            .defer(EdgeType::Sequence, PendingEdge { node: 4, count: 2 })
            .unwrap();
        delegation
            .defer(EdgeType::Call, PendingEdge { node: 1, count: 1 })
            .unwrap();
        let forward: Vec<(EdgeType, PendingEdge)> = delegation.forward().collect();
        assert_eq!(
            forward,
            vec![
                (EdgeType::Call, PendingEdge { node: 1, count: 1 }),
                (EdgeType::Initial, PendingEdge { node: 0, count: 1 }),
                (EdgeType::Sequence, PendingEdge { node: 4, count: 2 }),
            ]
        );

        let taken = delegation.take_kind(EdgeType::Sequence);
        assert_eq!(taken, Some(PendingEdge { node: 4, count: 2 }));
        assert_eq!(delegation.pending(), vec![EdgeType::Initial, EdgeType::Call]);
    }

    #[test]
    fn test_export_computes_mean_and_extrema() {
        let mut acc = GraphAccumulator::new();
        acc.discard_initial();
        let root = acc.add_node(&single(0, "main", 0, 300));
        let child = acc.add_node(&single(1, "f", 0, 40));
        acc.node_mut(child).unwrap().absorb(&single(2, "f", 0, 60));
        acc.add_edge(root, child, 1, EdgeType::Call);

        let document = acc.to_document().unwrap();
        assert_eq!(document.nodes[0].mean, 300.0);
        assert_eq!(document.nodes[1].count, 2);
        assert_eq!(document.nodes[1].mean, 50.0);
        assert_eq!(document.min_duration[&1], 100);
        assert_eq!(document.max_duration[&1], 300);
        assert!(document.nodes[1].info.contains("#1 (40), #2 (60)"));
        assert_eq!(document.edges[0].count, Some(1));
    }

    #[test]
    fn test_export_is_cached() {
        let mut acc = GraphAccumulator::new();
        acc.discard_initial();
        acc.add_node(&single(0, "main", 0, 90));
        let first = acc.to_document().unwrap();
        acc.node_mut(0).unwrap().duration = 1;
        let second = acc.to_document().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_export_erases_call_counts() {
        let mut acc = GraphAccumulator::new().with_erased_call_counts(true);
        acc.discard_initial();
        let a = acc.add_node(&single(0, "a", 0, 1));
        let b = acc.add_node(&single(1, "b", 0, 1));
        acc.add_edge(a, b, 1, EdgeType::Call);
        acc.add_edge(b, a, 1, EdgeType::Return);
        acc.add_edge(a, b, 3, EdgeType::Sequence);

        let document = acc.to_document().unwrap();
        assert_eq!(document.edges[0].count, None);
        assert_eq!(document.edges[1].count, None);
        assert_eq!(document.edges[2].count, Some(3));
    }

    #[test]
    fn test_zero_count_is_fatal() {
        let mut acc = GraphAccumulator::new();
        acc.discard_initial();
        let id = acc.add_node(&single(0, "main", 0, 10));
        acc.node_mut(id).unwrap().count = 0;
        assert_eq!(
            acc.to_document(),
            Err(GraphError::ZeroCount { node: 0 })
        );
    }

    #[test]
    fn test_unresolved_delegation_is_fatal() {
        let mut acc = GraphAccumulator::new();
        assert_eq!(
            acc.to_document(),
            Err(GraphError::UnresolvedDelegation {
                kinds: vec![EdgeType::Initial]
            })
        );
    }
}
