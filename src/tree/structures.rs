//! Structural nodes of a reconstructed call tree.
//!
//! The tree lives in an arena ([`ActivationTree`]) and nodes reference each
//! other through [`NodeRef`] indices. Every node is one of:
//!
//! | Variant  | Meaning |
//! |----------|---------|
//! | `Single` | one activation (possibly several folded into it) |
//! | `Group`  | siblings executed in sequence, with transition counts |
//! | `Call`   | a caller and the subtree it invoked |
//! | `Mixed`  | structurally equivalent elements collapsed into one |
//! | `Empty`  | the terminal element of an empty trace |
//!
//! Nodes have an identity `key`. While `use_id` is set the key includes the
//! activation id, so no two occurrences are ever equivalent. Stripping ids
//! turns the key into a purely structural signature, and prepending an
//! equivalent element to a group merges it into the existing one.
//!
//! A call's key names its children by interned signature numbers rather
//! than embedding their keys, so keys stay short however deep the tree is.
//! The display `repr` is rendered on demand.

use crate::parser::schema::{Activation, TrialId};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a node inside an [`ActivationTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef(usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How the durations of collapsed elements combine
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum MixPolicy {
    /// Durations add up
    #[default]
    Sum,
    /// The slowest element wins
    Max,
}

/// A leaf call
#[derive(Debug, Clone, PartialEq)]
pub struct Single {
    pub activation: Activation,
    /// Activations folded into this one by structural merging
    pub absorbed: Vec<Activation>,
    pub count: u64,
    pub duration: u64,
    pub level: usize,
    pub use_id: bool,
}

impl Single {
    pub fn new(activation: Activation) -> Self {
        Self {
            duration: activation.duration(),
            activation,
            absorbed: Vec::new(),
            count: 1,
            level: 0,
            use_id: true,
        }
    }

    pub fn repr(&self) -> String {
        format!("S({}-{})", self.activation.line, self.activation.name)
    }

    pub fn key(&self) -> String {
        if self.use_id {
            format!("{}#{}", self.repr(), self.activation.id)
        } else {
            self.repr()
        }
    }

    pub fn name_id(&self) -> String {
        self.activation.name_id()
    }

    /// Representative activation followed by every absorbed one
    pub fn activations(&self) -> impl Iterator<Item = &Activation> {
        std::iter::once(&self.activation).chain(self.absorbed.iter())
    }

    /// Fold in an equivalent occurrence that ran before this one
    ///
    /// The earliest activation stays the representative.
    fn mix_earlier(&mut self, earlier: &Single) {
        self.count += earlier.count;
        self.duration += earlier.duration;
        let mut absorbed = earlier.absorbed.clone();
        absorbed.push(std::mem::replace(
            &mut self.activation,
            earlier.activation.clone(),
        ));
        absorbed.append(&mut self.absorbed);
        self.absorbed = absorbed;
    }
}

/// One `previous -> next` transition between group elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: NodeRef,
    pub next: NodeRef,
    pub count: u64,
}

/// Siblings executed one after another
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Distinct elements, in order of first appearance
    pub elements: Vec<NodeRef>,
    /// Every occurrence, in execution order
    pub sequence: Vec<NodeRef>,
    pub transitions: Vec<Transition>,
    /// First element
    pub next: NodeRef,
    /// Last element
    pub last: NodeRef,
    pub count: u64,
    pub duration: u64,
    pub level: usize,
    pub use_id: bool,
    index: HashMap<String, NodeRef>,
    key: String,
}

impl Group {
    fn add_transition(&mut self, previous: NodeRef, next: NodeRef) {
        match self
            .transitions
            .iter_mut()
            .find(|t| t.previous == previous && t.next == next)
        {
            Some(t) => t.count += 1,
            None => self.transitions.push(Transition {
                previous,
                next,
                count: 1,
            }),
        }
    }
}

/// A caller and the subtree it invoked
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Always a `Single`
    pub caller: NodeRef,
    pub called: NodeRef,
    pub level: usize,
    pub use_id: bool,
    key: String,
}

/// Result of [`ActivationTree::mix_results`] for one mixed node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixOutcome {
    pub first: NodeRef,
    pub duration: u64,
}

/// Structurally equivalent elements collapsed into one
#[derive(Debug, Clone, PartialEq)]
pub struct Mixed {
    pub elements: Vec<NodeRef>,
    pub level: usize,
    outcome: Option<MixOutcome>,
    key: String,
}

impl Mixed {
    pub fn outcome(&self) -> Option<MixOutcome> {
        self.outcome
    }

    pub fn count(&self) -> u64 {
        self.elements.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructuralNode {
    Empty { level: usize },
    Single(Single),
    Group(Group),
    Call(Call),
    Mixed(Mixed),
}

/// Arena holding the call tree of one trial
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationTree {
    pub trial_id: TrialId,
    nodes: Vec<StructuralNode>,
    root: NodeRef,
    /// Child key -> signature number used inside call keys
    signatures: HashMap<String, usize>,
}

impl ActivationTree {
    /// Tree made of a single terminal element
    pub fn empty(trial_id: TrialId) -> Self {
        Self {
            trial_id,
            nodes: vec![StructuralNode::Empty { level: 0 }],
            root: NodeRef(0),
            signatures: HashMap::new(),
        }
    }

    /// Arena with no nodes yet; `set_root` must be called before use
    pub(crate) fn with_capacity(trial_id: TrialId, capacity: usize) -> Self {
        Self {
            trial_id,
            nodes: Vec::with_capacity(capacity),
            root: NodeRef(0),
            signatures: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeRef) {
        if matches!(self.node(root), StructuralNode::Group(_)) {
            self.seal_group(root);
        }
        self.root = root;
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.node(self.root), StructuralNode::Empty { .. })
    }

    pub fn node(&self, node: NodeRef) -> &StructuralNode {
        &self.nodes[node.0]
    }

    pub fn single(&self, node: NodeRef) -> Option<&Single> {
        match self.node(node) {
            StructuralNode::Single(single) => Some(single),
            _ => None,
        }
    }

    pub fn add_single(&mut self, single: Single) -> NodeRef {
        self.push(StructuralNode::Single(single))
    }

    fn push(&mut self, node: StructuralNode) -> NodeRef {
        self.nodes.push(node);
        NodeRef(self.nodes.len() - 1)
    }

    pub fn level(&self, node: NodeRef) -> usize {
        match self.node(node) {
            StructuralNode::Empty { level } => *level,
            StructuralNode::Single(s) => s.level,
            StructuralNode::Group(g) => g.level,
            StructuralNode::Call(c) => c.level,
            StructuralNode::Mixed(m) => m.level,
        }
    }

    pub(crate) fn set_level(&mut self, node: NodeRef, level: usize) {
        match &mut self.nodes[node.0] {
            StructuralNode::Empty { level: l } => *l = level,
            StructuralNode::Single(s) => s.level = level,
            StructuralNode::Group(g) => g.level = level,
            StructuralNode::Call(c) => c.level = level,
            StructuralNode::Mixed(m) => m.level = level,
        }
    }

    pub fn use_id(&self, node: NodeRef) -> bool {
        match self.node(node) {
            StructuralNode::Empty { .. } | StructuralNode::Mixed(_) => false,
            StructuralNode::Single(s) => s.use_id,
            StructuralNode::Group(g) => g.use_id,
            StructuralNode::Call(c) => c.use_id,
        }
    }

    /// Wall time attributed to a node
    pub fn duration(&self, node: NodeRef) -> u64 {
        match self.node(node) {
            StructuralNode::Empty { .. } => 0,
            StructuralNode::Single(s) => s.duration,
            StructuralNode::Group(g) => g.duration,
            StructuralNode::Call(c) => self.duration(c.caller),
            StructuralNode::Mixed(m) => match m.outcome {
                Some(outcome) => outcome.duration,
                None => m.elements.iter().map(|e| self.duration(*e)).sum(),
            },
        }
    }

    /// Display form of a node
    pub fn repr(&self, node: NodeRef) -> String {
        match self.node(node) {
            StructuralNode::Empty { .. } => "E()".to_string(),
            StructuralNode::Single(s) => s.repr(),
            StructuralNode::Group(g) => {
                let reprs: Vec<String> = g.elements.iter().map(|e| self.repr(*e)).collect();
                format!("G({})", reprs.join(", "))
            }
            StructuralNode::Call(c) => {
                format!("C({} {})", self.repr(c.caller), self.repr(c.called))
            }
            StructuralNode::Mixed(m) => match m.elements.first() {
                Some(first) => self.repr(*first),
                None => "E()".to_string(),
            },
        }
    }

    /// Identity used to detect equivalent elements
    pub fn key(&self, node: NodeRef) -> String {
        match self.node(node) {
            StructuralNode::Empty { .. } => "E()".to_string(),
            StructuralNode::Single(s) => s.key(),
            StructuralNode::Group(g) if g.key.is_empty() => self.describe_group(g),
            StructuralNode::Group(g) => g.key.clone(),
            StructuralNode::Call(c) => c.key.clone(),
            StructuralNode::Mixed(m) => m.key.clone(),
        }
    }

    /// Wrap a caller and its callee subtree
    ///
    /// The call takes the caller's level and pushes the callee one deeper.
    pub fn add_call(&mut self, caller: NodeRef, called: NodeRef) -> NodeRef {
        if matches!(self.node(called), StructuralNode::Group(_)) {
            self.seal_group(called);
        }
        let level = self.level(caller);
        self.set_level(called, level + 1);
        let caller_signature = self.signature(caller);
        let called_signature = self.signature(called);
        let call = Call {
            caller,
            called,
            level,
            use_id: self.use_id(caller),
            key: format!("C({} {})", caller_signature, called_signature),
        };
        self.push(StructuralNode::Call(call))
    }

    /// Number standing for a node's key; equal keys share a number
    fn signature(&mut self, node: NodeRef) -> usize {
        let key = self.key(node);
        let next = self.signatures.len();
        *self.signatures.entry(key).or_insert(next)
    }

    /// Place `previous` in front of `next`
    ///
    /// If `next` is already a group, `previous` becomes its new first
    /// element. Otherwise a fresh group holding both is created.
    pub fn sequence(&mut self, previous: NodeRef, next: NodeRef) -> NodeRef {
        if matches!(self.node(next), StructuralNode::Group(_)) {
            self.prepend(next, previous);
            return next;
        }
        let key = self.key(next);
        let group = Group {
            elements: vec![next],
            sequence: vec![next],
            transitions: Vec::new(),
            next,
            last: next,
            count: 1,
            duration: self.duration(next),
            level: self.level(next),
            use_id: self.use_id(next),
            index: HashMap::from([(key, next)]),
            key: String::new(),
        };
        let group_ref = self.push(StructuralNode::Group(group));
        self.prepend(group_ref, previous);
        group_ref
    }

    fn prepend(&mut self, group_ref: NodeRef, previous: NodeRef) {
        let key = self.key(previous);
        let duration = self.duration(previous);
        let existing = match self.node(group_ref) {
            StructuralNode::Group(g) => g.index.get(&key).copied(),
            _ => return,
        };

        let target = match existing {
            Some(element) if element != previous => {
                self.mix_into(element, previous);
                element
            }
            Some(element) => element,
            None => previous,
        };

        if let StructuralNode::Group(g) = &mut self.nodes[group_ref.0] {
            if existing.is_none() {
                g.elements.insert(0, target);
                g.index.insert(key, target);
            }
            if existing != Some(previous) {
                g.duration += duration;
            }
            let old_first = g.next;
            g.sequence.insert(0, target);
            g.add_transition(target, old_first);
            g.next = target;
        }
    }

    /// Fold `other` into the equivalent `existing` node
    ///
    /// Groups are built back to front, so `other` always ran first.
    fn mix_into(&mut self, existing: NodeRef, other: NodeRef) {
        let other_single = match (self.node(existing), self.node(other)) {
            (StructuralNode::Single(_), StructuralNode::Single(single)) => Some(single.clone()),
            _ => None,
        };
        if let Some(single) = other_single {
            if let StructuralNode::Single(target) = &mut self.nodes[existing.0] {
                target.mix_earlier(&single);
            }
            return;
        }

        if let StructuralNode::Mixed(m) = &mut self.nodes[existing.0] {
            m.elements.insert(0, other);
            m.outcome = None;
            return;
        }

        // Move the existing node aside so references to `existing` now
        // point at the mixed wrapper.
        let level = self.level(existing);
        let key = self.key(existing);
        let moved = std::mem::replace(
            &mut self.nodes[existing.0],
            StructuralNode::Empty { level },
        );
        let moved_ref = self.push(moved);
        self.nodes[existing.0] = StructuralNode::Mixed(Mixed {
            elements: vec![other, moved_ref],
            level,
            outcome: None,
            key,
        });
    }

    /// Collapse a list of equivalent, already-stripped elements
    pub(crate) fn add_mixed(&mut self, elements: Vec<NodeRef>, level: usize) -> NodeRef {
        let key = match elements.first() {
            Some(first) => self.key(*first),
            None => "E()".to_string(),
        };
        self.push(StructuralNode::Mixed(Mixed {
            elements,
            level,
            outcome: None,
            key,
        }))
    }

    fn describe_group(&self, group: &Group) -> String {
        let position: HashMap<NodeRef, usize> = group
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (*e, i))
            .collect();
        let keys: Vec<String> = group.elements.iter().map(|e| self.key(*e)).collect();
        let mut transitions: Vec<String> = group
            .transitions
            .iter()
            .map(|t| format!("{}>{}", position[&t.previous], position[&t.next]))
            .collect();
        transitions.sort();
        format!("G({} | {})", keys.join(", "), transitions.join(" "))
    }

    fn seal_group(&mut self, node: NodeRef) {
        let key = match self.node(node) {
            StructuralNode::Group(g) => self.describe_group(g),
            _ => return,
        };
        if let StructuralNode::Group(g) = &mut self.nodes[node.0] {
            g.key = key;
        }
    }

    /// Decide identity and timing of every unresolved mixed node
    ///
    /// Returns the number of nodes resolved.
    pub fn mix_results(&mut self, policy: MixPolicy) -> usize {
        let mut resolved = 0;
        for index in 0..self.nodes.len() {
            let elements = match &self.nodes[index] {
                StructuralNode::Mixed(m) if m.outcome.is_none() => m.elements.clone(),
                _ => continue,
            };
            let Some(first) = elements.first().copied() else {
                continue;
            };
            let durations = elements.iter().map(|e| self.duration(*e));
            let duration: u64 = match policy {
                MixPolicy::Sum => durations.sum(),
                MixPolicy::Max => durations.max().unwrap_or_default(),
            };
            if let StructuralNode::Mixed(m) = &mut self.nodes[index] {
                m.outcome = Some(MixOutcome { first, duration });
                resolved += 1;
            }
        }
        debug!("Mixed {} collapsed nodes with {:?} policy", resolved, policy);
        resolved
    }

    /// Direct children of a node
    pub fn children(&self, node: NodeRef) -> Vec<NodeRef> {
        match self.node(node) {
            StructuralNode::Empty { .. } | StructuralNode::Single(_) => Vec::new(),
            StructuralNode::Group(g) => g.elements.clone(),
            StructuralNode::Call(c) => vec![c.caller, c.called],
            StructuralNode::Mixed(m) => m.elements.clone(),
        }
    }

    /// Nodes reachable from the root, depth first
    pub fn reachable(&self) -> Vec<NodeRef> {
        let mut visited = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            visited.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        visited
    }

    /// Number of structural nodes reachable from the root
    pub fn structural_count(&self) -> usize {
        self.reachable().len()
    }

    /// Number of activations represented by reachable `Single` nodes
    pub fn single_count(&self) -> usize {
        self.reachable()
            .into_iter()
            .filter_map(|n| self.single(n))
            .map(|s| 1 + s.absorbed.len())
            .sum()
    }
}
