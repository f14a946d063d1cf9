use pretty_assertions::assert_eq;
use trial_graph::parser::{parse_trace, Activation, ActivationTrace};
use trial_graph::tree::{build_activation_tree, MixPolicy, StructuralNode};
use trial_graph::utils::error::TreeError;

fn nested_trace() -> ActivationTrace {
    ActivationTrace::new(
        1,
        vec![
            Activation::new(0, None, "main", 0, 300),
            Activation::new(1, Some(0), "f", 10, 60),
            Activation::new(2, Some(0), "f", 70, 120),
        ],
    )
}

#[test]
fn test_parsed_trace_builds_call_tree() {
    let raw = serde_json::json!({
        "trial_id": 4,
        "activations": [
            {"id": 0, "name": "main", "line": 1, "start": 0, "finish": 50},
            {"id": 1, "caller_id": 0, "name": "load", "line": 2, "start": 5, "finish": 20},
        ]
    });
    let trace = parse_trace(&raw).unwrap();
    let tree = build_activation_tree(&trace).unwrap();

    assert_eq!(tree.trial_id, 4);
    assert_eq!(tree.repr(tree.root()), "C(S(1-main) S(2-load))");
    assert_eq!(tree.level(tree.root()), 0);
}

#[test]
fn test_group_key_keeps_activation_ids() {
    let tree = build_activation_tree(&nested_trace()).unwrap();
    let StructuralNode::Call(call) = tree.node(tree.root()) else {
        panic!("root should be a call");
    };

    assert_eq!(tree.repr(call.called), "G(S(0-f), S(0-f))");
    assert_eq!(tree.key(call.called), "G(S(0-f)#1, S(0-f)#2 | 0>1)");
    assert_eq!(tree.level(call.called), 1);
    assert_eq!(tree.duration(call.called), 100);
}

#[test]
fn test_distinct_ids_never_mix() {
    let mut tree = build_activation_tree(&nested_trace()).unwrap();
    // Nothing collapses while ids are part of the key
    assert_eq!(tree.mix_results(MixPolicy::Sum), 0);
    assert_eq!(tree.single_count(), 3);
}

#[test]
fn test_deep_nesting_returns_to_caller() {
    let mut trace = nested_trace();
    trace.activations.push(Activation::new(3, Some(2), "g", 80, 90));
    trace.activations.push(Activation::new(4, Some(3), "h", 81, 82));
    trace.activations.push(Activation::new(5, Some(0), "k", 130, 140));
    let tree = build_activation_tree(&trace).unwrap();
    assert_eq!(tree.single_count(), 6);
    assert_eq!(tree.duration(tree.root()), 300);
}

#[test]
fn test_level_gap_is_malformed() {
    let gap = ActivationTrace::new(
        1,
        vec![
            Activation::new(0, None, "main", 0, 10),
            Activation::new(1, Some(0), "a", 1, 9),
            Activation::new(2, Some(1), "b", 2, 8),
            Activation::new(3, None, "next", 11, 12),
            Activation::new(4, Some(2), "late", 13, 14),
        ],
    );
    let err = build_activation_tree(&gap).unwrap_err();
    assert_eq!(
        err,
        TreeError::LevelGap {
            activation: 4,
            level: 3,
            deepest: 0
        }
    );
}
