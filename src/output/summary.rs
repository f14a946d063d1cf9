//! Plain-text summary of a rendered graph.

use crate::graph::{EdgeType, GraphDocument, GraphNode};

/// Table of the slowest graph nodes
///
/// **Public** - printed by the graph command with `--summary`
pub fn generate_text_summary(document: &GraphDocument, max_lines: usize) -> String {
    let mut nodes: Vec<&GraphNode> = document.nodes.iter().collect();
    nodes.sort_by(|a, b| b.duration.cmp(&a.duration).then(a.id.cmp(&b.id)));

    let mut lines = Vec::new();
    lines.push(format!(
        "  {:<6} {:<40} {:>12} {:>8} {:>12}",
        "ID", "FUNCTION", "DURATION", "COUNT", "MEAN"
    ));
    lines.push(format!("  {}", "-".repeat(82)));

    for node in nodes.iter().take(max_lines) {
        let label = node.namespace.as_deref().unwrap_or(&node.name);
        // Truncate long call paths for display
        let label = if label.chars().count() > 40 {
            let tail: String = label
                .chars()
                .rev()
                .take(37)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("...{}", tail)
        } else {
            label.to_string()
        };
        lines.push(format!(
            "  {:<6} {:<40} {:>12} {:>8} {:>12.2}",
            node.id, label, node.duration, node.count, node.mean
        ));
    }

    if nodes.len() > max_lines {
        lines.push(String::new());
        lines.push(format!(
            "   (Showing top {} of {} nodes)",
            max_lines,
            nodes.len()
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "  Edges: {} call, {} return, {} sequence, {} initial",
        document.edges_of(EdgeType::Call).count(),
        document.edges_of(EdgeType::Return).count(),
        document.edges_of(EdgeType::Sequence).count(),
        document.edges_of(EdgeType::Initial).count()
    ));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: usize, name: &str, duration: u64) -> GraphNode {
        GraphNode {
            id,
            name: name.to_string(),
            repr: format!("S(0-{})", name),
            namespace: None,
            duration,
            mean: duration as f64,
            count: 1,
            trial_id: 1,
            info: String::new(),
        }
    }

    #[test]
    fn test_summary_orders_by_duration() {
        let document = GraphDocument {
            nodes: vec![node(0, "fast", 10), node(1, "slow", 500)],
            ..Default::default()
        };
        let summary = generate_text_summary(&document, 10);
        let slow = summary.find("slow").unwrap();
        let fast = summary.find("fast").unwrap();
        assert!(slow < fast);
    }

    #[test]
    fn test_summary_truncates_rows() {
        let document = GraphDocument {
            nodes: (0..5).map(|i| node(i, "f", i as u64)).collect(),
            ..Default::default()
        };
        let summary = generate_text_summary(&document, 2);
        assert!(summary.contains("Showing top 2 of 5 nodes"));
    }
}
