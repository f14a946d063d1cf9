use crate::output::read_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::Result;
use std::path::PathBuf;

/// Validate a graph report file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path)?;

    println!("✓ Valid graph report JSON");
    println!("  Version: {}", report.version);
    println!("  Trial: {}", report.trial_id);
    println!("  Mode: {}", report.mode);
    println!("  Activations: {}", report.activation_count);
    println!("  Nodes: {}", report.graph.nodes.len());
    println!("  Edges: {}", report.graph.edges.len());

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Trial Graph Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string           - Schema version (e.g., '1.0.0')");
        println!("  trial_id: number          - Trial the graph was built from");
        println!("  mode: string              - tree | no_match | exact_match | combine");
        println!("  activation_count: number  - Activations in the trial");
        println!("  generated_at: string      - ISO 8601 timestamp");
        println!("  graph: object");
        println!("    nodes: array");
        println!("      id: number            - Graph node id");
        println!("      name: string          - Function name");
        println!("      repr: string          - Structural form of the node");
        println!("      namespace: string?    - Qualified call path (combine only)");
        println!("      duration: number      - Total duration");
        println!("      mean: number          - duration / count");
        println!("      count: number         - Occurrences");
        println!("      trial_id: number");
        println!("      info: string          - Descriptive text");
        println!("    edges: array");
        println!("      source, target: number");
        println!("      count: number?        - null for deduplicated call/return");
        println!("      type: string          - initial | call | return | sequence");
        println!("    min_duration: object    - trial id -> shortest node duration");
        println!("    max_duration: object    - trial id -> longest node duration");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Trial Graph v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Activation tree reconstruction and graph views for provenance traces.");
}
