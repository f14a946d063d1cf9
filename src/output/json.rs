//! JSON report writer.
//!
//! Writes GraphReport structs to JSON files with proper formatting.

use super::report::GraphReport;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::path::Path;

/// Write a report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `report` - Report to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_report(report: &GraphReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing graph report to: {}", output_path.display());

    validate_output_path(output_path)?;

    // Create parent directories if needed
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let json = report_to_string(report)?;
    std::fs::write(output_path, &json).map_err(OutputError::WriteFailed)?;

    info!(
        "Report written successfully: trial {}, {} view, {} nodes, {} edges ({} bytes)",
        report.trial_id,
        report.mode,
        report.graph.nodes.len(),
        report.graph.edges.len(),
        json.len()
    );

    Ok(())
}

/// Serialize a report to a pretty JSON string
///
/// **Public** - useful for tests and piping to stdout
pub fn report_to_string(report: &GraphReport) -> Result<String, OutputError> {
    serde_json::to_string_pretty(report).map_err(OutputError::SerializationFailed)
}

/// Read a report back from disk
///
/// **Public** - used by the validate command
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
/// * `OutputError::IncompatibleVersion` - Written by another schema major version
pub fn read_report(input_path: impl AsRef<Path>) -> Result<GraphReport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading report from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let report: GraphReport =
        serde_json::from_reader(file).map_err(OutputError::SerializationFailed)?;

    if major_version(&report.version) != major_version(SCHEMA_VERSION) {
        return Err(OutputError::IncompatibleVersion {
            found: report.version,
            expected: SCHEMA_VERSION.to_string(),
        });
    }

    debug!(
        "Report loaded: version {}, trial {}, mode {}",
        report.version, report.trial_id, report.mode
    );

    Ok(report)
}

/// Validate that output path is writable
///
/// **Public** - also used by argument validation
pub fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    // Check if we're trying to overwrite a directory
    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphDocument;
    use crate::output::report::to_report;
    use crate::trial_graph::GraphMode;
    use tempfile::NamedTempFile;

    fn create_test_report() -> GraphReport {
        to_report(3, GraphMode::Combine, 0, GraphDocument::default())
    }

    #[test]
    fn test_write_and_read_report() {
        let report = create_test_report();
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        write_report(&report, path).unwrap();
        let loaded = read_report(path).unwrap();

        assert_eq!(loaded, report);
    }

    #[test]
    fn test_read_rejects_other_major_version() {
        let mut report = create_test_report();
        report.version = "2.0.0".to_string();
        let temp_file = NamedTempFile::new().unwrap();
        write_report(&report, temp_file.path()).unwrap();

        assert!(matches!(
            read_report(temp_file.path()),
            Err(OutputError::IncompatibleVersion { .. })
        ));
    }

    #[test]
    fn test_validate_output_path_empty() {
        assert!(validate_output_path(Path::new("")).is_err());
    }

    #[test]
    fn test_validate_output_path_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(validate_output_path(temp_dir.path()).is_err());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/graph.json");

        write_report(&create_test_report(), &nested_path).unwrap();

        assert!(nested_path.exists());
    }

    #[test]
    fn test_written_file_matches_string_form() {
        let report = create_test_report();
        let temp_file = NamedTempFile::new().unwrap();

        write_report(&report, temp_file.path()).unwrap();

        let written = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(written, report_to_string(&report).unwrap());
    }

    #[test]
    fn test_report_to_string_has_mode() {
        let json = report_to_string(&create_test_report()).unwrap();
        assert!(json.contains("\"mode\": \"combine\""));
    }
}
