//! Activation trace parser.
//!
//! Parses raw JSON exported from a trace store into an ordered
//! [`ActivationTrace`]. Handles the layouts different exporters produce.

use super::schema::{Activation, ActivationTrace, TrialId};
use crate::utils::config::{ACTIVATION_FIELD_NAMES, TRIAL_FIELD_NAMES};
use crate::utils::error::ParseError;
use log::{debug, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Parse a raw activation trace
///
/// **Public** - main entry point for parsing
///
/// # Arguments
/// * `raw_trace` - Either a bare array of activations, or an object holding
///   the array under one of [`ACTIVATION_FIELD_NAMES`]
///
/// # Returns
/// The trial's activations in recorded order
///
/// # Errors
/// * `ParseError::InvalidFormat` - Not an array/object, or every entry failed
pub fn parse_trace(raw_trace: &serde_json::Value) -> Result<ActivationTrace, ParseError> {
    let (entries, trial_id) = match raw_trace {
        serde_json::Value::Array(entries) => {
            debug!("Trace is a bare activation array");
            (entries.as_slice(), None)
        }
        serde_json::Value::Object(obj) => {
            let entries = ACTIVATION_FIELD_NAMES
                .iter()
                .find_map(|field| obj.get(*field).and_then(|v| v.as_array()))
                .map(|v| v.as_slice())
                .unwrap_or_else(|| {
                    warn!("No activation list found in trace");
                    &[]
                });
            let trial_id = TRIAL_FIELD_NAMES
                .iter()
                .find_map(|field| obj.get(*field).and_then(|v| v.as_u64()));
            (entries, trial_id)
        }
        _ => {
            return Err(ParseError::InvalidFormat(
                "Trace must be a JSON object or array".to_string(),
            ))
        }
    };

    let activations = parse_activation_array(entries)?;

    // Fall back to the trial recorded on the activations themselves
    let trial_id: TrialId = trial_id
        .or_else(|| activations.first().map(|a| a.trial_id))
        .unwrap_or_default();

    debug!(
        "Parsed {} activations for trial {}",
        activations.len(),
        trial_id
    );

    Ok(ActivationTrace::new(trial_id, activations))
}

/// Read and parse a trace file
///
/// **Public** - used by the graph command
pub fn load_trace(input_path: impl AsRef<Path>) -> Result<ActivationTrace, ParseError> {
    let input_path = input_path.as_ref();
    debug!("Reading trace from: {}", input_path.display());

    let file = File::open(input_path)?;
    let raw: serde_json::Value = serde_json::from_reader(BufReader::new(file))?;
    let trace = parse_trace(&raw)?;
    validate_trace_order(&trace)?;
    Ok(trace)
}

/// Check that activations are ordered by start time
///
/// **Public** - the tree builder relies on this ordering
pub fn validate_trace_order(trace: &ActivationTrace) -> Result<(), ParseError> {
    for pair in trace.activations.windows(2) {
        if pair[1].start < pair[0].start {
            return Err(ParseError::InvalidFormat(format!(
                "Activation {} starts at {} before activation {} at {}",
                pair[1].id, pair[1].start, pair[0].id, pair[0].start
            )));
        }
    }
    Ok(())
}

/// Parse array of activation entries
///
/// **Private** - malformed entries are skipped, not fatal
fn parse_activation_array(entries: &[serde_json::Value]) -> Result<Vec<Activation>, ParseError> {
    let mut activations = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<Activation>(entry.clone()) {
            Ok(activation) => activations.push(activation),
            Err(e) => {
                warn!("Failed to parse activation {}: {}", index, e);
            }
        }
    }

    if activations.is_empty() && !entries.is_empty() {
        return Err(ParseError::InvalidFormat(
            "All activations failed to parse".to_string(),
        ));
    }

    Ok(activations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let raw = json!([
            {"id": 0, "name": "main", "start": 0, "finish": 300},
            {"id": 1, "parent_id": 0, "name": "f", "start": 10, "finish": 60}
        ]);
        let trace = parse_trace(&raw).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.activations[1].parent_id, Some(0));
    }

    #[test]
    fn test_parse_object_with_trial() {
        let raw = json!({
            "trial_id": 4,
            "function_activations": [
                {"id": 0, "name": "main", "start": 0, "finish": 300}
            ]
        });
        let trace = parse_trace(&raw).unwrap();
        assert_eq!(trace.trial_id, 4);
        assert_eq!(trace.activations[0].trial_id, 4);
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        let raw = json!([
            {"id": 0, "name": "main", "start": 0, "finish": 300},
            {"id": "broken"}
        ]);
        let trace = parse_trace(&raw).unwrap();
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn test_parse_all_malformed_fails() {
        let raw = json!([{"id": "broken"}]);
        assert!(parse_trace(&raw).is_err());
    }

    #[test]
    fn test_parse_rejects_scalar() {
        assert!(parse_trace(&json!(42)).is_err());
    }

    #[test]
    fn test_parse_missing_list_is_empty() {
        let trace = parse_trace(&json!({"trial": 2})).unwrap();
        assert!(trace.is_empty());
        assert_eq!(trace.trial_id, 2);
    }

    #[test]
    fn test_validate_trace_order() {
        let ordered = ActivationTrace::new(
            1,
            vec![
                Activation::new(0, None, "main", 0, 10),
                Activation::new(1, Some(0), "f", 2, 4),
            ],
        );
        assert!(validate_trace_order(&ordered).is_ok());

        let unordered = ActivationTrace::new(
            1,
            vec![
                Activation::new(0, None, "main", 5, 10),
                Activation::new(1, Some(0), "f", 2, 4),
            ],
        );
        assert!(validate_trace_order(&unordered).is_err());
    }
}
