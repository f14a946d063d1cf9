//! Input schema for activation traces.
//!
//! These are the records an external trace store hands us for one trial.
//! Nesting levels are not part of the input; the tree builder derives them.

use serde::{Deserialize, Serialize};

pub type ActivationId = u64;
pub type TrialId = u64;

/// One runtime invocation of a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activation {
    /// Activation id, unique within a trial
    pub id: ActivationId,

    /// Calling activation (`None` for top-level activations)
    #[serde(default, alias = "caller_id", alias = "parent")]
    pub parent_id: Option<ActivationId>,

    /// Trial that recorded this activation
    #[serde(default)]
    pub trial_id: TrialId,

    /// Function name
    pub name: String,

    /// Source line of the call site
    #[serde(default)]
    pub line: u32,

    /// Start timestamp in microseconds
    pub start: u64,

    /// Finish timestamp in microseconds
    pub finish: u64,
}

impl Activation {
    pub fn new(
        id: ActivationId,
        parent_id: Option<ActivationId>,
        name: impl Into<String>,
        start: u64,
        finish: u64,
    ) -> Self {
        Self {
            id,
            parent_id,
            trial_id: 0,
            name: name.into(),
            line: 0,
            start,
            finish,
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn with_trial(mut self, trial_id: TrialId) -> Self {
        self.trial_id = trial_id;
        self
    }

    /// Elapsed time between start and finish
    pub fn duration(&self) -> u64 {
        self.finish.saturating_sub(self.start)
    }

    /// Name qualified by call-site line, used for namespaces
    pub fn name_id(&self) -> String {
        format!("{}-{}", self.line, self.name)
    }
}

/// Ordered activations of a single trial
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationTrace {
    pub trial_id: TrialId,
    pub activations: Vec<Activation>,
}

impl ActivationTrace {
    /// Build a trace, stamping every activation with the trial id
    pub fn new(trial_id: TrialId, activations: Vec<Activation>) -> Self {
        let activations = activations
            .into_iter()
            .map(|a| a.with_trial(trial_id))
            .collect();
        Self {
            trial_id,
            activations,
        }
    }

    pub fn len(&self) -> usize {
        self.activations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_saturates() {
        let act = Activation::new(1, None, "f", 50, 10);
        assert_eq!(act.duration(), 0);
    }

    #[test]
    fn test_caller_id_alias() {
        let act: Activation = serde_json::from_value(serde_json::json!({
            "id": 2, "caller_id": 1, "name": "g", "start": 5, "finish": 9
        }))
        .unwrap();
        assert_eq!(act.parent_id, Some(1));
        assert_eq!(act.duration(), 4);
        assert_eq!(act.line, 0);
    }

    #[test]
    fn test_trace_stamps_trial() {
        let trace = ActivationTrace::new(7, vec![Activation::new(0, None, "main", 0, 1)]);
        assert_eq!(trace.activations[0].trial_id, 7);
        assert_eq!(trace.len(), 1);
    }
}
