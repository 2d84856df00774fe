//! Rules that decide whether a stopped migration task failed.

pub const DEFAULT_FAILURE_MARKER: &str = "rake aborted";

/// What the runner knows about a stopped migration task.
#[derive(Debug, Clone, Copy)]
pub struct MigrationEvidence<'a> {
    pub log_lines: &'a [String],
    /// Exit code of the migration container, when the provider reported one.
    pub exit_code: Option<i32>,
}

pub trait FailureDetector {
    fn is_failure(&self, evidence: &MigrationEvidence<'_>) -> bool;

    fn describe(&self) -> String;
}

/// Fails when any log line contains the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerDetector {
    marker: String,
}

impl MarkerDetector {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Default for MarkerDetector {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_MARKER)
    }
}

impl FailureDetector for MarkerDetector {
    fn is_failure(&self, evidence: &MigrationEvidence<'_>) -> bool {
        evidence
            .log_lines
            .iter()
            .any(|line| line.contains(self.marker.as_str()))
    }

    fn describe(&self) -> String {
        format!("log contains {:?}", self.marker)
    }
}

/// Fails when the container exited with a non-zero code.
///
/// A missing exit code is not treated as a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitCodeDetector;

impl FailureDetector for ExitCodeDetector {
    fn is_failure(&self, evidence: &MigrationEvidence<'_>) -> bool {
        evidence.exit_code.is_some_and(|code| code != 0)
    }

    fn describe(&self) -> String {
        "non-zero container exit code".to_string()
    }
}

/// Fails when any inner detector does.
#[derive(Default)]
pub struct AnyDetector {
    detectors: Vec<Box<dyn FailureDetector + Send + Sync>>,
}

impl AnyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, detector: impl FailureDetector + Send + Sync + 'static) -> Self {
        self.detectors.push(Box::new(detector));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl FailureDetector for AnyDetector {
    fn is_failure(&self, evidence: &MigrationEvidence<'_>) -> bool {
        self.detectors
            .iter()
            .any(|detector| detector.is_failure(evidence))
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.detectors.iter().map(|d| d.describe()).collect();
        parts.join(" or ")
    }
}
