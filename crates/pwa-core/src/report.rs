//! Structured consistency reporting.
//!
//! Consistency checks return serializable reports instead of logging; a clean
//! report has no findings.

use serde::{Deserialize, Serialize};

/// A single structural problem discovered by a consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable machine readable code for the class of problem.
    pub code: String,
    /// Human readable description pointing at the offending entity.
    pub detail: String,
}

/// Accumulated findings from one or more consistency checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// All findings in discovery order.
    pub findings: Vec<Finding>,
}

impl ConsistencyReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finding.
    pub fn push(&mut self, code: impl Into<String>, detail: impl Into<String>) {
        self.findings.push(Finding {
            code: code.into(),
            detail: detail.into(),
        });
    }

    /// Appends all findings from another report.
    pub fn merge(&mut self, other: ConsistencyReport) {
        self.findings.extend(other.findings);
    }

    /// Returns true when no problems were found.
    pub fn is_ok(&self) -> bool {
        self.findings.is_empty()
    }

    /// Returns the number of findings.
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Returns true when the report holds no findings.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}
