//! Per-issue triage output.

use serde::{Deserialize, Serialize};

use crate::{Department, IssueCategory, IssuePriority};

/// Which path produced a [`TriageResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageSource {
    /// The external language model answered.
    Oracle,
    /// The deterministic keyword rules were used.
    Fallback,
}

/// Classification of one newly submitted issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResult {
    /// Assigned category.
    pub category: IssueCategory,
    /// Assigned priority.
    pub priority: IssuePriority,
    /// Confidence in the classification, 0-100.
    pub confidence: u8,
    /// Free-text explanation.
    pub reasoning: String,
    /// Department the issue is routed to.
    pub department: Department,
    /// Which path produced this result.
    pub source: TriageSource,
    /// Why the oracle could not be used, when it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
