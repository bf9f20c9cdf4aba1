use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AttendanceStatus, PassFail, TerminationReason};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: String,
    pub quiz_code: String,
    /// Filled from the quiz table when listing; not written.
    pub subject: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub score: u32,
    pub total: u32,
    pub attendance_status: AttendanceStatus,
    pub pass_fail: PassFail,
    pub termination_reason: TerminationReason,
    pub violations: u32,
    pub remaining_secs: u32,
}

/// Aggregates for the results view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub attempts: u32,
    pub average_score: f64,
    pub present_count: u32,
    pub pass_count: u32,
}
