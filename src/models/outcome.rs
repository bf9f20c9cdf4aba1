use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PassFail {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TerminationReason {
    Submitted,
    TimedOut,
    IntegrityViolation,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            other => Err(anyhow!("unknown attendance status '{other}'")),
        }
    }
}

impl PassFail {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassFail::Pass => "Pass",
            PassFail::Fail => "Fail",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Pass" => Ok(PassFail::Pass),
            "Fail" => Ok(PassFail::Fail),
            other => Err(anyhow!("unknown pass/fail value '{other}'")),
        }
    }
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::Submitted => "Submitted",
            TerminationReason::TimedOut => "TimedOut",
            TerminationReason::IntegrityViolation => "IntegrityViolation",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Submitted" => Ok(TerminationReason::Submitted),
            "TimedOut" => Ok(TerminationReason::TimedOut),
            "IntegrityViolation" => Ok(TerminationReason::IntegrityViolation),
            other => Err(anyhow!("unknown termination reason '{other}'")),
        }
    }
}

/// Final result of one attempt. Derived once on entering a terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub score: u32,
    pub total: u32,
    pub attendance_status: AttendanceStatus,
    pub pass_fail: PassFail,
    pub termination_reason: TerminationReason,
}
