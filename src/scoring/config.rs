use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Product rules for a quiz attempt with tunable thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizRules {
    /// Questions every set must contain
    pub question_count: usize,

    /// Countdown length for the active phase
    pub duration_secs: u32,

    /// Focus losses that force termination
    pub violation_threshold: u32,

    /// Score needed for attendance to be marked Present
    pub attendance_threshold: u32,

    /// Score needed to pass
    pub pass_threshold: u32,

    /// Remaining time under which the clock is shown as urgent
    pub urgent_threshold_secs: u32,
}

impl Default for QuizRules {
    fn default() -> Self {
        Self {
            question_count: 20,
            duration_secs: 600,
            violation_threshold: 3,
            attendance_threshold: 16,
            pass_threshold: 12,
            urgent_threshold_secs: 120,
        }
    }
}

impl QuizRules {
    pub fn validate(&self) -> Result<()> {
        if self.question_count == 0 {
            bail!("question_count must be greater than zero");
        }
        if self.duration_secs == 0 {
            bail!("duration_secs must be greater than zero");
        }
        if self.violation_threshold == 0 {
            bail!("violation_threshold must be greater than zero");
        }
        let total = self.question_count as u64;
        if u64::from(self.attendance_threshold) > total {
            bail!(
                "attendance_threshold {} exceeds question_count {}",
                self.attendance_threshold,
                self.question_count
            );
        }
        if u64::from(self.pass_threshold) > total {
            bail!(
                "pass_threshold {} exceeds question_count {}",
                self.pass_threshold,
                self.question_count
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_behavior() {
        let rules = QuizRules::default();
        assert_eq!(rules.question_count, 20);
        assert_eq!(rules.duration_secs, 600);
        assert_eq!(rules.violation_threshold, 3);
        assert_eq!(rules.attendance_threshold, 16);
        assert_eq!(rules.pass_threshold, 12);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn rejects_thresholds_above_question_count() {
        let rules = QuizRules {
            pass_threshold: 21,
            ..QuizRules::default()
        };
        assert!(rules.validate().is_err());

        let rules = QuizRules {
            question_count: 10,
            ..QuizRules::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let rules: QuizRules = serde_json::from_str(r#"{"durationSecs": 300}"#).unwrap();
        assert_eq!(rules.duration_secs, 300);
        assert_eq!(rules.question_count, 20);
    }
}
