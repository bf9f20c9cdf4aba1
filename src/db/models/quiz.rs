use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Question;

/// A prepared quiz as stored under its join code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredQuiz {
    pub code: String,
    pub subject: String,
    pub section: Option<String>,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}
