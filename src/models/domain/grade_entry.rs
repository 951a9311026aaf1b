use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CellKey;

/// The recorded grade for one `(student, evaluation)` pair. Once present it
/// is authoritative for that cell.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GradeEntry {
    #[serde(rename = "entry_id")]
    pub id: String,
    pub student_id: String,
    #[serde(rename = "eval_id")]
    pub evaluation_id: String,
    #[serde(rename = "nota_10")]
    pub scaled_grade: f64,
    #[serde(rename = "score_raw")]
    pub raw_score: i32,
    pub percentage: f64,
    pub recorded_at: DateTime<Utc>,
    #[serde(rename = "notes", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl GradeEntry {
    pub fn key(&self) -> CellKey {
        CellKey::new(&self.student_id, &self.evaluation_id)
    }
}
