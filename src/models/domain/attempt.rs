use serde::{Deserialize, Serialize};

use super::CellKey;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    #[serde(alias = "in-progress")]
    InProgress,
    Submitted,
    Graded,
    Overdue,
    /// Any status string the attempt provider sends that we do not know.
    #[serde(other)]
    Unknown,
}

/// A student's interaction with an evaluation, independent of whether a
/// grade has been recorded for it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Attempt {
    #[serde(rename = "attempt_id")]
    pub id: String,
    pub student_id: String,
    #[serde(rename = "eval_id")]
    pub evaluation_id: String,
    pub status: AttemptStatus,
    #[serde(rename = "score_raw", default, skip_serializing_if = "Option::is_none")]
    pub raw_score: Option<i32>,
    #[serde(default)]
    pub auto_graded: bool,
}

impl Attempt {
    pub fn new(id: &str, student_id: &str, evaluation_id: &str, status: AttemptStatus) -> Self {
        Attempt {
            id: id.to_string(),
            student_id: student_id.to_string(),
            evaluation_id: evaluation_id.to_string(),
            status,
            raw_score: None,
            auto_graded: false,
        }
    }

    pub fn auto_graded_with(mut self, raw_score: i32) -> Self {
        self.raw_score = Some(raw_score);
        self.auto_graded = true;
        self
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(&self.student_id, &self.evaluation_id)
    }
}
