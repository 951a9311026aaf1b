use serde::{Deserialize, Serialize};

use crate::models::domain::{Attempt, Evaluation, GradeEntry, Student};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RosterResponse {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub evaluations: Vec<Evaluation>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GradebookResponse {
    #[serde(default)]
    pub entries: Vec<GradeEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AttemptsResponse {
    #[serde(default)]
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GradeWriteResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Scaled grade the server recorded, when it reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<f64>,
}
