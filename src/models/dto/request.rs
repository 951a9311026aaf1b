use serde::{Deserialize, Serialize};
use validator::Validate;

/// A teacher's grade command as it enters the store.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommitGradeRequest {
    #[validate(length(min = 1, max = 100))]
    pub student_id: String,

    #[validate(length(min = 1, max = 100))]
    pub evaluation_id: String,

    #[validate(range(min = 1.0, max = 7.0))]
    pub scaled_grade: f64,

    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

impl CommitGradeRequest {
    pub fn new(
        student_id: &str,
        evaluation_id: &str,
        scaled_grade: f64,
        note: Option<String>,
    ) -> Self {
        CommitGradeRequest {
            student_id: student_id.to_string(),
            evaluation_id: evaluation_id.to_string(),
            scaled_grade,
            note,
        }
    }
}

/// Body of the write sent to the grade-persistence collaborator
/// (`POST /evaluation/{eval_id}/grade`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeWriteRequest {
    pub student_id: String,
    #[serde(rename = "score")]
    pub raw_score: i32,
    #[serde(rename = "feedback", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_request_validates_grade_range() {
        assert!(CommitGradeRequest::new("s1", "e1", 6.0, None).validate().is_ok());
        assert!(CommitGradeRequest::new("s1", "e1", 7.5, None).validate().is_err());
        assert!(CommitGradeRequest::new("s1", "e1", 0.9, None).validate().is_err());
    }

    #[test]
    fn commit_request_rejects_empty_ids_and_long_notes() {
        assert!(CommitGradeRequest::new("", "e1", 5.0, None).validate().is_err());
        let long_note = "x".repeat(1001);
        assert!(CommitGradeRequest::new("s1", "e1", 5.0, Some(long_note)).validate().is_err());
    }

    #[test]
    fn grade_write_uses_collaborator_field_names() {
        let write = GradeWriteRequest {
            student_id: "s1".to_string(),
            raw_score: 17,
            note: Some("Excelente".to_string()),
            attempt_id: None,
        };
        let json = serde_json::to_value(&write).expect("write should serialize");
        assert_eq!(json["score"], 17);
        assert_eq!(json["feedback"], "Excelente");
        assert!(json.get("attempt_id").is_none());
    }
}
