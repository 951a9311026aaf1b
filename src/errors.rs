use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Why a collaborator call did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    #[error("{0}")]
    Failed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("Invalid grade: {0}")]
    InvalidGrade(String),

    #[error("Invalid evaluation: {0}")]
    InvalidEvaluation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gradebook load failed: {0}")]
    LoadFailure(Failure),

    #[error("Grade write failed: {0}")]
    PersistFailure(Failure),

    #[error("Grade write for '{student_id}' on '{evaluation_id}' is already in flight")]
    CommitInFlight {
        student_id: String,
        evaluation_id: String,
    },

    #[error("Response discarded: gradebook was closed")]
    Discarded,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidGrade(_) => "INVALID_GRADE",
            AppError::InvalidEvaluation(_) => "INVALID_EVALUATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::LoadFailure(Failure::Timeout(_)) => "LOAD_TIMEOUT",
            AppError::LoadFailure(_) => "LOAD_FAILURE",
            AppError::PersistFailure(Failure::Timeout(_)) => "PERSIST_TIMEOUT",
            AppError::PersistFailure(_) => "PERSIST_FAILURE",
            AppError::CommitInFlight { .. } => "COMMIT_IN_FLIGHT",
            AppError::Discarded => "DISCARDED",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// True for the "taking longer than expected" flavour of load/persist failures.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AppError::LoadFailure(Failure::Timeout(_))
                | AppError::PersistFailure(Failure::Timeout(_))
        )
    }

    /// Message shown next to a cell or above the grid.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidGrade(_) => "Grade must be between 1.0 and 7.0".to_string(),
            AppError::LoadFailure(Failure::Timeout(_))
            | AppError::PersistFailure(Failure::Timeout(_)) => {
                "Taking longer than expected, please retry".to_string()
            }
            AppError::LoadFailure(_) => "Could not load the gradebook, please retry".to_string(),
            AppError::PersistFailure(_) => "Could not save the grade, please retry".to_string(),
            AppError::CommitInFlight { .. } => "This grade is still being saved".to_string(),
            AppError::Discarded => {
                "The gradebook was closed, reload to see the latest grades".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Body returned to callers that expose the gradebook over a transport.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            error: err.to_string(),
            code: err.error_code(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::InvalidGrade("7.5".into()).error_code(), "INVALID_GRADE");
        assert_eq!(
            AppError::LoadFailure(Failure::Timeout(Duration::from_secs(15))).error_code(),
            "LOAD_TIMEOUT"
        );
        assert_eq!(
            AppError::PersistFailure(Failure::Failed("500".into())).error_code(),
            "PERSIST_FAILURE"
        );
    }

    #[test]
    fn test_timeout_is_a_specialization_of_load_and_persist() {
        assert!(AppError::LoadFailure(Failure::Timeout(Duration::from_secs(1))).is_timeout());
        assert!(AppError::PersistFailure(Failure::Timeout(Duration::from_secs(1))).is_timeout());
        assert!(!AppError::LoadFailure(Failure::Failed("boom".into())).is_timeout());
        assert!(!AppError::Upstream("boom".into()).is_timeout());
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::NotFound("evaluation e9".into());
        assert_eq!(err.to_string(), "Not found: evaluation e9");

        let err = AppError::CommitInFlight {
            student_id: "s1".into(),
            evaluation_id: "e1".into(),
        };
        assert!(err.to_string().contains("already in flight"));
        assert!(AppError::Discarded.user_message().starts_with("The gradebook was closed"));
    }

    #[test]
    fn test_error_response_carries_code() {
        let err = AppError::InvalidEvaluation("total_points must be positive".into());
        let body = ErrorResponse::from(&err);
        assert_eq!(body.code, "INVALID_EVALUATION");
        assert!(body.error.contains("total_points"));
    }
}
