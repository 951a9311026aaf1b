use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationKind {
    Quiz,
    Exam,
    Task,
}

impl std::fmt::Display for EvaluationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationKind::Quiz => write!(f, "quiz"),
            EvaluationKind::Exam => write!(f, "exam"),
            EvaluationKind::Task => write!(f, "task"),
        }
    }
}

/// An evaluation definition for one class. Weights are only meaningful
/// relative to the other evaluations of the same class.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Evaluation {
    #[serde(rename = "eval_id")]
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: EvaluationKind,
    pub weight: f64,
    pub total_points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

impl Evaluation {
    pub fn new(
        id: &str,
        title: &str,
        kind: EvaluationKind,
        weight: f64,
        total_points: i32,
    ) -> Self {
        Evaluation {
            id: id.to_string(),
            title: title.to_string(),
            kind,
            weight,
            total_points,
            due_date: None,
        }
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Conversions for this column cannot proceed unless this succeeds.
    pub fn ensure_convertible(&self) -> AppResult<()> {
        if self.total_points <= 0 {
            return Err(AppError::InvalidEvaluation(format!(
                "evaluation '{}' has total_points {}, expected a positive value",
                self.id, self.total_points
            )));
        }
        Ok(())
    }

    /// Header subtitle, e.g. `exam • 30% • 20pts`.
    pub fn header_caption(&self) -> String {
        format!("{} • {}% • {}pts", self.kind, self.weight, self.total_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_kind_uses_lowercase_wire_names() {
        for (kind, name) in [
            (EvaluationKind::Quiz, "\"quiz\""),
            (EvaluationKind::Exam, "\"exam\""),
            (EvaluationKind::Task, "\"task\""),
        ] {
            assert_eq!(serde_json::to_string(&kind).expect("kind should serialize"), name);
        }
        assert!(serde_json::from_str::<EvaluationKind>("\"essay\"").is_err());
    }

    #[test]
    fn evaluation_deserializes_without_due_date() {
        let json = r#"{"eval_id":"e1","title":"Prueba 1","type":"exam",
            "weight":30,"total_points":20}"#;
        let evaluation: Evaluation =
            serde_json::from_str(json).expect("evaluation should deserialize");
        assert_eq!(evaluation.id, "e1");
        assert_eq!(evaluation.kind, EvaluationKind::Exam);
        assert_eq!(evaluation.weight, 30.0);
        assert!(evaluation.due_date.is_none());
    }

    #[test]
    fn non_positive_total_points_is_not_convertible() {
        let zero = Evaluation::new("e0", "Broken", EvaluationKind::Task, 10.0, 0);
        assert!(matches!(zero.ensure_convertible(), Err(AppError::InvalidEvaluation(_))));

        let ok = Evaluation::new("e1", "Quiz", EvaluationKind::Quiz, 10.0, 12);
        assert!(ok.ensure_convertible().is_ok());
    }

    #[test]
    fn header_caption_lists_kind_weight_and_points() {
        let evaluation = Evaluation::new("e1", "Control", EvaluationKind::Quiz, 25.0, 15);
        assert_eq!(evaluation.header_caption(), "quiz • 25% • 15pts");
    }
}
