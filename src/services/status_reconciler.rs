use serde::Serialize;

use crate::models::domain::{Attempt, AttemptStatus, GradeEntry};

/// Display status of one gradebook cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    Graded,
    InProgress,
    NeedsGrading,
    Overdue,
    NotStarted,
}

impl CellStatus {
    pub const ALL: [CellStatus; 5] = [
        CellStatus::Graded,
        CellStatus::NeedsGrading,
        CellStatus::InProgress,
        CellStatus::Overdue,
        CellStatus::NotStarted,
    ];

    pub fn icon(&self) -> &'static str {
        match self {
            CellStatus::Graded => "✅",
            CellStatus::InProgress => "⏳",
            CellStatus::NeedsGrading => "📝",
            CellStatus::Overdue => "⚠️",
            CellStatus::NotStarted => "➖",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CellStatus::Graded => "Graded",
            CellStatus::InProgress => "In progress",
            CellStatus::NeedsGrading => "Needs grading",
            CellStatus::Overdue => "Overdue",
            CellStatus::NotStarted => "Not started",
        }
    }

    /// Cells a teacher may open for editing: re-grading, or grading a
    /// submitted attempt.
    pub fn is_editable(&self) -> bool {
        matches!(self, CellStatus::Graded | CellStatus::NeedsGrading)
    }
}

/// First match wins: a recorded grade always dominates the attempt.
pub fn reconcile(entry: Option<&GradeEntry>, attempt: Option<&Attempt>) -> CellStatus {
    if entry.is_some() {
        return CellStatus::Graded;
    }
    match attempt.map(|a| a.status) {
        Some(AttemptStatus::InProgress) => CellStatus::InProgress,
        Some(AttemptStatus::Submitted) => CellStatus::NeedsGrading,
        Some(AttemptStatus::Overdue) => CellStatus::Overdue,
        // a graded attempt whose entry has not arrived yet shows as not started
        Some(AttemptStatus::Graded) | Some(AttemptStatus::Unknown) | None => CellStatus::NotStarted,
    }
}
