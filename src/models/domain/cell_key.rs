use std::fmt;

/// Composite `(student, evaluation)` key addressing one gradebook cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub student_id: String,
    pub evaluation_id: String,
}

impl CellKey {
    pub fn new(student_id: &str, evaluation_id: &str) -> Self {
        CellKey {
            student_id: student_id.to_string(),
            evaluation_id: evaluation_id.to_string(),
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.student_id, self.evaluation_id)
    }
}
