pub mod attempt;
pub mod cell_key;
pub mod evaluation;
pub mod grade_entry;
pub mod student;
pub use attempt::{Attempt, AttemptStatus};
pub use cell_key::CellKey;
pub use evaluation::{Evaluation, EvaluationKind};
pub use grade_entry::GradeEntry;
pub use student::Student;
