pub mod attempt_repository;
pub mod grade_repository;
pub mod roster_repository;

pub use attempt_repository::{AttemptRepository, HttpAttemptRepository};
pub use grade_repository::{GradeRepository, HttpGradeRepository};
pub use roster_repository::{HttpRosterRepository, RosterRepository};
