pub mod auto_grading;
pub mod evaluation_report;
pub mod grade_aggregator;
pub mod gradebook_store;
pub mod scale_converter;
pub mod status_reconciler;

pub use gradebook_store::{CellRecord, GradebookSnapshot, GradebookStore};
