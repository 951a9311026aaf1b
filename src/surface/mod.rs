pub mod cell;
pub mod grid;
pub mod view;

pub use cell::{parse_grade_input, CellState, EditBuffer};
pub use grid::{CommitOutcome, GradebookSurface, PendingCommit};
pub use view::{CellView, ColumnView, GridView, RowView};
