use std::fmt;

use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table};

use crate::services::{scale_converter::GradeBand, status_reconciler::CellStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnView {
    pub evaluation_id: String,
    pub title: String,
    pub caption: String,
    /// Due date as `YYYY-MM-DD`, when the evaluation has one.
    pub due_date: Option<String>,
    pub average: Option<f64>,
    /// Blocking data error for the whole column, e.g. no total points.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditView {
    pub grade_input: String,
    pub note_input: String,
    pub error: Option<String>,
    pub saving: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellView {
    pub evaluation_id: String,
    pub status: CellStatus,
    pub icon: &'static str,
    pub grade_text: Option<String>,
    pub points_text: Option<String>,
    pub percent_text: Option<String>,
    #[serde(skip)]
    pub band: Option<GradeBand>,
    pub editable: bool,
    pub edit: Option<EditView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub student_id: String,
    pub student_name: String,
    pub cells: Vec<CellView>,
    pub average: Option<f64>,
}

/// Everything needed to draw the gradebook for one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridView {
    pub class_id: String,
    pub columns: Vec<ColumnView>,
    pub rows: Vec<RowView>,
    /// The rows come from an older snapshot than the last load attempt.
    pub stale: bool,
    pub error: Option<String>,
}

pub fn average_text(average: Option<f64>) -> String {
    average.map_or_else(|| "-".to_string(), |a| format!("{:.1}", a))
}

impl CellView {
    fn summary(&self) -> String {
        match (&self.edit, &self.grade_text) {
            (Some(edit), _) if edit.saving => format!("[{}] saving...", edit.grade_input),
            (Some(edit), _) => match &edit.error {
                Some(error) => format!("[{}] {}", edit.grade_input, error),
                None => format!("[{}]", edit.grade_input),
            },
            (None, Some(grade)) => format!(
                "{} {} ({}, {})",
                self.icon,
                grade,
                self.points_text.as_deref().unwrap_or("-"),
                self.percent_text.as_deref().unwrap_or("-")
            ),
            (None, None) => self.icon.to_string(),
        }
    }
}

impl GridView {
    /// Student × evaluation matrix with a trailing average column and row.
    pub fn table(&self) -> Table {
        let mut builder = Builder::default();

        let mut header = vec!["Student".to_string()];
        header.extend(self.columns.iter().map(ColumnView::header));
        header.push("Average".to_string());
        builder.push_record(header);

        for row in &self.rows {
            let mut record = vec![row.student_name.clone()];
            record.extend(row.cells.iter().map(CellView::summary));
            record.push(average_text(row.average));
            builder.push_record(record);
        }

        let mut footer = vec!["Average".to_string()];
        footer.extend(self.columns.iter().map(|c| average_text(c.average)));
        footer.push(String::new());
        builder.push_record(footer);

        let mut table = builder.build();
        table.with(Style::modern());
        table
    }
}

impl ColumnView {
    fn header(&self) -> String {
        let mut header = format!("{}\n{}", self.title, self.caption);
        if let Some(due_date) = &self.due_date {
            header.push_str(&format!("\ndue {}", due_date));
        }
        if let Some(error) = &self.error {
            header.push_str(&format!("\n! {}", error));
        }
        header
    }
}

impl fmt::Display for GridView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gradebook for class {}", self.class_id)?;
        if let Some(error) = &self.error {
            if self.stale {
                writeln!(f, "! Showing stale data: {}", error)?;
            } else {
                writeln!(f, "! {}", error)?;
            }
        }

        writeln!(f, "{}", self.table())?;

        let legend: Vec<String> = CellStatus::ALL
            .iter()
            .map(|status| format!("{} {}", status.icon(), status.label()))
            .collect();
        write!(f, "{}", legend.join("  "))
    }
}
