use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    errors::{AppError, AppResult},
    services::scale_converter,
};

// One integer digit on the 1..7 scale, optionally one decimal after `.` or `,`.
static GRADE_INPUT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([1-7])(?:[.,](\d)0*)?\s*$").expect("grade input pattern should compile")
});

/// Text the user is typing into a cell, plus the last rejection shown for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditBuffer {
    pub grade_input: String,
    pub note_input: String,
    pub error: Option<AppError>,
}

impl EditBuffer {
    pub fn new(grade_input: impl Into<String>, note_input: impl Into<String>) -> Self {
        EditBuffer {
            grade_input: grade_input.into(),
            note_input: note_input.into(),
            error: None,
        }
    }

    /// The note to send, or `None` when the field is blank.
    pub fn note(&self) -> Option<String> {
        let note = self.note_input.trim();
        (!note.is_empty()).then(|| note.to_string())
    }
}

/// Edit workflow state of one cell. A cell with no state is `Viewing`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellState {
    #[default]
    Viewing,
    Editing(EditBuffer),
    /// The buffer passed validation and its grade write is in flight.
    Validating(EditBuffer),
}

impl CellState {
    pub fn buffer(&self) -> Option<&EditBuffer> {
        match self {
            CellState::Viewing => None,
            CellState::Editing(buffer) | CellState::Validating(buffer) => Some(buffer),
        }
    }

    pub fn is_viewing(&self) -> bool {
        matches!(self, CellState::Viewing)
    }

    pub fn is_validating(&self) -> bool {
        matches!(self, CellState::Validating(_))
    }
}

/// Parses a typed grade such as `6`, `5.5` or `4,3` into a scaled grade.
pub fn parse_grade_input(input: &str) -> AppResult<f64> {
    let captures = GRADE_INPUT_REGEX.captures(input).ok_or_else(|| {
        AppError::InvalidGrade(format!(
            "'{}' is not a grade between 1.0 and 7.0 with at most one decimal",
            input.trim()
        ))
    })?;

    let whole = &captures[1];
    let tenths = captures.get(2).map_or("0", |m| m.as_str());
    let value: f64 = format!("{}.{}", whole, tenths)
        .parse()
        .map_err(|_| AppError::InvalidGrade(format!("'{}' is not a number", input.trim())))?;

    scale_converter::validate_scaled(value)
}
