//! Conversions between the three grade representations used by the
//! gradebook: the 1.0–7.0 scaled grade, a 0–100 percentage and the raw
//! point score of an evaluation.
//!
//! The scaled ↔ percentage mapping is piecewise linear over [`ANCHOR_TABLE`].
//! The table is not proportional: 4.0 sits at 55%, the passing threshold.

use crate::errors::{AppError, AppResult};

pub const MIN_SCALED_GRADE: f64 = 1.0;
pub const MAX_SCALED_GRADE: f64 = 7.0;
pub const PASSING_GRADE: f64 = 4.0;
pub const HIGH_GRADE: f64 = 6.0;

/// `(scaled grade, percentage)` calibration points, ascending on both axes.
pub const ANCHOR_TABLE: [(f64, f64); 7] = [
    (1.0, 0.0),
    (2.0, 20.0),
    (3.0, 40.0),
    (4.0, 55.0),
    (5.0, 70.0),
    (6.0, 85.0),
    (7.0, 100.0),
];

/// All three representations of one grade for a given evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub scaled_grade: f64,
    pub percentage: f64,
    pub raw_score: i32,
}

/// Display colouring of a scaled grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeBand {
    High,
    Passing,
    Failing,
}

impl GradeBand {
    pub fn of(scaled_grade: f64) -> Self {
        if scaled_grade >= HIGH_GRADE {
            GradeBand::High
        } else if scaled_grade >= PASSING_GRADE {
            GradeBand::Passing
        } else {
            GradeBand::Failing
        }
    }
}

pub fn validate_scaled(scaled: f64) -> AppResult<f64> {
    if !scaled.is_finite() || !(MIN_SCALED_GRADE..=MAX_SCALED_GRADE).contains(&scaled) {
        return Err(AppError::InvalidGrade(format!(
            "{} is outside {:.1}..={:.1}",
            scaled, MIN_SCALED_GRADE, MAX_SCALED_GRADE
        )));
    }
    Ok(scaled)
}

fn validate_total_points(total_points: i32) -> AppResult<f64> {
    if total_points <= 0 {
        return Err(AppError::InvalidEvaluation(format!(
            "total_points must be positive, got {}",
            total_points
        )));
    }
    Ok(f64::from(total_points))
}

pub fn scaled_to_percentage(scaled: f64) -> AppResult<f64> {
    let scaled = validate_scaled(scaled)?;
    if scaled == MAX_SCALED_GRADE {
        return Ok(100.0);
    }

    let segment = ANCHOR_TABLE
        .windows(2)
        .find(|pair| scaled >= pair[0].0 && scaled < pair[1].0);

    match segment {
        Some(pair) => {
            let (lower_grade, lower_pct) = pair[0];
            let (upper_grade, upper_pct) = pair[1];
            let ratio = (scaled - lower_grade) / (upper_grade - lower_grade);
            Ok(lower_pct + ratio * (upper_pct - lower_pct))
        }
        None => Ok(100.0),
    }
}

/// Inverse of [`scaled_to_percentage`]. A percentage sitting exactly on an
/// anchor resolves through the lower segment.
pub fn percentage_to_scaled(percentage: f64) -> AppResult<f64> {
    if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
        return Err(AppError::InvalidGrade(format!(
            "percentage {} is outside 0..=100",
            percentage
        )));
    }

    let segment = ANCHOR_TABLE
        .windows(2)
        .find(|pair| percentage >= pair[0].1 && percentage <= pair[1].1);

    match segment {
        Some(pair) => {
            let (lower_grade, lower_pct) = pair[0];
            let (upper_grade, upper_pct) = pair[1];
            let ratio = (percentage - lower_pct) / (upper_pct - lower_pct);
            Ok(lower_grade + ratio * (upper_grade - lower_grade))
        }
        None => Ok(MAX_SCALED_GRADE),
    }
}

/// `round(percentage / 100 * total_points)`, halves rounded away from zero,
/// clamped to `[0, total_points]`.
pub fn percentage_to_raw_score(percentage: f64, total_points: i32) -> AppResult<i32> {
    let total = validate_total_points(total_points)?;
    if !percentage.is_finite() {
        return Err(AppError::InvalidGrade(format!("percentage {} is not a number", percentage)));
    }
    let raw = (percentage / 100.0 * total).round();
    Ok(raw.clamp(0.0, total) as i32)
}

pub fn raw_score_to_percentage(raw: i32, total_points: i32) -> AppResult<f64> {
    let total = validate_total_points(total_points)?;
    Ok(f64::from(raw) / total * 100.0)
}

/// Scaled grade for a raw score, rounded to the 0.1 input step.
pub fn raw_score_to_scaled(raw: i32, total_points: i32) -> AppResult<f64> {
    if raw < 0 || raw > total_points {
        return Err(AppError::InvalidGrade(format!(
            "raw score {} is outside 0..={}",
            raw, total_points
        )));
    }
    let percentage = raw_score_to_percentage(raw, total_points)?;
    percentage_to_scaled(percentage).map(round_to_step)
}

/// Rounds to one decimal, the granularity grades are entered with.
pub fn round_to_step(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Computes percentage and raw score for a scaled grade on an evaluation
/// worth `total_points`.
pub fn convert_scaled(scaled: f64, total_points: i32) -> AppResult<Conversion> {
    validate_total_points(total_points)?;
    let percentage = scaled_to_percentage(scaled)?;
    let raw_score = percentage_to_raw_score(percentage, total_points)?;
    Ok(Conversion {
        scaled_grade: scaled,
        percentage,
        raw_score,
    })
}
