use std::collections::HashMap;

use crate::models::domain::{Evaluation, GradeEntry};

/// Evaluation id → weight, for the evaluations of one class.
pub fn weights_by_evaluation(evaluations: &[Evaluation]) -> HashMap<String, f64> {
    evaluations
        .iter()
        .map(|evaluation| (evaluation.id.clone(), evaluation.weight))
        .collect()
}

/// Weighted mean of one student's scaled grades.
///
/// Only evaluations that have an entry contribute, to both the numerator and
/// the denominator. Entries whose evaluation has no positive weight are
/// ignored. Returns `None` when nothing contributes.
pub fn student_weighted_average<'a, I>(entries: I, weights: &HashMap<String, f64>) -> Option<f64>
where
    I: IntoIterator<Item = &'a GradeEntry>,
{
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for entry in entries {
        let Some(&weight) = weights.get(&entry.evaluation_id) else {
            continue;
        };
        if !weight.is_finite() || weight <= 0.0 {
            continue;
        }
        weighted_sum += entry.scaled_grade * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        Some(weighted_sum / total_weight)
    } else {
        None
    }
}

/// Unweighted mean of the scaled grades recorded for one evaluation.
pub fn evaluation_average<'a, I>(entries: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a GradeEntry>,
{
    let (sum, count) = entries
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), entry| (sum + entry.scaled_grade, count + 1));

    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}
