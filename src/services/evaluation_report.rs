use serde::Serialize;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{AttemptStatus, CellKey, Evaluation, Student},
    services::{
        grade_aggregator, gradebook_store::GradebookSnapshot, scale_converter::PASSING_GRADE,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub student_id: String,
    pub student_name: String,
    pub scaled_grade: f64,
    pub raw_score: i32,
    pub percentage: f64,
    pub attempt_status: Option<AttemptStatus>,
}

/// Statistics and graded rows for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub evaluation_id: String,
    pub title: String,
    pub total_points: i32,
    pub graded_count: usize,
    pub average: Option<f64>,
    /// Share of attempts that were submitted or graded; `None` without attempts.
    pub completion_rate: Option<f64>,
    /// Share of recorded grades at or above the passing grade.
    pub pass_rate: Option<f64>,
    /// Mean of the recorded percentages.
    pub average_percentage: Option<f64>,
    /// Count of grades per integer bucket 1..=7 (index 0 is bucket 1).
    pub distribution: [usize; 7],
    pub rows: Vec<ReportRow>,
}

impl EvaluationReport {
    pub fn build(snapshot: &GradebookSnapshot, evaluation_id: &str) -> AppResult<Self> {
        let evaluation = snapshot.evaluation(evaluation_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "evaluation '{}' does not belong to class {}",
                evaluation_id, snapshot.class_id
            ))
        })?;

        let mut rows = Vec::new();
        let mut distribution = [0usize; 7];
        for student in &snapshot.students {
            let key = CellKey::new(&student.id, evaluation_id);
            let Some(entry) = snapshot.entry(&key) else {
                continue;
            };
            let bucket = entry.scaled_grade.floor() as usize;
            if (1..=7).contains(&bucket) {
                distribution[bucket - 1] += 1;
            }
            rows.push(ReportRow {
                student_id: student.id.clone(),
                student_name: student.full_name(),
                scaled_grade: entry.scaled_grade,
                raw_score: entry.raw_score,
                percentage: entry.percentage,
                attempt_status: snapshot.attempt(&key).map(|attempt| attempt.status),
            });
        }

        let (attempted, completed) = snapshot
            .attempts_for_evaluation(evaluation_id)
            .fold((0usize, 0usize), |(attempted, completed), attempt| {
                let done =
                    matches!(attempt.status, AttemptStatus::Submitted | AttemptStatus::Graded);
                (attempted + 1, completed + usize::from(done))
            });
        let completion_rate = (attempted > 0).then(|| completed as f64 / attempted as f64);

        let graded = rows.len() as f64;
        let passed = rows.iter().filter(|row| row.scaled_grade >= PASSING_GRADE).count();
        let pass_rate = (!rows.is_empty()).then(|| passed as f64 / graded);
        let average_percentage = (!rows.is_empty())
            .then(|| rows.iter().map(|row| row.percentage).sum::<f64>() / graded);

        Ok(Self {
            evaluation_id: evaluation.id.clone(),
            title: evaluation.title.clone(),
            total_points: evaluation.total_points,
            graded_count: rows.len(),
            average: grade_aggregator::evaluation_average(
                snapshot.entries_for_evaluation(evaluation_id),
            ),
            completion_rate,
            pass_rate,
            average_percentage,
            distribution,
            rows,
        })
    }

    pub fn to_csv(&self) -> String {
        let mut lines = vec!["Student,Grade,Score,Percentage,Status".to_string()];
        for row in &self.rows {
            let status = match row.attempt_status {
                Some(AttemptStatus::InProgress) => "in_progress",
                Some(AttemptStatus::Submitted) => "submitted",
                Some(AttemptStatus::Graded) => "graded",
                Some(AttemptStatus::Overdue) => "overdue",
                Some(AttemptStatus::Unknown) => "unknown",
                None => "not submitted",
            };
            lines.push(format!(
                "{},{:.1},{},{:.1},{}",
                csv_quote(&row.student_name),
                row.scaled_grade,
                row.raw_score,
                row.percentage,
                status
            ));
        }
        lines.join("\n")
    }
}

/// Students with at least one grade below `min_grade`, each with the
/// evaluations they failed, in roster order.
pub fn remedial_candidates(
    snapshot: &GradebookSnapshot,
    min_grade: f64,
) -> Vec<(Student, Vec<(Evaluation, f64)>)> {
    snapshot
        .students
        .iter()
        .filter_map(|student| {
            let failed: Vec<(Evaluation, f64)> = snapshot
                .evaluations
                .iter()
                .filter_map(|evaluation| {
                    let entry = snapshot.entry(&CellKey::new(&student.id, &evaluation.id))?;
                    (entry.scaled_grade < min_grade)
                        .then(|| (evaluation.clone(), entry.scaled_grade))
                })
                .collect();
            (!failed.is_empty()).then(|| (student.clone(), failed))
        })
        .collect()
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
