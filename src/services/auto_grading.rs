use crate::{
    errors::{AppError, AppResult},
    models::domain::{Attempt, AttemptStatus, CellKey},
    services::gradebook_store::{GradebookSnapshot, GradebookStore},
};

pub const AUTO_GRADED_NOTE: &str = "Auto-graded";

/// Outcome of one auto-grading pass over a class.
#[derive(Debug, Default)]
pub struct AutoGradeSummary {
    pub processed: usize,
    pub failures: Vec<(CellKey, AppError)>,
}

/// Attempts scored by the platform that have no recorded grade yet.
pub fn pending_attempts(snapshot: &GradebookSnapshot) -> Vec<&Attempt> {
    let mut pending: Vec<&Attempt> = snapshot
        .attempts()
        .filter(|attempt| attempt.auto_graded && attempt.raw_score.is_some())
        .filter(|attempt| {
            matches!(attempt.status, AttemptStatus::Submitted | AttemptStatus::Graded)
        })
        .filter(|attempt| snapshot.entry(&attempt.key()).is_none())
        .filter(|attempt| {
            snapshot.student(&attempt.student_id).is_some()
                && snapshot.evaluation(&attempt.evaluation_id).is_some()
        })
        .collect();
    pending.sort_by(|a, b| a.key().cmp(&b.key()));
    pending
}

/// Writes a grade entry for every pending auto-graded attempt of the loaded
/// class, then reloads the store once. Per-attempt failures are collected
/// rather than aborting the pass.
pub async fn process_pending(store: &GradebookStore) -> AppResult<AutoGradeSummary> {
    let snapshot = store
        .snapshot()
        .ok_or_else(|| AppError::NotFound("gradebook has not been loaded".to_string()))?;

    let pending = pending_attempts(&snapshot);
    if pending.is_empty() {
        log::info!("No auto-graded attempts pending for class {}", snapshot.class_id);
        return Ok(AutoGradeSummary::default());
    }

    log::info!(
        "Auto-grading {} attempts for class {}",
        pending.len(),
        snapshot.class_id
    );

    let mut summary = AutoGradeSummary::default();
    for attempt in pending {
        let key = attempt.key();
        let Some(raw_score) = attempt.raw_score else {
            continue;
        };
        match store
            .record_raw_score(&snapshot, &key, raw_score, Some(AUTO_GRADED_NOTE.to_string()))
            .await
        {
            Ok(()) => summary.processed += 1,
            Err(AppError::Discarded) => return Err(AppError::Discarded),
            Err(err) => {
                log::error!("Error auto-grading attempt {}: {}", attempt.id, err);
                summary.failures.push((key, err));
            }
        }
    }

    if summary.processed > 0 {
        store.load(&snapshot.class_id).await?;
    }

    log::info!(
        "Auto-grading completed for class {}: {} processed, {} errors",
        snapshot.class_id,
        summary.processed,
        summary.failures.len()
    );
    Ok(summary)
}
