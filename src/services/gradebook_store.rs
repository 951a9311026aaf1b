use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::future::try_join3;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult, Failure},
    models::{
        domain::{Attempt, CellKey, Evaluation, GradeEntry, Student},
        dto::{
            request::{CommitGradeRequest, GradeWriteRequest},
            response::RosterResponse,
        },
    },
    repositories::{AttemptRepository, GradeRepository, RosterRepository},
    services::{
        grade_aggregator,
        scale_converter,
        status_reconciler::{reconcile, CellStatus},
    },
};

/// Immutable view of one class's gradebook as of the last successful load.
#[derive(Debug, Clone)]
pub struct GradebookSnapshot {
    pub class_id: String,
    pub students: Vec<Student>,
    pub evaluations: Vec<Evaluation>,
    entries: HashMap<CellKey, GradeEntry>,
    attempts: HashMap<CellKey, Attempt>,
    pub loaded_at: DateTime<Utc>,
    pub version: u64,
}

/// Both halves of a cell, either of which may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellRecord {
    pub entry: Option<GradeEntry>,
    pub attempt: Option<Attempt>,
}

impl CellRecord {
    pub fn status(&self) -> CellStatus {
        reconcile(self.entry.as_ref(), self.attempt.as_ref())
    }
}

impl GradebookSnapshot {
    /// Indexes entries and attempts by cell. When a cell appears more than
    /// once, the last record seen wins.
    pub fn build(
        class_id: &str,
        roster: RosterResponse,
        entries: Vec<GradeEntry>,
        attempts: Vec<Attempt>,
        version: u64,
    ) -> Self {
        for evaluation in &roster.evaluations {
            if let Err(err) = evaluation.ensure_convertible() {
                log::error!("Class {}: {}", class_id, err);
            }
        }

        let mut entry_map = HashMap::with_capacity(entries.len());
        for entry in entries {
            if let Some(previous) = entry_map.insert(entry.key(), entry) {
                log::debug!(
                    "Duplicate grade entry for {}, replaced {}",
                    previous.key(),
                    previous.id
                );
            }
        }

        let mut attempt_map = HashMap::with_capacity(attempts.len());
        for attempt in attempts {
            if let Some(previous) = attempt_map.insert(attempt.key(), attempt) {
                log::debug!(
                    "Multiple attempts for {}, keeping the last seen over {}",
                    previous.key(),
                    previous.id
                );
            }
        }

        Self {
            class_id: class_id.to_string(),
            students: roster.students,
            evaluations: roster.evaluations,
            entries: entry_map,
            attempts: attempt_map,
            loaded_at: Utc::now(),
            version,
        }
    }

    pub fn entry(&self, key: &CellKey) -> Option<&GradeEntry> {
        self.entries.get(key)
    }

    pub fn attempt(&self, key: &CellKey) -> Option<&Attempt> {
        self.attempts.get(key)
    }

    pub fn cell(&self, student_id: &str, evaluation_id: &str) -> CellRecord {
        let key = CellKey::new(student_id, evaluation_id);
        CellRecord {
            entry: self.entries.get(&key).cloned(),
            attempt: self.attempts.get(&key).cloned(),
        }
    }

    pub fn status(&self, key: &CellKey) -> CellStatus {
        reconcile(self.entries.get(key), self.attempts.get(key))
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    pub fn evaluation(&self, evaluation_id: &str) -> Option<&Evaluation> {
        self.evaluations.iter().find(|e| e.id == evaluation_id)
    }

    /// Entries of one student across the class's evaluations, in column order.
    pub fn entries_for_student<'a>(
        &'a self,
        student_id: &'a str,
    ) -> impl Iterator<Item = &'a GradeEntry> + 'a {
        self.evaluations
            .iter()
            .filter_map(move |evaluation| {
                self.entries.get(&CellKey::new(student_id, &evaluation.id))
            })
    }

    /// Entries of one evaluation across the roster, in row order.
    pub fn entries_for_evaluation<'a>(
        &'a self,
        evaluation_id: &'a str,
    ) -> impl Iterator<Item = &'a GradeEntry> + 'a {
        self.students
            .iter()
            .filter_map(move |student| self.entries.get(&CellKey::new(&student.id, evaluation_id)))
    }

    pub fn attempts_for_evaluation<'a>(
        &'a self,
        evaluation_id: &'a str,
    ) -> impl Iterator<Item = &'a Attempt> + 'a {
        self.attempts
            .values()
            .filter(move |attempt| attempt.evaluation_id == evaluation_id)
    }

    pub fn attempts(&self) -> impl Iterator<Item = &Attempt> {
        self.attempts.values()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn weights(&self) -> HashMap<String, f64> {
        grade_aggregator::weights_by_evaluation(&self.evaluations)
    }

    pub fn student_average(&self, student_id: &str) -> Option<f64> {
        grade_aggregator::student_weighted_average(
            self.entries_for_student(student_id),
            &self.weights(),
        )
    }

    pub fn evaluation_average(&self, evaluation_id: &str) -> Option<f64> {
        grade_aggregator::evaluation_average(self.entries_for_evaluation(evaluation_id))
    }
}

#[derive(Default)]
struct StoreState {
    class_id: Option<String>,
    snapshot: Option<Arc<GradebookSnapshot>>,
    last_error: Option<AppError>,
}

/// Owns the gradebook snapshot of one class and mediates every call to the
/// roster, attempt and grade collaborators.
pub struct GradebookStore {
    roster: Arc<dyn RosterRepository>,
    attempts: Arc<dyn AttemptRepository>,
    grades: Arc<dyn GradeRepository>,
    request_timeout: Duration,
    state: RwLock<StoreState>,
    in_flight: Mutex<HashSet<CellKey>>,
    epoch: AtomicU64,
    versions: AtomicU64,
}

/// Marks a cell as having a write in flight until dropped.
struct InFlightGuard<'a> {
    store: &'a GradebookStore,
    key: CellKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.store.lock_in_flight().remove(&self.key);
    }
}

impl GradebookStore {
    pub fn new(
        roster: Arc<dyn RosterRepository>,
        attempts: Arc<dyn AttemptRepository>,
        grades: Arc<dyn GradeRepository>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            roster,
            attempts,
            grades,
            request_timeout,
            state: RwLock::new(StoreState::default()),
            in_flight: Mutex::new(HashSet::new()),
            epoch: AtomicU64::new(0),
            versions: AtomicU64::new(0),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashSet<CellKey>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn with_timeout<T, F>(&self, operation: F) -> Result<T, Failure>
    where
        F: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(self.request_timeout, operation).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Failure::Failed(err.to_string())),
            Err(_) => Err(Failure::Timeout(self.request_timeout)),
        }
    }

    /// Fetches roster, grade entries and attempts concurrently and swaps in
    /// a new snapshot only once all three have arrived. On failure the
    /// previous snapshot of the same class is kept and marked stale.
    pub async fn load(&self, class_id: &str) -> AppResult<Arc<GradebookSnapshot>> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        log::info!("Loading gradebook for class {}", class_id);

        {
            let mut state = self.write_state();
            if state.class_id.as_deref() != Some(class_id) {
                state.class_id = Some(class_id.to_string());
                state.snapshot = None;
                state.last_error = None;
            }
        }

        let fetched = try_join3(
            self.with_timeout(self.roster.fetch_roster(class_id)),
            self.with_timeout(self.grades.fetch_entries(class_id)),
            self.with_timeout(self.attempts.fetch_attempts(class_id)),
        )
        .await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            log::debug!("Discarding gradebook load for class {}: store was closed", class_id);
            return Err(AppError::Discarded);
        }

        let mut state = self.write_state();
        if state.class_id.as_deref() != Some(class_id) {
            log::debug!("Discarding gradebook load for class {}: class changed", class_id);
            return Err(AppError::Discarded);
        }

        match fetched {
            Ok((roster, entries, attempts)) => {
                let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
                let snapshot = Arc::new(GradebookSnapshot::build(
                    class_id, roster, entries, attempts, version,
                ));
                log::info!(
                    "Loaded gradebook for class {}: {} students, {} evaluations, {} entries, \
                     {} attempts",
                    class_id,
                    snapshot.students.len(),
                    snapshot.evaluations.len(),
                    snapshot.entry_count(),
                    snapshot.attempt_count()
                );
                state.snapshot = Some(Arc::clone(&snapshot));
                state.last_error = None;
                Ok(snapshot)
            }
            Err(failure) => {
                log::warn!(
                    "Gradebook load for class {} failed: {}{}",
                    class_id,
                    failure,
                    if state.snapshot.is_some() {
                        " (keeping previous snapshot)"
                    } else {
                        ""
                    }
                );
                let err = AppError::LoadFailure(failure);
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Both halves of a cell from the current snapshot; never fails.
    pub fn get(&self, student_id: &str, evaluation_id: &str) -> CellRecord {
        self.snapshot()
            .map(|snapshot| snapshot.cell(student_id, evaluation_id))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Option<Arc<GradebookSnapshot>> {
        self.read_state().snapshot.clone()
    }

    pub fn class_id(&self) -> Option<String> {
        self.read_state().class_id.clone()
    }

    /// True when the displayed snapshot is older than a failed load.
    pub fn is_stale(&self) -> bool {
        let state = self.read_state();
        state.snapshot.is_some() && state.last_error.is_some()
    }

    pub fn last_error(&self) -> Option<AppError> {
        self.read_state().last_error.clone()
    }

    pub fn is_in_flight(&self, key: &CellKey) -> bool {
        self.lock_in_flight().contains(key)
    }

    /// Responses of operations started before this call are discarded on arrival.
    pub fn close(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Gradebook store closed (epoch {})", epoch);
    }

    /// Validates and converts `scaled_grade`, writes the raw score through the
    /// grade collaborator and reloads. The returned entry is the server's copy.
    pub async fn commit_grade(
        &self,
        student_id: &str,
        evaluation_id: &str,
        scaled_grade: f64,
        note: Option<String>,
    ) -> AppResult<GradeEntry> {
        let scaled_grade = scale_converter::validate_scaled(scaled_grade)?;
        let request = CommitGradeRequest::new(student_id, evaluation_id, scaled_grade, note);
        request.validate()?;

        let snapshot = self.require_snapshot()?;
        let evaluation = Self::require_cell(&snapshot, student_id, evaluation_id)?;
        let conversion = scale_converter::convert_scaled(scaled_grade, evaluation.total_points)
            .map_err(|err| {
                log::error!("Cannot grade evaluation {}: {}", evaluation_id, err);
                err
            })?;

        let key = CellKey::new(student_id, evaluation_id);
        let write = GradeWriteRequest {
            student_id: request.student_id,
            raw_score: conversion.raw_score,
            note: request.note,
            attempt_id: snapshot.attempt(&key).map(|attempt| attempt.id.clone()),
        };

        let _guard = self.claim(&key)?;
        log::info!(
            "Committing grade {:.1} ({:.1}%, {}/{} pts) for {}",
            scaled_grade,
            conversion.percentage,
            conversion.raw_score,
            evaluation.total_points,
            key
        );
        self.persist(&key, &write).await?;
        self.reload_entry(&snapshot.class_id, &key).await
    }

    /// Records a raw point score directly, e.g. from auto-grading, then reloads.
    pub async fn commit_raw_score(
        &self,
        student_id: &str,
        evaluation_id: &str,
        raw_score: i32,
        note: Option<String>,
    ) -> AppResult<GradeEntry> {
        let snapshot = self.require_snapshot()?;
        let key = CellKey::new(student_id, evaluation_id);
        let _guard = self.claim(&key)?;
        self.write_raw_score(&snapshot, &key, raw_score, note).await?;
        self.reload_entry(&snapshot.class_id, &key).await
    }

    /// Claims the cell and writes without reloading; the caller reloads.
    pub(crate) async fn record_raw_score(
        &self,
        snapshot: &GradebookSnapshot,
        key: &CellKey,
        raw_score: i32,
        note: Option<String>,
    ) -> AppResult<()> {
        let _guard = self.claim(key)?;
        self.write_raw_score(snapshot, key, raw_score, note).await
    }

    async fn write_raw_score(
        &self,
        snapshot: &GradebookSnapshot,
        key: &CellKey,
        raw_score: i32,
        note: Option<String>,
    ) -> AppResult<()> {
        let evaluation = Self::require_cell(snapshot, &key.student_id, &key.evaluation_id)?;
        evaluation.ensure_convertible().map_err(|err| {
            log::error!("Cannot grade evaluation {}: {}", evaluation.id, err);
            err
        })?;
        if raw_score < 0 || raw_score > evaluation.total_points {
            return Err(AppError::InvalidGrade(format!(
                "raw score {} is outside 0..={}",
                raw_score, evaluation.total_points
            )));
        }

        let write = GradeWriteRequest {
            student_id: key.student_id.clone(),
            raw_score,
            note,
            attempt_id: snapshot.attempt(key).map(|attempt| attempt.id.clone()),
        };
        log::info!("Recording raw score {}/{} for {}", raw_score, evaluation.total_points, key);
        self.persist(key, &write).await
    }

    async fn persist(&self, key: &CellKey, write: &GradeWriteRequest) -> AppResult<()> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let result = self
            .with_timeout(self.grades.write_grade(&key.evaluation_id, write))
            .await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            log::debug!("Discarding grade write response for {}: store was closed", key);
            return Err(AppError::Discarded);
        }

        result.map_err(|failure| {
            log::warn!("Grade write for {} failed: {}", key, failure);
            AppError::PersistFailure(failure)
        })
    }

    async fn reload_entry(&self, class_id: &str, key: &CellKey) -> AppResult<GradeEntry> {
        let snapshot = self.load(class_id).await?;
        snapshot.entry(key).cloned().ok_or_else(|| {
            AppError::PersistFailure(Failure::Failed(format!(
                "grade for {} was accepted but is missing after reload",
                key
            )))
        })
    }

    fn claim(&self, key: &CellKey) -> AppResult<InFlightGuard<'_>> {
        let mut in_flight = self.lock_in_flight();
        if !in_flight.insert(key.clone()) {
            log::debug!("Rejecting concurrent grade write for {}", key);
            return Err(AppError::CommitInFlight {
                student_id: key.student_id.clone(),
                evaluation_id: key.evaluation_id.clone(),
            });
        }
        Ok(InFlightGuard {
            store: self,
            key: key.clone(),
        })
    }

    fn require_snapshot(&self) -> AppResult<Arc<GradebookSnapshot>> {
        self.snapshot()
            .ok_or_else(|| AppError::NotFound("gradebook has not been loaded".to_string()))
    }

    fn require_cell<'s>(
        snapshot: &'s GradebookSnapshot,
        student_id: &str,
        evaluation_id: &str,
    ) -> AppResult<&'s Evaluation> {
        if snapshot.student(student_id).is_none() {
            return Err(AppError::NotFound(format!(
                "student '{}' is not on the roster of class {}",
                student_id, snapshot.class_id
            )));
        }
        snapshot.evaluation(evaluation_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "evaluation '{}' does not belong to class {}",
                evaluation_id, snapshot.class_id
            ))
        })
    }
}
