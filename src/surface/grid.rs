use std::{collections::HashMap, sync::Arc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{CellKey, GradeEntry},
    services::{
        gradebook_store::{GradebookSnapshot, GradebookStore},
        scale_converter::GradeBand,
    },
};

use super::{
    cell::{parse_grade_input, CellState, EditBuffer},
    view::{CellView, ColumnView, EditView, GridView, RowView},
};

/// A validated grade write detached from the surface, so writes for
/// different cells can be awaited concurrently.
pub struct PendingCommit {
    store: Arc<GradebookStore>,
    key: CellKey,
    scaled_grade: f64,
    note: Option<String>,
    epoch: u64,
}

/// Result of a [`PendingCommit`], applied with [`GradebookSurface::finish_commit`].
#[derive(Debug)]
pub struct CommitOutcome {
    pub key: CellKey,
    epoch: u64,
    pub result: AppResult<GradeEntry>,
}

impl PendingCommit {
    pub fn key(&self) -> &CellKey {
        &self.key
    }

    pub fn scaled_grade(&self) -> f64 {
        self.scaled_grade
    }

    pub async fn run(self) -> CommitOutcome {
        let result = self
            .store
            .commit_grade(
                &self.key.student_id,
                &self.key.evaluation_id,
                self.scaled_grade,
                self.note,
            )
            .await;
        CommitOutcome {
            key: self.key,
            epoch: self.epoch,
            result,
        }
    }
}

/// Interactive gradebook for one class: per-cell edit state, cached row and
/// column averages and the last load error. Reads the store's snapshot and
/// only ever changes it through `load` and `commit_grade`.
pub struct GradebookSurface {
    store: Arc<GradebookStore>,
    class_id: String,
    cells: HashMap<CellKey, CellState>,
    row_averages: HashMap<String, Option<f64>>,
    column_averages: HashMap<String, Option<f64>>,
    load_error: Option<AppError>,
    mounted: bool,
    epoch: u64,
}

impl GradebookSurface {
    pub fn new(store: Arc<GradebookStore>, class_id: &str) -> Self {
        Self {
            store,
            class_id: class_id.to_string(),
            cells: HashMap::new(),
            row_averages: HashMap::new(),
            column_averages: HashMap::new(),
            load_error: None,
            mounted: false,
            epoch: 0,
        }
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn load_error(&self) -> Option<&AppError> {
        self.load_error.as_ref()
    }

    pub fn cell_state(&self, student_id: &str, evaluation_id: &str) -> CellState {
        self.cells
            .get(&CellKey::new(student_id, evaluation_id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn row_average(&self, student_id: &str) -> Option<f64> {
        self.row_averages.get(student_id).copied().flatten()
    }

    pub fn column_average(&self, evaluation_id: &str) -> Option<f64> {
        self.column_averages.get(evaluation_id).copied().flatten()
    }

    pub async fn mount(&mut self) -> AppResult<()> {
        self.mounted = true;
        self.refresh().await
    }

    /// Loads the class again; the retry affordance after a `LoadFailure`.
    pub async fn refresh(&mut self) -> AppResult<()> {
        let epoch = self.epoch;
        let result = self.store.load(&self.class_id).await;
        if !self.mounted || self.epoch != epoch {
            return Err(AppError::Discarded);
        }

        match result {
            Ok(snapshot) => {
                self.load_error = None;
                self.recompute_all(&snapshot);
                Ok(())
            }
            Err(AppError::Discarded) => Err(AppError::Discarded),
            Err(err) => {
                log::warn!("Gradebook surface for class {}: {}", self.class_id, err);
                if let Some(snapshot) = self.store.snapshot() {
                    self.recompute_all(&snapshot);
                }
                self.load_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Drops every edit buffer and discards responses still in flight for
    /// this surface. The store stays open for other surfaces sharing it.
    pub fn teardown(&mut self) {
        self.mounted = false;
        self.epoch += 1;
        self.cells.clear();
        log::debug!("Gradebook surface for class {} torn down", self.class_id);
    }

    /// Opens a graded or gradable cell for editing, seeded from its entry.
    pub fn begin_edit(&mut self, student_id: &str, evaluation_id: &str) -> AppResult<()> {
        let snapshot = self.require_snapshot()?;
        let key = Self::require_key(&snapshot, student_id, evaluation_id)?;

        match self.cells.get(&key) {
            Some(CellState::Editing(_)) => return Ok(()),
            Some(CellState::Validating(_)) => return Err(in_flight(&key)),
            _ => {}
        }

        let status = snapshot.status(&key);
        if !status.is_editable() {
            return Err(AppError::ValidationError(format!(
                "cell {} is {} and cannot be graded",
                key,
                status.label().to_lowercase()
            )));
        }

        let buffer = match snapshot.entry(&key) {
            Some(entry) => EditBuffer::new(
                format!("{:.1}", entry.scaled_grade),
                entry.note.clone().unwrap_or_default(),
            ),
            None => EditBuffer::default(),
        };
        self.cells.insert(key, CellState::Editing(buffer));
        Ok(())
    }

    pub fn set_grade_input(
        &mut self,
        student_id: &str,
        evaluation_id: &str,
        input: &str,
    ) -> AppResult<()> {
        let buffer = self.editing_buffer(student_id, evaluation_id)?;
        buffer.grade_input = input.to_string();
        buffer.error = None;
        Ok(())
    }

    pub fn set_note_input(
        &mut self,
        student_id: &str,
        evaluation_id: &str,
        input: &str,
    ) -> AppResult<()> {
        let buffer = self.editing_buffer(student_id, evaluation_id)?;
        buffer.note_input = input.to_string();
        Ok(())
    }

    /// Returns the cell to `Viewing` from any state, discarding its buffer.
    pub fn cancel(&mut self, student_id: &str, evaluation_id: &str) {
        self.cells.remove(&CellKey::new(student_id, evaluation_id));
    }

    /// Validates the buffer of an editing cell. Invalid input keeps the cell
    /// in `Editing` with the rejection attached; valid input moves it to
    /// `Validating` and hands back the write to run.
    pub fn begin_commit(
        &mut self,
        student_id: &str,
        evaluation_id: &str,
    ) -> AppResult<PendingCommit> {
        let key = CellKey::new(student_id, evaluation_id);
        let in_flight_elsewhere = self.store.is_in_flight(&key);

        let buffer = match self.cells.get_mut(&key) {
            Some(CellState::Editing(buffer)) => buffer,
            Some(CellState::Validating(_)) => return Err(in_flight(&key)),
            _ => {
                return Err(AppError::ValidationError(format!("cell {} is not being edited", key)));
            }
        };

        if in_flight_elsewhere {
            let err = in_flight(&key);
            buffer.error = Some(err.clone());
            return Err(err);
        }

        let scaled_grade = match parse_grade_input(&buffer.grade_input) {
            Ok(scaled_grade) => scaled_grade,
            Err(err) => {
                buffer.error = Some(err.clone());
                return Err(err);
            }
        };

        let mut buffer = buffer.clone();
        buffer.error = None;
        let note = buffer.note();
        self.cells.insert(key.clone(), CellState::Validating(buffer));

        Ok(PendingCommit {
            store: Arc::clone(&self.store),
            key,
            scaled_grade,
            note,
            epoch: self.epoch,
        })
    }

    /// Applies a finished write. Success returns the cell to `Viewing` and
    /// recomputes its row and column; a failed write restores `Editing` with
    /// the buffer intact. A write that succeeded but whose reload failed is
    /// saved, so the cell leaves edit mode and the grid is marked stale. The
    /// same holds when the store was closed under a mounted surface: the
    /// write may have landed, so nothing is left to retry.
    pub fn finish_commit(&mut self, outcome: CommitOutcome) -> AppResult<GradeEntry> {
        if !self.mounted || outcome.epoch != self.epoch {
            log::debug!("Dropping grade write outcome for {}: surface was torn down", outcome.key);
            return Err(AppError::Discarded);
        }

        let key = outcome.key;
        match outcome.result {
            Ok(entry) => {
                self.cells.remove(&key);
                self.load_error = None;
                if let Some(snapshot) = self.store.snapshot() {
                    self.recompute_for(&snapshot, &key);
                }
                Ok(entry)
            }
            Err(err @ (AppError::LoadFailure(_) | AppError::Discarded)) => {
                self.cells.remove(&key);
                if let Some(snapshot) = self.store.snapshot() {
                    self.recompute_for(&snapshot, &key);
                }
                self.load_error = Some(err.clone());
                Err(err)
            }
            Err(err) => {
                if let Some(CellState::Validating(buffer)) = self.cells.remove(&key) {
                    let mut buffer = buffer;
                    buffer.error = Some(err.clone());
                    self.cells.insert(key, CellState::Editing(buffer));
                }
                Err(err)
            }
        }
    }

    /// `begin_commit`, the write and `finish_commit` in one call.
    pub async fn confirm(
        &mut self,
        student_id: &str,
        evaluation_id: &str,
    ) -> AppResult<GradeEntry> {
        let pending = self.begin_commit(student_id, evaluation_id)?;
        let outcome = pending.run().await;
        self.finish_commit(outcome)
    }

    pub fn render(&self) -> GridView {
        let snapshot = self
            .store
            .snapshot()
            .filter(|snapshot| snapshot.class_id == self.class_id);
        let error = self.load_error.as_ref().map(AppError::user_message);

        let Some(snapshot) = snapshot else {
            return GridView {
                class_id: self.class_id.clone(),
                columns: Vec::new(),
                rows: Vec::new(),
                stale: false,
                error,
            };
        };

        let columns = snapshot
            .evaluations
            .iter()
            .map(|evaluation| ColumnView {
                evaluation_id: evaluation.id.clone(),
                title: evaluation.title.clone(),
                caption: evaluation.header_caption(),
                due_date: evaluation.due_date.map(|due| due.format("%Y-%m-%d").to_string()),
                average: self.column_average(&evaluation.id),
                error: evaluation.ensure_convertible().err().map(|err| err.to_string()),
            })
            .collect();

        let rows = snapshot
            .students
            .iter()
            .map(|student| RowView {
                student_id: student.id.clone(),
                student_name: student.full_name(),
                cells: snapshot
                    .evaluations
                    .iter()
                    .map(|evaluation| {
                        self.cell_view(&snapshot, CellKey::new(&student.id, &evaluation.id))
                    })
                    .collect(),
                average: self.row_average(&student.id),
            })
            .collect();

        GridView {
            class_id: self.class_id.clone(),
            columns,
            rows,
            stale: self.load_error.is_some(),
            error,
        }
    }

    fn cell_view(&self, snapshot: &GradebookSnapshot, key: CellKey) -> CellView {
        let status = snapshot.status(&key);
        let entry = snapshot.entry(&key);
        let total_points = snapshot
            .evaluation(&key.evaluation_id)
            .map(|evaluation| evaluation.total_points);
        let state = self.cells.get(&key);
        let saving = state.is_some_and(CellState::is_validating) || self.store.is_in_flight(&key);

        CellView {
            status,
            icon: status.icon(),
            grade_text: entry.map(|e| format!("{:.1}", e.scaled_grade)),
            points_text: entry.map(|e| match total_points {
                Some(total) => format!("{}/{}", e.raw_score, total),
                None => e.raw_score.to_string(),
            }),
            percent_text: entry.map(|e| format!("{:.0}%", e.percentage)),
            band: entry.map(|e| GradeBand::of(e.scaled_grade)),
            editable: status.is_editable() && !saving,
            edit: state.and_then(CellState::buffer).map(|buffer| EditView {
                grade_input: buffer.grade_input.clone(),
                note_input: buffer.note_input.clone(),
                error: buffer.error.as_ref().map(AppError::user_message),
                saving,
            }),
            evaluation_id: key.evaluation_id,
        }
    }

    fn recompute_all(&mut self, snapshot: &GradebookSnapshot) {
        self.row_averages = snapshot
            .students
            .iter()
            .map(|student| (student.id.clone(), snapshot.student_average(&student.id)))
            .collect();
        self.column_averages = snapshot
            .evaluations
            .iter()
            .map(|evaluation| (evaluation.id.clone(), snapshot.evaluation_average(&evaluation.id)))
            .collect();
        self.cells.retain(|key, _| {
            snapshot.student(&key.student_id).is_some()
                && snapshot.evaluation(&key.evaluation_id).is_some()
        });
    }

    fn recompute_for(&mut self, snapshot: &GradebookSnapshot, key: &CellKey) {
        self.row_averages.insert(
            key.student_id.clone(),
            snapshot.student_average(&key.student_id),
        );
        self.column_averages.insert(
            key.evaluation_id.clone(),
            snapshot.evaluation_average(&key.evaluation_id),
        );
    }

    fn editing_buffer(
        &mut self,
        student_id: &str,
        evaluation_id: &str,
    ) -> AppResult<&mut EditBuffer> {
        let key = CellKey::new(student_id, evaluation_id);
        match self.cells.get_mut(&key) {
            Some(CellState::Editing(buffer)) => Ok(buffer),
            Some(CellState::Validating(_)) => Err(in_flight(&key)),
            _ => Err(AppError::ValidationError(format!("cell {} is not being edited", key))),
        }
    }

    fn require_snapshot(&self) -> AppResult<Arc<GradebookSnapshot>> {
        self.store
            .snapshot()
            .filter(|snapshot| snapshot.class_id == self.class_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "gradebook for class {} is not loaded",
                    self.class_id
                ))
            })
    }

    fn require_key(
        snapshot: &GradebookSnapshot,
        student_id: &str,
        evaluation_id: &str,
    ) -> AppResult<CellKey> {
        if snapshot.student(student_id).is_none() {
            return Err(AppError::NotFound(format!("student '{}'", student_id)));
        }
        if snapshot.evaluation(evaluation_id).is_none() {
            return Err(AppError::NotFound(format!("evaluation '{}'", evaluation_id)));
        }
        Ok(CellKey::new(student_id, evaluation_id))
    }
}

fn in_flight(key: &CellKey) -> AppError {
    AppError::CommitInFlight {
        student_id: key.student_id.clone(),
        evaluation_id: key.evaluation_id.clone(),
    }
}
