#[cfg(test)]
pub mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::models::{
        domain::{Attempt, AttemptStatus, Evaluation, EvaluationKind, GradeEntry, Student},
        dto::response::RosterResponse,
    };
    use crate::services::scale_converter;

    pub fn students() -> Vec<Student> {
        vec![
            Student::new("s1", "Camila", "Rojas", "camila@example.com"),
            Student::new("s2", "Diego", "Soto", "diego@example.com"),
            Student::new("s3", "Valentina", "Muñoz", "valentina@example.com"),
        ]
    }

    pub fn evaluations() -> Vec<Evaluation> {
        vec![
            Evaluation::new("e1", "Prueba 1", EvaluationKind::Exam, 50.0, 20)
                .with_due_date(Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()),
            Evaluation::new("e2", "Control", EvaluationKind::Quiz, 30.0, 10),
            Evaluation::new("e3", "Tarea", EvaluationKind::Task, 20.0, 15),
        ]
    }

    pub fn roster() -> RosterResponse {
        RosterResponse {
            students: students(),
            evaluations: evaluations(),
        }
    }

    /// Entry consistent with the scale converter for `total_points`.
    pub fn grade_entry(
        student_id: &str,
        evaluation_id: &str,
        scaled: f64,
        total_points: i32,
    ) -> GradeEntry {
        let conversion = scale_converter::convert_scaled(scaled, total_points)
            .expect("fixture grade should convert");
        GradeEntry {
            id: format!("entry-{}-{}", student_id, evaluation_id),
            student_id: student_id.to_string(),
            evaluation_id: evaluation_id.to_string(),
            scaled_grade: scaled,
            raw_score: conversion.raw_score,
            percentage: conversion.percentage,
            recorded_at: Utc::now(),
            note: None,
        }
    }

    pub fn attempt(student_id: &str, evaluation_id: &str, status: AttemptStatus) -> Attempt {
        Attempt::new(
            &format!("attempt-{}-{}", student_id, evaluation_id),
            student_id,
            evaluation_id,
            status,
        )
    }
}

#[cfg(test)]
pub mod backend {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::{RwLock, Semaphore};

    use super::fixtures;
    use crate::{
        errors::{AppError, AppResult},
        models::{
            domain::{Attempt, CellKey, GradeEntry},
            dto::{request::GradeWriteRequest, response::RosterResponse},
        },
        repositories::{AttemptRepository, GradeRepository, RosterRepository},
        services::{gradebook_store::GradebookStore, scale_converter},
    };

    /// Collaborators backed by in-memory maps. Writes recompute the scaled
    /// grade from the raw score the way the grading endpoint does.
    pub struct InMemoryBackend {
        pub roster: RwLock<RosterResponse>,
        pub entries: RwLock<HashMap<CellKey, GradeEntry>>,
        pub attempts: RwLock<Vec<Attempt>>,
        pub writes: AtomicUsize,
        pub fail_writes: AtomicBool,
        pub fail_attempts: AtomicBool,
        pub fetch_delay: RwLock<Option<Duration>>,
        write_gate: RwLock<Option<Arc<Semaphore>>>,
    }

    impl InMemoryBackend {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                roster: RwLock::new(fixtures::roster()),
                entries: RwLock::new(HashMap::new()),
                attempts: RwLock::new(Vec::new()),
                writes: AtomicUsize::new(0),
                fail_writes: AtomicBool::new(false),
                fail_attempts: AtomicBool::new(false),
                fetch_delay: RwLock::new(None),
                write_gate: RwLock::new(None),
            })
        }

        pub fn store(self: &Arc<Self>, timeout: Duration) -> GradebookStore {
            GradebookStore::new(self.clone(), self.clone(), self.clone(), timeout)
        }

        pub async fn seed_entry(&self, entry: GradeEntry) {
            self.entries.write().await.insert(entry.key(), entry);
        }

        pub async fn seed_attempt(&self, attempt: Attempt) {
            self.attempts.write().await.push(attempt);
        }

        /// Holds every write until a permit is added to the returned semaphore.
        pub async fn gate_writes(&self) -> Arc<Semaphore> {
            let gate = Arc::new(Semaphore::new(0));
            *self.write_gate.write().await = Some(gate.clone());
            gate
        }

        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        async fn delay(&self) {
            let delay = *self.fetch_delay.read().await;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl RosterRepository for InMemoryBackend {
        async fn fetch_roster(&self, _class_id: &str) -> AppResult<RosterResponse> {
            self.delay().await;
            Ok(self.roster.read().await.clone())
        }
    }

    #[async_trait]
    impl AttemptRepository for InMemoryBackend {
        async fn fetch_attempts(&self, _class_id: &str) -> AppResult<Vec<Attempt>> {
            self.delay().await;
            if self.fail_attempts.load(Ordering::SeqCst) {
                return Err(AppError::Upstream("attempt service unavailable".to_string()));
            }
            Ok(self.attempts.read().await.clone())
        }
    }

    #[async_trait]
    impl GradeRepository for InMemoryBackend {
        async fn fetch_entries(&self, _class_id: &str) -> AppResult<Vec<GradeEntry>> {
            self.delay().await;
            Ok(self.entries.read().await.values().cloned().collect())
        }

        async fn write_grade(
            &self,
            evaluation_id: &str,
            write: &GradeWriteRequest,
        ) -> AppResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);

            let gate = self.write_gate.read().await.clone();
            if let Some(gate) = gate {
                let permit = gate
                    .acquire()
                    .await
                    .map_err(|_| AppError::Upstream("write gate closed".to_string()))?;
                permit.forget();
            }

            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Upstream("Failed to grade evaluation".to_string()));
            }

            let total_points = self
                .roster
                .read()
                .await
                .evaluations
                .iter()
                .find(|e| e.id == evaluation_id)
                .map(|e| e.total_points)
                .ok_or_else(|| AppError::NotFound(evaluation_id.to_string()))?;

            let percentage =
                scale_converter::raw_score_to_percentage(write.raw_score, total_points)?;
            let scaled_grade = scale_converter::raw_score_to_scaled(write.raw_score, total_points)?;
            let entry = GradeEntry {
                id: format!("entry-{}-{}", write.student_id, evaluation_id),
                student_id: write.student_id.clone(),
                evaluation_id: evaluation_id.to_string(),
                scaled_grade,
                raw_score: write.raw_score,
                percentage,
                recorded_at: Utc::now(),
                note: write.note.clone(),
            };
            self.entries.write().await.insert(entry.key(), entry);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixture_roster_matches_evaluations() {
        let roster = roster();
        assert_eq!(roster.students.len(), 3);
        assert_eq!(roster.evaluations.len(), 3);
        assert_eq!(roster.evaluations[0].total_points, 20);
    }

    #[test]
    fn test_fixture_entry_is_consistent_with_scale() {
        let entry = grade_entry("s1", "e1", 6.0, 20);
        assert_eq!(entry.percentage, 85.0);
        assert_eq!(entry.raw_score, 17);
    }
}
