use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::ApiClient,
    errors::{AppError, AppResult},
    models::{
        domain::GradeEntry,
        dto::{
            request::GradeWriteRequest,
            response::{GradeWriteResponse, GradebookResponse},
        },
    },
};

/// Grade persistence: recorded entries of a class and the write endpoint.
#[async_trait]
pub trait GradeRepository: Send + Sync {
    async fn fetch_entries(&self, class_id: &str) -> AppResult<Vec<GradeEntry>>;

    /// Replaces the grade of one student on `evaluation_id`. Success means
    /// the collaborator's copy is now authoritative and must be re-fetched.
    async fn write_grade(&self, evaluation_id: &str, write: &GradeWriteRequest) -> AppResult<()>;
}

pub struct HttpGradeRepository {
    client: ApiClient,
}

impl HttpGradeRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GradeRepository for HttpGradeRepository {
    async fn fetch_entries(&self, class_id: &str) -> AppResult<Vec<GradeEntry>> {
        let response: GradebookResponse = self
            .client
            .get_json("gradebook", &[("class_id", class_id)])
            .await?;

        log::debug!(
            "Fetched {} grade entries for class {}",
            response.entries.len(),
            class_id
        );
        Ok(response.entries)
    }

    async fn write_grade(&self, evaluation_id: &str, write: &GradeWriteRequest) -> AppResult<()> {
        let request_id = Uuid::new_v4().to_string();
        let response: GradeWriteResponse = self
            .client
            .post_json(&format!("evaluation/{}/grade", evaluation_id), write, &request_id)
            .await?;

        if response.success {
            let recorded = response
                .grade
                .map_or_else(|| "unreported".to_string(), |grade| format!("{:.1}", grade));
            log::info!(
                "Recorded score {} (grade {}) for student {} on evaluation {} (request {})",
                write.raw_score,
                recorded,
                write.student_id,
                evaluation_id,
                request_id
            );
            Ok(())
        } else {
            let reason = response
                .error
                .unwrap_or_else(|| "grade write was rejected".to_string());
            log::warn!(
                "Grade write for student {} on evaluation {} rejected: {} (request {})",
                write.student_id,
                evaluation_id,
                reason,
                request_id
            );
            Err(AppError::Upstream(reason))
        }
    }
}
