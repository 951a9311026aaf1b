use async_trait::async_trait;

use crate::{
    api::ApiClient,
    errors::AppResult,
    models::{domain::Attempt, dto::response::AttemptsResponse},
};

/// Attempt-tracking service: lifecycle of each student's attempt per evaluation.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn fetch_attempts(&self, class_id: &str) -> AppResult<Vec<Attempt>>;
}

pub struct HttpAttemptRepository {
    client: ApiClient,
}

impl HttpAttemptRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AttemptRepository for HttpAttemptRepository {
    async fn fetch_attempts(&self, class_id: &str) -> AppResult<Vec<Attempt>> {
        let response: AttemptsResponse = self
            .client
            .get_json("evaluation/attempts", &[("class_id", class_id)])
            .await?;

        log::debug!(
            "Fetched {} attempts for class {}",
            response.attempts.len(),
            class_id
        );
        Ok(response.attempts)
    }
}
