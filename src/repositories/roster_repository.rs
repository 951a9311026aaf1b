use async_trait::async_trait;

use crate::{api::ApiClient, errors::AppResult, models::dto::response::RosterResponse};

/// Source of the students and evaluation definitions of a class.
#[async_trait]
pub trait RosterRepository: Send + Sync {
    async fn fetch_roster(&self, class_id: &str) -> AppResult<RosterResponse>;
}

pub struct HttpRosterRepository {
    client: ApiClient,
}

impl HttpRosterRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RosterRepository for HttpRosterRepository {
    async fn fetch_roster(&self, class_id: &str) -> AppResult<RosterResponse> {
        let roster: RosterResponse = self
            .client
            .get_json(&format!("classes/{}/roster", class_id), &[])
            .await?;

        log::debug!(
            "Fetched roster for class {}: {} students, {} evaluations",
            class_id,
            roster.students.len(),
            roster.evaluations.len()
        );
        Ok(roster)
    }
}
