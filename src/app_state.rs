use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    api::ApiClient,
    config::Config,
    errors::AppResult,
    repositories::{
        AttemptRepository, GradeRepository, HttpAttemptRepository, HttpGradeRepository,
        HttpRosterRepository, RosterRepository,
    },
    services::gradebook_store::GradebookStore,
    surface::GradebookSurface,
};

/// Shared collaborators plus one store per class id. Surfaces of the same
/// class share a store; surfaces of different classes never touch each
/// other's snapshot.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    roster_repository: Arc<dyn RosterRepository>,
    attempt_repository: Arc<dyn AttemptRepository>,
    grade_repository: Arc<dyn GradeRepository>,
    stores: Arc<Mutex<HashMap<String, Arc<GradebookStore>>>>,
}

impl AppState {
    pub fn new(config: Config) -> AppResult<Self> {
        let client = ApiClient::new(&config)?;

        Ok(Self::with_repositories(
            config,
            Arc::new(HttpRosterRepository::new(client.clone())),
            Arc::new(HttpAttemptRepository::new(client.clone())),
            Arc::new(HttpGradeRepository::new(client)),
        ))
    }

    pub fn with_repositories(
        config: Config,
        roster_repository: Arc<dyn RosterRepository>,
        attempt_repository: Arc<dyn AttemptRepository>,
        grade_repository: Arc<dyn GradeRepository>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            roster_repository,
            attempt_repository,
            grade_repository,
            stores: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock_stores(&self) -> MutexGuard<'_, HashMap<String, Arc<GradebookStore>>> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The store for `class_id`, created on first use.
    pub fn store_for(&self, class_id: &str) -> Arc<GradebookStore> {
        let mut stores = self.lock_stores();
        let store = stores.entry(class_id.to_string()).or_insert_with(|| {
            log::debug!("Creating gradebook store for class {}", class_id);
            Arc::new(GradebookStore::new(
                Arc::clone(&self.roster_repository),
                Arc::clone(&self.attempt_repository),
                Arc::clone(&self.grade_repository),
                self.config.request_timeout(),
            ))
        });
        Arc::clone(store)
    }

    pub fn surface(&self, class_id: &str) -> GradebookSurface {
        GradebookSurface::new(self.store_for(class_id), class_id)
    }

    /// Closes every store; responses still in flight are discarded.
    pub fn shutdown(&self) {
        let stores: Vec<Arc<GradebookStore>> = self.lock_stores().drain().map(|(_, s)| s).collect();
        for store in stores {
            store.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        errors::AppError,
        test_utils::{backend::InMemoryBackend, fixtures::grade_entry},
    };

    fn state_on(backend: &Arc<InMemoryBackend>) -> AppState {
        AppState::with_repositories(
            Config::test_config(),
            backend.clone(),
            backend.clone(),
            backend.clone(),
        )
    }

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_app_state_builds_from_test_config() {
        let state = AppState::new(Config::test_config()).expect("state should build");
        assert!(state.store_for("class-test").snapshot().is_none());
        assert_eq!(state.surface("class-test").class_id(), "class-test");
    }

    #[test]
    fn test_stores_are_shared_per_class() {
        let state = AppState::new(Config::test_config()).expect("state should build");
        let first = state.store_for("class-1");
        assert!(Arc::ptr_eq(&first, &state.clone().store_for("class-1")));
        assert!(!Arc::ptr_eq(&first, &state.store_for("class-2")));
    }

    #[tokio::test]
    async fn test_second_class_does_not_clear_the_first() {
        let backend = InMemoryBackend::new();
        backend.seed_entry(grade_entry("s1", "e1", 6.0, 20)).await;
        let state = state_on(&backend);

        let mut first = state.surface("class-1");
        first.mount().await.expect("class-1 should load");
        let mut second = state.surface("class-2");
        second.mount().await.expect("class-2 should load");
        second.teardown();

        let view = first.render();
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.rows[0].cells[0].grade_text.as_deref(), Some("6.0"));
        assert!(state.store_for("class-1").snapshot().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_discards_in_flight_loads() {
        let backend = InMemoryBackend::new();
        *backend.fetch_delay.write().await = Some(Duration::from_millis(50));
        let state = state_on(&backend);
        let store = state.store_for("class-1");

        let (result, ()) = tokio::join!(store.load("class-1"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            state.shutdown();
        });
        assert!(matches!(result, Err(AppError::Discarded)));
        assert!(!Arc::ptr_eq(&store, &state.store_for("class-1")));
    }
}
