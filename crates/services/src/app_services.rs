use std::sync::Arc;

use storage::bank::QuestionBank;
use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::practice_service::PracticeService;
use crate::results_service::ResultsService;
use crate::sessions::TestLoopService;
use crate::test_config_service::TestConfigService;

/// Assembles the app-facing services over one storage backend and question bank.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    test_configs: Arc<TestConfigService>,
    results: Arc<ResultsService>,
    practice: Arc<PracticeService>,
    test_loop: Arc<TestLoopService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        bank: Arc<dyn QuestionBank>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, bank, clock))
    }

    /// Build services on in-memory storage.
    #[must_use]
    pub fn in_memory(bank: Arc<dyn QuestionBank>, clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), bank, clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, bank: Arc<dyn QuestionBank>, clock: Clock) -> Self {
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&bank),
            Arc::clone(&storage.statuses),
        ));
        let test_configs = Arc::new(TestConfigService::new(
            clock,
            Arc::clone(&bank),
            Arc::clone(&storage.configs),
            Arc::clone(&storage.attempts),
        ));
        let results = Arc::new(ResultsService::new(Arc::clone(&storage.results)));
        let practice = Arc::new(PracticeService::new(clock, Arc::clone(&storage.snapshots)));
        let test_loop = Arc::new(TestLoopService::new(
            clock,
            bank,
            Arc::clone(&storage.configs),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.results),
            Arc::clone(&storage.snapshots),
        ));

        Self {
            catalog,
            test_configs,
            results,
            practice,
            test_loop,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn test_configs(&self) -> Arc<TestConfigService> {
        Arc::clone(&self.test_configs)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultsService> {
        Arc::clone(&self.results)
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn test_loop(&self) -> Arc<TestLoopService> {
        Arc::clone(&self.test_loop)
    }
}
