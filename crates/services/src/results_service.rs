use std::sync::Arc;

use storage::repository::{StorageError, TestResultRepository};
use testmate_core::model::{ProfileName, TestId, TestInstance};

/// Read access to saved ad-hoc test results.
#[derive(Clone)]
pub struct ResultsService {
    results: Arc<dyn TestResultRepository>,
}

impl ResultsService {
    #[must_use]
    pub fn new(results: Arc<dyn TestResultRepository>) -> Self {
        Self { results }
    }

    /// Results of a profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    pub async fn list(&self, profile: &ProfileName) -> Result<Vec<TestInstance>, StorageError> {
        self.results.list_results(profile).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    pub async fn get(&self, id: &TestId) -> Result<Option<TestInstance>, StorageError> {
        self.results.get_result(id).await
    }
}
