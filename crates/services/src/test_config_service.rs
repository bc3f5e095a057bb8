use std::sync::Arc;

use storage::bank::QuestionBank;
use storage::repository::{TestAttemptRepository, TestConfigRepository};
use testmate_core::model::{
    AttemptId, ConfigId, ProfileName, QuestionRange, RepositoryRef, TestAttempt, TestConfiguration,
};
use tracing::info;

use crate::Clock;
use crate::error::TestConfigServiceError;

/// Saved test configurations and the attempts made against them.
#[derive(Clone)]
pub struct TestConfigService {
    clock: Clock,
    bank: Arc<dyn QuestionBank>,
    configs: Arc<dyn TestConfigRepository>,
    attempts: Arc<dyn TestAttemptRepository>,
}

impl TestConfigService {
    #[must_use]
    pub fn new(
        clock: Clock,
        bank: Arc<dyn QuestionBank>,
        configs: Arc<dyn TestConfigRepository>,
        attempts: Arc<dyn TestAttemptRepository>,
    ) -> Self {
        Self {
            clock,
            bank,
            configs,
            attempts,
        }
    }

    /// Create and persist a configuration.
    ///
    /// The range is clamped to the repository size; a missing name is
    /// derived from the repository and range.
    ///
    /// # Errors
    ///
    /// Returns `TestConfigServiceError::Range` for an empty repository,
    /// `TestConfigServiceError::Config` for a blank name,
    /// `TestConfigServiceError::Storage` on storage failures.
    pub async fn create(
        &self,
        repository: &RepositoryRef,
        test_name: Option<String>,
        start: u32,
        end: u32,
        profile: &ProfileName,
    ) -> Result<TestConfiguration, TestConfigServiceError> {
        let total = self.bank.load(repository).await?.len();
        let range = QuestionRange::clamp(start, end, total)?;
        let config = TestConfiguration::new(
            test_name,
            repository.clone(),
            range,
            profile.clone(),
            self.clock.now(),
        )?;
        let id = self.configs.insert_config(&config).await?;
        info!(config_id = %id, name = %config.test_name, %range, "test configuration created");
        Ok(config.with_id(id))
    }

    /// # Errors
    ///
    /// Returns `TestConfigServiceError::Storage` on storage failures.
    pub async fn get(
        &self,
        id: ConfigId,
    ) -> Result<Option<TestConfiguration>, TestConfigServiceError> {
        Ok(self.configs.get_config(id).await?)
    }

    /// Configurations of a repository for a profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns `TestConfigServiceError::Storage` on storage failures.
    pub async fn list(
        &self,
        repository: &RepositoryRef,
        profile: &ProfileName,
    ) -> Result<Vec<TestConfiguration>, TestConfigServiceError> {
        Ok(self.configs.list_configs(repository, profile).await?)
    }

    /// Delete a configuration together with its attempts.
    ///
    /// # Errors
    ///
    /// Returns `TestConfigServiceError::Storage` with `NotFound` for an unknown id.
    pub async fn delete(&self, id: ConfigId) -> Result<(), TestConfigServiceError> {
        self.configs.delete_config(id).await?;
        info!(config_id = %id, "test configuration deleted");
        Ok(())
    }

    /// Attempts of a configuration by attempt number.
    ///
    /// # Errors
    ///
    /// Returns `TestConfigServiceError::Storage` on storage failures.
    pub async fn attempts(&self, id: ConfigId) -> Result<Vec<TestAttempt>, TestConfigServiceError> {
        Ok(self.attempts.list_attempts(id).await?)
    }

    /// # Errors
    ///
    /// Returns `TestConfigServiceError::Storage` on storage failures.
    pub async fn attempt(
        &self,
        id: AttemptId,
    ) -> Result<Option<TestAttempt>, TestConfigServiceError> {
        Ok(self.attempts.get_attempt(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::bank::InMemoryQuestionBank;
    use storage::repository::{InMemoryRepository, StorageError};
    use testmate_core::model::{Question, RangeError, TestConfigError};
    use testmate_core::time::fixed_now;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("History", "Rome", "Emperors").unwrap()
    }

    fn service(questions: usize) -> TestConfigService {
        let bank = InMemoryQuestionBank::new().with_repository(
            repo(),
            (0..questions)
                .map(|i| Question::text(format!("Q{i}"), "A"))
                .collect(),
        );
        let store = InMemoryRepository::new();
        TestConfigService::new(
            Clock::fixed(fixed_now()),
            Arc::new(bank),
            Arc::new(store.clone()),
            Arc::new(store),
        )
    }

    #[tokio::test]
    async fn create_clamps_range_and_names_config() {
        let svc = service(12);
        let config = svc
            .create(&repo(), None, 0, 50, &ProfileName::default())
            .await
            .unwrap();
        assert!(config.config_id.is_some());
        assert_eq!(config.question_range, QuestionRange::new(1, 12).unwrap());
        assert_eq!(
            config.test_name,
            TestConfiguration::default_name(&repo(), Some(config.question_range))
        );

        let listed = svc.list(&repo(), &ProfileName::default()).await.unwrap();
        assert_eq!(listed, vec![config]);
    }

    #[tokio::test]
    async fn create_rejects_blank_name_and_empty_repository() {
        let svc = service(3);
        assert!(matches!(
            svc.create(&repo(), Some("  ".into()), 1, 2, &ProfileName::default())
                .await,
            Err(TestConfigServiceError::Config(TestConfigError::EmptyName))
        ));

        let empty = service(0);
        assert!(matches!(
            empty.create(&repo(), None, 1, 2, &ProfileName::default()).await,
            Err(TestConfigServiceError::Range(RangeError::EmptyRepository))
        ));
    }

    #[tokio::test]
    async fn delete_unknown_config_is_not_found() {
        let svc = service(3);
        assert!(matches!(
            svc.delete(ConfigId::new(42)).await,
            Err(TestConfigServiceError::Storage(StorageError::NotFound))
        ));
        assert!(svc.attempts(ConfigId::new(42)).await.unwrap().is_empty());
    }
}
