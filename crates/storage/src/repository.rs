use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use testmate_core::model::{
    AttemptId, ConfigId, ProfileName, RepositoryRef, TestAttempt, TestConfiguration, TestId,
    TestInstance,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Status label a profile attached to a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryStatusRecord {
    pub repository: RepositoryRef,
    pub status: String,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for saved test configurations.
#[async_trait]
pub trait TestConfigRepository: Send + Sync {
    /// Persist a new configuration and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the configuration cannot be stored.
    async fn insert_config(&self, config: &TestConfiguration) -> Result<ConfigId, StorageError>;

    /// Fetch a configuration by id. `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_config(&self, id: ConfigId) -> Result<Option<TestConfiguration>, StorageError>;

    /// Configurations of one repository owned by `profile`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_configs(
        &self,
        repository: &RepositoryRef,
        profile: &ProfileName,
    ) -> Result<Vec<TestConfiguration>, StorageError>;

    /// Delete a configuration together with its attempts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the configuration does not exist.
    async fn delete_config(&self, id: ConfigId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait TestAttemptRepository: Send + Sync {
    /// Append an attempt to its configuration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the configuration does not exist.
    async fn insert_attempt(&self, attempt: &TestAttempt) -> Result<AttemptId, StorageError>;

    /// Attempts of a configuration ordered by attempt number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempts(&self, config_id: ConfigId) -> Result<Vec<TestAttempt>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_attempt(&self, id: AttemptId) -> Result<Option<TestAttempt>, StorageError>;
}

#[async_trait]
pub trait TestResultRepository: Send + Sync {
    /// Store a completed test.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the test id is already taken.
    async fn save_result(&self, result: &TestInstance) -> Result<(), StorageError>;

    /// Completed tests of a profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_results(&self, profile: &ProfileName) -> Result<Vec<TestInstance>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_result(&self, id: &TestId) -> Result<Option<TestInstance>, StorageError>;
}

#[async_trait]
pub trait RepositoryStatusRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_status(
        &self,
        profile: &ProfileName,
        repository: &RepositoryRef,
    ) -> Result<Option<String>, StorageError>;

    /// Insert or replace the status of a repository.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn set_status(
        &self,
        profile: &ProfileName,
        repository: &RepositoryRef,
        status: &str,
    ) -> Result<(), StorageError>;

    /// All statuses of a profile, ordered by repository key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_statuses(
        &self,
        profile: &ProfileName,
    ) -> Result<Vec<RepositoryStatusRecord>, StorageError>;
}

/// String key to JSON document store, used for practice progress and
/// attempt snapshots.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn put(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Remove a key. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Entries whose key starts with `prefix`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    next_id: Arc<AtomicU64>,
    configs: Arc<Mutex<BTreeMap<ConfigId, TestConfiguration>>>,
    attempts: Arc<Mutex<BTreeMap<AttemptId, TestAttempt>>>,
    results: Arc<Mutex<HashMap<TestId, TestInstance>>>,
    statuses: Arc<Mutex<BTreeMap<(String, String), RepositoryStatusRecord>>>,
    documents: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl TestConfigRepository for InMemoryRepository {
    async fn insert_config(&self, config: &TestConfiguration) -> Result<ConfigId, StorageError> {
        let id = ConfigId::new(self.allocate_id());
        let mut guard = lock(&self.configs)?;
        guard.insert(id, config.clone().with_id(id));
        Ok(id)
    }

    async fn get_config(&self, id: ConfigId) -> Result<Option<TestConfiguration>, StorageError> {
        let guard = lock(&self.configs)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_configs(
        &self,
        repository: &RepositoryRef,
        profile: &ProfileName,
    ) -> Result<Vec<TestConfiguration>, StorageError> {
        let guard = lock(&self.configs)?;
        let mut found: Vec<TestConfiguration> = guard
            .values()
            .filter(|c| &c.repository == repository && &c.profile_name == profile)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.created_on
                .cmp(&a.created_on)
                .then_with(|| b.config_id.cmp(&a.config_id))
        });
        Ok(found)
    }

    async fn delete_config(&self, id: ConfigId) -> Result<(), StorageError> {
        let mut configs = lock(&self.configs)?;
        if configs.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        drop(configs);
        let mut attempts = lock(&self.attempts)?;
        attempts.retain(|_, a| a.test_config_id != id);
        Ok(())
    }
}

#[async_trait]
impl TestAttemptRepository for InMemoryRepository {
    async fn insert_attempt(&self, attempt: &TestAttempt) -> Result<AttemptId, StorageError> {
        if !lock(&self.configs)?.contains_key(&attempt.test_config_id) {
            return Err(StorageError::NotFound);
        }
        let id = AttemptId::new(self.allocate_id());
        let mut guard = lock(&self.attempts)?;
        guard.insert(id, attempt.clone().with_id(id));
        Ok(id)
    }

    async fn list_attempts(&self, config_id: ConfigId) -> Result<Vec<TestAttempt>, StorageError> {
        let guard = lock(&self.attempts)?;
        let mut found: Vec<TestAttempt> = guard
            .values()
            .filter(|a| a.test_config_id == config_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.attempt_number, a.attempt_id));
        Ok(found)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<TestAttempt>, StorageError> {
        let guard = lock(&self.attempts)?;
        Ok(guard.get(&id).cloned())
    }
}

#[async_trait]
impl TestResultRepository for InMemoryRepository {
    async fn save_result(&self, result: &TestInstance) -> Result<(), StorageError> {
        let mut guard = lock(&self.results)?;
        if guard.contains_key(&result.test_id) {
            return Err(StorageError::Conflict);
        }
        guard.insert(result.test_id.clone(), result.clone());
        Ok(())
    }

    async fn list_results(&self, profile: &ProfileName) -> Result<Vec<TestInstance>, StorageError> {
        let guard = lock(&self.results)?;
        let mut found: Vec<TestInstance> = guard
            .values()
            .filter(|r| &r.profile_name == profile)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.created_on
                .cmp(&a.created_on)
                .then_with(|| b.test_id.cmp(&a.test_id))
        });
        Ok(found)
    }

    async fn get_result(&self, id: &TestId) -> Result<Option<TestInstance>, StorageError> {
        let guard = lock(&self.results)?;
        Ok(guard.get(id).cloned())
    }
}

#[async_trait]
impl RepositoryStatusRepository for InMemoryRepository {
    async fn get_status(
        &self,
        profile: &ProfileName,
        repository: &RepositoryRef,
    ) -> Result<Option<String>, StorageError> {
        let guard = lock(&self.statuses)?;
        Ok(guard
            .get(&(profile.as_str().to_owned(), repository.key()))
            .map(|r| r.status.clone()))
    }

    async fn set_status(
        &self,
        profile: &ProfileName,
        repository: &RepositoryRef,
        status: &str,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.statuses)?;
        guard.insert(
            (profile.as_str().to_owned(), repository.key()),
            RepositoryStatusRecord {
                repository: repository.clone(),
                status: status.to_owned(),
            },
        );
        Ok(())
    }

    async fn list_statuses(
        &self,
        profile: &ProfileName,
    ) -> Result<Vec<RepositoryStatusRecord>, StorageError> {
        let guard = lock(&self.statuses)?;
        Ok(guard
            .iter()
            .filter(|((owner, _), _)| owner == profile.as_str())
            .map(|(_, record)| record.clone())
            .collect())
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn put(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let mut guard = lock(&self.documents)?;
        guard.insert(key.to_owned(), value.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let guard = lock(&self.documents)?;
        Ok(guard.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut guard = lock(&self.documents)?;
        Ok(guard.remove(key).is_some())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, StorageError> {
        let guard = lock(&self.documents)?;
        Ok(guard
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub configs: Arc<dyn TestConfigRepository>,
    pub attempts: Arc<dyn TestAttemptRepository>,
    pub results: Arc<dyn TestResultRepository>,
    pub statuses: Arc<dyn RepositoryStatusRepository>,
    pub snapshots: Arc<dyn SnapshotRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            configs: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            statuses: Arc::new(repo.clone()),
            snapshots: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testmate_core::model::{AttemptType, QuestionRange};
    use testmate_core::time::fixed_now;

    fn repo_ref() -> RepositoryRef {
        RepositoryRef::new("Math", "Algebra", "Basics").unwrap()
    }

    fn config() -> TestConfiguration {
        TestConfiguration::new(
            None,
            repo_ref(),
            QuestionRange::new(1, 5).unwrap(),
            ProfileName::default(),
            fixed_now(),
        )
        .unwrap()
    }

    fn attempt(config_id: ConfigId, number: u32) -> TestAttempt {
        TestAttempt {
            attempt_id: None,
            test_config_id: config_id,
            attempt_number: number,
            attempt_type: AttemptType::Full,
            created_on: fixed_now(),
            questions_attempted: Vec::new(),
            score: 0,
            total_questions: 5,
            time_taken: None,
        }
    }

    #[tokio::test]
    async fn deleting_config_cascades_attempts() {
        let repo = InMemoryRepository::new();
        let id = repo.insert_config(&config()).await.unwrap();
        assert_eq!(
            repo.get_config(id).await.unwrap().unwrap().config_id,
            Some(id)
        );

        let attempt_id = repo.insert_attempt(&attempt(id, 1)).await.unwrap();
        repo.insert_attempt(&attempt(id, 2)).await.unwrap();
        assert_eq!(repo.list_attempts(id).await.unwrap().len(), 2);

        repo.delete_config(id).await.unwrap();
        assert!(repo.list_attempts(id).await.unwrap().is_empty());
        assert!(repo.get_attempt(attempt_id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete_config(id).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn attempt_requires_existing_config() {
        let repo = InMemoryRepository::new();
        let err = repo
            .insert_attempt(&attempt(ConfigId::new(99), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn statuses_are_scoped_by_profile() {
        let repo = InMemoryRepository::new();
        let alice = ProfileName::new("alice").unwrap();
        repo.set_status(&alice, &repo_ref(), "done").await.unwrap();
        repo.set_status(&alice, &repo_ref(), "review").await.unwrap();

        assert_eq!(
            repo.get_status(&alice, &repo_ref()).await.unwrap().as_deref(),
            Some("review")
        );
        assert!(
            repo.get_status(&ProfileName::default(), &repo_ref())
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(repo.list_statuses(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn prefix_listing_is_ordered_and_bounded() {
        let repo = InMemoryRepository::new();
        repo.put("p_b", &Value::from(2)).await.unwrap();
        repo.put("p_a", &Value::from(1)).await.unwrap();
        repo.put("q_a", &Value::from(3)).await.unwrap();

        let listed = repo.list_prefix("p_").await.unwrap();
        let keys: Vec<&str> = listed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["p_a", "p_b"]);

        assert!(repo.delete("p_a").await.unwrap());
        assert!(!repo.delete("p_a").await.unwrap());
    }
}
