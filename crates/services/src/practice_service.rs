use std::sync::Arc;

use serde_json::Value;
use storage::repository::{SnapshotRepository, StorageError};
use testmate_core::model::{PracticeProgress, PracticeStats, QuestionRange, RepositoryRef, UserAnswer};
use tracing::{debug, warn};

use crate::Clock;
use crate::error::PracticeError;

/// Key prefix shared by every saved practice progress.
pub const PRACTICE_KEY_PREFIX: &str = "testmate_practice_";

/// Saves and reads practice progress, one document per repository.
#[derive(Clone)]
pub struct PracticeService {
    clock: Clock,
    store: Arc<dyn SnapshotRepository>,
}

impl PracticeService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn SnapshotRepository>) -> Self {
        Self { clock, store }
    }

    /// `testmate_practice_<domain>_<topic>_<repository>`.
    #[must_use]
    pub fn storage_key(repository: &RepositoryRef) -> String {
        format!(
            "{PRACTICE_KEY_PREFIX}{}_{}_{}",
            repository.domain(),
            repository.topic(),
            repository.repository()
        )
    }

    fn decode(key: &str, value: Value) -> Result<PracticeProgress, PracticeError> {
        serde_json::from_value(value).map_err(|e| PracticeError::Corrupt {
            key: key.to_owned(),
            message: e.to_string(),
        })
    }

    /// Stores progress, stamping `lastUpdated` with the current time.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Storage` if the write fails.
    pub async fn save(&self, progress: &PracticeProgress) -> Result<(), PracticeError> {
        let mut progress = progress.clone();
        progress.last_updated = self.clock.now();
        let key = Self::storage_key(&progress.repository);
        let value = serde_json::to_value(&progress)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.put(&key, &value).await?;
        debug!(%key, answered = progress.answered_questions.len(), "practice progress saved");
        Ok(())
    }

    /// Progress stored for `repository`. Underscores in segment names can
    /// make two repositories share a key; progress recorded for the other
    /// one reads as absent.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Corrupt` if the stored document does not parse.
    pub async fn load(
        &self,
        repository: &RepositoryRef,
    ) -> Result<Option<PracticeProgress>, PracticeError> {
        let key = Self::storage_key(repository);
        let Some(value) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let progress = Self::decode(&key, value)?;
        if progress.repository != *repository {
            warn!(%key, found = %progress.repository, "practice progress belongs to another repository");
            return Ok(None);
        }
        Ok(Some(progress))
    }

    /// Loads progress or starts it for the given range.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError` on storage or decoding failures.
    pub async fn load_or_start(
        &self,
        repository: &RepositoryRef,
        range: QuestionRange,
    ) -> Result<PracticeProgress, PracticeError> {
        if let Some(progress) = self.load(repository).await? {
            return Ok(progress);
        }
        let progress = PracticeProgress::new(repository.clone(), range, self.clock.now());
        self.save(&progress).await?;
        Ok(progress)
    }

    /// Records one answer. Returns false when there is no saved progress.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError` on storage or decoding failures.
    pub async fn update_answer(
        &self,
        repository: &RepositoryRef,
        question_index: usize,
        answer: UserAnswer,
        is_correct: bool,
    ) -> Result<bool, PracticeError> {
        let Some(mut progress) = self.load(repository).await? else {
            return Ok(false);
        };
        progress.record_answer(question_index, answer, is_correct, self.clock.now());
        self.save(&progress).await?;
        Ok(true)
    }

    /// Moves the saved position. Returns false when there is no saved progress.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError` on storage or decoding failures.
    pub async fn update_current(
        &self,
        repository: &RepositoryRef,
        question_index: usize,
    ) -> Result<bool, PracticeError> {
        let Some(mut progress) = self.load(repository).await? else {
            return Ok(false);
        };
        progress.current_question_index = question_index;
        self.save(&progress).await?;
        Ok(true)
    }

    /// Returns true when something was removed.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Storage` if the delete fails.
    pub async fn clear(&self, repository: &RepositoryRef) -> Result<bool, PracticeError> {
        let removed = self.store.delete(&Self::storage_key(repository)).await?;
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns `PracticeError` on storage or decoding failures.
    pub async fn exists(&self, repository: &RepositoryRef) -> Result<bool, PracticeError> {
        Ok(self.load(repository).await?.is_some())
    }

    /// Every saved progress. Unreadable documents are skipped.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Storage` if the listing fails.
    pub async fn list_all(&self) -> Result<Vec<PracticeProgress>, PracticeError> {
        let mut sessions = Vec::new();
        for (key, value) in self.store.list_prefix(PRACTICE_KEY_PREFIX).await? {
            match Self::decode(&key, value) {
                Ok(progress) => sessions.push(progress),
                Err(err) => warn!(error = %err, "skipping practice progress"),
            }
        }
        Ok(sessions)
    }

    /// # Errors
    ///
    /// Returns `PracticeError` on storage or decoding failures.
    pub async fn stats(
        &self,
        repository: &RepositoryRef,
    ) -> Result<Option<PracticeStats>, PracticeError> {
        Ok(self.load(repository).await?.map(|p| p.stats()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storage::repository::InMemoryRepository;
    use testmate_core::time::fixed_now;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("Lang", "Rust", "Ownership").unwrap()
    }

    fn service(store: &InMemoryRepository, offset_minutes: i64) -> PracticeService {
        PracticeService::new(
            Clock::fixed(fixed_now() + Duration::minutes(offset_minutes)),
            Arc::new(store.clone()),
        )
    }

    #[test]
    fn key_matches_browser_layout() {
        assert_eq!(
            PracticeService::storage_key(&repo()),
            "testmate_practice_Lang_Rust_Ownership"
        );
    }

    #[tokio::test]
    async fn progress_of_a_colliding_repository_reads_as_absent() {
        let store = InMemoryRepository::new();
        let svc = service(&store, 0);
        let owner = RepositoryRef::new("a_b", "c", "r").unwrap();
        let other = RepositoryRef::new("a", "b_c", "r").unwrap();
        assert_eq!(PracticeService::storage_key(&owner), PracticeService::storage_key(&other));

        svc.load_or_start(&owner, QuestionRange::new(1, 3).unwrap())
            .await
            .unwrap();
        assert!(svc.exists(&owner).await.unwrap());
        assert!(!svc.exists(&other).await.unwrap());
        assert!(
            !svc.update_answer(&other, 0, UserAnswer::Text("x".into()), true)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn updates_are_noops_without_progress() {
        let store = InMemoryRepository::new();
        let svc = service(&store, 0);
        assert!(
            !svc.update_answer(&repo(), 0, UserAnswer::Text("x".into()), true)
                .await
                .unwrap()
        );
        assert!(!svc.update_current(&repo(), 3).await.unwrap());
        assert!(!svc.exists(&repo()).await.unwrap());
        assert!(svc.stats(&repo()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn answers_accumulate_into_stats() {
        let store = InMemoryRepository::new();
        let range = QuestionRange::new(1, 10).unwrap();
        service(&store, 0).load_or_start(&repo(), range).await.unwrap();

        let later = service(&store, 5);
        later
            .update_answer(&repo(), 0, UserAnswer::Choices(vec![2]), true)
            .await
            .unwrap();
        later
            .update_answer(&repo(), 4, UserAnswer::Text("borrow".into()), false)
            .await
            .unwrap();
        later
            .update_answer(&repo(), 7, UserAnswer::Text("move".into()), true)
            .await
            .unwrap();
        later.update_current(&repo(), 7).await.unwrap();

        let progress = later.load(&repo()).await.unwrap().unwrap();
        assert_eq!(progress.current_question_index, 7);
        assert_eq!(progress.last_updated, fixed_now() + Duration::minutes(5));

        let stats = later.stats(&repo()).await.unwrap().unwrap();
        assert_eq!(stats.total_answered, 3);
        assert_eq!(stats.correct_answers, 2);
        assert_eq!(stats.incorrect_answers, 1);
        assert!((stats.accuracy - 66.67).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn list_skips_corrupt_documents_and_clear_removes() {
        let store = InMemoryRepository::new();
        let svc = service(&store, 0);
        svc.load_or_start(&repo(), QuestionRange::new(1, 2).unwrap())
            .await
            .unwrap();
        store
            .put("testmate_practice_bad", &serde_json::json!({"nope": true}))
            .await
            .unwrap();

        let all = svc.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].repository, repo());

        assert!(svc.clear(&repo()).await.unwrap());
        assert!(!svc.clear(&repo()).await.unwrap());
    }
}
