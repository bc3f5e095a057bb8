use std::collections::BTreeSet;
use std::sync::Arc;

use storage::bank::QuestionBank;
use storage::repository::{RepositoryStatusRecord, RepositoryStatusRepository};
use testmate_core::model::{DomainStructure, ProfileName, Question, RepositoryRef};
use tracing::info;

use crate::error::CatalogServiceError;

/// A search match and its position in the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// 0-based index in the repository.
    pub index: usize,
    pub question: Question,
}

/// Browsing and editing of the question bank, plus repository statuses.
#[derive(Clone)]
pub struct CatalogService {
    bank: Arc<dyn QuestionBank>,
    statuses: Arc<dyn RepositoryStatusRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        bank: Arc<dyn QuestionBank>,
        statuses: Arc<dyn RepositoryStatusRepository>,
    ) -> Self {
        Self { bank, statuses }
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the bank cannot be read.
    pub async fn structure(&self) -> Result<DomainStructure, CatalogServiceError> {
        Ok(self.bank.structure().await?)
    }

    /// Topic names of a domain, sorted.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the bank cannot be read.
    pub async fn topics(&self, domain: &str) -> Result<Vec<String>, CatalogServiceError> {
        let structure = self.bank.structure().await?;
        Ok(structure.topics(domain).into_iter().map(str::to_owned).collect())
    }

    /// Repository names of a topic, sorted.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the bank cannot be read.
    pub async fn repositories(
        &self,
        domain: &str,
        topic: &str,
    ) -> Result<Vec<String>, CatalogServiceError> {
        let structure = self.bank.structure().await?;
        Ok(structure
            .repositories(domain, topic)
            .into_iter()
            .map(str::to_owned)
            .collect())
    }

    /// Other repositories of the same topic.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the bank cannot be read.
    pub async fn sibling_repositories(
        &self,
        repository: &RepositoryRef,
    ) -> Result<Vec<String>, CatalogServiceError> {
        let mut names = self
            .repositories(repository.domain(), repository.topic())
            .await?;
        names.retain(|name| name != repository.repository());
        Ok(names)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the repository is missing or malformed.
    pub async fn questions(
        &self,
        repository: &RepositoryRef,
    ) -> Result<Vec<Question>, CatalogServiceError> {
        Ok(self.bank.load(repository).await?)
    }

    /// Case-insensitive search over question text, options, explanation and
    /// answer text. A blank query matches everything.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the repository cannot be loaded.
    pub async fn search(
        &self,
        repository: &RepositoryRef,
        query: &str,
    ) -> Result<Vec<SearchHit>, CatalogServiceError> {
        let needle = query.trim().to_lowercase();
        let questions = self.bank.load(repository).await?;
        Ok(questions
            .into_iter()
            .enumerate()
            .filter(|(_, q)| needle.is_empty() || q.matches_lowercase(&needle))
            .map(|(index, question)| SearchHit { index, question })
            .collect())
    }

    /// Removes one question and returns it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::IndexOutOfRange` for an unknown index,
    /// `CatalogServiceError::Storage` on bank failures.
    pub async fn delete_question(
        &self,
        repository: &RepositoryRef,
        index: usize,
    ) -> Result<Question, CatalogServiceError> {
        let mut questions = self.bank.load(repository).await?;
        if index >= questions.len() {
            return Err(CatalogServiceError::IndexOutOfRange {
                index,
                total: questions.len(),
            });
        }
        let removed = questions.remove(index);
        self.bank.save(repository, &questions).await?;
        info!(repository = %repository.key(), index, "question deleted");
        Ok(removed)
    }

    /// Moves questions into a sibling repository, creating it if needed.
    ///
    /// Duplicate indices are ignored. Moved questions are appended to the
    /// target in repository order. Returns the number moved.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError` for empty or out-of-range indices, a
    /// target equal to the source, or bank failures.
    pub async fn move_questions(
        &self,
        source: &RepositoryRef,
        indices: &[usize],
        target_repository: &str,
    ) -> Result<usize, CatalogServiceError> {
        let target = source.sibling(target_repository)?;
        if &target == source {
            return Err(CatalogServiceError::SameRepository);
        }
        let picked: BTreeSet<usize> = indices.iter().copied().collect();
        if picked.is_empty() {
            return Err(CatalogServiceError::NoIndices);
        }

        let questions = self.bank.load(source).await?;
        if let Some(&index) = picked.iter().find(|&&idx| idx >= questions.len()) {
            return Err(CatalogServiceError::IndexOutOfRange {
                index,
                total: questions.len(),
            });
        }

        let mut target_questions = if self.bank.exists(&target).await? {
            self.bank.load(&target).await?
        } else {
            Vec::new()
        };

        let (moved, kept): (Vec<_>, Vec<_>) = questions
            .into_iter()
            .enumerate()
            .partition(|(idx, _)| picked.contains(idx));
        let count = moved.len();
        target_questions.extend(moved.into_iter().map(|(_, q)| q));
        let kept: Vec<Question> = kept.into_iter().map(|(_, q)| q).collect();

        // Target first: a failure in between duplicates questions instead of losing them.
        self.bank.save(&target, &target_questions).await?;
        self.bank.save(source, &kept).await?;

        info!(
            source = %source.key(),
            target = %target.key(),
            count,
            "questions moved"
        );
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` on backend failures.
    pub async fn status(
        &self,
        profile: &ProfileName,
        repository: &RepositoryRef,
    ) -> Result<Option<String>, CatalogServiceError> {
        Ok(self.statuses.get_status(profile, repository).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::EmptyStatus` for a blank status,
    /// `CatalogServiceError::Storage` on backend failures.
    pub async fn set_status(
        &self,
        profile: &ProfileName,
        repository: &RepositoryRef,
        status: &str,
    ) -> Result<(), CatalogServiceError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(CatalogServiceError::EmptyStatus);
        }
        self.statuses.set_status(profile, repository, status).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` on backend failures.
    pub async fn statuses(
        &self,
        profile: &ProfileName,
    ) -> Result<Vec<RepositoryStatusRecord>, CatalogServiceError> {
        Ok(self.statuses.list_statuses(profile).await?)
    }
}
