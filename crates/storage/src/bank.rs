//! Question banks: where repositories of questions are read from and written to.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use testmate_core::model::{DomainStructure, Question, RepositoryRef};
use tracing::{debug, warn};

use crate::repository::StorageError;

const REPOSITORY_EXT: &str = "json";

/// Source of question repositories.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Every repository in the bank grouped by domain and topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read.
    async fn structure(&self) -> Result<DomainStructure, StorageError>;

    /// Questions of one repository, in stored order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the repository does not exist,
    /// `StorageError::Serialization` if it is not a JSON array of questions.
    async fn load(&self, repository: &RepositoryRef) -> Result<Vec<Question>, StorageError>;

    /// Replace the contents of a repository, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the repository cannot be written.
    async fn save(&self, repository: &RepositoryRef, questions: &[Question])
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read.
    async fn exists(&self, repository: &RepositoryRef) -> Result<bool, StorageError>;
}

//
// ─── FILESYSTEM ────────────────────────────────────────────────────────────────
//

/// Bank laid out as `<root>/<domain>/<topic>/<repository>.json`.
#[derive(Debug, Clone)]
pub struct FsQuestionBank {
    root: PathBuf,
}

impl FsQuestionBank {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn repository_path(&self, repository: &RepositoryRef) -> PathBuf {
        self.root
            .join(repository.domain())
            .join(repository.topic())
            .join(format!("{}.{REPOSITORY_EXT}", repository.repository()))
    }

    async fn subdirectories(dir: &Path) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = visible_name(&entry.path()) {
                names.push(name);
            }
        }
        Ok(names)
    }

    async fn repository_files(dir: &Path) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(REPOSITORY_EXT)
            {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if !stem.starts_with('.') => names.push(stem.to_owned()),
                _ => {}
            }
        }
        Ok(names)
    }
}

fn visible_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    (!name.starts_with('.')).then(|| name.to_owned())
}

#[async_trait]
impl QuestionBank for FsQuestionBank {
    async fn structure(&self) -> Result<DomainStructure, StorageError> {
        let mut structure = DomainStructure::new();
        if !tokio::fs::try_exists(&self.root).await? {
            return Ok(structure);
        }

        for domain in Self::subdirectories(&self.root).await? {
            let domain_dir = self.root.join(&domain);
            for topic in Self::subdirectories(&domain_dir).await? {
                let topic_dir = domain_dir.join(&topic);
                for name in Self::repository_files(&topic_dir).await? {
                    match RepositoryRef::new(domain.as_str(), topic.as_str(), name.as_str()) {
                        Ok(repository) => structure.insert(&repository),
                        Err(err) => warn!(%domain, %topic, %name, error = %err, "skipping repository"),
                    }
                }
            }
        }
        Ok(structure)
    }

    async fn load(&self, repository: &RepositoryRef) -> Result<Vec<Question>, StorageError> {
        let path = self.repository_path(repository);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound);
            }
            Err(err) => return Err(err.into()),
        };
        let questions: Vec<Question> = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Serialization(format!("{}: {e}", path.display())))?;
        debug!(repository = %repository.key(), count = questions.len(), "loaded repository");
        Ok(questions)
    }

    async fn save(
        &self,
        repository: &RepositoryRef,
        questions: &[Question],
    ) -> Result<(), StorageError> {
        let path = self.repository_path(repository);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(questions)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let tmp = path.with_extension(format!("{REPOSITORY_EXT}.tmp"));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(repository = %repository.key(), count = questions.len(), "saved repository");
        Ok(())
    }

    async fn exists(&self, repository: &RepositoryRef) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.repository_path(repository)).await?)
    }
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Bank kept in memory, for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQuestionBank {
    repositories: Arc<Mutex<BTreeMap<RepositoryRef, Vec<Question>>>>,
}

impl InMemoryQuestionBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used to seed fixtures.
    #[must_use]
    pub fn with_repository(self, repository: RepositoryRef, questions: Vec<Question>) -> Self {
        if let Ok(mut guard) = self.repositories.lock() {
            guard.insert(repository, questions);
        }
        self
    }

    fn guard(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<RepositoryRef, Vec<Question>>>, StorageError>
    {
        self.repositories
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QuestionBank for InMemoryQuestionBank {
    async fn structure(&self) -> Result<DomainStructure, StorageError> {
        let guard = self.guard()?;
        let mut structure = DomainStructure::new();
        for repository in guard.keys() {
            structure.insert(repository);
        }
        Ok(structure)
    }

    async fn load(&self, repository: &RepositoryRef) -> Result<Vec<Question>, StorageError> {
        let guard = self.guard()?;
        guard.get(repository).cloned().ok_or(StorageError::NotFound)
    }

    async fn save(
        &self,
        repository: &RepositoryRef,
        questions: &[Question],
    ) -> Result<(), StorageError> {
        let mut guard = self.guard()?;
        guard.insert(repository.clone(), questions.to_vec());
        Ok(())
    }

    async fn exists(&self, repository: &RepositoryRef) -> Result<bool, StorageError> {
        Ok(self.guard()?.contains_key(repository))
    }
}
