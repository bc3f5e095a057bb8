//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use testmate_core::model::{CatalogError, RangeError, TestConfigError};

/// Errors emitted by test sessions and their workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already completed")]
    Completed,
    #[error("session is not finished yet")]
    NotFinished,
    #[error("an answer is required before submitting")]
    EmptyAnswer,
    #[error("question {index} is out of range (session has {total})")]
    QuestionOutOfRange { index: usize, total: usize },
    #[error("option {index} is out of range (question has {options})")]
    OptionOutOfRange { index: usize, options: usize },
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Practice(#[from] PracticeError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error("status must not be empty")]
    EmptyStatus,
    #[error("no question indices given")]
    NoIndices,
    #[error("question {index} is out of range (repository has {total})")]
    IndexOutOfRange { index: usize, total: usize },
    #[error("source and target repository are the same")]
    SameRepository,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TestConfigService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestConfigServiceError {
    #[error(transparent)]
    Config(#[from] TestConfigError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PracticeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("practice progress under {key} is unreadable: {message}")]
    Corrupt { key: String, message: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
