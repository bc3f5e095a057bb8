//! Subcommand implementations.

pub mod edit;
pub mod practice;
pub mod questions;
pub mod results;
pub mod search;
pub mod seed;
pub mod status;
pub mod structure;
pub mod take;
pub mod test_config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use services::{AppServices, Clock};
use storage::bank::FsQuestionBank;
use testmate_core::model::{ProfileName, RepositoryRef};

use crate::config::{Settings, prepare_sqlite_file};

/// Services and settings shared by every command.
pub struct Runtime {
    pub services: AppServices,
    pub bank: Arc<FsQuestionBank>,
    pub profile: ProfileName,
}

impl Runtime {
    /// Opens (and migrates) the database and points the bank at its directory.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be created or opened.
    pub async fn open(settings: &Settings) -> Result<Self> {
        prepare_sqlite_file(&settings.database_url)?;
        let bank = Arc::new(FsQuestionBank::new(settings.bank_dir.clone()));
        let services =
            AppServices::new_sqlite(&settings.database_url, bank.clone(), Clock::system())
                .await
                .with_context(|| format!("failed to open database {}", settings.database_url))?;
        Ok(Self {
            services,
            bank,
            profile: settings.profile.clone(),
        })
    }

    #[must_use]
    pub fn bank_dir(&self) -> PathBuf {
        self.bank.root().to_path_buf()
    }
}

/// Parses `domain/topic/repository`.
///
/// # Errors
///
/// Returns a message for anything but three non-empty segments.
pub fn parse_repository(raw: &str) -> Result<RepositoryRef, String> {
    let parts: Vec<&str> = raw.split('/').map(str::trim).collect();
    let [domain, topic, repository] = parts.as_slice() else {
        return Err(format!("expected DOMAIN/TOPIC/REPOSITORY, got {raw:?}"));
    };
    RepositoryRef::new(*domain, *topic, *repository).map_err(|e| e.to_string())
}

/// Converts a 1-based question number typed by the user to an index.
///
/// # Errors
///
/// Fails for zero.
pub fn question_index(number: usize) -> Result<usize> {
    number.checked_sub(1).context("question numbers start at 1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_paths_need_three_segments() {
        let repo = parse_repository("Math / Basics/Mixed").unwrap();
        assert_eq!(repo.key(), "Math/Basics/Mixed");
        assert!(parse_repository("Math/Basics").is_err());
        assert!(parse_repository("Math/Basics/Mixed/Extra").is_err());
        assert!(parse_repository("Math//Mixed").is_err());
    }

    #[test]
    fn question_numbers_are_one_based() {
        assert_eq!(question_index(1).unwrap(), 0);
        assert!(question_index(0).is_err());
    }
}
