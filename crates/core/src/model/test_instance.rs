use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::attempt::QuestionAttempt;
use crate::model::catalog::{ProfileName, RepositoryRef};
use crate::model::ids::TestId;
use crate::model::test_config::QuestionRange;

/// Which questions a retest covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetestType {
    FullSet,
    IncorrectOnly,
    SkippedOnly,
}

impl RetestType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RetestType::FullSet => "full_set",
            RetestType::IncorrectOnly => "incorrect_only",
            RetestType::SkippedOnly => "skipped_only",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "full_set" => Some(RetestType::FullSet),
            "incorrect_only" => Some(RetestType::IncorrectOnly),
            "skipped_only" => Some(RetestType::SkippedOnly),
            _ => None,
        }
    }

    fn name_suffix(self) -> &'static str {
        match self {
            RetestType::FullSet => "Retest",
            RetestType::IncorrectOnly => "Incorrect Only",
            RetestType::SkippedOnly => "Skipped Only",
        }
    }
}

/// A completed test that was not started from a saved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestInstance {
    pub test_id: TestId,
    pub test_name: String,
    #[serde(flatten)]
    pub repository: RepositoryRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_test: Option<TestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retest_type: Option<RetestType>,
    pub created_on: DateTime<Utc>,
    #[serde(rename = "profileName")]
    pub profile_name: ProfileName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_range: Option<QuestionRange>,
    pub questions_attempted: Vec<QuestionAttempt>,
    /// Rounded percentage, 0..=100.
    pub score: u32,
    pub total_questions: u32,
    pub completed: bool,
}

impl TestInstance {
    /// Display name for a saved test.
    ///
    /// `"<repo> - <YYYY-MM-DD>"` normally; a retest with a known parent is
    /// named after its filter instead.
    #[must_use]
    pub fn build_name(
        repository: &RepositoryRef,
        parent: Option<&TestId>,
        retest: Option<RetestType>,
        created_on: DateTime<Utc>,
    ) -> String {
        match (parent, retest) {
            (Some(_), Some(retest)) => {
                format!("{} - {}", repository.repository(), retest.name_suffix())
            }
            _ => format!(
                "{} - {}",
                repository.repository(),
                created_on.format("%Y-%m-%d")
            ),
        }
    }

    /// Indices (display order) of questions answered wrong.
    #[must_use]
    pub fn incorrect_indices(&self) -> Vec<usize> {
        self.questions_attempted
            .iter()
            .filter(|a| a.is_incorrect())
            .map(|a| a.question_index)
            .collect()
    }

    /// Indices (display order) of questions left unanswered.
    #[must_use]
    pub fn skipped_indices(&self) -> Vec<usize> {
        self.questions_attempted
            .iter()
            .filter(|a| a.skipped)
            .map(|a| a.question_index)
            .collect()
    }
}
