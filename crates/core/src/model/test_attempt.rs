use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::attempt::QuestionAttempt;
use crate::model::ids::{AttemptId, ConfigId};
use crate::model::test_instance::RetestType;

/// How an attempt against a saved configuration was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptType {
    Full,
    Retry,
    Incorrect,
    Skipped,
}

impl AttemptType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptType::Full => "full",
            AttemptType::Retry => "retry",
            AttemptType::Incorrect => "incorrect",
            AttemptType::Skipped => "skipped",
        }
    }

    /// Label shown in attempt listings.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AttemptType::Full => "Full Test",
            AttemptType::Retry => "Retry",
            AttemptType::Incorrect => "Incorrect Questions",
            AttemptType::Skipped => "Skipped Questions",
        }
    }

    /// Derives the attempt type from a retest request.
    ///
    /// A filtered retest wins over the parent link; a parent without a
    /// filter is a plain retry.
    #[must_use]
    pub fn from_retest(retest: Option<RetestType>, has_parent: bool) -> Self {
        match retest {
            Some(RetestType::IncorrectOnly) => AttemptType::Incorrect,
            Some(RetestType::SkippedOnly) => AttemptType::Skipped,
            _ if has_parent => AttemptType::Retry,
            _ => AttemptType::Full,
        }
    }

    /// Parses the stored lowercase form.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "full" => Some(AttemptType::Full),
            "retry" => Some(AttemptType::Retry),
            "incorrect" => Some(AttemptType::Incorrect),
            "skipped" => Some(AttemptType::Skipped),
            _ => None,
        }
    }
}

/// One run of a saved test configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAttempt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<AttemptId>,
    pub test_config_id: ConfigId,
    pub attempt_number: u32,
    pub attempt_type: AttemptType,
    pub created_on: DateTime<Utc>,
    pub questions_attempted: Vec<QuestionAttempt>,
    /// Rounded percentage, 0..=100.
    pub score: u32,
    pub total_questions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<String>,
}

impl TestAttempt {
    #[must_use]
    pub fn with_id(mut self, id: AttemptId) -> Self {
        self.attempt_id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retest_request_maps_to_attempt_type() {
        assert_eq!(
            AttemptType::from_retest(Some(RetestType::IncorrectOnly), true),
            AttemptType::Incorrect
        );
        assert_eq!(
            AttemptType::from_retest(Some(RetestType::SkippedOnly), false),
            AttemptType::Skipped
        );
        assert_eq!(
            AttemptType::from_retest(Some(RetestType::FullSet), true),
            AttemptType::Retry
        );
        assert_eq!(AttemptType::from_retest(None, true), AttemptType::Retry);
        assert_eq!(AttemptType::from_retest(None, false), AttemptType::Full);
    }

    #[test]
    fn labels_and_storage_names() {
        assert_eq!(AttemptType::Incorrect.label(), "Incorrect Questions");
        for ty in [
            AttemptType::Full,
            AttemptType::Retry,
            AttemptType::Incorrect,
            AttemptType::Skipped,
        ] {
            assert_eq!(AttemptType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(AttemptType::parse("partial"), None);
    }
}
