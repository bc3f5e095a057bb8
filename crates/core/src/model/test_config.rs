use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::catalog::{ProfileName, RepositoryRef};
use crate::model::ids::ConfigId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RangeError {
    #[error("range start must be at least 1")]
    StartBelowOne,

    #[error("range start ({start}) is after range end ({end})")]
    Inverted { start: u32, end: u32 },

    #[error("repository has no questions")]
    EmptyRepository,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestConfigError {
    #[error("test name cannot be empty")]
    EmptyName,

    #[error(transparent)]
    Range(#[from] RangeError),
}

//
// ─── QUESTION RANGE ────────────────────────────────────────────────────────────
//

/// Inclusive, 1-based slice of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeParts")]
pub struct QuestionRange {
    start: u32,
    end: u32,
}

#[derive(Deserialize)]
struct RangeParts {
    start: u32,
    end: u32,
}

impl TryFrom<RangeParts> for QuestionRange {
    type Error = RangeError;

    fn try_from(parts: RangeParts) -> Result<Self, Self::Error> {
        Self::new(parts.start, parts.end)
    }
}

impl QuestionRange {
    /// # Errors
    ///
    /// Returns `RangeError` unless `1 <= start <= end`.
    pub fn new(start: u32, end: u32) -> Result<Self, RangeError> {
        if start < 1 {
            return Err(RangeError::StartBelowOne);
        }
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole repository.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::EmptyRepository` when `total` is zero.
    pub fn full(total: usize) -> Result<Self, RangeError> {
        let end = u32::try_from(total).unwrap_or(u32::MAX);
        if end == 0 {
            return Err(RangeError::EmptyRepository);
        }
        Ok(Self { start: 1, end })
    }

    /// Forces user input into a valid range for a repository of `total`
    /// questions: start is raised to 1, end lowered to `total`, and an
    /// inverted range collapses onto its end.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::EmptyRepository` when `total` is zero.
    pub fn clamp(start: u32, end: u32, total: usize) -> Result<Self, RangeError> {
        let total = u32::try_from(total).unwrap_or(u32::MAX);
        if total == 0 {
            return Err(RangeError::EmptyRepository);
        }
        Ok(Self::lenient(start, end.min(total)))
    }

    /// Like [`QuestionRange::clamp`] before the repository size is known:
    /// start is raised to 1 and an inverted range collapses onto its end.
    #[must_use]
    pub fn lenient(start: u32, end: u32) -> Self {
        let end = end.max(1);
        let start = start.max(1).min(end);
        Self { start, end }
    }

    #[must_use]
    pub fn start(&self) -> u32 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of questions covered. Never zero.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// 0-based repository indices covered by the range, cut at `total`.
    #[must_use]
    pub fn indices(&self, total: usize) -> std::ops::Range<usize> {
        let start = (self.start as usize - 1).min(total);
        let end = (self.end as usize).min(total);
        start..end
    }
}

impl fmt::Display for QuestionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.start, self.end)
    }
}

//
// ─── TEST CONFIGURATION ────────────────────────────────────────────────────────
//

/// A saved, re-runnable test over a range of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<ConfigId>,
    pub test_name: String,
    #[serde(flatten)]
    pub repository: RepositoryRef,
    pub question_range: QuestionRange,
    pub created_on: DateTime<Utc>,
    #[serde(rename = "profileName")]
    pub profile_name: ProfileName,
}

impl TestConfiguration {
    /// Builds an unsaved configuration. A missing name falls back to `default_name`.
    ///
    /// # Errors
    ///
    /// Returns `TestConfigError::EmptyName` if the given name is blank.
    pub fn new(
        test_name: Option<String>,
        repository: RepositoryRef,
        question_range: QuestionRange,
        profile_name: ProfileName,
        created_on: DateTime<Utc>,
    ) -> Result<Self, TestConfigError> {
        let test_name = match test_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_owned(),
            Some(_) => return Err(TestConfigError::EmptyName),
            None => Self::default_name(&repository, Some(question_range)),
        };

        Ok(Self {
            config_id: None,
            test_name,
            repository,
            question_range,
            created_on,
            profile_name,
        })
    }

    /// `"<repo> (<start>–<end>)"` for a ranged test, the repository name otherwise.
    #[must_use]
    pub fn default_name(repository: &RepositoryRef, range: Option<QuestionRange>) -> String {
        match range {
            Some(range) => format!("{} ({range})", repository.repository()),
            None => repository.repository().to_owned(),
        }
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_range.len()
    }

    #[must_use]
    pub fn with_id(mut self, id: ConfigId) -> Self {
        self.config_id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("Math", "Algebra", "Basics").unwrap()
    }

    #[test]
    fn range_rejects_invalid_bounds() {
        assert_eq!(QuestionRange::new(0, 3), Err(RangeError::StartBelowOne));
        assert_eq!(
            QuestionRange::new(5, 3),
            Err(RangeError::Inverted { start: 5, end: 3 })
        );
        assert_eq!(QuestionRange::new(2, 4).unwrap().len(), 3);
    }

    #[test]
    fn clamp_follows_form_validation() {
        let r = QuestionRange::clamp(0, 50, 20).unwrap();
        assert_eq!((r.start(), r.end()), (1, 20));

        let r = QuestionRange::clamp(15, 10, 20).unwrap();
        assert_eq!((r.start(), r.end()), (10, 10));

        let r = QuestionRange::clamp(3, 0, 20).unwrap();
        assert_eq!((r.start(), r.end()), (1, 1));

        assert_eq!(
            QuestionRange::clamp(1, 5, 0),
            Err(RangeError::EmptyRepository)
        );
    }

    #[test]
    fn lenient_range_fixes_bounds_without_a_size() {
        let r = QuestionRange::lenient(0, 2);
        assert_eq!((r.start(), r.end()), (1, 2));

        let r = QuestionRange::lenient(3, 2);
        assert_eq!((r.start(), r.end()), (2, 2));

        let r = QuestionRange::lenient(4, u32::MAX);
        assert_eq!((r.start(), r.end()), (4, u32::MAX));
    }

    #[test]
    fn indices_are_zero_based_and_cut() {
        let r = QuestionRange::new(2, 4).unwrap();
        assert_eq!(r.indices(10), 1..4);
        assert_eq!(r.indices(3), 1..3);
        assert_eq!(r.indices(0), 0..0);
    }

    #[test]
    fn default_name_includes_range() {
        let range = QuestionRange::new(1, 10).unwrap();
        assert_eq!(
            TestConfiguration::default_name(&repo(), Some(range)),
            "Basics (1–10)"
        );
        assert_eq!(TestConfiguration::default_name(&repo(), None), "Basics");
    }

    #[test]
    fn blank_name_is_rejected_but_missing_name_defaults() {
        let range = QuestionRange::new(1, 5).unwrap();
        let err = TestConfiguration::new(
            Some("   ".into()),
            repo(),
            range,
            ProfileName::default(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, TestConfigError::EmptyName);

        let cfg =
            TestConfiguration::new(None, repo(), range, ProfileName::default(), fixed_now())
                .unwrap();
        assert_eq!(cfg.test_name, "Basics (1–5)");
        assert_eq!(cfg.question_count(), 5);
    }

    #[test]
    fn serializes_with_flat_repository_fields() {
        let range = QuestionRange::new(1, 5).unwrap();
        let cfg = TestConfiguration::new(
            Some("Quiz".into()),
            repo(),
            range,
            ProfileName::default(),
            fixed_now(),
        )
        .unwrap();
        let value = serde_json::to_value(&cfg).unwrap();
        assert_eq!(value["domain"], "Math");
        assert_eq!(value["repository"], "Basics");
        assert_eq!(value["question_range"]["end"], 5);
        assert_eq!(value["profileName"], "default");
    }
}
