use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::attempt::QuestionAttempt;
use crate::model::catalog::RepositoryRef;

/// Last known attempt of one repository question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// 0-based position of the question in its repository.
    pub source_index: usize,
    pub attempt: QuestionAttempt,
}

/// Carry-over state for a repository: what the user last did with each
/// question, used to resume practice and to build retests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSnapshot {
    pub repository: RepositoryRef,
    /// Sorted by `source_index`, at most one entry per index.
    pub entries: Vec<SnapshotEntry>,
    pub saved_at: DateTime<Utc>,
}

impl AttemptSnapshot {
    #[must_use]
    pub fn new(repository: RepositoryRef, saved_at: DateTime<Utc>) -> Self {
        Self {
            repository,
            entries: Vec::new(),
            saved_at,
        }
    }

    #[must_use]
    pub fn get(&self, source_index: usize) -> Option<&QuestionAttempt> {
        self.entries
            .binary_search_by_key(&source_index, |e| e.source_index)
            .ok()
            .map(|pos| &self.entries[pos].attempt)
    }

    /// True when the question was last answered wrong.
    #[must_use]
    pub fn is_incorrect(&self, source_index: usize) -> bool {
        self.get(source_index).is_some_and(QuestionAttempt::is_incorrect)
    }

    /// True when the question was last skipped or never seen.
    #[must_use]
    pub fn is_skipped_or_missing(&self, source_index: usize) -> bool {
        self.get(source_index).is_none_or(|a| a.skipped)
    }

    /// Replaces entries for the given questions and keeps all others.
    pub fn merge(
        &mut self,
        attempts: impl IntoIterator<Item = (usize, QuestionAttempt)>,
        saved_at: DateTime<Utc>,
    ) {
        for (source_index, attempt) in attempts {
            match self
                .entries
                .binary_search_by_key(&source_index, |e| e.source_index)
            {
                Ok(pos) => self.entries[pos].attempt = attempt,
                Err(pos) => self.entries.insert(
                    pos,
                    SnapshotEntry {
                        source_index,
                        attempt,
                    },
                ),
            }
        }
        self.saved_at = saved_at;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn answered(index: usize, correct: bool) -> QuestionAttempt {
        let mut a = QuestionAttempt::unanswered(index);
        a.skipped = false;
        a.correct = correct;
        a
    }

    fn snapshot() -> AttemptSnapshot {
        AttemptSnapshot::new(
            RepositoryRef::new("Math", "Algebra", "Basics").unwrap(),
            fixed_now(),
        )
    }

    #[test]
    fn merge_replaces_only_touched_entries() {
        let mut s = snapshot();
        s.merge(vec![(5, answered(0, false)), (2, answered(1, true))], fixed_now());
        assert_eq!(
            s.entries.iter().map(|e| e.source_index).collect::<Vec<_>>(),
            vec![2, 5]
        );

        s.merge(vec![(5, answered(0, true)), (7, QuestionAttempt::unanswered(1))], fixed_now());
        assert_eq!(s.len(), 3);
        assert!(s.get(5).unwrap().correct);
        assert!(s.get(2).unwrap().correct);
        assert!(s.get(7).unwrap().skipped);
    }

    #[test]
    fn classifies_entries_for_retests() {
        let mut s = snapshot();
        s.merge(
            vec![
                (0, answered(0, false)),
                (1, answered(1, true)),
                (2, QuestionAttempt::unanswered(2)),
            ],
            fixed_now(),
        );
        assert!(s.is_incorrect(0));
        assert!(!s.is_incorrect(1));
        assert!(!s.is_incorrect(2));
        assert!(s.is_skipped_or_missing(2));
        assert!(s.is_skipped_or_missing(9));
        assert!(!s.is_skipped_or_missing(1));
    }
}
