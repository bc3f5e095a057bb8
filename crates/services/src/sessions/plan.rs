use testmate_core::model::{
    AttemptSnapshot, Question, QuestionAttempt, QuestionRange, RetestType,
};

use crate::error::SessionError;

/// Questions selected for a session, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub questions: Vec<Question>,
    /// 0-based repository index of each selected question.
    pub source_indices: Vec<usize>,
    pub attempts: Vec<QuestionAttempt>,
    pub range: QuestionRange,
}

impl SessionPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Resolves which repository questions a session covers and what it
/// starts from.
pub struct PlanBuilder<'a> {
    questions: &'a [Question],
    snapshot: Option<&'a AttemptSnapshot>,
    range: Option<QuestionRange>,
    retest: Option<RetestType>,
    resume: bool,
}

impl<'a> PlanBuilder<'a> {
    #[must_use]
    pub fn new(questions: &'a [Question]) -> Self {
        Self {
            questions,
            snapshot: None,
            range: None,
            retest: None,
            resume: false,
        }
    }

    /// Last known attempts for the repository.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: Option<&'a AttemptSnapshot>) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Limit the session to a range; it is clamped to the repository size.
    #[must_use]
    pub fn with_range(mut self, range: Option<QuestionRange>) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub fn with_retest(mut self, retest: Option<RetestType>) -> Self {
        self.retest = retest;
        self
    }

    /// Start from snapshot attempts instead of fresh ones. Retests always do.
    #[must_use]
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// # Errors
    ///
    /// Returns `SessionError::Empty` when no question survives range and
    /// retest filtering.
    pub fn build(self) -> Result<SessionPlan, SessionError> {
        let total = self.questions.len();
        if total == 0 {
            return Err(SessionError::Empty);
        }

        let range = match self.range {
            Some(range) => QuestionRange::clamp(range.start(), range.end(), total)?,
            None => QuestionRange::full(total)?,
        };

        let snapshot = self.snapshot;
        let source_indices: Vec<usize> = range
            .indices(total)
            .filter(|&idx| match (self.retest, snapshot) {
                (Some(RetestType::IncorrectOnly), Some(snap)) => snap.is_incorrect(idx),
                (Some(RetestType::IncorrectOnly), None) => false,
                (Some(RetestType::SkippedOnly), Some(snap)) => snap.is_skipped_or_missing(idx),
                _ => true,
            })
            .collect();

        if source_indices.is_empty() {
            return Err(SessionError::Empty);
        }

        let carry = self.resume || self.retest.is_some();
        let attempts = source_indices
            .iter()
            .enumerate()
            .map(|(display, &source)| {
                let carried = if carry {
                    snapshot.and_then(|snap| snap.get(source)).cloned()
                } else {
                    None
                };
                match carried {
                    Some(mut attempt) => {
                        attempt.question_index = display;
                        attempt
                    }
                    None => QuestionAttempt::unanswered(display),
                }
            })
            .collect();

        let questions = source_indices
            .iter()
            .map(|&idx| self.questions[idx].clone())
            .collect();

        Ok(SessionPlan {
            questions,
            source_indices,
            attempts,
            range,
        })
    }
}
