use chrono::{DateTime, Utc};
use std::fmt;
use testmate_core::check_answer;
use testmate_core::model::{
    AttemptId, AttemptType, ConfigId, ProfileName, Question, QuestionAttempt, QuestionKind,
    QuestionRange, QuestionStatus, RepositoryRef, RetestType, TestId, UserAnswer,
};
use testmate_core::scoring::AttemptTally;
use testmate_core::time::format_elapsed;
use tracing::debug;

use super::plan::SessionPlan;
use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── CONTEXT ───────────────────────────────────────────────────────────────────
//

/// Whether a session is recorded as a test or kept as practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionMode {
    Test,
    Practice,
}

impl SessionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Test => "test",
            SessionMode::Practice => "practice",
        }
    }
}

/// What a session runs against and how its result is filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub repository: RepositoryRef,
    pub profile: ProfileName,
    pub mode: SessionMode,
    /// Saved configuration the run counts as an attempt of.
    pub config_id: Option<ConfigId>,
    pub parent_test: Option<TestId>,
    pub retest: Option<RetestType>,
}

impl SessionContext {
    #[must_use]
    pub fn new(repository: RepositoryRef, profile: ProfileName, mode: SessionMode) -> Self {
        Self {
            repository,
            profile,
            mode,
            config_id: None,
            parent_test: None,
            retest: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config_id: Option<ConfigId>) -> Self {
        self.config_id = config_id;
        self
    }

    #[must_use]
    pub fn with_retest(mut self, parent_test: Option<TestId>, retest: Option<RetestType>) -> Self {
        self.parent_test = parent_test;
        self.retest = retest;
        self
    }
}

//
// ─── ANSWER VIEW ───────────────────────────────────────────────────────────────
//

/// Input state of the question currently shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerView {
    /// One flag per option, in display order.
    pub selected: Vec<bool>,
    pub text: String,
    pub submitted: bool,
    pub correct: bool,
    pub feedback_visible: bool,
}

impl AnswerView {
    fn from_attempt(question: &Question, attempt: &QuestionAttempt) -> Self {
        let mut selected = vec![false; question.options().len()];
        let mut text = String::new();
        match &attempt.answered {
            Some(UserAnswer::Choices(choices)) => {
                for &number in choices {
                    let slot = usize::try_from(number)
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|idx| selected.get_mut(idx));
                    if let Some(slot) = slot {
                        *slot = true;
                    }
                }
            }
            Some(UserAnswer::Text(t)) => text.clone_from(t),
            None => {}
        }

        let mut view = Self {
            selected,
            text,
            ..Self::default()
        };
        if !attempt.skipped {
            // A wrong answer from an earlier run stays open for resubmission.
            let reopened = attempt.incorrect_previous_attempt;
            view.submitted = !reopened;
            view.feedback_visible = !reopened;
            view.correct = attempt.correct;
        }
        view
    }

    /// Selected options as 1-based numbers.
    #[must_use]
    pub fn selected_choices(&self) -> Vec<u32> {
        self.selected
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .filter_map(|(idx, _)| u32::try_from(idx + 1).ok())
            .collect()
    }
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Result of finishing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub score: u32,
    pub tally: AttemptTally,
    /// Display indices answered wrong.
    pub incorrect_indices: Vec<usize>,
    /// Display indices left unanswered.
    pub skipped_indices: Vec<usize>,
    /// `MM:SS`.
    pub time_taken: String,
    pub completed_at: DateTime<Utc>,
}

/// Where a finished test was filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedResult {
    Attempt {
        id: AttemptId,
        number: u32,
        attempt_type: AttemptType,
    },
    Instance(TestId),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory test or practice session over a planned list of questions.
pub struct TestSession {
    context: SessionContext,
    range: QuestionRange,
    questions: Vec<Question>,
    source_indices: Vec<usize>,
    attempts: Vec<QuestionAttempt>,
    current: usize,
    view: AnswerView,
    started_at: DateTime<Utc>,
    outcome: Option<SessionOutcome>,
    snapshot_saved: bool,
    saved: Option<SavedResult>,
}

impl TestSession {
    /// Opens a session on the first planned question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the plan has no questions.
    pub fn new(
        context: SessionContext,
        plan: SessionPlan,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if plan.is_empty() || plan.attempts.len() != plan.questions.len() {
            return Err(SessionError::Empty);
        }

        let view = AnswerView::from_attempt(&plan.questions[0], &plan.attempts[0]);
        debug!(
            repository = %context.repository,
            mode = context.mode.as_str(),
            questions = plan.questions.len(),
            "session started"
        );

        Ok(Self {
            context,
            range: plan.range,
            questions: plan.questions,
            source_indices: plan.source_indices,
            attempts: plan.attempts,
            current: 0,
            view,
            started_at,
            outcome: None,
            snapshot_saved: false,
            saved: None,
        })
    }

    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    #[must_use]
    pub fn repository(&self) -> &RepositoryRef {
        &self.context.repository
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.context.mode
    }

    #[must_use]
    pub fn range(&self) -> QuestionRange {
        self.range
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn attempts(&self) -> &[QuestionAttempt] {
        &self.attempts
    }

    /// Repository index of the question shown at `display_index`.
    #[must_use]
    pub fn source_index(&self, display_index: usize) -> Option<usize> {
        self.source_indices.get(display_index).copied()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn current_attempt(&self) -> &QuestionAttempt {
        &self.attempts[self.current]
    }

    #[must_use]
    pub fn view(&self) -> &AnswerView {
        &self.view
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.outcome.as_ref().map(|o| o.completed_at)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn saved(&self) -> Option<&SavedResult> {
        self.saved.as_ref()
    }

    /// Running time as `MM:SS`.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> String {
        format_elapsed(now - self.started_at)
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    #[must_use]
    pub fn status(&self, index: usize) -> Option<QuestionStatus> {
        self.attempts.get(index).map(QuestionAttempt::status)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let tally = AttemptTally::from_attempts(&self.attempts);
        SessionProgress {
            total: tally.total,
            answered: tally.answered,
            correct: tally.correct,
            incorrect: tally.incorrect,
            skipped: tally.skipped,
            current: self.current,
            is_complete: self.is_complete(),
        }
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        Ok(())
    }

    fn enter(&mut self, index: usize) {
        self.current = index;
        self.view = AnswerView::from_attempt(&self.questions[index], &self.attempts[index]);
        debug!(index, status = self.attempts[index].status().as_str(), "entered question");
    }

    /// Selects option `index` (0-based). Single-answer questions keep one
    /// selection; multiple-answer questions toggle.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::OptionOutOfRange` for an unknown option and
    /// `SessionError::Completed` after the session finished.
    pub fn select_option(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_active()?;
        let options = self.view.selected.len();
        if index >= options {
            return Err(SessionError::OptionOutOfRange { index, options });
        }

        if self.current_question().kind() == QuestionKind::Multiple {
            self.view.selected[index] = !self.view.selected[index];
        } else {
            self.view.selected.iter_mut().for_each(|s| *s = false);
            self.view.selected[index] = true;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Completed` after the session finished.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.view.text = text.into();
        Ok(())
    }

    /// Grades the current input and records it.
    ///
    /// Returns true when the caller should move on: the answer is correct
    /// and this is not the last question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyAnswer` when nothing is selected or typed,
    /// `SessionError::Completed` after the session finished.
    pub fn submit(&mut self) -> Result<bool, SessionError> {
        self.ensure_active()?;
        let answer = if self.current_question().takes_choices() {
            let choices = self.view.selected_choices();
            if choices.is_empty() {
                return Err(SessionError::EmptyAnswer);
            }
            UserAnswer::Choices(choices)
        } else {
            let text = self.view.text.trim();
            if text.is_empty() {
                return Err(SessionError::EmptyAnswer);
            }
            UserAnswer::Text(text.to_owned())
        };

        let correct = check_answer(self.current_question(), &answer);
        let attempt = &mut self.attempts[self.current];
        attempt.answered = Some(answer);
        attempt.correct = correct;
        attempt.skipped = false;
        attempt.incorrect_previous_attempt = false;

        self.view.submitted = true;
        self.view.correct = correct;
        self.view.feedback_visible = true;
        debug!(index = self.current, correct, "answer submitted");

        Ok(correct && !self.is_last())
    }

    /// Shows feedback for the current question without grading it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after the session finished.
    pub fn reveal_answer(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.view.feedback_visible = true;
        Ok(())
    }

    /// Manual grading. Returns true when there is a next question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after the session finished.
    pub fn mark_correct(&mut self) -> Result<bool, SessionError> {
        self.mark(true)
    }

    /// Manual grading; the question stays open for resubmission next time.
    /// Returns true when there is a next question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after the session finished.
    pub fn mark_incorrect(&mut self) -> Result<bool, SessionError> {
        self.mark(false)
    }

    fn mark(&mut self, correct: bool) -> Result<bool, SessionError> {
        self.ensure_active()?;
        let typed = self.view.text.trim().to_owned();
        let attempt = &mut self.attempts[self.current];
        attempt.correct = correct;
        attempt.skipped = false;
        if !correct {
            attempt.incorrect_previous_attempt = true;
        }
        if attempt.answered.is_none() {
            attempt.answered = Some(UserAnswer::Text(typed));
        }

        self.view.correct = correct;
        self.view.feedback_visible = true;
        debug!(index = self.current, correct, "answer marked");

        Ok(!self.is_last())
    }

    /// Moves forward; a no-op on the last question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after the session finished.
    pub fn next(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        if !self.is_last() {
            self.enter(self.current + 1);
        }
        Ok(())
    }

    /// Moves back; a no-op on the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after the session finished.
    pub fn previous(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        if self.current > 0 {
            self.enter(self.current - 1);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::QuestionOutOfRange` for an unknown index and
    /// `SessionError::Completed` after the session finished.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_active()?;
        if index >= self.questions.len() {
            return Err(SessionError::QuestionOutOfRange {
                index,
                total: self.questions.len(),
            });
        }
        self.enter(index);
        Ok(())
    }

    /// Scores the session and closes it.
    ///
    /// Every answered-but-wrong attempt is flagged so a later run reopens it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session already finished.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<&SessionOutcome, SessionError> {
        self.ensure_active()?;

        for attempt in &mut self.attempts {
            attempt.incorrect_previous_attempt = !attempt.skipped && !attempt.correct;
        }

        let tally = AttemptTally::from_attempts(&self.attempts);
        let outcome = SessionOutcome {
            score: tally.score(),
            tally,
            incorrect_indices: self
                .attempts
                .iter()
                .filter(|a| a.is_incorrect())
                .map(|a| a.question_index)
                .collect(),
            skipped_indices: self
                .attempts
                .iter()
                .filter(|a| a.skipped)
                .map(|a| a.question_index)
                .collect(),
            time_taken: format_elapsed(now - self.started_at),
            completed_at: now,
        };
        debug!(score = outcome.score, total = tally.total, "session finished");

        Ok(self.outcome.insert(outcome))
    }

    /// The current question's repository index and attempt, if answered.
    pub(crate) fn current_record(&self) -> Option<(usize, &QuestionAttempt)> {
        let attempt = &self.attempts[self.current];
        if attempt.skipped {
            return None;
        }
        Some((self.source_indices[self.current], attempt))
    }

    /// Attempts keyed by repository index.
    pub(crate) fn attempts_by_source(&self) -> impl Iterator<Item = (usize, QuestionAttempt)> + '_ {
        self.source_indices
            .iter()
            .copied()
            .zip(self.attempts.iter().cloned())
    }

    pub(crate) fn snapshot_saved(&self) -> bool {
        self.snapshot_saved
    }

    pub(crate) fn set_snapshot_saved(&mut self) {
        self.snapshot_saved = true;
    }

    pub(crate) fn set_saved(&mut self, saved: SavedResult) {
        self.saved = Some(saved);
    }
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSession")
            .field("repository", &self.context.repository)
            .field("mode", &self.context.mode)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("started_at", &self.started_at)
            .field("complete", &self.is_complete())
            .field("saved", &self.saved)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
