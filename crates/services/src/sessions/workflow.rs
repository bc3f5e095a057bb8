use std::sync::Arc;

use storage::bank::QuestionBank;
use storage::repository::{
    SnapshotRepository, StorageError, TestAttemptRepository, TestConfigRepository,
    TestResultRepository,
};
use testmate_core::model::{
    AttemptSnapshot, AttemptType, ConfigId, ProfileName, QuestionRange, RepositoryRef, RetestType,
    TestAttempt, TestId, TestInstance,
};
use tracing::{debug, info, warn};

use super::plan::PlanBuilder;
use super::service::{SavedResult, SessionContext, SessionMode, SessionOutcome, TestSession};
use crate::Clock;
use crate::error::SessionError;
use crate::practice_service::PracticeService;

/// Key prefix of per-profile attempt snapshots.
pub const SNAPSHOT_KEY_PREFIX: &str = "testmate_snapshot_";

/// How to start a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub context: SessionContext,
    /// Explicit range; otherwise the configuration's, otherwise everything.
    pub range: Option<QuestionRange>,
    /// Carry over the last attempts. Defaults to on for practice, off for tests.
    pub resume: Option<bool>,
}

impl SessionRequest {
    #[must_use]
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            range: None,
            resume: None,
        }
    }

    #[must_use]
    pub fn with_range(mut self, range: Option<QuestionRange>) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub fn with_resume(mut self, resume: Option<bool>) -> Self {
        self.resume = resume;
        self
    }
}

/// Orchestrates session start, per-answer persistence and result filing.
#[derive(Clone)]
pub struct TestLoopService {
    clock: Clock,
    bank: Arc<dyn QuestionBank>,
    configs: Arc<dyn TestConfigRepository>,
    attempts: Arc<dyn TestAttemptRepository>,
    results: Arc<dyn TestResultRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    practice: PracticeService,
}

impl TestLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        bank: Arc<dyn QuestionBank>,
        configs: Arc<dyn TestConfigRepository>,
        attempts: Arc<dyn TestAttemptRepository>,
        results: Arc<dyn TestResultRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
    ) -> Self {
        let practice = PracticeService::new(clock, Arc::clone(&snapshots));
        Self {
            clock,
            bank,
            configs,
            attempts,
            results,
            snapshots,
            practice,
        }
    }

    /// `testmate_snapshot_<profile>/<domain>/<topic>/<repository>`.
    ///
    /// Repository segments never contain `/`, so the last three segments
    /// always name the repository and everything before them the profile.
    #[must_use]
    pub fn snapshot_key(profile: &ProfileName, repository: &RepositoryRef) -> String {
        format!("{SNAPSHOT_KEY_PREFIX}{profile}/{}", repository.key())
    }

    /// Last known attempts of a profile on a repository.
    ///
    /// An unreadable snapshot, or one filed for another repository, is
    /// logged and treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the store cannot be read.
    pub async fn load_snapshot(
        &self,
        profile: &ProfileName,
        repository: &RepositoryRef,
    ) -> Result<Option<AttemptSnapshot>, SessionError> {
        let key = Self::snapshot_key(profile, repository);
        let Some(value) = self.snapshots.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<AttemptSnapshot>(value) {
            Ok(snapshot) if snapshot.repository == *repository => Ok(Some(snapshot)),
            Ok(snapshot) => {
                warn!(%key, found = %snapshot.repository, "ignoring snapshot of another repository");
                Ok(None)
            }
            Err(err) => {
                warn!(%key, error = %err, "ignoring unreadable attempt snapshot");
                Ok(None)
            }
        }
    }

    /// Forgets previous attempts so the next session starts fresh.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the delete fails.
    pub async fn clear_snapshot(
        &self,
        profile: &ProfileName,
        repository: &RepositoryRef,
    ) -> Result<bool, SessionError> {
        let removed = self
            .snapshots
            .delete(&Self::snapshot_key(profile, repository))
            .await?;
        Ok(removed)
    }

    /// Start a session. Practice sessions also open practice progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if nothing is left to ask,
    /// `SessionError::Storage` if the repository or configuration is missing.
    pub async fn start_session(
        &self,
        request: SessionRequest,
    ) -> Result<TestSession, SessionError> {
        let SessionRequest {
            context,
            range,
            resume,
        } = request;

        let range = match (range, context.config_id) {
            (Some(range), _) => Some(range),
            (None, Some(config_id)) => Some(
                self.configs
                    .get_config(config_id)
                    .await?
                    .ok_or(StorageError::NotFound)?
                    .question_range,
            ),
            (None, None) => None,
        };

        let questions = self.bank.load(&context.repository).await?;
        let snapshot = self
            .load_snapshot(&context.profile, &context.repository)
            .await?;
        let resume = resume.unwrap_or(context.mode == SessionMode::Practice);

        let plan = PlanBuilder::new(&questions)
            .with_snapshot(snapshot.as_ref())
            .with_range(range)
            .with_retest(context.retest)
            .with_resume(resume)
            .build()?;

        if context.mode == SessionMode::Practice {
            self.practice
                .load_or_start(&context.repository, plan.range)
                .await?;
        }

        TestSession::new(context, plan, self.clock.now())
    }

    /// Start a test against a saved configuration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` with `NotFound` for an unknown
    /// configuration, and the errors of `start_session`.
    pub async fn start_from_config(
        &self,
        config_id: ConfigId,
    ) -> Result<TestSession, SessionError> {
        let config = self
            .configs
            .get_config(config_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let context = SessionContext::new(config.repository, config.profile_name, SessionMode::Test)
            .with_config(Some(config_id));
        self.start_session(SessionRequest::new(context).with_range(Some(config.question_range)))
            .await
    }

    /// Submit the current answer. Returns the auto-advance hint.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for invalid input or practice persistence failures.
    pub async fn submit(&self, session: &mut TestSession) -> Result<bool, SessionError> {
        let advance = session.submit()?;
        self.record_practice(session).await?;
        Ok(advance)
    }

    /// Grade the current question by hand. Returns the auto-advance hint.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for a finished session or practice persistence failures.
    pub async fn mark(&self, session: &mut TestSession, correct: bool) -> Result<bool, SessionError> {
        let advance = if correct {
            session.mark_correct()?
        } else {
            session.mark_incorrect()?
        };
        self.record_practice(session).await?;
        Ok(advance)
    }

    async fn record_practice(&self, session: &TestSession) -> Result<(), SessionError> {
        if session.mode() != SessionMode::Practice {
            return Ok(());
        }
        let Some((source_index, attempt)) = session.current_record() else {
            return Ok(());
        };
        let Some(answer) = attempt.answered.clone() else {
            return Ok(());
        };

        let repository = session.repository();
        self.practice
            .update_answer(repository, source_index, answer, attempt.correct)
            .await?;
        self.practice.update_current(repository, source_index).await?;
        Ok(())
    }

    /// Finish the session and persist its snapshot and result.
    ///
    /// When persistence fails the session stays finished; call
    /// `persist_result` to retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session already finished,
    /// `SessionError::Storage` if persistence fails.
    pub async fn finish(&self, session: &mut TestSession) -> Result<SessionOutcome, SessionError> {
        let outcome = session.finish(self.clock.now())?.clone();
        info!(
            repository = %session.repository(),
            mode = session.mode().as_str(),
            score = outcome.score,
            total = outcome.tally.total,
            time_taken = %outcome.time_taken,
            "session completed"
        );
        self.persist_result(session).await?;
        Ok(outcome)
    }

    /// Saves whatever a finished session has not saved yet.
    ///
    /// Practice sessions only update the snapshot and return `None`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` for a running session,
    /// `SessionError::Storage` if persistence fails.
    pub async fn persist_result(
        &self,
        session: &mut TestSession,
    ) -> Result<Option<SavedResult>, SessionError> {
        let Some(outcome) = session.outcome().cloned() else {
            return Err(SessionError::NotFinished);
        };

        if !session.snapshot_saved() {
            self.merge_snapshot(session, &outcome).await?;
            session.set_snapshot_saved();
        }

        if session.mode() == SessionMode::Practice {
            return Ok(None);
        }
        if let Some(saved) = session.saved() {
            return Ok(Some(saved.clone()));
        }

        let saved = match session.context().config_id {
            Some(config_id) => self.save_attempt(session, &outcome, config_id).await?,
            None => self.save_instance(session, &outcome).await?,
        };
        session.set_saved(saved.clone());
        Ok(Some(saved))
    }

    async fn merge_snapshot(
        &self,
        session: &TestSession,
        outcome: &SessionOutcome,
    ) -> Result<(), SessionError> {
        let context = session.context();
        let mut snapshot = self
            .load_snapshot(&context.profile, &context.repository)
            .await?
            .unwrap_or_else(|| AttemptSnapshot::new(context.repository.clone(), outcome.completed_at));
        snapshot.merge(session.attempts_by_source(), outcome.completed_at);

        let value = serde_json::to_value(&snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let key = Self::snapshot_key(&context.profile, &context.repository);
        self.snapshots.put(&key, &value).await?;
        debug!(%key, entries = snapshot.len(), "attempt snapshot merged");
        Ok(())
    }

    async fn save_attempt(
        &self,
        session: &TestSession,
        outcome: &SessionOutcome,
        config_id: ConfigId,
    ) -> Result<SavedResult, SessionError> {
        let context = session.context();
        // A retake of a configuration counts as a retry even without a saved parent test.
        let has_parent = context.parent_test.is_some() || context.retest.is_some();

        let (number, attempt_type) = match self.attempts.list_attempts(config_id).await {
            Ok(existing) => (
                u32::try_from(existing.len()).unwrap_or(u32::MAX - 1) + 1,
                AttemptType::from_retest(context.retest, has_parent),
            ),
            Err(err) => {
                warn!(%config_id, error = %err, "could not count attempts; saving as first full attempt");
                (1, AttemptType::Full)
            }
        };

        let attempt = TestAttempt {
            attempt_id: None,
            test_config_id: config_id,
            attempt_number: number,
            attempt_type,
            created_on: outcome.completed_at,
            questions_attempted: session.attempts().to_vec(),
            score: outcome.score,
            total_questions: u32::try_from(outcome.tally.total).unwrap_or(u32::MAX),
            time_taken: Some(outcome.time_taken.clone()),
        };
        let id = self.attempts.insert_attempt(&attempt).await?;
        info!(%config_id, attempt_id = %id, number, kind = attempt_type.as_str(), "test attempt saved");

        Ok(SavedResult::Attempt {
            id,
            number,
            attempt_type,
        })
    }

    async fn save_instance(
        &self,
        session: &TestSession,
        outcome: &SessionOutcome,
    ) -> Result<SavedResult, SessionError> {
        let context = session.context();
        let test_id = TestId::generate(outcome.completed_at);
        let instance = TestInstance {
            test_id: test_id.clone(),
            test_name: TestInstance::build_name(
                &context.repository,
                context.parent_test.as_ref(),
                context.retest,
                outcome.completed_at,
            ),
            repository: context.repository.clone(),
            parent_test: context.parent_test.clone(),
            retest_type: context.retest,
            created_on: outcome.completed_at,
            profile_name: context.profile.clone(),
            question_range: Some(session.range()),
            questions_attempted: session.attempts().to_vec(),
            score: outcome.score,
            total_questions: u32::try_from(outcome.tally.total).unwrap_or(u32::MAX),
            completed: true,
        };
        self.results.save_result(&instance).await?;
        info!(test_id = %test_id, name = %instance.test_name, "test result saved");

        Ok(SavedResult::Instance(test_id))
    }

    /// Start a retest of a finished session over the same range.
    ///
    /// The saved test becomes the parent of the new one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` for a running session and
    /// `SessionError::Empty` when there is nothing to retake.
    pub async fn retake(
        &self,
        session: &TestSession,
        retest: RetestType,
    ) -> Result<TestSession, SessionError> {
        let Some(outcome) = session.outcome() else {
            return Err(SessionError::NotFinished);
        };
        let nothing_left = match retest {
            RetestType::IncorrectOnly => outcome.incorrect_indices.is_empty(),
            RetestType::SkippedOnly => outcome.skipped_indices.is_empty(),
            RetestType::FullSet => false,
        };
        if nothing_left {
            return Err(SessionError::Empty);
        }

        let parent = match session.saved() {
            Some(SavedResult::Instance(id)) => Some(id.clone()),
            _ => session.context().parent_test.clone(),
        };
        let context = session.context().clone().with_retest(parent, Some(retest));
        self.start_session(SessionRequest::new(context).with_range(Some(session.range())))
            .await
    }
}
