use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::attempt::UserAnswer;
use crate::model::catalog::{CatalogError, RepositoryRef};
use crate::model::test_config::QuestionRange;

/// Last answer given to one question during practice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredQuestion {
    pub user_answer: UserAnswer,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
}

/// Resumable state of a practice run over one repository.
///
/// `answered_questions` is keyed by the 0-based repository index of the
/// question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProgressRepr", into = "ProgressRepr")]
pub struct PracticeProgress {
    pub repository: RepositoryRef,
    pub question_range: QuestionRange,
    pub current_question_index: usize,
    pub answered_questions: BTreeMap<usize, AnsweredQuestion>,
    pub last_updated: DateTime<Utc>,
}

// Stored shape. Repository fields sit at the top level; `flatten` cannot be
// used here because it breaks the integer keys of `answeredQuestions`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRepr {
    domain: String,
    topic: String,
    repository: String,
    question_range: QuestionRange,
    current_question_index: usize,
    #[serde(default)]
    answered_questions: BTreeMap<usize, AnsweredQuestion>,
    last_updated: DateTime<Utc>,
}

impl TryFrom<ProgressRepr> for PracticeProgress {
    type Error = CatalogError;

    fn try_from(repr: ProgressRepr) -> Result<Self, Self::Error> {
        Ok(Self {
            repository: RepositoryRef::new(repr.domain, repr.topic, repr.repository)?,
            question_range: repr.question_range,
            current_question_index: repr.current_question_index,
            answered_questions: repr.answered_questions,
            last_updated: repr.last_updated,
        })
    }
}

impl From<PracticeProgress> for ProgressRepr {
    fn from(p: PracticeProgress) -> Self {
        Self {
            domain: p.repository.domain().to_owned(),
            topic: p.repository.topic().to_owned(),
            repository: p.repository.repository().to_owned(),
            question_range: p.question_range,
            current_question_index: p.current_question_index,
            answered_questions: p.answered_questions,
            last_updated: p.last_updated,
        }
    }
}

impl PracticeProgress {
    #[must_use]
    pub fn new(repository: RepositoryRef, question_range: QuestionRange, now: DateTime<Utc>) -> Self {
        Self {
            repository,
            question_range,
            current_question_index: 0,
            answered_questions: BTreeMap::new(),
            last_updated: now,
        }
    }

    /// Records (or replaces) the answer for a question.
    pub fn record_answer(
        &mut self,
        question_index: usize,
        user_answer: UserAnswer,
        is_correct: bool,
        now: DateTime<Utc>,
    ) {
        self.answered_questions.insert(
            question_index,
            AnsweredQuestion {
                user_answer,
                is_correct,
                timestamp: now,
            },
        );
    }

    #[must_use]
    pub fn stats(&self) -> PracticeStats {
        let total = self.answered_questions.len();
        let correct = self
            .answered_questions
            .values()
            .filter(|a| a.is_correct)
            .count();
        PracticeStats::from_counts(total, correct)
    }
}

/// Aggregate accuracy of a practice run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PracticeStats {
    pub total_answered: usize,
    pub correct_answers: usize,
    pub incorrect_answers: usize,
    /// Percentage rounded to two decimals; 0 when nothing was answered.
    pub accuracy: f64,
}

impl PracticeStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(total_answered: usize, correct_answers: usize) -> Self {
        let accuracy = if total_answered == 0 {
            0.0
        } else {
            let raw = correct_answers as f64 / total_answered as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };
        Self {
            total_answered,
            correct_answers,
            incorrect_answers: total_answered.saturating_sub(correct_answers),
            accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn progress() -> PracticeProgress {
        PracticeProgress::new(
            RepositoryRef::new("Math", "Algebra", "Basics").unwrap(),
            QuestionRange::new(1, 10).unwrap(),
            fixed_now(),
        )
    }

    #[test]
    fn empty_progress_has_zero_accuracy() {
        let stats = progress().stats();
        assert_eq!(stats.total_answered, 0);
        assert!(stats.accuracy.abs() < f64::EPSILON);
    }

    #[test]
    fn accuracy_rounds_to_two_decimals() {
        let mut p = progress();
        p.record_answer(0, UserAnswer::Choices(vec![1]), true, fixed_now());
        p.record_answer(1, UserAnswer::Choices(vec![2]), false, fixed_now());
        p.record_answer(2, UserAnswer::Text("x".into()), false, fixed_now());
        let stats = p.stats();
        assert_eq!(stats.correct_answers, 1);
        assert_eq!(stats.incorrect_answers, 2);
        assert!((stats.accuracy - 33.33).abs() < 1e-9);
    }

    #[test]
    fn re_answering_replaces_entry() {
        let mut p = progress();
        p.record_answer(4, UserAnswer::Choices(vec![1]), false, fixed_now());
        p.record_answer(4, UserAnswer::Choices(vec![2]), true, fixed_now());
        assert_eq!(p.answered_questions.len(), 1);
        assert_eq!(p.stats().correct_answers, 1);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let mut p = progress();
        p.record_answer(3, UserAnswer::Text("four".into()), true, fixed_now());
        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(value["domain"], "Math");
        assert_eq!(value["currentQuestionIndex"], 0);
        assert_eq!(value["answeredQuestions"]["3"]["isCorrect"], true);
        assert_eq!(value["answeredQuestions"]["3"]["userAnswer"], "four");

        let back: PracticeProgress = serde_json::from_value(value).unwrap();
        assert_eq!(back, p);
    }
}
