use serde::{Deserialize, Serialize};

/// What the user submitted for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserAnswer {
    /// 1-based option numbers, in selection order.
    Choices(Vec<u32>),
    Text(String),
}

impl UserAnswer {
    #[must_use]
    pub fn as_choices(&self) -> Option<&[u32]> {
        match self {
            UserAnswer::Choices(c) => Some(c),
            UserAnswer::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            UserAnswer::Text(t) => Some(t),
            UserAnswer::Choices(_) => None,
        }
    }
}

/// Display status of one question in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionStatus {
    Unanswered,
    Correct,
    /// Answered wrong in an earlier run and not resubmitted yet.
    IncorrectPreviousAttempt,
    Incorrect,
}

impl QuestionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStatus::Unanswered => "unanswered",
            QuestionStatus::Correct => "correct",
            QuestionStatus::IncorrectPreviousAttempt => "incorrectPreviousAttempt",
            QuestionStatus::Incorrect => "incorrect",
        }
    }
}

/// Record of the user's answer to one question of a session.
///
/// `question_index` is the position of the question in the session's
/// display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAttempt {
    pub question_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered: Option<UserAnswer>,
    pub correct: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, rename = "incorrectPreviousAttempt")]
    pub incorrect_previous_attempt: bool,
}

impl QuestionAttempt {
    /// A not-yet-answered attempt.
    #[must_use]
    pub fn unanswered(question_index: usize) -> Self {
        Self {
            question_index,
            answered: None,
            correct: false,
            skipped: true,
            incorrect_previous_attempt: false,
        }
    }

    /// Answered and wrong.
    #[must_use]
    pub fn is_incorrect(&self) -> bool {
        !self.correct && !self.skipped
    }

    #[must_use]
    pub fn status(&self) -> QuestionStatus {
        if self.skipped {
            QuestionStatus::Unanswered
        } else if self.correct {
            QuestionStatus::Correct
        } else if self.incorrect_previous_attempt {
            QuestionStatus::IncorrectPreviousAttempt
        } else {
            QuestionStatus::Incorrect
        }
    }
}
