//! Answer checking for the three question kinds.

use regex::RegexBuilder;
use tracing::warn;

use crate::model::{AnswerKey, Question, QuestionKind, UserAnswer};

/// Returns whether `answer` is a correct response to `question`.
///
/// Text answers are compared trimmed and case-insensitively. An
/// `answerRegex` that compiles takes precedence; one that does not is logged
/// and checking falls back to `answerText`, then to a string answer key.
///
/// Single-choice questions compare the first selected option against the
/// key. Multiple-choice questions need exactly the keyed set of options.
#[must_use]
pub fn check_answer(question: &Question, answer: &UserAnswer) -> bool {
    match question.kind() {
        QuestionKind::Text => check_text(question, answer),
        QuestionKind::Single => check_single(question, answer),
        QuestionKind::Multiple => check_multiple(question, answer),
    }
}

fn check_text(question: &Question, answer: &UserAnswer) -> bool {
    let Some(text) = answer.as_text() else {
        return false;
    };
    let given = text.trim().to_lowercase();

    if let Some(pattern) = &question.answer_regex {
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => return re.is_match(&given),
            Err(err) => warn!(pattern = %pattern, error = %err, "invalid answer regex"),
        }
    }

    if let Some(expected) = &question.answer_text {
        return given == expected.trim().to_lowercase();
    }

    match &question.answer {
        Some(AnswerKey::Text(expected)) => given == expected.trim().to_lowercase(),
        _ => false,
    }
}

fn check_single(question: &Question, answer: &UserAnswer) -> bool {
    let expected = match &question.answer {
        Some(AnswerKey::Index(n)) => Some(*n),
        Some(AnswerKey::Indices(ns)) => ns.first().copied(),
        Some(AnswerKey::Text(_)) | None => None,
    };
    let chosen = answer.as_choices().and_then(|c| c.first().copied());

    matches!((expected, chosen), (Some(e), Some(c)) if e == c)
}

fn check_multiple(question: &Question, answer: &UserAnswer) -> bool {
    let Some(AnswerKey::Indices(expected)) = &question.answer else {
        return false;
    };
    let Some(chosen) = answer.as_choices() else {
        return false;
    };
    if expected.len() != chosen.len() {
        return false;
    }

    let mut expected = expected.clone();
    let mut chosen = chosen.to_vec();
    expected.sort_unstable();
    chosen.sort_unstable();
    expected == chosen
}
