use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

//
// ─── QUESTION KIND ─────────────────────────────────────────────────────────────
//

/// How a question expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Exactly one option is correct.
    Single,
    /// Several options must be selected together.
    Multiple,
    /// Free text, matched against `answerText`, `answerRegex` or a string key.
    Text,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::Multiple => "multiple",
            QuestionKind::Text => "text",
        }
    }
}

//
// ─── ANSWER KEY ────────────────────────────────────────────────────────────────
//

/// Stored answer key. Option numbers are 1-based.
///
/// JSON accepts a bare number (`4`), an array (`[1, 3]`) or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerKey {
    Index(u32),
    Indices(Vec<u32>),
    Text(String),
}

impl AnswerKey {
    /// Returns true when option number `number` (1-based) is part of the key.
    #[must_use]
    pub fn contains_option(&self, number: u32) -> bool {
        match self {
            AnswerKey::Index(n) => *n == number,
            AnswerKey::Indices(ns) => ns.contains(&number),
            AnswerKey::Text(_) => false,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One quiz item as stored in a repository file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_image: Option<Vec<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerKey>,
    #[serde(default, rename = "answerText", skip_serializing_if = "Option::is_none")]
    pub answer_text: Option<String>,
    #[serde(default, rename = "answerRegex", skip_serializing_if = "Option::is_none")]
    pub answer_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<QuestionKind>,
}

impl Question {
    /// A free-text question with an exact expected answer.
    #[must_use]
    pub fn text(question: impl Into<String>, answer_text: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            question_image: None,
            options: None,
            options_image: None,
            answer: None,
            answer_text: Some(answer_text.into()),
            answer_regex: None,
            explanation: None,
            kind: Some(QuestionKind::Text),
        }
    }

    /// An option-based question; `answer` holds 1-based option numbers.
    #[must_use]
    pub fn choice(question: impl Into<String>, options: Vec<String>, answer: AnswerKey) -> Self {
        Self {
            question: question.into(),
            question_image: None,
            options: Some(options),
            options_image: None,
            answer: Some(answer),
            answer_text: None,
            answer_regex: None,
            explanation: None,
            kind: None,
        }
    }

    #[must_use]
    pub fn with_regex(mut self, pattern: impl Into<String>) -> Self {
        self.answer_regex = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Options offered to the user; empty for free-text questions.
    #[must_use]
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }

    /// True when the question is answered by picking options.
    #[must_use]
    pub fn has_options(&self) -> bool {
        !self.options().is_empty()
    }

    /// True when answers are option numbers: an option kind with options
    /// to pick from. Everything else is answered with text, so an option
    /// question without options still grades (as incorrect) on submit.
    #[must_use]
    pub fn takes_choices(&self) -> bool {
        self.kind() != QuestionKind::Text && self.has_options()
    }

    /// Resolves the question kind, inferring it from the shape of the
    /// record when `type` is missing.
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        if let Some(kind) = self.kind {
            return kind;
        }

        let has_text_key = self.answer_text.is_some() || self.answer_regex.is_some();
        if has_text_key && self.options.is_none() {
            return QuestionKind::Text;
        }

        if self.has_options() {
            return match &self.answer {
                Some(AnswerKey::Indices(ns)) if ns.len() > 1 => QuestionKind::Multiple,
                _ => QuestionKind::Single,
            };
        }

        match &self.answer {
            Some(AnswerKey::Text(_)) => QuestionKind::Text,
            Some(AnswerKey::Indices(ns)) if ns.len() > 1 => QuestionKind::Multiple,
            _ => QuestionKind::Single,
        }
    }

    /// Whether option `index` (0-based, display order) is part of the answer key.
    #[must_use]
    pub fn is_correct_option(&self, index: usize) -> bool {
        let Ok(number) = u32::try_from(index + 1) else {
            return false;
        };
        self.answer
            .as_ref()
            .is_some_and(|key| key.contains_option(number))
    }

    /// Human-readable answer for feedback display.
    #[must_use]
    pub fn expected_answer(&self) -> String {
        match (&self.answer, &self.answer_text) {
            (_, Some(text)) if !self.has_options() => text.clone(),
            (Some(AnswerKey::Text(text)), _) => text.clone(),
            (Some(AnswerKey::Index(n)), _) => n.to_string(),
            (Some(AnswerKey::Indices(ns)), _) => ns
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            (None, Some(text)) => text.clone(),
            (None, None) => self
                .answer_regex
                .as_ref()
                .map(|re| format!("/{re}/"))
                .unwrap_or_default(),
        }
    }

    /// Plain text rendering: the prompt followed by numbered options.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut text = self.question.clone();
        if let Some(options) = &self.options {
            text.push_str("\n\nOptions:\n");
            for (idx, opt) in options.iter().enumerate() {
                // Writing into a String cannot fail.
                let _ = writeln!(text, "{}. {opt}", idx + 1);
            }
        }
        text
    }

    /// Case-insensitive substring match over the searchable fields.
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        let hit = |s: &str| s.to_lowercase().contains(needle);
        hit(&self.question)
            || self.options().iter().any(|o| hit(o))
            || self.explanation.as_deref().is_some_and(hit)
            || self.answer_text.as_deref().is_some_and(hit)
            || matches!(&self.answer, Some(AnswerKey::Text(t)) if hit(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("opt {i}")).collect()
    }

    #[test]
    fn explicit_type_wins() {
        let mut q = Question::choice("q", opts(3), AnswerKey::Indices(vec![1, 2]));
        q.kind = Some(QuestionKind::Single);
        assert_eq!(q.kind(), QuestionKind::Single);
    }

    #[test]
    fn infers_text_from_answer_text_without_options() {
        let mut q = Question::text("capital of France?", "Paris");
        q.kind = None;
        assert_eq!(q.kind(), QuestionKind::Text);
    }

    #[test]
    fn infers_choice_kinds_from_options() {
        let single = Question::choice("q", opts(4), AnswerKey::Index(2));
        assert_eq!(single.kind(), QuestionKind::Single);

        let single_array = Question::choice("q", opts(4), AnswerKey::Indices(vec![2]));
        assert_eq!(single_array.kind(), QuestionKind::Single);

        let multiple = Question::choice("q", opts(4), AnswerKey::Indices(vec![1, 4]));
        assert_eq!(multiple.kind(), QuestionKind::Multiple);
    }

    #[test]
    fn infers_from_answer_shape_without_options() {
        let mut q = Question::choice("q", Vec::new(), AnswerKey::Text("x".into()));
        q.options = None;
        assert_eq!(q.kind(), QuestionKind::Text);

        q.answer = Some(AnswerKey::Indices(vec![1, 2]));
        assert_eq!(q.kind(), QuestionKind::Multiple);

        q.answer = None;
        assert_eq!(q.kind(), QuestionKind::Single);
    }

    #[test]
    fn correct_option_lookup_is_one_based() {
        let q = Question::choice("q", opts(4), AnswerKey::Indices(vec![1, 3]));
        assert!(q.is_correct_option(0));
        assert!(!q.is_correct_option(1));
        assert!(q.is_correct_option(2));

        let q = Question::choice("q", opts(4), AnswerKey::Index(4));
        assert!(q.is_correct_option(3));
        assert!(!q.is_correct_option(0));
    }

    #[test]
    fn parses_original_json_shape() {
        let json = r#"[
            {"question": "2+2?", "options": ["3", "4"], "answer": 2},
            {"question": "primes", "options": ["2", "4", "5"], "answer": [1, 3], "type": "multiple"},
            {"question": "Capital?", "answer": "Paris", "answerRegex": "^paris$", "explanation": "geo"}
        ]"#;
        let qs: Vec<Question> = serde_json::from_str(json).unwrap();
        assert_eq!(qs[0].answer, Some(AnswerKey::Index(2)));
        assert_eq!(qs[1].kind(), QuestionKind::Multiple);
        assert_eq!(qs[2].kind(), QuestionKind::Text);
        assert_eq!(qs[2].answer_regex.as_deref(), Some("^paris$"));
    }

    #[test]
    fn plain_text_numbers_options() {
        let q = Question::choice("Pick", vec!["a".into(), "b".into()], AnswerKey::Index(1));
        assert_eq!(q.plain_text(), "Pick\n\nOptions:\n1. a\n2. b\n");
        assert_eq!(Question::text("Say hi", "hi").plain_text(), "Say hi");
    }

    #[test]
    fn search_covers_options_and_explanation() {
        let q = Question::choice("Pick", vec!["Ferris".into()], AnswerKey::Index(1))
            .with_explanation("The Crab");
        assert!(q.matches_lowercase("ferris"));
        assert!(q.matches_lowercase("crab"));
        assert!(!q.matches_lowercase("gopher"));
    }

    #[test]
    fn choices_need_an_option_kind_and_options() {
        let choice = Question::choice("Pick", vec!["a".into()], AnswerKey::Index(1));
        assert!(choice.takes_choices());

        let typed_text = Question {
            kind: Some(QuestionKind::Text),
            options: Some(vec!["a".into(), "b".into()]),
            ..Question::text("Type the letter", "b")
        };
        assert!(!typed_text.takes_choices());

        let bare_single = Question {
            kind: Some(QuestionKind::Single),
            answer: Some(AnswerKey::Index(1)),
            ..Question::text("No options", "x")
        };
        assert!(!bare_single.takes_choices());
    }
}
