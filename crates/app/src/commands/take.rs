//! The `testmate take` command: an interactive session over stdin/stdout.
//!
//! Each line is either an answer or a command. Option numbers (`2`, `1,3`)
//! answer option questions, anything else answers text questions. Commands
//! start with a colon; `:h` lists them. End of input finishes the session.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Table};
use services::{
    SavedResult, SessionContext, SessionError, SessionMode, SessionRequest, TestLoopService,
    TestSession,
};
use testmate_core::model::{ConfigId, QuestionKind, QuestionRange, RepositoryRef, RetestType};

use super::Runtime;

const HELP: &str = "\
Answer with option numbers (1 or 1,3) or by typing text.
  :n       next question
  :p       previous question
  :g N     go to question N
  :r       reveal the answer
  :c / :x  mark the current question correct / incorrect
  :s       show progress
  :f       finish the session
  :q       quit without finishing
  :h       this help";

/// How a session is started.
#[derive(Debug, Clone, Default)]
pub struct TakeOptions {
    pub repository: Option<RepositoryRef>,
    pub config: Option<ConfigId>,
    pub practice: bool,
    pub start: Option<u32>,
    pub end: Option<u32>,
    /// `None` keeps the mode default: practice resumes, tests start fresh.
    pub resume: Option<bool>,
}

pub async fn execute(rt: &Runtime, options: TakeOptions) -> Result<()> {
    let loop_svc = rt.services.test_loop();
    let session = start(rt, &loop_svc, options).await?;

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout().lock();
    drive(&loop_svc, session, &mut input, &mut out).await
}

async fn start(
    rt: &Runtime,
    loop_svc: &TestLoopService,
    options: TakeOptions,
) -> Result<TestSession> {
    if let Some(config_id) = options.config {
        return loop_svc
            .start_from_config(config_id)
            .await
            .with_context(|| format!("failed to start configuration {config_id}"));
    }
    let Some(repository) = options.repository else {
        bail!("a repository or --config is required");
    };

    let range = match (options.start, options.end) {
        (None, None) => None,
        (start, end) => Some(QuestionRange::lenient(
            start.unwrap_or(1),
            end.unwrap_or(u32::MAX),
        )),
    };
    let mode = if options.practice {
        SessionMode::Practice
    } else {
        SessionMode::Test
    };
    let context = SessionContext::new(repository.clone(), rt.profile.clone(), mode);
    loop_svc
        .start_session(
            SessionRequest::new(context)
                .with_range(range)
                .with_resume(options.resume),
        )
        .await
        .with_context(|| format!("failed to start {repository}"))
}

/// Runs a session, and any retakes the user asks for, until input ends.
///
/// # Errors
///
/// Fails on I/O errors and storage failures. Invalid answers and commands
/// are reported on `out` and do not end the session.
pub async fn drive<R: BufRead, W: Write>(
    loop_svc: &TestLoopService,
    mut session: TestSession,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    loop {
        writeln!(
            out,
            "{} ({} mode, questions {})",
            session.repository(),
            session.mode().as_str(),
            session.range()
        )?;
        if run_session(loop_svc, &mut session, input, out).await? == SessionEnd::Quit {
            writeln!(out, "Session left unfinished.")?;
            return Ok(());
        }

        finish(loop_svc, &mut session, out).await?;

        let Some(retest) = ask_retake(&session, input, out)? else {
            return Ok(());
        };
        session = match loop_svc.retake(&session, retest).await {
            Ok(next) => next,
            Err(SessionError::Empty) => {
                writeln!(out, "Nothing to retake.")?;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Finish,
    Quit,
}

async fn run_session<R: BufRead, W: Write>(
    loop_svc: &TestLoopService,
    session: &mut TestSession,
    input: &mut R,
    out: &mut W,
) -> Result<SessionEnd> {
    render(session, out)?;
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = read_line(input)? else {
            writeln!(out)?;
            return Ok(SessionEnd::Finish);
        };

        match Input::parse(&line, session.current_question().takes_choices()) {
            Input::Blank => {}
            Input::Help => writeln!(out, "{HELP}")?,
            Input::Finish => return Ok(SessionEnd::Finish),
            Input::Quit => return Ok(SessionEnd::Quit),
            Input::Status => show_progress(session, out)?,
            Input::Next => {
                if shown(session.next(), out)?.is_some() {
                    render(session, out)?;
                }
            }
            Input::Previous => {
                if shown(session.previous(), out)?.is_some() {
                    render(session, out)?;
                }
            }
            Input::GoTo(number) => {
                let total = session.total();
                if number == 0 || number > total {
                    writeln!(out, "Question {number} does not exist; pick 1-{total}.")?;
                } else if shown(session.go_to(number - 1), out)?.is_some() {
                    render(session, out)?;
                }
            }
            Input::Reveal => {
                if shown(session.reveal_answer(), out)?.is_some() {
                    feedback(session, None, out)?;
                }
            }
            Input::Mark(correct) => {
                let advance = shown(loop_svc.mark(session, correct).await, out)?;
                if let Some(advance) = advance {
                    feedback(session, Some(correct), out)?;
                    advance_if(session, advance, out)?;
                }
            }
            Input::Choices(numbers) => {
                if !select_choices(session, &numbers, out)? {
                    continue;
                }
                submit(loop_svc, session, out).await?;
            }
            Input::Text(text) => {
                if session.current_question().takes_choices() {
                    writeln!(out, "Answer with option numbers, e.g. 1 or 1,3.")?;
                    continue;
                }
                shown(session.set_text(text), out)?;
                submit(loop_svc, session, out).await?;
            }
            Input::Unknown(raw) => writeln!(out, "Unknown command {raw:?}; :h lists commands.")?,
        }
    }
}

async fn submit<W: Write>(
    loop_svc: &TestLoopService,
    session: &mut TestSession,
    out: &mut W,
) -> Result<()> {
    if let Some(advance) = shown(loop_svc.submit(session).await, out)? {
        let correct = session.view().correct;
        feedback(session, Some(correct), out)?;
        advance_if(session, advance, out)?;
    }
    Ok(())
}

fn advance_if<W: Write>(session: &mut TestSession, advance: bool, out: &mut W) -> Result<()> {
    if advance {
        session.next()?;
        render(session, out)?;
    } else if session.is_last() {
        writeln!(out, "Last question. :f finishes the session.")?;
    }
    Ok(())
}

/// Applies `numbers` (1-based) as the current selection. Returns false and
/// explains why when the selection is not usable.
fn select_choices<W: Write>(
    session: &mut TestSession,
    numbers: &[usize],
    out: &mut W,
) -> Result<bool> {
    let count = session.current_question().options().len();
    if let Some(bad) = numbers.iter().find(|&&n| n == 0 || n > count) {
        writeln!(out, "Option {bad} does not exist; pick 1-{count}.")?;
        return Ok(false);
    }

    let wanted: BTreeSet<usize> = numbers.iter().map(|n| n - 1).collect();
    if session.current_question().kind() == QuestionKind::Multiple {
        for idx in 0..count {
            if session.view().selected[idx] != wanted.contains(&idx)
                && shown(session.select_option(idx), out)?.is_none()
            {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    let mut picked = wanted.into_iter();
    match (picked.next(), picked.next()) {
        (Some(idx), None) => Ok(shown(session.select_option(idx), out)?.is_some()),
        _ => {
            writeln!(out, "This question takes exactly one option.")?;
            Ok(false)
        }
    }
}

async fn finish<W: Write>(
    loop_svc: &TestLoopService,
    session: &mut TestSession,
    out: &mut W,
) -> Result<()> {
    if let Err(err) = loop_svc.finish(session).await {
        if !session.is_complete() {
            return Err(err.into());
        }
        writeln!(out, "Could not save the result ({err}); retrying.")?;
        loop_svc.persist_result(session).await?;
    }
    let outcome = session
        .outcome()
        .context("finished session has no outcome")?;

    let tally = &outcome.tally;
    writeln!(out)?;
    writeln!(
        out,
        "Score: {}% ({} correct, {} incorrect, {} skipped of {}) in {}",
        outcome.score, tally.correct, tally.incorrect, tally.skipped, tally.total, outcome.time_taken
    )?;
    match session.saved() {
        Some(SavedResult::Attempt {
            number,
            attempt_type,
            ..
        }) => writeln!(out, "Saved attempt #{number} ({}).", attempt_type.label())?,
        Some(SavedResult::Instance(id)) => writeln!(out, "Saved result {id}.")?,
        None => writeln!(out, "Practice progress saved.")?,
    }
    Ok(())
}

fn ask_retake<R: BufRead, W: Write>(
    session: &TestSession,
    input: &mut R,
    out: &mut W,
) -> Result<Option<RetestType>> {
    let Some(outcome) = session.outcome() else {
        return Ok(None);
    };
    let incorrect = outcome.incorrect_indices.len();
    let skipped = outcome.skipped_indices.len();
    if incorrect == 0 && skipped == 0 {
        return Ok(None);
    }

    write!(
        out,
        "Retake? [i] incorrect ({incorrect}), [s] skipped ({skipped}), [a] all, enter to stop: "
    )?;
    out.flush()?;
    let Some(line) = read_line(input)? else {
        writeln!(out)?;
        return Ok(None);
    };
    Ok(match line.to_lowercase().as_str() {
        "i" => Some(RetestType::IncorrectOnly),
        "s" => Some(RetestType::SkippedOnly),
        "a" => Some(RetestType::FullSet),
        _ => None,
    })
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn render<W: Write>(session: &TestSession, out: &mut W) -> Result<()> {
    let index = session.current_index();
    let question = session.current_question();
    let view = session.view();
    let status = session
        .status(index)
        .map_or("unanswered", |s| s.as_str());

    writeln!(out)?;
    writeln!(out, "Question {}/{} [{status}]", index + 1, session.total())?;
    writeln!(out, "{}", question.question)?;

    if question.takes_choices() {
        for (idx, option) in question.options().iter().enumerate() {
            let mark = if view.selected.get(idx).copied().unwrap_or(false) {
                'x'
            } else {
                ' '
            };
            writeln!(out, "  [{mark}] {}. {option}", idx + 1)?;
        }
        if question.kind() == QuestionKind::Multiple {
            writeln!(out, "  (select all that apply)")?;
        }
    } else if !view.text.is_empty() {
        writeln!(out, "  Your answer: {}", view.text)?;
    }

    if view.feedback_visible {
        let verdict = view.submitted.then_some(view.correct);
        feedback(session, verdict, out)?;
    }
    Ok(())
}

fn feedback<W: Write>(session: &TestSession, verdict: Option<bool>, out: &mut W) -> Result<()> {
    let question = session.current_question();
    match verdict {
        Some(true) => writeln!(out, "Correct.")?,
        Some(false) => writeln!(out, "Incorrect.")?,
        None => {}
    }

    let correct_options: Vec<String> = question
        .options()
        .iter()
        .enumerate()
        .filter(|(idx, _)| question.is_correct_option(*idx))
        .map(|(idx, option)| format!("{}. {option}", idx + 1))
        .collect();
    if correct_options.is_empty() {
        writeln!(out, "Answer: {}", question.expected_answer())?;
    } else {
        writeln!(out, "Answer: {}", correct_options.join(", "))?;
    }
    if let Some(explanation) = &question.explanation {
        writeln!(out, "Explanation: {explanation}")?;
    }
    Ok(())
}

fn show_progress<W: Write>(session: &TestSession, out: &mut W) -> Result<()> {
    let progress = session.progress();
    let mut table = Table::new();
    table.set_header(vec!["", "#", "Status"]);
    for idx in 0..session.total() {
        let current = if idx == progress.current { ">" } else { "" };
        let status = session.status(idx).map_or("", |s| s.as_str());
        table.add_row(vec![Cell::new(current), Cell::new(idx + 1), Cell::new(status)]);
    }
    writeln!(out, "{table}")?;
    writeln!(
        out,
        "Answered {}/{}: {} correct, {} incorrect, elapsed {}",
        progress.answered,
        progress.total,
        progress.correct,
        progress.incorrect,
        session.elapsed(chrono::Utc::now())
    )?;
    Ok(())
}

//
// ─── INPUT ─────────────────────────────────────────────────────────────────────
//

/// Reports input mistakes on `out`; storage failures are returned.
fn shown<T, W: Write>(result: Result<T, SessionError>, out: &mut W) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ (SessionError::Storage(_) | SessionError::Practice(_))) => Err(err.into()),
        Err(err) => {
            writeln!(out, "! {err}")?;
            Ok(None)
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Blank,
    Help,
    Next,
    Previous,
    /// 1-based question number.
    GoTo(usize),
    Reveal,
    Mark(bool),
    Status,
    Finish,
    Quit,
    /// 1-based option numbers.
    Choices(Vec<usize>),
    Text(String),
    Unknown(String),
}

impl Input {
    fn parse(line: &str, takes_choices: bool) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Input::Blank;
        }

        if let Some(command) = line.strip_prefix(':') {
            let mut parts = command.split_whitespace();
            return match (parts.next(), parts.next(), parts.next()) {
                (Some("n"), None, _) => Input::Next,
                (Some("p"), None, _) => Input::Previous,
                (Some("g"), Some(n), None) => match n.parse() {
                    Ok(number) => Input::GoTo(number),
                    Err(_) => Input::Unknown(line.to_owned()),
                },
                (Some("r"), None, _) => Input::Reveal,
                (Some("c"), None, _) => Input::Mark(true),
                (Some("x"), None, _) => Input::Mark(false),
                (Some("s"), None, _) => Input::Status,
                (Some("f"), None, _) => Input::Finish,
                (Some("q"), None, _) => Input::Quit,
                (Some("h"), None, _) => Input::Help,
                _ => Input::Unknown(line.to_owned()),
            };
        }

        if takes_choices {
            let numbers: Result<Vec<usize>, _> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|part| !part.is_empty())
                .map(str::parse)
                .collect();
            if let Ok(numbers) = numbers {
                return Input::Choices(numbers);
            }
        }
        Input::Text(line.to_owned())
    }
}
