//! The `testmate seed` command: writes a small sample bank.

use anyhow::Result;
use storage::bank::QuestionBank;
use testmate_core::model::{AnswerKey, Question, RepositoryRef};

use super::Runtime;

pub async fn execute(rt: &Runtime) -> Result<()> {
    for (repository, questions) in sample_bank()? {
        if rt.bank.exists(&repository).await? {
            println!("{repository} already exists, skipping.");
            continue;
        }
        rt.bank.save(&repository, &questions).await?;
        println!("Created {repository} ({} questions)", questions.len());
    }

    println!("\nNext steps:");
    println!("  testmate structure");
    println!("  testmate take \"Math/Arithmetic/Basics\"");
    Ok(())
}

fn options(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn sample_bank() -> Result<Vec<(RepositoryRef, Vec<Question>)>> {
    Ok(vec![
        (
            RepositoryRef::new("Math", "Arithmetic", "Basics")?,
            vec![
                Question::choice("What is 2 + 2?", options(&["3", "4", "5"]), AnswerKey::Index(2)),
                Question::choice(
                    "Which numbers are even?",
                    options(&["2", "3", "4", "7"]),
                    AnswerKey::Indices(vec![1, 3]),
                ),
                Question::text("What is 10 - 3?", "7"),
                Question::text("Write twelve in digits.", "12")
                    .with_regex(r"^\s*12(\.0+)?\s*$")
                    .with_explanation("Twelve is 12; 12.0 is accepted too."),
            ],
        ),
        (
            RepositoryRef::new("Geography", "Europe", "Capitals")?,
            vec![
                Question::choice(
                    "What is the capital of Spain?",
                    options(&["Madrid", "Lisbon", "Rome"]),
                    AnswerKey::Index(1),
                ),
                Question::text("What is the capital of France?", "Paris")
                    .with_explanation("Paris has been the capital since 987."),
                Question::text("What is the capital of Italy?", "Rome"),
            ],
        ),
    ])
}
