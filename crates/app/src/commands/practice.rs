//! The `testmate practice` commands.

use anyhow::Result;
use comfy_table::{Cell, Table};
use testmate_core::model::RepositoryRef;

use super::Runtime;

pub async fn stats(rt: &Runtime, repository: RepositoryRef) -> Result<()> {
    let Some(stats) = rt.services.practice().stats(&repository).await? else {
        println!("No practice progress for {repository}.");
        return Ok(());
    };
    println!("{repository}");
    println!("Answered:  {}", stats.total_answered);
    println!("Correct:   {}", stats.correct_answers);
    println!("Incorrect: {}", stats.incorrect_answers);
    println!("Accuracy:  {:.2}%", stats.accuracy);
    Ok(())
}

pub async fn clear(rt: &Runtime, repository: RepositoryRef) -> Result<()> {
    let practice = rt.services.practice();
    let cleared = practice.clear(&repository).await?;
    let snapshot = rt
        .services
        .test_loop()
        .clear_snapshot(&rt.profile, &repository)
        .await?;
    if cleared || snapshot {
        println!("Cleared practice progress for {repository}.");
    } else {
        println!("No practice progress for {repository}.");
    }
    Ok(())
}

pub async fn list(rt: &Runtime) -> Result<()> {
    let sessions = rt.services.practice().list_all().await?;
    if sessions.is_empty() {
        println!("No practice sessions yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Repository", "Range", "Answered", "Accuracy", "Updated"]);
    for progress in &sessions {
        let stats = progress.stats();
        table.add_row(vec![
            Cell::new(&progress.repository),
            Cell::new(progress.question_range),
            Cell::new(stats.total_answered),
            Cell::new(format!("{:.2}%", stats.accuracy)),
            Cell::new(progress.last_updated.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");
    Ok(())
}
