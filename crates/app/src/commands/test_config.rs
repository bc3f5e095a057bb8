//! The `testmate config` commands: saved test configurations and their attempts.

use anyhow::{Result, bail};
use comfy_table::{Cell, Table};
use testmate_core::model::{ConfigId, RepositoryRef};

use super::Runtime;

pub async fn create(
    rt: &Runtime,
    repository: RepositoryRef,
    name: Option<String>,
    start: u32,
    end: Option<u32>,
) -> Result<()> {
    let config = rt
        .services
        .test_configs()
        .create(&repository, name, start, end.unwrap_or(u32::MAX), &rt.profile)
        .await?;
    let id = config
        .config_id
        .map_or_else(|| "?".to_owned(), |id| id.to_string());
    println!(
        "Created configuration {id}: {} (questions {}, {} total)",
        config.test_name,
        config.question_range,
        config.question_count()
    );
    Ok(())
}

pub async fn list(rt: &Runtime, repository: RepositoryRef) -> Result<()> {
    let configs = rt
        .services
        .test_configs()
        .list(&repository, &rt.profile)
        .await?;
    if configs.is_empty() {
        println!("No saved configurations for {repository}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Questions", "Created"]);
    for config in &configs {
        table.add_row(vec![
            Cell::new(
                config
                    .config_id
                    .map_or_else(String::new, |id| id.to_string()),
            ),
            Cell::new(&config.test_name),
            Cell::new(config.question_range),
            Cell::new(config.created_on.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn delete(rt: &Runtime, id: ConfigId) -> Result<()> {
    rt.services.test_configs().delete(id).await?;
    println!("Deleted configuration {id} and its attempts.");
    Ok(())
}

pub async fn attempts(rt: &Runtime, id: ConfigId) -> Result<()> {
    let configs = rt.services.test_configs();
    let Some(config) = configs.get(id).await? else {
        bail!("no configuration with id {id}");
    };
    let attempts = configs.attempts(id).await?;

    println!("{} ({})", config.test_name, config.repository);
    if attempts.is_empty() {
        println!("No attempts yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Type", "Score", "Questions", "Time", "Date"]);
    for attempt in &attempts {
        table.add_row(vec![
            Cell::new(attempt.attempt_number),
            Cell::new(attempt.attempt_type.label()),
            Cell::new(format!("{}%", attempt.score)),
            Cell::new(attempt.total_questions),
            Cell::new(attempt.time_taken.as_deref().unwrap_or("-")),
            Cell::new(attempt.created_on.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");
    Ok(())
}
