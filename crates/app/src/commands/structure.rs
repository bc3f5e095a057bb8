//! The `testmate structure` command.

use std::collections::HashMap;

use anyhow::Result;
use comfy_table::{Cell, Table};
use testmate_core::model::RepositoryRef;
use tracing::warn;

use super::Runtime;

pub async fn execute(rt: &Runtime) -> Result<()> {
    let catalog = rt.services.catalog();
    let structure = catalog.structure().await?;

    if structure.is_empty() {
        println!(
            "No repositories under {}. Run `testmate seed` to create sample ones.",
            rt.bank_dir().display()
        );
        return Ok(());
    }

    let statuses: HashMap<String, String> = catalog
        .statuses(&rt.profile)
        .await?
        .into_iter()
        .map(|record| (record.repository.key(), record.status))
        .collect();

    let mut table = Table::new();
    table.set_header(vec!["Domain", "Topic", "Repository", "Questions", "Status"]);

    for domain in structure.domains() {
        for topic in structure.topics(domain) {
            for name in structure.repositories(domain, topic) {
                let repository = RepositoryRef::new(domain, topic, name)?;
                let count = match catalog.questions(&repository).await {
                    Ok(questions) => questions.len().to_string(),
                    Err(err) => {
                        warn!(repository = %repository, error = %err, "unreadable repository");
                        "unreadable".to_owned()
                    }
                };
                let status = statuses.get(&repository.key()).map_or("", String::as_str);
                table.add_row(vec![
                    Cell::new(domain),
                    Cell::new(topic),
                    Cell::new(name),
                    Cell::new(count),
                    Cell::new(status),
                ]);
            }
        }
    }

    println!("{table}");
    println!("{} repositories", structure.repository_count());
    Ok(())
}
