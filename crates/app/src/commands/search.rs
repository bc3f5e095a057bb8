//! The `testmate search` command.

use anyhow::Result;
use comfy_table::{Cell, Table};
use testmate_core::model::RepositoryRef;

use super::Runtime;

pub async fn execute(rt: &Runtime, repository: RepositoryRef, query: String) -> Result<()> {
    let hits = rt.services.catalog().search(&repository, &query).await?;
    if hits.is_empty() {
        println!("No questions in {repository} match {query:?}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Question"]);
    for hit in &hits {
        table.add_row(vec![Cell::new(hit.index + 1), Cell::new(&hit.question.question)]);
    }

    println!("{table}");
    println!("{} match(es)", hits.len());
    Ok(())
}
