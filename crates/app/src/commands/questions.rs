//! The `testmate questions` command.

use anyhow::Result;
use comfy_table::{Cell, Table};
use testmate_core::model::RepositoryRef;

use super::Runtime;

pub async fn execute(rt: &Runtime, repository: RepositoryRef, answers: bool) -> Result<()> {
    let questions = rt.services.catalog().questions(&repository).await?;
    if questions.is_empty() {
        println!("{repository} has no questions.");
        return Ok(());
    }

    let mut table = Table::new();
    let mut header = vec!["#", "Type", "Question"];
    if answers {
        header.push("Answer");
    }
    table.set_header(header);

    for (idx, question) in questions.iter().enumerate() {
        let mut row = vec![
            Cell::new(idx + 1),
            Cell::new(question.kind().as_str()),
            Cell::new(question.plain_text().trim_end()),
        ];
        if answers {
            row.push(Cell::new(question.expected_answer()));
        }
        table.add_row(row);
    }

    println!("{repository}");
    println!("{table}");
    Ok(())
}
