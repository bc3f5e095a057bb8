//! The `testmate results` command.

use anyhow::{Result, bail};
use comfy_table::{Cell, Table};
use testmate_core::model::{TestId, TestInstance};

use super::Runtime;

pub async fn execute(rt: &Runtime, id: Option<TestId>) -> Result<()> {
    let results = rt.services.results();
    match id {
        Some(id) => {
            let Some(instance) = results.get(&id).await? else {
                bail!("no test result with id {id}");
            };
            print_detail(&instance);
        }
        None => {
            let listed = results.list(&rt.profile).await?;
            if listed.is_empty() {
                println!("No saved results for profile {}.", rt.profile);
                return Ok(());
            }
            print_list(&listed);
        }
    }
    Ok(())
}

fn print_list(results: &[TestInstance]) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Repository", "Score", "Questions", "Date"]);
    for result in results {
        table.add_row(vec![
            Cell::new(&result.test_id),
            Cell::new(&result.test_name),
            Cell::new(&result.repository),
            Cell::new(format!("{}%", result.score)),
            Cell::new(result.total_questions),
            Cell::new(result.created_on.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");
}

fn print_detail(result: &TestInstance) {
    println!("{} ({})", result.test_name, result.repository);
    println!("Score: {}% of {} questions", result.score, result.total_questions);
    if let Some(range) = result.question_range {
        println!("Range: {range}");
    }
    if let Some(parent) = &result.parent_test {
        let kind = result.retest_type.map_or("retest", |r| r.as_str());
        println!("Retest ({kind}) of {parent}");
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Status"]);
    for attempt in &result.questions_attempted {
        table.add_row(vec![
            Cell::new(attempt.question_index + 1),
            Cell::new(attempt.status().as_str()),
        ]);
    }
    println!("{table}");
}
