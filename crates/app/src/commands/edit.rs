//! Bank editing: `testmate delete-question` and `testmate move-questions`.

use anyhow::Result;
use testmate_core::model::RepositoryRef;

use super::{Runtime, question_index};

pub async fn delete_question(rt: &Runtime, repository: RepositoryRef, number: usize) -> Result<()> {
    let index = question_index(number)?;
    let removed = rt
        .services
        .catalog()
        .delete_question(&repository, index)
        .await?;
    println!("Deleted question {number} from {repository}: {}", removed.question);
    Ok(())
}

pub async fn move_questions(
    rt: &Runtime,
    repository: RepositoryRef,
    target: String,
    numbers: Vec<usize>,
) -> Result<()> {
    let indices = numbers
        .into_iter()
        .map(question_index)
        .collect::<Result<Vec<_>>>()?;
    let moved = rt
        .services
        .catalog()
        .move_questions(&repository, &indices, &target)
        .await?;
    println!("Moved {moved} question(s) from {repository} to {target}.");
    Ok(())
}
