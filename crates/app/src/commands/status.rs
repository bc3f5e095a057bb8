//! The `testmate status` commands: per-profile repository status labels.

use anyhow::Result;
use comfy_table::{Cell, Table};
use testmate_core::model::RepositoryRef;

use super::Runtime;

pub async fn list(rt: &Runtime) -> Result<()> {
    let statuses = rt.services.catalog().statuses(&rt.profile).await?;
    if statuses.is_empty() {
        println!("No repository statuses for profile {}.", rt.profile);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Repository", "Status"]);
    for record in &statuses {
        table.add_row(vec![Cell::new(&record.repository), Cell::new(&record.status)]);
    }
    println!("{table}");
    Ok(())
}

pub async fn set(rt: &Runtime, repository: RepositoryRef, status: String) -> Result<()> {
    rt.services
        .catalog()
        .set_status(&rt.profile, &repository, &status)
        .await?;
    println!("{repository}: {}", status.trim());
    Ok(())
}
