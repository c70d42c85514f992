use crate::cli::CommonArgs;
use crate::config::Config;
use crate::store::{AnalysisStatus, IndexEntry, RepositoryIndex, SqliteIndex};
use anyhow::Context;
use console::style;

pub fn exec(common: CommonArgs, status: Option<AnalysisStatus>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(&common).context("Failed to load configuration")?;
    let index = SqliteIndex::open(config.index_path()).context("Failed to open repository index")?;

    let entries = match status {
        Some(s) => index.list_by_status(s),
        None => index.list_all(),
    }
    .context("Failed to read repository index")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        output_table(&entries);
    }
    Ok(())
}

fn output_table(entries: &[IndexEntry]) {
    if entries.is_empty() {
        println!("No repositories indexed");
        return;
    }

    println!(
        "{:<24} {:<10} {:<16} {:<20} {}",
        style("Name").bold(),
        style("Status").bold(),
        style("Branch").bold(),
        style("Last analyzed").bold(),
        style("Path").bold()
    );
    for e in entries {
        let status = match e.status {
            AnalysisStatus::Completed => style(e.status.as_str()).green(),
            AnalysisStatus::Failed => style(e.status.as_str()).red(),
            _ => style(e.status.as_str()).yellow(),
        };
        let analyzed = e
            .last_analyzed
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<10} {:<16} {:<20} {}",
            crate::util::truncate(&e.repo_name, 24),
            status,
            crate::util::truncate(e.branch.as_deref().unwrap_or("-"), 16),
            analyzed,
            e.repo_path
        );
        if let Some(err) = &e.error {
            println!("    {}", style(err).red().dim());
        }
    }
}
