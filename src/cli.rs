use crate::store::AnalysisStatus;
use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gitdash")]
#[command(about = "Git history analytics: time buckets, churn, commit message quality and developer stats")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Directory for analyses and the repository index")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true, action = ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze one repository and store the result
    Analyze {
        #[arg(help = "Path to a local repository")]
        path: Option<PathBuf>,

        #[arg(long, conflicts_with = "path", help = "Clone (or update) this remote first")]
        url: Option<String>,

        #[arg(long, help = "Branch to analyze (defaults to the checked-out branch)")]
        branch: Option<String>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Per-file line churn over a recent window
    Churn {
        #[arg(help = "Path to a local repository")]
        path: Option<PathBuf>,

        #[arg(long, help = "Window start understood by git, e.g. \"2 weeks ago\"")]
        since: Option<String>,

        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    /// Developer statistics across every stored analysis
    Developers {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    /// Check a commit message against the message rules
    Lint {
        #[arg(help = "Message text (reads stdin when omitted)")]
        message: Option<String>,

        #[arg(long, conflicts_with = "message", help = "Read the message from a file")]
        file: Option<PathBuf>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Find and analyze every repository under a folder
    Scan {
        #[arg(help = "Folder to scan (defaults to the current directory)")]
        root: Option<PathBuf>,

        #[arg(long, help = "Maximum folder depth to search")]
        depth: Option<usize>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// List repositories in the index
    Repos {
        #[arg(long, value_enum, help = "Only show repositories with this status")]
        status: Option<AnalysisStatus>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Analyze { path, url, branch, json } => {
                crate::analysis::exec(self.common, path, url, branch, json)
            }
            Commands::Churn { path, since, json, ndjson } => {
                crate::churn::exec(self.common, path, since, json, ndjson)
            }
            Commands::Developers { json, ndjson } => crate::developers::exec(self.common, json, ndjson),
            Commands::Lint { message, file, json } => crate::lint::exec(message, file, json),
            Commands::Scan { root, depth, json } => crate::scan::exec(self.common, root, depth, json),
            Commands::Repos { status, json } => crate::repos::exec(self.common, status, json),
        }
    }
}
