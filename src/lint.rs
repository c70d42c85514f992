use crate::classifier::{analyze, CommitMessageAnalysis, Severity};
use anyhow::Context;
use console::style;
use std::io::Read;
use std::path::PathBuf;

/// Where a message to lint comes from. Falls back to stdin when neither the
/// message nor a file is given, which lets the command run as a
/// `commit-msg` hook.
pub fn read_message(message: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    if let Some(m) = message {
        return Ok(m);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read message from stdin")?;
    Ok(buf)
}

/// Drop the `#` comment lines git leaves in a message being edited.
pub fn strip_comments(message: &str) -> String {
    message
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn exec(message: Option<String>, file: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let raw = read_message(message, file)?;
    let analysis = analyze("", "", "", &strip_comments(&raw));

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        output_report(&analysis);
    }

    if !analysis.passed {
        anyhow::bail!("commit message failed lint with score {}", analysis.score);
    }
    Ok(())
}

fn output_report(analysis: &CommitMessageAnalysis) {
    let verdict = if analysis.passed {
        style("PASS").green().bold()
    } else {
        style("FAIL").red().bold()
    };
    println!("{} {}/100  {}", verdict, analysis.score, style(&analysis.subject).dim());

    for issue in &analysis.issues {
        let tag = match issue.severity {
            Severity::Error => style("error").red(),
            Severity::Warning => style("warning").yellow(),
            Severity::Info => style("info").cyan(),
        };
        println!("  {:<8} {:<24} {}", tag, issue.rule.as_str(), issue.message);
    }
}
