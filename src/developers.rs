//! Per-developer statistics folded from every persisted repository analysis.
//!
//! Everything is recomputed from the artifacts on each call. Developers are
//! identified by `(name, email)`: one person committing under two addresses
//! shows up twice.

use crate::classifier::{self, CommitType, MessageSummary, MessageTally};
use crate::cli::CommonArgs;
use crate::config::Config;
use crate::error::Result;
use crate::model::{CommitRecord, RepoAnalysisResult, SCHEMA_VERSION};
use crate::store::{AnalysisStatus, ArtifactStore, RepositoryIndex, SqliteIndex};
use crate::util::{compile_pattern, days_spanned, percentage, round2, truncate};
use anyhow::Context;
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use console::style;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

pub const RECENT_COMMITS_PER_DEVELOPER: usize = 50;
pub const TOP_VIOLATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBucket {
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
}

impl SizeBucket {
    pub fn from_lines(lines: u64) -> Self {
        match lines {
            0..=10 => SizeBucket::Tiny,
            11..=50 => SizeBucket::Small,
            51..=200 => SizeBucket::Medium,
            201..=400 => SizeBucket::Large,
            _ => SizeBucket::Huge,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeDistribution {
    pub tiny: u64,
    pub small: u64,
    pub medium: u64,
    pub large: u64,
    pub huge: u64,
    pub mean: f64,
    pub median: f64,
}

impl SizeDistribution {
    fn from_sizes(sizes: &[u64]) -> Self {
        let mut dist = SizeDistribution::default();
        for &size in sizes {
            match SizeBucket::from_lines(size) {
                SizeBucket::Tiny => dist.tiny += 1,
                SizeBucket::Small => dist.small += 1,
                SizeBucket::Medium => dist.medium += 1,
                SizeBucket::Large => dist.large += 1,
                SizeBucket::Huge => dist.huge += 1,
            }
        }
        dist.mean = round2(mean(sizes));
        dist.median = round2(median(sizes));
        dist
    }

    pub fn total(&self) -> u64 {
        self.tiny + self.small + self.medium + self.large + self.huge
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}

fn median(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkingPeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl WorkingPeriod {
    pub const ORDER: [WorkingPeriod; 4] = [
        WorkingPeriod::Morning,
        WorkingPeriod::Afternoon,
        WorkingPeriod::Evening,
        WorkingPeriod::Night,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => WorkingPeriod::Morning,
            12..=17 => WorkingPeriod::Afternoon,
            18..=21 => WorkingPeriod::Evening,
            _ => WorkingPeriod::Night,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkingPeriod::Morning => "morning",
            WorkingPeriod::Afternoon => "afternoon",
            WorkingPeriod::Evening => "evening",
            WorkingPeriod::Night => "night",
        }
    }
}

pub fn is_late_night(hour: u32) -> bool {
    hour >= 22 || hour < 6
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

pub fn is_business_hours(hour: u32, day: Weekday) -> bool {
    !is_weekend(day) && (9..17).contains(&hour)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub late_night_commits: u64,
    pub weekend_commits: u64,
    pub business_hours_commits: u64,
    pub late_night_percentage: f64,
    pub weekend_percentage: f64,
    pub business_hours_percentage: f64,
    /// Commits per local hour of day, 0..24.
    pub hourly: Vec<u64>,
    /// Commits per weekday, Monday first.
    pub daily: Vec<u64>,
    pub preferred_period: WorkingPeriod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentCommit {
    pub hash: String,
    pub repository: String,
    pub timestamp: DateTime<FixedOffset>,
    pub subject: String,
    pub insertions: u64,
    pub deletions: u64,
    pub score: u8,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperStats {
    pub name: String,
    pub email: String,
    pub total_commits: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub repositories: Vec<String>,
    pub documentation_commits: u64,
    pub test_commits: u64,
    pub documentation_ratio: f64,
    pub test_ratio: f64,
    pub message_compliance: MessageSummary,
    pub size_distribution: SizeDistribution,
    pub commit_types: BTreeMap<CommitType, u64>,
    pub bug_fix_ratio: f64,
    pub working_hours: WorkingHours,
    pub first_commit: Option<DateTime<FixedOffset>>,
    pub last_commit: Option<DateTime<FixedOffset>>,
    pub total_days_spanned: i64,
    pub average_commits_per_day: f64,
    pub recent_commits: Vec<RecentCommit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    Index,
    DirectoryScan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperReport {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub source: ReportSource,
    pub repositories_analyzed: usize,
    pub developers: Vec<DeveloperStats>,
}

/// Mutable per-developer state while commits are being folded.
struct DevAccum {
    name: String,
    email: String,
    commits: u64,
    added: u64,
    removed: u64,
    repositories: BTreeSet<String>,
    doc_commits: u64,
    test_commits: u64,
    messages: MessageTally,
    sizes: Vec<u64>,
    types: BTreeMap<CommitType, u64>,
    hourly: [u64; 24],
    daily: [u64; 7],
    late_night: u64,
    weekend: u64,
    business: u64,
    first: Option<DateTime<FixedOffset>>,
    last: Option<DateTime<FixedOffset>>,
    recent: Vec<RecentCommit>,
}

impl DevAccum {
    fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            commits: 0,
            added: 0,
            removed: 0,
            repositories: BTreeSet::new(),
            doc_commits: 0,
            test_commits: 0,
            messages: MessageTally::default(),
            sizes: Vec::new(),
            types: CommitType::ALL.into_iter().map(|t| (t, 0)).collect(),
            hourly: [0; 24],
            daily: [0; 7],
            late_night: 0,
            weekend: 0,
            business: 0,
            first: None,
            last: None,
            recent: Vec::new(),
        }
    }

    fn record(&mut self, repository: &str, commit: &CommitRecord) {
        self.commits += 1;
        self.added += commit.insertions;
        self.removed += commit.deletions;
        self.repositories.insert(repository.to_string());

        let verdict = classifier::analyze(
            &commit.hash,
            &commit.author_name,
            &commit.timestamp.to_rfc3339(),
            &commit.message,
        );
        self.messages.record(&verdict);

        self.sizes.push(commit.lines_changed());

        if let Some(kind) = classifier::commit_type(&commit.message) {
            *self.types.entry(kind).or_insert(0) += 1;
        }

        let hour = commit.timestamp.hour();
        let day = commit.timestamp.weekday();
        self.hourly[hour as usize] += 1;
        self.daily[day.num_days_from_monday() as usize] += 1;
        if is_late_night(hour) {
            self.late_night += 1;
        }
        if is_weekend(day) {
            self.weekend += 1;
        }
        if is_business_hours(hour, day) {
            self.business += 1;
        }

        if is_documentation_commit(&commit.message) {
            self.doc_commits += 1;
        }
        if is_test_commit(&commit.message) {
            self.test_commits += 1;
        }

        self.first = Some(self.first.map_or(commit.timestamp, |f| f.min(commit.timestamp)));
        self.last = Some(self.last.map_or(commit.timestamp, |l| l.max(commit.timestamp)));

        self.recent.push(RecentCommit {
            hash: commit.hash.clone(),
            repository: repository.to_string(),
            timestamp: commit.timestamp,
            subject: commit.subject().to_string(),
            insertions: commit.insertions,
            deletions: commit.deletions,
            score: verdict.score,
            passed: verdict.passed,
        });
    }

    fn preferred_period(&self) -> WorkingPeriod {
        let mut counts = [0u64; 4];
        for (hour, count) in self.hourly.iter().enumerate() {
            let idx = WorkingPeriod::ORDER
                .iter()
                .position(|p| *p == WorkingPeriod::from_hour(hour as u32))
                .unwrap_or(3);
            counts[idx] += count;
        }

        let mut best = 0;
        for idx in 1..counts.len() {
            if counts[idx] > counts[best] {
                best = idx;
            }
        }
        WorkingPeriod::ORDER[best]
    }

    fn finish(mut self) -> DeveloperStats {
        let total = self.commits;
        let typed: u64 = self.types.values().sum();
        let fixes = self.types.get(&CommitType::Fix).copied().unwrap_or(0);

        let total_days_spanned = match (&self.first, &self.last) {
            (Some(first), Some(last)) => days_spanned(first, last),
            _ => 0,
        };
        let average_commits_per_day = if total_days_spanned > 0 {
            round2(total as f64 / total_days_spanned as f64)
        } else {
            0.0
        };

        let working_hours = WorkingHours {
            late_night_commits: self.late_night,
            weekend_commits: self.weekend,
            business_hours_commits: self.business,
            late_night_percentage: round2(percentage(self.late_night, total)),
            weekend_percentage: round2(percentage(self.weekend, total)),
            business_hours_percentage: round2(percentage(self.business, total)),
            hourly: self.hourly.to_vec(),
            daily: self.daily.to_vec(),
            preferred_period: self.preferred_period(),
        };

        self.recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.recent.truncate(RECENT_COMMITS_PER_DEVELOPER);

        DeveloperStats {
            documentation_ratio: round2(percentage(self.doc_commits, total)),
            test_ratio: round2(percentage(self.test_commits, total)),
            message_compliance: self.messages.summary(TOP_VIOLATIONS),
            size_distribution: SizeDistribution::from_sizes(&self.sizes),
            bug_fix_ratio: round2(percentage(fixes, typed)),
            working_hours,
            first_commit: self.first,
            last_commit: self.last,
            total_days_spanned,
            average_commits_per_day,
            recent_commits: self.recent,
            name: self.name,
            email: self.email,
            total_commits: total,
            lines_added: self.added,
            lines_removed: self.removed,
            repositories: self.repositories.into_iter().collect(),
            documentation_commits: self.doc_commits,
            test_commits: self.test_commits,
            commit_types: self.types,
        }
    }
}

static DOC_WORDS: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_pattern(r"(?i)\b(readme|documentation|docs?|guide|tutorial)\b"));

static TEST_WORDS: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_pattern(r"(?i)\btest(s|ing)?\b|spec(s)?\b"));

/// A documentation keyword anywhere in the message. A `docs:` or `docs(`
/// prefix is covered by the same pattern.
pub fn is_documentation_commit(message: &str) -> bool {
    DOC_WORDS.as_ref().is_some_and(|re| re.is_match(message))
}

/// A test keyword, or a word ending in `spec`/`specs`.
pub fn is_test_commit(message: &str) -> bool {
    TEST_WORDS.as_ref().is_some_and(|re| re.is_match(message))
}

/// Fold the recent commits of every analysis into per-developer statistics,
/// sorted by total commits descending.
pub fn aggregate_developers(analyses: &[RepoAnalysisResult]) -> Vec<DeveloperStats> {
    let mut accums: HashMap<(String, String), DevAccum> = HashMap::new();

    for analysis in analyses {
        for commit in &analysis.recent_commits {
            accums
                .entry((commit.author_name.clone(), commit.author_email.clone()))
                .or_insert_with(|| DevAccum::new(&commit.author_name, &commit.author_email))
                .record(&analysis.repo_name, commit);
        }
    }

    let mut developers: Vec<DeveloperStats> = accums.into_values().map(DevAccum::finish).collect();
    developers.sort_by(|a, b| {
        b.total_commits
            .cmp(&a.total_commits)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.email.cmp(&b.email))
    });
    developers
}

/// Completed analyses listed by the index, or every artifact on disk when
/// the index is unavailable.
pub fn load_analyses(
    index: Option<&dyn RepositoryIndex>,
    store: &ArtifactStore,
) -> Result<(Vec<RepoAnalysisResult>, ReportSource)> {
    let entries = match index.map(|i| i.list_by_status(AnalysisStatus::Completed)) {
        Some(Ok(entries)) => entries,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "repository index unreadable, scanning artifact directory");
            return Ok((store.load_latest_per_repo()?, ReportSource::DirectoryScan));
        }
        None => {
            tracing::warn!("no repository index, scanning artifact directory");
            return Ok((store.load_latest_per_repo()?, ReportSource::DirectoryScan));
        }
    };

    let mut analyses = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(file) = &entry.output_file else {
            tracing::debug!(repo = %entry.repo_path, "completed entry without artifact");
            continue;
        };
        match store.read(file) {
            Ok(result) => analyses.push(result),
            Err(e) => {
                tracing::warn!(repo = %entry.repo_path, file = %file, error = %e, "skipping unreadable artifact")
            }
        }
    }
    Ok((analyses, ReportSource::Index))
}

pub fn build_report(index: Option<&dyn RepositoryIndex>, store: &ArtifactStore) -> Result<DeveloperReport> {
    let (analyses, source) = load_analyses(index, store)?;
    let developers = aggregate_developers(&analyses);
    tracing::info!(
        repositories = analyses.len(),
        developers = developers.len(),
        "aggregated developer statistics"
    );

    Ok(DeveloperReport {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        source,
        repositories_analyzed: analyses.len(),
        developers,
    })
}

pub fn exec(common: CommonArgs, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let config = Config::load(&common).context("Failed to load configuration")?;
    let store = ArtifactStore::new(config.analyses_dir()).context("Failed to open artifact store")?;

    let index = match SqliteIndex::open(config.index_path()) {
        Ok(index) => Some(index),
        Err(e) => {
            tracing::warn!(error = %e, "failed to open repository index");
            None
        }
    };
    let report = build_report(index.as_ref().map(|i| i as &dyn RepositoryIndex), &store)
        .context("Failed to aggregate developer statistics")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if ndjson {
        for dev in &report.developers {
            println!("{}", serde_json::to_string(dev)?);
        }
    } else {
        output_table(&report);
    }
    Ok(())
}

fn output_table(report: &DeveloperReport) {
    if report.developers.is_empty() {
        println!("No analyzed commits found. Run `gitdash analyze` first.");
        return;
    }

    println!(
        "{:<24} {:<28} {:>7} {:>9} {:>9} {:>5} {:>7} {:>6} {:>6} {:>9}",
        style("Name").bold(),
        style("Email").bold(),
        style("Commits").bold(),
        style("Added").bold(),
        style("Removed").bold(),
        style("Repos").bold(),
        style("Pass%").bold(),
        style("Docs%").bold(),
        style("Test%").bold(),
        style("Period").bold()
    );
    println!("{}", "─".repeat(122));
    for d in &report.developers {
        println!(
            "{:<24} {:<28} {:>7} {:>9} {:>9} {:>5} {:>7.1} {:>6.1} {:>6.1} {:>9}",
            truncate(&d.name, 24),
            truncate(&d.email, 28),
            d.total_commits,
            d.lines_added,
            d.lines_removed,
            d.repositories.len(),
            d.message_compliance.pass_percentage,
            d.documentation_ratio,
            d.test_ratio,
            d.working_hours.preferred_period.as_str()
        );
    }
    println!(
        "\n{} developers across {} repositories",
        report.developers.len(),
        report.repositories_analyzed
    );
}
