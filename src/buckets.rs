use crate::model::{
    CommitRecord, Contributor, MonthlyBucket, RepoSummary, TimeBuckets, WeeklyBucket, YearlyBucket,
};
use crate::util::{local_date, week_start, year_month_key};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Running totals shared by every bucket level.
#[derive(Default)]
struct Accum {
    commits: u64,
    added: u64,
    removed: u64,
    files: u64,
    authors: Vec<String>,
    seen_authors: HashSet<String>,
}

impl Accum {
    fn add(&mut self, commit: &CommitRecord) {
        self.commits += 1;
        self.added += commit.insertions;
        self.removed += commit.deletions;
        self.files += commit.files_changed;
        if self.seen_authors.insert(commit.author_name.clone()) {
            self.authors.push(commit.author_name.clone());
        }
    }
}

#[derive(Default)]
struct WeekAccum {
    totals: Accum,
    hashes: Vec<String>,
}

/// Fold commits into weekly, monthly and yearly buckets.
///
/// Input order does not matter: commits are processed oldest first. Month and
/// year are taken from the Monday that starts the commit's week, so a week
/// spanning a month or year boundary lives entirely in the earlier bucket.
pub fn aggregate(commits: &[CommitRecord]) -> TimeBuckets {
    let mut ordered: Vec<&CommitRecord> = commits.iter().collect();
    ordered.sort_by_key(|c| c.timestamp);

    let mut weeks: BTreeMap<NaiveDate, WeekAccum> = BTreeMap::new();
    let mut months: BTreeMap<String, Accum> = BTreeMap::new();
    let mut years: BTreeMap<i32, Accum> = BTreeMap::new();

    for commit in ordered {
        let monday = week_start(local_date(&commit.timestamp));

        let week = weeks.entry(monday).or_default();
        week.totals.add(commit);
        week.hashes.push(commit.hash.clone());

        months.entry(year_month_key(monday)).or_default().add(commit);
        years.entry(monday.year()).or_default().add(commit);
    }

    let weekly: Vec<WeeklyBucket> = weeks
        .into_iter()
        .map(|(monday, WeekAccum { totals, hashes })| {
            let iso = monday.iso_week();
            WeeklyBucket {
                week_start: monday,
                iso_week: iso.week(),
                iso_year: iso.year(),
                year: monday.year(),
                commit_count: totals.commits,
                lines_added: totals.added,
                lines_removed: totals.removed,
                authors: totals.authors,
                files_changed: totals.files,
                commit_hashes: hashes,
            }
        })
        .collect();

    let monthly: Vec<MonthlyBucket> = months
        .into_iter()
        .map(|(year_month, totals)| MonthlyBucket {
            weeks: weekly
                .iter()
                .filter(|w| year_month_key(w.week_start) == year_month)
                .cloned()
                .collect(),
            year_month,
            commit_count: totals.commits,
            lines_added: totals.added,
            lines_removed: totals.removed,
            authors: totals.authors,
            files_changed: totals.files,
        })
        .collect();

    let yearly: Vec<YearlyBucket> = years
        .into_iter()
        .map(|(year, totals)| YearlyBucket {
            year,
            commit_count: totals.commits,
            lines_added: totals.added,
            lines_removed: totals.removed,
            authors: totals.authors,
            files_changed: totals.files,
            months: monthly
                .iter()
                .filter(|m| m.weeks.first().map(|w| w.week_start.year()) == Some(year))
                .cloned()
                .collect(),
        })
        .collect();

    TimeBuckets {
        weekly,
        monthly,
        yearly,
    }
}

/// Repository-wide totals and per-author commit counts.
///
/// Contributors are keyed by `(name, email)` and sorted by commit count
/// descending, then by name and email.
pub fn summarize(commits: &[CommitRecord]) -> RepoSummary {
    let mut summary = RepoSummary::default();
    let mut counts: HashMap<(String, String), u64> = HashMap::new();

    for commit in commits {
        summary.lines_added += commit.insertions;
        summary.lines_removed += commit.deletions;
        summary.files_changed += commit.files_changed;
        *counts
            .entry((commit.author_name.clone(), commit.author_email.clone()))
            .or_insert(0) += 1;
    }

    let mut contributors: Vec<Contributor> = counts
        .into_iter()
        .map(|((name, email), commits)| Contributor { name, email, commits })
        .collect();
    contributors.sort_by(|a, b| {
        b.commits
            .cmp(&a.commits)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.email.cmp(&b.email))
    });
    summary.contributors = contributors;
    summary
}

/// Distinct author names in first-seen chronological order.
pub fn distinct_authors(commits: &[CommitRecord]) -> Vec<String> {
    let mut ordered: Vec<&CommitRecord> = commits.iter().collect();
    ordered.sort_by_key(|c| c.timestamp);

    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .filter(|c| seen.insert(c.author_name.as_str()))
        .map(|c| c.author_name.clone())
        .collect()
}
