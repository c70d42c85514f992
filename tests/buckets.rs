use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use gitdash::buckets::{aggregate, distinct_authors, summarize};
use gitdash::model::CommitRecord;
use pretty_assertions::assert_eq;

fn commit(hash: &str, author: &str, when: &str, added: u64, removed: u64) -> CommitRecord {
    CommitRecord {
        hash: hash.to_string(),
        author_name: author.to_string(),
        author_email: format!("{}@example.com", author.to_lowercase()),
        timestamp: DateTime::parse_from_rfc3339(when).unwrap(),
        message: format!("Change by {author}"),
        insertions: added,
        deletions: removed,
        files_changed: 1,
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn consecutive_mondays_are_separate_weeks() {
    let commits = vec![
        commit("b", "Ann", "2024-01-08T10:00:00+00:00", 5, 1),
        commit("a", "Ann", "2024-01-01T10:00:00+00:00", 3, 0),
    ];
    let buckets = aggregate(&commits);

    assert_eq!(buckets.weekly.len(), 2);
    assert_eq!(buckets.weekly[0].week_start, date("2024-01-01"));
    assert_eq!(buckets.weekly[0].iso_week, 1);
    assert_eq!(buckets.weekly[0].commit_hashes, vec!["a".to_string()]);
    assert_eq!(buckets.weekly[1].week_start, date("2024-01-08"));
    assert_eq!(buckets.weekly[1].iso_week, 2);
    assert_eq!(buckets.weekly[1].lines_added, 5);

    assert_eq!(buckets.monthly.len(), 1);
    assert_eq!(buckets.monthly[0].year_month, "2024-01");
    assert_eq!(buckets.monthly[0].weeks.len(), 2);
    assert_eq!(buckets.yearly.len(), 1);
    assert_eq!(buckets.yearly[0].year, 2024);
}

#[test]
fn week_straddling_new_year_belongs_to_december() {
    let commits = vec![
        commit("a", "Ann", "2024-12-30T09:00:00+00:00", 1, 0),
        commit("b", "Bob", "2025-01-02T09:00:00+00:00", 2, 0),
    ];
    let buckets = aggregate(&commits);

    assert_eq!(buckets.weekly.len(), 1);
    let week = &buckets.weekly[0];
    assert_eq!(week.week_start, date("2024-12-30"));
    assert_eq!(week.iso_week, 1);
    assert_eq!(week.iso_year, 2025);
    assert_eq!(week.year, 2024);
    assert_eq!(week.authors, vec!["Ann".to_string(), "Bob".to_string()]);

    assert_eq!(buckets.monthly.len(), 1);
    assert_eq!(buckets.monthly[0].year_month, "2024-12");
    assert_eq!(buckets.yearly.len(), 1);
    assert_eq!(buckets.yearly[0].year, 2024);
    assert_eq!(buckets.yearly[0].commit_count, 2);
}

#[test]
fn weeks_follow_the_author_timezone() {
    // Sunday evening in New York is already Monday in UTC.
    let commits = vec![commit("a", "Ann", "2024-01-07T23:30:00-05:00", 1, 0)];
    let buckets = aggregate(&commits);
    assert_eq!(buckets.weekly[0].week_start, date("2024-01-01"));
}

#[test]
fn counts_agree_across_levels() {
    let commits = vec![
        commit("1", "Ann", "2023-11-29T12:00:00+01:00", 10, 2),
        commit("2", "Bob", "2023-12-31T23:59:00+00:00", 4, 4),
        commit("3", "Ann", "2024-01-01T00:01:00+00:00", 1, 1),
        commit("4", "Cid", "2024-02-29T08:00:00-08:00", 0, 7),
        commit("5", "Bob", "2024-03-04T08:00:00+09:00", 3, 0),
        commit("6", "Ann", "2024-03-05T08:00:00+09:00", 8, 8),
    ];
    let buckets = aggregate(&commits);
    let total = commits.len() as u64;

    let weekly: u64 = buckets.weekly.iter().map(|w| w.commit_count).sum();
    let monthly: u64 = buckets.monthly.iter().map(|m| m.commit_count).sum();
    let yearly: u64 = buckets.yearly.iter().map(|y| y.commit_count).sum();
    assert_eq!((weekly, monthly, yearly), (total, total, total));

    for month in &buckets.monthly {
        let nested: u64 = month.weeks.iter().map(|w| w.commit_count).sum();
        assert_eq!(nested, month.commit_count, "{}", month.year_month);
    }
    for year in &buckets.yearly {
        let nested: u64 = year.months.iter().map(|m| m.commit_count).sum();
        assert_eq!(nested, year.commit_count, "{}", year.year);
    }

    for week in &buckets.weekly {
        assert_eq!(week.week_start.weekday(), Weekday::Mon);
        assert_eq!(week.iso_week, week.week_start.iso_week().week());
    }

    let starts: Vec<_> = buckets.weekly.iter().map(|w| w.week_start).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
}

#[test]
fn input_order_does_not_matter() {
    let mut commits = vec![
        commit("1", "Ann", "2024-05-01T12:00:00+00:00", 1, 0),
        commit("2", "Bob", "2024-05-02T12:00:00+00:00", 2, 0),
        commit("3", "Cid", "2024-06-10T12:00:00+00:00", 3, 0),
    ];
    let forward = aggregate(&commits);
    commits.reverse();
    let backward = aggregate(&commits);
    assert_eq!(forward, backward);
    assert_eq!(forward.weekly[0].authors, vec!["Ann".to_string(), "Bob".to_string()]);
}

#[test]
fn no_commits_no_buckets() {
    let buckets = aggregate(&[]);
    assert!(buckets.weekly.is_empty());
    assert!(buckets.monthly.is_empty());
    assert!(buckets.yearly.is_empty());

    let summary = summarize(&[]);
    assert_eq!(summary.lines_added, 0);
    assert!(summary.contributors.is_empty());
}

#[test]
fn summary_ranks_contributors() {
    let commits = vec![
        commit("1", "Bob", "2024-05-01T12:00:00+00:00", 1, 1),
        commit("2", "Ann", "2024-05-02T12:00:00+00:00", 2, 0),
        commit("3", "Bob", "2024-05-03T12:00:00+00:00", 3, 2),
        commit("4", "Cid", "2024-05-04T12:00:00+00:00", 4, 0),
    ];
    let summary = summarize(&commits);

    assert_eq!(summary.lines_added, 10);
    assert_eq!(summary.lines_removed, 3);
    assert_eq!(summary.files_changed, 4);
    let ranked: Vec<_> = summary
        .contributors
        .iter()
        .map(|c| (c.name.as_str(), c.commits))
        .collect();
    assert_eq!(ranked, vec![("Bob", 2), ("Ann", 1), ("Cid", 1)]);

    assert_eq!(distinct_authors(&commits), vec!["Bob", "Ann", "Cid"]);
}
