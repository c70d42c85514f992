use chrono::{DateTime, Duration, Utc};
use gitdash::analysis::build_result;
use gitdash::classifier::CommitType;
use gitdash::developers::{
    aggregate_developers, build_report, is_documentation_commit, is_test_commit, load_analyses,
    ReportSource, SizeBucket, WorkingPeriod,
};
use gitdash::error::{DashError, Result};
use gitdash::model::{ChurnSummary, CommitRecord, RepoAnalysisResult};
use gitdash::store::{
    AnalysisStatus, ArtifactStore, IndexEntry, IndexUpdate, RepositoryIndex, SqliteIndex,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn commit(hash: &str, name: &str, email: &str, when: &str, message: &str, added: u64, removed: u64) -> CommitRecord {
    CommitRecord {
        hash: hash.to_string(),
        author_name: name.to_string(),
        author_email: email.to_string(),
        timestamp: DateTime::parse_from_rfc3339(when).unwrap(),
        message: message.to_string(),
        insertions: added,
        deletions: removed,
        files_changed: 1,
    }
}

fn analysis(name: &str, commits: &[CommitRecord]) -> RepoAnalysisResult {
    build_result(name, &format!("/src/{name}"), "main", commits, ChurnSummary::default(), 100)
}

fn two_repos() -> Vec<RepoAnalysisResult> {
    let ann = ("Ann", "ann@example.com");
    let alpha = vec![
        commit("a1", ann.0, ann.1, "2024-03-01T10:00:00+00:00", "fix: handle eof", 5, 1),
        commit("a2", ann.0, ann.1, "2024-03-02T23:30:00+02:00", "feat: add login", 30, 0),
        commit("b1", "Bob", "bob@example.com", "2024-03-05T09:30:00+00:00", "chore: bump deps", 2, 2),
    ];
    let beta = vec![
        commit("a3", ann.0, ann.1, "2024-03-04T14:00:00+00:00", "docs: update readme", 100, 50),
        commit("a4", ann.0, ann.1, "2024-03-10T08:00:00+00:00", "Add unit tests for parser", 500, 0),
    ];
    vec![analysis("alpha", &alpha), analysis("beta", &beta)]
}

#[test]
fn folds_commits_across_repositories() {
    let developers = aggregate_developers(&two_repos());
    assert_eq!(developers.len(), 2);

    let ann = &developers[0];
    assert_eq!(ann.name, "Ann");
    assert_eq!(ann.total_commits, 4);
    assert_eq!(ann.lines_added, 635);
    assert_eq!(ann.lines_removed, 51);
    assert_eq!(ann.repositories, vec!["alpha".to_string(), "beta".to_string()]);

    assert_eq!(ann.documentation_commits, 1);
    assert_eq!(ann.test_commits, 1);
    assert_eq!(ann.documentation_ratio, 25.0);
    assert_eq!(ann.test_ratio, 25.0);

    assert_eq!(ann.commit_types[&CommitType::Fix], 1);
    assert_eq!(ann.commit_types[&CommitType::Feat], 1);
    assert_eq!(ann.commit_types[&CommitType::Docs], 1);
    assert_eq!(ann.commit_types[&CommitType::Chore], 0);
    assert_eq!(ann.commit_types.len(), CommitType::ALL.len());
    assert_eq!(ann.bug_fix_ratio, 33.33);

    assert_eq!(ann.total_days_spanned, 10);
    assert_eq!(ann.average_commits_per_day, 0.4);
    assert_eq!(ann.message_compliance.analyzed, 4);
    assert_eq!(ann.message_compliance.pass_percentage, 100.0);

    assert_eq!(ann.recent_commits.len(), 4);
    assert_eq!(ann.recent_commits[0].hash, "a4");
    assert_eq!(ann.recent_commits[0].repository, "beta");

    let bob = &developers[1];
    assert_eq!(bob.total_commits, 1);
    assert_eq!(bob.bug_fix_ratio, 0.0);
}

#[test]
fn working_hours_use_author_local_time() {
    let developers = aggregate_developers(&two_repos());
    let hours = &developers[0].working_hours;

    assert_eq!(hours.late_night_commits, 1);
    assert_eq!(hours.weekend_commits, 2);
    assert_eq!(hours.business_hours_commits, 2);
    assert_eq!(hours.late_night_percentage, 25.0);
    assert_eq!(hours.weekend_percentage, 50.0);
    assert_eq!(hours.hourly.len(), 24);
    assert_eq!(hours.hourly[23], 1);
    assert_eq!(hours.daily, vec![1, 0, 0, 0, 1, 1, 1]);
    assert_eq!(hours.preferred_period, WorkingPeriod::Morning);
}

fn period_for(hours: &[&str]) -> WorkingPeriod {
    let commits: Vec<_> = hours
        .iter()
        .enumerate()
        .map(|(i, when)| commit(&i.to_string(), "Ann", "ann@example.com", when, "Add a feature", 1, 0))
        .collect();
    aggregate_developers(&[analysis("r", &commits)])[0].working_hours.preferred_period
}

#[test]
fn preferred_period_tie_goes_to_earlier_period() {
    let period = period_for(&["2024-03-04T07:00:00+00:00", "2024-03-05T13:00:00+00:00"]);
    assert_eq!(period, WorkingPeriod::Morning);

    let period = period_for(&["2024-03-04T19:00:00+00:00", "2024-03-05T15:00:00+00:00"]);
    assert_eq!(period, WorkingPeriod::Afternoon);
}

#[test]
fn night_spans_midnight() {
    let period = period_for(&[
        "2024-03-04T23:00:00+00:00",
        "2024-03-05T03:00:00+00:00",
        "2024-03-05T10:00:00+00:00",
    ]);
    assert_eq!(period, WorkingPeriod::Night);
    assert_eq!(WorkingPeriod::from_hour(22), WorkingPeriod::Night);
    assert_eq!(WorkingPeriod::from_hour(5), WorkingPeriod::Night);
    assert_eq!(WorkingPeriod::from_hour(6), WorkingPeriod::Morning);
}

#[test]
fn size_distribution_partitions_commits() {
    let developers = aggregate_developers(&two_repos());
    let sizes = &developers[0].size_distribution;

    assert_eq!((sizes.tiny, sizes.small, sizes.medium, sizes.large, sizes.huge), (1, 1, 1, 0, 1));
    assert_eq!(sizes.mean, 171.5);
    assert_eq!(sizes.median, 90.0);

    for dev in &developers {
        assert_eq!(dev.size_distribution.total(), dev.total_commits);
        assert!((0.0..=100.0).contains(&dev.documentation_ratio));
        assert!((0.0..=100.0).contains(&dev.test_ratio));
    }
}

#[test]
fn size_bucket_boundaries() {
    assert_eq!(SizeBucket::from_lines(0), SizeBucket::Tiny);
    assert_eq!(SizeBucket::from_lines(10), SizeBucket::Tiny);
    assert_eq!(SizeBucket::from_lines(11), SizeBucket::Small);
    assert_eq!(SizeBucket::from_lines(50), SizeBucket::Small);
    assert_eq!(SizeBucket::from_lines(200), SizeBucket::Medium);
    assert_eq!(SizeBucket::from_lines(400), SizeBucket::Large);
    assert_eq!(SizeBucket::from_lines(401), SizeBucket::Huge);
}

#[test]
fn identities_are_not_merged() {
    let commits = vec![
        commit("1", "Ann", "ann@work.com", "2024-03-01T10:00:00+00:00", "Add parser module", 1, 0),
        commit("2", "Ann", "ann@home.net", "2024-03-02T10:00:00+00:00", "Add lexer module", 1, 0),
        commit("3", "Ann", "ann@home.net", "2024-03-03T10:00:00+00:00", "Add emitter module", 1, 0),
    ];
    let developers = aggregate_developers(&[analysis("solo", &commits)]);

    let ids: Vec<_> = developers
        .iter()
        .map(|d| (d.email.as_str(), d.total_commits))
        .collect();
    assert_eq!(ids, vec![("ann@home.net", 2), ("ann@work.com", 1)]);
}

#[test]
fn developers_sorted_by_commit_count() {
    let mut commits = Vec::new();
    for (i, name) in ["Cid", "Bob", "Bob", "Ann", "Bob", "Ann"].iter().enumerate() {
        let when = format!("2024-04-{:02}T12:00:00+00:00", i + 1);
        commits.push(commit(&i.to_string(), name, "x@example.com", &when, "Add a feature", 1, 1));
    }
    let developers = aggregate_developers(&[analysis("r", &commits)]);
    let counts: Vec<_> = developers.iter().map(|d| d.total_commits).collect();
    assert_eq!(counts, vec![3, 2, 1]);
    assert!(counts.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn documentation_and_test_heuristics() {
    assert!(is_documentation_commit("docs: fix typo"));
    assert!(is_documentation_commit("Docs(api): describe errors"));
    assert!(is_documentation_commit("Update README with install steps"));
    assert!(!is_documentation_commit("Add doctor role"));

    assert!(is_test_commit("test: cover parser"));
    assert!(is_test_commit("Add Testing helpers"));
    assert!(is_test_commit("Add parser spec"));
    assert!(is_test_commit("Update login.specs fixtures"));
    assert!(!is_test_commit("Add latest release notes"));

    assert!(is_documentation_commit("Write a GUIDE for contributors"));
    assert!(is_documentation_commit("doc-comment the parser"));
    assert!(!is_documentation_commit("Handle documents upload"));
    assert!(is_test_commit("TESTS: stabilize flaky login"));
    assert!(is_test_commit("Rename aspec helpers"));
    assert!(!is_test_commit("Respect the retry budget"));
}

#[test]
fn report_uses_index_when_available() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path()).unwrap();
    let index = SqliteIndex::in_memory().unwrap();

    let analyses = two_repos();
    for a in &analyses {
        let file = store.write(a).unwrap();
        index
            .upsert_status(&a.repo_path, AnalysisStatus::Completed, IndexUpdate {
                repo_name: a.repo_name.clone(),
                output_file: Some(file.to_string_lossy().to_string()),
                branch: Some(a.branch.clone()),
                error: None,
            })
            .unwrap();
    }
    index
        .upsert_status("/src/broken", AnalysisStatus::Failed, IndexUpdate {
            repo_name: "broken".into(),
            error: Some("boom".into()),
            ..Default::default()
        })
        .unwrap();

    let report = build_report(Some(&index), &store).unwrap();
    assert_eq!(report.source, ReportSource::Index);
    assert_eq!(report.repositories_analyzed, 2);
    assert_eq!(report.developers.len(), 2);
}

struct BrokenIndex;

impl RepositoryIndex for BrokenIndex {
    fn list_by_status(&self, _status: AnalysisStatus) -> Result<Vec<IndexEntry>> {
        Err(DashError::Index("corrupt".into()))
    }

    fn list_all(&self) -> Result<Vec<IndexEntry>> {
        Err(DashError::Index("corrupt".into()))
    }

    fn get(&self, _repo_path: &str) -> Result<Option<IndexEntry>> {
        Err(DashError::Index("corrupt".into()))
    }

    fn upsert_status(&self, _repo_path: &str, _status: AnalysisStatus, _update: IndexUpdate) -> Result<()> {
        Err(DashError::Index("corrupt".into()))
    }
}

#[test]
fn unreadable_index_falls_back_to_latest_artifacts() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path()).unwrap();

    let mut older = two_repos().remove(0);
    older.analyzed_at = Utc::now() - Duration::days(1);
    older.recent_commits.truncate(1);
    let newer = two_repos().remove(0);
    store.write(&older).unwrap();
    store.write(&newer).unwrap();
    std::fs::write(dir.path().join("junk.json"), "{ not json").unwrap();

    let (analyses, source) = load_analyses(Some(&BrokenIndex), &store).unwrap();
    assert_eq!(source, ReportSource::DirectoryScan);
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].recent_commits.len(), 3);

    let (_, source) = load_analyses(None, &store).unwrap();
    assert_eq!(source, ReportSource::DirectoryScan);
}

#[test]
fn empty_store_gives_empty_report() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path()).unwrap();
    let index = SqliteIndex::in_memory().unwrap();

    let report = build_report(Some(&index), &store).unwrap();
    assert_eq!(report.repositories_analyzed, 0);
    assert!(report.developers.is_empty());
}
