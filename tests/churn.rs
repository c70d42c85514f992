mod common;

use common::MockVcs;
use gitdash::churn::{compute_churn, is_excluded, parse_numstat};
use gitdash::error::DashError;
use gitdash::model::FileChurn;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[test]
fn repeated_paths_are_summed_and_binaries_count_zero() {
    let raw = "5\t2\tsrc/app.ts\n\n3\t1\tsrc/app.ts\n-\t-\tlogo.png\n120\t40\tpackage-lock.json\n";
    let entries = parse_numstat(raw);

    assert_eq!(entries, vec![
        FileChurn {
            path: "src/app.ts".to_string(),
            lines_added: 8,
            lines_deleted: 3,
            total_changes: 11,
            commits: 2,
        },
        FileChurn {
            path: "logo.png".to_string(),
            lines_added: 0,
            lines_deleted: 0,
            total_changes: 0,
            commits: 1,
        },
    ]);
}

#[test]
fn malformed_lines_are_skipped() {
    let raw = "garbage\n1\t2\n x\t3\tsrc/a.rs\n4\t4\tsrc/b.rs\n";
    let entries = parse_numstat(raw);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "src/b.rs");
    assert_eq!(entries[0].total_changes, 8);
}

#[test]
fn sorted_by_total_then_path() {
    let raw = "1\t1\tb.rs\n1\t1\ta.rs\n10\t0\tc.rs\n";
    let paths: Vec<_> = parse_numstat(raw).into_iter().map(|e| e.path).collect();
    assert_eq!(paths, vec!["c.rs", "a.rs", "b.rs"]);
}

#[test]
fn exclusions() {
    assert!(is_excluded("package-lock.json"));
    assert!(is_excluded("web/yarn.lock"));
    assert!(is_excluded("Cargo.lock"));
    assert!(is_excluded("README.md"));
    assert!(is_excluded("docs/guide.MD"));
    assert!(!is_excluded("src/main.rs"));
    assert!(!is_excluded("package.json"));
    assert!(!is_excluded("md"));
}

#[test]
fn compute_uses_numstat_from_vcs() {
    let dir = tempdir().unwrap();
    let vcs = MockVcs {
        numstat: "2\t1\tsrc/lib.rs\n".to_string(),
        ..MockVcs::default()
    };
    let entries = compute_churn(&vcs, dir.path(), "1 month ago").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].total_changes, 3);

    let empty = MockVcs {
        has_commits: false,
        numstat: "2\t1\tsrc/lib.rs\n".to_string(),
        ..MockVcs::default()
    };
    assert!(compute_churn(&empty, dir.path(), "1 month ago").unwrap().is_empty());

    let err = compute_churn(&vcs, &dir.path().join("missing"), "1 month ago").unwrap_err();
    assert!(matches!(err, DashError::PathNotFound(_)));
}
