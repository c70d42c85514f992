//! Commit message style checks.
//!
//! [`analyze`] is a pure function of the message text: it splits the message
//! into subject and body, runs every rule (rules never short-circuit each
//! other) and scores the result.

use crate::util::compile_pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

pub const SUBJECT_SOFT_LIMIT: usize = 50;
pub const SUBJECT_HARD_LIMIT: usize = 72;
pub const SUBJECT_MIN_LENGTH: usize = 10;
pub const BODY_LINE_LIMIT: usize = 72;
pub const PASS_THRESHOLD: u8 = 70;

const GENERIC_SUBJECTS: &[&str] = &[
    "wip", "fix", "fixes", "fixed", "update", "updates", "updated", "change", "changes", "changed",
    "minor", "tmp", "temp",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn penalty(self) -> u32 {
        match self {
            Severity::Error => 20,
            Severity::Warning => 10,
            Severity::Info => 5,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    SubjectEmpty,
    SubjectLength,
    SubjectMinLength,
    SubjectPeriod,
    SubjectCapitalization,
    ConventionalFormat,
    ConventionalType,
    ConventionalTypeCase,
    ConventionalScopeCase,
    ConventionalDescription,
    ConventionalDescriptionCase,
    BlankLine,
    BodyLineLength,
    GenericMessage,
}

impl RuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::SubjectEmpty => "subject-empty",
            RuleId::SubjectLength => "subject-length",
            RuleId::SubjectMinLength => "subject-min-length",
            RuleId::SubjectPeriod => "subject-period",
            RuleId::SubjectCapitalization => "subject-capitalization",
            RuleId::ConventionalFormat => "conventional-format",
            RuleId::ConventionalType => "conventional-type",
            RuleId::ConventionalTypeCase => "conventional-type-case",
            RuleId::ConventionalScopeCase => "conventional-scope-case",
            RuleId::ConventionalDescription => "conventional-description",
            RuleId::ConventionalDescriptionCase => "conventional-description-case",
            RuleId::BlankLine => "blank-line",
            RuleId::BodyLineLength => "body-line-length",
            RuleId::GenericMessage => "generic-message",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conventional commit types, in the order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Build,
    Ci,
    Chore,
    Revert,
}

impl CommitType {
    pub const ALL: [CommitType; 11] = [
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Docs,
        CommitType::Style,
        CommitType::Refactor,
        CommitType::Perf,
        CommitType::Test,
        CommitType::Build,
        CommitType::Ci,
        CommitType::Chore,
        CommitType::Revert,
    ];

    /// Exact, case-sensitive match against the known type names.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
            CommitType::Chore => "chore",
            CommitType::Revert => "revert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub rule: RuleId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessageAnalysis {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
    pub subject: String,
    pub body: String,
    pub score: u8,
    pub passed: bool,
    pub issues: Vec<Issue>,
}

impl CommitMessageAnalysis {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

/// The `type(scope)!: description` shape of a subject line.
///
/// `separated` is false when the colon is not followed by a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalPrefix<'a> {
    pub kind: &'a str,
    pub scope: Option<&'a str>,
    pub breaking: bool,
    pub separated: bool,
    pub description: &'a str,
}

/// Subject shape checked by the linter; accepts a `!` breaking marker.
static SUBJECT_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_pattern(r"^(\w+)(?:\((.+?)\))?(!)?:(.*)$"));

/// Prefix that feeds the commit-type histogram. No breaking marker.
static TYPE_PREFIX: LazyLock<Option<Regex>> = LazyLock::new(|| compile_pattern(r"^(\w+)(\(.+?\))?:"));

pub fn parse_conventional(subject: &str) -> Option<ConventionalPrefix<'_>> {
    let caps = SUBJECT_PREFIX.as_ref()?.captures(subject)?;
    let kind = caps.get(1)?.as_str();
    let after_colon = caps.get(4).map_or("", |m| m.as_str());

    Some(ConventionalPrefix {
        kind,
        scope: caps.get(2).map(|m| m.as_str()),
        breaking: caps.get(3).is_some(),
        separated: after_colon.starts_with(' '),
        description: after_colon.trim(),
    })
}

/// Conventional type of a message, if it starts with `type:` or
/// `type(scope):` for one of the known types.
pub fn commit_type(message: &str) -> Option<CommitType> {
    let caps = TYPE_PREFIX.as_ref()?.captures(message)?;
    CommitType::parse(caps.get(1)?.as_str())
}

pub fn analyze(hash: &str, author: &str, date: &str, message: &str) -> CommitMessageAnalysis {
    let normalized = message.trim_end();
    let lines: Vec<&str> = normalized.lines().map(|l| l.trim_end_matches('\r')).collect();
    let subject = lines.first().copied().unwrap_or("");
    let separator = lines.get(1).copied();
    let body_lines: &[&str] = if lines.len() > 2 { &lines[2..] } else { &[] };

    let mut issues = Vec::new();
    check_subject(subject, &mut issues);
    check_conventional(subject, &mut issues);
    check_separator(separator, &mut issues);
    check_body(body_lines, &mut issues);
    check_generic(subject, &mut issues);

    let penalty: u32 = issues.iter().map(|i| i.severity.penalty()).sum();
    let score = 100u32.saturating_sub(penalty) as u8;
    let has_error = issues.iter().any(|i| i.severity == Severity::Error);

    CommitMessageAnalysis {
        hash: hash.to_string(),
        author: author.to_string(),
        date: date.to_string(),
        message: message.to_string(),
        subject: subject.to_string(),
        body: body_lines.join("\n"),
        score,
        passed: score >= PASS_THRESHOLD && !has_error,
        issues,
    }
}

fn push(issues: &mut Vec<Issue>, severity: Severity, rule: RuleId, message: String) {
    issues.push(Issue {
        severity,
        rule,
        message,
    });
}

fn check_subject(subject: &str, issues: &mut Vec<Issue>) {
    let trimmed = subject.trim();
    if trimmed.is_empty() {
        push(
            issues,
            Severity::Error,
            RuleId::SubjectEmpty,
            "Subject line is empty".to_string(),
        );
    }

    let length = subject.chars().count();
    if length > SUBJECT_HARD_LIMIT {
        push(
            issues,
            Severity::Error,
            RuleId::SubjectLength,
            format!("Subject line is {length} characters; the limit is {SUBJECT_HARD_LIMIT}"),
        );
    } else if length > SUBJECT_SOFT_LIMIT {
        push(
            issues,
            Severity::Warning,
            RuleId::SubjectLength,
            format!("Subject line is {length} characters; keep it under {SUBJECT_SOFT_LIMIT}"),
        );
    }

    let trimmed_length = trimmed.chars().count();
    if trimmed_length > 0 && trimmed_length < SUBJECT_MIN_LENGTH {
        push(
            issues,
            Severity::Warning,
            RuleId::SubjectMinLength,
            format!("Subject line is only {trimmed_length} characters; describe the change"),
        );
    }

    if trimmed.ends_with('.') {
        push(
            issues,
            Severity::Warning,
            RuleId::SubjectPeriod,
            "Subject line should not end with a period".to_string(),
        );
    }

    let is_conventional = parse_conventional(trimmed)
        .map(|p| CommitType::parse(&p.kind.to_lowercase()).is_some())
        .unwrap_or(false);
    if let Some(first) = trimmed.chars().next() {
        if first.is_lowercase() && !is_conventional {
            push(
                issues,
                Severity::Info,
                RuleId::SubjectCapitalization,
                "Subject line should start with a capital letter".to_string(),
            );
        }
    }
}

fn check_conventional(subject: &str, issues: &mut Vec<Issue>) {
    let Some(prefix) = parse_conventional(subject.trim()) else {
        return;
    };

    if prefix.description.is_empty() {
        push(
            issues,
            Severity::Error,
            RuleId::ConventionalDescription,
            "Conventional commit is missing a description after the colon".to_string(),
        );
    } else if !prefix.separated {
        push(
            issues,
            Severity::Error,
            RuleId::ConventionalFormat,
            "Conventional commit prefix must be followed by ': '".to_string(),
        );
    }

    let lowered = prefix.kind.to_lowercase();
    if CommitType::parse(&lowered).is_none() {
        push(
            issues,
            Severity::Warning,
            RuleId::ConventionalType,
            format!("Unknown commit type '{}'", prefix.kind),
        );
    }
    if prefix.kind != lowered {
        push(
            issues,
            Severity::Error,
            RuleId::ConventionalTypeCase,
            format!("Commit type '{}' must be lowercase", prefix.kind),
        );
    }

    if let Some(scope) = prefix.scope {
        if scope != scope.to_lowercase() {
            push(
                issues,
                Severity::Error,
                RuleId::ConventionalScopeCase,
                format!("Scope '{scope}' must be lowercase"),
            );
        }
    }

    if prefix.description.chars().next().is_some_and(char::is_uppercase) {
        push(
            issues,
            Severity::Info,
            RuleId::ConventionalDescriptionCase,
            "Description should start with a lowercase letter".to_string(),
        );
    }
}

fn check_separator(separator: Option<&str>, issues: &mut Vec<Issue>) {
    if let Some(line) = separator {
        if !line.trim().is_empty() {
            push(
                issues,
                Severity::Warning,
                RuleId::BlankLine,
                "Second line should be blank to separate subject from body".to_string(),
            );
        }
    }
}

fn check_body(body_lines: &[&str], issues: &mut Vec<Issue>) {
    for (idx, line) in body_lines.iter().enumerate() {
        let length = line.chars().count();
        if length > BODY_LINE_LIMIT {
            push(
                issues,
                Severity::Info,
                RuleId::BodyLineLength,
                format!(
                    "Body line {} is {length} characters; wrap at {BODY_LINE_LIMIT}",
                    idx + 3
                ),
            );
        }
    }
}

fn check_generic(subject: &str, issues: &mut Vec<Issue>) {
    let normalized = subject
        .trim()
        .trim_end_matches(['.', '!'])
        .trim()
        .to_lowercase();
    if GENERIC_SUBJECTS.contains(&normalized.as_str()) {
        push(
            issues,
            Severity::Warning,
            RuleId::GenericMessage,
            format!("Subject '{}' is too vague to be useful", subject.trim()),
        );
    }
}

/// Aggregate verdicts over many analyzed messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub analyzed: u64,
    pub passed: u64,
    pub pass_percentage: f64,
    pub average_score: f64,
    pub top_violations: Vec<RuleCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCount {
    pub rule: RuleId,
    pub count: u64,
}

/// Accumulates classifier verdicts one message at a time.
#[derive(Debug, Clone, Default)]
pub struct MessageTally {
    analyzed: u64,
    passed: u64,
    score_total: u64,
    violations: HashMap<RuleId, u64>,
}

impl MessageTally {
    pub fn record(&mut self, analysis: &CommitMessageAnalysis) {
        self.analyzed += 1;
        if analysis.passed {
            self.passed += 1;
        }
        self.score_total += analysis.score as u64;
        for issue in &analysis.issues {
            *self.violations.entry(issue.rule).or_insert(0) += 1;
        }
    }

    /// Summary with the `top` most frequent rules, by count descending.
    pub fn summary(&self, top: usize) -> MessageSummary {
        let mut violations: Vec<RuleCount> = self
            .violations
            .iter()
            .map(|(rule, count)| RuleCount {
                rule: *rule,
                count: *count,
            })
            .collect();
        violations.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rule.cmp(&b.rule)));
        violations.truncate(top);

        let average_score = if self.analyzed == 0 {
            0.0
        } else {
            self.score_total as f64 / self.analyzed as f64
        };

        MessageSummary {
            analyzed: self.analyzed,
            passed: self.passed,
            pass_percentage: crate::util::round2(crate::util::percentage(self.passed, self.analyzed)),
            average_score: crate::util::round2(average_score),
            top_violations: violations,
        }
    }
}

pub fn summarize_messages<'a>(
    analyses: impl IntoIterator<Item = &'a CommitMessageAnalysis>,
    top: usize,
) -> MessageSummary {
    let mut tally = MessageTally::default();
    for analysis in analyses {
        tally.record(analysis);
    }
    tally.summary(top)
}
