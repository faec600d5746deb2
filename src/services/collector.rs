//! Issue collection and outcome classification.

use crate::models::{EntityKind, Issue, Outcome, Policy, Severity};

/// Accumulates issues for one operation call and decides its [`Outcome`].
///
/// A collector lives exactly as long as one public operation; it is never
/// shared between calls.
///
/// # Classification
///
/// | Recorded | `Strict` | `BestEffort` |
/// |----------|----------|--------------|
/// | nothing | `Success` | `Success` |
/// | warnings only | `Failure` | `Partial` |
/// | any error | `Failure` | `Partial` |
/// | any critical | `Failure` | `Failure` |
#[derive(Debug, Default)]
pub struct IssueCollector {
    policy: Policy,
    issues: Vec<Issue>,
}

impl IssueCollector {
    /// Creates a collector for the given policy.
    #[must_use]
    pub const fn new(policy: Policy) -> Self {
        Self {
            policy,
            issues: Vec::new(),
        }
    }

    /// Returns the policy in effect.
    #[must_use]
    pub const fn policy(&self) -> Policy {
        self.policy
    }

    /// Records an issue.
    pub fn push(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Warning => tracing::warn!(message = %issue.message, "issue recorded"),
            Severity::Error | Severity::Critical => {
                tracing::error!(severity = %issue.severity, message = %issue.message, "issue recorded");
            },
        }
        metrics::counter!("apkg_issues_total", "severity" => issue.severity.as_str())
            .increment(1);
        self.issues.push(issue);
    }

    /// Records every issue from an iterator.
    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        for issue in issues {
            self.push(issue);
        }
    }

    /// Records a warning about an entity kind.
    pub fn warning(&mut self, entity: EntityKind, message: impl Into<String>) {
        self.push(Issue::warning(message).with_entity(entity));
    }

    /// Records an error about an entity kind.
    pub fn error(&mut self, entity: EntityKind, message: impl Into<String>) {
        self.push(Issue::error(message).with_entity(entity));
    }

    /// Records a critical issue about an entity kind.
    pub fn critical(&mut self, entity: EntityKind, message: impl Into<String>) {
        self.push(Issue::critical(message).with_entity(entity));
    }

    /// Returns true once a critical issue has been recorded.
    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    /// Returns true once an issue at or above `severity` has been recorded.
    #[must_use]
    pub fn has_at_least(&self, severity: Severity) -> bool {
        self.issues.iter().any(|i| i.severity >= severity)
    }

    /// Returns true if the policy says the operation can no longer succeed,
    /// so callers may stop early.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self.policy {
            Policy::Strict => !self.issues.is_empty(),
            Policy::BestEffort => self.has_critical(),
        }
    }

    /// Returns the issues recorded so far.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Number of issues recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns true if no issue has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Classifies the operation, attaching `data` where the policy allows.
    pub fn finish<T>(self, data: T) -> Outcome<T> {
        if self.is_fatal() {
            return Outcome::Failure(self.issues);
        }
        if self.issues.is_empty() {
            Outcome::Success(data)
        } else {
            Outcome::Partial(data, self.issues)
        }
    }

    /// Ends the operation without data.
    ///
    /// If nothing was recorded a critical issue is added so that a failure
    /// never carries an empty issue list.
    pub fn fail<T>(mut self, reason: &str) -> Outcome<T> {
        if !self.has_at_least(Severity::Error) {
            self.push(Issue::critical(reason.to_string()));
        }
        Outcome::Failure(self.issues)
    }

    /// Consumes the collector and returns its issues.
    #[must_use]
    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}
