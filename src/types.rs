use crate::render::error::CommentError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Criticality of an issue, highest first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Minor,
    Major,
    Critical,
    Blocker,
}

impl Severity {
    /// All severities, most critical first
    pub const ALL: [Severity; 5] = [
        Severity::Blocker,
        Severity::Critical,
        Severity::Major,
        Severity::Minor,
        Severity::Info,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Severity::Blocker => "BLOCKER",
            Severity::Critical => "CRITICAL",
            Severity::Major => "MAJOR",
            Severity::Minor => "MINOR",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown severity '{}'", s))
    }
}

/// A static-analysis finding as produced by the analysis engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Component key, usually `<project>:<path>`
    pub component_key: String,
    /// Line (1-indexed), absent for file-level issues
    #[serde(default)]
    pub line: Option<u32>,
    pub severity: Severity,
    /// Whether the issue was introduced by the analyzed changes
    #[serde(default = "default_is_new")]
    pub is_new: bool,
    pub message: String,
    /// Rule key, e.g. `java:S1068`
    pub rule_key: String,
}

fn default_is_new() -> bool {
    true
}

/// An issue enriched with everything a template needs to render it
///
/// Built once per issue with [`ReportIssue::builder`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIssue {
    #[serde(flatten)]
    issue: Issue,
    revision: Option<String>,
    url: Option<String>,
    file: String,
    rule_link: String,
    reported_on_diff: bool,
}

impl ReportIssue {
    pub fn builder() -> ReportIssueBuilder {
        ReportIssueBuilder::default()
    }

    pub fn issue(&self) -> &Issue {
        &self.issue
    }

    pub fn severity(&self) -> Severity {
        self.issue.severity
    }

    pub fn line(&self) -> Option<u32> {
        self.issue.line
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn rule_link(&self) -> &str {
        &self.rule_link
    }

    pub fn reported_on_diff(&self) -> bool {
        self.reported_on_diff
    }
}

#[derive(Debug, Default)]
pub struct ReportIssueBuilder {
    issue: Option<Issue>,
    revision: Option<String>,
    url: Option<String>,
    file: String,
    rule_link: Option<String>,
    reported_on_diff: bool,
}

impl ReportIssueBuilder {
    pub fn issue(mut self, issue: Issue) -> Self {
        self.issue = Some(issue);
        self
    }

    pub fn revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    pub fn url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn rule_link(mut self, rule_link: impl Into<String>) -> Self {
        self.rule_link = Some(rule_link.into());
        self
    }

    pub fn reported_on_diff(mut self, reported_on_diff: bool) -> Self {
        self.reported_on_diff = reported_on_diff;
        self
    }

    pub fn build(self) -> Result<ReportIssue, CommentError> {
        let issue = self
            .issue
            .ok_or_else(|| CommentError::InvalidInput("report issue has no issue".into()))?;
        let rule_link = self.rule_link.ok_or_else(|| {
            CommentError::InvalidInput(format!("issue '{}' has no rule link", issue.rule_key))
        })?;
        Ok(ReportIssue {
            issue,
            revision: self.revision,
            url: self.url,
            file: self.file,
            rule_link,
            reported_on_diff: self.reported_on_diff,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub fn new_issue(
        component_key: &str,
        line: Option<u32>,
        severity: Severity,
        is_new: bool,
        message: &str,
        rule_key: &str,
    ) -> Issue {
        Issue {
            component_key: component_key.into(),
            line,
            severity,
            is_new,
            message: message.into(),
            rule_key: rule_key.into(),
        }
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Blocker > Severity::Critical);
        assert!(Severity::Minor > Severity::Info);
        assert_eq!(Severity::ALL[0], Severity::Blocker);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("major".parse::<Severity>(), Ok(Severity::Major));
        assert_eq!(" INFO ".parse::<Severity>(), Ok(Severity::Info));
        assert!("TRIVIAL".parse::<Severity>().is_err());
    }

    #[test]
    fn test_issue_deserialize_defaults() {
        let issue: Issue = serde_json::from_str(
            r#"{"componentKey":"p:src/a.rs","severity":"MINOR","message":"m","ruleKey":"rust:S1"}"#,
        )
        .unwrap();
        assert_eq!(issue.line, None);
        assert!(issue.is_new);
        assert_eq!(issue.severity, Severity::Minor);
    }

    #[test]
    fn test_report_issue_requires_rule_link() {
        let result = ReportIssue::builder()
            .issue(new_issue("c", Some(1), Severity::Info, true, "Issue", "repo:rule"))
            .file("file")
            .build();
        assert!(matches!(result, Err(CommentError::InvalidInput(_))));
    }

    #[test]
    fn test_report_issue_serializes_flat() {
        let issue = ReportIssue::builder()
            .issue(new_issue("c", Some(3), Severity::Major, false, "Issue", "repo:rule"))
            .file("src/a.rs")
            .rule_link("http://link")
            .reported_on_diff(true)
            .build()
            .unwrap();
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["severity"], "MAJOR");
        assert_eq!(value["ruleKey"], "repo:rule");
        assert_eq!(value["componentKey"], "c");
        assert_eq!(value["isNew"], false);
        assert_eq!(value["ruleLink"], "http://link");
        assert_eq!(value["reportedOnDiff"], true);
        assert_eq!(value["url"], serde_json::Value::Null);
    }
}
