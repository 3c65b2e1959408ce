//! Variable and helper namespace exposed to one template evaluation.

use super::glyph::{badge_for_name, glyph_for_name};
use super::line::format_line;
use crate::config::Config;
use crate::rule::link::RuleLinkResolver;
use crate::types::{ReportIssue, Severity};
use minijinja::Value;
use minijinja::value::ValueKind;
use std::collections::HashMap;

/// Where a comment is posted: a revision, optionally narrowed to a file and line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub revision: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Location {
    pub fn revision(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            file: None,
            line: None,
        }
    }

    pub fn inline(revision: impl Into<String>, file: Option<String>, line: Option<u32>) -> Self {
        Self {
            revision: revision.into(),
            file,
            line,
        }
    }
}

/// Per-pass template context
///
/// Every optional value has a default (empty string, `false`) so a minimally
/// configured run never fails on them.
pub struct ReportContext {
    issues: Vec<ReportIssue>,
    revision: String,
    file: String,
    line: Option<u32>,
    merge_request_iid: String,
    pull_request_key: String,
    status_name: String,
    project_key: String,
    ping_user: bool,
    all_issues: bool,
    unique_issue_per_inline: bool,
    merge_request_discussion: bool,
    disable_inline: bool,
    disable_global: bool,
    max_global_issues: usize,
    resolver: RuleLinkResolver,
}

impl ReportContext {
    pub fn build(
        config: &Config,
        location: &Location,
        issues: &[ReportIssue],
        resolver: RuleLinkResolver,
    ) -> Self {
        Self {
            issues: issues.to_vec(),
            revision: location.revision.clone(),
            file: location.file.clone().unwrap_or_default(),
            line: location.line,
            merge_request_iid: config.revision.merge_request_iid.clone().unwrap_or_default(),
            pull_request_key: config.revision.pull_request_key.clone().unwrap_or_default(),
            status_name: config.comment.status_name.clone().unwrap_or_default(),
            project_key: config.project.key.clone().unwrap_or_default(),
            ping_user: config.comment.ping_user,
            all_issues: config.comment.all_issues,
            unique_issue_per_inline: config.comment.unique_issue_per_inline,
            merge_request_discussion: config.comment.merge_request_discussion,
            disable_inline: config.comment.disable_inline,
            disable_global: config.comment.disable_global,
            max_global_issues: config.comment.max_global_issues,
            resolver,
        }
    }

    pub fn into_value(self) -> Value {
        let counts = IssueCounts::new(&self.issues);
        let resolver = self.resolver;

        let mut entries: Vec<(&'static str, Value)> = vec![
            ("issues", Value::from_serialize(&self.issues)),
            ("revision", Value::from(self.revision)),
            ("file", Value::from(self.file)),
            ("lineNumber", Value::from(self.line)),
            ("mergeRequestIid", Value::from(self.merge_request_iid)),
            ("pullRequestKey", Value::from(self.pull_request_key)),
            ("statusName", Value::from(self.status_name)),
            ("projectKey", Value::from(self.project_key)),
            ("pingUser", Value::from(self.ping_user)),
            ("allIssues", Value::from(self.all_issues)),
            ("uniqueIssuePerInline", Value::from(self.unique_issue_per_inline)),
            ("isMergeRequestDiscussion", Value::from(self.merge_request_discussion)),
            ("disableIssuesInline", Value::from(self.disable_inline)),
            ("disableGlobalComment", Value::from(self.disable_global)),
            ("maxGlobalIssues", Value::from(self.max_global_issues)),
            (
                "severities",
                Value::from(Severity::ALL.map(Severity::name).to_vec()),
            ),
            (
                "emojiSeverity",
                Value::from_function(|severity: String| glyph_for_name(&severity)),
            ),
            (
                "imageSeverity",
                Value::from_function(|severity: String| badge_for_name(&severity)),
            ),
            (
                "ruleLink",
                Value::from_function(move |rule_key: String| resolver(&rule_key)),
            ),
            ("printIssue", Value::from_function(print_issue)),
            (
                "issueCount",
                Value::from_function(move |filter: Option<Value>| counts.count(filter)),
            ),
        ];
        entries.extend(
            Severity::ALL
                .into_iter()
                .map(|severity| (severity.name(), Value::from(severity.name()))),
        );
        Value::from_iter(entries)
    }
}

fn print_issue(
    severity: String,
    message: String,
    rule_link: String,
    url: Option<String>,
    component_key: Option<String>,
) -> String {
    format_line(
        &severity,
        &message,
        &rule_link,
        url.as_deref(),
        component_key.as_deref(),
    )
}

/// Precomputed counts behind the `issueCount` helper
struct IssueCounts {
    total: usize,
    by_severity: HashMap<Severity, usize>,
    reported_on_diff: usize,
}

impl IssueCounts {
    fn new(issues: &[ReportIssue]) -> Self {
        let mut by_severity = HashMap::new();
        for issue in issues {
            *by_severity.entry(issue.severity()).or_insert(0) += 1;
        }
        Self {
            total: issues.len(),
            by_severity,
            reported_on_diff: issues.iter().filter(|i| i.reported_on_diff()).count(),
        }
    }

    /// No argument counts everything, a severity name counts that severity and a
    /// boolean counts issues by whether they are reported on the diff
    fn count(&self, filter: Option<Value>) -> usize {
        let Some(filter) = filter else {
            return self.total;
        };
        match filter.kind() {
            ValueKind::Undefined | ValueKind::None => self.total,
            ValueKind::Bool if filter.is_true() => self.reported_on_diff,
            ValueKind::Bool => self.total - self.reported_on_diff,
            _ => filter
                .as_str()
                .and_then(|name| name.parse::<Severity>().ok())
                .and_then(|severity| self.by_severity.get(&severity).copied())
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::template::TemplateEngine;
    use crate::rule::link;
    use crate::types::tests::new_issue;
    use pretty_assertions::assert_eq;

    fn report_issue(severity: Severity, on_diff: bool) -> ReportIssue {
        ReportIssue::builder()
            .issue(new_issue("component", Some(1), severity, true, "Issue", "repo:rule"))
            .file("file")
            .rule_link("http://myserver/coding_rules#rule_key=repo%3Arule")
            .reported_on_diff(on_diff)
            .build()
            .unwrap()
    }

    fn render(config: &Config, issues: &[ReportIssue], source: &str) -> String {
        let ctx = ReportContext::build(
            config,
            &Location::inline("abc123", Some("file".into()), Some(1)),
            issues,
            link::resolver(config),
        );
        TemplateEngine::new()
            .render("test", source, ctx.into_value())
            .unwrap()
    }

    #[test]
    fn test_defaults_for_unset_values() {
        let output = render(
            &Config::default(),
            &[],
            "[${mergeRequestIid}][${pullRequestKey}][${statusName}][${projectKey}] \
             ${pingUser} ${allIssues} ${uniqueIssuePerInline} ${isMergeRequestDiscussion}",
        );
        assert_eq!(output, "[][][][] false false false false");
    }

    #[test]
    fn test_location_variables() {
        let output = render(&Config::default(), &[], "${revision} ${file}:${lineNumber}");
        assert_eq!(output, "abc123 file:1");
    }

    #[test]
    fn test_helpers() {
        let mut config = Config::default();
        config.server.base_url = "http://myserver/".into();
        let output = render(
            &config,
            &[],
            "${ emojiSeverity(MAJOR) } ${ emojiSeverity('NOPE') } ${ ruleLink('repo:rule') }",
        );
        assert_eq!(
            output,
            ":warning: :grey_question: http://myserver/coding_rules#rule_key=repo%3Arule"
        );
    }

    #[test]
    fn test_print_issue_helper() {
        let issues = vec![report_issue(Severity::Critical, true)];
        let output = render(
            &Config::default(),
            &issues,
            "{% for issue in issues %}${ printIssue(issue.severity, issue.message, issue.ruleLink, issue.url, issue.file) }{% endfor %}",
        );
        assert_eq!(
            output,
            ":no_entry_sign: Issue (file) [:blue_book:](http://myserver/coding_rules#rule_key=repo%3Arule)"
        );
    }

    #[test]
    fn test_issue_count_helper() {
        let issues = vec![
            report_issue(Severity::Major, true),
            report_issue(Severity::Major, false),
            report_issue(Severity::Info, false),
        ];
        let output = render(
            &Config::default(),
            &issues,
            "${ issueCount() } ${ issueCount(MAJOR) } ${ issueCount(BLOCKER) } ${ issueCount(true) } ${ issueCount(false) }",
        );
        assert_eq!(output, "3 2 0 1 2");
    }

    #[test]
    fn test_severities_are_listed_most_critical_first() {
        let output = render(
            &Config::default(),
            &[],
            "{% for s in severities %}${ s }{% if not loop.last %},{% endif %}{% endfor %}",
        );
        assert_eq!(output, "BLOCKER,CRITICAL,MAJOR,MINOR,INFO");
    }
}
