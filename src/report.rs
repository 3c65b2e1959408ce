//! Turns analysis output into render-ready issues grouped by comment location.

pub mod orchestrator;

use crate::config::Config;
use crate::render::error::CommentError;
use crate::rule::link::RuleLinkResolver;
use crate::types::{Issue, ReportIssue};
use crate::util::diff::ChangedLines;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Analysis engine output consumed by `mrnote render`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    /// Issues in the order they should be reported
    pub issues: Vec<AnalysisIssue>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AnalysisIssue {
    #[serde(flatten)]
    pub issue: Issue,
    /// Direct link to the issue on the analysis server (optional)
    #[serde(default)]
    pub url: Option<String>,
}

/// Issues sharing one inline comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineGroup {
    pub file: String,
    pub line: u32,
    pub issues: Vec<ReportIssue>,
}

/// Filter and enrich analysis issues, keeping their order
///
/// Without diff information every issue that has a line counts as on the diff.
pub fn assemble(
    config: &Config,
    issues: Vec<AnalysisIssue>,
    changed: Option<&ChangedLines>,
    resolver: &RuleLinkResolver,
) -> Result<Vec<ReportIssue>, CommentError> {
    let total = issues.len();
    let revision = config.revision.commit_sha.clone();

    let report_issues = issues
        .into_iter()
        .filter(|i| config.comment.all_issues || i.issue.is_new)
        .filter(|i| i.issue.severity >= config.comment.issue_filter)
        .map(|AnalysisIssue { issue, url }| {
            let file = file_path(&config.comment.prefix_directory, &issue.component_key);
            let reported_on_diff = match (issue.line, changed) {
                (Some(line), Some(changed)) => changed.contains(&file, line),
                (Some(_), None) => true,
                (None, _) => false,
            };
            ReportIssue::builder()
                .rule_link(resolver(&issue.rule_key))
                .issue(issue)
                .revision(revision.clone())
                .url(url)
                .file(file)
                .reported_on_diff(reported_on_diff)
                .build()
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Kept {} of {} issues", report_issues.len(), total);
    Ok(report_issues)
}

/// Repository path of a component: the `project:` prefix is dropped and the
/// configured prefix directory prepended
fn file_path(prefix_directory: &str, component_key: &str) -> String {
    let path = component_key
        .split_once(':')
        .map(|(_, path)| path)
        .unwrap_or(component_key);
    if prefix_directory.is_empty() {
        path.to_string()
    } else {
        format!(
            "{}/{}",
            prefix_directory.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Group issues on the diff by (file, line) in first-appearance order
pub fn group_inline(config: &Config, issues: &[ReportIssue]) -> Vec<InlineGroup> {
    if config.comment.disable_inline {
        return vec![];
    }

    let mut groups: Vec<InlineGroup> = Vec::new();
    let mut index: HashMap<(String, u32), usize> = HashMap::new();

    for issue in issues.iter().filter(|i| i.reported_on_diff()) {
        let Some(line) = issue.line() else {
            continue;
        };
        let key = (issue.file().to_string(), line);
        match index.get(&key).copied() {
            Some(i) if !config.comment.unique_issue_per_inline => {
                groups[i].issues.push(issue.clone())
            }
            _ => {
                index.insert(key, groups.len());
                groups.push(InlineGroup {
                    file: issue.file().to_string(),
                    line,
                    issues: vec![issue.clone()],
                });
            }
        }
    }
    groups
}
