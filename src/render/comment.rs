use super::context::{Location, ReportContext};
use super::error::CommentError;
use super::template::TemplateEngine;
use crate::config::Config;
use crate::rule::link::RuleLinkResolver;
use crate::types::ReportIssue;
use tracing::{debug, trace};

pub const DEFAULT_INLINE_TEMPLATE: &str = include_str!("../templates/inline.md");
pub const DEFAULT_GLOBAL_TEMPLATE: &str = include_str!("../templates/global.md");

/// Which comment is being built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentMode {
    /// One comment attached to a (file, line) of the revision
    Inline,
    /// Whole-report summary comment
    Global,
}

impl CommentMode {
    pub fn template_name(self) -> &'static str {
        match self {
            CommentMode::Inline => "inline",
            CommentMode::Global => "global",
        }
    }

    /// Configured template text for this mode, or the built-in default
    pub fn template_source(self, config: &Config) -> &str {
        let configured = match self {
            CommentMode::Inline => config.template.inline.as_deref(),
            CommentMode::Global => config.template.global.as_deref(),
        };
        configured.unwrap_or(match self {
            CommentMode::Inline => DEFAULT_INLINE_TEMPLATE,
            CommentMode::Global => DEFAULT_GLOBAL_TEMPLATE,
        })
    }
}

/// Turns the issues of one location into a comment body
pub struct CommentBuilder<'a> {
    config: &'a Config,
    engine: &'a TemplateEngine,
    resolver: RuleLinkResolver,
}

impl<'a> CommentBuilder<'a> {
    pub fn new(config: &'a Config, engine: &'a TemplateEngine, resolver: RuleLinkResolver) -> Self {
        Self {
            config,
            engine,
            resolver,
        }
    }

    pub fn build_inline(
        &self,
        location: &Location,
        issues: &[ReportIssue],
    ) -> Result<String, CommentError> {
        self.build(CommentMode::Inline, location, issues)
    }

    pub fn build_global(
        &self,
        location: &Location,
        issues: &[ReportIssue],
    ) -> Result<String, CommentError> {
        self.build(CommentMode::Global, location, issues)
    }

    /// Render the comment; output is returned exactly as the template produces it
    pub fn build(
        &self,
        mode: CommentMode,
        location: &Location,
        issues: &[ReportIssue],
    ) -> Result<String, CommentError> {
        validate(mode, location, issues)?;

        let name = mode.template_name();
        trace!(
            "Building {} comment for {:?} with {} issues",
            name,
            location,
            issues.len()
        );
        let ctx = ReportContext::build(self.config, location, issues, self.resolver.clone());
        let body = self
            .engine
            .render(name, mode.template_source(self.config), ctx.into_value())?;
        debug!("Built {} comment ({} bytes)", name, body.len());
        Ok(body)
    }
}

fn validate(mode: CommentMode, location: &Location, issues: &[ReportIssue]) -> Result<(), CommentError> {
    if location.revision.trim().is_empty() {
        return Err(CommentError::InvalidInput("revision is empty".into()));
    }
    if location.line == Some(0) {
        return Err(CommentError::InvalidInput("line numbers start at 1".into()));
    }
    if mode == CommentMode::Global {
        return Ok(());
    }
    for issue in issues {
        if let Some(file) = location.file.as_deref() {
            if issue.file() != file {
                return Err(CommentError::InvalidInput(format!(
                    "issue on '{}' cannot be rendered in a comment for '{}'",
                    issue.file(),
                    file
                )));
            }
        }
        if let (Some(line), Some(issue_line)) = (location.line, issue.line()) {
            if issue_line != line {
                return Err(CommentError::InvalidInput(format!(
                    "issue on line {} cannot be rendered in a comment for line {}",
                    issue_line, line
                )));
            }
        }
    }
    Ok(())
}
