use crate::cli::RenderArgs;
use crate::config::Config;
use crate::render::comment::{CommentBuilder, CommentMode};
use crate::render::context::Location;
use crate::render::error::CommentError;
use crate::render::template::TemplateEngine;
use crate::rule::link::{self, RuleLinkResolver};
use crate::types::ReportIssue;
use crate::util::{self, diff::ChangedLines};
use anyhow::{Context, bail};
use futures::future::join_all;
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use super::{AnalysisReport, InlineGroup};

/// Comment body for one (file, line) of the revision
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InlineComment {
    pub file: String,
    pub line: u32,
    pub revision: String,
    pub body: String,
}

/// Everything rendered in one run
#[derive(Debug, Default, Serialize)]
pub struct RenderedComments {
    pub global: Option<String>,
    pub inline: Vec<InlineComment>,
    #[serde(skip)]
    pub failed: usize,
}

/// Render every comment for an analysis run and write them out
///
/// This function coordinates the whole run:
/// - Reads issues and resolves which lines the revision changed
/// - Filters and enriches issues, then groups them by inline location
/// - Compiles both templates up front so a broken template aborts early
/// - Renders inline comments in parallel (with optional concurrency limit)
/// - Renders the global comment and writes everything to file or stdout
pub async fn run(config: Config, args: &RenderArgs) -> anyhow::Result<()> {
    if config.commit_sha().trim().is_empty() {
        bail!("revision.commit_sha is required (set it in the config or with --config-override)");
    }
    let config = Arc::new(config);

    let report = read_report(&args.issues)?;
    info!("Loaded {} issues from {}", report.issues.len(), args.issues);

    let changed = load_changed_lines(args.diff.as_deref(), args.base.as_deref())?;
    let resolver = link::resolver(&config);
    let issues = super::assemble(&config, report.issues, changed.as_ref(), &resolver)?;

    let engine = TemplateEngine::global();
    for mode in [CommentMode::Inline, CommentMode::Global] {
        let compiled = engine
            .compile(mode.template_name(), mode.template_source(&config))
            .with_context(|| format!("Invalid {} template", mode.template_name()))?;
        debug!("Template '{}' ready", compiled.name());
    }
    debug!("{} templates cached", engine.cached());

    let max_parallel = args.max_parallel.or(config.comment.max_parallel);
    let rendered = render_comments(config.clone(), resolver, &issues, max_parallel).await;

    match args.output.as_deref() {
        Some(path) => write_output(path, &rendered)?,
        None => print!("{}", format_markdown(&rendered)),
    }

    if rendered.failed > 0 {
        bail!("{} comment(s) failed to render", rendered.failed);
    }
    Ok(())
}

/// Render inline comments concurrently, then the global comment
///
/// Inline comments come back in the order of their groups. A failed render is
/// logged and counted; the others are kept.
pub async fn render_comments(
    config: Arc<Config>,
    resolver: RuleLinkResolver,
    issues: &[ReportIssue],
    max_parallel: Option<usize>,
) -> RenderedComments {
    let revision = config.commit_sha().to_string();
    let groups = super::group_inline(&config, issues);
    let total_groups = groups.len();
    info!("Rendering {} inline comments", total_groups);

    debug!("Creating render futures for {} groups", total_groups);
    let futures: Vec<_> = groups
        .into_iter()
        .enumerate()
        .map(|(i, group)| {
            let config = config.clone();
            let resolver = resolver.clone();
            let revision = revision.clone();
            async move {
                let result = tokio::task::spawn_blocking(move || {
                    render_inline(&config, resolver, revision, group)
                })
                .await
                .map_err(anyhow::Error::from)
                .and_then(|r| r.map_err(anyhow::Error::from));
                (i, result)
            }
        })
        .collect();

    let mut results = if let Some(max_renders) = max_parallel.filter(|max| *max > 0) {
        info!("Rendering with max parallelism: {}", max_renders);
        // Limit parallel execution using a worker pool
        use futures::stream::{FuturesUnordered, StreamExt};
        let mut stream = FuturesUnordered::new();
        let mut results = Vec::new();
        let mut futures_iter = futures.into_iter();

        for _ in 0..max_renders.min(futures_iter.len()) {
            if let Some(fut) = futures_iter.next() {
                stream.push(fut);
            }
        }

        // As renders complete, start new ones to maintain pool size
        while let Some(result) = stream.next().await {
            results.push(result);
            if let Some(fut) = futures_iter.next() {
                stream.push(fut);
            }
        }

        results
    } else {
        join_all(futures).await
    };
    results.sort_by_key(|(i, _)| *i);

    let mut rendered = RenderedComments::default();
    for (i, result) in results {
        match result {
            Ok(comment) => {
                trace!("[Comment {}] {}:{} rendered", i, comment.file, comment.line);
                rendered.inline.push(comment);
            }
            Err(e) => {
                error!("[Comment {}] Failed to render inline comment: {:#}", i, e);
                rendered.failed += 1;
            }
        }
    }

    if config.comment.disable_global {
        debug!("Global comment disabled");
    } else {
        let builder = CommentBuilder::new(&config, TemplateEngine::global(), resolver);
        match builder.build_global(&Location::revision(revision), issues) {
            Ok(body) => rendered.global = Some(body),
            Err(CommentError::RenderingFailed(e)) => {
                error!("Failed to render global template '{}': {}", e.template(), e);
                rendered.failed += 1;
            }
            Err(e) => {
                error!("Failed to render global comment: {}", e);
                rendered.failed += 1;
            }
        }
    }

    info!(
        "Rendering complete: {} inline, {} failed",
        rendered.inline.len(),
        rendered.failed
    );
    rendered
}

fn render_inline(
    config: &Config,
    resolver: RuleLinkResolver,
    revision: String,
    group: InlineGroup,
) -> Result<InlineComment, CommentError> {
    let builder = CommentBuilder::new(config, TemplateEngine::global(), resolver);
    let location = Location::inline(revision.clone(), Some(group.file.clone()), Some(group.line));
    let body = builder.build_inline(&location, &group.issues)?;
    Ok(InlineComment {
        file: group.file,
        line: group.line,
        revision,
        body,
    })
}

/// Read the analysis report from a file, or stdin for `-`
fn read_report(path: &str) -> anyhow::Result<AnalysisReport> {
    let content = if path == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read issues from stdin")?;
        content
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read issues {}", path))?
    };
    serde_json::from_str(&content).with_context(|| format!("Invalid issues file {}", path))
}

/// Changed lines from a diff file, or from git when a base is given
fn load_changed_lines(
    diff_path: Option<&str>,
    base: Option<&str>,
) -> anyhow::Result<Option<ChangedLines>> {
    let diff = match (diff_path, base) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read diff {}", path))?,
        (None, Some(base)) => {
            let base = util::Base::parse(base);
            debug!("Resolved base: {:?}", base);
            util::get_diff(&base)?
        }
        (None, None) => {
            warn!("No diff given, every issue with a line is treated as changed");
            return Ok(None);
        }
    };
    let changed = ChangedLines::parse(&diff);
    info!("Found changes in {} files", changed.file_count());
    Ok(Some(changed))
}

fn write_output(path: &str, rendered: &RenderedComments) -> anyhow::Result<()> {
    let content = if path.ends_with(".json") {
        serde_json::to_string_pretty(rendered)?
    } else if path.ends_with(".md") {
        format_markdown(rendered)
    } else {
        bail!("Output file must end with .md or .json");
    };

    std::fs::write(path, content).with_context(|| format!("Failed to write output file {}", path))?;
    info!("Comments written to {}", path);
    Ok(())
}

/// Markdown listing of every rendered comment, global first
pub fn format_markdown(rendered: &RenderedComments) -> String {
    let mut output = String::new();
    if let Some(global) = &rendered.global {
        output.push_str("# Global comment\n\n");
        output.push_str(global);
        output.push('\n');
    }
    for comment in &rendered.inline {
        output.push_str(&format!("# {}:{}\n\n", comment.file, comment.line));
        output.push_str(&comment.body);
        output.push('\n');
    }
    output
}
