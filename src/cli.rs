use clap::{Parser, Subcommand};

// Display order for log level option (placed at end of help text)
const LOG_LEVEL_DISPLAY_ORDER: usize = 100;

/// CLI arguments
#[derive(Parser)]
#[command(name = "mrnote", version, about = "Render static-analysis issues into merge request comments", long_about = None)]
pub struct Cli {
    /// Log level (see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
    /// [env: MRNOTE_LOG=] [default: info]
    #[arg(
        long,
        env = "MRNOTE_LOG",
        default_value = "info",
        global = true,
        hide_default_value = true,
        hide_env = true,
        display_order = LOG_LEVEL_DISPLAY_ORDER,
        verbatim_doc_comment
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a default mrnote.toml config file
    Init(InitArgs),
    /// Render comments for analysis issues
    Render(RenderArgs),
    /// Print the JSON schema of the issues file
    Schema,
}

/// Arguments for the init command
#[derive(Parser)]
pub struct InitArgs {
    /// Path to config file
    #[arg(long, default_value = "mrnote.toml")]
    pub config: String,

    /// Override existing config file
    #[arg(long)]
    pub r#override: bool,
}

/// Arguments for the render command
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Path to config file (initialize with `mrnote init`)
    #[arg(long, default_value = "mrnote.toml")]
    pub config: String,

    /// Override config values using dot notation (e.g. revision.commit_sha=abc123)
    #[arg(long = "config-override")]
    pub config_overrides: Vec<String>,

    /// Issues file produced by the analysis (JSON, `-` for stdin)
    #[arg(long)]
    pub issues: String,

    /// Unified diff of the revision, used to decide which issues are on changed lines
    #[arg(long, conflicts_with = "base")]
    pub diff: Option<String>,

    /// Base commit to diff against with git when no --diff is given.
    /// Examples: HEAD^ or ^, HEAD~1 or ~1, commit hash.
    /// ROOT treats every line as changed
    #[arg(long, verbatim_doc_comment)]
    pub base: Option<String>,

    /// Output file path (.md or .json), stdout when omitted
    #[arg(long)]
    pub output: Option<String>,

    /// Maximum number of inline comments rendered concurrently
    #[arg(long)]
    pub max_parallel: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from([
            "mrnote",
            "render",
            "--issues",
            "issues.json",
            "--config-override",
            "revision.commit_sha=abc",
            "--config-override",
            "comment.ping_user=true",
            "--max-parallel",
            "4",
        ])
        .unwrap();
        let Commands::Render(args) = cli.command else {
            panic!("expected render command");
        };
        assert_eq!(args.config, "mrnote.toml");
        assert_eq!(args.config_overrides.len(), 2);
        assert_eq!(args.max_parallel, Some(4));
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_diff_conflicts_with_base() {
        let result = Cli::try_parse_from([
            "mrnote", "render", "--issues", "i.json", "--diff", "d.patch", "--base", "^",
        ]);
        assert!(result.is_err());
    }
}
