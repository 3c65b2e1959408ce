mod cli;
mod config;
mod render;
mod report;
mod rule;
mod types;
mod util;

use clap::Parser;
use cli::{Cli, Commands, InitArgs};
use config::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init(args) => init(&args),
        Commands::Render(args) => match Config::load(&args.config, &args.config_overrides) {
            Ok(config) => report::orchestrator::run(config, &args).await,
            Err(e) => Err(e),
        },
        Commands::Schema => print_schema(),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(EXIT_FAILURE);
    }
}

fn init(args: &InitArgs) -> anyhow::Result<()> {
    if std::path::Path::new(&args.config).exists() && !args.r#override {
        anyhow::bail!(
            "{} already exists (use --override to replace it)",
            args.config
        );
    }
    std::fs::write(&args.config, config::DEFAULT_CONFIG)?;
    info!("Config written to {}", args.config);
    Ok(())
}

fn print_schema() -> anyhow::Result<()> {
    let schema = schemars::schema_for!(report::AnalysisReport);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
