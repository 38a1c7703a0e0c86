//! Score Downloader (jmuse-dl) - Main entry point
//!
//! Downloads a score's audio, MIDI and pages, and merges the pages into a PDF.
//! Configuration priority: CLI flag / ENV → TOML file → built-in defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use jmuse_common::config::{load_or_default, resolve_config_path, write_toml_config, SeedConfig};
use jmuse_common::{SeedStrategy, TomlConfig};
use jmuse_dl::config::{CliOverrides, RunConfig};
use jmuse_dl::console::{self, ConsolePrompter, ConsoleReporter, NoPrompt, Prompter};
use jmuse_dl::services::JmuseClient;
use jmuse_dl::{Pipeline, PipelineError, RunSummary};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ", ",
    env!("BUILD_PROFILE"),
    ")"
);

/// Command-line arguments for jmuse-dl
#[derive(Parser, Debug)]
#[command(name = "jmuse-dl")]
#[command(about = "Download a score's audio, MIDI and sheet music as PDF")]
#[command(version, long_version = LONG_VERSION)]
struct Args {
    /// Score page URL (prompted for when omitted)
    url: Option<String>,

    /// Score name used for output files (defaults to the page title)
    #[arg(short, long)]
    name: Option<String>,

    /// Output folder (defaults to <output root>/<score name>)
    #[arg(short, long, env = "JMUSE_OUTPUT")]
    output: Option<PathBuf>,

    /// Use this encryption seed instead of discovering it
    #[arg(long, env = "JMUSE_SEED")]
    seed: Option<String>,

    /// How to obtain the seed: discover | constant
    #[arg(long, env = "JMUSE_SEED_STRATEGY")]
    seed_strategy: Option<SeedStrategy>,

    /// Score service root URL
    #[arg(long, env = "JMUSE_API_BASE")]
    api_base: Option<String>,

    /// Config file path
    #[arg(long, env = "JMUSE_CONFIG")]
    config: Option<PathBuf>,

    /// Accept every default without prompting
    #[arg(short, long)]
    yes: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    write_config: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            api_base_url: self.api_base.clone(),
            seed: self.seed.clone(),
            seed_strategy: self.seed_strategy,
            name: self.name.clone(),
            output: self.output.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let outcome = runtime.block_on(run(args));

    // A stdin read or page assembly left behind by Ctrl+C must not keep the
    // process alive
    runtime.shutdown_background();

    console::nl();
    console::negative("Bye !");
    outcome
}

async fn run(args: Args) -> Result<()> {
    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config =
        load_or_default(config_path.as_deref()).context("Failed to load configuration")?;

    let current_dir = std::env::current_dir().context("Failed to read current directory")?;
    let run_config = RunConfig::resolve(args.overrides(), &toml_config, current_dir);

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(&run_config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting jmuse-dl {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );
    match config_path.as_deref().filter(|path| path.exists()) {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!("No configuration file, using defaults"),
    }

    if args.write_config {
        let path = config_path.context("No config file location available on this platform")?;
        let effective = apply_overrides(toml_config, &args);
        write_toml_config(&effective, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        console::positive(format!("Configuration written : {}", path.display()));
        return Ok(());
    }

    info!(api = %run_config.client.api_base_url, "Score service");

    let client =
        JmuseClient::new(&run_config.client).context("Failed to initialize HTTP client")?;
    let pipeline = Pipeline::new(
        client,
        run_config.seed_provider(),
        run_config.pipeline.clone(),
    )
    .with_reporter(Box::new(ConsoleReporter));

    let mut prompter: Box<dyn Prompter> = if args.yes {
        Box::new(NoPrompt)
    } else {
        Box::new(ConsolePrompter::new())
    };

    // Ctrl+C is polled first so its handler is installed before any prompt.
    // Dropping the pipeline future closes open files and the session.
    tokio::select! {
        biased;

        interrupted = signal::ctrl_c() => {
            interrupted.context("Failed to install Ctrl+C handler")?;
            info!("Received Ctrl+C, stopping");
            console::nl();
            console::warning("Interrupted");
        }
        result = download(&pipeline, args.url, prompter.as_mut()) => {
            let summary = result?;
            info!(folder = %summary.folder.display(), pages = summary.page_count, "Run complete");
        }
    }

    Ok(())
}

/// Filter used when `RUST_LOG` is unset
fn default_filter(level: &str) -> String {
    format!("jmuse_dl={level},jmuse_common={level}")
}

/// Ask for the URL when none was given, then run the pipeline
async fn download(
    pipeline: &Pipeline,
    url: Option<String>,
    prompter: &mut dyn Prompter,
) -> Result<RunSummary> {
    let url = match url {
        Some(url) => url,
        None => prompter
            .ask("Score URL", None)
            .await
            .context("Failed to read score URL")?
            .ok_or_else(|| PipelineError::InvalidInput("no score URL given".to_string()))?,
    };

    let summary = pipeline
        .run(&url, prompter)
        .await
        .with_context(|| format!("Failed to download {}", url.trim()))?;
    Ok(summary)
}

/// File config with CLI/ENV values folded in, for `--write-config`
fn apply_overrides(mut config: TomlConfig, args: &Args) -> TomlConfig {
    if let Some(api_base) = &args.api_base {
        config.api_base_url = Some(api_base.clone());
    }
    if let Some(seed) = &args.seed {
        config.seed = SeedConfig {
            strategy: SeedStrategy::Constant,
            value: Some(seed.clone()),
        };
    } else if let Some(strategy) = args.seed_strategy {
        config.seed.strategy = strategy;
    }
    config
}
