//! gridwatch scenario runner
//!
//! Exit codes: 0 when every scenario passes, 1 when any scenario fails,
//! 2 on configuration or infrastructure errors.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gridwatch_e2e::config::{EnvConfig, DEFAULT_ENV_DIR};
use gridwatch_e2e::driver::Browser;
use gridwatch_e2e::runner::{RunnerConfig, TestRunner, TestSuiteResult};

#[derive(Parser, Debug)]
#[command(name = "gridwatch")]
#[command(about = "Browser scenarios for data grids and paginated listings")]
#[command(version)]
struct Args {
    /// Path to scenario specs directory
    #[arg(short, long, default_value = "specs")]
    specs: PathBuf,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// Directory holding `.env.<ENV>` files
    #[arg(long, default_value = DEFAULT_ENV_DIR)]
    env_dir: PathBuf,

    /// Browser to use (chromium, firefox, webkit); overrides BROWSER
    #[arg(long)]
    browser: Option<String>,

    /// Show the browser window; overrides HEAD
    #[arg(long)]
    headed: bool,

    /// Per-step timeout in milliseconds; overrides STEP_TIMEOUT_MS
    #[arg(long)]
    step_timeout_ms: Option<u64>,

    /// Deadline for a grid to render, in milliseconds
    #[arg(long, default_value = "15000")]
    grid_timeout_ms: u64,

    /// Skip the base URL reachability check
    #[arg(long)]
    skip_preflight: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("gridwatch v{}", gridwatch_common::VERSION);

    match run(args).await {
        Ok(results) if results.success() => std::process::exit(0),
        Ok(_) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    }
}

async fn run(args: Args) -> anyhow::Result<TestSuiteResult> {
    let mut env = EnvConfig::from_env(&args.env_dir).context("Failed to load environment")?;

    if let Some(name) = &args.browser {
        env.browser = Browser::parse(name)
            .with_context(|| format!("Unknown browser '{}'", name))?;
    }
    if args.headed {
        env.headless = false;
    }

    let step_timeout = args
        .step_timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(env.step_timeout);

    let config = RunnerConfig {
        specs_dir: args.specs,
        output_dir: args.output,
        tag: args.tag,
        name: args.name,
        step_timeout,
        grid_load_timeout: Duration::from_millis(args.grid_timeout_ms),
        preflight: !args.skip_preflight,
        ..RunnerConfig::default()
    };

    let runner = TestRunner::with_playwright(config, env);
    let results = runner.run_all().await?;
    runner.write_results(&results)?;

    Ok(results)
}
