//! weft TUI
//!
//! Terminal viewer for one workflow run's history.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use weft_core::WorkflowExecution;
use weft_history::JsonFileProvider;
use weft_tui::{TuiApp, ViewerConfig};

#[derive(Parser)]
#[command(name = "weft-tui")]
#[command(about = "Browse a workflow history as a unit tree and a timeline", long_about = None)]
struct Args {
    /// Exported history file (JSON)
    #[arg(long)]
    history: PathBuf,

    /// Workflow id shown in status lines
    #[arg(long, default_value = "local")]
    workflow_id: String,

    /// Run id
    #[arg(long)]
    run_id: Option<String>,

    /// Fetch timeout in seconds, overrides the config file
    #[arg(long)]
    timeout: Option<u64>,

    /// Viewer config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file; the terminal is taken by the UI
    #[arg(long, default_value = "weft-tui.log")]
    log_file: PathBuf,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).wrap_err_with(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("weft=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(timeout) = args.timeout {
        config.fetch_timeout_secs = timeout;
    }
    config.validate()?;

    let mut execution = WorkflowExecution::latest(args.workflow_id);
    if let Some(run_id) = args.run_id {
        execution = execution.with_run(run_id);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("weft-fetch")
        .enable_all()
        .build()
        .wrap_err("starting fetch runtime")?;

    tracing::info!(history = %args.history.display(), %execution, "starting viewer");
    let provider = Arc::new(JsonFileProvider::new(args.history));
    let mut app = TuiApp::new(config, provider, execution, runtime.handle().clone());
    app.run()?;

    Ok(())
}
