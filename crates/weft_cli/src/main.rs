//! weft CLI
//!
//! Print a workflow history as a unit tree, an ASCII timeline or a raw
//! event listing.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod render;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use render::Palette;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use weft_core::{Timestamp, WorkflowExecution};
use weft_history::{CorrelatedEvent, JsonFileProvider, fetch_history};
use weft_timeline::{Lane, Timeline, TimelineLayout, Viewport};
use weft_tree::{ForestOptions, build_forest};

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "weft - workflow histories as trees and timelines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Exported history file (JSON)
    #[arg(long)]
    history: PathBuf,

    /// Fetch timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the unit tree
    Tree {
        #[command(flatten)]
        source: Source,
        /// Emit the forest as JSON
        #[arg(long)]
        json: bool,
        /// Units with children at this depth or deeper are collapsed
        #[arg(long, default_value_t = ForestOptions::default().expand_depth)]
        expand_depth: usize,
    },
    /// Draw the leaf units on a timeline
    Timeline {
        #[command(flatten)]
        source: Source,
        /// Columns for bars
        #[arg(long, default_value_t = 80)]
        width: u16,
        /// Zoom factor
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,
        /// Horizontal scroll in columns
        #[arg(long, default_value_t = 0.0)]
        scroll: f64,
        /// Columns for lane labels
        #[arg(long, default_value_t = 24)]
        label_width: usize,
        /// Emit lanes and layout as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the raw events
    Events {
        #[command(flatten)]
        source: Source,
    },
}

#[derive(Serialize)]
struct TimelineReport<'a> {
    lanes: &'a [Lane],
    #[serde(rename = "minStart", skip_serializing_if = "Option::is_none")]
    min_start: Option<Timestamp>,
    #[serde(rename = "maxEnd", skip_serializing_if = "Option::is_none")]
    max_end: Option<Timestamp>,
    layout: TimelineLayout,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("weft=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load(source: &Source) -> Result<Vec<CorrelatedEvent>> {
    let provider = JsonFileProvider::new(&source.history);
    let execution = WorkflowExecution::latest(source.history.display().to_string());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupted, cancelling history load");
            on_interrupt.cancel();
        }
    });

    tracing::debug!(history = %source.history.display(), timeout_secs = source.timeout, "loading history");
    let events = fetch_history(&provider, &execution, Duration::from_secs(source.timeout), &cancel)
        .await
        .wrap_err_with(|| format!("loading {}", source.history.display()))?;
    tracing::debug!(count = events.len(), "history loaded");
    Ok(events)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();
    let cli = Cli::parse();
    let palette = Palette::detect();

    match cli.command {
        Commands::Tree {
            source,
            json,
            expand_depth,
        } => {
            let events = load(&source).await?;
            let forest = build_forest(events, &ForestOptions { expand_depth });
            tracing::debug!(units = forest.unit_count(), "forest built");
            if json {
                println!("{}", serde_json::to_string_pretty(&forest)?);
            } else {
                print!("{}", render::tree(&forest, palette));
            }
            Ok(())
        }
        Commands::Timeline {
            source,
            width,
            zoom,
            scroll,
            label_width,
            json,
        } => {
            let events = load(&source).await?;
            let forest = build_forest(events, &ForestOptions::default());
            let timeline = Timeline::from_forest(&forest, Timestamp::now());
            let viewport = Viewport::new(width)?.with_zoom(zoom)?.with_scroll(scroll)?;
            if json {
                let report = TimelineReport {
                    lanes: timeline.lanes(),
                    min_start: timeline.window().map(|w| w.min_start),
                    max_end: timeline.window().map(|w| w.max_end),
                    layout: timeline.layout(&viewport),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::timeline(&timeline, &viewport, label_width, palette));
            }
            Ok(())
        }
        Commands::Events { source } => {
            let events = load(&source).await?;
            print!("{}", render::events(&events, palette));
            Ok(())
        }
    }
}
