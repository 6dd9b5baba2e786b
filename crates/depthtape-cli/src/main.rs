//! depthtape - record fixed-interval order book snapshots
//!
//! ```text
//! # Replay a capture into data/bybit_BTCUSDT_book_snapshot_10_60000ms.csv
//! depthtape -e bybit -s BTCUSDT --input deltas.jsonl \
//!     --from 2024-03-01T00:00:00Z --to 2024-03-02T00:00:00Z
//!
//! # Record a live feed piped from a collector until Ctrl-C
//! collector | depthtape --config btc.json --log-file logs/btc.log
//! ```
//!
//! Standard input is read on a dedicated thread, so Ctrl-C stops the run
//! promptly even while the upstream pipe is idle.
//!
//! Exit status is 0 when the input ends or Ctrl-C stops the run, and 1 on a
//! configuration error or a fatal input error.

mod args;
mod logging;

use anyhow::Result;
use args::Args;
use clap::Parser;
use depthtape_recorder::csv::format_timestamp;
use depthtape_recorder::prelude::*;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _guard = match logging::init(args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args).await {
        Ok(summary) => {
            info!(
                "{:?}: {} snapshots written, {} failed, {} events rejected",
                summary.exit, summary.sink.written, summary.sink.failed, summary.rejected
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            let resume_from = e
                .downcast_ref::<RecorderError>()
                .and_then(RecorderError::resume_from);
            if let Some(at) = resume_from {
                eprintln!("resume from {}", format_timestamp(at));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<RunSummary> {
    let config = args.recorder_config()?;
    info!(
        "Recording {} (depth {}, every {}ms) to {}",
        config.instrument(),
        config.depth,
        config.interval_ms,
        config.output_path().display()
    );

    let range = config.mode.replay_range();
    if args.reads_stdin() {
        let source = BlockingLinesSource::stdin()?;
        match range {
            Some(range) => record(config, source.with_range(range)).await,
            None => record(config, source).await,
        }
    } else {
        let source = JsonLinesSource::open(&args.input).await?;
        match range {
            Some(range) => record(config, source.with_range(range)).await,
            None => record(config, source).await,
        }
    }
}

async fn record<S>(config: RecorderConfig, source: S) -> Result<RunSummary>
where
    S: DeltaSource,
{
    let sink = CsvSink::open(config.output_path(), config.depth).await?;
    let diagnostics = Arc::new(TracingDiagnostics::new(&config.instrument()));
    let recorder = Recorder::new(config, source, sink, diagnostics)?;

    let shutdown = recorder.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, finishing current delta");
                shutdown.shutdown();
            }
            Err(e) => warn!("Ctrl-C handler unavailable: {e}"),
        }
    });

    Ok(recorder.run().await?)
}
