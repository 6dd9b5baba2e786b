//! Recording loop
//!
//! A [`Recorder`] pulls deltas from its source, feeds them through the
//! sampler and hands every emitted snapshot to a [`SinkWorker`]. One recorder
//! tracks one instrument; run several side by side with `tokio::spawn`.

use crate::config::RecorderConfig;
use crate::csv::format_timestamp;
use crate::diagnostics::Diagnostics;
use crate::error::RecorderError;
use crate::sink::{SinkStats, SinkWorker, SnapshotSink};
use crate::source::DeltaSource;
use depthtape_book::{Sampler, SamplerState};
use depthtape_types::Instrument;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, instrument};

/// Why a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The source reported end-of-stream
    EndOfStream,
    /// Shutdown was requested through a [`ShutdownHandle`]
    Shutdown,
}

/// Counters for a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub exit: ExitReason,
    /// Deltas applied to the book
    pub deltas_applied: u64,
    /// Snapshots the sampler emitted
    pub snapshots_emitted: u64,
    /// Source events rejected as malformed
    pub rejected: u64,
    /// Deltas older than their predecessor
    pub out_of_order: u64,
    /// What the sink actually persisted
    pub sink: SinkStats,
}

/// Requests a graceful stop of a running recorder
///
/// The recorder finishes the delta it is processing, drains the sink and
/// returns [`ExitReason::Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Request shutdown
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    /// True once shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Drives one instrument from a delta source into a snapshot sink
pub struct Recorder<S, K> {
    config: RecorderConfig,
    instrument: Instrument,
    sampler: Sampler,
    source: S,
    sink: K,
    diagnostics: Arc<dyn Diagnostics>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S, K> Recorder<S, K>
where
    S: DeltaSource,
    K: SnapshotSink + 'static,
{
    /// Validate `config` and assemble a recorder
    pub fn new(
        config: RecorderConfig,
        source: S,
        sink: K,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, RecorderError> {
        config.validate()?;
        let sampler = Sampler::new(config.sampler_config()?);

        let expected = config.mode.source_mode();
        if source.mode() != expected {
            diagnostics.warn(&format!(
                "configured for {expected} mode but the source is {}",
                source.mode()
            ));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            instrument: config.instrument(),
            config,
            sampler,
            source,
            sink,
            diagnostics,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    /// Handle that stops this recorder from another task
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Instrument being recorded
    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Run until end-of-stream, shutdown or a fatal source error
    ///
    /// Malformed events and sink failures are reported to diagnostics and do
    /// not stop the run. On a fatal source error the sink is drained first, so
    /// the returned `resume_from` reflects everything persisted.
    #[instrument(skip_all, fields(instrument = %self.instrument))]
    pub async fn run(self) -> Result<RunSummary, RecorderError> {
        let Self {
            config,
            instrument,
            mut sampler,
            mut source,
            sink,
            diagnostics,
            shutdown_tx: _shutdown_tx,
            shutdown_rx: mut shutdown,
        } = self;

        let worker = SinkWorker::spawn(sink, config.channel_capacity, diagnostics.clone());
        diagnostics.info(&format!(
            "recording {instrument} at depth {} every {}ms ({} source)",
            config.depth,
            config.interval_ms,
            source.mode()
        ));

        let mut rejected = 0u64;
        let mut warned_out_of_order = false;

        let exit = loop {
            let next = tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    let stop = changed.is_err() || *shutdown.borrow_and_update();
                    if stop {
                        break ExitReason::Shutdown;
                    }
                    continue;
                }
                next = source.next_delta() => next,
            };

            match next {
                Ok(Some(delta)) => {
                    let emissions = sampler.consume(&delta);

                    if !warned_out_of_order && sampler.out_of_order() > 0 {
                        warned_out_of_order = true;
                        diagnostics.warn(&format!(
                            "out-of-order delta at {}, applied in arrival order",
                            format_timestamp(delta.exchange_timestamp)
                        ));
                    }

                    for record in emissions {
                        if worker.send(record).await.is_err() {
                            diagnostics.error("snapshot sink stopped accepting records");
                            worker.close().await;
                            return Err(RecorderError::SinkClosed);
                        }
                    }
                }
                Ok(None) => break ExitReason::EndOfStream,
                Err(e) if e.is_recoverable() => {
                    rejected += 1;
                    diagnostics.warn(&format!("rejected source event: {e}"));
                }
                Err(e) => {
                    diagnostics.error(&format!("source failed: {e}"));
                    sampler.finish();
                    let stats = worker.close().await;
                    if let Some(at) = stats.last_persisted {
                        diagnostics.info(&format!("resume from {}", format_timestamp(at)));
                    }
                    return Err(RecorderError::Source {
                        source: e,
                        resume_from: stats.last_persisted,
                    });
                }
            }
        };

        sampler.finish();
        debug_assert_eq!(sampler.state(), SamplerState::Finished);
        let sink = worker.close().await;

        let summary = RunSummary {
            exit,
            deltas_applied: sampler.deltas_applied(),
            snapshots_emitted: sampler.snapshots_emitted(),
            rejected,
            out_of_order: sampler.out_of_order(),
            sink,
        };
        debug!(?summary, "recorder finished");
        diagnostics.info(&format!(
            "stopped ({exit:?}): {} deltas, {} snapshots, {} written, {} failed, {} rejected",
            summary.deltas_applied,
            summary.snapshots_emitted,
            summary.sink.written,
            summary.sink.failed,
            summary.rejected
        ));

        Ok(summary)
    }
}
