//! Snapshot sinks
//!
//! A [`SnapshotSink`] durably appends records. The recorder never writes to a
//! sink directly: it hands records to a [`SinkWorker`], a tokio task that owns
//! the sink, so slow or failing writes cannot stall sampling.

use crate::csv;
use crate::diagnostics::Diagnostics;
use async_trait::async_trait;
use depthtape_types::{SinkError, SnapshotRecord, Timestamp};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{
    AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader, BufWriter,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Append-only destination for snapshot records
#[async_trait]
pub trait SnapshotSink: Send {
    /// Durably append one record; ownership moves to the sink
    async fn append(&mut self, record: SnapshotRecord) -> Result<(), SinkError>;

    /// Flush anything buffered
    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// CSV file sink
///
/// The header is written only when the file is empty at open time, so
/// reopening an existing output appends rows without repeating it. An
/// existing file must carry the header for the same depth, and a row cut
/// short by a crash is terminated before anything new is appended.
pub struct CsvSink {
    path: PathBuf,
    depth: usize,
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Open `path` for appending, creating it and its parent directories
    pub async fn open(path: impl AsRef<Path>, depth: usize) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let existing_len = file.metadata().await?.len();

        let mut writer = BufWriter::new(file);
        if existing_len == 0 {
            writer.write_all(csv::header(depth).as_bytes()).await?;
            writer.flush().await?;
            debug!(path = %path.display(), "created snapshot file");
        } else {
            let (first_line, terminated) = inspect_existing(&path).await?;
            let header = csv::header(depth);
            if first_line != header.as_bytes() {
                return Err(SinkError::Rejected(format!(
                    "{} has header {:?}, expected the depth {depth} header",
                    path.display(),
                    String::from_utf8_lossy(&first_line).trim_end()
                )));
            }
            if !terminated {
                writer.write_all(b"\n").await?;
                writer.flush().await?;
                warn!(path = %path.display(), "terminated partial last row");
            }
            debug!(path = %path.display(), bytes = existing_len, "appending to existing snapshot file");
        }

        Ok(Self {
            path,
            depth,
            writer,
        })
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// First line of a non-empty file and whether the file ends in a newline
async fn inspect_existing(path: &Path) -> Result<(Vec<u8>, bool), SinkError> {
    let mut file = File::open(path).await?;

    let mut first_line = Vec::new();
    BufReader::new(&mut file)
        .read_until(b'\n', &mut first_line)
        .await?;

    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;

    Ok((first_line, last[0] == b'\n'))
}

#[async_trait]
impl SnapshotSink for CsvSink {
    async fn append(&mut self, record: SnapshotRecord) -> Result<(), SinkError> {
        if record.depth() != self.depth {
            return Err(SinkError::Rejected(format!(
                "record depth {} does not match {} columns of {}",
                record.depth(),
                self.depth,
                self.path.display()
            )));
        }
        self.writer.write_all(csv::row(&record).as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// In-memory sink with optional failure injection
///
/// Clones share the same storage, so a test can keep one handle and move
/// another into the recorder.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<SnapshotRecord>>>,
    attempts: Arc<Mutex<usize>>,
    fail_from: Option<usize>,
    fail_on: Arc<HashSet<usize>>,
}

impl MemorySink {
    /// Create an empty sink that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the first `n` appends, reject every one after
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_from: Some(n),
            ..Self::default()
        }
    }

    /// Reject the appends at the given zero-based attempt indices
    pub fn failing_on(attempts: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_on: Arc::new(attempts.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Copy of the stored records
    pub fn records(&self) -> Vec<SnapshotRecord> {
        self.records.lock().clone()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check if nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Number of append calls, including rejected ones
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl SnapshotSink for MemorySink {
    async fn append(&mut self, record: SnapshotRecord) -> Result<(), SinkError> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            let attempt = *attempts;
            *attempts += 1;
            attempt
        };

        let fail = self.fail_from.is_some_and(|n| attempt >= n) || self.fail_on.contains(&attempt);
        if fail {
            return Err(SinkError::Rejected(format!("injected failure on append {attempt}")));
        }

        self.records.lock().push(record);
        Ok(())
    }
}

/// Outcome of a sink worker's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SinkStats {
    /// Records appended successfully
    pub written: u64,
    /// Records the sink rejected or failed to write
    pub failed: u64,
    /// Timestamp of the last record appended successfully
    pub last_persisted: Option<Timestamp>,
}

/// Background task that owns a sink and appends records in arrival order
///
/// Append failures are reported to diagnostics and the record is dropped; the
/// worker keeps draining. Retrying is left to the sink implementation.
pub struct SinkWorker {
    tx: mpsc::Sender<SnapshotRecord>,
    handle: JoinHandle<SinkStats>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl SinkWorker {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn<K>(sink: K, capacity: usize, diagnostics: Arc<dyn Diagnostics>) -> Self
    where
        K: SnapshotSink + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(drain(sink, rx, diagnostics.clone()));
        Self {
            tx,
            handle,
            diagnostics,
        }
    }

    /// Queue a record, waiting for room if the worker is behind
    ///
    /// Returns the record back if the worker has stopped.
    pub async fn send(&self, record: SnapshotRecord) -> Result<(), SnapshotRecord> {
        self.tx.send(record).await.map_err(|e| e.0)
    }

    /// Stop accepting records, wait for the queue to drain and flush
    pub async fn close(self) -> SinkStats {
        drop(self.tx);
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                self.diagnostics
                    .error(&format!("sink worker terminated abnormally: {e}"));
                SinkStats::default()
            }
        }
    }
}

async fn drain<K>(
    mut sink: K,
    mut rx: mpsc::Receiver<SnapshotRecord>,
    diagnostics: Arc<dyn Diagnostics>,
) -> SinkStats
where
    K: SnapshotSink,
{
    let mut stats = SinkStats::default();

    while let Some(record) = rx.recv().await {
        let timestamp = record.timestamp;
        match sink.append(record).await {
            Ok(()) => {
                stats.written += 1;
                stats.last_persisted = Some(timestamp);
            }
            Err(e) => {
                stats.failed += 1;
                diagnostics.error(&format!(
                    "failed to persist snapshot at {}: {e}",
                    csv::format_timestamp(timestamp)
                ));
            }
        }
    }

    if let Err(e) = sink.flush().await {
        diagnostics.error(&format!("failed to flush snapshot sink: {e}"));
    }

    debug!(written = stats.written, failed = stats.failed, "sink worker drained");
    stats
}
