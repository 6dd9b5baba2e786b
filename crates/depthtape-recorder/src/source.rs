//! Delta sources
//!
//! A [`DeltaSource`] yields book deltas in arrival order. `Ok(None)` is a
//! clean end-of-stream; an `Err` that is not
//! [recoverable](SourceError::is_recoverable) is a disconnection.
//!
//! - [`ReplaySource`] replays an in-memory sequence
//! - [`JsonLinesSource`] decodes one JSON delta per line from any async reader
//! - [`BlockingLinesSource`] does the same for a blocking reader such as stdin
//! - [`ChannelSource`] receives live deltas pushed through a [`LiveFeed`]

use crate::config::ReplayRange;
use async_trait::async_trait;
use depthtape_types::{BookDelta, DeltaError, SourceError, SourceMode};
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// Ordered stream of book deltas for one instrument
#[async_trait]
pub trait DeltaSource: Send {
    /// Next delta, `Ok(None)` at end-of-stream
    async fn next_delta(&mut self) -> Result<Option<BookDelta>, SourceError>;

    /// Whether the stream is live or a bounded replay
    fn mode(&self) -> SourceMode;
}

/// Outcome of checking a delta against an optional replay window
enum Window {
    Keep,
    Skip,
    End,
}

fn check_window(range: Option<&ReplayRange>, delta: &BookDelta) -> Window {
    match range {
        None => Window::Keep,
        Some(range) if range.is_past(delta.exchange_timestamp) => Window::End,
        Some(range) if range.contains(delta.exchange_timestamp) => Window::Keep,
        Some(_) => Window::Skip,
    }
}

/// Replays an in-memory sequence of deltas
///
/// Invalid deltas are reported as [`SourceError::Malformed`] with their
/// one-based position.
pub struct ReplaySource<I> {
    deltas: I,
    range: Option<ReplayRange>,
    position: u64,
    ended: bool,
}

impl<I> ReplaySource<I>
where
    I: Iterator<Item = BookDelta>,
{
    /// Replay every delta in `deltas`
    pub fn new(deltas: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            deltas: deltas.into_iter(),
            range: None,
            position: 0,
            ended: false,
        }
    }

    /// Only yield deltas inside `[from, to)`
    pub fn with_range(mut self, range: ReplayRange) -> Self {
        self.range = Some(range);
        self
    }
}

#[async_trait]
impl<I> DeltaSource for ReplaySource<I>
where
    I: Iterator<Item = BookDelta> + Send,
{
    async fn next_delta(&mut self) -> Result<Option<BookDelta>, SourceError> {
        if self.ended {
            return Ok(None);
        }

        for delta in self.deltas.by_ref() {
            self.position += 1;
            match check_window(self.range.as_ref(), &delta) {
                Window::Skip => continue,
                Window::End => break,
                Window::Keep => {
                    delta
                        .validate()
                        .map_err(|e| SourceError::malformed(self.position, e))?;
                    return Ok(Some(delta));
                }
            }
        }

        self.ended = true;
        Ok(None)
    }

    fn mode(&self) -> SourceMode {
        SourceMode::Replay
    }
}

/// Line-numbered JSON delta decoding shared by the line readers
#[derive(Debug, Default)]
struct LineDecoder {
    range: Option<ReplayRange>,
    line: u64,
}

/// What one input line turned out to be
enum Line {
    Delta(BookDelta),
    Skip,
    End,
}

impl LineDecoder {
    fn decode(&mut self, bytes: &[u8]) -> Result<Line, SourceError> {
        self.line += 1;
        let line = self.line;

        let text = std::str::from_utf8(bytes)
            .map_err(|e| SourceError::malformed(line, e))?
            .trim();
        if text.is_empty() {
            return Ok(Line::Skip);
        }

        let delta: BookDelta =
            serde_json::from_str(text).map_err(|e| SourceError::malformed(line, e))?;

        match check_window(self.range.as_ref(), &delta) {
            Window::Skip => Ok(Line::Skip),
            Window::End => Ok(Line::End),
            Window::Keep => {
                delta
                    .validate()
                    .map_err(|e| SourceError::malformed(line, e))?;
                Ok(Line::Delta(delta))
            }
        }
    }
}

/// Reads newline-delimited JSON deltas from an async reader
///
/// Blank lines are skipped. Lines that are not UTF-8 or fail to decode or
/// validate come back as [`SourceError::Malformed`] and reading can continue;
/// read failures are fatal [`SourceError::Io`].
pub struct JsonLinesSource<R> {
    reader: R,
    mode: SourceMode,
    decoder: LineDecoder,
    buf: Vec<u8>,
    ended: bool,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Read a live stream from `reader`
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            mode: SourceMode::Live,
            decoder: LineDecoder::default(),
            buf: Vec::new(),
            ended: false,
        }
    }

    /// Treat the stream as a replay bounded by `range`
    pub fn with_range(mut self, range: ReplayRange) -> Self {
        self.mode = SourceMode::Replay;
        self.decoder.range = Some(range);
        self
    }

    /// Lines read so far, including blank and rejected ones
    pub fn lines_read(&self) -> u64 {
        self.decoder.line
    }
}

impl JsonLinesSource<BufReader<tokio::fs::File>> {
    /// Open a JSON-lines file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        debug!(path = %path.as_ref().display(), "opened delta file");
        Ok(Self::new(BufReader::new(file)))
    }
}

#[async_trait]
impl<R> DeltaSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_delta(&mut self) -> Result<Option<BookDelta>, SourceError> {
        if self.ended {
            return Ok(None);
        }

        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                self.ended = true;
                return Ok(None);
            }

            match self.decoder.decode(&self.buf)? {
                Line::Delta(delta) => return Ok(Some(delta)),
                Line::Skip => continue,
                Line::End => {
                    self.ended = true;
                    return Ok(None);
                }
            }
        }
    }

    fn mode(&self) -> SourceMode {
        self.mode
    }
}

/// Reads JSON-lines deltas from a blocking reader on its own thread
///
/// Decoding matches [`JsonLinesSource`]. The reader thread is detached, so a
/// read parked on an idle pipe never holds up runtime shutdown; it exits on
/// its next line or end-of-input once the source is dropped. Use this for
/// standard input.
pub struct BlockingLinesSource {
    rx: mpsc::Receiver<std::io::Result<Vec<u8>>>,
    mode: SourceMode,
    decoder: LineDecoder,
    ended: bool,
}

impl BlockingLinesSource {
    /// Start a reader thread over `reader`, buffering up to `capacity` lines
    pub fn spawn<R>(reader: R, capacity: usize) -> Result<Self, SourceError>
    where
        R: std::io::BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        std::thread::Builder::new()
            .name("depthtape-lines".into())
            .spawn(move || read_lines(reader, tx))?;

        Ok(Self {
            rx,
            mode: SourceMode::Live,
            decoder: LineDecoder::default(),
            ended: false,
        })
    }

    /// Read deltas piped to standard input
    pub fn stdin() -> Result<Self, SourceError> {
        Self::spawn(std::io::BufReader::new(std::io::stdin()), 1024)
    }

    /// Treat the stream as a replay bounded by `range`
    pub fn with_range(mut self, range: ReplayRange) -> Self {
        self.mode = SourceMode::Replay;
        self.decoder.range = Some(range);
        self
    }

    /// Lines decoded so far, including blank and rejected ones
    pub fn lines_read(&self) -> u64 {
        self.decoder.line
    }
}

fn read_lines<R: std::io::BufRead>(mut reader: R, tx: mpsc::Sender<std::io::Result<Vec<u8>>>) {
    loop {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if tx.blocking_send(Ok(buf)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
    debug!("line reader finished");
}

#[async_trait]
impl DeltaSource for BlockingLinesSource {
    async fn next_delta(&mut self) -> Result<Option<BookDelta>, SourceError> {
        if self.ended {
            return Ok(None);
        }

        loop {
            let bytes = match self.rx.recv().await {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    self.ended = true;
                    return Err(e.into());
                }
                None => {
                    self.ended = true;
                    return Ok(None);
                }
            };

            match self.decoder.decode(&bytes)? {
                Line::Delta(delta) => return Ok(Some(delta)),
                Line::Skip => continue,
                Line::End => {
                    self.ended = true;
                    return Ok(None);
                }
            }
        }
    }

    fn mode(&self) -> SourceMode {
        self.mode
    }
}

/// Error returned by [`LiveFeed::push`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The delta failed validation and was not sent
    #[error("invalid delta: {0}")]
    Invalid(#[from] DeltaError),

    /// The receiving source has been dropped
    #[error("live feed closed")]
    Closed,
}

/// Producer half of a live channel
///
/// Clone it to feed from several tasks; the source ends once every clone is
/// dropped.
#[derive(Debug, Clone)]
pub struct LiveFeed {
    tx: mpsc::Sender<Result<BookDelta, SourceError>>,
}

impl LiveFeed {
    /// Validate and send a delta, waiting for room
    pub async fn push(&self, delta: BookDelta) -> Result<(), FeedError> {
        delta.validate()?;
        self.tx.send(Ok(delta)).await.map_err(|_| FeedError::Closed)
    }

    /// Report a provider failure to the consumer
    pub async fn fail(&self, error: SourceError) -> Result<(), FeedError> {
        self.tx.send(Err(error)).await.map_err(|_| FeedError::Closed)
    }

    /// True if the receiving source has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Live source fed through a bounded channel
pub struct ChannelSource {
    rx: mpsc::Receiver<Result<BookDelta, SourceError>>,
}

impl ChannelSource {
    /// Create a connected feed and source with room for `capacity` deltas
    pub fn channel(capacity: usize) -> (LiveFeed, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (LiveFeed { tx }, Self { rx })
    }
}

#[async_trait]
impl DeltaSource for ChannelSource {
    async fn next_delta(&mut self) -> Result<Option<BookDelta>, SourceError> {
        self.rx.recv().await.transpose()
    }

    fn mode(&self) -> SourceMode {
        SourceMode::Live
    }
}
