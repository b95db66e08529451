//! Tokio glue for `stream2md`.
//!
//! `MarkdownStream` is synchronous and single-owner. Token producers are usually async and very
//! chatty, so this crate sits between the two:
//!
//! - [`CoalescingReceiver`] merges tiny deltas into fewer chunks (newline, byte budget, max delay).
//! - [`ChunkSender`] applies a backpressure policy on the producer side of a bounded channel.
//! - [`spawn_stream_actor`] runs a task that owns the engine and forwards non-empty `Update`s.

use std::time::Duration;

use stream2md::{MarkdownStream, Update};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoalesceOptions {
    /// Flush as soon as the buffered text contains a newline.
    pub flush_on_newline: bool,
    /// Flush buffered text at the latest this long after it started accumulating.
    pub max_delay: Duration,
    /// Flush once this many bytes are buffered.
    pub max_bytes: usize,
}

impl Default for CoalesceOptions {
    fn default() -> Self {
        Self {
            flush_on_newline: true,
            max_delay: Duration::from_millis(50),
            max_bytes: 8 * 1024,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Wait for channel capacity. Nothing is lost; the producer may stall.
    Block,
    /// Drop the chunk when the channel is full.
    DropNew,
    /// Keep chunks in a local buffer and hand it over whenever the channel has room and the buffer
    /// holds a newline or reaches its byte limit.
    CoalesceLocal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Dropped,
    Buffered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("receiver dropped")]
    Closed,
}

/// Producer side of a bounded chunk channel.
#[derive(Debug)]
pub struct ChunkSender {
    tx: mpsc::Sender<String>,
    policy: BackpressurePolicy,
    local: String,
    local_max_bytes: usize,
}

impl ChunkSender {
    pub fn new(tx: mpsc::Sender<String>, policy: BackpressurePolicy) -> Self {
        Self {
            tx,
            policy,
            local: String::new(),
            local_max_bytes: 16 * 1024,
        }
    }

    pub fn with_local_max_bytes(mut self, max: usize) -> Self {
        self.local_max_bytes = max.max(1);
        self
    }

    pub fn policy(&self) -> BackpressurePolicy {
        self.policy
    }

    /// Bytes held back by [`BackpressurePolicy::CoalesceLocal`].
    pub fn buffered_bytes(&self) -> usize {
        self.local.len()
    }

    pub async fn send(&mut self, chunk: &str) -> Result<SendOutcome, SendError> {
        match self.policy {
            BackpressurePolicy::Block => {
                self.tx
                    .send(chunk.to_string())
                    .await
                    .map_err(|_| SendError::Closed)?;
                Ok(SendOutcome::Sent)
            }
            BackpressurePolicy::DropNew => match self.tx.try_send(chunk.to_string()) {
                Ok(()) => Ok(SendOutcome::Sent),
                Err(TrySendError::Full(_)) => Ok(SendOutcome::Dropped),
                Err(TrySendError::Closed(_)) => Err(SendError::Closed),
            },
            BackpressurePolicy::CoalesceLocal => self.coalesce_local(chunk),
        }
    }

    /// Hand over the local buffer, waiting for capacity. Call it before dropping the sender.
    pub async fn flush(&mut self) -> Result<(), SendError> {
        if self.local.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.local);
        self.tx.send(text).await.map_err(|_| SendError::Closed)
    }

    fn coalesce_local(&mut self, chunk: &str) -> Result<SendOutcome, SendError> {
        self.local.push_str(chunk);
        if self.local.len() < self.local_max_bytes && !self.local.contains('\n') {
            return Ok(SendOutcome::Buffered);
        }
        match self.tx.try_send(std::mem::take(&mut self.local)) {
            Ok(()) => Ok(SendOutcome::Sent),
            Err(TrySendError::Full(text)) => {
                self.local = text;
                Ok(SendOutcome::Buffered)
            }
            Err(TrySendError::Closed(_)) => Err(SendError::Closed),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushReason {
    Newline,
    MaxBytes,
    MaxDelay,
    ChannelClosed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoalescedChunk {
    pub text: String,
    pub reason: FlushReason,
    /// Input messages merged into `text`.
    pub merged: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoalesceStats {
    pub messages_in: u64,
    pub chunks_out: u64,
    pub bytes_out: u64,
    pub last_reason: Option<FlushReason>,
}

/// Receiver that merges high-frequency deltas into fewer, larger chunks.
#[derive(Debug)]
pub struct CoalescingReceiver {
    rx: mpsc::Receiver<String>,
    opts: CoalesceOptions,
    buf: String,
    stats: CoalesceStats,
}

impl CoalescingReceiver {
    pub fn new(rx: mpsc::Receiver<String>, opts: CoalesceOptions) -> Self {
        Self {
            rx,
            opts,
            buf: String::new(),
            stats: CoalesceStats::default(),
        }
    }

    pub fn options(&self) -> CoalesceOptions {
        self.opts
    }

    pub fn stats(&self) -> CoalesceStats {
        self.stats
    }

    /// Next merged chunk. `None` once the channel is closed and nothing is buffered.
    pub async fn recv(&mut self) -> Option<String> {
        self.recv_with_meta().await.map(|c| c.text)
    }

    pub async fn recv_with_meta(&mut self) -> Option<CoalescedChunk> {
        let mut merged = 0usize;
        if self.buf.is_empty() {
            let first = self.rx.recv().await?;
            self.buf.push_str(&first);
            merged += 1;
        }
        let deadline = Instant::now() + self.opts.max_delay;

        loop {
            if let Some(reason) = self.ready() {
                return Some(self.flush(reason, merged));
            }
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(delta)) => {
                    self.buf.push_str(&delta);
                    merged += 1;
                }
                Ok(None) => {
                    if self.buf.is_empty() {
                        return None;
                    }
                    return Some(self.flush(FlushReason::ChannelClosed, merged));
                }
                Err(_) => return Some(self.flush(FlushReason::MaxDelay, merged)),
            }
        }
    }

    fn ready(&self) -> Option<FlushReason> {
        if self.buf.len() >= self.opts.max_bytes {
            Some(FlushReason::MaxBytes)
        } else if self.opts.flush_on_newline && self.buf.contains('\n') {
            Some(FlushReason::Newline)
        } else {
            None
        }
    }

    fn flush(&mut self, reason: FlushReason, merged: usize) -> CoalescedChunk {
        let text = std::mem::take(&mut self.buf);
        self.stats.messages_in = self.stats.messages_in.saturating_add(merged as u64);
        self.stats.chunks_out = self.stats.chunks_out.saturating_add(1);
        self.stats.bytes_out = self.stats.bytes_out.saturating_add(text.len() as u64);
        self.stats.last_reason = Some(reason);
        debug!(?reason, merged, bytes = text.len(), "coalesced chunk");
        CoalescedChunk {
            text,
            reason,
            merged,
        }
    }
}

/// Spawn a task that owns `stream`, feeds it coalesced chunks from `rx` and finalizes it when the
/// producer side closes. Empty updates are not forwarded.
pub fn spawn_stream_actor(
    stream: MarkdownStream,
    rx: mpsc::Receiver<String>,
    opts: CoalesceOptions,
) -> mpsc::Receiver<Update> {
    let (tx, updates) = mpsc::channel::<Update>(64);
    tokio::spawn(drive_stream(stream, rx, opts, tx));
    updates
}

/// Body of [`spawn_stream_actor`]. Returns the stream once the producer closes or the update
/// receiver goes away.
async fn drive_stream(
    mut stream: MarkdownStream,
    rx: mpsc::Receiver<String>,
    opts: CoalesceOptions,
    tx: mpsc::Sender<Update>,
) -> MarkdownStream {
    let mut rx = CoalescingReceiver::new(rx, opts);
    while let Some(chunk) = rx.recv().await {
        let update = stream.append(&chunk);
        if update.is_empty() {
            continue;
        }
        if tx.send(update).await.is_err() {
            debug!("update receiver dropped; stopping stream actor");
            return stream;
        }
    }
    let update = stream.finalize();
    if !update.is_empty() && tx.send(update).await.is_err() {
        debug!("update receiver dropped before the final update");
    }
    debug!(bytes = stream.buffer().len(), "stream actor finished");
    stream
}
