//! Dedicated writer task for sending packets.
//!
//! Packets produced by one or more payloaders are sent over an mpsc channel
//! to a single task that owns the transport. The task batches whatever is
//! ready into one vectored write.
//!
//! # Architecture
//!
//! ```text
//! Payloader ─┐
//! Payloader ─┼─► mpsc::Sender<Queued> ─► Writer Task ─► AsyncWrite
//! Replay    ─┘
//! ```
//!
//! Payload segments are written straight from the frame's shared memory
//! (scatter/gather), never concatenated first.
//!
//! Backpressure is counted in bytes, since a single frame packet can weigh
//! as much as thousands of event packets. Every queued packet holds its
//! share of the byte budget until the task has written it; senders wait for
//! room, up to a configurable timeout.

use std::io::IoSlice;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{GdpError, Result};
use crate::protocol::OutboundPacket;

/// Default number of bytes that may wait for the transport.
pub const DEFAULT_MAX_PENDING_BYTES: u32 = 16 * 1024 * 1024;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default backpressure timeout.
pub const DEFAULT_BACKPRESSURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum packets to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 64;

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Bytes queued but not yet written before senders have to wait.
    pub max_pending_bytes: u32,
    /// Channel capacity for the packet queue.
    pub channel_capacity: usize,
    /// Timeout when waiting for room in the byte budget.
    pub backpressure_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_pending_bytes: DEFAULT_MAX_PENDING_BYTES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            backpressure_timeout: DEFAULT_BACKPRESSURE_TIMEOUT,
        }
    }
}

/// A packet on its way to the writer task, with the budget it holds.
struct Queued {
    packet: OutboundPacket,
    budget: OwnedSemaphorePermit,
}

/// Handle for sending packets to the writer task.
///
/// This is cheaply cloneable; clones share one byte budget.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Queued>,
    budget: Arc<Semaphore>,
    max_pending_bytes: u32,
    timeout: Duration,
}

impl WriterHandle {
    fn new(tx: mpsc::Sender<Queued>, max_pending_bytes: u32, timeout: Duration) -> Self {
        Self {
            tx,
            budget: Arc::new(Semaphore::new(max_pending_bytes as usize)),
            max_pending_bytes,
            timeout,
        }
    }

    /// Send a packet to the writer task.
    ///
    /// Waits until the packet fits in the byte budget. A packet larger than
    /// the whole budget waits for everything before it to be written.
    pub async fn send(&self, packet: OutboundPacket) -> Result<()> {
        let weight = self.weight(&packet);
        let acquire = self.budget.clone().acquire_many_owned(weight);
        let budget = match tokio::time::timeout(self.timeout, acquire).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(GdpError::ConnectionClosed),
            Err(_) => {
                warn!(
                    bytes = packet.len(),
                    pending = self.pending_bytes(),
                    "Timed out waiting for the writer"
                );
                return Err(GdpError::BackpressureTimeout);
            }
        };

        self.tx
            .send(Queued { packet, budget })
            .await
            .map_err(|_| GdpError::ConnectionClosed)
    }

    /// Send packets in order, e.g. the output of one payloader call.
    pub async fn send_all(
        &self,
        packets: impl IntoIterator<Item = OutboundPacket>,
    ) -> Result<()> {
        for packet in packets {
            self.send(packet).await?;
        }
        Ok(())
    }

    /// Bytes handed to the writer task and not yet written.
    pub fn pending_bytes(&self) -> usize {
        self.max_pending_bytes as usize - self.budget.available_permits()
    }

    fn weight(&self, packet: &OutboundPacket) -> u32 {
        u32::try_from(packet.len())
            .unwrap_or(u32::MAX)
            .min(self.max_pending_bytes)
    }
}

/// Spawn the writer task and return a handle for sending packets.
///
/// The task ends cleanly once every handle is dropped, or with the first
/// I/O error.
pub fn spawn_writer_task<W>(
    writer: W,
    config: WriterConfig,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let handle = WriterHandle::new(tx, config.max_pending_bytes, config.backpressure_timeout);

    let task = tokio::spawn(async move {
        let result = writer_loop(rx, writer).await;
        if let Err(e) = &result {
            error!(error = %e, "Writer task failed");
        }
        result
    });

    (handle, task)
}

/// Spawn the writer task with default configuration.
pub fn spawn_writer_task_default<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_writer_task(writer, WriterConfig::default())
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<Queued>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
    let mut held = Vec::with_capacity(MAX_BATCH_SIZE);

    loop {
        let Some(first) = rx.recv().await else {
            debug!("Writer channel closed");
            return Ok(());
        };

        // Collect additional ready packets (non-blocking)
        let mut next = Some(first);
        while let Some(Queued { packet, budget }) = next.take() {
            batch.push(packet);
            held.push(budget);
            if batch.len() < MAX_BATCH_SIZE {
                next = rx.try_recv().ok();
            }
        }

        write_batch(&mut writer, &batch).await?;

        // Written: give the bytes back to waiting senders.
        batch.clear();
        held.clear();
    }
}

/// Write a batch of packets using scatter/gather I/O (write_vectored).
async fn write_batch<W>(writer: &mut W, batch: &[OutboundPacket]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if batch.is_empty() {
        return Ok(());
    }

    let total_size: usize = batch.iter().map(OutboundPacket::len).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        if slices.is_empty() {
            break;
        }

        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(GdpError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }
        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// Build IoSlice array for the data after the first `skip_bytes` bytes.
fn build_remaining_slices(batch: &[OutboundPacket], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut position = 0;

    for packet in batch {
        let parts = std::iter::once(&packet.header[..])
            .chain(packet.payload.iter().map(|s| &s[..]));
        for part in parts {
            let end = position + part.len();
            if skip_bytes < end && !part.is_empty() {
                let start_in_part = skip_bytes.saturating_sub(position);
                slices.push(IoSlice::new(&part[start_in_part..]));
            }
            position = end;
        }
    }

    slices
}
