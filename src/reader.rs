//! Reader task: feeds a transport into a depacketizer.
//!
//! ```text
//! AsyncRead ─► Reader Task (Depacketizer) ─► mpsc::Receiver<DepayItem>
//! ```
//!
//! The task ends on EOF, when the receiver is dropped, or with the first
//! fatal decode error, which is returned from its `JoinHandle`.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::DepayConfig;
use crate::error::Result;
use crate::protocol::{DepayItem, Depacketizer};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Read buffer size per read call.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Spawn the reader task.
///
/// Returns the receiving side of the item channel and the task handle.
pub fn spawn_reader_task<R>(
    reader: R,
    config: DepayConfig,
    channel_capacity: usize,
) -> (mpsc::Receiver<DepayItem>, JoinHandle<Result<()>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity);
    let task = tokio::spawn(async move {
        let result = read_loop(reader, Depacketizer::with_config(config), tx).await;
        if let Err(e) = &result {
            error!(error = %e, "Reader task failed");
        }
        result
    });
    (rx, task)
}

/// Spawn the reader task with default settings.
pub fn spawn_reader_task_default<R>(
    reader: R,
) -> (mpsc::Receiver<DepayItem>, JoinHandle<Result<()>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    spawn_reader_task(reader, DepayConfig::default(), DEFAULT_CHANNEL_CAPACITY)
}

async fn read_loop<R>(
    mut reader: R,
    mut depay: Depacketizer,
    tx: mpsc::Sender<DepayItem>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            if !depay.is_empty() {
                warn!(pending = depay.len(), "Stream ended inside a packet");
            }
            debug!("Reader reached end of stream");
            return Ok(());
        }

        depay.push_bytes(&buf[..n]);
        while let Some(item) = depay.next_item()? {
            if tx.send(item).await.is_err() {
                debug!("Item receiver dropped, stopping reader");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GdpError;
    use crate::payloader::Payloader;
    use crate::types::{Caps, Event, EventType, Format, Frame, Segment};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, AsyncWriteExt, ReadBuf};

    /// Transport whose every read fails.
    struct ResetTransport;

    impl AsyncRead for ResetTransport {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::ErrorKind::ConnectionReset.into()))
        }
    }

    fn stream_bytes() -> Vec<u8> {
        let mut pay = Payloader::default();
        let mut packets = pay.submit_event(Event::stream_start("s0")).unwrap();
        packets.extend(pay.submit_caps("audio/x-raw".parse::<Caps>().unwrap()).unwrap());
        packets.extend(pay.submit_event(Event::segment(&Segment::new(Format::Time))).unwrap());
        packets.extend(pay.submit_frame(Frame::new(&b"pcm"[..])).unwrap());
        packets.extend(pay.submit_event(Event::eos()).unwrap());
        packets.iter().flat_map(|p| p.to_bytes()).collect()
    }

    #[tokio::test]
    async fn test_reader_forwards_items() {
        let (mut client, server) = duplex(16);
        let (mut rx, task) = spawn_reader_task_default(server);

        let bytes = stream_bytes();
        tokio::spawn(async move {
            client.write_all(&bytes).await.unwrap();
        });

        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        task.await.unwrap().unwrap();

        assert_eq!(items.len(), 5);
        assert!(matches!(&items[3], DepayItem::Frame { frame, .. } if frame.to_bytes() == "pcm"));
        assert!(matches!(&items[4], DepayItem::Event(e) if e.event_type() == EventType::Eos));
    }

    #[tokio::test]
    async fn test_reader_stops_on_fatal_error() {
        let (mut client, server) = duplex(1024);
        let (mut rx, task) = spawn_reader_task_default(server);

        let frame = crate::codec::encode_frame(
            &Frame::new(&b"early"[..]),
            crate::protocol::flags::CRC,
            crate::protocol::ProtocolVersion::Current,
        )
        .unwrap();
        client.write_all(&frame.0).await.unwrap();
        client.write_all(&frame.1[0]).await.unwrap();

        assert!(rx.recv().await.is_none());
        assert!(matches!(task.await.unwrap(), Err(GdpError::FrameBeforeCaps)));
    }

    #[tokio::test]
    async fn test_reader_returns_io_errors() {
        let (mut rx, task) = spawn_reader_task_default(ResetTransport);
        assert!(rx.recv().await.is_none());
        match task.await.unwrap() {
            Err(GdpError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reader_stops_when_receiver_dropped() {
        let (mut client, server) = duplex(64 * 1024);
        let (rx, task) = spawn_reader_task(server, DepayConfig::default(), 1);
        drop(rx);

        client.write_all(&stream_bytes()).await.unwrap();
        assert!(task.await.unwrap().is_ok());
    }
}
