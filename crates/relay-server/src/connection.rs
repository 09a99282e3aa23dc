//! Per-connection I/O.
//!
//! Each accepted TCP connection is one channel:
//! - a writer task drains the connection's outbound queue, one line per
//!   event;
//! - the reader loop frames incoming bytes into lines, decodes them and
//!   forwards the events to the relay task.
//!
//! Malformed lines are logged and skipped. EOF, read errors, oversize
//! frames, a failed write or the server's shutdown signal end the
//! connection; the relay task is then told the channel is gone.

use relay_core::ChannelId;
use relay_protocol::{decode_inbound, LineFramer, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::types::{ConnectionTable, OutboundRx, RelayRequest, RelayTx};

/// What ended a connection.
enum Closed {
    Reader(anyhow::Result<()>),
    Writer,
    Shutdown,
}

/// Run the I/O loops for a single connection until it closes.
///
/// `halves` is the connection's read and write side. The connection ends
/// when the reader stops, the writer fails, or `shutdown` changes.
pub async fn run_connection<R, W>(
    channel: ChannelId,
    halves: (R, W),
    relay_tx: RelayTx,
    out_rx: OutboundRx,
    connections: ConnectionTable,
    max_frame_bytes: usize,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (read_stream, write_stream) = halves;
    let mut writer = tokio::spawn(run_writer(channel, write_stream, out_rx));

    let closed = tokio::select! {
        result = run_reader(channel, read_stream, &relay_tx, max_frame_bytes) => Closed::Reader(result),
        _ = &mut writer => Closed::Writer,
        _ = shutdown.changed() => Closed::Shutdown,
    };

    // Unregister before telling the relay, so nothing more is queued for us.
    connections.write().await.remove(&channel);
    let _ = relay_tx.send(RelayRequest::Disconnected { channel });

    match closed {
        Closed::Reader(result) => {
            // Our sender was the table entry; the writer drains what is left and exits.
            let _ = writer.await;
            result
        }
        Closed::Writer => {
            info!(channel = %channel, "writer stopped, closing connection");
            Ok(())
        }
        Closed::Shutdown => {
            writer.abort();
            Ok(())
        }
    }
}

async fn run_reader<R: AsyncRead + Unpin>(
    channel: ChannelId,
    mut read_stream: R,
    relay_tx: &RelayTx,
    max_frame_bytes: usize,
) -> anyhow::Result<()> {
    let mut framer = LineFramer::new(max_frame_bytes);
    let mut temp_buf = [0u8; 4096];

    loop {
        let n = read_stream.read(&mut temp_buf).await?;
        if n == 0 {
            // EOF - peer closed
            return Ok(());
        }
        framer.extend(&temp_buf[..n]);

        loop {
            let line = match framer.next_frame() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    warn!(channel = %channel, error = %err, "closing connection");
                    return Ok(());
                }
            };

            match decode_inbound(&line) {
                Ok(event) => {
                    if relay_tx.send(RelayRequest::Event { channel, event }).is_err() {
                        info!(channel = %channel, "relay task gone, closing connection");
                        return Ok(());
                    }
                }
                Err(ProtocolError::UnknownEvent(name)) => {
                    debug!(channel = %channel, event = %name, "ignoring unknown event");
                }
                Err(err) => {
                    warn!(channel = %channel, error = %err, "skipping malformed frame");
                }
            }
        }
    }
}

async fn run_writer<W: AsyncWrite + Unpin>(channel: ChannelId, mut write_stream: W, mut out_rx: OutboundRx) {
    while let Some(line) = out_rx.recv().await {
        if let Err(err) = write_line(&mut write_stream, &line).await {
            warn!(channel = %channel, error = %err, "write failed");
            break;
        }
    }

    let _ = write_stream.shutdown().await;
}

async fn write_line<W: AsyncWrite + Unpin>(stream: &mut W, line: &str) -> std::io::Result<()> {
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::duplex;
    use tokio::sync::{mpsc, RwLock};
    use tokio::time::timeout;

    use super::*;
    use crate::types::OutboundTx;

    struct Harness {
        relay_rx: mpsc::UnboundedReceiver<RelayRequest>,
        connections: ConnectionTable,
        shutdown_tx: watch::Sender<bool>,
    }

    const CHANNEL: ChannelId = ChannelId(7);

    type ConnectionTask = tokio::task::JoinHandle<anyhow::Result<()>>;

    /// Start a connection; the returned sender is a second handle on its
    /// outbound queue, next to the table entry.
    async fn spawn_connection<R, W>(read: R, write: W) -> (Harness, OutboundTx, ConnectionTask)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let connections: ConnectionTable = Arc::new(RwLock::new(HashMap::new()));
        connections.write().await.insert(CHANNEL, out_tx.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_connection(
            CHANNEL,
            (read, write),
            relay_tx,
            out_rx,
            connections.clone(),
            1024,
            shutdown_rx,
        ));

        let harness = Harness {
            relay_rx,
            connections,
            shutdown_tx,
        };
        (harness, out_tx, task)
    }

    async fn assert_disconnected(harness: &mut Harness) {
        assert!(harness.connections.read().await.is_empty());
        match harness.relay_rx.recv().await {
            Some(RelayRequest::Disconnected { channel }) => assert_eq!(channel, CHANNEL),
            other => panic!("expected disconnect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_write_disconnects_while_reader_is_idle() {
        // The peer keeps its sending side open but has stopped reading.
        let (read, _peer_sender) = duplex(64);
        let (write, peer_receiver) = duplex(64);
        drop(peer_receiver);

        let (mut harness, out_tx, task) = spawn_connection(read, write).await;
        out_tx.send(Arc::from("{\"event\":\"pong\"}")).unwrap();

        let result = timeout(Duration::from_secs(5), task)
            .await
            .expect("connection should close after a failed write")
            .unwrap();
        assert!(result.is_ok());
        assert_disconnected(&mut harness).await;
    }

    #[tokio::test]
    async fn shutdown_signal_closes_an_idle_connection() {
        let (read, _peer_sender) = duplex(64);
        let (write, _peer_receiver) = duplex(64);

        let (mut harness, _out_tx, task) = spawn_connection(read, write).await;
        harness.shutdown_tx.send_replace(true);

        let result = timeout(Duration::from_secs(5), task)
            .await
            .expect("connection should close on shutdown")
            .unwrap();
        assert!(result.is_ok());
        assert_disconnected(&mut harness).await;
    }

    #[tokio::test]
    async fn eof_disconnects_after_forwarding_events() {
        let (read, mut peer_sender) = duplex(256);
        let (write, _peer_receiver) = duplex(64);

        let (mut harness, out_tx, task) = spawn_connection(read, write).await;
        drop(out_tx);
        peer_sender.write_all(b"{\"event\":\"ping\"}\n").await.unwrap();
        drop(peer_sender);

        timeout(Duration::from_secs(5), task)
            .await
            .expect("connection should close on eof")
            .unwrap()
            .unwrap();

        assert!(matches!(
            harness.relay_rx.recv().await,
            Some(RelayRequest::Event { channel: CHANNEL, .. })
        ));
        assert_disconnected(&mut harness).await;
    }
}
