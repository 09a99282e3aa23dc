// crates/relay-cli/src/network.rs

use anyhow::{Context, Result};
use relay_core::{InboundEvent, OutboundEvent};
use relay_protocol::{decode_outbound, encode_inbound, LineFramer, ProtocolError, DEFAULT_MAX_FRAME_BYTES};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Connect to the relay and split the stream into its two directions.
pub async fn connect(server_addr: &str) -> Result<(RelayReader, RelayWriter)> {
    info!("Connecting to {}...", server_addr);
    let stream = TcpStream::connect(server_addr)
        .await
        .with_context(|| format!("failed to connect to {server_addr}"))?;
    stream.set_nodelay(true)?;
    info!("Connected");

    let (read, write) = stream.into_split();
    Ok((
        RelayReader {
            stream: read,
            framer: LineFramer::new(DEFAULT_MAX_FRAME_BYTES),
        },
        RelayWriter { stream: write },
    ))
}

pub struct RelayWriter {
    stream: OwnedWriteHalf,
}

impl RelayWriter {
    pub async fn send(&mut self, msg: &InboundEvent) -> Result<()> {
        let line = encode_inbound(msg);
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await?;

        debug!("Sent: {}", line);
        Ok(())
    }
}

pub struct RelayReader {
    stream: OwnedReadHalf,
    framer: LineFramer,
}

impl RelayReader {
    /// Next event from the relay; `None` once the relay closed the
    /// connection. Cancel-safe: partial lines stay in the framer.
    pub async fn next_event(&mut self) -> Result<Option<OutboundEvent>> {
        let mut buf = [0u8; 4096];

        loop {
            while let Some(line) = self.framer.next_frame()? {
                match decode_outbound(&line) {
                    Ok(msg) => return Ok(Some(msg)),
                    Err(ProtocolError::UnknownEvent(name)) => {
                        debug!("Ignoring unknown event {}", name);
                    }
                    Err(e) => warn!("Undecodable frame from relay: {}", e),
                }
            }

            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                return Ok(None); // Connection closed
            }
            self.framer.extend(&buf[..n]);
        }
    }
}
