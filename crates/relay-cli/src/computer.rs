// crates/relay-cli/src/computer.rs

//! Computer mode: register, keep the registration alive with
//! heartbeats, and answer every relayed command.
//!
//! Commands are not executed; each one is acknowledged with a
//! `{"status": "received", "command": ...}` response so the relay path
//! can be exercised end to end.

use anyhow::Result;
use relay_core::{InboundEvent, OutboundEvent, Registration};
use serde_json::json;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::network::{RelayReader, RelayWriter};

pub async fn run(
    mut reader: RelayReader,
    mut writer: RelayWriter,
    registration: Registration,
    heartbeat_every: Duration,
) -> Result<()> {
    writer
        .send(&InboundEvent::RegisterComputer(registration))
        .await?;

    let mut heartbeat = interval(heartbeat_every);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                writer.send(&InboundEvent::Heartbeat).await?;
            }

            event = reader.next_event() => {
                let Some(event) = event? else {
                    warn!("Relay closed the connection");
                    return Ok(());
                };

                match event {
                    OutboundEvent::Registered { computer_id } => {
                        println!("registered as {computer_id}");
                    }
                    OutboundEvent::Command { client_id, command } => {
                        println!("<< [{client_id}] {command}");
                        let response = json!({ "status": "received", "command": command });
                        writer
                            .send(&InboundEvent::CommandResponse {
                                client_id: Some(client_id),
                                response,
                            })
                            .await?;
                    }
                    OutboundEvent::ComputersUpdated { computers } => {
                        info!("Computers online: {:?}", computers);
                    }
                    OutboundEvent::Error { message } => {
                        warn!("Relay error: {}", message);
                    }
                    other => debug!("Ignoring {:?}", other),
                }
            }
        }
    }
}
