// crates/relay-cli/src/client.rs

//! Client mode: bind to a computer, send each stdin line as a command
//! and print whatever comes back.
//!
//! A line that parses as JSON is sent as that JSON value, anything else
//! as a JSON string.

use anyhow::Result;
use relay_core::{InboundEvent, OutboundEvent};
use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::network::{RelayReader, RelayWriter};

pub async fn run(mut reader: RelayReader, mut writer: RelayWriter, computer_id: String) -> Result<()> {
    writer
        .send(&InboundEvent::ConnectToComputer {
            computer_id: Some(computer_id),
        })
        .await?;

    let mut stdin = BufReader::new(io::stdin()).lines();

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    println!("EOF on stdin, exiting client.");
                    return Ok(());
                };

                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
                    println!("Exiting client.");
                    return Ok(());
                }

                writer.send(&InboundEvent::Command(parse_command(trimmed))).await?;
            }

            event = reader.next_event() => {
                let Some(event) = event? else {
                    warn!("Relay closed the connection");
                    return Ok(());
                };

                match event {
                    OutboundEvent::ConnectedToComputer { computer_id, info } => {
                        println!(
                            "connected to {computer_id}: {} ({}, {}x{})",
                            info.name, info.os, info.screen_width, info.screen_height
                        );
                        println!("Type commands (JSON or plain text); 'quit' or 'exit' to leave.");
                    }
                    OutboundEvent::CommandResponse(response) => println!("<< {response}"),
                    OutboundEvent::Error { message } => println!("!! {message}"),
                    OutboundEvent::ComputersUpdated { computers } => {
                        println!("computers online: {}", computers.join(", "));
                    }
                    other => debug!("Ignoring {:?}", other),
                }
            }
        }
    }
}

fn parse_command(line: &str) -> Value {
    serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()))
}
