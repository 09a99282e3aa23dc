// crates/relay-core/tests/relay_scenarios.rs
use std::time::Duration;

use relay_core::{
    ChannelId, ComputerInfo, InboundEvent, Outbound, OutboundEvent, Recipient, Registration, Relay,
    RelayError,
};
use serde_json::json;
use tokio::time::Instant;

const COMPUTER: ChannelId = ChannelId(1);
const CLIENT: ChannelId = ChannelId(2);
const OTHER_COMPUTER: ChannelId = ChannelId(3);

fn register(id: &str) -> InboundEvent {
    InboundEvent::RegisterComputer(Registration {
        computer_id: Some(id.to_string()),
        name: Some(format!("{id}-name")),
        ..Registration::default()
    })
}

fn connect(id: &str) -> InboundEvent {
    InboundEvent::ConnectToComputer {
        computer_id: Some(id.to_string()),
    }
}

fn broadcasts(outputs: &[Outbound]) -> Vec<Vec<String>> {
    outputs
        .iter()
        .filter(|o| o.to == Recipient::Everyone)
        .filter_map(|o| match &o.event {
            OutboundEvent::ComputersUpdated { computers } => Some(computers.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn register_then_snapshot_shows_online() {
    let mut relay = Relay::default();
    let now = Instant::now();

    let outputs = relay.process_event(COMPUTER, register("c1"), now);

    assert_eq!(
        outputs[0],
        Outbound::to(
            COMPUTER,
            OutboundEvent::Registered {
                computer_id: "c1".into()
            }
        )
    );
    assert_eq!(broadcasts(&outputs), vec![vec!["c1".to_string()]]);

    let snapshot = relay.snapshot(now);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, "c1");
    assert!(snapshot[0].online);
}

#[test]
fn register_without_id_uses_channel_id_and_defaults() {
    let mut relay = Relay::default();
    let now = Instant::now();

    let outputs = relay.process_event(
        ChannelId(42),
        InboundEvent::RegisterComputer(Registration {
            computer_id: Some(String::new()),
            screen_width: Some(0),
            screen_height: Some(900),
            ..Registration::default()
        }),
        now,
    );

    assert_eq!(
        outputs[0].event,
        OutboundEvent::Registered {
            computer_id: "42".into()
        }
    );
    let entry = relay.registry().computer("42").expect("registered under channel id");
    assert_eq!(
        entry.info,
        ComputerInfo {
            name: "Unknown PC".into(),
            os: "Windows".into(),
            screen_width: 1920,
            screen_height: 900,
        }
    );
}

#[test]
fn snapshot_reports_offline_before_sweep_evicts() {
    let mut relay = Relay::default();
    let start = Instant::now();
    relay.process_event(COMPUTER, register("c1"), start);

    // Exactly at the threshold: offline, but not past the eviction timeout.
    let at_threshold = start + Duration::from_secs(30);
    let snapshot = relay.snapshot(at_threshold);
    assert_eq!(snapshot.len(), 1);
    assert!(!snapshot[0].online);

    let report = relay.sweep(at_threshold);
    assert!(report.evicted.is_empty());
    assert!(report.broadcast.is_none());
    assert_eq!(relay.registry().num_computers(), 1);
}

#[test]
fn sweep_evicts_stale_computers_with_one_broadcast() {
    let mut relay = Relay::default();
    let start = Instant::now();
    relay.process_event(COMPUTER, register("c1"), start);
    relay.process_event(OTHER_COMPUTER, register("c2"), start);
    relay.process_event(ChannelId(9), register("c3"), start);

    // c3 keeps heartbeating.
    relay.process_event(ChannelId(9), InboundEvent::Heartbeat, start + Duration::from_secs(20));

    let report = relay.sweep(start + Duration::from_secs(31));

    assert_eq!(report.evicted, vec!["c1".to_string(), "c2".to_string()]);
    assert_eq!(
        report.broadcast,
        Some(Outbound::everyone(OutboundEvent::ComputersUpdated {
            computers: vec!["c3".into()]
        }))
    );

    let ids: Vec<String> = relay
        .snapshot(start + Duration::from_secs(31))
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["c3".to_string()]);
}

#[test]
fn heartbeat_for_unregistered_channel_is_silent() {
    let mut relay = Relay::default();
    let outputs = relay.process_event(CLIENT, InboundEvent::Heartbeat, Instant::now());
    assert!(outputs.is_empty());
    assert_eq!(relay.registry().num_computers(), 0);
}

#[test]
fn bind_to_unknown_computer_is_not_found() {
    let mut relay = Relay::default();

    let outputs = relay.process_event(CLIENT, connect("c1"), Instant::now());

    assert_eq!(
        outputs,
        vec![Outbound::to(CLIENT, OutboundEvent::error(RelayError::NotFound))]
    );
    assert!(relay.registry().client(CLIENT).is_none());

    let outputs = relay.process_event(
        CLIENT,
        InboundEvent::ConnectToComputer { computer_id: None },
        Instant::now(),
    );
    assert_eq!(
        outputs[0].event,
        OutboundEvent::Error {
            message: "Computer not found or offline".into()
        }
    );
}

#[test]
fn bind_returns_computer_info() {
    let mut relay = Relay::default();
    let now = Instant::now();
    relay.process_event(COMPUTER, register("c1"), now);

    let outputs = relay.process_event(CLIENT, connect("c1"), now);

    match &outputs[..] {
        [Outbound {
            to: Recipient::Channel(to),
            event: OutboundEvent::ConnectedToComputer { computer_id, info },
        }] => {
            assert_eq!(*to, CLIENT);
            assert_eq!(computer_id, "c1");
            assert_eq!(info.name, "c1-name");
        }
        other => panic!("unexpected outputs: {other:?}"),
    }
    // Binding never broadcasts.
    assert!(broadcasts(&outputs).is_empty());
}

#[test]
fn forward_delivers_command_to_bound_computer_once() {
    let mut relay = Relay::default();
    let now = Instant::now();
    relay.process_event(COMPUTER, register("c1"), now);
    relay.process_event(CLIENT, connect("c1"), now);

    let outputs = relay.process_event(CLIENT, InboundEvent::Command(json!({"op": "shutdown"})), now);

    assert_eq!(
        outputs,
        vec![Outbound::to(
            COMPUTER,
            OutboundEvent::Command {
                client_id: CLIENT,
                command: json!({"op": "shutdown"}),
            }
        )]
    );
}

#[test]
fn command_without_binding_is_rejected() {
    let mut relay = Relay::default();
    let outputs = relay.process_event(CLIENT, InboundEvent::Command(json!("ls")), Instant::now());

    assert_eq!(
        outputs,
        vec![Outbound::to(
            CLIENT,
            OutboundEvent::Error {
                message: "Not connected to any computer".into()
            }
        )]
    );
}

#[test]
fn command_to_evicted_computer_keeps_stale_binding() {
    let mut relay = Relay::default();
    let start = Instant::now();
    relay.process_event(COMPUTER, register("c1"), start);
    relay.process_event(CLIENT, connect("c1"), start);

    relay.sweep(start + Duration::from_secs(31));

    let outputs = relay.process_event(CLIENT, InboundEvent::Command(json!({})), start);
    assert_eq!(
        outputs,
        vec![Outbound::to(CLIENT, OutboundEvent::error(RelayError::ComputerOffline))]
    );
    assert_eq!(
        relay.registry().client(CLIENT).map(|c| c.bound_computer_id.as_str()),
        Some("c1")
    );

    // Once c1 comes back, the old binding works again.
    relay.process_event(OTHER_COMPUTER, register("c1"), start);
    let outputs = relay.process_event(CLIENT, InboundEvent::Command(json!({})), start);
    assert_eq!(outputs[0].to, Recipient::Channel(OTHER_COMPUTER));
}

#[test]
fn route_response_only_reaches_existing_clients() {
    let mut relay = Relay::default();
    let now = Instant::now();
    relay.process_event(COMPUTER, register("c1"), now);
    relay.process_event(CLIENT, connect("c1"), now);

    let response = || InboundEvent::CommandResponse {
        client_id: Some(CLIENT),
        response: json!({"ok": true}),
    };

    let outputs = relay.process_event(COMPUTER, response(), now);
    assert_eq!(
        outputs,
        vec![Outbound::to(CLIENT, OutboundEvent::CommandResponse(json!({"ok": true})))]
    );

    let outputs = relay.disconnect(CLIENT);
    assert!(outputs.is_empty(), "client disconnect must not broadcast");

    let outputs = relay.process_event(COMPUTER, response(), now);
    assert!(outputs.is_empty());

    let outputs = relay.process_event(
        COMPUTER,
        InboundEvent::CommandResponse {
            client_id: None,
            response: json!(null),
        },
        now,
    );
    assert!(outputs.is_empty());
}

#[test]
fn reregistration_overwrites_and_transfers_ownership() {
    let mut relay = Relay::default();
    let now = Instant::now();
    relay.process_event(COMPUTER, register("c1"), now);
    relay.process_event(OTHER_COMPUTER, register("c1"), now);

    assert_eq!(relay.registry().num_computers(), 1);
    assert_eq!(
        relay.registry().computer("c1").map(|e| e.channel),
        Some(OTHER_COMPUTER)
    );

    // The earlier channel still claims "c1": its disconnect removes the
    // entry now owned by the new channel.
    let outputs = relay.disconnect(COMPUTER);
    assert_eq!(broadcasts(&outputs), vec![Vec::<String>::new()]);
    assert!(relay.registry().computer("c1").is_none());
}

#[test]
fn earlier_channel_heartbeat_refreshes_the_reregistered_entry() {
    let mut relay = Relay::default();
    let start = Instant::now();
    relay.process_event(COMPUTER, register("c1"), start);
    relay.process_event(OTHER_COMPUTER, register("c1"), start);

    // Only the earlier channel keeps heartbeating.
    let outputs = relay.process_event(
        COMPUTER,
        InboundEvent::Heartbeat,
        start + Duration::from_secs(25),
    );
    assert!(outputs.is_empty());

    let report = relay.sweep(start + Duration::from_secs(40));
    assert!(report.evicted.is_empty());
    assert_eq!(report.broadcast, None);

    let entry = relay.registry().computer("c1").expect("still registered");
    assert_eq!(entry.channel, OTHER_COMPUTER);
    assert_eq!(relay.snapshot(start + Duration::from_secs(40))[0].idle_ms, 15_000);
}

#[test]
fn response_from_an_unbound_computer_still_reaches_the_client() {
    let mut relay = Relay::default();
    let now = Instant::now();
    relay.process_event(COMPUTER, register("c1"), now);
    relay.process_event(OTHER_COMPUTER, register("c2"), now);
    relay.process_event(CLIENT, connect("c1"), now);

    let outputs = relay.process_event(
        OTHER_COMPUTER,
        InboundEvent::CommandResponse {
            client_id: Some(CLIENT),
            response: json!({"from": "c2"}),
        },
        now,
    );

    assert_eq!(
        outputs,
        vec![Outbound::to(
            CLIENT,
            OutboundEvent::CommandResponse(json!({"from": "c2"}))
        )]
    );
}

#[test]
fn computer_disconnect_removes_and_broadcasts_once() {
    let mut relay = Relay::default();
    let now = Instant::now();
    relay.process_event(COMPUTER, register("c1"), now);
    relay.process_event(OTHER_COMPUTER, register("c2"), now);

    let outputs = relay.disconnect(COMPUTER);

    assert_eq!(outputs.len(), 1);
    assert_eq!(broadcasts(&outputs), vec![vec!["c2".to_string()]]);
    assert_eq!(relay.registry().num_computers(), 1);

    // Second disconnect of the same channel is a no-op.
    assert!(relay.disconnect(COMPUTER).is_empty());
}

#[test]
fn ping_is_answered_with_pong() {
    let mut relay = Relay::default();
    let outputs = relay.process_event(CLIENT, InboundEvent::Ping, Instant::now());
    assert_eq!(outputs, vec![Outbound::to(CLIENT, OutboundEvent::Pong)]);
}
