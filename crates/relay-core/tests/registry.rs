// crates/relay-core/tests/registry.rs
use std::time::Duration;

use chrono::Utc;
use relay_core::{binder, ChannelId, ConnectionRegistry, LivenessMonitor, Registration, RelayError};
use tokio::time::Instant;

fn named(id: &str) -> Registration {
    Registration {
        computer_id: Some(id.to_string()),
        ..Registration::default()
    }
}

#[test]
fn remove_is_idempotent() {
    let mut registry = ConnectionRegistry::default();
    registry.register(ChannelId(1), &named("c1"), Instant::now());

    assert!(registry.remove("c1"));
    assert!(!registry.remove("c1"));
    assert_eq!(registry.num_computers(), 0);
}

#[test]
fn heartbeat_refreshes_last_seen() {
    let mut registry = ConnectionRegistry::default();
    let start = Instant::now();
    registry.register(ChannelId(1), &named("c1"), start);
    let registered_at = registry.snapshot(start)[0].last_seen;

    let before_heartbeat = Utc::now();
    registry.heartbeat("c1", start + Duration::from_secs(25));
    registry.heartbeat("missing", start + Duration::from_secs(25));

    let monitor = LivenessMonitor::new(Duration::from_secs(30));
    let evicted = monitor.sweep(&mut registry, start + Duration::from_secs(40));
    assert!(evicted.is_empty());

    let snapshot = registry.snapshot(start + Duration::from_secs(40));
    assert_eq!(snapshot[0].idle_ms, 15_000);
    assert!(snapshot[0].online);
    assert!(snapshot[0].last_seen >= before_heartbeat);
    assert!(snapshot[0].last_seen >= registered_at);
    assert!(snapshot[0].last_seen <= Utc::now());
}

#[test]
fn snapshot_serializes_last_seen_as_epoch_millis() {
    let mut registry = ConnectionRegistry::default();
    let now = Instant::now();
    registry.register(ChannelId(1), &named("c1"), now);

    let snapshot = registry.snapshot(now);
    let value = serde_json::to_value(&snapshot[0]).unwrap();

    assert_eq!(value["id"], "c1");
    assert_eq!(value["name"], "Unknown PC");
    assert_eq!(value["last_seen"], snapshot[0].last_seen.timestamp_millis());
    assert_eq!(value["online"], true);
}

#[test]
fn failed_bind_creates_no_client() {
    let mut registry = ConnectionRegistry::default();

    let err = binder::bind(&mut registry, ChannelId(5), "nope").unwrap_err();

    assert_eq!(err, RelayError::NotFound);
    assert_eq!(registry.num_clients(), 0);
    assert_eq!(binder::lookup(&registry, ChannelId(5)), None);
}

#[test]
fn rebind_overwrites_previous_binding() {
    let mut registry = ConnectionRegistry::default();
    let now = Instant::now();
    registry.register(ChannelId(1), &named("a"), now);
    registry.register(ChannelId(2), &named("b"), now);

    binder::bind(&mut registry, ChannelId(9), "a").unwrap();
    binder::bind(&mut registry, ChannelId(9), "b").unwrap();

    assert_eq!(registry.num_clients(), 1);
    assert_eq!(binder::lookup(&registry, ChannelId(9)), Some("b"));

    assert!(binder::unbind(&mut registry, ChannelId(9)));
    assert!(!binder::unbind(&mut registry, ChannelId(9)));
}

#[test]
fn channel_claims_its_latest_registration() {
    let mut registry = ConnectionRegistry::default();
    let now = Instant::now();
    registry.register(ChannelId(1), &named("first"), now);
    registry.register(ChannelId(1), &named("second"), now);

    assert_eq!(registry.claimed_id(ChannelId(1)), Some("second"));
    assert_eq!(registry.computer_ids(), vec!["first".to_string(), "second".to_string()]);
}
