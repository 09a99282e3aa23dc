// crates/relay-protocol/tests/framing.rs
use relay_protocol::{LineFramer, ProtocolError};

#[test]
fn splits_lines_across_reads() {
    let mut framer = LineFramer::new(1024);

    framer.extend(b"{\"event\":\"pi");
    assert_eq!(framer.next_frame().unwrap(), None);

    framer.extend(b"ng\"}\r\n\n  \n{\"event\":\"heartbeat\"}\n{\"ev");
    assert_eq!(framer.next_frame().unwrap().as_deref(), Some("{\"event\":\"ping\"}"));
    assert_eq!(framer.next_frame().unwrap().as_deref(), Some("{\"event\":\"heartbeat\"}"));
    assert_eq!(framer.next_frame().unwrap(), None);
    assert_eq!(framer.pending(), 4);
}

#[test]
fn oversize_unterminated_frame_is_rejected() {
    let mut framer = LineFramer::new(8);
    framer.extend(b"0123456789");

    assert!(matches!(
        framer.next_frame(),
        Err(ProtocolError::FrameTooLong { limit: 8 })
    ));
}

#[test]
fn oversize_terminated_frame_is_rejected() {
    let mut framer = LineFramer::new(4);
    framer.extend(b"abcdefgh\n");

    assert!(framer.next_frame().is_err());
}

#[test]
fn frame_at_limit_is_accepted() {
    let mut framer = LineFramer::new(4);
    framer.extend(b"abcd\n");

    assert_eq!(framer.next_frame().unwrap().as_deref(), Some("abcd"));
}

#[test]
fn long_line_fed_in_chunks_is_framed_once_terminated() {
    let mut framer = LineFramer::new(1024 * 1024);
    let chunk = [b'x'; 4096];

    for _ in 0..200 {
        framer.extend(&chunk);
        assert_eq!(framer.next_frame().unwrap(), None);
    }
    assert_eq!(framer.pending(), 200 * 4096);

    framer.extend(b"\n{\"event\":\"ping\"}\n");
    let line = framer.next_frame().unwrap().expect("terminated line");
    assert_eq!(line.len(), 200 * 4096);
    assert!(line.bytes().all(|b| b == b'x'));

    // The already-buffered follow-up line is found from the start again.
    assert_eq!(framer.next_frame().unwrap().as_deref(), Some("{\"event\":\"ping\"}"));
    assert_eq!(framer.pending(), 0);
}

#[test]
fn cap_still_applies_to_a_chunked_line() {
    let mut framer = LineFramer::new(10);
    framer.extend(b"012345");
    assert_eq!(framer.next_frame().unwrap(), None);

    framer.extend(b"6789ab");
    assert!(matches!(
        framer.next_frame(),
        Err(ProtocolError::FrameTooLong { limit: 10 })
    ));
}
