//! Engine behaviour against a scripted peer.

use std::time::Duration;

use bytes::Bytes;
use sporelink_test::{peer, MockTransport};
use sporelink_ws::{
    CloseCode, CloseFrame, ConnectionState, Frame, FrameError, OpCode, Readiness, Received,
    WebSocket, WebSocketConfig, WsError,
};

fn connect(mock: &MockTransport) -> WebSocket<MockTransport> {
    WebSocket::new(mock.clone(), WebSocketConfig::default()).unwrap()
}

fn close_payload(frame: &Frame) -> &[u8] {
    assert_eq!(frame.opcode, OpCode::Close);
    &frame.payload
}

#[test]
fn construction_switches_to_nonblocking() {
    let mock = MockTransport::new();
    let ws = connect(&mock);
    assert!(mock.is_nonblocking());
    assert_eq!(ws.state(), ConnectionState::Open);
    assert!(ws.connected_at() <= ws.last_activity());
}

#[test]
fn idle_socket_yields_no_data() {
    let mock = MockTransport::new();
    let mut ws = connect(&mock);
    for _ in 0..3 {
        assert_eq!(ws.recv().unwrap(), Received::NoData);
    }
    assert!(ws.is_open());
    assert!(mock.written().is_empty());
}

#[test]
fn pings_are_answered_and_never_surfaced() {
    let mock = MockTransport::new();
    let mut wire = peer::ping("one");
    wire.extend(peer::text("A"));
    wire.extend(peer::ping("two"));
    wire.extend(peer::text("B"));
    mock.push_bytes(wire);
    let mut ws = connect(&mock);

    assert_eq!(ws.recv().unwrap(), Received::Text("A".into()));
    assert_eq!(mock.written_frames().unwrap(), vec![Frame::pong("one")]);

    assert_eq!(ws.recv().unwrap(), Received::Text("B".into()));
    assert_eq!(
        mock.written_frames().unwrap(),
        vec![Frame::pong("one"), Frame::pong("two")]
    );

    assert_eq!(ws.recv().unwrap(), Received::NoData);
}

#[test]
fn pongs_are_absorbed() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::pong("late"));
    mock.push_bytes(peer::binary([1u8, 2, 3]));
    let mut ws = connect(&mock);

    assert_eq!(
        ws.recv().unwrap(),
        Received::Binary(Bytes::from_static(&[1, 2, 3]))
    );
    assert!(mock.written().is_empty());
}

#[test]
fn frames_arriving_together_are_all_surfaced() {
    let mock = MockTransport::new();
    let mut wire = peer::text("first");
    wire.extend(peer::text("second"));
    mock.push_bytes(wire);
    let mut ws = connect(&mock);

    assert_eq!(ws.recv().unwrap(), Received::Text("first".into()));
    assert!(ws.buffered() > 0);
    assert_eq!(ws.recv().unwrap(), Received::Text("second".into()));
    assert_eq!(ws.buffered(), 0);
}

#[test]
fn byte_at_a_time_delivery() {
    let mock = MockTransport::new();
    let wire = peer::text("hello");
    mock.push_chunked(&wire, 1);
    let mut ws = connect(&mock);

    let mut stalls = 0;
    let received = loop {
        match ws.recv().unwrap() {
            Received::NoData => stalls += 1,
            other => break other,
        }
    };
    assert_eq!(received, Received::Text("hello".into()));
    assert_eq!(stalls, wire.len() - 1);
}

#[test]
fn small_read_chunks_reassemble_large_frames() {
    let mock = MockTransport::new();
    let payload = vec![0x5Au8; 5_000];
    mock.push_bytes(peer::binary(&payload));
    let mut ws =
        WebSocket::new(mock.clone(), WebSocketConfig::new().read_chunk_size(7)).unwrap();

    assert_eq!(ws.recv().unwrap(), Received::Binary(Bytes::from(payload)));
}

#[test]
fn close_twice_writes_one_frame() {
    let mock = MockTransport::new();
    let mut ws = connect(&mock);

    ws.close(CloseCode::GoingAway, "rebooting");
    ws.close(CloseCode::Normal, "");

    let frames = mock.written_frames().unwrap();
    assert_eq!(frames, vec![Frame::close(CloseCode::GoingAway, "rebooting")]);
    assert_eq!(mock.shutdowns(), 1);
    assert_eq!(ws.state(), ConnectionState::Closed);

    assert!(matches!(ws.recv(), Err(WsError::Closed)));
    assert!(matches!(ws.send_text("x"), Err(WsError::Closed)));
    assert!(!mock.used_after_shutdown());
}

#[test]
fn remote_close_is_acknowledged_once() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::close(1001, "bye"));
    let mut ws = connect(&mock);

    let expected = Received::RemoteClosed(Some(CloseFrame::new(CloseCode::GoingAway, "bye")));
    assert_eq!(ws.recv().unwrap(), expected);
    assert_eq!(ws.state(), ConnectionState::Closed);
    assert_eq!(ws.remote_close().map(|f| f.code), Some(1001));

    // Subsequent calls keep reporting the close without touching the socket.
    assert_eq!(ws.recv().unwrap(), expected);
    drop(ws);

    let frames = mock.written_frames().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(close_payload(&frames[0]), &[0x03, 0xE9]);
    assert_eq!(mock.shutdowns(), 1);
    assert!(!mock.used_after_shutdown());
}

#[test]
fn empty_remote_close_is_answered_with_normal() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::close_empty());
    let mut ws = connect(&mock);

    assert_eq!(ws.recv().unwrap(), Received::RemoteClosed(None));
    let frames = mock.written_frames().unwrap();
    assert_eq!(close_payload(&frames[0]), &CloseCode::Normal.to_be_bytes());
}

#[test]
fn data_after_remote_close_is_ignored() {
    let mock = MockTransport::new();
    let mut wire = peer::close(1000, "");
    wire.extend(peer::text("ghost"));
    mock.push_bytes(wire);
    let mut ws = connect(&mock);

    assert!(ws.recv().unwrap().is_remote_closed());
    assert!(ws.recv().unwrap().is_remote_closed());
    assert_eq!(ws.buffered(), 0);
}

#[test]
fn fragmented_frame_is_a_protocol_error() {
    let mock = MockTransport::new();
    // FIN clear, text opcode, one byte of payload.
    mock.push_bytes(peer::raw(0x01, 0x01, b"a"));
    let mut ws = connect(&mock);

    let err = ws.recv().unwrap_err();
    assert!(matches!(err, WsError::Protocol(FrameError::Fragmented)));
    assert!(err.is_fatal());
    assert!(!ws.is_open());

    let frames = mock.written_frames().unwrap();
    assert_eq!(close_payload(&frames[0]), &CloseCode::Protocol.to_be_bytes());
}

#[test]
fn continuation_frame_is_a_protocol_error() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::raw(0x80, 0x00, b""));
    let mut ws = connect(&mock);

    assert!(matches!(
        ws.recv(),
        Err(WsError::Protocol(FrameError::UnexpectedContinuation))
    ));
}

#[test]
fn reserved_bits_and_opcodes_are_rejected() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::raw(0xC1, 0x00, b""));
    let mut ws = connect(&mock);
    assert!(matches!(
        ws.recv(),
        Err(WsError::Protocol(FrameError::ReservedBits(_)))
    ));

    let mock = MockTransport::new();
    mock.push_bytes(peer::raw(0x83, 0x00, b""));
    let mut ws = connect(&mock);
    assert!(matches!(
        ws.recv(),
        Err(WsError::Protocol(FrameError::InvalidOpCode(3)))
    ));
}

#[test]
fn oversized_frame_closes_with_too_big() {
    let mock = MockTransport::new();
    let declared: u64 = 1 << 40;
    mock.push_bytes(peer::raw(0x82, 127, &declared.to_be_bytes()));
    let mut ws =
        WebSocket::new(mock.clone(), WebSocketConfig::new().max_frame_size(1024)).unwrap();

    let err = ws.recv().unwrap_err();
    assert!(matches!(
        err,
        WsError::FrameTooLarge { len, max: 1024 } if len == declared
    ));
    assert_eq!(ws.buffered(), 0);
    assert!(!ws.is_open());

    let frames = mock.written_frames().unwrap();
    assert_eq!(close_payload(&frames[0]), &CloseCode::MessageTooBig.to_be_bytes());
}

#[test]
fn frame_at_the_limit_is_accepted() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::binary([9u8; 64]));
    let mut ws =
        WebSocket::new(mock.clone(), WebSocketConfig::new().max_frame_size(64)).unwrap();
    assert!(ws.recv().unwrap().is_data());
}

#[test]
fn invalid_utf8_closes_with_invalid_payload() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::frame(OpCode::Text, [0xF0, 0x28, 0x8C, 0x28]));
    let mut ws = connect(&mock);

    assert!(matches!(ws.recv(), Err(WsError::InvalidUtf8(_))));
    let frames = mock.written_frames().unwrap();
    assert_eq!(
        close_payload(&frames[0]),
        &CloseCode::InvalidPayload.to_be_bytes()
    );
}

#[test]
fn eof_without_close_is_peer_closed() {
    let mock = MockTransport::new();
    mock.push_bytes(&peer::text("partial")[..3]).close_remote();
    let mut ws = connect(&mock);

    assert!(matches!(ws.recv(), Err(WsError::PeerClosed)));
    assert!(mock.written().is_empty());
    assert!(matches!(ws.recv(), Err(WsError::Closed)));
    assert!(!mock.used_after_shutdown());
}

#[test]
fn sent_frames_are_masked_and_decodable() {
    let mock = MockTransport::new();
    let mut ws = connect(&mock);

    ws.send_text("status").unwrap();
    ws.send_binary(vec![0u8, 1, 2]).unwrap();
    ws.send_json(&serde_json::json!({"t": 21.5})).unwrap();
    ws.ping(b"hb").unwrap();

    let frames = mock.written_frames().unwrap();
    assert_eq!(
        frames,
        vec![
            Frame::text("status"),
            Frame::binary(vec![0u8, 1, 2]),
            Frame::text(r#"{"t":21.5}"#),
            Frame::ping("hb"),
        ]
    );
}

#[test]
fn write_failure_is_fatal() {
    let mock = MockTransport::new();
    let mut ws = connect(&mock);
    mock.fail_writes(true);

    let err = ws.send_text("lost").unwrap_err();
    assert!(matches!(err, WsError::Io(_)));
    assert!(!ws.is_open());
    assert_eq!(mock.shutdowns(), 1);
}

#[test]
fn failed_pong_is_fatal() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::ping("?"));
    let mut ws = connect(&mock);
    mock.fail_writes(true);

    assert!(matches!(ws.recv(), Err(WsError::Io(_))));
    assert!(!ws.is_open());
}

#[test]
fn close_survives_write_failure() {
    let mock = MockTransport::new();
    let mut ws = connect(&mock);
    mock.fail_writes(true);

    ws.close(CloseCode::Normal, "");
    assert_eq!(ws.state(), ConnectionState::Closed);
    assert_eq!(mock.shutdowns(), 1);
}

#[test]
fn check_connection_answers_pings() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::ping("alive?"));
    let mut ws = connect(&mock);

    assert!(ws.check_connection());
    assert_eq!(mock.written_frames().unwrap(), vec![Frame::pong("alive?")]);
    assert_eq!(ws.recv().unwrap(), Received::NoData);
}

#[test]
fn check_connection_keeps_data_for_recv() {
    let mock = MockTransport::new();
    let mut wire = peer::text("reading");
    wire.extend(peer::ping("p"));
    mock.push_bytes(wire);
    let mut ws = connect(&mock);

    assert!(ws.check_connection());
    // The ping sits behind a data frame and waits for recv.
    assert!(mock.written().is_empty());

    assert_eq!(ws.recv().unwrap(), Received::Text("reading".into()));
    assert_eq!(ws.recv().unwrap(), Received::NoData);
    assert_eq!(mock.written_frames().unwrap(), vec![Frame::pong("p")]);
}

#[test]
fn check_connection_handles_remote_close() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::close(1000, "done"));
    let mut ws = connect(&mock);

    assert!(!ws.check_connection());
    assert_eq!(ws.state(), ConnectionState::Closed);
    assert_eq!(ws.remote_close().map(|f| f.reason.as_str()), Some("done"));
    assert_eq!(mock.written_frames().unwrap().len(), 1);
}

#[test]
fn check_connection_detects_hangup() {
    let mock = MockTransport::new();
    mock.close_remote();
    let mut ws = connect(&mock);

    assert!(!ws.check_connection());
    assert!(!ws.is_open());
    assert!(mock.written().is_empty());
    assert!(!ws.check_connection());
}

#[test]
fn check_connection_detects_socket_error() {
    let mock = MockTransport::new();
    let mut ws = connect(&mock);
    assert!(ws.check_connection());

    mock.set_readiness(Some(Readiness {
        error: true,
        ..Readiness::IDLE
    }));
    assert!(!ws.check_connection());
    assert_eq!(mock.shutdowns(), 1);
}

#[test]
fn check_connection_reports_protocol_errors() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::raw(0x8B, 0x00, b""));
    let mut ws = connect(&mock);

    assert!(!ws.check_connection());
    let frames = mock.written_frames().unwrap();
    assert_eq!(close_payload(&frames[0]), &CloseCode::Protocol.to_be_bytes());
}

#[test]
fn drop_closes_normally() {
    let mock = MockTransport::new();
    {
        let _ws = connect(&mock);
    }
    let frames = mock.written_frames().unwrap();
    assert_eq!(frames, vec![Frame::close(CloseCode::Normal, "")]);
    assert_eq!(mock.shutdowns(), 1);
}

#[test]
fn debug_flag_does_not_change_behaviour() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::ping("x"));
    mock.push_bytes(peer::text("y"));
    let mut ws = WebSocket::new(mock.clone(), WebSocketConfig::new().debug(true)).unwrap();

    assert_eq!(ws.recv().unwrap(), Received::Text("y".into()));
    assert_eq!(mock.written_frames().unwrap(), vec![Frame::pong("x")]);
}

#[test]
fn received_json_helper() {
    let mock = MockTransport::new();
    mock.push_bytes(peer::text(r#"{"cmd":"water","ml":250}"#));
    let mut ws = connect(&mock);

    let value: serde_json::Value = ws.recv().unwrap().json().unwrap();
    assert_eq!(value["cmd"], "water");
    assert_eq!(value["ml"], 250);
}

#[test]
fn close_buffered_behind_data_survives_hangup() {
    let mock = MockTransport::new();
    let mut wire = peer::text("last");
    wire.extend(peer::close(1000, "bye"));
    mock.push_bytes(wire).close_remote();
    let mut ws = connect(&mock);

    assert_eq!(ws.recv().unwrap(), Received::Text("last".into()));
    assert!(ws.buffered() > 0);

    let expected = CloseFrame::new(CloseCode::Normal, "bye");
    assert!(!ws.check_connection());
    assert_eq!(ws.remote_close(), Some(&expected));

    let frames = mock.written_frames().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(close_payload(&frames[0]), &CloseCode::Normal.to_be_bytes());

    assert_eq!(ws.recv().unwrap(), Received::RemoteClosed(Some(expected)));
    assert!(!mock.used_after_shutdown());
}

#[test]
fn ping_buffered_before_hangup_is_answered() {
    let mock = MockTransport::new();
    let mut wire = peer::text("reading");
    wire.extend(peer::ping("hb"));
    mock.push_bytes(wire).close_remote();
    let mut ws = connect(&mock);

    assert!(ws.recv().unwrap().is_data());
    assert!(!ws.check_connection());
    assert_eq!(mock.written_frames().unwrap(), vec![Frame::pong("hb")]);
    assert!(matches!(ws.recv(), Err(WsError::Closed)));
}

#[test]
fn data_buffered_at_hangup_is_still_delivered() {
    let mock = MockTransport::new();
    let mut wire = peer::text("a");
    wire.extend(peer::text("b"));
    wire.extend(peer::close(1001, ""));
    mock.push_bytes(wire).close_remote();
    let mut ws = connect(&mock);

    assert_eq!(ws.recv().unwrap(), Received::Text("a".into()));
    assert!(ws.check_connection());
    assert_eq!(ws.recv().unwrap(), Received::Text("b".into()));
    assert!(!ws.check_connection());
    assert_eq!(ws.remote_close().map(|f| f.code), Some(1001));
    assert!(ws.recv().unwrap().is_remote_closed());
}

#[test]
fn partial_frame_at_hangup_closes() {
    let mock = MockTransport::new();
    let mut wire = peer::text("whole");
    wire.extend_from_slice(&peer::text("cut short")[..4]);
    mock.push_bytes(wire).close_remote();
    let mut ws = connect(&mock);

    assert!(ws.recv().unwrap().is_data());
    assert!(!ws.check_connection());
    assert!(mock.written().is_empty());
    assert!(matches!(ws.recv(), Err(WsError::Closed)));
}

#[test]
fn full_transport_does_not_split_frames() {
    let mock = MockTransport::new();
    let mut ws = connect(&mock);
    mock.stall_writes(3).max_write(Some(5));

    let payload = vec![7u8; 300];
    ws.send_binary(payload.clone()).unwrap();
    ws.send_text("next").unwrap();

    assert!(ws.is_open());
    assert_eq!(
        mock.written_frames().unwrap(),
        vec![Frame::binary(payload), Frame::text("next")]
    );
}

#[test]
fn stuck_transport_times_out_and_closes() {
    let mock = MockTransport::new();
    let config = WebSocketConfig::new().write_timeout(Duration::from_millis(20));
    let mut ws = WebSocket::new(mock.clone(), config).unwrap();
    mock.stall_writes(usize::MAX);

    let err = ws.send_text("never").unwrap_err();
    assert!(matches!(&err, WsError::Io(e) if e.kind() == std::io::ErrorKind::TimedOut));
    assert!(err.is_fatal());
    assert!(!ws.is_open());
    assert_eq!(mock.shutdowns(), 1);
}

#[test]
fn local_only_close_codes_go_out_as_normal() {
    for code in [
        CloseCode::NoStatus,
        CloseCode::Abnormal,
        CloseCode::TlsHandshake,
    ] {
        let mock = MockTransport::new();
        let mut ws = connect(&mock);
        ws.close(code, "gone");
        assert_eq!(
            mock.written_frames().unwrap(),
            vec![Frame::close(CloseCode::Normal, "gone")]
        );
    }
}
