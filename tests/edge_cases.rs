#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for packet dispatch
//! Tests malformed payloads, unusual event names, binary sequencing errors and ack callbacks

use bytes::Bytes;
use eventwire::protocol::events;
use eventwire::{ChannelSink, EventClient, Packet, PacketKind, ProtocolError, Value};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

fn client() -> (EventClient, UnboundedReceiver<Packet>) {
    let (sink, rx) = ChannelSink::new();
    (EventClient::new(Arc::new(sink)), rx)
}

fn counter(client: &EventClient, name: impl Into<Value>) -> Arc<Mutex<Vec<Vec<Value>>>> {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let calls_clone = Arc::clone(&calls);
    client
        .on_event(name, move |args| calls_clone.lock().unwrap().push(args.to_vec()))
        .unwrap();
    calls
}

// ============================================================================
// MALFORMED PAYLOADS
// ============================================================================

#[test]
fn test_event_with_empty_payload_is_noop() {
    let (client, _rx) = client();
    let calls = counter(&client, "x");

    let packet = Packet::new(PacketKind::Event).with_payload(Value::Array(vec![]));
    client.handle_incoming_packet(packet, false).unwrap();
    client
        .handle_incoming_packet(Packet::new(PacketKind::Event), false)
        .unwrap();

    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_event_with_object_payload_is_noop() {
    let (client, _rx) = client();
    let calls = counter(&client, "x");

    let packet = Packet::new(PacketKind::Event).with_payload(Value::from(json!({"x": 1})));
    client.handle_incoming_packet(packet, false).unwrap();

    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_event_name_only() {
    let (client, _rx) = client();
    let calls = counter(&client, "ping");

    client
        .handle_incoming_packet(Packet::event("ping", vec![]), false)
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), vec![Vec::<Value>::new()]);
}

// ============================================================================
// EVENT NAMES
// ============================================================================

#[test]
fn test_numeric_event_name() {
    let (client, _rx) = client();
    let calls = counter(&client, 42i64);

    client
        .handle_incoming_packet(Packet::event(42i64, vec![Value::from("n")]), false)
        .unwrap();
    // A string "42" is a different key
    client
        .handle_incoming_packet(Packet::event("42", vec![Value::from("s")]), false)
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), vec![vec![Value::from("n")]]);
}

#[test]
fn test_unicode_and_empty_string_event_names() {
    let (client, _rx) = client();
    let unicode = counter(&client, "メッセージ");
    let empty = counter(&client, "");

    client
        .handle_incoming_packet(Packet::event("メッセージ", vec![]), false)
        .unwrap();
    client
        .handle_incoming_packet(Packet::event("", vec![]), false)
        .unwrap();

    assert_eq!(unicode.lock().unwrap().len(), 1);
    assert_eq!(empty.lock().unwrap().len(), 1);
}

#[test]
fn test_null_event_name_never_registers() {
    let (client, _rx) = client();
    let id = client.on_event(Value::Null, |_| panic!("never")).unwrap();
    assert!(id.is_none());

    let packet = Packet::new(PacketKind::Event).with_payload(Value::Array(vec![Value::Null]));
    client.handle_incoming_packet(packet, false).unwrap();
}

#[test]
fn test_error_with_structured_payload() {
    let (client, _rx) = client();
    let calls = counter(&client, events::ERROR);

    let payload = Value::from(json!({"message": "bad namespace"}));
    client
        .handle_incoming_packet(Packet::error(Some(payload)), false)
        .unwrap();

    assert_eq!(
        *calls.lock().unwrap(),
        vec![vec![Value::from(r#"{"message":"bad namespace"}"#)]]
    );
}

// ============================================================================
// BINARY SEQUENCING
// ============================================================================

#[test]
fn test_binary_attachments_substituted_in_index_order() {
    let (client, _rx) = client();
    let calls = counter(&client, "files");

    // Placeholders appear in reverse order in the payload
    let skeleton = Value::from(json!([
        "files",
        {"second": {"_placeholder": true, "num": 1}},
        {"first": {"_placeholder": true, "num": 0}}
    ]));
    client
        .handle_incoming_packet(Packet::binary_event(skeleton, 2), false)
        .unwrap();
    client
        .handle_incoming_packet(Packet::attachment(Bytes::from_static(b"A")), true)
        .unwrap();
    client
        .handle_incoming_packet(Packet::attachment(Bytes::from_static(b"B")), true)
        .unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let Value::Object(second) = &calls[0][0] else { panic!("expected object") };
    let Value::Object(first) = &calls[0][1] else { panic!("expected object") };
    assert_eq!(second["second"], Value::Bytes(Bytes::from_static(b"B")));
    assert_eq!(first["first"], Value::Bytes(Bytes::from_static(b"A")));
}

#[test]
fn test_one_frame_carrying_all_attachments() {
    let (client, _rx) = client();
    let calls = counter(&client, "pair");

    let skeleton = Value::Array(vec![
        Value::from("pair"),
        Value::placeholder(0),
        Value::placeholder(1),
    ]);
    client
        .handle_incoming_packet(Packet::binary_event(skeleton, 2), false)
        .unwrap();

    let mut frame = Packet::attachment(Bytes::from_static(b"x"));
    frame.attachments.push(Bytes::from_static(b"y"));
    client.handle_incoming_packet(frame, true).unwrap();

    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[test]
fn test_extra_attachment_after_completion_is_fatal() {
    let (client, _rx) = client();
    let skeleton = Value::Array(vec![Value::from("one"), Value::placeholder(0)]);
    client
        .handle_incoming_packet(Packet::binary_event(skeleton, 1), false)
        .unwrap();
    client
        .handle_incoming_packet(Packet::attachment(vec![1u8]), true)
        .unwrap();

    let result = client.handle_incoming_packet(Packet::attachment(vec![2u8]), true);
    assert!(matches!(result, Err(ProtocolError::UnexpectedAttachment { .. })));
}

#[test]
fn test_binary_packet_with_zero_attachments_dispatches_immediately() {
    let (client, _rx) = client();
    let calls = counter(&client, "bare");

    let skeleton = Value::Array(vec![Value::from("bare"), Value::from(1i64)]);
    client
        .handle_incoming_packet(Packet::binary_event(skeleton, 0), false)
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), vec![vec![Value::from(1i64)]]);
}

#[test]
fn test_placeholder_count_mismatch_is_fatal() {
    let (client, _rx) = client();
    let skeleton = Value::Array(vec![Value::from("short"), Value::placeholder(0)]);
    let result = client.handle_incoming_packet(Packet::binary_event(skeleton, 3), false);

    let err = result.unwrap_err();
    assert!(err.is_protocol_violation());
    assert!(matches!(
        err,
        ProtocolError::PlaceholderMismatch { declared: 3, found: 1 }
    ));
}

#[test]
fn test_plain_event_may_interleave_with_reconstruction() {
    let (client, _rx) = client();
    let chat = counter(&client, "chat");
    let blob = counter(&client, "blob");

    let skeleton = Value::Array(vec![Value::from("blob"), Value::placeholder(0)]);
    client
        .handle_incoming_packet(Packet::binary_event(skeleton, 1), false)
        .unwrap();
    client
        .handle_incoming_packet(Packet::event("chat", vec![]), false)
        .unwrap();
    client
        .handle_incoming_packet(Packet::attachment(vec![9u8]), true)
        .unwrap();

    assert_eq!(chat.lock().unwrap().len(), 1);
    assert_eq!(blob.lock().unwrap().len(), 1);
}

// ============================================================================
// ACK CALLBACKS
// ============================================================================

#[test]
fn test_ack_listener_may_ignore_callback() {
    let (client, mut rx) = client();
    client.on_ack("fire", |_, _ack| {}).unwrap();

    client
        .handle_incoming_packet(Packet::event("fire", vec![]).with_id(1), false)
        .unwrap();

    assert!(rx.try_recv().is_err());
}

#[test]
fn test_each_ack_listener_gets_its_own_callback() {
    let (client, mut rx) = client();
    for reply in ["first", "second"] {
        client
            .on_ack("multi", move |_, ack| {
                ack.unwrap().send(vec![Value::from(reply)]).unwrap();
            })
            .unwrap();
    }

    client
        .handle_incoming_packet(Packet::event("multi", vec![]).with_id(3), false)
        .unwrap();

    assert_eq!(rx.try_recv().unwrap(), Packet::ack(3, vec![Value::from("first")]));
    assert_eq!(rx.try_recv().unwrap(), Packet::ack(3, vec![Value::from("second")]));
}

#[test]
fn test_event_and_ack_listeners_both_run() {
    let (client, _rx) = client();
    let order = Arc::new(Mutex::new(Vec::new()));

    let o = Arc::clone(&order);
    client.on_ack("both", move |_, _| o.lock().unwrap().push("ack")).unwrap();
    let o = Arc::clone(&order);
    client.on_event("both", move |_| o.lock().unwrap().push("event")).unwrap();

    client
        .handle_incoming_packet(Packet::event("both", vec![]), false)
        .unwrap();

    // Plain listeners run before ack listeners
    assert_eq!(*order.lock().unwrap(), vec!["event", "ack"]);
}

#[test]
fn test_ack_send_after_disconnect_fails() {
    let (client, _rx) = client();
    let held = Arc::new(Mutex::new(None));

    let held_clone = Arc::clone(&held);
    client
        .on_ack("later", move |_, ack| *held_clone.lock().unwrap() = ack)
        .unwrap();
    client
        .handle_incoming_packet(Packet::event("later", vec![]).with_id(8), false)
        .unwrap();
    client.handle_incoming_packet(Packet::disconnect(), false).unwrap();

    let ack = held.lock().unwrap().take().unwrap();
    assert!(matches!(
        ack.send(vec![]),
        Err(ProtocolError::ConnectionClosed)
    ));
}
