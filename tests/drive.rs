#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Async ingestion loop tests

use bytes::Bytes;
use eventwire::transport::channel::{drive, inbound_channel};
use eventwire::{AckManager, ChannelSink, EventClient, Packet, ProtocolError, Value};
use eventwire::config::EventConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn test_drive_processes_stream_in_order() {
    let (sink, mut outbound) = ChannelSink::new();
    let client = EventClient::new(Arc::new(sink));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_clone = Arc::clone(&seen);
    client
        .on_ack("echo", move |args, ack| {
            seen_clone.lock().unwrap().push(args.to_vec());
            if let Some(ack) = ack {
                ack.send(args.to_vec()).unwrap();
            }
        })
        .unwrap();

    let frames = vec![
        (Packet::event("echo", vec![Value::from("a")]), false),
        (
            Packet::binary_event(
                Value::Array(vec![Value::from("echo"), Value::placeholder(0)]),
                1,
            )
            .with_id(2),
            false,
        ),
        (Packet::attachment(Bytes::from_static(b"raw")), true),
    ];
    // A binary event with an id is routed as an ACK reply, not to listeners
    drive(&client, futures::stream::iter(frames)).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![vec![Value::from("a")]]);
    assert!(outbound.try_recv().is_err());
    assert_eq!(client.metrics().snapshot().acks_resolved, 1);
}

#[tokio::test]
async fn test_drive_stops_on_protocol_violation() {
    let (sink, _outbound) = ChannelSink::new();
    let sink = Arc::new(sink);
    let client = EventClient::new(sink.clone());
    let (tx, incoming) = inbound_channel();

    tx.send((Packet::attachment(vec![1u8]), true)).unwrap();
    tx.send((Packet::event("never", vec![]), false)).unwrap();

    let result = timeout(Duration::from_secs(1), drive(&client, incoming))
        .await
        .expect("drive returns without waiting for more frames");

    assert!(matches!(result, Err(ProtocolError::UnexpectedAttachment { .. })));
    assert!(sink.is_closed());
    assert_eq!(client.metrics().snapshot().packets_received, 1);
}

#[tokio::test]
async fn test_outgoing_request_resolved_by_incoming_ack() {
    let (sink, _outbound) = ChannelSink::new();
    let acks = Arc::new(AckManager::new());
    let client = EventClient::with_config(Arc::new(sink), acks.clone(), EventConfig::default());

    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    let id = acks
        .register(move |args| {
            let _ = reply_tx.send(args);
        })
        .unwrap();

    let (tx, incoming) = inbound_channel();
    tx.send((Packet::ack(id, vec![Value::from("ok"), Value::from(42i64)]), false))
        .unwrap();
    drop(tx);

    drive(&client, incoming).await.unwrap();

    let reply = reply_rx.await.unwrap();
    assert_eq!(reply, vec![Value::from("ok"), Value::from(42i64)]);
    assert_eq!(acks.pending(), 0);
}
