#![cfg(unix)]

use std::sync::mpsc;
use std::time::{Duration, Instant};

use pipebus_channel::{Channel, ChannelConfig, ChannelState};

fn unique_name(tag: &str) -> String {
    format!(
        "it-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .subsec_nanos()
    )
}

#[test]
fn pub_sub_roundtrip_between_two_channels() {
    let name = unique_name("roundtrip");
    let receiver = Channel::open(&name).expect("first open should create");
    let sender = Channel::open(&name).expect("second open should connect");

    let (tx, rx) = mpsc::channel();
    receiver.subscribe("Topic1", move |payload| {
        let _ = tx.send(payload);
    });

    let delivered = sender
        .post_message("Topic1", b"hello")
        .expect("post should not error");
    assert!(delivered, "delivery should be confirmed via the ack");

    let payload = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("callback should receive the payload");
    assert_eq!(payload.as_ref(), b"hello");

    // "Topic1:hello" is 12 bytes on the wire; the matching ack is what
    // confirmed the post above.
    assert_eq!(receiver.stats().acks_sent, 1);
    assert_eq!(sender.stats().posts_confirmed, 1);
}

#[test]
fn both_directions_work_on_one_pair() {
    let name = unique_name("duplex");
    let creator = Channel::open(&name).unwrap();
    let connector = Channel::open(&name).unwrap();

    let (to_creator_tx, to_creator_rx) = mpsc::channel();
    creator.subscribe("ping", move |payload| {
        let _ = to_creator_tx.send(payload);
    });
    let (to_connector_tx, to_connector_rx) = mpsc::channel();
    connector.subscribe("pong", move |payload| {
        let _ = to_connector_tx.send(payload);
    });

    assert!(connector.post_message("ping", b"from-connector").unwrap());
    assert!(creator.post_message("pong", b"from-creator").unwrap());

    assert_eq!(
        to_creator_rx
            .recv_timeout(Duration::from_secs(2))
            .unwrap()
            .as_ref(),
        b"from-connector"
    );
    assert_eq!(
        to_connector_rx
            .recv_timeout(Duration::from_secs(2))
            .unwrap()
            .as_ref(),
        b"from-creator"
    );
}

#[test]
fn unsubscribed_topic_is_acked_and_counted() {
    let name = unique_name("miss");
    let receiver = Channel::open(&name).unwrap();
    let sender = Channel::open(&name).unwrap();

    let delivered = sender.post_message("nobody-home", b"dropped").unwrap();
    assert!(delivered, "ack is unconditional, subscriber or not");
    assert_eq!(receiver.stats().topic_misses, 1);
}

#[test]
fn large_payload_survives_accumulated_reads() {
    let name = unique_name("large");
    let receiver = Channel::open(&name).unwrap();
    let sender = Channel::open(&name).unwrap();

    let (tx, rx) = mpsc::channel();
    receiver.subscribe("bulk", move |payload| {
        let _ = tx.send(payload);
    });

    let payload = vec![0xC3u8; 8 * 1024];
    assert!(sender.post_message("bulk", &payload).unwrap());

    let received = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(received.as_ref(), payload.as_slice());
}

#[test]
fn custom_delimiter_allows_colons_in_topics() {
    let name = unique_name("delim");
    let config = ChannelConfig {
        delimiter: b'|',
        ..ChannelConfig::default()
    };
    let receiver = Channel::open_with_config(&name, config.clone()).unwrap();
    let sender = Channel::open_with_config(&name, config).unwrap();

    let (tx, rx) = mpsc::channel();
    receiver.subscribe("svc:orders", move |payload| {
        let _ = tx.send(payload);
    });

    assert!(sender.post_message("svc:orders", b"colons ok").unwrap());
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)).unwrap().as_ref(),
        b"colons ok"
    );
}

#[test]
fn post_without_peer_returns_unconfirmed() {
    let name = unique_name("alone");
    let config = ChannelConfig {
        retries: 1,
        retry_delay: Duration::from_millis(10),
        ..ChannelConfig::default()
    };
    let lonely = Channel::open_with_config(&name, config).unwrap();

    let delivered = lonely.post_message("void", b"anyone").unwrap();
    assert!(!delivered);
    assert_eq!(lonely.stats().posts_unconfirmed, 1);
}

#[test]
fn rebind_reaches_running_on_the_new_name() {
    let old_name = unique_name("rebind-old");
    let new_name = unique_name("rebind-new");

    let channel = Channel::open(&old_name).unwrap();
    assert_eq!(channel.state(), ChannelState::Running);

    channel.rebind(&new_name).expect("rebind should succeed");
    assert_eq!(channel.state(), ChannelState::Running);
    assert_eq!(channel.name(), new_name);

    // The rebound channel is fully usable under the new name.
    let peer = Channel::open(&new_name).unwrap();
    let (tx, rx) = mpsc::channel();
    channel.subscribe("after-rebind", move |payload| {
        let _ = tx.send(payload);
    });
    assert!(peer.post_message("after-rebind", b"still here").unwrap());
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)).unwrap().as_ref(),
        b"still here"
    );
}

#[test]
fn teardown_does_not_wait_for_slow_callbacks() {
    let name = unique_name("slowcb");
    let receiver = Channel::open(&name).unwrap();
    let sender = Channel::open(&name).unwrap();

    let (started_tx, started_rx) = mpsc::channel();
    receiver.subscribe("slow", move |_payload| {
        let _ = started_tx.send(());
        std::thread::sleep(Duration::from_secs(3));
    });

    assert!(sender.post_message("slow", b"take your time").unwrap());
    started_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("callback should have started");

    let begun = Instant::now();
    receiver.close();
    assert!(
        begun.elapsed() < Duration::from_secs(2),
        "close must not block on an in-flight callback"
    );
    assert_eq!(receiver.state(), ChannelState::Closed);
}

#[test]
fn panicking_callback_does_not_kill_the_loop() {
    let name = unique_name("panic");
    let receiver = Channel::open(&name).unwrap();
    let sender = Channel::open(&name).unwrap();

    receiver.subscribe("explode", |_payload| panic!("subscriber bug"));
    let (tx, rx) = mpsc::channel();
    receiver.subscribe("after", move |payload| {
        let _ = tx.send(payload);
    });

    assert!(sender.post_message("explode", b"boom").unwrap());
    assert!(sender.post_message("after", b"still alive").unwrap());

    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)).unwrap().as_ref(),
        b"still alive"
    );
}
