use std::thread;
use std::time::Duration;

use serde_json::json;

use evhub::{EventRegistry, RegistryConfig, Trigger};

#[test]
fn stream_receives_payloads_dispatched_from_another_thread() {
    let events = EventRegistry::<serde_json::Value>::new();
    let stream = events.subscribe_channel("tick");

    let producer = events.clone();
    let worker = thread::spawn(move || {
        for i in 0..3 {
            producer.dispatch("tick", &json!({ "n": i })).unwrap();
        }
    });

    let mut got = Vec::new();
    for _ in 0..3 {
        got.push(stream.recv_timeout(Duration::from_secs(1)).unwrap());
    }
    worker.join().unwrap();

    assert_eq!(got, vec![json!({"n": 0}), json!({"n": 1}), json!({"n": 2})]);
    assert_eq!(stream.dropped(), 0);
}

#[test]
fn observing_stream_only_gets_matching_triggers() {
    let events = EventRegistry::<serde_json::Value>::new();
    let row_7 = events.subscribe_channel_observing("row.updated", [7]);
    let everything = events.subscribe_channel("row.updated");

    for id in [3, 7, 9] {
        events
            .trigger_filtered(Trigger::new("row.updated", &json!({ "id": id })).with_observe([id.to_string()]))
            .unwrap();
    }

    assert_eq!(row_7.drain(), vec![json!({"id": 7})]);
    assert_eq!(everything.drain().len(), 3);
}

#[test]
fn slow_reader_never_blocks_dispatch() {
    let events = EventRegistry::<u64>::with_config(RegistryConfig::default().with_stream_capacity(4));
    let stream = events.subscribe_channel("burst");

    for i in 0..100u64 {
        events.dispatch("burst", &i).unwrap();
    }

    assert_eq!(stream.drain(), vec![0, 1, 2, 3]);
    assert_eq!(stream.dropped(), 96);
}

#[test]
fn dropping_one_stream_leaves_the_other_subscribed() {
    let events = EventRegistry::<u32>::new();
    let keep = events.subscribe_channel("e");
    let gone = events.subscribe_channel("e");
    assert_eq!(events.subscriptions("e").unwrap().entries.len(), 2);

    drop(gone);
    let snap = events.subscriptions("e").unwrap();
    assert_eq!(snap.entries.len(), 1);
    assert_eq!(snap.entries[0].callback_ids, vec![keep.callback_id()]);

    events.dispatch("e", &5).unwrap();
    assert_eq!(keep.try_recv().unwrap(), Some(5));
}
