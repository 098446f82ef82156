use std::sync::Arc;

use serde_json::json;

use graphsocial::members::MemberService;
use graphsocial::models::Uid;
use graphsocial::notifications::NotificationReader;
use graphsocial::store::{AttrMap, EdgeKind, GraphStore, SqliteGraph};

fn setup() -> (Arc<SqliteGraph>, MemberService, NotificationReader) {
    let store = Arc::new(SqliteGraph::in_memory().unwrap());
    let members = MemberService::new(store.clone());
    let reader = NotificationReader::new(store.clone());
    (store, members, reader)
}

fn create_user(store: &SqliteGraph, name: &str) -> Uid {
    let mut attrs = AttrMap::new();
    attrs.insert("username".to_string(), json!(name));
    attrs.insert("email".to_string(), json!(format!("{}@test.com", name)));
    attrs.insert("avatar".to_string(), json!(format!("https://img.test/{}.png", name)));
    store.create_node("user", attrs).unwrap().id().clone()
}

#[test]
fn a_follow_notifies_the_followee() {
    let (store, members, reader) = setup();
    let alice = create_user(&store, "alice");
    let bob = create_user(&store, "bob");

    members.follow(&alice, bob.as_str()).unwrap();

    let batch = reader.read_next(&bob, 10).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].username, "alice");
    assert_eq!(batch[0].avatar, "https://img.test/alice.png");
    assert_eq!(batch[0].label, "follow");

    // the follower hears nothing
    assert!(reader.read_next(&alice, 10).unwrap().is_empty());
}

#[test]
fn entries_are_delivered_exactly_once() {
    let (store, members, reader) = setup();
    let alice = create_user(&store, "alice");
    let bob = create_user(&store, "bob");

    members.follow(&alice, bob.as_str()).unwrap();

    assert_eq!(reader.read_next(&bob, 10).unwrap().len(), 1);
    assert!(reader.read_next(&bob, 10).unwrap().is_empty());
    assert!(reader.read_next(&bob, 10).unwrap().is_empty());
}

#[test]
fn batches_are_capped_at_five() {
    let (store, members, reader) = setup();
    let bob = create_user(&store, "bob");
    for i in 0..7 {
        let fan = create_user(&store, &format!("fan{}", i));
        members.follow(&fan, bob.as_str()).unwrap();
    }

    assert_eq!(reader.read_next(&bob, 100).unwrap().len(), 5);
    assert_eq!(reader.read_next(&bob, 100).unwrap().len(), 2);
    assert!(reader.read_next(&bob, 100).unwrap().is_empty());
}

#[test]
fn the_caller_may_ask_for_less_than_the_cap() {
    let (store, members, reader) = setup();
    let bob = create_user(&store, "bob");
    for i in 0..4 {
        let fan = create_user(&store, &format!("fan{}", i));
        members.follow(&fan, bob.as_str()).unwrap();
    }

    assert_eq!(reader.read_next(&bob, 3).unwrap().len(), 3);
    assert_eq!(reader.read_next(&bob, 3).unwrap().len(), 1);
}

#[test]
fn delivery_order_is_chronological() {
    let (store, members, reader) = setup();
    let bob = create_user(&store, "bob");
    let first = create_user(&store, "first");
    let second = create_user(&store, "second");

    members.follow(&first, bob.as_str()).unwrap();
    members.follow(&second, bob.as_str()).unwrap();

    let batch = reader.read_next(&bob, 10).unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].username, "first");
    assert_eq!(batch[1].username, "second");
}

#[test]
fn unresolvable_entries_are_consumed_and_dropped() {
    let (store, members, reader) = setup();
    let alice = create_user(&store, "alice");
    let bob = create_user(&store, "bob");
    let carol = create_user(&store, "carol");

    members.follow(&alice, bob.as_str()).unwrap();
    members.follow(&carol, bob.as_str()).unwrap();

    // alice's follow edge vanishes before bob reads
    let edges = store.edges_from_to(&alice, &bob, EdgeKind::Follow).unwrap();
    store.destroy_edge(&edges[0].id).unwrap();

    let batch = reader.read_next(&bob, 10).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].username, "carol");

    // the dead entry does not come back either
    assert!(reader.read_next(&bob, 10).unwrap().is_empty());
}

#[test]
fn a_custom_batch_limit_is_honored() {
    let store = Arc::new(SqliteGraph::in_memory().unwrap());
    let members = MemberService::new(store.clone());
    let reader = NotificationReader::with_batch_limit(store.clone(), 2);

    let bob = create_user(&store, "bob");
    for i in 0..3 {
        let fan = create_user(&store, &format!("fan{}", i));
        members.follow(&fan, bob.as_str()).unwrap();
    }

    assert_eq!(reader.read_next(&bob, 10).unwrap().len(), 2);
    assert_eq!(reader.read_next(&bob, 10).unwrap().len(), 1);
}
