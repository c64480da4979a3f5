use grc_core::db::open_db_in_memory;
use grc_core::{
    ActivityAction, ActivityError, ActivityFeed, ActivityKind, MemorySessionStore, SessionStore,
    SqliteSessionStore,
};

#[test]
fn record_prepends_newest_first() {
    let mut feed = ActivityFeed::open(MemorySessionStore::new(), 10);

    feed.record(ActivityKind::Asset, ActivityAction::Created, "laptop-42")
        .unwrap();
    feed.record(ActivityKind::Risk, ActivityAction::Updated, "ransomware")
        .unwrap();

    let labels: Vec<&str> = feed.recent(10).iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["ransomware", "laptop-42"]);
    assert_eq!(feed.recent(1).len(), 1);
}

#[test]
fn feed_is_bounded_by_capacity() {
    let mut feed = ActivityFeed::open(MemorySessionStore::new(), 3);
    for index in 0..5 {
        feed.record(
            ActivityKind::Control,
            ActivityAction::Updated,
            format!("control {index}"),
        )
        .unwrap();
    }

    assert_eq!(feed.len(), 3);
    assert_eq!(feed.recent(10)[0].label, "control 4");
    assert_eq!(feed.recent(10)[2].label, "control 2");
}

#[test]
fn blank_label_is_rejected() {
    let mut feed = ActivityFeed::open(MemorySessionStore::new(), 3);
    let err = feed
        .record(ActivityKind::Evidence, ActivityAction::Created, "   ")
        .unwrap_err();
    assert_eq!(err, ActivityError::EmptyLabel);
    assert!(feed.is_empty());
}

#[test]
fn feed_survives_reopen_and_clear_removes_it() {
    let conn = open_db_in_memory().unwrap();
    {
        let store = SqliteSessionStore::try_new(&conn, "tab-1").unwrap();
        let mut feed = ActivityFeed::open(store, 50);
        feed.record(ActivityKind::Mapping, ActivityAction::Exported, "draft v7")
            .unwrap();
    }

    let store = SqliteSessionStore::try_new(&conn, "tab-1").unwrap();
    let mut feed = ActivityFeed::open(store, 50);
    assert_eq!(feed.len(), 1);
    assert_eq!(feed.recent(5)[0].kind, ActivityKind::Mapping);
    assert_eq!(feed.recent(5)[0].action, ActivityAction::Exported);

    feed.clear();
    let store = SqliteSessionStore::try_new(&conn, "tab-1").unwrap();
    assert_eq!(store.get_item("activity_feed").unwrap(), None);
}

#[test]
fn corrupt_persisted_feed_starts_empty() {
    let mut store = MemorySessionStore::new();
    store.set_item("activity_feed", "[{broken").unwrap();

    let feed = ActivityFeed::open(store, 10);
    assert!(feed.is_empty());
}

#[test]
fn reopening_with_smaller_capacity_trims_entries() {
    let mut store = MemorySessionStore::new();
    {
        let mut feed = ActivityFeed::open(&mut store, 10);
        for label in ["a", "b", "c"] {
            feed.record(ActivityKind::Compliance, ActivityAction::Updated, label)
                .unwrap();
        }
    }

    let feed = ActivityFeed::open(&mut store, 2);
    let labels: Vec<&str> = feed.recent(10).iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["c", "b"]);
}
