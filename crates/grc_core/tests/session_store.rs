use grc_core::db::open_db_in_memory;
use grc_core::{draft_versions, SessionStore, SqliteSessionStore, StoreError};
use rusqlite::Connection;

#[test]
fn set_get_and_replace_item() {
    let conn = open_db_in_memory().unwrap();
    let mut store = SqliteSessionStore::try_new(&conn, "tab-1").unwrap();

    assert_eq!(store.get_item("mm_draft_v1").unwrap(), None);
    store.set_item("mm_draft_v1", "{\"a\":1}").unwrap();
    store.set_item("mm_draft_v1", "{\"a\":2}").unwrap();

    assert_eq!(
        store.get_item("mm_draft_v1").unwrap().as_deref(),
        Some("{\"a\":2}")
    );
    assert_eq!(store.keys().unwrap(), vec!["mm_draft_v1".to_string()]);
}

#[test]
fn remove_missing_item_is_not_an_error() {
    let conn = open_db_in_memory().unwrap();
    let mut store = SqliteSessionStore::try_new(&conn, "tab-1").unwrap();

    store.remove_item("never-set").unwrap();
    store.set_item("k", "v").unwrap();
    store.remove_item("k").unwrap();
    assert_eq!(store.get_item("k").unwrap(), None);
}

#[test]
fn sessions_are_isolated() {
    let conn = open_db_in_memory().unwrap();
    let mut first = SqliteSessionStore::try_new(&conn, "first").unwrap();
    let mut second = SqliteSessionStore::try_new(&conn, "second").unwrap();

    first.set_item("mm_draft_v3", "first").unwrap();
    second.set_item("mm_draft_v3", "second").unwrap();
    second.set_item("mm_draft_v8", "second").unwrap();

    assert_eq!(first.get_item("mm_draft_v3").unwrap().as_deref(), Some("first"));
    assert_eq!(draft_versions(&first).unwrap(), vec![3]);
    assert_eq!(draft_versions(&second).unwrap(), vec![3, 8]);

    assert_eq!(second.clear_session().unwrap(), 2);
    assert!(second.keys().unwrap().is_empty());
    assert_eq!(first.keys().unwrap().len(), 1);
}

#[test]
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteSessionStore::try_new(&conn, "tab-1") {
        Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}
