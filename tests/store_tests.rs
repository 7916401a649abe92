use serde_json::json;
use vesper::store::{Collection, JsonStore, MemStore, RecordId, Store, StoreError};

#[test]
fn test_append_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");

    let first = json!({"role": "user", "text": "hello", "at": "2026-03-14T12:00:00Z"});
    let second = json!({"role": "assistant", "text": "hi", "at": "2026-03-14T12:00:01Z"});
    {
        let store = JsonStore::open(dir.path()).unwrap();
        store.append(Collection::Conversation, first.clone()).unwrap();
        store.append(Collection::Conversation, second.clone()).unwrap();
    }

    let store = JsonStore::open(dir.path()).unwrap();
    let records = store.read_all(Collection::Conversation).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].1, first, "insertion order is preserved");
    assert_eq!(records[1].1, second);
}

#[test]
fn test_update_and_delete() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonStore::open(dir.path()).unwrap();

    let id = store
        .append(Collection::Reminders, json!({"message": "draft"}))
        .unwrap();
    store
        .update(Collection::Reminders, &id, &|v| {
            v["message"] = json!("final");
        })
        .unwrap();

    // The mutation is durable across a reopen.
    let store = JsonStore::open(dir.path()).unwrap();
    let records = store.read_all(Collection::Reminders).unwrap();
    assert_eq!(records[0].1["message"], "final");

    store.delete(Collection::Reminders, &id).unwrap();
    assert!(store.read_all(Collection::Reminders).unwrap().is_empty());
}

#[test]
fn test_unknown_ids_are_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonStore::open(dir.path()).unwrap();
    let ghost = RecordId("no-such-record".to_string());

    assert!(matches!(
        store.update(Collection::Reminders, &ghost, &|_| {}),
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        store.delete(Collection::Reminders, &ghost),
        Err(StoreError::NotFound)
    ));
}

#[test]
fn test_prune_oldest_is_fifo() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonStore::open(dir.path()).unwrap();

    for i in 0..5 {
        store
            .append(Collection::Conversation, json!({"seq": i}))
            .unwrap();
    }
    let dropped = store.prune_oldest(Collection::Conversation, 3).unwrap();
    assert_eq!(dropped, 2);

    let records = store.read_all(Collection::Conversation).unwrap();
    let seqs: Vec<i64> = records
        .iter()
        .map(|(_, body)| body["seq"].as_i64().unwrap())
        .collect();
    assert_eq!(seqs, vec![2, 3, 4], "the oldest records are evicted first");

    // Pruning below the bound is a no-op.
    assert_eq!(store.prune_oldest(Collection::Conversation, 10).unwrap(), 0);
}

#[test]
fn test_no_temp_files_left_behind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonStore::open(dir.path()).unwrap();
    store
        .append(Collection::Activity, json!({"app_name": "editor"}))
        .unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
        .collect();
    assert!(leftovers.is_empty(), "flush must rename its temp file away");
}

#[test]
fn test_corrupt_collection_is_fatal_on_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("reminders.json"), "{not json at all").unwrap();

    match JsonStore::open(dir.path()) {
        Err(StoreError::Corrupt { path, .. }) => {
            assert!(path.ends_with("reminders.json"));
        }
        Err(e) => panic!("expected a corruption error, got {e:?}"),
        Ok(_) => panic!("corrupt file must refuse to load"),
    }
}

#[test]
fn test_mem_store_contract() {
    let store = MemStore::new();

    let id = store
        .append(Collection::Preferences, json!({"key": "color", "value": "blue"}))
        .unwrap();
    store
        .update(Collection::Preferences, &id, &|v| {
            v["value"] = json!("green");
        })
        .unwrap();
    assert_eq!(
        store.read_all(Collection::Preferences).unwrap()[0].1["value"],
        "green"
    );

    store.delete(Collection::Preferences, &id).unwrap();
    assert!(matches!(
        store.delete(Collection::Preferences, &id),
        Err(StoreError::NotFound)
    ));
}
