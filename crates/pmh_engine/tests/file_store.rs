use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use pmh_core::{CursorPosition, HarvestRequest};
use pmh_engine::{FileTokenStore, StoreError, TokenDraft, TokenStore};
use pretty_assertions::assert_eq;

fn now() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_443_621_600_000).unwrap()
}

fn draft() -> TokenDraft {
    TokenDraft {
        virtual_hits: 11,
        raw_hits: 2,
        position: CursorPosition {
            raw_cursor: 1,
            virtual_cursor: 10,
            variant_offset: 7,
        },
        original_request: HarvestRequest::from_query_string(
            "verb=ListRecords&metadataPrefix=tei&from=2015-01-01",
        ),
    }
}

#[test]
fn token_survives_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let created = {
        let store = FileTokenStore::open(dir.path(), Duration::from_secs(60)).unwrap();
        store.create(draft(), now()).unwrap()
    };
    assert!(dir.path().join(format!("{}.json", created.token_name)).exists());

    let store = FileTokenStore::open(dir.path(), Duration::from_secs(60)).unwrap();
    let found = store.lookup(&created.token_name, now()).unwrap();
    assert_eq!(found, Some(created.clone()));
    assert!(store
        .lookup(&created.token_name, created.expiration_date + chrono::Duration::milliseconds(1))
        .unwrap()
        .is_none());
}

#[test]
fn delete_removes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::open(dir.path(), Duration::from_secs(60)).unwrap();
    let token = store.create(draft(), now()).unwrap();
    assert!(store.delete(&token.token_name).unwrap());
    assert!(!store.delete(&token.token_name).unwrap());
    assert_eq!(store.lookup(&token.token_name, now()).unwrap(), None);
}

#[test]
fn names_never_touch_paths_outside_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::open(dir.path().join("tokens"), Duration::from_secs(60)).unwrap();
    fs::write(dir.path().join("secret.json"), "{}").unwrap();
    assert_eq!(store.lookup("../secret", now()).unwrap(), None);
    assert!(!store.delete("../secret").unwrap());
    assert!(dir.path().join("secret.json").exists());
}

#[test]
fn corrupt_token_is_a_miss_and_gets_swept() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::open(dir.path(), Duration::from_secs(60)).unwrap();
    fs::write(dir.path().join("oai_1443621600123.json"), "not json").unwrap();
    assert_eq!(store.lookup("oai_1443621600123", now()).unwrap(), None);
    assert_eq!(store.sweep_expired(now()).unwrap(), 1);
    assert!(!dir.path().join("oai_1443621600123.json").exists());
}

#[test]
fn sweep_keeps_live_tokens_and_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::open(dir.path(), Duration::from_secs(60)).unwrap();
    let old = store.create(draft(), now()).unwrap();
    let fresh = store
        .create(draft(), now() + chrono::Duration::seconds(45))
        .unwrap();
    fs::write(dir.path().join("README.txt"), "keep me").unwrap();

    let removed = store
        .sweep_expired(now() + chrono::Duration::seconds(61))
        .unwrap();
    assert_eq!(removed, 1);
    assert!(!dir.path().join(format!("{}.json", old.token_name)).exists());
    assert!(dir.path().join(format!("{}.json", fresh.token_name)).exists());
    assert!(dir.path().join("README.txt").exists());
}

#[test]
fn concurrent_creates_get_distinct_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileTokenStore::open(dir.path(), Duration::from_secs(60)).unwrap());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || store.create(draft(), now()).unwrap().token_name)
        })
        .collect();
    let mut names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 8);
}

#[test]
fn file_in_place_of_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not_a_dir");
    fs::write(&path, "").unwrap();
    let err = FileTokenStore::open(&path, Duration::from_secs(60)).unwrap_err();
    assert!(matches!(err, StoreError::TokenDir(_)));
}
