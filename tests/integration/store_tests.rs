use apod_cache::cache::{MetadataStore, NewEntry, StoreError};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use tempfile::{tempdir, NamedTempFile};

fn entry<'a>(title: &'a str, path: &'a std::path::Path, hash: &'a str) -> NewEntry<'a> {
    NewEntry {
        title,
        explanation: "Explanation.",
        file_path: path,
        content_hash: hash,
        date: NaiveDate::from_ymd_opt(2022, 5, 1).unwrap(),
    }
}

#[test]
fn test_open_corrupted_database() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    {
        let mut f = fs::File::create(path).unwrap();
        f.write_all(b"this is definitely not a sqlite database file").unwrap();
    }

    let res = MetadataStore::initialize(path);
    assert!(matches!(res, Err(StoreError::Sqlite(_))));
}

#[test]
fn test_schema_matches_documented_layout() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("image_cache.db");
    MetadataStore::initialize(&db_path).unwrap();

    let conn = Connection::open(&db_path).unwrap();
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('apods')").unwrap();
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        columns,
        vec!["id", "title", "explanation", "date", "file_path", "hash"]
    );

    let unique: i64 = conn
        .query_row(
            "SELECT \"unique\" FROM pragma_index_list('apods') WHERE name = 'idx_apods_hash'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(unique, 1);
}

#[test]
fn test_date_stored_as_iso_text() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("image_cache.db");
    let store = MetadataStore::initialize(&db_path).unwrap();
    let path = PathBuf::from("/cache/a.jpg");
    store.insert(&entry("A", &path, "h")).unwrap();

    let conn = Connection::open(&db_path).unwrap();
    let raw: String = conn
        .query_row("SELECT date FROM apods", [], |row| row.get(0))
        .unwrap();
    assert_eq!(raw, "2022-05-01");
}

#[test]
fn test_concurrent_inserts_of_same_hash_yield_one_row() {
    let dir = tempdir().unwrap();
    let store = MetadataStore::initialize(&dir.path().join("image_cache.db")).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                let title = format!("Writer {i}");
                let path = PathBuf::from(format!("/cache/{i}.jpg"));
                store.insert(&entry(&title, &path, "shared-hash")).unwrap()
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_initialize_fails_when_parent_is_a_file() {
    let dir = tempdir().unwrap();
    // A file where the parent directory should be.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"x").unwrap();

    let res = MetadataStore::initialize(&blocker.join("image_cache.db"));
    assert!(matches!(res, Err(StoreError::CreateDir { .. })));
}
