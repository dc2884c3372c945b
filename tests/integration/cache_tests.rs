use apod_cache::api::ApodMetadata;
use apod_cache::cache::{
    fingerprint, CacheCoordinator, CacheError, CacheOutcome, CacheSettings, StoreError,
    DATABASE_FILE_NAME,
};
use chrono::NaiveDate;
use filetime::FileTime;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const IMAGE_URL: &str = "https://apod.nasa.gov/apod/image/2205/NGC3521LRGBHaAPOD-20.jpg";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn metadata(title: &str) -> ApodMetadata {
    ApodMetadata::new(date(2022, 5, 1), title, "A spiral galaxy.", IMAGE_URL)
}

fn image_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with(DATABASE_FILE_NAME))
        .collect();
    names.sort();
    names
}

#[test]
fn test_ensure_cached_is_idempotent_across_dates() {
    let dir = tempdir().unwrap();
    let cache = CacheCoordinator::open(&CacheSettings::in_dir(dir.path())).unwrap();
    let bytes = b"identical image bytes";

    let first = cache
        .ensure_cached(date(2022, 5, 1), &metadata("Galaxy"), bytes)
        .unwrap();
    let second = cache
        .ensure_cached(date(2023, 1, 9), &metadata("Galaxy"), bytes)
        .unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(cache.store().count().unwrap(), 1);
    assert_eq!(image_files(dir.path()), vec!["Galaxy.jpg"]);
}

#[test]
fn test_reference_title_resolves_to_sanitized_file() {
    let dir = tempdir().unwrap();
    let cache = CacheCoordinator::open(&CacheSettings::in_dir(dir.path())).unwrap();

    let outcome = cache
        .ensure_cached(
            date(2022, 5, 1),
            &metadata(" NGC #3521: Galaxy in a Bubble "),
            b"ngc3521",
        )
        .unwrap();

    let entry = cache.entry(outcome.id()).unwrap().unwrap();
    assert_eq!(
        entry.file_path,
        dir.path().join("NGC_3521_Galaxy_in_a_Bubble.jpg")
    );
    assert_eq!(entry.title, " NGC #3521: Galaxy in a Bubble ");
}

#[test]
fn test_miss_then_hit_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let cache = CacheCoordinator::open(&CacheSettings::in_dir(dir.path())).unwrap();
    let bytes: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

    let first = cache
        .ensure_cached(date(2022, 5, 1), &metadata("Pillars"), &bytes)
        .unwrap();
    assert!(matches!(first, CacheOutcome::Stored(id) if id.get() > 0));

    let path = dir.path().join("Pillars.jpg");
    assert_eq!(fs::read(&path).unwrap(), bytes);

    // Push the mtime into the past so any rewrite would be visible.
    let past = FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_mtime(&path, past).unwrap();

    let second = cache
        .ensure_cached(date(2022, 5, 2), &metadata("Pillars"), &bytes)
        .unwrap();
    assert_eq!(second, CacheOutcome::Hit(first.id()));

    let meta = fs::metadata(&path).unwrap();
    assert_eq!(FileTime::from_last_modification_time(&meta), past);
}

#[test]
fn test_lookup_of_unknown_hash_is_not_found() {
    let dir = tempdir().unwrap();
    let cache = CacheCoordinator::open(&CacheSettings::in_dir(dir.path())).unwrap();

    let result = cache.store().find_by_hash(&fingerprint(b"never cached"));
    assert_eq!(result.unwrap(), None);
}

#[test]
fn test_write_failure_inserts_no_row() {
    let dir = tempdir().unwrap();
    let images = dir.path().join("images");
    let settings = CacheSettings {
        cache_dir: images.clone(),
        database: dir.path().join("meta").join(DATABASE_FILE_NAME),
    };
    let cache = CacheCoordinator::open(&settings).unwrap();
    cache
        .ensure_cached(date(2022, 5, 1), &metadata("Before"), b"before")
        .unwrap();
    let rows_before = cache.store().count().unwrap();

    // Replace the image directory with a plain file so nothing can be
    // created inside it, regardless of the user running the tests.
    fs::remove_dir_all(&images).unwrap();
    fs::write(&images, b"not a directory").unwrap();

    let result = cache.ensure_cached(date(2022, 5, 2), &metadata("After"), b"after");
    assert!(matches!(result, Err(CacheError::Write { .. })));
    assert_eq!(cache.store().count().unwrap(), rows_before);
    assert_eq!(cache.store().find_by_hash(&fingerprint(b"after")).unwrap(), None);
}

#[test]
fn test_title_collision_overwrites_file_but_keeps_both_rows() {
    let dir = tempdir().unwrap();
    let cache = CacheCoordinator::open(&CacheSettings::in_dir(dir.path())).unwrap();

    let a = cache
        .ensure_cached(date(2022, 5, 1), &metadata("Moon: Rise"), b"first moon")
        .unwrap();
    let b = cache
        .ensure_cached(date(2022, 5, 2), &metadata("Moon Rise"), b"second moon")
        .unwrap();

    assert_ne!(a.id(), b.id());
    assert_eq!(image_files(dir.path()), vec!["Moon_Rise.jpg"]);
    assert_eq!(
        fs::read(dir.path().join("Moon_Rise.jpg")).unwrap(),
        b"second moon"
    );
}

#[test]
fn test_reopen_keeps_entries() {
    let dir = tempdir().unwrap();
    let settings = CacheSettings::in_dir(dir.path());

    let id = {
        let cache = CacheCoordinator::open(&settings).unwrap();
        cache
            .ensure_cached(date(2022, 5, 1), &metadata("Persisted"), b"bytes")
            .unwrap()
            .id()
    };

    let cache = CacheCoordinator::open(&settings).unwrap();
    let again = cache
        .ensure_cached(date(2024, 1, 1), &metadata("Persisted"), b"bytes")
        .unwrap();
    assert_eq!(again, CacheOutcome::Hit(id));
    assert_eq!(cache.titles().unwrap(), vec!["Persisted"]);
}

#[test]
fn test_rejected_metadata_leaves_committed_file_untouched() {
    let dir = tempdir().unwrap();
    let cache = CacheCoordinator::open(&CacheSettings::in_dir(dir.path())).unwrap();

    // "???" sanitizes to the fallback stem, the same file an empty title maps to.
    let committed = cache
        .ensure_cached(date(2022, 5, 1), &metadata("???"), b"committed bytes")
        .unwrap();
    let path = dir.path().join("untitled.jpg");
    let past = FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_mtime(&path, past).unwrap();

    let result = cache.ensure_cached(date(2022, 5, 2), &metadata(""), b"replacement bytes");
    assert!(matches!(
        result,
        Err(CacheError::Store(StoreError::MissingField("title")))
    ));

    let entry = cache.entry(committed.id()).unwrap().unwrap();
    assert_eq!(entry.file_path, path);
    assert_eq!(fs::read(&path).unwrap(), b"committed bytes");
    assert_eq!(
        FileTime::from_last_modification_time(&fs::metadata(&path).unwrap()),
        past
    );
    assert_eq!(image_files(dir.path()), vec!["untitled.jpg"]);
    assert_eq!(
        cache.store().find_by_hash(&fingerprint(b"replacement bytes")).unwrap(),
        None
    );
}
