// tests/store_roundtrip.rs
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use history_timeline::store::CustomEventStore;

#[test]
fn edits_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("custom_events.json");

    let store = CustomEventStore::open(&path);
    assert!(store.is_empty());
    store.set(1950, "  Grandparents married in Lisbon.  ").unwrap();
    store.set(1969, "Watched the landing on a neighbour's TV.").unwrap();
    assert!(path.exists(), "parent dir created on first write");

    let reopened = CustomEventStore::open(&path);
    assert_eq!(reopened.len(), 2);
    assert_eq!(
        reopened.get(1950).as_deref(),
        Some("Grandparents married in Lisbon.")
    );

    // No temp file left behind after the rename.
    let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn blank_text_deletes_and_clear_reports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom_events.json");

    let store = CustomEventStore::open(&path);
    store.set(1989, "Was in Berlin that night.").unwrap();
    store.set(1989, "   ").unwrap();
    assert_eq!(store.get(1989), None);

    store.set(1991, "Moved house.").unwrap();
    assert!(store.clear(1991).unwrap());
    assert!(!store.clear(1991).unwrap());
    assert!(CustomEventStore::open(&path).is_empty());
}

#[test]
fn corrupt_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom_events.json");
    fs::write(&path, "{ not json").unwrap();

    let store = CustomEventStore::open(&path);
    assert!(store.is_empty());

    // The next write replaces the corrupt file.
    store.set(1955, "Bought the first radio.").unwrap();
    let raw = fs::read_to_string(&path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["1955"], "Bought the first radio.");
}

#[test]
fn import_skips_non_year_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom_events.json");
    let store = CustomEventStore::open(&path);

    let mut doc = BTreeMap::new();
    doc.insert("1963".to_string(), "Heard the news at school.".to_string());
    doc.insert("version".to_string(), "2".to_string());
    doc.insert("1970".to_string(), "".to_string());

    assert_eq!(store.import(&doc, &(1900..=2025)).unwrap(), 1);
    assert_eq!(CustomEventStore::open(&path).all().len(), 1);
}

#[test]
fn import_skips_years_outside_the_range() {
    let store = CustomEventStore::in_memory();
    let mut doc = BTreeMap::new();
    doc.insert("99999".to_string(), "Far future".to_string());
    doc.insert("-5".to_string(), "Antiquity".to_string());
    doc.insert("1850".to_string(), "Before the timeline".to_string());
    doc.insert("1989".to_string(), "Wall comes down.".to_string());

    assert_eq!(store.import(&doc, &(1900..=2025)).unwrap(), 1);
    assert_eq!(store.all().into_keys().collect::<Vec<_>>(), vec![1989]);
}

#[test]
fn overlapping_saves_keep_every_edit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom_events.json");
    let store = Arc::new(CustomEventStore::open(&path));

    for round in 0..50 {
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let store = Arc::clone(&store);
                    s.spawn(move || store.set(1900 + t, &format!("round {round}, writer {t}")))
                })
                .collect();
            for h in handles {
                h.join().unwrap().unwrap();
            }
        });

        let on_disk = CustomEventStore::open(&path).all();
        assert_eq!(on_disk, store.all(), "round {round}");
        assert_eq!(on_disk.len(), 8);
        assert!(on_disk
            .values()
            .all(|t| t.starts_with(&format!("round {round},"))));
    }
    // Only the data file remains; temp files were renamed into place.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
