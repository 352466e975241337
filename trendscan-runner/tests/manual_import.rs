//! Integration tests for importing hand-saved kline payloads.

use std::fs;
use std::path::Path;
use trendscan_core::data::PriceStore;
use trendscan_runner::{import_dir, ImportError};

fn payload(lines: &[&str]) -> String {
    let klines: Vec<String> = lines.iter().map(|l| format!("\"{l}\"")).collect();
    format!(
        r#"{{"rc":0,"data":{{"code":"x","klines":[{}]}}}}"#,
        klines.join(",")
    )
}

fn write(dir: &Path, name: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn imports_and_merges_into_store() {
    let root = tempfile::tempdir().unwrap();
    let manual = root.path().join("manual");
    let store = PriceStore::new(root.path().join("stocks"));
    store
        .persist(
            "600519",
            &trendscan_core::data::parse_kline_payload(
                "600519",
                &payload(&["2024-01-02,1700,1685.01,1710,1680,30000"]),
            )
            .unwrap(),
        )
        .unwrap();

    write(
        &manual,
        "600519.json",
        &payload(&[
            "2024-01-02,1700,1690.00,1710,1680,30000,0,0,0,0,0",
            "2024-01-03,1690,1702.50,1705,1688,28000,0,0,0,0,0",
        ]),
    );

    let summary = import_dir(&manual, &store).unwrap();
    assert_eq!(summary.imported, 1);

    let series = store.load("600519").unwrap();
    assert_eq!(series.len(), 2);
    // payload wins on the shared date
    assert_eq!(series.bars()[0].close, 1690.0);
    assert_eq!(series.bars()[1].close, 1702.5);
}

#[test]
fn reimport_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let manual = root.path().join("manual");
    let store = PriceStore::new(root.path().join("stocks"));
    write(
        &manual,
        "000001.json",
        &payload(&["2024-01-02,9.39,9.21,9.42,9.21,1158366", "2024-01-03,9.19,9.20,9.22,9.15,733610"]),
    );

    import_dir(&manual, &store).unwrap();
    let first = fs::read(store.series_path("000001")).unwrap();
    import_dir(&manual, &store).unwrap();
    let second = fs::read(store.series_path("000001")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn bad_payloads_are_isolated() {
    let root = tempfile::tempdir().unwrap();
    let manual = root.path().join("manual");
    let store = PriceStore::new(root.path().join("stocks"));
    write(&manual, "000001.json", "<html>captcha</html>");
    write(&manual, "000002.json", r#"{"rc":0,"data":null}"#);
    write(&manual, "000003.json", &payload(&["2024-01-02,5,5.1,5.2,4.9,100"]));
    write(&manual, "notes.txt", "ignored");

    let summary = import_dir(&manual, &store).unwrap();

    assert_eq!(summary.files, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.empty, 1);
    assert_eq!(summary.imported, 1);
    assert!(summary.failures[0].0.ends_with("000001.json"));
    assert_eq!(store.load("000003").unwrap().len(), 1);
}

#[test]
fn missing_directory_imports_nothing() {
    let root = tempfile::tempdir().unwrap();
    let store = PriceStore::new(root.path().join("stocks"));

    let summary = import_dir(&root.path().join("absent"), &store).unwrap();
    assert_eq!(summary.files, 0);
}

#[test]
fn unreadable_store_aborts() {
    let root = tempfile::tempdir().unwrap();
    let manual = root.path().join("manual");
    let store = PriceStore::new(root.path().join("stocks"));
    write(&manual, "000001.json", &payload(&["2024-01-02,5,5.1,5.2,4.9,100"]));
    write(
        &root.path().join("stocks"),
        "000001.csv",
        "date,open,high,low,close,volume\n2024-01-01,x,1,1,1,1\n",
    );

    let err = import_dir(&manual, &store).unwrap_err();
    assert!(matches!(err, ImportError::Store { .. }));
}
