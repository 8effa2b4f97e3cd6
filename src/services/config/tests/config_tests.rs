use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_defaults_match_documented_values() {
    let s = PipelineSettings::default();
    assert_eq!(s.thresholds.memory_percent, 80.0);
    assert_eq!(s.thresholds.cpu_percent, 80.0);
    assert_eq!(s.thresholds.disk_percent, 90.0);
    assert_eq!(s.cache_max_entries, 100);
    assert_eq!(s.scan_batch_size, 50);
    assert_eq!(s.unpack_batch_size, 10);
    assert_eq!(s.code_batch_size, 5);
    assert_eq!(s.asset_batch_size, 20);
    assert!(s.validate().is_ok());
}

#[test]
fn test_worker_count_is_capped() {
    let s = PipelineSettings {
        max_workers: 2,
        ..PipelineSettings::default()
    };
    assert!(s.worker_count() <= 2);
    assert!(s.worker_count() >= 1);
}

#[test]
fn test_load_partial_file_keeps_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("settings.json");
    fs::write(
        &path,
        r#"{ "cache_max_entries": 7, "tools": { "seven_zip": "7zz" } }"#,
    )
    .unwrap();

    let s = PipelineSettings::load(&path).unwrap();
    assert_eq!(s.cache_max_entries, 7);
    assert_eq!(s.tools.seven_zip, "7zz");
    assert_eq!(s.tools.tar, "tar");
    assert_eq!(s.scan_batch_size, 50);
}

#[test]
fn test_load_rejects_zero_batch() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("settings.json");
    fs::write(&path, r#"{ "scan_batch_size": 0 }"#).unwrap();

    let err = PipelineSettings::load(&path).unwrap_err();
    assert!(err.to_string().contains("scan_batch_size"));
}

#[test]
fn test_load_rejects_out_of_range_threshold() {
    let s = PipelineSettings {
        thresholds: ResourceThresholds {
            memory_percent: 150.0,
            ..ResourceThresholds::default()
        },
        ..PipelineSettings::default()
    };
    assert!(s.validate().is_err());
}

#[test]
fn test_load_or_default_without_path() {
    let s = PipelineSettings::load_or_default(None).unwrap();
    assert_eq!(s, PipelineSettings::default());
}
