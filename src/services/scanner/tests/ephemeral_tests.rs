use super::*;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_register_and_cleanup_all_removes_paths() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("mount-a");
    let file = tmp.path().join("work.tmp");
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(&file, b"x").unwrap();

    let tracker = EphemeralTracker::new(Duration::from_secs(3600));
    tracker.register(&dir);
    tracker.register(&file);
    assert_eq!(tracker.len(), 2);

    assert_eq!(tracker.cleanup_all(), 2);
    assert!(!dir.exists());
    assert!(!file.exists());
    assert!(tracker.is_empty());
}

#[test]
fn test_cleanup_expired_keeps_fresh_entries() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("fresh");
    fs::create_dir(&dir).unwrap();

    let tracker = EphemeralTracker::new(Duration::from_secs(3600));
    tracker.register(&dir);

    assert_eq!(tracker.cleanup_expired(), 0);
    assert!(dir.exists());
    assert!(tracker.is_tracked(&dir));
}

#[test]
fn test_already_deleted_path_is_forgotten() {
    let tmp = TempDir::new().unwrap();
    let tracker = EphemeralTracker::new(Duration::ZERO);
    tracker.register(tmp.path().join("never-created"));

    assert_eq!(tracker.cleanup_expired(), 1);
    assert!(tracker.is_empty());
}

#[test]
fn test_unregister_leaves_disk_untouched() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("keep");
    fs::create_dir(&dir).unwrap();

    let tracker = EphemeralTracker::new(Duration::ZERO);
    tracker.register(&dir);
    assert!(tracker.unregister(&dir));
    assert!(!tracker.unregister(&dir));
    assert_eq!(tracker.cleanup_all(), 0);
    assert!(dir.exists());
}

#[test]
fn test_sweep_stale_runs_by_mtime() {
    let tmp = TempDir::new().unwrap();
    let stale = tmp.path().join(format!("{RUN_DIR_PREFIX}old"));
    let fresh = tmp.path().join(format!("{RUN_DIR_PREFIX}new"));
    let unrelated = tmp.path().join("someone-elses-dir");
    for d in [&stale, &fresh, &unrelated] {
        fs::create_dir(d).unwrap();
    }

    let two_hours_ago = FileTime::from_system_time(
        SystemTime::now() - Duration::from_secs(2 * 60 * 60),
    );
    set_file_mtime(&stale, two_hours_ago).unwrap();
    set_file_mtime(&unrelated, two_hours_ago).unwrap();

    let removed = sweep_stale_runs(tmp.path(), RUN_DIR_PREFIX, Duration::from_secs(3600)).unwrap();
    assert_eq!(removed, 1);
    assert!(!stale.exists());
    assert!(fresh.exists());
    assert!(unrelated.exists());
}

#[test]
fn test_sweep_missing_root_is_zero() {
    let removed =
        sweep_stale_runs(Path::new("/no/such/root/here"), RUN_DIR_PREFIX, Duration::ZERO).unwrap();
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn test_sweeper_removes_expired_paths() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("expiring");
    fs::create_dir(&dir).unwrap();

    let tracker = Arc::new(EphemeralTracker::new(Duration::ZERO));
    tracker.register(&dir);
    tracker.start_sweeper(Duration::from_millis(10));

    let gone = tokio::time::timeout(Duration::from_secs(2), async {
        while dir.exists() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(gone.is_ok(), "sweeper should remove the expired directory");

    tracker.stop_sweeper();
    tracker.stop_sweeper();
}

#[tokio::test]
async fn test_shutdown_cleans_everything() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("left-over");
    fs::create_dir(&dir).unwrap();

    let tracker = Arc::new(EphemeralTracker::new(Duration::from_secs(3600)));
    tracker.register(&dir);
    tracker.start_sweeper(Duration::from_secs(60));

    assert_eq!(tracker.shutdown(), 1);
    assert!(!dir.exists());
}

#[test]
fn test_pinned_path_survives_until_unpinned() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("in-use");
    fs::create_dir(&dir).unwrap();

    let tracker = EphemeralTracker::new(Duration::ZERO);
    tracker.register_pinned(&dir);
    assert_eq!(tracker.cleanup_expired(), 0);
    assert_eq!(tracker.cleanup_all(), 0);
    assert!(dir.exists());

    assert!(tracker.unpin(&dir));
    assert_eq!(tracker.cleanup_expired(), 1);
    assert!(!dir.exists());
}

#[test]
fn test_sweep_spares_aged_run_with_fresh_marker() {
    let tmp = TempDir::new().unwrap();
    let live = tmp.path().join(format!("{RUN_DIR_PREFIX}live"));
    let crashed = tmp.path().join(format!("{RUN_DIR_PREFIX}crashed"));
    for d in [&live, &crashed] {
        fs::create_dir(d).unwrap();
        touch_live_marker(d).unwrap();
    }

    let two_hours_ago = FileTime::from_system_time(
        SystemTime::now() - Duration::from_secs(2 * 60 * 60),
    );
    set_file_mtime(crashed.join(LIVE_MARKER), two_hours_ago).unwrap();
    set_file_mtime(&crashed, two_hours_ago).unwrap();
    set_file_mtime(&live, two_hours_ago).unwrap();

    let removed = sweep_stale_runs(tmp.path(), RUN_DIR_PREFIX, Duration::from_secs(3600)).unwrap();
    assert_eq!(removed, 1);
    assert!(live.join(LIVE_MARKER).is_file());
    assert!(!crashed.exists());
}

#[tokio::test]
async fn test_live_marker_written_on_start() {
    let tmp = TempDir::new().unwrap();
    let marker = LiveMarker::start(tmp.path(), Duration::from_millis(10));
    assert!(tmp.path().join(LIVE_MARKER).is_file());

    tokio::time::sleep(Duration::from_millis(30)).await;
    marker.stop().await;
    fs::remove_file(tmp.path().join(LIVE_MARKER)).unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!tmp.path().join(LIVE_MARKER).exists());
}
