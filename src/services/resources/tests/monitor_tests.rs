use super::*;
use crate::services::config::ResourceThresholds;
use crate::services::resources::governor::FixedProbe;

fn governor(total: u64, free: u64) -> Arc<ResourceGovernor> {
    Arc::new(ResourceGovernor::new(
        ResourceThresholds::default(),
        Box::new(FixedProbe::with_memory(total, free)),
    ))
}

#[tokio::test]
async fn test_monitor_delivers_ticks_with_alerts() {
    let monitor = ResourceMonitor::new(governor(100, 5));
    let mut rx = monitor.start(Duration::from_millis(10));

    let tick = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("tick within timeout")
        .expect("channel open");
    assert_eq!(tick.sample.memory_free, 5);
    assert!(tick.alerts.iter().any(|a| a.is_memory()));

    monitor.stop();
    assert!(!monitor.is_running());
}

#[tokio::test]
async fn test_stop_without_start_is_noop() {
    let monitor = ResourceMonitor::new(governor(100, 90));
    monitor.stop();
    monitor.stop();
    assert!(!monitor.is_running());
}

#[tokio::test]
async fn test_stop_closes_channel() {
    let monitor = ResourceMonitor::new(governor(100, 90));
    let mut rx = monitor.start(Duration::from_millis(5));
    assert!(monitor.is_running());
    monitor.stop();
    monitor.stop();

    // Drain anything already queued; the sender is gone once the task ends
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        while rx.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "channel should close after stop");
}

#[tokio::test]
async fn test_callback_receives_samples() {
    let monitor = ResourceMonitor::new(governor(100, 40));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    monitor.start_with_callback(Duration::from_millis(10), move |sample, alerts| {
        let _ = tx.send((sample.memory_free, alerts.len()));
    });

    let (free, alerts) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(free, 40);
    assert_eq!(alerts, 0);
    monitor.stop();
}

#[tokio::test]
async fn test_restart_replaces_previous_task() {
    let monitor = ResourceMonitor::new(governor(100, 90));
    let _first = monitor.start(Duration::from_millis(50));
    let mut second = monitor.start(Duration::from_millis(5));
    assert!(tokio::time::timeout(Duration::from_secs(2), second.recv())
        .await
        .unwrap()
        .is_some());
    monitor.stop();
}
