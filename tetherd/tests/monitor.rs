//! Upstream connectivity monitor subscription bookkeeping.

use tetherd::monitor::fake::FakeConnectivitySource;
use tetherd::monitor::Monitor;
use tetherd::tasks::OrchestratorMsg;

#[test]
fn start_default_is_idempotent() {
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel::<OrchestratorMsg>();
    let source = FakeConnectivitySource::new();
    let mut monitor = Monitor::new(Box::new(source.clone()), tx);

    monitor.start_default();
    monitor.start_default();
    assert!(source.default_subscribed());
}

#[test]
fn stop_cancels_outstanding_mobile_request() {
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel::<OrchestratorMsg>();
    let source = FakeConnectivitySource::new();
    let mut monitor = Monitor::new(Box::new(source.clone()), tx);

    monitor.start_mobile(true);
    assert_eq!(source.mobile_subscribed(), Some(true));
    monitor.stop();
    assert_eq!(source.mobile_subscribed(), None);
}
