use std::sync::Arc;
use std::time::Duration;

use tetherd::config::{ConfigHandle, RawConfig, TetheringConfig};
use tetherd::facade::{Collaborators, Orchestrator};
use tetherd::monitor::fake::FakeConnectivitySource;
use tetherd::nms::fake::{
    FakeBluetoothPan, FakeNms, FakeProvisioningUi, FakeUsbManager,
    FakeWifiManager, RecordingStatusSink,
};
use tetherd::registry::Registry;

/// Bundles an `Orchestrator` together with the fakes it was wired against,
/// so scenario tests can both drive the facade and assert on subsystem
/// side effects (end-to-end scenarios).
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub registry: Registry,
    pub config: ConfigHandle,
    pub nms: FakeNms,
    pub usb: FakeUsbManager,
    pub wifi: FakeWifiManager,
    pub bluetooth: FakeBluetoothPan,
    pub provisioning_ui: FakeProvisioningUi,
    pub status_sink: RecordingStatusSink,
    pub connectivity: FakeConnectivitySource,
}

impl Harness {
    pub fn new(raw_config: RawConfig) -> Harness {
        let registry = Registry::new();
        let config = ConfigHandle::new(TetheringConfig::build(&raw_config));

        let nms = FakeNms::new();
        let usb = FakeUsbManager::new();
        let wifi = FakeWifiManager::new();
        let bluetooth = FakeBluetoothPan::new();
        let provisioning_ui = FakeProvisioningUi::new();
        let status_sink = RecordingStatusSink::new();
        let connectivity = FakeConnectivitySource::new();

        let collaborators = Collaborators {
            nms: Arc::new(nms.clone()),
            usb: Arc::new(usb.clone()),
            wifi: Arc::new(wifi.clone()),
            bluetooth: Arc::new(bluetooth.clone()),
            provisioning_ui: Arc::new(provisioning_ui.clone()),
            status_sink: Arc::new(status_sink.clone()),
            connectivity: Box::new(connectivity.clone()),
        };

        let (orchestrator, mut event_loop) =
            Orchestrator::spawn(config.clone(), registry.clone(), collaborators);
        // Scenario tests only need the loop to run for their own lifetime;
        // detaching avoids threading a `Task` handle through every test.
        event_loop.detach();

        Harness {
            orchestrator,
            registry,
            config,
            nms,
            usb,
            wifi,
            bluetooth,
            provisioning_ui,
            status_sink,
            connectivity,
        }
    }

    /// Yields long enough for the event loop to have drained every message
    /// sent so far. The loop is the only other task running on this
    /// runtime's worker in these tests, so a short sleep is deterministic
    /// in practice.
    pub async fn settle(&self) {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
