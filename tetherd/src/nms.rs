//
// SPDX-License-Identifier: MIT
//

//! Narrow trait boundaries toward every external collaborator: the
//! network-management service (NMS), the USB/Wi-Fi/Bluetooth subsystems,
//! and the carrier-provisioning UI. The core never does packet
//! forwarding, DHCP, or NAT itself — it only calls through these traits,
//! in the spirit of Android's own split between `Tethering.java` and
//! `INetd`/`ConnectivityManager`.

use crate::model::NetworkHandle;

/// `setIpForwardingEnabled`, `startTethering`, `stopTethering`,
/// `setDnsForwarders`, `listInterfaces`.
pub trait NetworkManagementService: Send + Sync {
    fn set_ip_forwarding_enabled(&self, enabled: bool) -> Result<(), ()>;
    fn start_tethering(&self, dhcp_ranges: &[String]) -> Result<(), ()>;
    fn stop_tethering(&self) -> Result<(), ()>;
    fn set_dns_forwarders(
        &self,
        network: Option<NetworkHandle>,
        dns: &[std::net::IpAddr],
    ) -> Result<(), ()>;
    fn list_interfaces(&self) -> Vec<String>;
}

/// `setCurrentFunction("rndis" | null)`.
pub trait UsbManager: Send + Sync {
    fn set_current_function(&self, rndis: bool) -> Result<(), ()>;
}

/// `setWifiApEnabled(config?, bool)`.
pub trait WifiManager: Send + Sync {
    fn set_wifi_ap_enabled(&self, enabled: bool) -> Result<(), ()>;
}

/// `setBluetoothTethering(bool)`, `isTetheringOn()`. `is_tethering_on` is
/// inherently racy on real hardware — preserved as-is, not replaced with a
/// different synchronization scheme.
pub trait BluetoothPan: Send + Sync {
    fn set_bluetooth_tethering(&self, enable: bool) -> Result<(), ()>;
    fn is_tethering_on(&self) -> bool;
}

/// The carrier provisioning app, reached via UI or silent intent.
/// `recheck` is the periodic entitlement recheck while tethered.
pub trait ProvisioningUi: Send + Sync {
    fn start(&self, iface_type: crate::model::InterfaceType, show_ui: bool)
    -> Result<(), ()>;
    fn recheck(&self, iface_type: crate::model::InterfaceType);
    fn cancel_rechecks(&self, iface_type: crate::model::InterfaceType);
}

/// Receives a result back from an asynchronous facade call — abstractly,
/// a capability with a single `send`.
pub trait ResultSink: Send + Sync {
    fn send(&self, code: crate::model::ErrorCode);
}

/// Publishes the tether-status broadcast. Delivery to actual listeners is
/// external; the core only constructs the payload.
pub trait StatusSink: Send + Sync {
    fn publish(&self, status: TetherStatus);
}

#[derive(Clone, Debug, PartialEq)]
pub struct TetherStatus {
    pub available: Vec<String>,
    pub active: Vec<String>,
    pub errored: Vec<String>,
}

/// In-memory fakes used by unit/scenario tests (never compiled into a real
/// deployment's default feature set, but not feature-gated: a test-only
/// NMS is exactly as legitimate a "collaborator" as the real one, and
/// keeping it always-available lets examples and doctests use it too).
pub mod fake {
    use std::net::IpAddr;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Default)]
    struct State {
        ip_forwarding: bool,
        tethering_started: bool,
        dns: Vec<IpAddr>,
        fail_ip_forwarding_enable: bool,
        fail_ip_forwarding_disable: bool,
        fail_start_tethering: bool,
        fail_start_tethering_once: bool,
        fail_stop_tethering: bool,
        fail_set_dns: bool,
        interfaces: Vec<String>,
    }

    /// An in-memory NMS that records every call and can be told to fail
    /// specific operations, for exercising error-path scenarios.
    #[derive(Debug, Default, Clone)]
    pub struct FakeNms(Arc<Mutex<State>>);

    impl FakeNms {
        pub fn new() -> FakeNms {
            FakeNms::default()
        }

        pub fn set_interfaces(&self, ifaces: Vec<String>) {
            self.0.lock().unwrap().interfaces = ifaces;
        }

        pub fn fail_ip_forwarding_enable(&self, fail: bool) {
            self.0.lock().unwrap().fail_ip_forwarding_enable = fail;
        }

        pub fn fail_start_tethering(&self, fail: bool) {
            self.0.lock().unwrap().fail_start_tethering = fail;
        }

        /// Fails exactly the next `start_tethering` call, then clears
        /// itself. Exercises the retry-once-via-`stopTethering` step in
        /// the master's entry sequence.
        pub fn fail_start_tethering_once(&self) {
            self.0.lock().unwrap().fail_start_tethering_once = true;
        }

        pub fn ip_forwarding_enabled(&self) -> bool {
            self.0.lock().unwrap().ip_forwarding
        }

        pub fn tethering_started(&self) -> bool {
            self.0.lock().unwrap().tethering_started
        }

        pub fn dns(&self) -> Vec<IpAddr> {
            self.0.lock().unwrap().dns.clone()
        }
    }

    impl NetworkManagementService for FakeNms {
        fn set_ip_forwarding_enabled(&self, enabled: bool) -> Result<(), ()> {
            let mut state = self.0.lock().unwrap();
            if enabled && state.fail_ip_forwarding_enable {
                return Err(());
            }
            if !enabled && state.fail_ip_forwarding_disable {
                return Err(());
            }
            state.ip_forwarding = enabled;
            Ok(())
        }

        fn start_tethering(&self, _dhcp_ranges: &[String]) -> Result<(), ()> {
            let mut state = self.0.lock().unwrap();
            if state.fail_start_tethering_once {
                state.fail_start_tethering_once = false;
                return Err(());
            }
            if state.fail_start_tethering {
                return Err(());
            }
            state.tethering_started = true;
            Ok(())
        }

        fn stop_tethering(&self) -> Result<(), ()> {
            let mut state = self.0.lock().unwrap();
            if state.fail_stop_tethering {
                return Err(());
            }
            state.tethering_started = false;
            Ok(())
        }

        fn set_dns_forwarders(
            &self,
            _network: Option<NetworkHandle>,
            dns: &[IpAddr],
        ) -> Result<(), ()> {
            let mut state = self.0.lock().unwrap();
            if state.fail_set_dns {
                return Err(());
            }
            state.dns = dns.to_vec();
            Ok(())
        }

        fn list_interfaces(&self) -> Vec<String> {
            self.0.lock().unwrap().interfaces.clone()
        }
    }

    /// An in-memory USB manager: tracks whether RNDIS is on.
    #[derive(Debug, Default, Clone)]
    pub struct FakeUsbManager(Arc<Mutex<bool>>);

    impl FakeUsbManager {
        pub fn new() -> FakeUsbManager {
            FakeUsbManager::default()
        }

        pub fn rndis_enabled(&self) -> bool {
            *self.0.lock().unwrap()
        }
    }

    impl UsbManager for FakeUsbManager {
        fn set_current_function(&self, rndis: bool) -> Result<(), ()> {
            *self.0.lock().unwrap() = rndis;
            Ok(())
        }
    }

    /// An in-memory Wi-Fi manager: tracks whether soft-AP is enabled.
    #[derive(Debug, Default, Clone)]
    pub struct FakeWifiManager(Arc<Mutex<bool>>);

    impl FakeWifiManager {
        pub fn new() -> FakeWifiManager {
            FakeWifiManager::default()
        }

        pub fn ap_enabled(&self) -> bool {
            *self.0.lock().unwrap()
        }
    }

    impl WifiManager for FakeWifiManager {
        fn set_wifi_ap_enabled(&self, enabled: bool) -> Result<(), ()> {
            *self.0.lock().unwrap() = enabled;
            Ok(())
        }
    }

    /// An in-memory Bluetooth PAN proxy.
    #[derive(Debug, Default, Clone)]
    pub struct FakeBluetoothPan(Arc<Mutex<bool>>);

    impl FakeBluetoothPan {
        pub fn new() -> FakeBluetoothPan {
            FakeBluetoothPan::default()
        }
    }

    impl BluetoothPan for FakeBluetoothPan {
        fn set_bluetooth_tethering(&self, enable: bool) -> Result<(), ()> {
            *self.0.lock().unwrap() = enable;
            Ok(())
        }

        fn is_tethering_on(&self) -> bool {
            *self.0.lock().unwrap()
        }
    }

    /// A `ResultSink` that stashes the last code it received, for assertions.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingResultSink(Arc<Mutex<Vec<crate::model::ErrorCode>>>);

    impl RecordingResultSink {
        pub fn new() -> RecordingResultSink {
            RecordingResultSink::default()
        }

        pub fn codes(&self) -> Vec<crate::model::ErrorCode> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ResultSink for RecordingResultSink {
        fn send(&self, code: crate::model::ErrorCode) {
            self.0.lock().unwrap().push(code);
        }
    }

    /// A `StatusSink` that stashes the last published status.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingStatusSink(Arc<Mutex<Option<TetherStatus>>>);

    impl RecordingStatusSink {
        pub fn new() -> RecordingStatusSink {
            RecordingStatusSink::default()
        }

        pub fn last(&self) -> Option<TetherStatus> {
            self.0.lock().unwrap().clone()
        }
    }

    impl StatusSink for RecordingStatusSink {
        fn publish(&self, status: TetherStatus) {
            *self.0.lock().unwrap() = Some(status);
        }
    }

    /// A `ProvisioningUi` that always succeeds and records recheck calls.
    #[derive(Debug, Default, Clone)]
    pub struct FakeProvisioningUi(
        Arc<Mutex<Vec<crate::model::InterfaceType>>>,
    );

    impl FakeProvisioningUi {
        pub fn new() -> FakeProvisioningUi {
            FakeProvisioningUi::default()
        }

        pub fn rechecks(&self) -> Vec<crate::model::InterfaceType> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ProvisioningUi for FakeProvisioningUi {
        fn start(
            &self,
            _iface_type: crate::model::InterfaceType,
            _show_ui: bool,
        ) -> Result<(), ()> {
            Ok(())
        }

        fn recheck(&self, iface_type: crate::model::InterfaceType) {
            self.0.lock().unwrap().push(iface_type);
        }

        fn cancel_rechecks(&self, _iface_type: crate::model::InterfaceType) {}
    }
}
