//! End-to-end scenarios driven against the orchestrator facade and its
//! fake collaborators.

mod common;

use std::net::{IpAddr, Ipv4Addr};

use common::Harness;
use tetherd::config::RawConfig;
use tetherd::events::{BroadcastEvent, SimState, UsbState, WifiApState};
use tetherd::model::{
    ErrorCode, InterfaceType, LinkProperties, NetworkCapabilities,
    NetworkHandle, NetworkState, NetworkStateKind, Route, UpstreamType,
};
use tetherd::nms::fake::RecordingResultSink;

fn base_config() -> RawConfig {
    let mut raw = RawConfig::default();
    raw.tetherable_usb_regexs = vec!["^rndis0$".to_string()];
    raw.tetherable_wifi_regexs = vec!["^wlan\\d+$".to_string()];
    raw.preferred_upstream_iface_types =
        vec!["ethernet".to_string(), "mobile_hipri".to_string()];
    raw
}

fn ethernet_available(iface: &str) -> NetworkState {
    NetworkState {
        network: NetworkHandle::alloc(),
        kind: NetworkStateKind::LinkProperties,
        capabilities: Some(NetworkCapabilities {
            upstream_type: UpstreamType::Ethernet,
        }),
        link_properties: Some(LinkProperties {
            interfaces: vec![iface.to_string()],
            routes: vec![Route {
                iface: iface.to_string(),
                is_default: true,
                destination: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            }],
            dns: vec![],
        }),
    }
}

/// Scenario 1: USB happy path.
#[tokio::test]
async fn usb_happy_path() {
    let h = Harness::new(base_config());
    let result = RecordingResultSink::new();

    h.orchestrator.on_upstream_state(ethernet_available("eth0"));
    h.settle().await;

    h.orchestrator.start_tethering(
        InterfaceType::Usb,
        false,
        std::sync::Arc::new(result.clone()),
    );
    h.settle().await;
    assert_eq!(result.codes(), vec![ErrorCode::NoError]);

    h.orchestrator
        .on_broadcast(BroadcastEvent::Usb(UsbState {
            connected: true,
            rndis_enabled: false,
        }));
    h.settle().await;
    assert!(h.usb.rndis_enabled());

    h.orchestrator
        .on_broadcast(BroadcastEvent::Usb(UsbState {
            connected: true,
            rndis_enabled: true,
        }));
    h.settle().await;

    assert_eq!(h.orchestrator.get_tethered_ifaces(), vec!["rndis0".to_string()]);
    assert!(h.nms.ip_forwarding_enabled());
}

/// Scenario 2: Wi-Fi AP failure never creates a registry entry.
#[tokio::test]
async fn wifi_ap_failure_creates_no_entry() {
    let h = Harness::new(base_config());
    let result = RecordingResultSink::new();

    h.orchestrator.start_tethering(
        InterfaceType::Wifi,
        false,
        std::sync::Arc::new(result.clone()),
    );
    h.settle().await;
    assert!(h.wifi.ap_enabled());

    h.orchestrator
        .on_broadcast(BroadcastEvent::WifiAp(WifiApState::Failed));
    h.settle().await;

    assert!(h.orchestrator.get_tethered_ifaces().is_empty());
}

/// Scenario 3: IP forwarding enable failure sticks the error on the
/// interface and leaves it AVAILABLE, then clears on CMD_CLEAR_ERROR.
#[tokio::test]
async fn ip_forwarding_enable_failure_records_sticky_error() {
    let h = Harness::new(base_config());
    h.nms.fail_ip_forwarding_enable(true);

    h.orchestrator.tether("rndis0");
    h.settle().await;

    assert_eq!(
        h.orchestrator.get_last_tether_error("rndis0"),
        ErrorCode::IpForwardingEnableError
    );
    assert!(h.orchestrator.get_tethered_ifaces().is_empty());

    h.orchestrator.clear_error();
    h.settle().await;
}

/// Scenario 4: upstream loss then recovery on a different interface.
#[tokio::test]
async fn upstream_loss_then_recovery() {
    let h = Harness::new(base_config());
    let eth = ethernet_available("eth0");
    let eth_handle = eth.network;
    h.orchestrator.on_upstream_state(eth.clone());
    h.orchestrator.tether("rndis0");
    h.settle().await;
    assert!(h.nms.ip_forwarding_enabled());

    h.orchestrator.on_upstream_state(NetworkState {
        network: eth_handle,
        kind: NetworkStateKind::Lost,
        capabilities: None,
        link_properties: None,
    });
    h.settle().await;

    let wlan = ethernet_available("wlan1");
    h.orchestrator.on_upstream_state(wlan);
    h.settle().await;

    assert_eq!(
        h.nms.dns(),
        vec![
            "8.8.8.8".parse::<IpAddr>().unwrap(),
            "8.8.4.4".parse::<IpAddr>().unwrap(),
        ]
    );
}

/// Scenario 5: preferred-type fallback to cellular when nothing else
/// qualifies.
#[tokio::test]
async fn preferred_type_fallback_to_cellular() {
    let mut raw = base_config();
    raw.preferred_upstream_iface_types = vec![
        "ethernet".to_string(),
        "wifi".to_string(),
        "mobile_hipri".to_string(),
    ];
    raw.is_dun_required = false;
    let h = Harness::new(raw);

    h.orchestrator.tether("rndis0");
    h.settle().await;

    assert_eq!(h.connectivity.mobile_subscribed(), Some(false));

    let mobile = NetworkState {
        network: NetworkHandle::alloc(),
        kind: NetworkStateKind::LinkProperties,
        capabilities: Some(NetworkCapabilities {
            upstream_type: UpstreamType::MobileHipri,
        }),
        link_properties: Some(LinkProperties {
            interfaces: vec!["wwan0".to_string()],
            routes: vec![Route {
                iface: "wwan0".to_string(),
                is_default: true,
                destination: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            }],
            dns: vec![],
        }),
    };
    h.orchestrator.on_upstream_state(mobile);
    h.settle().await;
}

/// Scenario 6: SIM reprovisioning notifies exactly once per tethered type.
#[tokio::test]
async fn sim_reprovisioning_notifies_once() {
    let mut raw = base_config();
    raw.entitlement_check_required = true;
    raw.provisioning_app =
        vec!["com.example.prov".to_string(), "Main".to_string()];
    let h = Harness::new(raw);

    h.orchestrator.on_upstream_state(ethernet_available("eth0"));
    h.orchestrator.tether("rndis0");
    h.settle().await;

    h.orchestrator
        .on_broadcast(BroadcastEvent::Sim(SimState::NotReady));
    h.settle().await;
    h.orchestrator
        .on_broadcast(BroadcastEvent::Sim(SimState::Loaded));
    h.settle().await;

    assert_eq!(
        h.provisioning_ui.rechecks(),
        vec![InterfaceType::Usb]
    );
}
