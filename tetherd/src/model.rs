//
// SPDX-License-Identifier: MIT
//

//! Core data model shared by every component of the control plane.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};

// ===== InterfaceType =====

/// Tag derived by matching an interface name against the config's per-type
/// regex lists; the first match wins in the order WIFI, USB, BLUETOOTH.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum InterfaceType {
    Wifi,
    Usb,
    Bluetooth,
    Invalid,
}

// ===== InterfaceState =====

/// Lifecycle state of a downstream interface as seen from the registry.
/// The initial state of a newly tracked interface is `Available`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InterfaceState {
    Unavailable,
    Available,
    Tethered,
}

// ===== ErrorCode =====

/// Stable, numbered error taxonomy surfaced to callers. The numeric
/// discriminants are part of the wire contract: do not reorder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ErrorCode {
    NoError = 0,
    UnknownIface = 1,
    UnavailIface = 2,
    MasterError = 3,
    ServiceUnavail = 4,
    IpForwardingEnableError = 5,
    IpForwardingDisableError = 6,
    StartTetheringError = 7,
    StopTetheringError = 8,
    SetDnsForwardersError = 9,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::NoError => "no error",
            ErrorCode::UnknownIface => "unknown interface",
            ErrorCode::UnavailIface => "interface unavailable",
            ErrorCode::MasterError => "master state machine error",
            ErrorCode::ServiceUnavail => "tethering service unavailable",
            ErrorCode::IpForwardingEnableError => {
                "failed to enable IP forwarding"
            }
            ErrorCode::IpForwardingDisableError => {
                "failed to disable IP forwarding"
            }
            ErrorCode::StartTetheringError => "failed to start tethering",
            ErrorCode::StopTetheringError => "failed to stop tethering",
            ErrorCode::SetDnsForwardersError => {
                "failed to set DNS forwarders"
            }
        };
        write!(f, "{s}")
    }
}

// ===== UpstreamType =====

/// Candidate upstream network type, ranked by `preferredUpstreamIfaceTypes`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum UpstreamType {
    Ethernet,
    Wifi,
    MobileDun,
    MobileHipri,
    None,
}

// ===== NetworkHandle =====

/// Opaque handle identifying an upstream network, as observed by the
/// upstream monitor. Equivalent to Android's `Network` object: an opaque
/// token, not a pointer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NetworkHandle(pub u64);

static NEXT_NETWORK_HANDLE: AtomicU64 = AtomicU64::new(1);

impl NetworkHandle {
    /// Allocates a fresh, process-unique handle. Used by test/fake
    /// `ConnectivitySource` implementations to mint new candidate networks.
    pub fn alloc() -> NetworkHandle {
        NetworkHandle(NEXT_NETWORK_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

// ===== Route =====

/// A single route entry in a candidate's link properties.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub iface: String,
    pub is_default: bool,
    pub destination: IpAddr,
}

// ===== LinkProperties =====

/// Subset of Android's `LinkProperties` the core actually needs: the stack
/// of interfaces a network rides over, its routes, and its DNS servers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkProperties {
    pub interfaces: Vec<String>,
    pub routes: Vec<Route>,
    pub dns: Vec<IpAddr>,
}

impl LinkProperties {
    /// Returns the interface that carries the best IPv4 default route over
    /// this candidate's full route set, honoring stacked interfaces.
    pub fn best_ipv4_default_iface(&self) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.is_default && r.destination.is_ipv4())
            .map(|r| r.iface.as_str())
    }
}

// ===== NetworkCapabilities =====

/// Opaque to the core beyond the one bit it reasons about: the transport
/// type used to classify the network into an `UpstreamType`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NetworkCapabilities {
    pub upstream_type: UpstreamType,
}

// ===== NetworkState =====

/// A single observation the upstream monitor reports to the master.
/// `lookup(network)` returns the last one recorded for a network.
#[derive(Clone, Debug)]
pub struct NetworkState {
    pub network: NetworkHandle,
    pub kind: NetworkStateKind,
    pub capabilities: Option<NetworkCapabilities>,
    pub link_properties: Option<LinkProperties>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NetworkStateKind {
    Available,
    Capabilities,
    LinkProperties,
    Lost,
}
