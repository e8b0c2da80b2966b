//
// SPDX-License-Identifier: MIT
//

//! Master state machine: owns the process-wide decision of whether
//! tethering is active at all, drives IP-forwarding + NMS tethering
//! entry/exit, and selects the upstream network. Exactly one instance
//! exists per daemon, mutated only from the event-loop task.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use crate::config::TetheringConfig;
use crate::debug::Debug;
use crate::error::Error;
use crate::model::{NetworkHandle, NetworkState, NetworkStateKind, UpstreamType};
use crate::nms::NetworkManagementService;

/// Top-level master state. The NMS-error states are collapsed into one
/// `Error(ErrorCode)` variant carrying which operation failed, since
/// they're otherwise identical: each is left only by `CMD_CLEAR_ERROR`,
/// and each re-enters `Initial`/`TetherModeAlive` depending on whether any
/// interface is still requesting tethering.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MasterState {
    Initial,
    TetherModeAlive,
    Error(crate::model::ErrorCode),
}

/// The upstream network currently selected, if any (`mCurrentUpstreamIface`).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UpstreamSelection {
    pub iface: Option<String>,
    pub upstream_type: Option<UpstreamType>,
    /// The selected candidate's own DNS servers, for programming the NMS's
    /// DNS forwarders. Empty when nothing is selected or the candidate
    /// advertised none.
    pub dns: Vec<IpAddr>,
}

/// Process-wide master state.
#[derive(Debug)]
pub struct Master {
    pub state: MasterState,
    /// `MasterRequestList`: interfaces currently asking for tethering to
    /// stay active. Non-empty iff tethering should be alive.
    pub requesters: HashSet<String>,
    /// Last-observed state per candidate upstream network, maintained by
    /// [`observe_upstream`].
    candidates: HashMap<NetworkHandle, NetworkState>,
    pub current_upstream: UpstreamSelection,
    /// `mTryCell`: set once a cellular (DUN/HIPRI) upstream request has
    /// been made for the current tethering session, so it is only ever
    /// attempted once per settle cycle.
    pub try_cell: bool,
}

impl Default for Master {
    fn default() -> Self {
        Master::new()
    }
}

impl Master {
    pub fn new() -> Master {
        Master {
            state: MasterState::Initial,
            requesters: HashSet::new(),
            candidates: HashMap::new(),
            current_upstream: UpstreamSelection::default(),
            try_cell: false,
        }
    }

    pub fn is_tether_mode_alive(&self) -> bool {
        self.state == MasterState::TetherModeAlive
    }
}

/// `CMD_TETHER_MODE_REQUESTED`: called when an interface enters `Starting`.
/// Enters `TetherModeAlive` if this is the first requester.
pub fn tether_mode_requested(
    master: &mut Master,
    ifname: &str,
    nms: &dyn NetworkManagementService,
    dhcp_ranges: &[String],
) -> Result<(), Error> {
    let was_empty = master.requesters.is_empty();
    master.requesters.insert(ifname.to_string());
    if was_empty && master.state == MasterState::Initial {
        enter_tether_mode_alive(master, nms, dhcp_ranges)?;
    }
    Ok(())
}

/// `CMD_TETHER_MODE_UNREQUESTED`. Exits `TetherModeAlive` once no
/// interface still wants it.
pub fn tether_mode_unrequested(
    master: &mut Master,
    ifname: &str,
    nms: &dyn NetworkManagementService,
) -> Result<(), Error> {
    master.requesters.remove(ifname);
    if master.requesters.is_empty() && master.state == MasterState::TetherModeAlive
    {
        exit_tether_mode_alive(master, nms)?;
    }
    Ok(())
}

/// Entry sequence: enable IP forwarding, then start NMS tethering with
/// the config's DHCP ranges. A failed `startTethering` is retried once,
/// via `stopTethering` followed by a fresh `startTethering`, before the
/// master gives up and moves to the error state; `setIpForwardingEnabled`
/// failure moves straight to its own error state without a retry.
pub fn enter_tether_mode_alive(
    master: &mut Master,
    nms: &dyn NetworkManagementService,
    dhcp_ranges: &[String],
) -> Result<(), Error> {
    if nms.set_ip_forwarding_enabled(true).is_err() {
        master.state =
            MasterState::Error(crate::model::ErrorCode::IpForwardingEnableError);
        Debug::MasterEnterError(crate::model::ErrorCode::IpForwardingEnableError)
            .log();
        return Err(Error::IpForwardingEnableError);
    }
    if nms.start_tethering(dhcp_ranges).is_err() {
        Debug::MasterStartTetheringRetry.log();
        let _ = nms.stop_tethering();
        if nms.start_tethering(dhcp_ranges).is_err() {
            master.state =
                MasterState::Error(crate::model::ErrorCode::StartTetheringError);
            Debug::MasterEnterError(crate::model::ErrorCode::StartTetheringError)
                .log();
            return Err(Error::StartTetheringError);
        }
    }
    master.state = MasterState::TetherModeAlive;
    master.try_cell = false;
    Debug::MasterEnterTetherModeAlive.log();
    Ok(())
}

/// Exit sequence: stop NMS tethering, then disable IP forwarding,
/// unconditionally returning to `Initial` even if a step fails (there is
/// no interface left requesting tethering to retry for).
pub fn exit_tether_mode_alive(
    master: &mut Master,
    nms: &dyn NetworkManagementService,
) -> Result<(), Error> {
    let stop_result = nms.stop_tethering();
    let disable_result = nms.set_ip_forwarding_enabled(false);
    master.state = MasterState::Initial;
    master.current_upstream = UpstreamSelection::default();
    master.try_cell = false;
    Debug::MasterExitTetherModeAlive.log();

    if stop_result.is_err() {
        return Err(Error::StopTetheringError);
    }
    if disable_result.is_err() {
        return Err(Error::IpForwardingDisableError);
    }
    Ok(())
}

/// `CMD_CLEAR_ERROR`: leaves any error state, re-entering `TetherModeAlive`
/// if an interface is still requesting it, else `Initial`. Does not
/// itself retry the failed operation — the caller's interfaces must
/// re-request tethering for that.
pub fn clear_error(master: &mut Master) {
    if matches!(master.state, MasterState::Error(_)) {
        master.state = if master.requesters.is_empty() {
            MasterState::Initial
        } else {
            MasterState::TetherModeAlive
        };
    }
}

/// `EVENT_UPSTREAM_CALLBACK`: records the monitor's latest observation for
/// `network`, dropping it from consideration once lost.
pub fn observe_upstream(master: &mut Master, state: NetworkState) {
    if state.kind == NetworkStateKind::Lost {
        master.candidates.remove(&state.network);
        if master.current_upstream.iface.is_some()
            && !master.candidates.values().any(|c| {
                c.link_properties
                    .as_ref()
                    .and_then(|lp| lp.best_ipv4_default_iface())
                    == master.current_upstream.iface.as_deref()
            })
        {
            master.current_upstream = UpstreamSelection::default();
            Debug::UpstreamLost.log();
        }
    } else {
        master.candidates.insert(state.network, state);
    }
}

/// `CMD_UPSTREAM_CHANGED` / `CMD_RETRY_UPSTREAM` selection algorithm:
/// picks the first candidate, in `preferredUpstreamIfaceTypes` order, that
/// has both capabilities and link properties with a usable IPv4 default
/// route. Returns `true` if cellular should be requested because no
/// wired/Wi-Fi candidate qualified and it hasn't been tried yet this
/// cycle.
pub fn select_upstream(
    master: &mut Master,
    config: &TetheringConfig,
) -> bool {
    for preferred in &config.preferred_upstream_iface_types {
        if let Some((iface, dns)) = master.candidates.values().find_map(|c| {
            let caps = c.capabilities.as_ref()?;
            if caps.upstream_type != *preferred {
                return None;
            }
            let lp = c.link_properties.as_ref()?;
            let iface = lp.best_ipv4_default_iface()?;
            Some((iface.to_string(), lp.dns.clone()))
        }) {
            master.current_upstream = UpstreamSelection {
                iface: Some(iface.clone()),
                upstream_type: Some(*preferred),
                dns,
            };
            Debug::UpstreamSelected(Some(&iface), *preferred).log();
            return false;
        }
    }

    master.current_upstream = UpstreamSelection::default();
    let wants_cell = config
        .preferred_upstream_iface_types
        .iter()
        .any(|t| matches!(t, UpstreamType::MobileDun | UpstreamType::MobileHipri));
    if wants_cell && !master.try_cell {
        master.try_cell = true;
        true
    } else {
        Debug::UpstreamLost.log();
        false
    }
}
