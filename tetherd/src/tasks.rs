//
// SPDX-License-Identifier: MIT
//

//! Inter-task message types consumed by the single event-loop task in its
//! single-threaded cooperative model, plus the delayed-message helpers
//! used to schedule `CMD_RETRY_UPSTREAM` and provisioning rechecks.
//
// tetherd message diagram:
//
//                         +------------------+
//       facade calls  --> |                  |
//   broadcast adapter --> |   event loop     | --> NMS / USB / Wi-Fi /
//     upstream monitor -> |  (Orchestrator)  |     Bluetooth / provisioning
//      retry timer (1x)-> |                  |     UI calls
//                         +------------------+

use std::time::Duration;

use tether_utils::task::TimeoutTask;

use crate::model::{ErrorCode, InterfaceType, NetworkState};
use crate::nms::ResultSink;
use std::sync::Arc;

/// Time the master waits before retrying upstream selection when no
/// upstream is available and cellular hasn't been tried yet.
pub const UPSTREAM_SETTLE_TIME: Duration = Duration::from_millis(10_000);

/// Default period between provisioning entitlement rechecks while tethered.
/// No literal value is mandated elsewhere, so a conservative default is
/// chosen here and documented in DESIGN.md.
pub const PROVISIONING_RECHECK_INTERVAL: Duration =
    Duration::from_secs(24 * 60 * 60);

/// Messages accepted by the event loop, regardless of origin. Every
/// constructor below corresponds 1:1 to a `CMD_*`/`EVENT_*` name in the
/// control-plane's command vocabulary. No blanket `#[derive(Debug)]`:
/// `StartTethering` carries a `dyn ResultSink`, which isn't `Debug`, so
/// [`std::fmt::Display`] below is the only loggable representation.
pub enum OrchestratorMsg {
    // ----- from the orchestrator facade (caller threads) -----
    Tether(String),
    Untether(String),
    StartTethering {
        iface_type: InterfaceType,
        show_ui: bool,
        result: Arc<dyn ResultSink>,
    },
    StopTethering(InterfaceType),
    ClearError,

    // ----- from the broadcast adapter -----
    Broadcast(crate::events::BroadcastEvent),

    // ----- from the upstream network monitor -----
    UpstreamCallback(NetworkState),

    // ----- internal, scheduled -----
    RetryUpstream,
    ProvisioningRecheck(InterfaceType),
}

impl std::fmt::Display for OrchestratorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorMsg::Tether(i) => write!(f, "Tether({i})"),
            OrchestratorMsg::Untether(i) => write!(f, "Untether({i})"),
            OrchestratorMsg::StartTethering { iface_type, .. } => {
                write!(f, "StartTethering({iface_type:?})")
            }
            OrchestratorMsg::StopTethering(t) => {
                write!(f, "StopTethering({t:?})")
            }
            OrchestratorMsg::ClearError => write!(f, "ClearError"),
            OrchestratorMsg::Broadcast(e) => write!(f, "Broadcast({e:?})"),
            OrchestratorMsg::UpstreamCallback(ns) => {
                write!(f, "UpstreamCallback({:?})", ns.kind)
            }
            OrchestratorMsg::RetryUpstream => write!(f, "RetryUpstream"),
            OrchestratorMsg::ProvisioningRecheck(t) => {
                write!(f, "ProvisioningRecheck({t:?})")
            }
        }
    }
}

/// Schedules a single `CMD_RETRY_UPSTREAM` delivery after
/// [`UPSTREAM_SETTLE_TIME`]. Dropping the returned handle (or scheduling a
/// new one) implicitly supersedes it — there is no explicit cancel.
pub fn schedule_retry_upstream(
    tx: tether_utils::UnboundedSender<OrchestratorMsg>,
) -> TimeoutTask {
    TimeoutTask::new(UPSTREAM_SETTLE_TIME, move || async move {
        let _ = tx.send(OrchestratorMsg::RetryUpstream);
    })
}

/// Starts the periodic provisioning recheck for `iface_type` while it
/// remains tethered.
pub fn schedule_provisioning_recheck(
    tx: tether_utils::UnboundedSender<OrchestratorMsg>,
    iface_type: InterfaceType,
) -> tether_utils::task::IntervalTask {
    tether_utils::task::IntervalTask::new(
        PROVISIONING_RECHECK_INTERVAL,
        false,
        move || {
            let tx = tx.clone();
            async move {
                let _ =
                    tx.send(OrchestratorMsg::ProvisioningRecheck(iface_type));
            }
        },
    )
}

/// Returns the `ErrorCode` an NMS-call failure maps to, given which call
/// failed.
pub fn nms_error_code(op: NmsOp) -> ErrorCode {
    match op {
        NmsOp::EnableIpForwarding => ErrorCode::IpForwardingEnableError,
        NmsOp::DisableIpForwarding => ErrorCode::IpForwardingDisableError,
        NmsOp::StartTethering => ErrorCode::StartTetheringError,
        NmsOp::StopTethering => ErrorCode::StopTetheringError,
        NmsOp::SetDnsForwarders => ErrorCode::SetDnsForwardersError,
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NmsOp {
    EnableIpForwarding,
    DisableIpForwarding,
    StartTethering,
    StopTethering,
    SetDnsForwarders,
}
