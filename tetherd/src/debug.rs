//
// SPDX-License-Identifier: MIT
//

use tracing::{debug, debug_span};

use crate::model::{ErrorCode, InterfaceState, UpstreamType};

// Tethering orchestrator debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    IfaceCreate(&'a str),
    IfaceRemove(&'a str),
    IfaceFsmTransition(&'a str, InterfaceState, InterfaceState),
    IfaceError(&'a str, ErrorCode),
    MasterEnterTetherModeAlive,
    MasterExitTetherModeAlive,
    MasterEnterError(ErrorCode),
    MasterStartTetheringRetry,
    UpstreamSelected(Option<&'a str>, UpstreamType),
    UpstreamLost,
    ProvisioningRecheck(&'a str),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Logs the debug message using the tracing API.
    pub fn log(&self) {
        match self {
            Debug::IfaceCreate(ifname) | Debug::IfaceRemove(ifname) => {
                debug_span!("iface", name = %ifname)
                    .in_scope(|| debug!("{}", self));
            }
            Debug::IfaceFsmTransition(ifname, old, new) => {
                debug_span!("iface", name = %ifname)
                    .in_scope(|| debug!(?old, ?new, "{}", self));
            }
            Debug::IfaceError(ifname, code) => {
                debug_span!("iface", name = %ifname)
                    .in_scope(|| debug!(?code, "{}", self));
            }
            Debug::MasterEnterTetherModeAlive
            | Debug::MasterExitTetherModeAlive => {
                debug_span!("master").in_scope(|| debug!("{}", self));
            }
            Debug::MasterEnterError(code) => {
                debug_span!("master").in_scope(|| debug!(?code, "{}", self));
            }
            Debug::MasterStartTetheringRetry => {
                debug_span!("master").in_scope(|| debug!("{}", self));
            }
            Debug::UpstreamSelected(ifname, upstream_type) => {
                debug_span!("upstream")
                    .in_scope(|| debug!(?ifname, ?upstream_type, "{}", self));
            }
            Debug::UpstreamLost => {
                debug_span!("upstream").in_scope(|| debug!("{}", self));
            }
            Debug::ProvisioningRecheck(iface_type) => {
                debug_span!("provisioning")
                    .in_scope(|| debug!(%iface_type, "{}", self));
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::IfaceCreate(..) => write!(f, "interface tracked"),
            Debug::IfaceRemove(..) => write!(f, "interface untracked"),
            Debug::IfaceFsmTransition(..) => write!(f, "state transition"),
            Debug::IfaceError(..) => write!(f, "interface error recorded"),
            Debug::MasterEnterTetherModeAlive => {
                write!(f, "entered TetherModeAlive")
            }
            Debug::MasterExitTetherModeAlive => {
                write!(f, "exited TetherModeAlive")
            }
            Debug::MasterEnterError(..) => write!(f, "entered error state"),
            Debug::MasterStartTetheringRetry => {
                write!(f, "retrying start tethering after failure")
            }
            Debug::UpstreamSelected(..) => write!(f, "upstream selected"),
            Debug::UpstreamLost => write!(f, "upstream lost"),
            Debug::ProvisioningRecheck(..) => {
                write!(f, "scheduling provisioning recheck")
            }
        }
    }
}
