//
// SPDX-License-Identifier: MIT
//

//! Per-interface state machine. Tracks a single downstream interface's
//! local lifecycle; the `Registry` mirrors the externally visible half of
//! this state (`InterfaceState`) so callers never observe the internal
//! `Starting` phase.

use crate::debug::Debug;
use crate::model::{ErrorCode, InterfaceState, InterfaceType};
use crate::registry::{IfaceHandle, Registry};

/// Internal interface lifecycle. `Starting` exists only here, as the
/// phase between "tethering requested" and "tether connection confirmed
/// up" — the externally visible `InterfaceState` has no corresponding
/// value, so it reads back as `Available` until the transition completes
/// (or fails, in which case it never left `Available` as far as a caller
/// can tell).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IfaceSm {
    Available,
    Starting,
    Tethered,
}

impl IfaceSm {
    /// Projection used to populate `Registry::set_state`.
    fn external(self) -> InterfaceState {
        match self {
            IfaceSm::Available | IfaceSm::Starting => InterfaceState::Available,
            IfaceSm::Tethered => InterfaceState::Tethered,
        }
    }
}

/// An interface's full, event-loop-owned state. Never shared across
/// threads: only the event-loop task may touch this. Other threads learn
/// about it exclusively through `Registry` snapshots and `IfaceHandle`.
#[derive(Debug)]
pub struct Interface {
    pub name: String,
    pub handle: IfaceHandle,
    pub iface_type: InterfaceType,
    pub sm: IfaceSm,
}

impl Interface {
    pub fn new(
        name: String,
        handle: IfaceHandle,
        iface_type: InterfaceType,
    ) -> Interface {
        Interface {
            name,
            handle,
            iface_type,
            sm: IfaceSm::Available,
        }
    }
}

/// Commands the `Interface` FSM accepts, named after their `CMD_*`
/// counterparts.
#[derive(Clone, Debug)]
pub enum IfaceCmd {
    TetherRequested,
    TetherUnrequested,
    /// The interface itself went away (USB unplugged, Wi-Fi AP torn down,
    /// Bluetooth PAN device disconnected).
    InterfaceDown,
    /// The platform confirmed (`true`) or denied/lost (`false`) the tether
    /// connection that `TetherRequested` asked for.
    TetherConnectionChanged(bool),
    IpForwardingEnableError,
    IpForwardingDisableError,
    StartTetheringError,
    StopTetheringError,
    SetDnsForwardersError,
}

/// Result of driving the FSM: whether the master should recompute whether
/// any interface still needs tethering active. Entry/exit of tether mode
/// is driven by at least one interface wanting it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FsmOutcome {
    pub recompute_master: bool,
}

fn set_state(iface: &Interface, registry: &Registry, sm: IfaceSm) {
    let old = iface.sm;
    registry.set_state(&iface.name, sm.external());
    Debug::IfaceFsmTransition(&iface.name, old.external(), sm.external()).log();
}

/// Drives the per-interface FSM for `cmd`, mutating `iface.sm` and the
/// registry's externally visible mirror, and returns whether the master's
/// tethering-active decision needs to be revisited.
///
/// An interface transitions to `Tethered` only after IP forwarding + NMS
/// tethering are both active; this function assumes the caller (the
/// master) has already enforced that ordering and only calls
/// `TetherConnectionChanged(true)` once it holds.
pub fn fsm(
    iface: &mut Interface,
    registry: &Registry,
    cmd: IfaceCmd,
) -> FsmOutcome {
    match (iface.sm, cmd) {
        (IfaceSm::Available, IfaceCmd::TetherRequested) => {
            iface.sm = IfaceSm::Starting;
            set_state(iface, registry, iface.sm);
            FsmOutcome {
                recompute_master: true,
            }
        }

        (IfaceSm::Starting, IfaceCmd::TetherConnectionChanged(true)) => {
            iface.sm = IfaceSm::Tethered;
            set_state(iface, registry, iface.sm);
            FsmOutcome {
                recompute_master: false,
            }
        }

        (IfaceSm::Starting, IfaceCmd::TetherConnectionChanged(false)) => {
            iface.sm = IfaceSm::Available;
            set_state(iface, registry, iface.sm);
            FsmOutcome {
                recompute_master: true,
            }
        }

        (IfaceSm::Starting | IfaceSm::Tethered, IfaceCmd::TetherUnrequested) => {
            iface.sm = IfaceSm::Available;
            set_state(iface, registry, iface.sm);
            FsmOutcome {
                recompute_master: true,
            }
        }

        (IfaceSm::Available, IfaceCmd::TetherUnrequested) => {
            // Already not tethering; nothing to do, and no need to disturb
            // the master's active count.
            FsmOutcome {
                recompute_master: false,
            }
        }

        (_, IfaceCmd::InterfaceDown) => {
            let was_active = iface.sm != IfaceSm::Available;
            iface.sm = IfaceSm::Available;
            FsmOutcome {
                recompute_master: was_active,
            }
        }

        (_, IfaceCmd::IpForwardingEnableError) => {
            mark_error(iface, registry, ErrorCode::IpForwardingEnableError)
        }
        (_, IfaceCmd::IpForwardingDisableError) => {
            mark_error(iface, registry, ErrorCode::IpForwardingDisableError)
        }
        (_, IfaceCmd::StartTetheringError) => {
            mark_error(iface, registry, ErrorCode::StartTetheringError)
        }
        (_, IfaceCmd::StopTetheringError) => {
            mark_error(iface, registry, ErrorCode::StopTetheringError)
        }
        (_, IfaceCmd::SetDnsForwardersError) => {
            mark_error(iface, registry, ErrorCode::SetDnsForwardersError)
        }

        // Any other (state, command) pair is a no-op: e.g. a duplicate
        // TetherRequested while already Starting/Tethered.
        _ => FsmOutcome {
            recompute_master: false,
        },
    }
}

/// Records a sticky error and drops the interface back to `Available`;
/// any error notification cancels the in-progress tether.
fn mark_error(
    iface: &mut Interface,
    registry: &Registry,
    code: ErrorCode,
) -> FsmOutcome {
    registry.set_error(&iface.name, code);
    Debug::IfaceError(&iface.name, code).log();
    let was_active = iface.sm != IfaceSm::Available;
    iface.sm = IfaceSm::Available;
    set_state(iface, registry, iface.sm);
    FsmOutcome {
        recompute_master: was_active,
    }
}
