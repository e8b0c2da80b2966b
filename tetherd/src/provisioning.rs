//
// SPDX-License-Identifier: MIT
//

//! Carrier provisioning gate: decides whether an interface needs an
//! entitlement check before tethering is allowed to proceed, and
//! schedules the periodic recheck while it remains tethered.

use std::collections::HashMap;

use tether_utils::task::IntervalTask;
use tether_utils::UnboundedSender;

use crate::config::ConfigHandle;
use crate::model::InterfaceType;
use crate::nms::ProvisioningUi;
use crate::tasks::{schedule_provisioning_recheck, OrchestratorMsg};

/// Owns the in-flight recheck timers, one per interface type currently
/// tethered. Dropping a timer cancels it — the recheck stops as soon as
/// the interface untethers.
#[derive(Default)]
pub struct Provisioning {
    rechecks: HashMap<InterfaceType, IntervalTask>,
}

impl Provisioning {
    pub fn new() -> Provisioning {
        Provisioning::default()
    }

    /// True iff the config names a provisioning app and entitlement checks
    /// are mandated, unless overridden (e.g. by a `--no-provisioning` debug
    /// flag, taken as a parameter rather than a config field).
    pub fn is_required(config: &ConfigHandle, noprovisioning_override: bool) -> bool {
        config
            .load()
            .provisioning_required(noprovisioning_override)
    }

    /// Routes through the provisioning UI (or silently, if `show_ui` is
    /// false) before the caller is allowed to proceed. Returns whatever the
    /// UI trait returns; the caller maps a failure onto
    /// `ErrorCode::ServiceUnavail`-style handling.
    pub fn start_tethering(
        ui: &dyn ProvisioningUi,
        iface_type: InterfaceType,
        show_ui: bool,
    ) -> Result<(), ()> {
        ui.start(iface_type, show_ui)
    }

    /// Begins the periodic recheck for `iface_type` once it's tethered.
    /// Replaces any existing timer for the same type.
    pub fn schedule_recheck(
        &mut self,
        tx: UnboundedSender<OrchestratorMsg>,
        iface_type: InterfaceType,
    ) {
        let task = schedule_provisioning_recheck(tx, iface_type);
        self.rechecks.insert(iface_type, task);
    }

    /// Cancels the recheck timer for `iface_type`, if one is running.
    /// Stops once nothing of that type is tethered anymore.
    pub fn cancel_recheck(&mut self, iface_type: InterfaceType) {
        self.rechecks.remove(&iface_type);
    }

    pub fn is_scheduled(&self, iface_type: InterfaceType) -> bool {
        self.rechecks.contains_key(&iface_type)
    }
}

/// Handles a fired recheck (`CMD_PROVISIONING_RECHECK`): asks the
/// provisioning UI to silently recheck entitlement for `iface_type`.
pub fn handle_recheck(ui: &dyn ProvisioningUi, iface_type: InterfaceType) {
    crate::debug::Debug::ProvisioningRecheck(type_name(iface_type)).log();
    ui.recheck(iface_type);
}

/// A SIM transitioning to `Loaded` re-arms provisioning: any interface
/// currently tethered must be rechecked, since the earlier entitlement
/// decision may have been made against a different carrier profile.
pub fn handle_sim_loaded(
    ui: &dyn ProvisioningUi,
    tethered_types: &[InterfaceType],
) {
    for iface_type in tethered_types {
        ui.recheck(*iface_type);
    }
}

fn type_name(iface_type: InterfaceType) -> &'static str {
    match iface_type {
        InterfaceType::Wifi => "wifi",
        InterfaceType::Usb => "usb",
        InterfaceType::Bluetooth => "bluetooth",
        InterfaceType::Invalid => "invalid",
    }
}
