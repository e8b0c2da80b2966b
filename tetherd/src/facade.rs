//
// SPDX-License-Identifier: MIT
//

//! The orchestrator facade: the single public entry point wired up by
//! `main.rs`. Owns the event-loop task that is the only mutator of
//! `Master`/`Interface` state, and exposes the caller-facing API either
//! as direct registry reads or as messages sent into that loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tether_utils::task::{Task, TimeoutTask};
use tether_utils::{UnboundedReceiver, UnboundedSender};
use tracing::Instrument;

use crate::config::ConfigHandle;
use crate::debug::Debug;
use crate::error::Error;
use crate::events::BroadcastEvent;
use crate::iface::{fsm, IfaceCmd, Interface};
use crate::master::{self, Master};
use crate::model::{ErrorCode, InterfaceType, NetworkStateKind};
use crate::monitor::Monitor;
use crate::nms::{
    BluetoothPan, NetworkManagementService, ProvisioningUi, ResultSink,
    StatusSink, TetherStatus, UsbManager, WifiManager,
};
use crate::provisioning::Provisioning;
use crate::registry::Registry;
use crate::tasks::{schedule_retry_upstream, OrchestratorMsg};

/// The USB interface name the broadcast adapter reports for the kernel's
/// RNDIS function, and the name `setUsbTethering`/the broadcast handler
/// tether against.
const USB_TETHER_IFACE: &str = "rndis0";

/// `mRndisEnabled`, `mUsbTetherRequested`, `pendingUsbTetherRequested`:
/// read and written both from the event loop (confirming/denying RNDIS on
/// a broadcast) and from `Orchestrator::set_usb_tethering` on whatever
/// thread the caller is on, guarded by the same kind of single mutex as
/// the registry rather than routed through the event loop.
#[derive(Clone, Default)]
struct UsbTetherState(Arc<Mutex<UsbTetherFlags>>);

#[derive(Default)]
struct UsbTetherFlags {
    rndis_enabled: bool,
    tether_requested: bool,
    pending: bool,
}

/// What `setUsbTethering(true)` (or `startTethering(USB)`'s internal call
/// to it) should do given the current RNDIS state.
enum UsbEnableAction {
    /// RNDIS already confirmed on: tether `rndis0` right away.
    TetherNow,
    /// RNDIS off: request it and wait for the broadcast handler to finish
    /// the job once it comes up.
    RequestRndis,
}

/// Marks a USB tether request and decides whether it can be fulfilled
/// immediately or must wait on the USB subsystem to bring RNDIS up.
fn usb_enable_action(state: &UsbTetherState) -> UsbEnableAction {
    let mut flags = state.0.lock().unwrap();
    flags.tether_requested = true;
    if flags.rndis_enabled {
        UsbEnableAction::TetherNow
    } else {
        flags.pending = true;
        UsbEnableAction::RequestRndis
    }
}

/// Clears the USB tether request and pending-RNDIS flags, returning
/// whether RNDIS was confirmed on (and therefore needs explicitly turning
/// back off).
fn usb_disable_action(state: &UsbTetherState) -> bool {
    let mut flags = state.0.lock().unwrap();
    flags.tether_requested = false;
    flags.pending = false;
    let was_enabled = flags.rndis_enabled;
    flags.rndis_enabled = false;
    was_enabled
}

/// External collaborators the event loop calls through. Grouped into one
/// struct so constructing an `Orchestrator` takes one argument instead of
/// six.
pub struct Collaborators {
    pub nms: Arc<dyn NetworkManagementService>,
    pub usb: Arc<dyn UsbManager>,
    pub wifi: Arc<dyn WifiManager>,
    pub bluetooth: Arc<dyn BluetoothPan>,
    pub provisioning_ui: Arc<dyn ProvisioningUi>,
    pub status_sink: Arc<dyn StatusSink>,
    pub connectivity: Box<dyn crate::monitor::ConnectivitySource>,
}

/// Caller-facing handle. Cheap to clone; every clone shares the same event
/// loop and registry.
#[derive(Clone)]
pub struct Orchestrator {
    tx: UnboundedSender<OrchestratorMsg>,
    registry: Registry,
    usb: Arc<dyn UsbManager>,
    usb_state: UsbTetherState,
    wifi: Arc<dyn WifiManager>,
    bluetooth: Arc<dyn BluetoothPan>,
}

impl Orchestrator {
    /// Builds the orchestrator and spawns its event-loop task. The
    /// returned `Task` must be kept alive (or detached) for as long as the
    /// daemon runs; dropping it cancels the loop.
    pub fn spawn(
        config: ConfigHandle,
        registry: Registry,
        collaborators: Collaborators,
    ) -> (Orchestrator, Task<()>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let usb_state = UsbTetherState::default();

        let handle = Orchestrator {
            tx: tx.clone(),
            registry: registry.clone(),
            usb: collaborators.usb.clone(),
            usb_state: usb_state.clone(),
            wifi: collaborators.wifi.clone(),
            bluetooth: collaborators.bluetooth.clone(),
        };

        let event_loop =
            EventLoop::new(config, registry, collaborators, tx, rx, usb_state);
        let task = Task::spawn(event_loop.run().in_current_span());

        (handle, task)
    }

    /// Requests tethering be started on a specific, already-discovered
    /// interface.
    pub fn tether(&self, ifname: &str) {
        let _ = self.tx.send(OrchestratorMsg::Tether(ifname.to_string()));
    }

    /// Requests tethering be stopped on a specific interface.
    pub fn untether(&self, ifname: &str) {
        let _ = self.tx.send(OrchestratorMsg::Untether(ifname.to_string()));
    }

    /// Untethers every currently tracked interface.
    pub fn untether_all(&self) {
        for ifname in self.registry.tetherable_ifaces() {
            self.untether(&ifname);
        }
    }

    /// Asks the provisioning gate (if required) and then the relevant
    /// subsystem (USB/Wi-Fi/Bluetooth) to turn the interface class on. The
    /// result is delivered asynchronously through `result`.
    pub fn start_tethering(
        &self,
        iface_type: InterfaceType,
        show_ui: bool,
        result: Arc<dyn ResultSink>,
    ) {
        let _ = self.tx.send(OrchestratorMsg::StartTethering {
            iface_type,
            show_ui,
            result,
        });
    }

    /// Turns off tethering for an interface class.
    pub fn stop_tethering(&self, iface_type: InterfaceType) {
        let _ = self.tx.send(OrchestratorMsg::StopTethering(iface_type));
    }

    /// Clears any active master error state.
    pub fn clear_error(&self) {
        let _ = self.tx.send(OrchestratorMsg::ClearError);
    }

    /// Feeds a normalized broadcast into the event loop. Called by whatever
    /// owns the `BroadcastAdapter`.
    pub fn on_broadcast(&self, event: BroadcastEvent) {
        let _ = self.tx.send(OrchestratorMsg::Broadcast(event));
    }

    /// Feeds an upstream-network observation into the event loop. In
    /// production this is called from inside the `Monitor`'s own
    /// subscription callbacks; exposed here too since the monitor's
    /// `ConnectivitySource` is an external collaborator that scenario tests
    /// drive directly.
    pub fn on_upstream_state(&self, state: crate::model::NetworkState) {
        let _ = self.tx.send(OrchestratorMsg::UpstreamCallback(state));
    }

    pub fn get_tethered_ifaces(&self) -> Vec<String> {
        self.registry.tethered_ifaces()
    }

    pub fn get_tetherable_ifaces(&self) -> Vec<String> {
        self.registry.tetherable_ifaces()
    }

    pub fn get_errored_ifaces(&self) -> Vec<String> {
        self.registry.errored_ifaces()
    }

    pub fn get_last_tether_error(&self, ifname: &str) -> ErrorCode {
        self.registry.last_error(ifname)
    }

    /// `mUsbTetherRequested`: whether a USB tether is currently wanted,
    /// regardless of whether RNDIS has come up yet.
    pub fn usb_tether_requested(&self) -> bool {
        self.usb_state.0.lock().unwrap().tether_requested
    }

    /// `mRndisEnabled`: whether the USB broadcast handler last confirmed
    /// RNDIS as on.
    pub fn usb_rndis_enabled(&self) -> bool {
        self.usb_state.0.lock().unwrap().rndis_enabled
    }

    /// If RNDIS is already confirmed on, tethers `rndis0` directly;
    /// otherwise requests RNDIS and leaves the pending flag for the USB
    /// broadcast handler to finish once the subsystem confirms it's up.
    /// Disabling untethers `rndis0` and, if RNDIS had been confirmed on,
    /// turns it back off.
    pub fn set_usb_tethering(&self, enable: bool) -> Result<(), Error> {
        if enable {
            match usb_enable_action(&self.usb_state) {
                UsbEnableAction::TetherNow => {
                    self.tether(USB_TETHER_IFACE);
                    Ok(())
                }
                UsbEnableAction::RequestRndis => self
                    .usb
                    .set_current_function(true)
                    .map_err(|()| Error::SubsystemError("usb")),
            }
        } else {
            let was_rndis_enabled = usb_disable_action(&self.usb_state);
            self.untether(USB_TETHER_IFACE);
            if was_rndis_enabled {
                self.usb
                    .set_current_function(false)
                    .map_err(|()| Error::SubsystemError("usb"))?;
            }
            Ok(())
        }
    }

    /// Forwards directly to the Wi-Fi AP subsystem.
    pub fn set_wifi_tethering(&self, enable: bool) -> Result<(), Error> {
        self.wifi
            .set_wifi_ap_enabled(enable)
            .map_err(|()| Error::SubsystemError("wifi"))
    }

    /// Forwards to the Bluetooth PAN subsystem, then re-queries
    /// `isTetheringOn()` and reports success only if it now matches
    /// `enable` — `is_tethering_on` is racy, so this is the one place that
    /// actually observes the outcome rather than trusting the setter's
    /// own return value.
    pub fn set_bluetooth_tethering(&self, enable: bool) -> Result<(), Error> {
        self.bluetooth
            .set_bluetooth_tethering(enable)
            .map_err(|()| Error::SubsystemError("bluetooth"))?;
        if self.bluetooth.is_tethering_on() == enable {
            Ok(())
        } else {
            Err(Error::SubsystemError("bluetooth"))
        }
    }
}

/// Owns every piece of mutable state and runs the single cooperative event
/// loop. Never `Clone`, never shared: the whole point is that only one
/// task ever touches it.
struct EventLoop {
    config: ConfigHandle,
    registry: Registry,
    interfaces: HashMap<String, Interface>,
    master: Master,
    provisioning: Provisioning,
    nms: Arc<dyn NetworkManagementService>,
    usb: Arc<dyn UsbManager>,
    usb_state: UsbTetherState,
    wifi: Arc<dyn WifiManager>,
    bluetooth: Arc<dyn BluetoothPan>,
    provisioning_ui: Arc<dyn ProvisioningUi>,
    status_sink: Arc<dyn StatusSink>,
    monitor: Monitor,
    tx: UnboundedSender<OrchestratorMsg>,
    rx: UnboundedReceiver<OrchestratorMsg>,
    retry_timer: Option<TimeoutTask>,
    sim_loaded: bool,
}

impl EventLoop {
    fn new(
        config: ConfigHandle,
        registry: Registry,
        collaborators: Collaborators,
        tx: UnboundedSender<OrchestratorMsg>,
        rx: UnboundedReceiver<OrchestratorMsg>,
        usb_state: UsbTetherState,
    ) -> EventLoop {
        let monitor = Monitor::new(collaborators.connectivity, tx.clone());
        EventLoop {
            config,
            registry,
            interfaces: HashMap::new(),
            master: Master::new(),
            provisioning: Provisioning::new(),
            nms: collaborators.nms,
            usb: collaborators.usb,
            usb_state,
            wifi: collaborators.wifi,
            bluetooth: collaborators.bluetooth,
            provisioning_ui: collaborators.provisioning_ui,
            status_sink: collaborators.status_sink,
            monitor,
            tx,
            rx,
            retry_timer: None,
            sim_loaded: false,
        }
    }

    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            tracing::trace!(%msg, "processing message");
            self.process(msg);
        }
    }

    fn process(&mut self, msg: OrchestratorMsg) {
        match msg {
            OrchestratorMsg::Tether(ifname) => self.handle_tether(&ifname),
            OrchestratorMsg::Untether(ifname) => self.handle_untether(&ifname),
            OrchestratorMsg::StartTethering {
                iface_type,
                show_ui,
                result,
            } => self.handle_start_tethering(iface_type, show_ui, &*result),
            OrchestratorMsg::StopTethering(iface_type) => {
                self.handle_stop_tethering(iface_type)
            }
            OrchestratorMsg::ClearError => {
                master::clear_error(&mut self.master);
                self.registry.clear_all_errors();
            }
            OrchestratorMsg::Broadcast(event) => self.handle_broadcast(event),
            OrchestratorMsg::UpstreamCallback(state) => {
                master::observe_upstream(&mut self.master, state.clone());
                if state.kind != NetworkStateKind::Lost {
                    self.reselect_upstream();
                }
            }
            OrchestratorMsg::RetryUpstream => {
                self.retry_timer = None;
                self.reselect_upstream();
            }
            OrchestratorMsg::ProvisioningRecheck(iface_type) => {
                crate::provisioning::handle_recheck(
                    &*self.provisioning_ui,
                    iface_type,
                );
            }
        }
        self.publish_status();
    }

    fn handle_tether(&mut self, ifname: &str) {
        let iface_type = self.config.load().classify(ifname);
        if iface_type == InterfaceType::Invalid {
            return;
        }
        if !self.registry.contains(ifname) {
            if let Some(handle) = self.registry.add(ifname, iface_type) {
                Debug::IfaceCreate(ifname).log();
                self.interfaces.insert(
                    ifname.to_string(),
                    Interface::new(ifname.to_string(), handle, iface_type),
                );
            }
        }

        let dhcp_ranges = self.config.load().dhcp_ranges.clone();
        let Some(iface) = self.interfaces.get_mut(ifname) else {
            return;
        };
        let outcome = fsm(iface, &self.registry, IfaceCmd::TetherRequested);
        if outcome.recompute_master {
            if let Err(error) = master::tether_mode_requested(
                &mut self.master,
                ifname,
                &*self.nms,
                &dhcp_ranges,
            ) {
                error.log();
                self.registry.set_error(ifname, error.code());
                Debug::IfaceError(ifname, error.code()).log();
                return;
            }
        }

        // No separate "connection confirmed" broadcast models a USB/
        // Bluetooth downstream in this implementation: once the master
        // holds TetherModeAlive the interface is considered connected
        // immediately. Wi-Fi still waits for an explicit confirmation,
        // via `handle_broadcast`'s `WifiApState::Enabled` path.
        if self.master.is_tether_mode_alive() && iface_type != InterfaceType::Wifi
        {
            if let Some(iface) = self.interfaces.get_mut(ifname) {
                fsm(iface, &self.registry, IfaceCmd::TetherConnectionChanged(true));
                self.provisioning
                    .schedule_recheck(self.tx.clone(), iface_type);
            }
            self.monitor.start_default();
        }
    }

    fn handle_untether(&mut self, ifname: &str) {
        let Some(iface) = self.interfaces.get_mut(ifname) else {
            return;
        };
        let iface_type = iface.iface_type;
        let outcome = fsm(iface, &self.registry, IfaceCmd::TetherUnrequested);
        if outcome.recompute_master {
            if let Err(error) = master::tether_mode_unrequested(
                &mut self.master,
                ifname,
                &*self.nms,
            ) {
                error.log();
            }
            if !self.any_tethered_of_type(iface_type) {
                self.provisioning.cancel_recheck(iface_type);
            }
            if self.interfaces.values().all(|i| {
                i.sm == crate::iface::IfaceSm::Available
            }) {
                self.monitor.stop();
            }
        }
    }

    fn handle_start_tethering(
        &mut self,
        iface_type: InterfaceType,
        show_ui: bool,
        result: &dyn ResultSink,
    ) {
        let noprovisioning_override = false;
        if Provisioning::is_required(&self.config, noprovisioning_override) {
            if crate::provisioning::Provisioning::start_tethering(
                &*self.provisioning_ui,
                iface_type,
                show_ui,
            )
            .is_err()
            {
                result.send(ErrorCode::ServiceUnavail);
                return;
            }
        }

        let enabled = match iface_type {
            InterfaceType::Usb => match usb_enable_action(&self.usb_state) {
                UsbEnableAction::TetherNow => {
                    self.handle_tether(USB_TETHER_IFACE);
                    Ok(())
                }
                UsbEnableAction::RequestRndis => {
                    self.usb.set_current_function(true)
                }
            },
            InterfaceType::Wifi => self.wifi.set_wifi_ap_enabled(true),
            InterfaceType::Bluetooth => {
                self.bluetooth.set_bluetooth_tethering(true)
            }
            InterfaceType::Invalid => Err(()),
        };

        match enabled {
            Ok(()) => result.send(ErrorCode::NoError),
            Err(()) => result.send(ErrorCode::ServiceUnavail),
        }
    }

    fn handle_stop_tethering(&mut self, iface_type: InterfaceType) {
        let disabled = match iface_type {
            InterfaceType::Usb => {
                let was_rndis_enabled = usb_disable_action(&self.usb_state);
                self.handle_untether(USB_TETHER_IFACE);
                if was_rndis_enabled {
                    self.usb.set_current_function(false)
                } else {
                    Ok(())
                }
            }
            InterfaceType::Wifi => self.wifi.set_wifi_ap_enabled(false),
            InterfaceType::Bluetooth => {
                self.bluetooth.set_bluetooth_tethering(false)
            }
            InterfaceType::Invalid => Ok(()),
        };
        if let Err(()) = disabled {
            tracing::warn!(?iface_type, "failed to stop tethering subsystem");
        }
    }

    fn handle_broadcast(&mut self, event: BroadcastEvent) {
        match event {
            BroadcastEvent::Usb(state) => {
                let fulfilled_tether = {
                    let mut flags = self.usb_state.0.lock().unwrap();
                    flags.rndis_enabled = state.rndis_enabled;
                    if state.connected && state.rndis_enabled && flags.pending
                    {
                        flags.pending = false;
                        true
                    } else {
                        false
                    }
                };
                if !state.connected || !state.rndis_enabled {
                    self.interface_down(USB_TETHER_IFACE);
                } else if fulfilled_tether {
                    self.handle_tether(USB_TETHER_IFACE);
                }
            }
            BroadcastEvent::WifiAp(state) => match state {
                crate::events::WifiApState::Enabled => {
                    // Enabling the AP does not imply it will ever reach
                    // Enabled: only this transition marks the Wi-Fi
                    // interface actually connected.
                    if let Some(iface) = self
                        .interfaces
                        .values_mut()
                        .find(|i| i.iface_type == InterfaceType::Wifi)
                    {
                        fsm(
                            iface,
                            &self.registry,
                            IfaceCmd::TetherConnectionChanged(true),
                        );
                        self.provisioning
                            .schedule_recheck(self.tx.clone(), InterfaceType::Wifi);
                    }
                }
                crate::events::WifiApState::Disabled
                | crate::events::WifiApState::Failed => {
                    self.interface_down_of_type(InterfaceType::Wifi);
                }
                _ => {}
            },
            BroadcastEvent::ConfigChanged => {
                let raw = crate::config::RawConfig::load(None);
                self.config
                    .replace(crate::config::TetheringConfig::build(&raw));
            }
            BroadcastEvent::Sim(crate::events::SimState::Loaded) => {
                if !self.sim_loaded {
                    self.sim_loaded = true;
                    let tethered: Vec<_> = self
                        .interfaces
                        .values()
                        .filter(|i| i.sm == crate::iface::IfaceSm::Tethered)
                        .map(|i| i.iface_type)
                        .collect();
                    crate::provisioning::handle_sim_loaded(
                        &*self.provisioning_ui,
                        &tethered,
                    );
                }
            }
            BroadcastEvent::Sim(_) => self.sim_loaded = false,
            BroadcastEvent::Connectivity(_) => {
                // Coarse connectivity changes don't carry enough
                // information to reselect upstream on their own; the
                // monitor's typed `NetworkState` callbacks do that.
            }
        }
    }

    fn interface_down(&mut self, ifname: &str) {
        if let Some(mut iface) = self.interfaces.remove(ifname) {
            let was_active = iface.sm != crate::iface::IfaceSm::Available;
            fsm(&mut iface, &self.registry, IfaceCmd::InterfaceDown);
            self.registry.remove(ifname);
            Debug::IfaceRemove(ifname).log();
            if was_active {
                let _ = master::tether_mode_unrequested(
                    &mut self.master,
                    ifname,
                    &*self.nms,
                );
                self.provisioning.cancel_recheck(iface.iface_type);
            }
        }
    }

    fn interface_down_of_type(&mut self, iface_type: InterfaceType) {
        let names: Vec<String> = self
            .interfaces
            .values()
            .filter(|i| i.iface_type == iface_type)
            .map(|i| i.name.clone())
            .collect();
        for name in names {
            self.interface_down(&name);
        }
    }

    fn any_tethered_of_type(&self, iface_type: InterfaceType) -> bool {
        self.interfaces.values().any(|i| {
            i.iface_type == iface_type
                && i.sm == crate::iface::IfaceSm::Tethered
        })
    }

    /// Re-runs upstream selection; if nothing qualified and cellular
    /// hasn't been tried yet, subscribes to it and arms the retry timer
    /// that fires `CMD_RETRY_UPSTREAM` after `UPSTREAM_SETTLE_TIME`.
    fn reselect_upstream(&mut self) {
        if !self.master.is_tether_mode_alive() {
            return;
        }
        let config = self.config.load();
        let wants_cell = master::select_upstream(&mut self.master, &config);
        if wants_cell {
            self.monitor.start_mobile(config.is_dun_required);
            self.retry_timer =
                Some(schedule_retry_upstream(self.tx.clone()));
        }
        let dns = if self.master.current_upstream.dns.is_empty() {
            config.default_ipv4_dns.clone()
        } else {
            self.master.current_upstream.dns.clone()
        };
        if self.nms.set_dns_forwarders(None, &dns).is_err() {
            tracing::warn!("failed to set DNS forwarders");
        }
    }

    fn publish_status(&self) {
        self.status_sink.publish(TetherStatus {
            available: self.registry.tetherable_ifaces(),
            active: self.registry.tethered_ifaces(),
            errored: self.registry.errored_ifaces(),
        });
    }
}
