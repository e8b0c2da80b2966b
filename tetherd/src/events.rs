//
// SPDX-License-Identifier: MIT
//

//! Event bus / broadcast adapter: normalizes OS broadcasts into the typed
//! `BroadcastEvent` the rest of the core consumes. A single component
//! owns its subscription tokens with an explicit start/stop, and
//! unsubscription is guaranteed on shutdown.

use tether_utils::Receiver;

/// USB connectivity/RNDIS state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UsbState {
    pub connected: bool,
    pub rndis_enabled: bool,
}

/// Coarse connectivity state for a `NetworkInfo` broadcast. `Failed` is
/// filtered out by the adapter before it ever reaches the master.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectivityState {
    Connecting,
    Connected,
    Disconnected,
    Suspended,
}

/// Wi-Fi soft-AP state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WifiApState {
    Enabling,
    Enabled,
    Disabling,
    Disabled,
    Failed,
}

/// SIM card state; only the `Loaded` transition matters to the core, but
/// the raw string-like states are preserved so the provisioning gate can
/// observe the NotReady -> Loaded edge.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SimState {
    NotReady,
    Loaded,
    Absent,
    Unknown,
}

/// Typed, normalized broadcast event.
#[derive(Clone, Debug)]
pub enum BroadcastEvent {
    Usb(UsbState),
    Connectivity(ConnectivityState),
    WifiAp(WifiApState),
    ConfigChanged,
    Sim(SimState),
}

/// Owns the platform broadcast-receiver subscription(s) and forwards
/// normalized events into a single channel consumed by the event loop.
/// `stop` guarantees unsubscription.
pub trait BroadcastAdapter: Send {
    fn start(&mut self);
    fn stop(&mut self);
}

/// A `BroadcastAdapter` backed by a plain channel — the production
/// implementation wires the sending half into the platform's actual
/// broadcast receivers; tests push synthetic events directly.
pub struct ChannelBroadcastAdapter {
    rx: Option<Receiver<BroadcastEvent>>,
}

impl ChannelBroadcastAdapter {
    pub fn new(rx: Receiver<BroadcastEvent>) -> ChannelBroadcastAdapter {
        ChannelBroadcastAdapter { rx: Some(rx) }
    }

    /// Takes ownership of the receiver so it can be folded into the event
    /// loop's `tokio::select!`. Returns `None` once already started.
    pub fn take_rx(&mut self) -> Option<Receiver<BroadcastEvent>> {
        self.rx.take()
    }
}

impl BroadcastAdapter for ChannelBroadcastAdapter {
    fn start(&mut self) {
        // Subscription happens implicitly: the sending half is already
        // wired up by whoever constructed this adapter. Kept as an
        // explicit no-op method so callers don't need to special-case
        // construction vs. activation.
    }

    fn stop(&mut self) {
        self.rx = None;
    }
}
