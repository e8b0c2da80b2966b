//
// SPDX-License-Identifier: MIT
//

//! Tether-state registry: a thread-safe map from interface name to its
//! tracked entry. Guarded by a single mutex held only for the duration of
//! a map mutation or read-snapshot; never held across an external call
//! or a message send.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::{ErrorCode, InterfaceState, InterfaceType};

/// Identifies a tracked interface's state machine without holding a pointer
/// to it: the event loop resolves this back into its own
/// `HashMap<String, Interface>` by name. The generation counter
/// distinguishes a removed-then-recreated interface sharing the same name,
/// so a stale handle captured before a name churn can never resolve to the
/// wrong machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct IfaceHandle {
    pub generation: u64,
}

/// Per-interface record held by the registry.
#[derive(Clone, Debug)]
pub struct TetherEntry {
    pub machine: IfaceHandle,
    pub iface_type: InterfaceType,
    pub last_state: InterfaceState,
    pub last_error: ErrorCode,
}

impl TetherEntry {
    pub fn new(machine: IfaceHandle, iface_type: InterfaceType) -> TetherEntry {
        TetherEntry {
            machine,
            iface_type,
            last_state: InterfaceState::Available,
            last_error: ErrorCode::NoError,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, TetherEntry>,
    next_generation: u64,
}

/// Thread-safe interface registry. Cloning shares the same underlying map.
#[derive(Debug, Default, Clone)]
pub struct Registry(std::sync::Arc<Mutex<Inner>>);

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// `interfaceAdded(iface)` with an existing entry is a no-op; otherwise
    /// creates a new `Available` entry and returns its handle. Matches I1:
    /// an interface name appears in the registry iff it has been reported
    /// added/up since the last `interfaceRemoved`.
    pub fn add(
        &self,
        ifname: &str,
        iface_type: InterfaceType,
    ) -> Option<IfaceHandle> {
        let mut inner = self.0.lock().unwrap();
        if inner.entries.contains_key(ifname) {
            return None;
        }
        inner.next_generation += 1;
        let handle = IfaceHandle {
            generation: inner.next_generation,
        };
        inner
            .entries
            .insert(ifname.to_string(), TetherEntry::new(handle, iface_type));
        Some(handle)
    }

    /// Removes the entry unconditionally. Used for `interfaceRemoved` (USB/
    /// Wi-Fi) and immediate Bluetooth down events.
    pub fn remove(&self, ifname: &str) -> Option<TetherEntry> {
        self.0.lock().unwrap().entries.remove(ifname)
    }

    pub fn get(&self, ifname: &str) -> Option<TetherEntry> {
        self.0.lock().unwrap().entries.get(ifname).cloned()
    }

    pub fn contains(&self, ifname: &str) -> bool {
        self.0.lock().unwrap().entries.contains_key(ifname)
    }

    /// Updates the last-known state of an existing entry. No-op if the
    /// interface is no longer tracked (it may have been removed from the
    /// registry while still finishing teardown on the MasterRequestList).
    pub fn set_state(&self, ifname: &str, state: InterfaceState) {
        let mut inner = self.0.lock().unwrap();
        if let Some(entry) = inner.entries.get_mut(ifname) {
            entry.last_state = state;
        }
    }

    /// Records a sticky error (I6): retained until explicitly cleared or the
    /// entry is removed.
    pub fn set_error(&self, ifname: &str, error: ErrorCode) {
        let mut inner = self.0.lock().unwrap();
        if let Some(entry) = inner.entries.get_mut(ifname) {
            entry.last_error = error;
        }
    }

    /// Clears the sticky error on every tracked entry (`CMD_CLEAR_ERROR`
    /// fan-out; there is no per-interface targeting).
    pub fn clear_all_errors(&self) {
        let mut inner = self.0.lock().unwrap();
        for entry in inner.entries.values_mut() {
            entry.last_error = ErrorCode::NoError;
        }
    }

    /// Returns an immutable snapshot of the registry for iteration without
    /// holding the lock.
    pub fn snapshot(&self) -> Vec<(String, TetherEntry)> {
        self.0
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn tethered_ifaces(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter(|(_, e)| e.last_state == InterfaceState::Tethered)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn tetherable_ifaces(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|(name, _)| name).collect()
    }

    pub fn errored_ifaces(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter(|(_, e)| e.last_error != ErrorCode::NoError)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn last_error(&self, ifname: &str) -> ErrorCode {
        self.get(ifname)
            .map(|e| e.last_error)
            .unwrap_or(ErrorCode::UnknownIface)
    }
}
