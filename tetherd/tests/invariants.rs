//! Invariants I1-I6, checked directly against the lower modules
//! (`registry`, `master`, `iface`) rather than the full event loop, since
//! they're stated over those modules' own state.

use tetherd::iface::{fsm, IfaceCmd, Interface};
use tetherd::master::{
    self, enter_tether_mode_alive, tether_mode_requested,
    tether_mode_unrequested, Master, MasterState,
};
use tetherd::model::{ErrorCode, InterfaceState, InterfaceType};
use tetherd::nms::fake::FakeNms;
use tetherd::registry::Registry;

/// I1: an interface name appears in the registry iff it has been added and
/// not yet removed.
#[test]
fn i1_registry_membership_tracks_add_remove() {
    let registry = Registry::new();
    assert!(!registry.contains("rndis0"));

    registry.add("rndis0", InterfaceType::Usb);
    assert!(registry.contains("rndis0"));

    registry.remove("rndis0");
    assert!(!registry.contains("rndis0"));
}

/// At most one registry entry per name, regardless of repeated adds.
#[test]
fn at_most_one_entry_per_name() {
    let registry = Registry::new();
    for _ in 0..10 {
        registry.add("wlan0", InterfaceType::Wifi);
    }
    assert_eq!(registry.snapshot().len(), 1);
}

/// I3: the master is in TetherModeAlive iff the requester set is non-empty
/// and no error is active.
#[test]
fn i3_tether_mode_alive_tracks_requesters() {
    let nms = FakeNms::new();
    let mut master = Master::new();
    assert_eq!(master.state, MasterState::Initial);

    tether_mode_requested(&mut master, "rndis0", &nms, &[]).unwrap();
    assert!(master.is_tether_mode_alive());
    assert!(!master.requesters.is_empty());

    tether_mode_unrequested(&mut master, "rndis0", &nms).unwrap();
    assert_eq!(master.state, MasterState::Initial);
    assert!(master.requesters.is_empty());
}

/// I3 continued: an active error state means TetherModeAlive does not hold
/// even though requesters is non-empty.
#[test]
fn i3_error_state_is_not_tether_mode_alive() {
    let nms = FakeNms::new();
    nms.fail_ip_forwarding_enable(true);
    let mut master = Master::new();

    assert!(tether_mode_requested(&mut master, "rndis0", &nms, &[]).is_err());
    assert!(!master.requesters.is_empty());
    assert!(!master.is_tether_mode_alive());
    assert_eq!(
        master.state,
        MasterState::Error(ErrorCode::IpForwardingEnableError)
    );
}

/// I4: IP forwarding at the NMS is enabled iff the master holds
/// TetherModeAlive.
#[test]
fn i4_ip_forwarding_tracks_tether_mode_alive() {
    let nms = FakeNms::new();
    let mut master = Master::new();

    assert!(!nms.ip_forwarding_enabled());
    enter_tether_mode_alive(&mut master, &nms, &[]).unwrap();
    assert!(master.is_tether_mode_alive());
    assert!(nms.ip_forwarding_enabled());

    master::exit_tether_mode_alive(&mut master, &nms).unwrap();
    assert!(!nms.ip_forwarding_enabled());
}

/// I6: a sticky error on a TetherEntry survives until explicitly cleared,
/// and clearing wipes every entry (CMD_CLEAR_ERROR has no per-interface
/// targeting).
#[test]
fn i6_sticky_error_until_cleared() {
    let registry = Registry::new();
    registry.add("rndis0", InterfaceType::Usb);
    registry.set_error("rndis0", ErrorCode::IpForwardingEnableError);

    assert_eq!(
        registry.last_error("rndis0"),
        ErrorCode::IpForwardingEnableError
    );
    assert_eq!(
        registry.get("rndis0").unwrap().last_state,
        InterfaceState::Available
    );

    registry.clear_all_errors();
    assert_eq!(registry.last_error("rndis0"), ErrorCode::NoError);
}

/// I2: lastState == TETHERED implies the interface is on the
/// MasterRequestList — shown by construction: the only path to Tethered
/// goes through a TetherRequested that also adds the name to requesters,
/// and nothing removes it from requesters without also leaving Tethered.
#[test]
fn i2_tethered_implies_on_request_list() {
    let nms = FakeNms::new();
    let registry = Registry::new();
    let mut master = Master::new();

    let handle = registry.add("rndis0", InterfaceType::Usb).unwrap();
    let mut iface = Interface::new("rndis0".to_string(), handle, InterfaceType::Usb);

    let outcome = fsm(&mut iface, &registry, IfaceCmd::TetherRequested);
    assert!(outcome.recompute_master);
    tether_mode_requested(&mut master, &iface.name, &nms, &[]).unwrap();

    fsm(&mut iface, &registry, IfaceCmd::TetherConnectionChanged(true));
    assert_eq!(
        registry.get("rndis0").unwrap().last_state,
        InterfaceState::Tethered
    );
    assert!(master.requesters.contains("rndis0"));
}

/// MasterRequestList (`requesters`) suppresses duplicates by construction:
/// it's a `HashSet`, so a repeated request for the same name is a no-op.
#[test]
fn request_list_has_no_duplicates() {
    let nms = FakeNms::new();
    let mut master = Master::new();

    tether_mode_requested(&mut master, "rndis0", &nms, &[]).unwrap();
    tether_mode_requested(&mut master, "rndis0", &nms, &[]).unwrap();
    assert_eq!(master.requesters.len(), 1);
}
