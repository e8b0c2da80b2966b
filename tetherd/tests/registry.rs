//! Interface registry invariants.

use tetherd::model::{ErrorCode, InterfaceType};
use tetherd::registry::Registry;

#[test]
fn add_is_idempotent() {
    let reg = Registry::new();
    let h1 = reg.add("rndis0", InterfaceType::Usb);
    assert!(h1.is_some());
    let h2 = reg.add("rndis0", InterfaceType::Usb);
    assert!(h2.is_none());
    assert_eq!(reg.tetherable_ifaces(), vec!["rndis0".to_string()]);
}

#[test]
fn at_most_one_entry_per_name() {
    let reg = Registry::new();
    for _ in 0..5 {
        reg.add("wlan0", InterfaceType::Wifi);
    }
    assert_eq!(reg.snapshot().len(), 1);
}

#[test]
fn remove_then_readd_bumps_generation() {
    let reg = Registry::new();
    let h1 = reg.add("bt-pan0", InterfaceType::Bluetooth).unwrap();
    reg.remove("bt-pan0");
    let h2 = reg.add("bt-pan0", InterfaceType::Bluetooth).unwrap();
    assert_ne!(h1, h2);
}

#[test]
fn sticky_error_survives_until_cleared() {
    let reg = Registry::new();
    reg.add("rndis0", InterfaceType::Usb);
    reg.set_error("rndis0", ErrorCode::IpForwardingEnableError);
    assert_eq!(
        reg.last_error("rndis0"),
        ErrorCode::IpForwardingEnableError
    );
    reg.clear_all_errors();
    assert_eq!(reg.last_error("rndis0"), ErrorCode::NoError);
}
