//! Config classification and provisioning-gate predicates.

use tetherd::config::{RawConfig, TetheringConfig};
use tetherd::model::InterfaceType;

#[test]
fn classify_prefers_wifi_then_usb_then_bluetooth() {
    let mut raw = RawConfig::default();
    raw.tetherable_usb_regexs = vec!["^iface\\d+$".to_string()];
    raw.tetherable_wifi_regexs = vec!["^iface\\d+$".to_string()];
    raw.tetherable_bluetooth_regexs = vec!["^iface\\d+$".to_string()];
    let config = TetheringConfig::build(&raw);

    assert_eq!(config.classify("iface0"), InterfaceType::Wifi);
    assert_eq!(config.classify("other"), InterfaceType::Invalid);
}

#[test]
fn provisioning_required_needs_both_app_and_flag() {
    let mut raw = RawConfig::default();
    raw.entitlement_check_required = true;
    raw.provisioning_app =
        vec!["com.example.prov".to_string(), "MainActivity".to_string()];
    let config = TetheringConfig::build(&raw);

    assert!(config.provisioning_required(false));
    assert!(!config.provisioning_required(true));
}
