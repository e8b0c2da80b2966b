//! Carrier provisioning gate and recheck scheduling.

use tetherd::config::{ConfigHandle, RawConfig, TetheringConfig};
use tetherd::model::InterfaceType;
use tetherd::nms::fake::FakeProvisioningUi;
use tetherd::provisioning::{handle_sim_loaded, Provisioning};
use tetherd::tasks::OrchestratorMsg;

fn config_with(entitlement_required: bool, app: Vec<&str>) -> ConfigHandle {
    let mut raw = RawConfig::default();
    raw.entitlement_check_required = entitlement_required;
    raw.provisioning_app = app.into_iter().map(String::from).collect();
    ConfigHandle::new(TetheringConfig::build(&raw))
}

#[test]
fn is_required_needs_app_and_flag() {
    let config = config_with(true, vec!["com.example.prov", "Main"]);
    assert!(Provisioning::is_required(&config, false));
    assert!(!Provisioning::is_required(&config, true));

    let config = config_with(false, vec!["com.example.prov", "Main"]);
    assert!(!Provisioning::is_required(&config, false));
}

#[test]
fn sim_loaded_rechecks_every_tethered_type() {
    let ui = FakeProvisioningUi::new();
    handle_sim_loaded(&ui, &[InterfaceType::Usb, InterfaceType::Wifi]);
    assert_eq!(
        ui.rechecks(),
        vec![InterfaceType::Usb, InterfaceType::Wifi]
    );
}

#[test]
fn schedule_and_cancel_recheck() {
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel::<OrchestratorMsg>();
    let mut provisioning = Provisioning::new();
    provisioning.schedule_recheck(tx, InterfaceType::Usb);
    assert!(provisioning.is_scheduled(InterfaceType::Usb));
    provisioning.cancel_recheck(InterfaceType::Usb);
    assert!(!provisioning.is_scheduled(InterfaceType::Usb));
}
