//
// SPDX-License-Identifier: MIT
//

use std::sync::Arc;

use clap::{App, Arg};
use tether_utils::task::Task;
use tetherd::config::{ConfigHandle, LogFileConfig, LoggingFileRotation, RawConfig, TetheringConfig};
use tetherd::facade::{Collaborators, Orchestrator};
use tetherd::nms::fake::{
    FakeBluetoothPan, FakeNms, FakeProvisioningUi, FakeUsbManager,
    FakeWifiManager, RecordingStatusSink,
};
use tetherd::monitor::fake::FakeConnectivitySource;
use tetherd::registry::Registry;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

/// Builds the stdout layer plus, when `log_file` names an enabled sink, a
/// rolling file layer alongside it, in the style of
/// `holo-daemon/src/main.rs`'s `init_tracing`.
fn init_tracing(log_file: Option<&LogFileConfig>) {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("tetherd=info".parse().unwrap())
        .from_env_lossy();
    let stdout = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(true);
    let file = log_file.map(|log_file| {
        let appender = match log_file.rotation {
            LoggingFileRotation::Never => {
                rolling::never(&log_file.dir, &log_file.name)
            }
            LoggingFileRotation::Hourly => {
                rolling::hourly(&log_file.dir, &log_file.name)
            }
            LoggingFileRotation::Daily => {
                rolling::daily(&log_file.dir, &log_file.name)
            }
        };
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(appender)
    });
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file)
        .with(stdout)
        .init();
}

fn main() {
    let matches = App::new("tetherd")
        .version(clap::crate_version!())
        .about("Tethering orchestrator daemon")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .get_matches();

    let config_file = matches.value_of("config");
    let raw_config = RawConfig::load(config_file);
    let tethering_config = TetheringConfig::build(&raw_config);

    init_tracing(tethering_config.log_file.as_ref());

    let config = ConfigHandle::new(tethering_config);

    info!("starting up");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(run(config));
}

/// Wires up the orchestrator against its external collaborators and runs
/// until interrupted.
///
/// The trait boundaries in `nms.rs`/`monitor.rs` are where a real
/// deployment plugs in its platform bindings (netlink, D-Bus, or whatever
/// talks to the kernel's NAT/DHCP helpers and the USB/Wi-Fi/Bluetooth
/// subsystems); wiring those up is out of scope here, so this binary runs
/// against the in-memory fakes that the test suite also uses. This keeps
/// `main` honest about what the orchestrator core actually depends on.
async fn run(config: ConfigHandle) {
    let registry = Registry::new();

    let collaborators = Collaborators {
        nms: Arc::new(FakeNms::new()),
        usb: Arc::new(FakeUsbManager::new()),
        wifi: Arc::new(FakeWifiManager::new()),
        bluetooth: Arc::new(FakeBluetoothPan::new()),
        provisioning_ui: Arc::new(FakeProvisioningUi::new()),
        status_sink: Arc::new(RecordingStatusSink::new()),
        connectivity: Box::new(FakeConnectivitySource::new()),
    };

    let (_orchestrator, event_loop): (Orchestrator, Task<()>) =
        Orchestrator::spawn(config, registry, collaborators);

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(error) => {
            tracing::error!(%error, "failed to listen for shutdown signal")
        }
    }
    drop(event_loop);
}
