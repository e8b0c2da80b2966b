//
// SPDX-License-Identifier: MIT
//

//! Immutable config snapshot, rebuilt wholesale on every config-change
//! event.

use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::model::{InterfaceType, UpstreamType};

/// On-disk configuration, deserialized from TOML. Mirrors the shape a real
/// deployment would load at startup and whenever the platform emits a
/// config-change broadcast.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub tetherable_usb_regexs: Vec<String>,
    pub tetherable_wifi_regexs: Vec<String>,
    pub tetherable_bluetooth_regexs: Vec<String>,
    pub preferred_upstream_iface_types: Vec<String>,
    pub dhcp_ranges: Vec<String>,
    pub is_dun_required: bool,
    pub default_ipv4_dns: Vec<String>,
    pub provisioning_app: Vec<String>,
    pub entitlement_check_required: bool,
    pub logging_file: RawLoggingFile,
}

impl Default for RawConfig {
    fn default() -> Self {
        RawConfig {
            tetherable_usb_regexs: vec!["^rndis\\d+$".to_string()],
            tetherable_wifi_regexs: vec!["^wlan\\d+$".to_string()],
            tetherable_bluetooth_regexs: vec!["^bt-pan\\d*$".to_string()],
            preferred_upstream_iface_types: vec![
                "ethernet".to_string(),
                "mobile_hipri".to_string(),
            ],
            dhcp_ranges: Vec::new(),
            is_dun_required: false,
            default_ipv4_dns: vec!["8.8.8.8".to_string(), "8.8.4.4".to_string()],
            provisioning_app: Vec::new(),
            entitlement_check_required: false,
            logging_file: RawLoggingFile::default(),
        }
    }
}

/// Rolling-file logging sink, disabled by default. Mirrors
/// `holo-daemon/src/config.rs`'s `LoggingFile`, pared down to the one
/// rotation scheme a tethering daemon needs (no journald, no per-layer
/// format knobs).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RawLoggingFile {
    pub enabled: bool,
    pub dir: String,
    pub name: String,
    pub rotation: LoggingFileRotation,
}

impl Default for RawLoggingFile {
    fn default() -> Self {
        RawLoggingFile {
            enabled: false,
            dir: "/var/log/tetherd".to_string(),
            name: "tetherd.log".to_string(),
            rotation: LoggingFileRotation::Daily,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LoggingFileRotation {
    Never,
    #[default]
    Daily,
    Hourly,
}

impl RawConfig {
    /// Loads the configuration from `path`, falling back to built-in
    /// defaults (with a warning) when the file is absent or malformed.
    pub fn load(path: Option<&str>) -> RawConfig {
        let path = path.unwrap_or("/etc/tetherd/tetherd.toml");
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(error) => {
                    warn!(%path, %error, "failed to parse configuration file, using defaults");
                    RawConfig::default()
                }
            },
            Err(_) => {
                warn!(%path, "configuration file not found, using defaults");
                RawConfig::default()
            }
        }
    }
}

/// Immutable, atomically-replaceable view of the tethering configuration.
/// Replaced atomically on config-change and only ever read; readers hold
/// the reference.
#[derive(Debug)]
pub struct TetheringConfig {
    tetherable_usb_regexs: Vec<Regex>,
    tetherable_wifi_regexs: Vec<Regex>,
    tetherable_bluetooth_regexs: Vec<Regex>,
    pub preferred_upstream_iface_types: Vec<UpstreamType>,
    pub dhcp_ranges: Vec<String>,
    pub is_dun_required: bool,
    pub default_ipv4_dns: Vec<IpAddr>,
    pub provisioning_app: Vec<String>,
    pub entitlement_check_required: bool,
    pub log_file: Option<LogFileConfig>,
}

/// Built form of [`RawLoggingFile`], present only when file logging is
/// enabled.
#[derive(Clone, Debug)]
pub struct LogFileConfig {
    pub dir: String,
    pub name: String,
    pub rotation: LoggingFileRotation,
}

impl TetheringConfig {
    pub fn build(raw: &RawConfig) -> TetheringConfig {
        TetheringConfig {
            tetherable_usb_regexs: compile_regexs(&raw.tetherable_usb_regexs),
            tetherable_wifi_regexs: compile_regexs(&raw.tetherable_wifi_regexs),
            tetherable_bluetooth_regexs: compile_regexs(
                &raw.tetherable_bluetooth_regexs,
            ),
            preferred_upstream_iface_types: raw
                .preferred_upstream_iface_types
                .iter()
                .filter_map(|s| parse_upstream_type(s))
                .collect(),
            dhcp_ranges: raw.dhcp_ranges.clone(),
            is_dun_required: raw.is_dun_required,
            default_ipv4_dns: raw
                .default_ipv4_dns
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect(),
            provisioning_app: raw.provisioning_app.clone(),
            entitlement_check_required: raw.entitlement_check_required,
            log_file: raw.logging_file.enabled.then(|| LogFileConfig {
                dir: raw.logging_file.dir.clone(),
                name: raw.logging_file.name.clone(),
                rotation: raw.logging_file.rotation,
            }),
        }
    }

    /// Classifies `ifname` against the per-type regex lists in the order
    /// WIFI, USB, BLUETOOTH; the first match wins.
    pub fn classify(&self, ifname: &str) -> InterfaceType {
        if self.tetherable_wifi_regexs.iter().any(|r| r.is_match(ifname)) {
            InterfaceType::Wifi
        } else if self.tetherable_usb_regexs.iter().any(|r| r.is_match(ifname))
        {
            InterfaceType::Usb
        } else if self
            .tetherable_bluetooth_regexs
            .iter()
            .any(|r| r.is_match(ifname))
        {
            InterfaceType::Bluetooth
        } else {
            InterfaceType::Invalid
        }
    }

    /// True iff a provisioning app is named (exactly two entries: package +
    /// class) and the carrier config's entitlement-checks flag is set.
    pub fn provisioning_required(&self, noprovisioning_override: bool) -> bool {
        self.provisioning_app.len() == 2
            && self.entitlement_check_required
            && !noprovisioning_override
    }
}

fn compile_regexs(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(error) => {
                warn!(pattern = %p, %error, "invalid tetherable interface regex, ignoring");
                None
            }
        })
        .collect()
}

fn parse_upstream_type(s: &str) -> Option<UpstreamType> {
    match s {
        "ethernet" => Some(UpstreamType::Ethernet),
        "wifi" => Some(UpstreamType::Wifi),
        "mobile_dun" => Some(UpstreamType::MobileDun),
        "mobile_hipri" => Some(UpstreamType::MobileHipri),
        _ => {
            warn!(value = %s, "unknown preferred upstream type, ignoring");
            None
        }
    }
}

/// Shared, swappable handle to the current configuration snapshot.
#[derive(Clone)]
pub struct ConfigHandle(Arc<ArcSwap<TetheringConfig>>);

impl ConfigHandle {
    pub fn new(initial: TetheringConfig) -> ConfigHandle {
        ConfigHandle(Arc::new(ArcSwap::from_pointee(initial)))
    }

    /// Rebuilds and atomically publishes a new snapshot in response to a
    /// configuration-change notification.
    pub fn replace(&self, new: TetheringConfig) {
        self.0.store(Arc::new(new));
    }

    /// Returns the snapshot current at the time of the call. The caller
    /// holds this `Arc` for as long as it needs a consistent view; it will
    /// never change out from under them.
    pub fn load(&self) -> Arc<TetheringConfig> {
        self.0.load_full()
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle").finish()
    }
}
