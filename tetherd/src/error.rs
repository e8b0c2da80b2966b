//
// SPDX-License-Identifier: MIT
//

use tracing::warn;

use crate::model::ErrorCode;

/// Errors surfaced by the control plane. Every variant maps onto exactly
/// one `ErrorCode`, which is what callers and `TetherEntry.lastError`
/// actually see; this type exists to carry the extra context needed for
/// logging.
#[derive(Debug)]
pub enum Error {
    // Caller errors: returned synchronously from the facade, no state change.
    UnknownIface(String),
    UnavailIface(String),
    ServiceUnavail,
    // Subsystem errors: USB/Wi-Fi/Bluetooth enable failure.
    SubsystemError(&'static str),
    // NMS errors: propagate into the master's dedicated error states.
    IpForwardingEnableError,
    IpForwardingDisableError,
    StartTetheringError,
    StopTetheringError,
    SetDnsForwardersError,
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::UnknownIface(_) => ErrorCode::UnknownIface,
            Error::UnavailIface(_) => ErrorCode::UnavailIface,
            Error::ServiceUnavail | Error::SubsystemError(_) => {
                ErrorCode::ServiceUnavail
            }
            Error::IpForwardingEnableError => {
                ErrorCode::IpForwardingEnableError
            }
            Error::IpForwardingDisableError => {
                ErrorCode::IpForwardingDisableError
            }
            Error::StartTetheringError => ErrorCode::StartTetheringError,
            Error::StopTetheringError => ErrorCode::StopTetheringError,
            Error::SetDnsForwardersError => ErrorCode::SetDnsForwardersError,
        }
    }

    pub fn log(&self) {
        match self {
            Error::UnknownIface(ifname) => warn!(%ifname, "{}", self),
            Error::UnavailIface(ifname) => warn!(%ifname, "{}", self),
            Error::SubsystemError(detail) => warn!(%detail, "{}", self),
            _ => warn!("{}", self),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnknownIface(..) => write!(f, "unknown interface"),
            Error::UnavailIface(..) => {
                write!(f, "interface is not in the available state")
            }
            Error::ServiceUnavail => {
                write!(f, "tethering service unavailable")
            }
            Error::SubsystemError(..) => write!(f, "subsystem call failed"),
            Error::IpForwardingEnableError => {
                write!(f, "failed to enable IP forwarding")
            }
            Error::IpForwardingDisableError => {
                write!(f, "failed to disable IP forwarding")
            }
            Error::StartTetheringError => {
                write!(f, "failed to start tethering")
            }
            Error::StopTetheringError => write!(f, "failed to stop tethering"),
            Error::SetDnsForwardersError => {
                write!(f, "failed to set DNS forwarders")
            }
        }
    }
}

impl std::error::Error for Error {}
