//
// SPDX-License-Identifier: MIT
//

//! Upstream network monitor: watches for a default network and, when
//! requested, a mobile DUN/HIPRI network, forwarding every observation to
//! the master as an `EVENT_UPSTREAM_CALLBACK`. Subscriptions are
//! idempotent to start and mandatory to cancel on stop, mirroring the
//! broadcast adapter's unsubscribe guarantee.

use tether_utils::UnboundedSender;

use crate::model::NetworkState;
use crate::tasks::OrchestratorMsg;

/// Abstraction over the platform's connectivity-callback registration API,
/// corresponding to Android's `ConnectivityManager.registerNetworkCallback`.
/// A fake implementation drives scenario tests by calling `deliver` directly.
pub trait ConnectivitySource: Send {
    /// Subscribes to the default network. Idempotent: calling twice without
    /// an intervening `unsubscribe_default` is a no-op.
    fn subscribe_default(&mut self);
    fn unsubscribe_default(&mut self);

    /// Subscribes to a mobile upstream network, DUN if `dun` else HIPRI.
    /// Idempotent per `dun` value.
    fn subscribe_mobile(&mut self, dun: bool);
    fn unsubscribe_mobile(&mut self);
}

/// Drives a `ConnectivitySource` and republishes every observation onto the
/// event loop's channel as `OrchestratorMsg::UpstreamCallback`. Holds the
/// source as a trait object, like every other external collaborator in
/// `nms.rs`, so the orchestrator doesn't need to be generic over it.
pub struct Monitor {
    source: Box<dyn ConnectivitySource>,
    default_active: bool,
    mobile_active: bool,
    tx: UnboundedSender<OrchestratorMsg>,
}

impl Monitor {
    pub fn new(
        source: Box<dyn ConnectivitySource>,
        tx: UnboundedSender<OrchestratorMsg>,
    ) -> Monitor {
        Monitor {
            source,
            default_active: false,
            mobile_active: false,
            tx,
        }
    }

    /// Starts watching the default network. Called once tethering becomes
    /// active; a no-op if already watching.
    pub fn start_default(&mut self) {
        if !self.default_active {
            self.source.subscribe_default();
            self.default_active = true;
        }
    }

    /// Requests a mobile upstream, used by `CMD_RETRY_UPSTREAM` when no
    /// wired/Wi-Fi candidate qualified (`mTryCell`).
    pub fn start_mobile(&mut self, dun: bool) {
        if !self.mobile_active {
            self.source.subscribe_mobile(dun);
            self.mobile_active = true;
        }
    }

    /// Tears down every outstanding subscription. Must cancel the mobile
    /// request even if it never produced a callback.
    pub fn stop(&mut self) {
        if self.default_active {
            self.source.unsubscribe_default();
            self.default_active = false;
        }
        if self.mobile_active {
            self.source.unsubscribe_mobile();
            self.mobile_active = false;
        }
    }

    /// Forwards an observation from the connectivity source into the event
    /// loop. Exposed so a fake `ConnectivitySource` can call it directly in
    /// tests without routing through a real callback registration.
    pub fn deliver(&self, state: NetworkState) {
        let _ = self.tx.send(OrchestratorMsg::UpstreamCallback(state));
    }
}

/// In-memory `ConnectivitySource`: records subscription calls and lets a
/// caller drive `Monitor::deliver` manually. Not feature-gated, matching
/// `nms::fake` — a fake collaborator is as legitimate a default wiring as
/// a real one until a platform binding exists.
pub mod fake {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default, Clone)]
    pub struct FakeConnectivitySource(Arc<Mutex<FakeState>>);

    #[derive(Debug, Default)]
    struct FakeState {
        default_subscribed: bool,
        mobile_subscribed: Option<bool>,
    }

    impl FakeConnectivitySource {
        pub fn new() -> FakeConnectivitySource {
            FakeConnectivitySource::default()
        }

        pub fn default_subscribed(&self) -> bool {
            self.0.lock().unwrap().default_subscribed
        }

        pub fn mobile_subscribed(&self) -> Option<bool> {
            self.0.lock().unwrap().mobile_subscribed
        }
    }

    impl ConnectivitySource for FakeConnectivitySource {
        fn subscribe_default(&mut self) {
            self.0.lock().unwrap().default_subscribed = true;
        }

        fn unsubscribe_default(&mut self) {
            self.0.lock().unwrap().default_subscribed = false;
        }

        fn subscribe_mobile(&mut self, dun: bool) {
            self.0.lock().unwrap().mobile_subscribed = Some(dun);
        }

        fn unsubscribe_mobile(&mut self) {
            self.0.lock().unwrap().mobile_subscribed = None;
        }
    }
}
