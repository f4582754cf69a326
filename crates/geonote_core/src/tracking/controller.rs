//! Tracking controller state machine.
//!
//! # Responsibility
//! - Acquire background-location permission and register periodic sampling.
//! - Forward samples to the sample handler while active.
//! - Deregister sampling on stop.
//!
//! # Invariants
//! - `start`/`stop` are idempotent and serialized against each other.
//! - Permission denial or subscribe failure leaves the controller `Stopped`.
//! - Sample dispatch is serialized; once `stop()` returns no further sample
//!   reaches the handler.
//! - Handlers must not call back into the controller.

use super::provider::{LocationProvider, SampleSink, SamplingPolicy, SubscriptionHandle};
use crate::model::reminder::PositionSample;
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle of the sampling subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Stopped,
    RequestingPermission,
    Active,
}

impl TrackingState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::RequestingPermission => "requesting_permission",
            Self::Active => "active",
        }
    }
}

/// Consumer of position samples delivered while tracking is active.
pub trait SampleHandler: Send + Sync {
    fn handle_sample(&self, sample: PositionSample);
}

/// Serializing gate between the provider callback and the handler.
struct SampleGate {
    open: Mutex<bool>,
    handler: Arc<dyn SampleHandler>,
}

impl SampleGate {
    fn new(handler: Arc<dyn SampleHandler>) -> Self {
        Self {
            open: Mutex::new(true),
            handler,
        }
    }

    fn dispatch(&self, sample: PositionSample) {
        let Ok(open) = self.open.lock() else {
            warn!("event=sample_dropped module=tracking reason=gate_poisoned");
            return;
        };
        if !*open {
            debug!(
                "event=sample_dropped module=tracking reason=stopped timestamp_ms={}",
                sample.timestamp_ms
            );
            return;
        }
        // Guard stays held so `close` waits for the in-flight evaluation.
        self.handler.handle_sample(sample);
    }

    fn close(&self) {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        *open = false;
    }
}

struct ActiveSubscription {
    handle: SubscriptionHandle,
    gate: Arc<SampleGate>,
}

struct ControllerState {
    state: TrackingState,
    subscription: Option<ActiveSubscription>,
}

/// Owns the background sampling subscription.
pub struct TrackingController {
    provider: Arc<dyn LocationProvider>,
    handler: Arc<dyn SampleHandler>,
    policy: SamplingPolicy,
    lifecycle: Mutex<()>,
    inner: Mutex<ControllerState>,
}

impl TrackingController {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        handler: Arc<dyn SampleHandler>,
        policy: SamplingPolicy,
    ) -> Self {
        Self {
            provider,
            handler,
            policy,
            lifecycle: Mutex::new(()),
            inner: Mutex::new(ControllerState {
                state: TrackingState::Stopped,
                subscription: None,
            }),
        }
    }

    pub fn state(&self) -> TrackingState {
        self.inner().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == TrackingState::Active
    }

    pub fn policy(&self) -> SamplingPolicy {
        self.policy
    }

    /// Starts background sampling.
    ///
    /// Returns `false` when permission is denied or the provider rejects the
    /// subscription; the controller then stays `Stopped`.
    pub fn start(&self) -> bool {
        let _lifecycle = self.lifecycle();
        if self.inner().state == TrackingState::Active {
            debug!("event=tracking_start module=tracking status=noop reason=already_active");
            return true;
        }

        self.inner().state = TrackingState::RequestingPermission;
        let permission = self.provider.request_background_permission();
        if !permission.is_granted() {
            self.inner().state = TrackingState::Stopped;
            warn!("event=tracking_start module=tracking status=denied reason=permission_denied");
            return false;
        }

        let gate = Arc::new(SampleGate::new(Arc::clone(&self.handler)));
        let sink_gate = Arc::clone(&gate);
        let sink: SampleSink =
            Arc::new(move |sample: PositionSample| sink_gate.dispatch(sample));

        match self.provider.subscribe(&self.policy, sink) {
            Ok(handle) => {
                let mut inner = self.inner();
                inner.subscription = Some(ActiveSubscription { handle, gate });
                inner.state = TrackingState::Active;
                info!(
                    "event=tracking_start module=tracking status=ok handle={} interval_ms={} min_displacement_m={}",
                    handle, self.policy.interval_ms, self.policy.min_displacement_meters
                );
                true
            }
            Err(err) => {
                gate.close();
                self.inner().state = TrackingState::Stopped;
                error!(
                    "event=tracking_start module=tracking status=error error_code=subscribe_failed error={}",
                    err
                );
                false
            }
        }
    }

    /// Stops background sampling.
    ///
    /// Returns `false` only when the provider fails to deregister; the
    /// controller is `Stopped` and drops samples either way.
    pub fn stop(&self) -> bool {
        let _lifecycle = self.lifecycle();
        let subscription = {
            let mut inner = self.inner();
            inner.state = TrackingState::Stopped;
            inner.subscription.take()
        };

        let Some(subscription) = subscription else {
            debug!("event=tracking_stop module=tracking status=noop reason=already_stopped");
            return true;
        };

        subscription.gate.close();
        match self.provider.unsubscribe(subscription.handle) {
            Ok(()) => {
                info!(
                    "event=tracking_stop module=tracking status=ok handle={}",
                    subscription.handle
                );
                true
            }
            Err(err) => {
                error!(
                    "event=tracking_stop module=tracking status=error handle={} error_code=unsubscribe_failed error={}",
                    subscription.handle, err
                );
                false
            }
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn inner(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TrackingController {
    fn drop(&mut self) {
        let subscription = self
            .inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .subscription
            .take();
        if let Some(subscription) = subscription {
            subscription.gate.close();
            let _ = self.provider.unsubscribe(subscription.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SampleHandler, TrackingController, TrackingState};
    use crate::model::reminder::PositionSample;
    use crate::tracking::provider::{
        LocationProvider, ManualLocationProvider, PermissionStatus, SamplingPolicy,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingHandler {
        hits: AtomicUsize,
    }

    impl SampleHandler for CountingHandler {
        fn handle_sample(&self, _sample: PositionSample) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn dropping_controller_releases_subscription() {
        let provider = Arc::new(ManualLocationProvider::new(PermissionStatus::Granted));
        let handler = Arc::new(CountingHandler::default());
        {
            let controller = TrackingController::new(
                Arc::clone(&provider) as Arc<dyn LocationProvider>,
                handler.clone(),
                SamplingPolicy::default(),
            );
            assert!(controller.start());
            assert_eq!(controller.state(), TrackingState::Active);
            assert_eq!(provider.active_subscriptions(), 1);
        }
        assert_eq!(provider.active_subscriptions(), 0);
        provider.deliver(PositionSample::new(0.0, 0.0, 1));
        assert_eq!(handler.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn state_labels_are_stable() {
        assert_eq!(TrackingState::Stopped.as_str(), "stopped");
        assert_eq!(
            TrackingState::RequestingPermission.as_str(),
            "requesting_permission"
        );
        assert_eq!(TrackingState::Active.as_str(), "active");
    }
}
