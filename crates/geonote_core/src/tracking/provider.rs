//! Location provider contract and host-driven implementation.

use crate::model::reminder::PositionSample;
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Default time cadence between samples.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 60_000;
/// Default displacement that forces a sample before the interval elapses.
pub const DEFAULT_MIN_DISPLACEMENT_METERS: f64 = 100.0;

/// Outcome of a background-location permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Sampling cadence requested from the provider; whichever bound hits first wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPolicy {
    pub interval_ms: u64,
    pub min_displacement_meters: f64,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            min_displacement_meters: DEFAULT_MIN_DISPLACEMENT_METERS,
        }
    }
}

/// Opaque id of one registered sampling subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionHandle(pub u64);

impl Display for SubscriptionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Callback receiving samples for one subscription.
pub type SampleSink = Arc<dyn Fn(PositionSample) + Send + Sync>;

/// Provider-side failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Platform refused to register background sampling.
    Rejected(String),
    UnknownSubscription(SubscriptionHandle),
    Unavailable(String),
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(message) => write!(f, "location sampling rejected: {message}"),
            Self::UnknownSubscription(handle) => write!(f, "unknown subscription: {handle}"),
            Self::Unavailable(message) => write!(f, "location provider unavailable: {message}"),
        }
    }
}

impl Error for ProviderError {}

/// Platform location service.
pub trait LocationProvider: Send + Sync {
    fn request_background_permission(&self) -> PermissionStatus;

    fn subscribe(
        &self,
        policy: &SamplingPolicy,
        sink: SampleSink,
    ) -> Result<SubscriptionHandle, ProviderError>;

    fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ProviderError>;

    /// One-shot fix; `Ok(None)` when no position is known.
    fn current_position(&self) -> Result<Option<PositionSample>, ProviderError>;
}

#[derive(Default)]
struct ManualState {
    permission: Option<PermissionStatus>,
    reject_subscribe: Option<String>,
    next_handle: u64,
    subscriptions: BTreeMap<SubscriptionHandle, (SamplingPolicy, SampleSink)>,
    last_sample: Option<PositionSample>,
    permission_requests: u32,
}

/// Provider driven by the host: the host decides permission and pushes samples.
#[derive(Default)]
pub struct ManualLocationProvider {
    state: Mutex<ManualState>,
}

impl ManualLocationProvider {
    pub fn new(permission: PermissionStatus) -> Self {
        let provider = Self::default();
        provider.set_permission(permission);
        provider
    }

    pub fn set_permission(&self, permission: PermissionStatus) {
        if let Ok(mut state) = self.state.lock() {
            state.permission = Some(permission);
        }
    }

    /// Makes subsequent `subscribe` calls fail with `reason` (`None` clears).
    pub fn set_subscribe_rejection(&self, reason: Option<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.reject_subscribe = reason;
        }
    }

    /// Pushes one sample to every live subscription; returns how many received it.
    pub fn deliver(&self, sample: PositionSample) -> usize {
        let sinks = match self.state.lock() {
            Ok(mut state) => {
                state.last_sample = Some(sample);
                state
                    .subscriptions
                    .values()
                    .map(|(_, sink)| Arc::clone(sink))
                    .collect::<Vec<_>>()
            }
            Err(_) => return 0,
        };

        for sink in &sinks {
            sink(sample);
        }
        sinks.len()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.subscriptions.len())
            .unwrap_or(0)
    }

    /// Policy of the most recent live subscription.
    pub fn active_policy(&self) -> Option<SamplingPolicy> {
        let state = self.state.lock().ok()?;
        state
            .subscriptions
            .values()
            .next_back()
            .map(|(policy, _)| *policy)
    }

    pub fn permission_requests(&self) -> u32 {
        self.state
            .lock()
            .map(|state| state.permission_requests)
            .unwrap_or(0)
    }
}

impl LocationProvider for ManualLocationProvider {
    fn request_background_permission(&self) -> PermissionStatus {
        match self.state.lock() {
            Ok(mut state) => {
                state.permission_requests += 1;
                state.permission.unwrap_or(PermissionStatus::Denied)
            }
            Err(_) => PermissionStatus::Denied,
        }
    }

    fn subscribe(
        &self,
        policy: &SamplingPolicy,
        sink: SampleSink,
    ) -> Result<SubscriptionHandle, ProviderError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ProviderError::Unavailable("provider state poisoned".to_string()))?;
        if let Some(reason) = &state.reject_subscribe {
            return Err(ProviderError::Rejected(reason.clone()));
        }

        state.next_handle += 1;
        let handle = SubscriptionHandle(state.next_handle);
        state.subscriptions.insert(handle, (*policy, sink));
        debug!(
            "event=provider_subscribe module=tracking status=ok handle={} interval_ms={} min_displacement_m={}",
            handle, policy.interval_ms, policy.min_displacement_meters
        );
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ProviderError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ProviderError::Unavailable("provider state poisoned".to_string()))?;
        state
            .subscriptions
            .remove(&handle)
            .map(|_| ())
            .ok_or(ProviderError::UnknownSubscription(handle))
    }

    fn current_position(&self) -> Result<Option<PositionSample>, ProviderError> {
        let state = self
            .state
            .lock()
            .map_err(|_| ProviderError::Unavailable("provider state poisoned".to_string()))?;
        Ok(state.last_sample)
    }
}

#[cfg(test)]
mod tests {
    use super::{LocationProvider, ManualLocationProvider, PermissionStatus, SamplingPolicy};
    use crate::model::reminder::PositionSample;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn deliver_reaches_only_live_subscriptions() {
        let provider = ManualLocationProvider::new(PermissionStatus::Granted);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = provider
            .subscribe(
                &SamplingPolicy::default(),
                Arc::new(move |_sample: PositionSample| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(provider.deliver(PositionSample::new(1.0, 1.0, 1)), 1);
        provider.unsubscribe(handle).unwrap();
        assert_eq!(provider.deliver(PositionSample::new(1.0, 1.0, 2)), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(provider.unsubscribe(handle).is_err());
    }

    #[test]
    fn unset_permission_is_denied() {
        let provider = ManualLocationProvider::default();
        assert_eq!(
            provider.request_background_permission(),
            PermissionStatus::Denied
        );
        assert_eq!(provider.permission_requests(), 1);
    }
}
