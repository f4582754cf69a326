//! Location reminder use-case service.
//!
//! # Responsibility
//! - Expose the reminder create/list/delete and tracking entry points used by
//!   host app code.
//! - Wire store, evaluator and tracking controller together.
//!
//! # Invariants
//! - A successful save requests tracking; a denied permission does not undo
//!   the save.
//! - Deleting the last reminder stops tracking.
//! - Save, delete and explicit start/stop are serialized, so a save can never
//!   land between the delete cascade's emptiness check and its stop.
//! - The `triggered` latch is never written from this layer.

use crate::config::EngineConfig;
use crate::evaluator::{EvaluationReport, ProximityEvaluator};
use crate::geo::Coordinate;
use crate::geocode::{Address, Geocoder};
use crate::model::reminder::{NewReminder, PositionSample, Reminder};
use crate::notify::NotificationEmitter;
use crate::repo::reminder_store::{ReminderStore, StoreResult};
use crate::storage::KeyValueStorage;
use crate::tracking::controller::{SampleHandler, TrackingController, TrackingState};
use crate::tracking::provider::LocationProvider;
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Facade over the reminder engine.
pub struct LocationReminderService<S: KeyValueStorage + 'static> {
    store: Arc<ReminderStore<S>>,
    evaluator: Arc<ProximityEvaluator<S>>,
    tracking: TrackingController,
    provider: Arc<dyn LocationProvider>,
    geocoder: Option<Arc<dyn Geocoder>>,
    mutations: Mutex<()>,
}

impl<S: KeyValueStorage + 'static> LocationReminderService<S> {
    pub fn new(
        storage: S,
        provider: Arc<dyn LocationProvider>,
        emitter: Arc<dyn NotificationEmitter>,
        config: &EngineConfig,
    ) -> Self {
        let store = Arc::new(ReminderStore::with_key(storage, config.storage_key.clone()));
        let evaluator = Arc::new(ProximityEvaluator::new(Arc::clone(&store), emitter));
        let handler: Arc<dyn SampleHandler> = evaluator.clone();
        let tracking = TrackingController::new(Arc::clone(&provider), handler, config.sampling);

        Self {
            store,
            evaluator,
            tracking,
            provider,
            geocoder: None,
            mutations: Mutex::new(()),
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Persists a reminder and makes sure tracking is running.
    pub fn save_location_reminder(&self, input: NewReminder) -> StoreResult<Reminder> {
        let _mutations = self.mutations();
        let reminder = self.store.save(input)?;
        if !self.tracking.start() {
            warn!(
                "event=reminder_save module=service status=ok tracking=inactive reminder_id={}",
                reminder.id
            );
        }
        Ok(reminder)
    }

    /// All reminders; empty on storage failure (logged by the store).
    pub fn get_location_reminders(&self) -> Vec<Reminder> {
        self.store.list()
    }

    /// All reminders, keeping "storage unavailable" distinct from "none".
    pub fn try_get_location_reminders(&self) -> StoreResult<Vec<Reminder>> {
        self.store.try_list()
    }

    /// Deletes one reminder; stops tracking when none remain.
    pub fn delete_location_reminder(&self, id: &str) -> bool {
        let _mutations = self.mutations();
        let removed = self.store.delete(id);
        if !removed {
            return false;
        }

        match self.store.count() {
            Ok(0) => {
                info!("event=tracking_cascade_stop module=service reason=store_empty");
                self.tracking.stop();
            }
            Ok(_) => {}
            Err(err) => warn!(
                "event=tracking_cascade_stop module=service status=skipped reason=store_unavailable error={}",
                err
            ),
        }
        true
    }

    pub fn start_location_tracking(&self) -> bool {
        let _mutations = self.mutations();
        self.tracking.start()
    }

    pub fn stop_location_tracking(&self) -> bool {
        let _mutations = self.mutations();
        self.tracking.stop()
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.tracking.state()
    }

    /// Evaluates one sample directly, bypassing the tracking subscription.
    pub fn evaluate_sample(&self, sample: &PositionSample) -> EvaluationReport {
        self.evaluator.evaluate(sample)
    }

    /// Last known device position, `None` when unknown or unavailable.
    pub fn current_location(&self) -> Option<Coordinate> {
        match self.provider.current_position() {
            Ok(sample) => sample.map(|sample| sample.coordinate()),
            Err(err) => {
                warn!("event=current_location module=service status=error error={err}");
                None
            }
        }
    }

    /// Reverse-geocodes `coordinate`; `None` without a geocoder or on failure.
    pub fn address_for(&self, coordinate: Coordinate) -> Option<Address> {
        let geocoder = self.geocoder.as_ref()?;
        match geocoder.reverse_geocode(coordinate) {
            Ok(address) => address,
            Err(err) => {
                warn!("event=reverse_geocode module=service status=error error={err}");
                None
            }
        }
    }

    pub fn store(&self) -> &ReminderStore<S> {
        &self.store
    }

    fn mutations(&self) -> MutexGuard<'_, ()> {
        self.mutations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
