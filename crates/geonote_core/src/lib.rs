//! Core domain logic for GeoNote location reminders.
//! This crate is the single source of truth for geofence and latch invariants.

pub mod config;
pub mod db;
pub mod evaluator;
pub mod geo;
pub mod geocode;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;
pub mod storage;
pub mod tracking;

pub use config::{ConfigError, EngineConfig};
pub use evaluator::{decide, EvaluationReport, LatchAction, ProximityEvaluator};
pub use geo::{distance_meters, Coordinate, EARTH_RADIUS_KM};
pub use geocode::{Address, Geocoder};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::reminder::{
    now_epoch_ms, NewReminder, PositionSample, Reminder, ReminderId, ReminderValidationError,
    DEFAULT_NOTIFICATION_BODY, DEFAULT_RADIUS_METERS, DEFAULT_TITLE,
};
pub use notify::{NotificationEmitter, PendingNotification, RecordingNotificationEmitter};
pub use repo::reminder_store::{ReminderStore, StoreError, StoreResult, REMINDERS_STORAGE_KEY};
pub use service::reminder_service::LocationReminderService;
pub use storage::{
    KeyValueStorage, MemoryKeyValueStorage, SqliteKeyValueStorage, StorageError, StorageResult,
};
pub use tracking::controller::{SampleHandler, TrackingController, TrackingState};
pub use tracking::provider::{
    LocationProvider, ManualLocationProvider, PermissionStatus, ProviderError, SampleSink,
    SamplingPolicy, SubscriptionHandle,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
