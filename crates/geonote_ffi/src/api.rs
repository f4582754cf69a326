//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose reminder CRUD and tracking entry points to Dart via FRB.
//! - Bridge host platform services: the host reports permission, pushes
//!   position samples and drains pending notifications.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - One reminder runtime per process, created on first successful use; a
//!   failed build is retried by the next call.

use geonote_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    EngineConfig, LocationProvider, LocationReminderService, ManualLocationProvider, NewReminder,
    NotificationEmitter, PendingNotification, PermissionStatus, PositionSample,
    RecordingNotificationEmitter, Reminder, SqliteKeyValueStorage,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

const REMINDER_DB_FILE_NAME: &str = "geonote_reminders.sqlite3";
static REMINDER_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static RUNTIME: OnceCell<ReminderRuntime> = OnceCell::new();

struct ReminderRuntime {
    provider: Arc<ManualLocationProvider>,
    emitter: Arc<RecordingNotificationEmitter>,
    service: LocationReminderService<SqliteKeyValueStorage>,
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Pins the reminder database file before first use.
///
/// # FFI contract
/// - Returns empty string on success.
/// - Returns an error message when a different path is already in effect.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_reminder_db_path(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    let active = REMINDER_DB_PATH.get_or_init(|| requested.clone());
    if *active == requested {
        String::new()
    } else {
        format!(
            "reminder database already configured at `{}`",
            active.display()
        )
    }
}

/// Reminder shape returned to Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderItem {
    pub id: String,
    pub title: String,
    pub note: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub radius: f64,
    pub triggered: bool,
    pub created_at: i64,
}

/// Result envelope for reminder creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderActionResponse {
    pub ok: bool,
    pub reminder: Option<ReminderItem>,
    pub message: String,
}

/// Notification the host should display.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingNotificationItem {
    pub title: String,
    pub body: String,
    pub reminder: ReminderItem,
}

/// Saves a location reminder and requests tracking.
///
/// # FFI contract
/// - `title = None` or blank uses the default title.
/// - `radius = None` or `0` uses the 200 m default.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn save_location_reminder(
    title: Option<String>,
    note: String,
    latitude: f64,
    longitude: f64,
    location_name: String,
    radius: Option<f64>,
) -> ReminderActionResponse {
    let input = NewReminder {
        title: title.map(|value| value.trim().to_string()),
        note,
        latitude,
        longitude,
        location_name: location_name.trim().to_string(),
        radius,
        ..NewReminder::default()
    };

    let result = with_runtime(|runtime| {
        runtime
            .service
            .save_location_reminder(input)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(reminder) => ReminderActionResponse {
            ok: true,
            reminder: Some(to_reminder_item(reminder)),
            message: "Reminder saved.".to_string(),
        },
        Err(err) => ReminderActionResponse {
            ok: false,
            reminder: None,
            message: format!("save_location_reminder failed: {err}"),
        },
    }
}

/// Lists reminders in insertion order; empty when storage is unavailable.
#[flutter_rust_bridge::frb(sync)]
pub fn get_location_reminders() -> Vec<ReminderItem> {
    with_runtime(|runtime| Ok(runtime.service.get_location_reminders()))
        .map(|reminders| reminders.into_iter().map(to_reminder_item).collect())
        .unwrap_or_default()
}

/// Deletes one reminder; returns whether a record was removed.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_location_reminder(id: String) -> bool {
    with_runtime(|runtime| Ok(runtime.service.delete_location_reminder(id.trim())))
        .unwrap_or(false)
}

#[flutter_rust_bridge::frb(sync)]
pub fn start_location_tracking() -> bool {
    with_runtime(|runtime| Ok(runtime.service.start_location_tracking())).unwrap_or(false)
}

#[flutter_rust_bridge::frb(sync)]
pub fn stop_location_tracking() -> bool {
    with_runtime(|runtime| Ok(runtime.service.stop_location_tracking())).unwrap_or(false)
}

/// Returns `stopped|requesting_permission|active`, or `unavailable`.
#[flutter_rust_bridge::frb(sync)]
pub fn tracking_state() -> String {
    with_runtime(|runtime| Ok(runtime.service.tracking_state().as_str().to_string()))
        .unwrap_or_else(|_| "unavailable".to_string())
}

/// Records the platform background-location permission outcome.
///
/// # FFI contract
/// - Returns empty string once the outcome is recorded.
/// - Returns an error message when the reminder runtime is unavailable.
#[flutter_rust_bridge::frb(sync)]
pub fn set_background_permission(granted: bool) -> String {
    let permission = if granted {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    };
    match with_runtime(|runtime| {
        runtime.provider.set_permission(permission);
        Ok(())
    }) {
        Ok(()) => String::new(),
        Err(err) => format!("set_background_permission failed: {err}"),
    }
}

/// Delivers one platform position sample.
///
/// Returns how many subscriptions received it (0 when tracking is stopped).
#[flutter_rust_bridge::frb(sync)]
pub fn push_position_sample(latitude: f64, longitude: f64, timestamp_ms: i64) -> u32 {
    let sample = PositionSample::new(latitude, longitude, timestamp_ms);
    with_runtime(|runtime| Ok(runtime.provider.deliver(sample)))
        .map(|delivered| u32::try_from(delivered).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Drains notifications emitted since the previous call.
#[flutter_rust_bridge::frb(sync)]
pub fn take_pending_notifications() -> Vec<PendingNotificationItem> {
    with_runtime(|runtime| Ok(runtime.emitter.take_pending()))
        .map(|pending| pending.into_iter().map(to_pending_item).collect())
        .unwrap_or_default()
}

fn resolve_reminder_db_path() -> PathBuf {
    REMINDER_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("GEONOTE_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(REMINDER_DB_FILE_NAME)
        })
        .clone()
}

fn build_runtime() -> Result<ReminderRuntime, String> {
    let db_path = resolve_reminder_db_path();
    let storage = SqliteKeyValueStorage::open(&db_path)
        .map_err(|err| format!("reminder DB open failed: {err}"))?;
    let runtime = assemble_runtime(storage)?;

    info!(
        "event=ffi_runtime_init module=ffi status=ok db_path={}",
        db_path.display()
    );
    Ok(runtime)
}

fn assemble_runtime(storage: SqliteKeyValueStorage) -> Result<ReminderRuntime, String> {
    let config = EngineConfig::default();
    config
        .validate()
        .map_err(|err| format!("invalid engine config: {err}"))?;

    let provider = Arc::new(ManualLocationProvider::new(PermissionStatus::Denied));
    let emitter = Arc::new(RecordingNotificationEmitter::new());
    let service = LocationReminderService::new(
        storage,
        Arc::clone(&provider) as Arc<dyn LocationProvider>,
        Arc::clone(&emitter) as Arc<dyn NotificationEmitter>,
        &config,
    );
    Ok(ReminderRuntime {
        provider,
        emitter,
        service,
    })
}

fn with_runtime<T>(f: impl FnOnce(&ReminderRuntime) -> Result<T, String>) -> Result<T, String> {
    runtime_in(&RUNTIME, build_runtime).and_then(f)
}

// Only a successful build is cached.
fn runtime_in(
    cell: &OnceCell<ReminderRuntime>,
    build: impl FnOnce() -> Result<ReminderRuntime, String>,
) -> Result<&ReminderRuntime, String> {
    cell.get_or_try_init(build).map_err(|err| {
        error!("event=ffi_runtime_init module=ffi status=error retry=next_call error={err}");
        err
    })
}

fn to_reminder_item(reminder: Reminder) -> ReminderItem {
    ReminderItem {
        id: reminder.id,
        title: reminder.title,
        note: reminder.note,
        latitude: reminder.latitude,
        longitude: reminder.longitude,
        location_name: reminder.location_name,
        radius: reminder.radius,
        triggered: reminder.triggered,
        created_at: reminder.created_at,
    }
}

fn to_pending_item(pending: PendingNotification) -> PendingNotificationItem {
    PendingNotificationItem {
        title: pending.title,
        body: pending.body,
        reminder: to_reminder_item(pending.reminder),
    }
}
