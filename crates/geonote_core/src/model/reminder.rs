//! Location reminder domain model.
//!
//! # Responsibility
//! - Define the persisted geofenced reminder record and its creation input.
//! - Define the ephemeral position sample delivered by location providers.
//!
//! # Invariants
//! - `id` is unique within one store and never reassigned.
//! - `radius` is positive once normalized; unset or zero means the default.
//! - `created_at` is set once at creation and never modified.
//! - `triggered` is only written by the proximity evaluator.
//!
//! # See also
//! - crate::repo::reminder_store

use crate::geo::{distance_meters, is_valid_coordinate, Coordinate};
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Geofence radius applied when the caller supplies none (or zero).
pub const DEFAULT_RADIUS_METERS: f64 = 200.0;
/// Title used when the caller leaves the title blank.
pub const DEFAULT_TITLE: &str = "Location reminder";
/// Notification body used when the reminder has no note text.
pub const DEFAULT_NOTIFICATION_BODY: &str = "Location-based reminder";

/// Stable identifier of a reminder inside the persisted collection.
pub type ReminderId = String;

/// Persisted geofenced note reminder.
///
/// Serialized with camelCase keys; this is the exact element schema of the
/// stored collection blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: ReminderId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub note: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location_name: String,
    /// Meters. Older records may omit it or store `null`; both read as the
    /// default. See [`Reminder::effective_radius`].
    #[serde(default = "default_radius", deserialize_with = "radius_or_default")]
    pub radius: f64,
    /// Hysteresis latch: true while inside the radius after firing.
    #[serde(default, deserialize_with = "null_as_default")]
    pub triggered: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Reminder {
    /// Geofence center.
    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Radius used for containment checks.
    ///
    /// Unset/zero radius resolves to [`DEFAULT_RADIUS_METERS`]. Negative or
    /// non-finite values are returned unchanged so `validate` can reject them.
    pub fn effective_radius(&self) -> f64 {
        normalize_radius(Some(self.radius))
    }

    /// Distance in meters from `sample` to the geofence center.
    pub fn distance_from(&self, sample: &PositionSample) -> f64 {
        distance_meters(
            sample.latitude,
            sample.longitude,
            self.latitude,
            self.longitude,
        )
    }

    /// Title shown in the user-visible notification.
    pub fn notification_title(&self) -> &str {
        if self.title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            self.title.as_str()
        }
    }

    /// Body shown in the user-visible notification.
    pub fn notification_body(&self) -> &str {
        if self.note.trim().is_empty() {
            DEFAULT_NOTIFICATION_BODY
        } else {
            self.note.as_str()
        }
    }

    /// Validates record-level invariants.
    pub fn validate(&self) -> Result<(), ReminderValidationError> {
        if self.id.trim().is_empty() {
            return Err(ReminderValidationError::EmptyId);
        }
        validate_center(self.latitude, self.longitude)?;
        validate_radius(self.effective_radius())
    }
}

/// Caller-supplied reminder fields accepted by `ReminderStore::save`.
///
/// `id` and `created_at` are generated when absent; `triggered` always starts
/// as `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewReminder {
    pub id: Option<ReminderId>,
    pub title: Option<String>,
    pub note: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub radius: Option<f64>,
    pub created_at: Option<i64>,
}

impl NewReminder {
    /// Creates input for a reminder centered on the given point.
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_location_name(mut self, location_name: impl Into<String>) -> Self {
        self.location_name = location_name.into();
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Validates caller input before any persistence happens.
    pub fn validate(&self) -> Result<(), ReminderValidationError> {
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(ReminderValidationError::EmptyId);
            }
        }
        validate_center(self.latitude, self.longitude)?;
        validate_radius(normalize_radius(self.radius))
    }

    /// Materializes the stored record, filling generated fields.
    pub(crate) fn into_reminder(self) -> Reminder {
        let title = match self.title {
            Some(title) if !title.trim().is_empty() => title,
            _ => DEFAULT_TITLE.to_string(),
        };

        Reminder {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title,
            note: self.note,
            latitude: self.latitude,
            longitude: self.longitude,
            location_name: self.location_name,
            radius: normalize_radius(self.radius),
            triggered: false,
            created_at: self.created_at.unwrap_or_else(now_epoch_ms),
        }
    }
}

/// Single device location reading. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix epoch milliseconds reported by the provider.
    pub timestamp_ms: i64,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
        }
    }

    /// Sample stamped with the current wall clock.
    pub fn now(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, now_epoch_ms())
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Reminder invariant violations.
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderValidationError {
    EmptyId,
    InvalidCoordinate { latitude: f64, longitude: f64 },
    InvalidRadius(f64),
}

impl Display for ReminderValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "reminder id cannot be empty"),
            Self::InvalidCoordinate {
                latitude,
                longitude,
            } => write!(f, "invalid reminder center ({latitude}, {longitude})"),
            Self::InvalidRadius(radius) => {
                write!(f, "reminder radius must be a positive number of meters, got {radius}")
            }
        }
    }
}

impl Error for ReminderValidationError {}

/// Returns current wall clock as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS_METERS
}

// `default` only covers a missing key; these also map an explicit `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn radius_or_default<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_radius(Option::<f64>::deserialize(deserializer)?))
}

fn normalize_radius(radius: Option<f64>) -> f64 {
    match radius {
        None => DEFAULT_RADIUS_METERS,
        Some(value) if value == 0.0 => DEFAULT_RADIUS_METERS,
        Some(value) => value,
    }
}

fn validate_center(latitude: f64, longitude: f64) -> Result<(), ReminderValidationError> {
    if is_valid_coordinate(latitude, longitude) {
        Ok(())
    } else {
        Err(ReminderValidationError::InvalidCoordinate {
            latitude,
            longitude,
        })
    }
}

fn validate_radius(radius: f64) -> Result<(), ReminderValidationError> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(ReminderValidationError::InvalidRadius(radius))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        NewReminder, Reminder, ReminderValidationError, DEFAULT_NOTIFICATION_BODY,
        DEFAULT_RADIUS_METERS, DEFAULT_TITLE,
    };

    #[test]
    fn new_reminder_fills_generated_fields_and_defaults() {
        let reminder = NewReminder::at(37.78825, -122.4324).into_reminder();
        assert!(!reminder.id.is_empty());
        assert!(reminder.created_at > 0);
        assert!(!reminder.triggered);
        assert_eq!(reminder.radius, DEFAULT_RADIUS_METERS);
        assert_eq!(reminder.title, DEFAULT_TITLE);
    }

    #[test]
    fn zero_radius_normalizes_to_default() {
        let reminder = NewReminder::at(1.0, 2.0).with_radius(0.0).into_reminder();
        assert_eq!(reminder.effective_radius(), DEFAULT_RADIUS_METERS);
    }

    #[test]
    fn negative_and_non_finite_radius_are_rejected() {
        let negative = NewReminder::at(1.0, 2.0).with_radius(-5.0);
        assert_eq!(
            negative.validate(),
            Err(ReminderValidationError::InvalidRadius(-5.0))
        );
        assert!(NewReminder::at(1.0, 2.0)
            .with_radius(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn out_of_range_center_is_rejected() {
        let err = NewReminder::at(120.0, 0.0).validate().unwrap_err();
        assert!(matches!(err, ReminderValidationError::InvalidCoordinate { .. }));
    }

    #[test]
    fn serializes_with_camel_case_schema() {
        let reminder = NewReminder::at(1.0, 2.0)
            .with_id("r-1")
            .with_location_name("Coffee Shop")
            .into_reminder();
        let value = serde_json::to_value(&reminder).unwrap();
        assert_eq!(value["locationName"], "Coffee Shop");
        assert!(value["createdAt"].is_i64());
        assert_eq!(value["triggered"], false);
    }

    #[test]
    fn missing_radius_in_stored_json_defaults() {
        let reminder: Reminder = serde_json::from_str(
            r#"{"id":"a","latitude":1.0,"longitude":2.0,"createdAt":5}"#,
        )
        .unwrap();
        assert_eq!(reminder.radius, DEFAULT_RADIUS_METERS);
        assert_eq!(reminder.notification_body(), DEFAULT_NOTIFICATION_BODY);
        assert_eq!(reminder.notification_title(), DEFAULT_TITLE);
    }

    #[test]
    fn null_fields_in_stored_json_read_as_defaults() {
        let reminder: Reminder = serde_json::from_str(
            r#"{"id":"a","title":null,"note":null,"latitude":1.0,"longitude":2.0,
                "locationName":null,"radius":null,"triggered":null,"createdAt":5}"#,
        )
        .unwrap();
        assert_eq!(reminder.radius, DEFAULT_RADIUS_METERS);
        assert!(!reminder.triggered);
        assert!(reminder.title.is_empty());
        assert!(reminder.location_name.is_empty());
        assert_eq!(reminder.notification_body(), DEFAULT_NOTIFICATION_BODY);
    }
}
