//! Proximity evaluation with enter/exit hysteresis.
//!
//! # Responsibility
//! - Compare each position sample against every stored geofence.
//! - Fire one notification per continuous visit and re-arm on exit.
//!
//! # Invariants
//! - Evaluations are serialized; one sample is fully processed before the next.
//! - Each reminder transitions independently; a bad record is skipped without
//!   affecting the others.
//! - Notification happens before the latch is set.

use crate::model::reminder::{PositionSample, Reminder, ReminderId};
use crate::notify::NotificationEmitter;
use crate::repo::reminder_store::ReminderStore;
use crate::storage::KeyValueStorage;
use crate::tracking::controller::SampleHandler;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, PoisonError};

/// Latch transition decided for one reminder and one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchAction {
    /// Entered the radius while armed: notify, then latch.
    Notify,
    /// Left the radius while latched: re-arm silently.
    Rearm,
    Hold,
}

/// Hysteresis rule: inside is `distance <= radius`.
pub fn decide(distance_meters: f64, radius_meters: f64, triggered: bool) -> LatchAction {
    let inside = distance_meters <= radius_meters;
    match (inside, triggered) {
        (true, false) => LatchAction::Notify,
        (false, true) => LatchAction::Rearm,
        _ => LatchAction::Hold,
    }
}

/// Outcome of evaluating one sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    pub evaluated: usize,
    pub notified: Vec<ReminderId>,
    pub rearmed: Vec<ReminderId>,
    pub skipped: Vec<ReminderId>,
}

/// Runs the geofence state machine for each sample.
pub struct ProximityEvaluator<S: KeyValueStorage> {
    store: Arc<ReminderStore<S>>,
    emitter: Arc<dyn NotificationEmitter>,
    serial: Mutex<()>,
}

impl<S: KeyValueStorage> ProximityEvaluator<S> {
    pub fn new(store: Arc<ReminderStore<S>>, emitter: Arc<dyn NotificationEmitter>) -> Self {
        Self {
            store,
            emitter,
            serial: Mutex::new(()),
        }
    }

    /// Evaluates one sample against all stored reminders.
    ///
    /// Never fails: storage read failures skip the sample and per-reminder
    /// problems skip that reminder, each with a log diagnostic.
    pub fn evaluate(&self, sample: &PositionSample) -> EvaluationReport {
        let _serial = self.serial.lock().unwrap_or_else(PoisonError::into_inner);
        let mut report = EvaluationReport::default();

        if !sample.coordinate().is_valid() {
            warn!(
                "event=proximity_eval module=evaluator status=skipped reason=invalid_sample timestamp_ms={}",
                sample.timestamp_ms
            );
            return report;
        }

        let reminders = match self.store.try_list() {
            Ok(reminders) => reminders,
            Err(err) => {
                warn!(
                    "event=proximity_eval module=evaluator status=skipped reason=store_unavailable error={}",
                    err
                );
                return report;
            }
        };

        for reminder in &reminders {
            report.evaluated += 1;
            self.evaluate_one(reminder, sample, &mut report);
        }

        debug!(
            "event=proximity_eval module=evaluator status=ok evaluated={} notified={} rearmed={} skipped={}",
            report.evaluated,
            report.notified.len(),
            report.rearmed.len(),
            report.skipped.len()
        );
        report
    }

    fn evaluate_one(
        &self,
        reminder: &Reminder,
        sample: &PositionSample,
        report: &mut EvaluationReport,
    ) {
        let radius = reminder.effective_radius();
        if !radius.is_finite() || radius <= 0.0 {
            warn!(
                "event=proximity_check module=evaluator status=skipped reminder_id={} reason=invalid_radius",
                reminder.id
            );
            report.skipped.push(reminder.id.clone());
            return;
        }

        let distance = reminder.distance_from(sample);
        if !distance.is_finite() {
            warn!(
                "event=proximity_check module=evaluator status=skipped reminder_id={} reason=invalid_distance",
                reminder.id
            );
            report.skipped.push(reminder.id.clone());
            return;
        }

        match decide(distance, radius, reminder.triggered) {
            LatchAction::Notify => {
                self.emitter.notify(
                    reminder.notification_title(),
                    reminder.notification_body(),
                    reminder,
                );
                self.store.set_triggered(&reminder.id, true);
                info!(
                    "event=geofence_enter module=evaluator status=notified reminder_id={} distance_m={:.1} radius_m={}",
                    reminder.id, distance, radius
                );
                report.notified.push(reminder.id.clone());
            }
            LatchAction::Rearm => {
                self.store.set_triggered(&reminder.id, false);
                info!(
                    "event=geofence_exit module=evaluator status=rearmed reminder_id={} distance_m={:.1} radius_m={}",
                    reminder.id, distance, radius
                );
                report.rearmed.push(reminder.id.clone());
            }
            LatchAction::Hold => {}
        }
    }
}

impl<S: KeyValueStorage> SampleHandler for ProximityEvaluator<S> {
    fn handle_sample(&self, sample: PositionSample) {
        self.evaluate(&sample);
    }
}

#[cfg(test)]
mod tests {
    use super::{decide, LatchAction};

    #[test]
    fn decide_covers_all_latch_transitions() {
        assert_eq!(decide(0.0, 200.0, false), LatchAction::Notify);
        assert_eq!(decide(0.0, 200.0, true), LatchAction::Hold);
        assert_eq!(decide(250.0, 200.0, true), LatchAction::Rearm);
        assert_eq!(decide(250.0, 200.0, false), LatchAction::Hold);
    }

    #[test]
    fn boundary_distance_counts_as_inside() {
        assert_eq!(decide(200.0, 200.0, false), LatchAction::Notify);
    }
}
