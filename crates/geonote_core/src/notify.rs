//! Notification emitter contract and built-in emitters.
//!
//! # Responsibility
//! - Define the fire-and-forget seam between the evaluator and the platform
//!   notification service.
//! - Provide an in-memory queue emitter for hosts that display notifications
//!   themselves.
//!
//! # Invariants
//! - `notify` never reports failure to the caller; emitters log their own
//!   failures.

use crate::model::reminder::Reminder;
use log::{error, info};
use std::sync::Mutex;

/// Turns a proximity trigger into a user-visible notification.
pub trait NotificationEmitter: Send + Sync {
    fn notify(&self, title: &str, body: &str, payload: &Reminder);
}

/// One emitted notification waiting to be shown by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingNotification {
    pub title: String,
    pub body: String,
    pub reminder: Reminder,
}

/// Emitter that queues notifications until the host drains them.
#[derive(Debug, Default)]
pub struct RecordingNotificationEmitter {
    pending: Mutex<Vec<PendingNotification>>,
}

impl RecordingNotificationEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns queued notifications in emission order.
    pub fn take_pending(&self) -> Vec<PendingNotification> {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => Vec::new(),
        }
    }

    /// Number of queued notifications.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }
}

impl NotificationEmitter for RecordingNotificationEmitter {
    fn notify(&self, title: &str, body: &str, payload: &Reminder) {
        match self.pending.lock() {
            Ok(mut pending) => {
                pending.push(PendingNotification {
                    title: title.to_string(),
                    body: body.to_string(),
                    reminder: payload.clone(),
                });
                info!(
                    "event=notification_emit module=notify status=ok emitter=queue reminder_id={} queued={}",
                    payload.id,
                    pending.len()
                );
            }
            Err(_) => error!(
                "event=notification_emit module=notify status=error emitter=queue reminder_id={} error_code=queue_poisoned",
                payload.id
            ),
        }
    }
}
