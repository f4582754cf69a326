use geonote_core::{
    KeyValueStorage, MemoryKeyValueStorage, NewReminder, PositionSample, ProximityEvaluator,
    RecordingNotificationEmitter, ReminderStore, StorageError, StorageResult,
    DEFAULT_NOTIFICATION_BODY, REMINDERS_STORAGE_KEY,
};
use std::sync::Arc;

const CENTER_LAT: f64 = 37.78825;
const CENTER_LON: f64 = -122.4324;
// About 1.1 km north of the center.
const FAR_LAT: f64 = 37.79825;

struct Harness {
    store: Arc<ReminderStore<MemoryKeyValueStorage>>,
    emitter: Arc<RecordingNotificationEmitter>,
    evaluator: ProximityEvaluator<MemoryKeyValueStorage>,
}

fn harness() -> Harness {
    let store = Arc::new(ReminderStore::new(MemoryKeyValueStorage::new()));
    let emitter = Arc::new(RecordingNotificationEmitter::new());
    let evaluator = ProximityEvaluator::new(Arc::clone(&store), emitter.clone());
    Harness {
        store,
        emitter,
        evaluator,
    }
}

fn sample(latitude: f64, longitude: f64) -> PositionSample {
    PositionSample::new(latitude, longitude, 1_700_000_000_000)
}

#[test]
fn enter_linger_exit_reenter_fires_once_per_visit() {
    let h = harness();
    let reminder = h
        .store
        .save(
            NewReminder::at(CENTER_LAT, CENTER_LON)
                .with_title("Coffee")
                .with_note("Buy beans")
                .with_radius(200.0),
        )
        .unwrap();

    // Enter: exact center, d = 0 <= 200.
    let report = h.evaluator.evaluate(&sample(CENTER_LAT, CENTER_LON));
    assert_eq!(report.notified, vec![reminder.id.clone()]);
    let pending = h.emitter.take_pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, "Coffee");
    assert_eq!(pending[0].body, "Buy beans");
    assert_eq!(pending[0].reminder.id, reminder.id);
    assert!(h.store.list()[0].triggered);

    // Linger: latched, no second notification.
    let report = h.evaluator.evaluate(&sample(CENTER_LAT, CENTER_LON));
    assert!(report.notified.is_empty());
    assert_eq!(h.emitter.pending_len(), 0);
    assert!(h.store.list()[0].triggered);

    // Exit: re-arm silently.
    let report = h.evaluator.evaluate(&sample(FAR_LAT, CENTER_LON));
    assert_eq!(report.rearmed, vec![reminder.id.clone()]);
    assert_eq!(h.emitter.pending_len(), 0);
    assert!(!h.store.list()[0].triggered);

    // Re-enter: fires again.
    let report = h.evaluator.evaluate(&sample(CENTER_LAT, CENTER_LON));
    assert_eq!(report.notified, vec![reminder.id]);
    assert_eq!(h.emitter.take_pending().len(), 1);
}

#[test]
fn staying_outside_never_notifies_or_writes() {
    let h = harness();
    h.store.save(NewReminder::at(CENTER_LAT, CENTER_LON)).unwrap();

    for _ in 0..3 {
        let report = h.evaluator.evaluate(&sample(FAR_LAT, CENTER_LON));
        assert!(report.notified.is_empty());
        assert!(report.rearmed.is_empty());
    }
    assert_eq!(h.emitter.pending_len(), 0);
    assert!(!h.store.list()[0].triggered);
}

#[test]
fn reminders_transition_independently_within_one_sample() {
    let h = harness();
    let near = h
        .store
        .save(NewReminder::at(CENTER_LAT, CENTER_LON).with_radius(200.0))
        .unwrap();
    let far = h
        .store
        .save(NewReminder::at(FAR_LAT, CENTER_LON).with_radius(200.0))
        .unwrap();
    let wide = h
        .store
        .save(NewReminder::at(FAR_LAT, CENTER_LON).with_radius(5_000.0))
        .unwrap();

    let report = h.evaluator.evaluate(&sample(CENTER_LAT, CENTER_LON));
    assert_eq!(report.evaluated, 3);
    assert_eq!(report.notified, vec![near.id.clone(), wide.id.clone()]);

    let listed = h.store.list();
    let state = |id: &str| listed.iter().find(|r| r.id == id).unwrap().triggered;
    assert!(state(&near.id));
    assert!(!state(&far.id));
    assert!(state(&wide.id));
}

#[test]
fn empty_note_uses_default_notification_body() {
    let h = harness();
    h.store.save(NewReminder::at(CENTER_LAT, CENTER_LON)).unwrap();

    h.evaluator.evaluate(&sample(CENTER_LAT, CENTER_LON));
    let pending = h.emitter.take_pending();
    assert_eq!(pending[0].body, DEFAULT_NOTIFICATION_BODY);
}

#[test]
fn stored_zero_radius_uses_default_radius() {
    let storage = Arc::new(MemoryKeyValueStorage::new());
    storage
        .set(
            REMINDERS_STORAGE_KEY,
            r#"[{"id":"legacy","latitude":37.78825,"longitude":-122.4324,"radius":0,"createdAt":1}]"#,
        )
        .unwrap();
    let store = Arc::new(ReminderStore::new(Arc::clone(&storage)));
    let emitter = Arc::new(RecordingNotificationEmitter::new());
    let evaluator = ProximityEvaluator::new(Arc::clone(&store), emitter.clone());

    // About 150 m north: inside the 200 m default.
    let report = evaluator.evaluate(&sample(CENTER_LAT + 0.00135, CENTER_LON));
    assert_eq!(report.notified, vec!["legacy".to_string()]);
}

#[test]
fn invalid_sample_is_skipped_without_touching_latches() {
    let h = harness();
    h.store.save(NewReminder::at(CENTER_LAT, CENTER_LON)).unwrap();

    let report = h.evaluator.evaluate(&sample(f64::NAN, CENTER_LON));
    assert_eq!(report.evaluated, 0);
    assert_eq!(h.emitter.pending_len(), 0);
    assert!(!h.store.list()[0].triggered);
}

#[test]
fn deleted_reminder_between_samples_is_not_evaluated() {
    let h = harness();
    let reminder = h.store.save(NewReminder::at(CENTER_LAT, CENTER_LON)).unwrap();
    h.evaluator.evaluate(&sample(CENTER_LAT, CENTER_LON));
    h.emitter.take_pending();

    assert!(h.store.delete(&reminder.id));
    let report = h.evaluator.evaluate(&sample(FAR_LAT, CENTER_LON));
    assert_eq!(report.evaluated, 0);
    assert!(h.store.list().is_empty());
}

#[test]
fn storage_failure_skips_the_sample() {
    let store = Arc::new(ReminderStore::new(UnavailableStorage));
    let emitter = Arc::new(RecordingNotificationEmitter::new());
    let evaluator = ProximityEvaluator::new(store, emitter.clone());

    let report = evaluator.evaluate(&sample(CENTER_LAT, CENTER_LON));
    assert_eq!(report.evaluated, 0);
    assert_eq!(emitter.pending_len(), 0);
}

struct UnavailableStorage;

impl KeyValueStorage for UnavailableStorage {
    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Unavailable("disk detached".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("disk detached".to_string()))
    }
}
