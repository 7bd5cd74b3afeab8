//! Tracker: owned state shared by the transport and background tasks
//!
//! Lock order is `marks` -> `ingest_gate` -> `trail` and `flush_gate` -> `trail`.
//! Ingestion never takes `marks`, and `ingest_gate` is never held while
//! waiting on `marks`, so a slow mark write never holds up fix ingestion.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::formatting::PositionDisplay;
use crate::api::hub::{BroadcastHub, Observer, ObserverId};
use crate::api::types::BroadcastEvent;
use crate::core::{now_ms, Fix, HeadingAngle, Mark, PositionSource, PositionState};
use crate::processing::{
    Admission, LinkStatus, MarkRegistry, MarkRequest, PositionStore, TrailExport, TrailRecorder,
    TrailSnapshot,
};
use crate::storage::{load_json, save_json, Storage, TRAILS_KEY};
use crate::utils::TrackerConfig;
use crate::validation::TrackerResult;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Tracker {
    config: TrackerConfig,
    storage: Arc<dyn Storage>,
    position: PositionStore,
    trail: Mutex<TrailRecorder>,
    marks: Mutex<MarkRegistry>,
    hub: BroadcastHub,
    heading: RwLock<HeadingAngle>,
    /// Last link status sent to observers
    link: Mutex<LinkStatus>,
    /// Serializes ingestion and observer connection
    ingest_gate: Mutex<()>,
    /// Serializes trail writes against trail clearing
    flush_gate: Mutex<()>,
}

impl Tracker {
    /// Build a tracker, restoring persisted marks and trails from `storage`
    pub fn open(config: TrackerConfig, storage: Arc<dyn Storage>) -> TrackerResult<Self> {
        let marks = MarkRegistry::open(storage.clone())?;

        let mut trail = TrailRecorder::new(config.vehicle.clone(), config.min_trail_distance_m);
        // A damaged trail file is replaced by the next flush
        match load_json::<TrailSnapshot>(storage.as_ref(), TRAILS_KEY) {
            Ok(Some(snapshot)) => trail.restore(snapshot),
            Ok(None) => {}
            Err(e) => error!(error = %e, "failed to restore trails, starting empty"),
        }

        info!(
            marks = marks.list().len(),
            mark_counter = marks.counter(),
            trail_points = trail.len(),
            "tracker state restored"
        );

        Ok(Self {
            config,
            storage,
            position: PositionStore::new(),
            trail: Mutex::new(trail),
            marks: Mutex::new(marks),
            hub: BroadcastHub::new(),
            heading: RwLock::new(HeadingAngle::default()),
            link: Mutex::new(LinkStatus::Waiting),
            ingest_gate: Mutex::new(()),
            flush_gate: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Accept a receiver fix
    pub fn ingest(&self, fix: Fix) -> PositionState {
        self.ingest_from(fix, PositionSource::Live)
    }

    /// Accept an operator test position; never recorded in the trails
    pub fn ingest_simulated(&self, fix: Fix) -> PositionState {
        self.ingest_from(fix, PositionSource::Simulated)
    }

    fn ingest_from(&self, fix: Fix, source: PositionSource) -> PositionState {
        let _gate = lock(&self.ingest_gate);

        let record = source == PositionSource::Live && fix.is_rtk_fixed();
        let heading = self.heading();
        let state = self.position.ingest(fix, source);
        debug!(
            source = ?source,
            latitude = state.fix.latitude,
            longitude = state.fix.longitude,
            summary = %PositionDisplay::from(&state),
            "fix ingested"
        );

        if record {
            let admission = lock(&self.trail).on_fix(&state.fix, heading);
            match admission {
                Admission::Admitted { distance_m } => {
                    debug!(distance_m = ?distance_m, heading = heading.degrees(), "trail point admitted")
                }
                Admission::Discarded { distance_m } => debug!(distance_m, "trail point discarded"),
            }
        }

        self.hub.broadcast(&BroadcastEvent::position(state.clone()));
        state
    }

    /// Latest state, `None` until the first fix
    pub fn current(&self) -> Option<PositionState> {
        self.position.current()
    }

    pub fn heading(&self) -> HeadingAngle {
        *self
            .heading
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_heading(&self, degrees: f64) -> HeadingAngle {
        let heading = HeadingAngle::new(degrees);
        *self
            .heading
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = heading;
        heading
    }

    /// Register an observer and queue the current state for it.
    ///
    /// Waits for any mark write in progress; call it off the async workers.
    pub fn connect(&self) -> Observer {
        let marks = lock(&self.marks);
        let _gate = lock(&self.ingest_gate);

        let observer = self.hub.register();
        if let Some(state) = self.position.current() {
            self.hub.send_to(observer.id, &BroadcastEvent::position(state));
        }
        self.hub.send_to(observer.id, &BroadcastEvent::marks(marks.list().to_vec()));
        self.hub
            .send_to(observer.id, &BroadcastEvent::status(*lock(&self.link)));
        observer
    }

    /// Forget an observer whose transport closed
    pub fn disconnect(&self, id: ObserverId) {
        self.hub.remove(id);
    }

    pub fn observer_count(&self) -> usize {
        self.hub.len()
    }

    pub fn create_mark(&self, request: MarkRequest) -> TrackerResult<Mark> {
        let mut marks = lock(&self.marks);
        let mark = marks.create(request)?;
        self.hub.broadcast(&BroadcastEvent::mark_created(mark.clone()));
        Ok(mark)
    }

    pub fn list_marks(&self) -> Vec<Mark> {
        lock(&self.marks).list().to_vec()
    }

    pub fn delete_mark(&self, id: u32) -> TrackerResult<()> {
        let mut marks = lock(&self.marks);
        marks.delete(id)?;
        self.hub.broadcast(&BroadcastEvent::mark_deleted(id));
        Ok(())
    }

    pub fn update_mark(&self, id: u32, label: &str) -> TrackerResult<Mark> {
        let mut marks = lock(&self.marks);
        let mark = marks.update(id, label)?;
        self.hub.broadcast(&BroadcastEvent::mark_updated(mark.clone()));
        Ok(mark)
    }

    pub fn clear_marks(&self) -> usize {
        let mut marks = lock(&self.marks);
        let count = marks.clear_all();
        self.hub.broadcast(&BroadcastEvent::marks_cleared(count));
        count
    }

    pub fn export_trails(&self) -> TrailExport {
        lock(&self.trail).export()
    }

    pub fn trail_len(&self) -> usize {
        lock(&self.trail).len()
    }

    /// Empty all trails and delete the persisted copy
    pub fn clear_trails(&self) -> TrackerResult<()> {
        let _flush = lock(&self.flush_gate);
        lock(&self.trail).clear();
        let removed = self.storage.remove(TRAILS_KEY);
        if let Err(e) = &removed {
            error!(error = %e, "failed to remove persisted trails");
        }
        info!("trails cleared");
        self.hub.broadcast(&BroadcastEvent::trail_cleared());
        removed.map_err(Into::into)
    }

    /// Write the trails if they changed since the last write.
    ///
    /// Returns whether a write happened. On failure the change stays pending
    /// for the next call.
    pub fn flush_trails(&self) -> TrackerResult<bool> {
        let _flush = lock(&self.flush_gate);
        let Some(snapshot) = lock(&self.trail).take_dirty() else {
            return Ok(false);
        };

        match save_json(self.storage.as_ref(), TRAILS_KEY, &snapshot) {
            Ok(()) => {
                debug!(points = snapshot.piloting.len(), "trails persisted");
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "failed to persist trails");
                lock(&self.trail).mark_dirty();
                Err(e.into())
            }
        }
    }

    /// Re-evaluate link freshness; broadcasts and returns the new status on a transition
    pub fn poll_link_status(&self, now_ms: u64) -> Option<LinkStatus> {
        let status = self.position.link_status(now_ms, self.config.stale_after_ms);
        let mut last = lock(&self.link);
        if *last == status {
            return None;
        }
        match status {
            LinkStatus::Stale => warn!(from = ?*last, to = ?status, "link status changed"),
            _ => info!(from = ?*last, to = ?status, "link status changed"),
        }
        *last = status;
        self.hub.broadcast(&BroadcastEvent::status(status));
        Some(status)
    }
}

/// Persist dirty trails at most once per configured interval
pub fn spawn_trail_flusher(tracker: Arc<Tracker>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tracker.config().trail_flush_interval());
        interval.tick().await;
        loop {
            interval.tick().await;
            let worker = tracker.clone();
            // Failures are already logged and re-armed by flush_trails
            if let Err(e) = tokio::task::spawn_blocking(move || worker.flush_trails()).await {
                error!(error = %e, "trail flush task failed");
            }
        }
    })
}

/// Poll link freshness and notify observers of transitions
pub fn spawn_status_monitor(tracker: Arc<Tracker>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tracker.config().status_poll_interval());
        loop {
            interval.tick().await;
            tracker.poll_link_status(now_ms());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EARTH_RADIUS_M;
    use crate::storage::{MemoryStorage, StorageResult, MARKS_KEY};
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    /// Memory storage whose mark writes take `delay`
    struct SlowMarkStorage {
        inner: MemoryStorage,
        writing: AtomicBool,
        delay: Duration,
    }

    impl Storage for SlowMarkStorage {
        fn read(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, contents: &str) -> StorageResult<()> {
            if key == MARKS_KEY {
                self.writing.store(true, Ordering::SeqCst);
                std::thread::sleep(self.delay);
            }
            self.inner.write(key, contents)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key)
        }
    }

    fn tracker() -> (Arc<Tracker>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let tracker = Tracker::open(TrackerConfig::default(), storage.clone()).unwrap();
        (Arc::new(tracker), storage)
    }

    fn rtk_fix(lat: f64, lon: f64) -> Fix {
        let mut fix = Fix::at(lat, lon);
        fix.carr_soln = 2;
        fix.fixed_count = 10;
        fix
    }

    fn drain(observer: &mut Observer) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(message) = observer.receiver.try_recv() {
            events.push(serde_json::from_str(&message).unwrap());
        }
        events
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (tracker, _) = tracker();
        let mut fix = Fix::at(45.0, -122.0);
        fix.carr_soln = 2;
        fix.fixed_count = 10;
        fix.float_count = 0;
        fix.hour = 1;
        fix.min = 0;
        fix.sec = 0;

        tracker.ingest(fix);
        let current = tracker.current().unwrap();
        assert_eq!(current.fixed_rate, "100.0");
        assert_eq!(current.timestamp, "01:00:00 UTC");
        assert_eq!(tracker.trail_len(), 1);

        let ten_m_north = 45.0 + (10.0 / EARTH_RADIUS_M).to_degrees();
        tracker.ingest(rtk_fix(ten_m_north, -122.0));
        assert_eq!(tracker.trail_len(), 2);
    }

    #[test]
    fn test_only_trustworthy_live_fixes_are_recorded() {
        let (tracker, _) = tracker();

        let mut float_fix = rtk_fix(45.0, -122.0);
        float_fix.carr_soln = 1;
        tracker.ingest(float_fix);
        assert_eq!(tracker.trail_len(), 0);

        tracker.ingest_simulated(rtk_fix(45.0, -122.0));
        assert_eq!(tracker.trail_len(), 0);
        assert_eq!(tracker.current().unwrap().source, PositionSource::Simulated);

        tracker.ingest(rtk_fix(45.0, -122.0));
        assert_eq!(tracker.trail_len(), 1);
    }

    #[test]
    fn test_heading_feeds_suction_trail() {
        let (tracker, _) = tracker();
        tracker.set_heading(90.0);
        tracker.ingest(rtk_fix(45.0, -122.0));

        let export = tracker.export_trails();
        let tip = export.raw.suction[0];
        // Nozzle points east of the antenna at heading 90
        assert!(tip[0] > -122.0);
        assert!((tip[1] - 45.0).abs() < 1e-9);
        assert_eq!(tracker.set_heading(-10.0).degrees(), 350.0);
    }

    #[test]
    fn test_connect_receives_snapshot() {
        let (tracker, _) = tracker();

        let mut early = tracker.connect();
        let events = drain(&mut early);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["type"], "marks");
        assert_eq!(events[1]["type"], "status");
        assert_eq!(events[1]["data"]["link"], "waiting");

        tracker.ingest(rtk_fix(45.0, -122.0));
        tracker.create_mark(MarkRequest::at(45.1, -122.1)).unwrap();

        let mut late = tracker.connect();
        let events = drain(&mut late);
        assert_eq!(events[0]["type"], "position");
        assert_eq!(events[0]["data"]["latitude"], 45.0);
        assert_eq!(events[1]["type"], "marks");
        assert_eq!(events[1]["data"][0]["label"], "RM_1");
    }

    #[test]
    fn test_fan_out_completeness() {
        let (tracker, _) = tracker();
        let mut observers: Vec<Observer> = (0..4).map(|_| tracker.connect()).collect();
        for observer in observers.iter_mut() {
            drain(observer);
        }

        tracker.ingest(rtk_fix(45.0, -122.0));
        let mark = tracker.create_mark(MarkRequest::at(45.1, -122.1)).unwrap();
        tracker.update_mark(mark.id, "BENCH_A").unwrap();
        tracker.delete_mark(mark.id).unwrap();
        tracker.clear_marks();

        for observer in observers.iter_mut() {
            let events = drain(observer);
            let kinds: Vec<String> = events
                .iter()
                .map(|e| format!("{}:{}", e["type"].as_str().unwrap(), e["action"].as_str().unwrap_or("")))
                .collect();
            assert_eq!(
                kinds,
                vec!["position:", "mark:create", "mark:update", "mark:delete", "mark:clear"]
            );
        }
    }

    #[test]
    fn test_disconnected_observer_receives_nothing() {
        let (tracker, _) = tracker();
        let mut stays = tracker.connect();
        let leaves = tracker.connect();
        drain(&mut stays);

        let leaving_id = leaves.id;
        drop(leaves);
        tracker.ingest(rtk_fix(45.0, -122.0));
        tracker.disconnect(leaving_id);
        tracker.ingest(rtk_fix(45.0, -122.0));

        assert_eq!(tracker.observer_count(), 1);
        assert_eq!(drain(&mut stays).len(), 2);
    }

    #[test]
    fn test_failed_mark_operations_do_not_broadcast() {
        let (tracker, _) = tracker();
        let mut observer = tracker.connect();
        drain(&mut observer);

        assert!(tracker.create_mark(MarkRequest::default()).is_err());
        assert!(tracker.delete_mark(42).is_err());
        assert!(tracker.update_mark(42, "X").is_err());
        assert!(drain(&mut observer).is_empty());
    }

    #[test]
    fn test_mark_persisted_before_broadcast() {
        let (tracker, storage) = tracker();
        let mut observer = tracker.connect();
        drain(&mut observer);

        tracker.create_mark(MarkRequest::at(45.1, -122.1)).unwrap();
        assert!(storage.contains(MARKS_KEY));
        assert_eq!(drain(&mut observer).len(), 1);
    }

    #[test]
    fn test_slow_mark_write_does_not_stall_ingest() {
        let storage = Arc::new(SlowMarkStorage {
            inner: MemoryStorage::new(),
            writing: AtomicBool::new(false),
            delay: Duration::from_millis(600),
        });
        let tracker = Arc::new(Tracker::open(TrackerConfig::default(), storage.clone()).unwrap());

        let writer = {
            let tracker = tracker.clone();
            std::thread::spawn(move || tracker.create_mark(MarkRequest::at(45.1, -122.1)))
        };
        while !storage.writing.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }
        let connector = {
            let tracker = tracker.clone();
            std::thread::spawn(move || tracker.connect())
        };
        std::thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        tracker.ingest(rtk_fix(45.0, -122.0));
        assert!(started.elapsed() < Duration::from_millis(300));

        writer.join().unwrap().unwrap();
        let mut observer = connector.join().unwrap();

        // The snapshot already holds the fix and the new mark, with no repeats
        let events = drain(&mut observer);
        let kinds: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["position", "marks", "status"]);
        assert_eq!(events[1]["data"][0]["id"], 1);
    }

    #[test]
    fn test_damaged_trail_file_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(TRAILS_KEY, "{not json").unwrap();

        let tracker = Tracker::open(TrackerConfig::default(), storage.clone()).unwrap();
        assert_eq!(tracker.trail_len(), 0);

        tracker.ingest(rtk_fix(45.0, -122.0));
        assert!(tracker.flush_trails().unwrap());
        let reopened = Tracker::open(TrackerConfig::default(), storage).unwrap();
        assert_eq!(reopened.trail_len(), 1);
    }

    #[test]
    fn test_trail_flush_is_debounced_by_dirty_flag() {
        let (tracker, storage) = tracker();
        assert!(!tracker.flush_trails().unwrap());

        tracker.ingest(rtk_fix(45.0, -122.0));
        tracker.ingest(rtk_fix(45.0 + (5.0 / EARTH_RADIUS_M).to_degrees(), -122.0));
        assert!(tracker.flush_trails().unwrap());
        assert_eq!(storage.write_count(), 1);
        assert!(!tracker.flush_trails().unwrap());
        assert_eq!(storage.write_count(), 1);

        let reopened = Tracker::open(TrackerConfig::default(), storage.clone()).unwrap();
        assert_eq!(reopened.trail_len(), 2);
    }

    #[test]
    fn test_failed_trail_flush_retries() {
        let (tracker, storage) = tracker();
        tracker.ingest(rtk_fix(45.0, -122.0));

        storage.set_fail_writes(true);
        assert!(tracker.flush_trails().is_err());
        assert_eq!(tracker.trail_len(), 1);

        storage.set_fail_writes(false);
        assert!(tracker.flush_trails().unwrap());
        assert!(storage.contains(TRAILS_KEY));
    }

    #[test]
    fn test_clear_trails_removes_persisted_copy() {
        let (tracker, storage) = tracker();
        let mut observer = tracker.connect();
        drain(&mut observer);

        tracker.ingest(rtk_fix(45.0, -122.0));
        tracker.flush_trails().unwrap();
        assert!(storage.contains(TRAILS_KEY));

        tracker.clear_trails().unwrap();
        assert_eq!(tracker.trail_len(), 0);
        assert!(!storage.contains(TRAILS_KEY));
        assert!(!tracker.flush_trails().unwrap());

        let events = drain(&mut observer);
        assert_eq!(events.last().unwrap()["type"], "trail");
    }

    #[test]
    fn test_link_status_transitions() {
        let (tracker, _) = tracker();
        let mut observer = tracker.connect();
        drain(&mut observer);

        assert_eq!(tracker.poll_link_status(now_ms()), None);

        tracker.ingest(rtk_fix(45.0, -122.0));
        let received = tracker.current().unwrap().last_update;
        assert_eq!(tracker.poll_link_status(received + 1_000), Some(LinkStatus::Live));
        assert_eq!(tracker.poll_link_status(received + 2_000), None);
        assert_eq!(tracker.poll_link_status(received + 20_000), Some(LinkStatus::Stale));

        let events = drain(&mut observer);
        let links: Vec<&str> = events
            .iter()
            .filter(|e| e["type"] == "status")
            .map(|e| e["data"]["link"].as_str().unwrap())
            .collect();
        assert_eq!(links, vec!["live", "stale"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flusher_writes_after_interval() {
        let (tracker, storage) = tracker();
        let flusher = spawn_trail_flusher(tracker.clone());

        tracker.ingest(rtk_fix(45.0, -122.0));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!storage.contains(TRAILS_KEY));

        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if storage.contains(TRAILS_KEY) {
                break;
            }
        }
        assert!(storage.contains(TRAILS_KEY));
        assert_eq!(storage.write_count(), 1);
        flusher.abort();
    }

    #[tokio::test]
    async fn test_status_monitor_reports_live_then_stale() {
        let config = TrackerConfig {
            stale_after_ms: 200,
            status_poll_interval_ms: 20,
            ..TrackerConfig::default()
        };
        let tracker = Arc::new(Tracker::open(config, Arc::new(MemoryStorage::new())).unwrap());
        let mut observer = tracker.connect();
        drain(&mut observer);

        let monitor = spawn_status_monitor(tracker.clone());
        tracker.ingest(rtk_fix(45.0, -122.0));

        let mut links = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while links.len() < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
            links.extend(
                drain(&mut observer)
                    .into_iter()
                    .filter(|e| e["type"] == "status")
                    .map(|e| e["data"]["link"].as_str().unwrap().to_string()),
            );
        }
        assert_eq!(links, vec!["live", "stale"]);
        monitor.abort();
    }
}
