//! Unit tests for rr-tasks.
//!
//! Managers run a real pipeline over a tiny in-memory region with a manual
//! clock, so lease and retention expiry are driven by the test rather than
//! by sleeping.

#[cfg(test)]
pub(crate) mod fakes {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Condvar, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use rr_core::{GeoPoint, TaskConfig, TaskId};
    use rr_output::{ArtifactRef, ArtifactStore, OutputResult, RenderedMap};
    use rr_pipeline::{
        FixedMemorySignal, GeocodeError, Geocoder, Pipeline, PipelineBuilder, Progress,
        StaticGeocoder,
    };
    use rr_spatial::{RegionExtractor, RoadClass, RoadNetwork, RoadNetworkBuilder};
    use rr_weather::{ClearSkies, Condition, WeatherOracle, WeatherResult};

    use crate::{
        Clock, InMemoryTaskStore, ManualClock, TaskManager, TaskRecord, TaskResult, TaskStatus,
        TaskStore,
    };

    pub const ALPHA: GeoPoint = GeoPoint { lat: 0.0, lon: 0.0 };
    pub const BRAVO: GeoPoint = GeoPoint { lat: 0.0, lon: 0.2 };

    pub const START_MS: u64 = 1_000_000;

    /// Five nodes of primary road from Alpha to Bravo.
    pub fn region() -> RoadNetwork {
        let mut b = RoadNetworkBuilder::new();
        let chain: Vec<_> = (0..5)
            .map(|i| b.add_node(GeoPoint::new(0.0, i as f64 * 0.05)))
            .collect();
        for pair in chain.windows(2) {
            b.add_classified_road(pair[0], pair[1], RoadClass::Primary);
        }
        b.build()
    }

    pub fn gazetteer() -> StaticGeocoder {
        StaticGeocoder::new().with("Alpha", ALPHA).with("Bravo", BRAVO)
    }

    pub fn task_config() -> TaskConfig {
        TaskConfig { workers: 2, retention_secs: 60, lease_secs: 30 }
    }

    // ── Collaborators ─────────────────────────────────────────────────────

    /// A latch the test opens to let blocked workers continue.
    #[derive(Clone, Default)]
    pub struct Gate(Arc<(Mutex<bool>, Condvar)>);

    impl Gate {
        pub fn open(&self) {
            let (open, cvar) = &*self.0;
            *open.lock().unwrap() = true;
            cvar.notify_all();
        }

        fn wait(&self) {
            let (open, cvar) = &*self.0;
            let mut guard = open.lock().unwrap();
            while !*guard {
                guard = cvar.wait(guard).unwrap();
            }
        }
    }

    /// Blocks every lookup until the gate opens.
    pub struct GatedGeocoder {
        pub inner: StaticGeocoder,
        pub gate:  Gate,
    }

    impl Geocoder for GatedGeocoder {
        fn geocode(&self, name: &str) -> Result<GeoPoint, GeocodeError> {
            self.gate.wait();
            self.inner.geocode(name)
        }
    }

    pub struct PanickingGeocoder;

    impl Geocoder for PanickingGeocoder {
        fn geocode(&self, name: &str) -> Result<GeoPoint, GeocodeError> {
            panic!("gazetteer corrupted while looking up {name}");
        }
    }

    /// Counts lookups.
    pub struct CountingGeocoder {
        pub inner: StaticGeocoder,
        pub calls: Arc<AtomicUsize>,
    }

    impl Geocoder for CountingGeocoder {
        fn geocode(&self, name: &str) -> Result<GeoPoint, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.geocode(name)
        }
    }

    /// Clear skies, answered slowly.
    pub struct SlowSkies(pub Duration);

    impl WeatherOracle for SlowSkies {
        fn conditions_at(&self, _point: GeoPoint) -> WeatherResult<Vec<Condition>> {
            thread::sleep(self.0);
            Ok(vec![Condition::Clear])
        }
    }

    thread_local! {
        /// Runs open on this thread: raised at the start lookup, lowered at save.
        static OPEN_RUNS: Cell<usize> = const { Cell::new(0) };
    }

    /// Counts runs that start on a thread already inside another run.
    pub struct NestingGeocoder {
        pub inner:  StaticGeocoder,
        pub nested: Arc<AtomicUsize>,
    }

    impl Geocoder for NestingGeocoder {
        fn geocode(&self, name: &str) -> Result<GeoPoint, GeocodeError> {
            if name.trim().eq_ignore_ascii_case("alpha") {
                OPEN_RUNS.with(|open| {
                    if open.get() > 0 {
                        self.nested.fetch_add(1, Ordering::SeqCst);
                    }
                    open.set(open.get() + 1);
                });
            }
            self.inner.geocode(name)
        }
    }

    /// Closes the run opened by [`NestingGeocoder`] on this thread.
    #[derive(Clone, Default)]
    pub struct ClosingStore(pub MemoryStore);

    impl ArtifactStore for ClosingStore {
        fn save(&self, stem: &str, map: &RenderedMap) -> OutputResult<ArtifactRef> {
            OPEN_RUNS.with(|open| open.set(open.get().saturating_sub(1)));
            self.0.save(stem, map)
        }
    }

    #[derive(Clone, Default)]
    pub struct MemoryStore {
        pub saved: Arc<Mutex<Vec<String>>>,
    }

    impl ArtifactStore for MemoryStore {
        fn save(&self, stem: &str, map: &RenderedMap) -> OutputResult<ArtifactRef> {
            self.saved.lock().unwrap().push(stem.to_string());
            Ok(ArtifactRef::new(format!("mem://{stem}.{}", map.extension)))
        }
    }

    /// Records the progress of every applied update.
    #[derive(Default)]
    pub struct RecordingStore {
        inner:    InMemoryTaskStore,
        pub seen: Mutex<Vec<Progress>>,
    }

    impl TaskStore for RecordingStore {
        fn insert(&self, record: TaskRecord) -> TaskResult<()> {
            self.inner.insert(record)
        }

        fn get(&self, id: TaskId) -> TaskResult<Option<TaskRecord>> {
            self.inner.get(id)
        }

        fn update(&self, id: TaskId, apply: &mut dyn FnMut(&mut TaskRecord) -> bool) -> TaskResult<bool> {
            let mut after = None;
            let applied = self.inner.update(id, &mut |record| {
                let ok = apply(record);
                if ok {
                    after = Some(record.progress.clone());
                }
                ok
            })?;
            if let Some(progress) = after {
                self.seen.lock().unwrap().push(progress);
            }
            Ok(applied)
        }

        fn evict_finished_before(&self, cutoff_ms: u64) -> TaskResult<usize> {
            self.inner.evict_finished_before(cutoff_ms)
        }

        fn unfinished(&self) -> TaskResult<Vec<TaskId>> {
            self.inner.unfinished()
        }

        fn len(&self) -> TaskResult<usize> {
            self.inner.len()
        }
    }

    // ── Harness ───────────────────────────────────────────────────────────

    pub struct Harness {
        pub manager:   TaskManager,
        pub clock:     Arc<ManualClock>,
        pub artifacts: MemoryStore,
    }

    pub fn harness(geocoder: impl Geocoder + 'static) -> Harness {
        harness_with_store(geocoder, Arc::new(InMemoryTaskStore::new()))
    }

    pub fn harness_with_store(geocoder: impl Geocoder + 'static, store: Arc<dyn TaskStore>) -> Harness {
        let artifacts = MemoryStore::default();
        let clock = Arc::new(ManualClock::new(START_MS));
        let manager = build_manager(pipeline(geocoder, ClearSkies, artifacts.clone()), store, clock.clone());
        Harness { manager, clock, artifacts }
    }

    pub fn pipeline(
        geocoder: impl Geocoder + 'static,
        weather: impl WeatherOracle + 'static,
        artifacts: impl ArtifactStore + 'static,
    ) -> Pipeline {
        PipelineBuilder::new(geocoder, RegionExtractor::new(Arc::new(region())), weather)
            .store(artifacts)
            .memory(FixedMemorySignal(1_000_000.0))
            .build()
            .unwrap()
    }

    pub fn build_manager(pipeline: Pipeline, store: Arc<dyn TaskStore>, clock: Arc<ManualClock>) -> TaskManager {
        TaskManager::builder(pipeline)
            .config(&task_config())
            .store(store)
            .clock(clock as Arc<dyn Clock>)
            .build()
            .unwrap()
    }

    /// Poll until `done` holds.
    pub fn wait_until(manager: &TaskManager, id: TaskId, done: impl Fn(&TaskStatus) -> bool) -> TaskStatus {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let status = manager.poll(id).unwrap();
            if done(&status) {
                return status;
            }
            assert!(Instant::now() < deadline, "timed out waiting, last status {status:?}");
            thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn wait_terminal(manager: &TaskManager, id: TaskId) -> TaskStatus {
        wait_until(manager, id, |s| s.state.is_terminal())
    }

    pub fn wait_idle(manager: &TaskManager) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while manager.in_flight() > 0 {
            assert!(Instant::now() < deadline, "workers still busy");
            thread::sleep(Duration::from_millis(5));
        }
    }
}

// ── Record state machine ──────────────────────────────────────────────────────

#[cfg(test)]
mod record {
    use rr_core::{LocationPair, TaskId};
    use rr_output::ArtifactRef;
    use rr_pipeline::{ErrorCategory, Progress, Stage};

    use crate::{TaskFailure, TaskOutcome, TaskRecord, TaskState};

    fn record() -> TaskRecord {
        TaskRecord::new(TaskId::new(), LocationPair::new("Alpha", "Bravo").unwrap(), 1_000)
    }

    #[test]
    fn new_record_is_queued_at_zero() {
        let r = record();
        assert_eq!(r.state, TaskState::Queued);
        assert_eq!(r.progress.stage, Stage::Queued);
        assert_eq!(r.progress.percent, 0);
        assert_eq!(r.finished_ms, None);
    }

    #[test]
    fn claim_succeeds_once() {
        let mut r = record();
        assert!(r.claim(1_100));
        assert_eq!(r.state, TaskState::Running);
        assert_eq!(r.updated_ms, 1_100);
        assert!(!r.claim(1_200));
    }

    #[test]
    fn advance_requires_running() {
        let mut r = record();
        assert!(!r.advance(&Progress::new(Stage::Coordinates, "x"), 1_100));
        r.claim(1_100);
        assert!(r.advance(&Progress::new(Stage::Coordinates, "x"), 1_200));
        assert_eq!(r.progress.percent, 5);
        assert_eq!(r.updated_ms, 1_200);
    }

    #[test]
    fn advance_never_moves_backwards() {
        let mut r = record();
        r.claim(1_100);
        assert!(r.advance(&Progress::new(Stage::GraphTier2, "tier 2"), 1_200));
        assert!(!r.advance(&Progress::new(Stage::GraphTier1, "tier 1"), 1_300));
        assert_eq!(r.progress.stage, Stage::GraphTier2);
        // Same stage, new detail.
        assert!(r.advance(&Progress::new(Stage::GraphTier2, "still tier 2"), 1_400));
        assert_eq!(r.progress.detail, "still tier 2");
    }

    #[test]
    fn advance_refuses_terminal_stages() {
        let mut r = record();
        r.claim(1_100);
        assert!(!r.advance(&Progress::new(Stage::Complete, "done"), 1_200));
        assert!(!r.advance(&Progress::new(Stage::Failed, "boom"), 1_200));
        assert_eq!(r.state, TaskState::Running);
    }

    #[test]
    fn finish_success_sets_artifact_and_complete() {
        let mut r = record();
        r.claim(1_100);
        assert!(r.finish(TaskOutcome::Succeeded(ArtifactRef::new("maps/a.geojson")), 2_000));
        assert_eq!(r.state, TaskState::Succeeded);
        assert_eq!(r.progress.stage, Stage::Complete);
        assert_eq!(r.progress.percent, 100);
        assert_eq!(r.artifact, Some(ArtifactRef::new("maps/a.geojson")));
        assert_eq!(r.finished_ms, Some(2_000));
    }

    #[test]
    fn terminal_state_is_never_overwritten() {
        let mut r = record();
        r.claim(1_100);
        let expired = TaskFailure::new(ErrorCategory::LeaseExpired, "no progress");
        assert!(r.finish(TaskOutcome::Failed(expired.clone()), 2_000));
        assert!(!r.finish(TaskOutcome::Succeeded(ArtifactRef::new("late.geojson")), 3_000));
        assert_eq!(r.state, TaskState::Failed);
        assert_eq!(r.error, Some(expired));
        assert_eq!(r.artifact, None);
        assert_eq!(r.finished_ms, Some(2_000));
    }

    #[test]
    fn lease_only_applies_to_running_tasks() {
        let mut r = record();
        assert!(!r.lease_lapsed(100_000, 500));
        r.claim(1_000);
        assert!(!r.lease_lapsed(1_500, 500));
        assert!(r.lease_lapsed(1_501, 500));
        r.finish(TaskOutcome::Succeeded(ArtifactRef::new("a")), 1_600);
        assert!(!r.lease_lapsed(100_000, 500));
    }

    #[test]
    fn expiry_counts_from_finish() {
        let mut r = record();
        assert!(!r.expired(u64::MAX, 0));
        r.claim(1_000);
        r.finish(TaskOutcome::Succeeded(ArtifactRef::new("a")), 2_000);
        assert!(!r.expired(2_500, 500));
        assert!(r.expired(2_501, 500));
    }

    #[test]
    fn status_serializes_snake_case_and_omits_missing_error() {
        let mut r = record();
        r.claim(1_100);
        r.advance(&Progress::new(Stage::MemoryCheck, "22.2 km"), 1_200);
        let json = serde_json::to_value(r.status()).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["stage"], "memory_check");
        assert_eq!(json["percent"], 10);
        assert!(json.get("error").is_none());

        r.finish(TaskOutcome::Failed(TaskFailure::new(ErrorCategory::NoRouteFound, "nope")), 1_300);
        let json = serde_json::to_value(r.status()).unwrap();
        assert_eq!(json["error"]["category"], "no_route_found");
        assert_eq!(json["stage"], "failed");
    }
}

// ── Stores ────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod store_contract {
    use rr_core::{LocationPair, TaskId};
    use rr_output::ArtifactRef;
    use rr_pipeline::{Progress, Stage};

    use crate::{TaskOutcome, TaskRecord, TaskState, TaskStore};

    fn record(now_ms: u64) -> TaskRecord {
        TaskRecord::new(TaskId::new(), LocationPair::new("Alpha", "Bravo").unwrap(), now_ms)
    }

    /// Behaviour every `TaskStore` must share.
    pub fn exercise(store: &dyn TaskStore) {
        let a = record(1_000);
        let id = a.id;
        store.insert(a.clone()).unwrap();
        assert!(store.insert(a.clone()).is_err(), "duplicate insert must fail");
        assert_eq!(store.get(id).unwrap(), Some(a));
        assert_eq!(store.get(TaskId::new()).unwrap(), None);
        assert_eq!(store.len().unwrap(), 1);

        // Updates apply and persist.
        assert!(store.update(id, &mut |r| r.claim(1_100)).unwrap());
        assert!(!store.update(id, &mut |r| r.claim(1_200)).unwrap());
        let progress = Progress::new(Stage::Route, "route");
        assert!(store.update(id, &mut |r| r.advance(&progress, 1_300)).unwrap());
        let got = store.get(id).unwrap().unwrap();
        assert_eq!(got.state, TaskState::Running);
        assert_eq!(got.progress.stage, Stage::Route);
        assert_eq!(got.updated_ms, 1_300);

        // Unknown ids are not an error.
        assert!(!store.update(TaskId::new(), &mut |_| true).unwrap());

        // Eviction removes only finished records older than the cutoff.
        let b = record(1_000);
        let queued = b.id;
        store.insert(b).unwrap();
        let mut unfinished = store.unfinished().unwrap();
        unfinished.sort_by_key(|id| id.to_string());
        let mut expected = vec![id, queued];
        expected.sort_by_key(|id| id.to_string());
        assert_eq!(unfinished, expected);
        assert!(store.update(id, &mut |r| r.finish(TaskOutcome::Succeeded(ArtifactRef::new("a")), 2_000)).unwrap());
        assert_eq!(store.unfinished().unwrap(), vec![queued]);
        assert_eq!(store.evict_finished_before(2_000).unwrap(), 0);
        assert_eq!(store.evict_finished_before(2_001).unwrap(), 1);
        assert_eq!(store.get(id).unwrap(), None);
        assert!(store.get(queued).unwrap().is_some());
        assert_eq!(store.len().unwrap(), 1);
    }
}

#[cfg(test)]
mod in_memory_store {
    use crate::InMemoryTaskStore;

    #[test]
    fn satisfies_store_contract() {
        super::store_contract::exercise(&InMemoryTaskStore::new());
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_store {
    use rr_core::{LocationPair, TaskId};
    use tempfile::TempDir;

    use std::sync::Arc;

    use rr_pipeline::ErrorCategory;

    use super::fakes::{gazetteer, harness_with_store};
    use crate::{SqliteTaskStore, TaskRecord, TaskState, TaskStore};

    #[test]
    fn satisfies_store_contract() {
        super::store_contract::exercise(&SqliteTaskStore::in_memory().unwrap());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.db");
        let record = TaskRecord::new(TaskId::new(), LocationPair::new("Alpha", "Bravo").unwrap(), 1_000);
        {
            let store = SqliteTaskStore::open(&path).unwrap();
            store.insert(record.clone()).unwrap();
            store.update(record.id, &mut |r| r.claim(1_100)).unwrap();
        }
        let store = SqliteTaskStore::open(&path).unwrap();
        let got = store.get(record.id).unwrap().unwrap();
        assert_eq!(got.pair, record.pair);
        assert_eq!(got.updated_ms, 1_100);
    }

    #[test]
    fn state_column_tracks_the_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.db");
        let store = SqliteTaskStore::open(&path).unwrap();
        let record = TaskRecord::new(TaskId::new(), LocationPair::new("Alpha", "Bravo").unwrap(), 1_000);
        store.insert(record.clone()).unwrap();
        store.update(record.id, &mut |r| r.claim(1_100)).unwrap();
        drop(store);

        let conn = rusqlite::Connection::open(&path).unwrap();
        let state: String = conn
            .query_row("SELECT state FROM tasks WHERE id = ?1", [record.id.to_string()], |row| row.get(0))
            .unwrap();
        assert_eq!(state, "running");
    }

    #[test]
    fn task_queued_before_a_restart_is_failed_not_left_queued() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.db");
        let record = TaskRecord::new(TaskId::new(), LocationPair::new("Alpha", "Bravo").unwrap(), 1_000);
        SqliteTaskStore::open(&path).unwrap().insert(record.clone()).unwrap();

        let h = harness_with_store(gazetteer(), Arc::new(SqliteTaskStore::open(&path).unwrap()));
        let status = h.manager.poll(record.id).unwrap();
        assert_eq!(status.state, TaskState::Failed);
        assert_eq!(status.error.map(|e| e.category), Some(ErrorCategory::LeaseExpired));
        assert!(h.artifacts.saved.lock().unwrap().is_empty());
    }
}

// ── Manager ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod manager {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rr_core::{LocationPair, TaskId};
    use rr_output::ArtifactRef;
    use rr_pipeline::{ErrorCategory, PipelineError, Stage};

    use super::fakes::*;
    use crate::{InMemoryTaskStore, ManualClock, TaskError, TaskOutcome, TaskRecord, TaskState, TaskStore};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn manager_is_send_sync() {
        assert_send_sync::<crate::TaskManager>();
    }

    #[test]
    fn blank_location_is_rejected_before_anything_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let h = harness(CountingGeocoder { inner: gazetteer(), calls: calls.clone() });
        let err = h.manager.submit("   ", "Bravo").unwrap_err();
        assert!(matches!(err, TaskError::InvalidInput(_)), "{err}");
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
        assert!(matches!(h.manager.submit("Alpha", "").unwrap_err(), TaskError::InvalidInput(_)));
        assert_eq!(h.manager.store().len().unwrap(), 0);
        assert_eq!(h.manager.in_flight(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn task_runs_to_completion() {
        let h = harness(gazetteer());
        let id = h.manager.submit("Alpha", "Bravo").unwrap();
        let status = wait_terminal(&h.manager, id);

        assert_eq!(status.state, TaskState::Succeeded);
        assert_eq!(status.stage, Stage::Complete);
        assert_eq!(status.percent, 100);
        assert_eq!(status.error, None);

        let artifact = h.manager.fetch_result(id).unwrap();
        assert_eq!(artifact.to_string(), format!("mem://{id}.geojson"));
        assert_eq!(*h.artifacts.saved.lock().unwrap(), vec![id.to_string()]);
    }

    #[test]
    fn stored_progress_is_monotonic_and_ends_at_100() {
        let store = Arc::new(RecordingStore::default());
        let h = harness_with_store(gazetteer(), store.clone());
        let id = h.manager.submit("Alpha", "Bravo").unwrap();
        wait_terminal(&h.manager, id);
        wait_idle(&h.manager);

        let seen = store.seen.lock().unwrap();
        let stages: Vec<Stage> = seen.iter().map(|p| p.stage).collect();
        assert_eq!(stages.first(), Some(&Stage::Queued));
        assert!(stages.contains(&Stage::Coordinates));
        assert!(stages.contains(&Stage::GraphTier1));
        assert!(stages.contains(&Stage::Saving));
        assert_eq!(stages.last(), Some(&Stage::Complete));
        assert!(seen.windows(2).all(|w| w[0].percent <= w[1].percent), "{stages:?}");
        assert!(seen.iter().all(|p| p.percent <= 100));
        assert_eq!(seen.last().map(|p| p.percent), Some(100));
    }

    #[test]
    fn every_task_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let h = harness(CountingGeocoder { inner: gazetteer(), calls: calls.clone() });
        let ids: Vec<TaskId> = (0..3).map(|_| h.manager.submit("Alpha", "Bravo").unwrap()).collect();
        for &id in &ids {
            assert_eq!(wait_terminal(&h.manager, id).state, TaskState::Succeeded);
            // Repeated polls never re-run the task.
            h.manager.poll(id).unwrap();
        }
        wait_idle(&h.manager);

        assert_eq!(calls.load(Ordering::SeqCst), 6, "two lookups per run");
        let mut saved = h.artifacts.saved.lock().unwrap().clone();
        saved.sort();
        let mut expected: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        expected.sort();
        assert_eq!(saved, expected);
    }

    #[test]
    fn unknown_ids() {
        let h = harness(gazetteer());
        let id = TaskId::new();
        assert!(matches!(h.manager.poll(id).unwrap_err(), TaskError::UnknownTask(x) if x == id));
        assert!(matches!(h.manager.fetch_result(id).unwrap_err(), TaskError::NotFound(x) if x == id));
    }

    #[test]
    fn running_task_is_not_ready() {
        let gate = Gate::default();
        let h = harness(GatedGeocoder { inner: gazetteer(), gate: gate.clone() });
        let id = h.manager.submit("Alpha", "Bravo").unwrap();
        let status = wait_until(&h.manager, id, |s| s.stage == Stage::Coordinates);
        assert_eq!(status.state, TaskState::Running);
        assert_eq!(status.percent, 5);

        let err = h.manager.fetch_result(id).unwrap_err();
        assert!(matches!(err, TaskError::NotReady { state: TaskState::Running, .. }), "{err}");

        gate.open();
        assert_eq!(wait_terminal(&h.manager, id).state, TaskState::Succeeded);
        assert!(h.manager.fetch_result(id).is_ok());
    }

    #[test]
    fn pipeline_failure_is_reported_with_category() {
        let h = harness(gazetteer());
        let id = h.manager.submit("Alpha", "Atlantis").unwrap();
        let status = wait_terminal(&h.manager, id);

        assert_eq!(status.state, TaskState::Failed);
        assert_eq!(status.stage, Stage::Failed);
        assert_eq!(status.percent, 100);
        let error = status.error.unwrap();
        assert_eq!(error.category, ErrorCategory::LookupFailed);
        assert!(error.message.contains("Atlantis"), "{}", error.message);
        assert!(matches!(h.manager.fetch_result(id).unwrap_err(), TaskError::NotFound(_)));
    }

    #[test]
    fn worker_panic_fails_the_task_as_internal() {
        let h = harness(PanickingGeocoder);
        let id = h.manager.submit("Alpha", "Bravo").unwrap();
        let status = wait_terminal(&h.manager, id);

        assert_eq!(status.state, TaskState::Failed);
        let error = status.error.unwrap();
        assert_eq!(error.category, ErrorCategory::Internal);
        assert!(error.message.contains("gazetteer corrupted"), "{}", error.message);

        // Both workers survive the panic.
        wait_idle(&h.manager);
        assert_eq!(h.manager.workers(), 2);
    }

    #[test]
    fn stalled_task_fails_on_lease_expiry_and_late_result_is_dropped() {
        let gate = Gate::default();
        let h = harness(GatedGeocoder { inner: gazetteer(), gate: gate.clone() });
        let id = h.manager.submit("Alpha", "Bravo").unwrap();
        wait_until(&h.manager, id, |s| s.stage == Stage::Coordinates);

        h.clock.advance(Duration::from_secs(30));
        assert_eq!(h.manager.poll(id).unwrap().state, TaskState::Running, "lease boundary is inclusive");

        h.clock.advance(Duration::from_millis(1));
        let status = h.manager.poll(id).unwrap();
        assert_eq!(status.state, TaskState::Failed);
        assert_eq!(status.error.as_ref().map(|e| e.category), Some(ErrorCategory::LeaseExpired));

        gate.open();
        wait_idle(&h.manager);
        let status = h.manager.poll(id).unwrap();
        assert_eq!(status.state, TaskState::Failed);
        assert_eq!(status.error.map(|e| e.category), Some(ErrorCategory::LeaseExpired));
        assert!(matches!(h.manager.fetch_result(id).unwrap_err(), TaskError::NotFound(_)));
    }

    #[test]
    fn concurrent_tasks_with_slow_weather_never_nest_on_a_worker() {
        let nested = Arc::new(AtomicUsize::new(0));
        let artifacts = MemoryStore::default();
        let pipeline = pipeline(
            NestingGeocoder { inner: gazetteer(), nested: nested.clone() },
            SlowSkies(Duration::from_millis(30)),
            ClosingStore(artifacts.clone()),
        );
        let manager = build_manager(pipeline, Arc::new(InMemoryTaskStore::new()), Arc::new(ManualClock::new(START_MS)));

        let ids: Vec<TaskId> = (0..12).map(|_| manager.submit("Alpha", "Bravo").unwrap()).collect();
        for &id in &ids {
            assert_eq!(wait_terminal(&manager, id).state, TaskState::Succeeded);
        }
        wait_idle(&manager);

        assert_eq!(nested.load(Ordering::SeqCst), 0, "a task started inside another task's run");
        assert_eq!(artifacts.saved.lock().unwrap().len(), 12);
    }

    #[test]
    fn queued_record_no_worker_will_claim_fails_on_poll() {
        let h = harness(gazetteer());
        let orphan = TaskRecord::new(TaskId::new(), LocationPair::new("Alpha", "Bravo").unwrap(), START_MS);
        let id = orphan.id;
        h.manager.store().insert(orphan).unwrap();
        h.clock.advance(Duration::from_secs(24 * 60 * 60));

        let status = h.manager.poll(id).unwrap();
        assert_eq!(status.state, TaskState::Failed);
        assert_eq!(status.stage, Stage::Failed);
        assert_eq!(status.error.map(|e| e.category), Some(ErrorCategory::LeaseExpired));
        assert!(matches!(h.manager.fetch_result(id).unwrap_err(), TaskError::NotFound(_)));
    }

    #[test]
    fn queued_tasks_behind_busy_workers_stay_queued() {
        let gate = Gate::default();
        let h = harness(GatedGeocoder { inner: gazetteer(), gate: gate.clone() });
        let ids: Vec<TaskId> = (0..4).map(|_| h.manager.submit("Alpha", "Bravo").unwrap()).collect();
        for &id in &ids {
            let state = h.manager.poll(id).unwrap().state;
            assert!(matches!(state, TaskState::Queued | TaskState::Running), "{state}");
        }

        gate.open();
        for &id in &ids {
            assert_eq!(wait_terminal(&h.manager, id).state, TaskState::Succeeded);
        }
    }

    #[test]
    fn unfinished_records_from_an_earlier_run_fail_at_startup() {
        let store = Arc::new(InMemoryTaskStore::new());
        let pair = LocationPair::new("Alpha", "Bravo").unwrap();
        let queued = TaskRecord::new(TaskId::new(), pair.clone(), START_MS);
        let mut running = TaskRecord::new(TaskId::new(), pair.clone(), START_MS);
        running.claim(START_MS);
        let mut done = TaskRecord::new(TaskId::new(), pair, START_MS);
        done.claim(START_MS);
        done.finish(TaskOutcome::Succeeded(ArtifactRef::new("mem://done.geojson")), START_MS);
        for record in [&queued, &running, &done] {
            store.insert(record.clone()).unwrap();
        }

        let h = harness_with_store(gazetteer(), store.clone());
        assert!(store.unfinished().unwrap().is_empty());
        for id in [queued.id, running.id] {
            let status = h.manager.poll(id).unwrap();
            assert_eq!(status.state, TaskState::Failed);
            let error = status.error.unwrap();
            assert_eq!(error.category, ErrorCategory::LeaseExpired);
            assert!(error.message.contains("interrupted"), "{}", error.message);
        }
        assert_eq!(h.manager.fetch_result(done.id).unwrap(), ArtifactRef::new("mem://done.geojson"));
        assert!(h.artifacts.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn finished_tasks_expire_after_retention() {
        let h = harness(gazetteer());
        let id = h.manager.submit("Alpha", "Bravo").unwrap();
        wait_terminal(&h.manager, id);
        wait_idle(&h.manager);

        h.clock.advance(Duration::from_secs(60));
        assert!(h.manager.fetch_result(id).is_ok());

        h.clock.advance(Duration::from_millis(1));
        assert!(matches!(h.manager.fetch_result(id).unwrap_err(), TaskError::NotFound(_)));
        assert!(matches!(h.manager.poll(id).unwrap_err(), TaskError::UnknownTask(_)));
        assert_eq!(h.manager.store().len().unwrap(), 0);
    }

    #[test]
    fn synchronous_run_leaves_no_record() {
        let h = harness(gazetteer());
        let artifact = h.manager.run("Alpha", "Bravo").unwrap();
        assert_eq!(artifact.to_string(), "mem://alpha_to_bravo.geojson");
        assert_eq!(h.manager.store().len().unwrap(), 0);
    }

    #[test]
    fn synchronous_run_errors() {
        let h = harness(gazetteer());
        assert!(matches!(h.manager.run(" ", "Bravo").unwrap_err(), TaskError::InvalidInput(_)));
        let err = h.manager.run("Alpha", "Atlantis").unwrap_err();
        assert!(matches!(err, TaskError::Pipeline(PipelineError::LookupFailed(_))), "{err}");
        assert_eq!(err.category(), ErrorCategory::LookupFailed);
    }
}
