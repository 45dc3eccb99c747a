use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{UpdateError, UpdateFault, UpdateTarget};
use crate::registry::{MapRegistry, SessionRegistry};

/// What one pass of the pipeline did.
///
/// `*_dispatched` counts every `update()` call made, including ones that
/// faulted. A map or session whose `is_active` or `attached_entity` check
/// panicked is counted in neither column, only in `faults`.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub tick: u64,
    pub maps_dispatched: usize,
    pub maps_inactive: usize,
    pub entities_dispatched: usize,
    pub sessions_without_entity: usize,
    pub faults: Vec<UpdateFault>,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Dispatches one update per active map, then one per attached entity.
///
/// Runs on the scheduler thread only. Updates are synchronous and cannot be
/// preempted: a budget only flags overruns after the fact, so an update that
/// never returns stalls the whole server.
#[derive(Clone)]
pub struct WorldPipeline {
    maps: MapRegistry,
    sessions: SessionRegistry,
    update_budget: Option<Duration>,
}

impl WorldPipeline {
    pub fn new(maps: MapRegistry, sessions: SessionRegistry) -> Self {
        Self {
            maps,
            sessions,
            update_budget: None,
        }
    }

    /// Treat any single update slower than `budget` as a fault.
    pub fn with_update_budget(mut self, budget: Option<Duration>) -> Self {
        self.update_budget = budget;
        self
    }

    pub fn maps(&self) -> &MapRegistry {
        &self.maps
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn update_budget(&self) -> Option<Duration> {
        self.update_budget
    }

    /// Run the map phase and then the entity phase for `tick`.
    ///
    /// Every collaborator call for one map or session, including the
    /// `is_active` and `attached_entity` checks, runs inside the same
    /// isolation as its `update()`.
    pub fn run_tick(&self, tick: u64) -> PipelineReport {
        let _span = tracing::trace_span!("pipeline", tick).entered();
        let start = Instant::now();
        let mut report = PipelineReport {
            tick,
            ..PipelineReport::default()
        };

        for (index, map) in self.maps.snapshot() {
            let target = UpdateTarget::Map(index);
            let mut visit = Visit::default();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut map = map.lock();
                if !map.is_active() {
                    visit.skipped = true;
                    return Ok(());
                }
                visit.dispatched = true;
                visit.timed(|| map.update())
            }));
            if visit.skipped {
                report.maps_inactive += 1;
            }
            if visit.dispatched {
                report.maps_dispatched += 1;
            }
            if let Some(fault) = self.fault(target, &visit, outcome) {
                let name = panic::catch_unwind(AssertUnwindSafe(|| map.lock().name()))
                    .unwrap_or_default();
                tracing::warn!(tick, map = %index, name = %name, "{fault}");
                report.faults.push(fault);
            }
        }

        for (session_id, session) in self.sessions.snapshot() {
            let mut target = UpdateTarget::Session(session_id);
            let mut visit = Visit::default();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut session = session.lock();
                let Some(entity) = session.attached_entity() else {
                    visit.skipped = true;
                    return Ok(());
                };
                target = UpdateTarget::Entity {
                    session: session_id,
                    entity: entity.id(),
                };
                visit.dispatched = true;
                visit.timed(|| entity.update())
            }));
            if visit.skipped {
                report.sessions_without_entity += 1;
            }
            if visit.dispatched {
                report.entities_dispatched += 1;
            }
            if let Some(fault) = self.fault(target, &visit, outcome) {
                tracing::warn!(tick, session = %session_id, "{fault}");
                report.faults.push(fault);
            }
        }

        report.elapsed = start.elapsed();
        report
    }

    fn fault(
        &self,
        target: UpdateTarget,
        visit: &Visit,
        outcome: thread::Result<Result<(), UpdateError>>,
    ) -> Option<UpdateFault> {
        match outcome {
            Ok(Ok(())) => match self.update_budget {
                Some(budget) if visit.dispatched && visit.elapsed > budget => {
                    Some(UpdateFault::DeadlineExceeded {
                        target,
                        elapsed: visit.elapsed,
                        budget,
                    })
                }
                _ => None,
            },
            Ok(Err(err)) => Some(UpdateFault::Failed {
                target,
                message: err.to_string(),
            }),
            Err(payload) => Some(UpdateFault::Panicked {
                target,
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

/// How far one isolated map or session visit got.
#[derive(Debug, Default)]
struct Visit {
    skipped: bool,
    dispatched: bool,
    elapsed: Duration,
}

impl Visit {
    fn timed(
        &mut self,
        update: impl FnOnce() -> Result<(), UpdateError>,
    ) -> Result<(), UpdateError> {
        let start = Instant::now();
        let result = update();
        self.elapsed = start.elapsed();
        result
    }
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("non-string panic payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Entity, GameMap, Session};
    use parking_lot::Mutex;
    use shardloop_common::{EntityId, MapIndex};
    use std::sync::Arc;

    type CallLog = Arc<Mutex<Vec<String>>>;

    struct ScriptedMap {
        label: &'static str,
        active: bool,
        fail: bool,
        log: CallLog,
    }

    impl GameMap for ScriptedMap {
        fn is_active(&self) -> bool {
            self.active
        }

        fn update(&mut self) -> Result<(), UpdateError> {
            self.log.lock().push(self.label.to_string());
            if self.fail {
                return Err(UpdateError::simulation("spawn table corrupt"));
            }
            Ok(())
        }

        fn name(&self) -> String {
            self.label.to_string()
        }
    }

    struct PanickingMap;

    impl GameMap for PanickingMap {
        fn is_active(&self) -> bool {
            true
        }

        fn update(&mut self) -> Result<(), UpdateError> {
            panic!("trigger index out of range");
        }
    }

    /// Panics while the pipeline asks whether it is active.
    struct UnloadedMap;

    impl GameMap for UnloadedMap {
        fn is_active(&self) -> bool {
            panic!("map data not loaded");
        }

        fn update(&mut self) -> Result<(), UpdateError> {
            Ok(())
        }
    }

    struct SlowMap;

    impl GameMap for SlowMap {
        fn is_active(&self) -> bool {
            true
        }

        fn update(&mut self) -> Result<(), UpdateError> {
            std::thread::sleep(Duration::from_millis(5));
            Ok(())
        }
    }

    struct LoggedEntity {
        id: EntityId,
        label: &'static str,
        log: CallLog,
    }

    impl Entity for LoggedEntity {
        fn id(&self) -> EntityId {
            self.id
        }

        fn update(&mut self) -> Result<(), UpdateError> {
            self.log.lock().push(self.label.to_string());
            Ok(())
        }
    }

    struct Client {
        entity: Option<Box<dyn Entity>>,
    }

    impl Session for Client {
        fn attached_entity(&mut self) -> Option<&mut (dyn Entity + 'static)> {
            self.entity.as_deref_mut()
        }
    }

    /// Session whose entity lookup panics mid-handshake.
    struct HalfOpenClient;

    impl Session for HalfOpenClient {
        fn attached_entity(&mut self) -> Option<&mut (dyn Entity + 'static)> {
            panic!("character slot missing");
        }
    }

    fn map(label: &'static str, active: bool, log: &CallLog) -> ScriptedMap {
        ScriptedMap {
            label,
            active,
            fail: false,
            log: Arc::clone(log),
        }
    }

    fn client(label: &'static str, log: &CallLog) -> Client {
        Client {
            entity: Some(Box::new(LoggedEntity {
                id: EntityId::new(),
                label,
                log: Arc::clone(log),
            })),
        }
    }

    #[test]
    fn empty_registries_are_a_noop() {
        let pipeline = WorldPipeline::new(MapRegistry::new(), SessionRegistry::new());
        let report = pipeline.run_tick(1);
        assert_eq!(report.maps_dispatched, 0);
        assert_eq!(report.entities_dispatched, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn maps_run_before_entities_in_fixed_order() {
        let log = CallLog::default();
        let maps = MapRegistry::new();
        let sessions = SessionRegistry::new();
        sessions.connect(client("e1", &log));
        maps.insert(map("m0", true, &log));
        sessions.connect(client("e2", &log));
        maps.insert(map("m1", true, &log));

        let report = WorldPipeline::new(maps, sessions).run_tick(1);
        assert_eq!(*log.lock(), vec!["m0", "m1", "e1", "e2"]);
        assert_eq!(report.maps_dispatched, 2);
        assert_eq!(report.entities_dispatched, 2);
    }

    #[test]
    fn inactive_map_is_never_updated() {
        let log = CallLog::default();
        let maps = MapRegistry::new();
        let dormant = maps.insert(map("dormant", false, &log));
        let pipeline = WorldPipeline::new(maps.clone(), SessionRegistry::new());

        for tick in 1..=50 {
            let report = pipeline.run_tick(tick);
            assert_eq!(report.maps_inactive, 1);
        }
        assert!(log.lock().is_empty());

        maps.insert_at(dormant, map("dormant", true, &log));
        pipeline.run_tick(51);
        assert_eq!(*log.lock(), vec!["dormant"]);
    }

    #[test]
    fn session_without_entity_is_skipped() {
        let log = CallLog::default();
        let sessions = SessionRegistry::new();
        sessions.connect(Client { entity: None });
        sessions.connect(client("e1", &log));

        let report = WorldPipeline::new(MapRegistry::new(), sessions).run_tick(1);
        assert_eq!(report.sessions_without_entity, 1);
        assert_eq!(report.entities_dispatched, 1);
        assert!(report.is_clean());
        assert_eq!(*log.lock(), vec!["e1"]);
    }

    #[test]
    fn failing_map_does_not_abort_the_tick() {
        let log = CallLog::default();
        let maps = MapRegistry::new();
        maps.insert(map("m0", true, &log));
        let broken = maps.insert(ScriptedMap {
            fail: true,
            ..map("m1", true, &log)
        });
        maps.insert(map("m2", true, &log));
        let sessions = SessionRegistry::new();
        sessions.connect(client("e1", &log));

        let report = WorldPipeline::new(maps, sessions).run_tick(7);
        assert_eq!(*log.lock(), vec!["m0", "m1", "m2", "e1"]);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].target(), UpdateTarget::Map(broken));
        assert!(matches!(report.faults[0], UpdateFault::Failed { .. }));
    }

    #[test]
    fn panicking_map_is_isolated() {
        let log = CallLog::default();
        let maps = MapRegistry::new();
        maps.insert(PanickingMap);
        maps.insert(map("m1", true, &log));
        let sessions = SessionRegistry::new();
        sessions.connect(client("e1", &log));
        let pipeline = WorldPipeline::new(maps, sessions);

        let report = pipeline.run_tick(1);
        assert_eq!(*log.lock(), vec!["m1", "e1"]);
        match &report.faults[..] {
            [UpdateFault::Panicked { target, message }] => {
                assert_eq!(*target, UpdateTarget::Map(MapIndex(0)));
                assert!(message.contains("out of range"));
            }
            other => panic!("unexpected faults: {other:?}"),
        }

        // the map stays usable on the next tick
        let report = pipeline.run_tick(2);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(log.lock().len(), 4);
    }

    #[test]
    fn overrunning_update_is_flagged() {
        let maps = MapRegistry::new();
        maps.insert(SlowMap);
        let pipeline = WorldPipeline::new(maps, SessionRegistry::new())
            .with_update_budget(Some(Duration::from_micros(100)));

        let report = pipeline.run_tick(1);
        assert_eq!(report.maps_dispatched, 1);
        assert!(matches!(
            report.faults[..],
            [UpdateFault::DeadlineExceeded { .. }]
        ));
    }

    #[test]
    fn detached_entity_between_ticks_is_skipped() {
        let log = CallLog::default();
        let sessions = SessionRegistry::new();
        let shared = Arc::new(Mutex::new(client("e1", &log)));
        sessions.connect_shared(shared.clone());
        let pipeline = WorldPipeline::new(MapRegistry::new(), sessions);
        assert_eq!(pipeline.run_tick(1).entities_dispatched, 1);

        // the network collaborator detaches the entity on logout
        shared.lock().entity = None;

        let report = pipeline.run_tick(2);
        assert_eq!(report.entities_dispatched, 0);
        assert_eq!(report.sessions_without_entity, 1);
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn panicking_activity_check_is_isolated() {
        let log = CallLog::default();
        let maps = MapRegistry::new();
        maps.insert(UnloadedMap);
        maps.insert(map("m1", true, &log));
        let sessions = SessionRegistry::new();
        sessions.connect(client("e1", &log));

        let report = WorldPipeline::new(maps, sessions).run_tick(1);
        assert_eq!(*log.lock(), vec!["m1", "e1"]);
        assert_eq!(report.maps_dispatched, 1);
        assert_eq!(report.maps_inactive, 0);
        match &report.faults[..] {
            [UpdateFault::Panicked { target, message }] => {
                assert_eq!(*target, UpdateTarget::Map(MapIndex(0)));
                assert!(message.contains("not loaded"));
            }
            other => panic!("unexpected faults: {other:?}"),
        }
    }

    #[test]
    fn panicking_entity_lookup_is_isolated() {
        let log = CallLog::default();
        let sessions = SessionRegistry::new();
        let broken = sessions.connect(HalfOpenClient);
        sessions.connect(client("e1", &log));

        let report = WorldPipeline::new(MapRegistry::new(), sessions).run_tick(1);
        assert_eq!(*log.lock(), vec!["e1"]);
        assert_eq!(report.entities_dispatched, 1);
        assert_eq!(report.sessions_without_entity, 0);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].target(), UpdateTarget::Session(broken));
    }
}
