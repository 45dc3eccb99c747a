use shardloop_kernel::{MapRegistry, SessionRegistry};
use shardloop_server::SchedulerMonitor;

/// Read-only view over a running loop for status lines and dashboards.
pub struct LoopInspector;

impl LoopInspector {
    pub fn summary(
        monitor: &SchedulerMonitor,
        maps: &MapRegistry,
        sessions: &SessionRegistry,
    ) -> LoopSummary {
        let throttle = monitor.throttle();
        LoopSummary {
            tick: monitor.ticks_completed(),
            cps: monitor.current_cps(),
            throttled: throttle.enabled() && throttle.effective_interval().is_some(),
            interval_ms: throttle.interval_ms(),
            maps_active: maps.active_count(),
            maps_loaded: maps.occupied(),
            sessions: sessions.len(),
            shutting_down: monitor.shutdown_requested(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    pub tick: u64,
    pub cps: u64,
    pub throttled: bool,
    pub interval_ms: i64,
    pub maps_active: usize,
    pub maps_loaded: usize,
    pub sessions: usize,
    pub shutting_down: bool,
}

impl std::fmt::Display for LoopSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tick={} cps={} throttle=", self.tick, self.cps)?;
        if self.throttled {
            write!(f, "on({}ms)", self.interval_ms)?;
        } else {
            write!(f, "off")?;
        }
        write!(
            f,
            " maps={}/{} sessions={}",
            self.maps_active, self.maps_loaded, self.sessions
        )?;
        if self.shutting_down {
            write!(f, " [shutting down]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardloop_kernel::{GameMap, UpdateError, WorldPipeline};
    use shardloop_server::{NetworkError, NetworkPoller, ServerConfig, TickScheduler};

    struct Quiet;

    impl NetworkPoller for Quiet {
        fn poll_once(&mut self) -> Result<(), NetworkError> {
            Ok(())
        }
    }

    struct Field(bool);

    impl GameMap for Field {
        fn is_active(&self) -> bool {
            self.0
        }

        fn update(&mut self) -> Result<(), UpdateError> {
            Ok(())
        }
    }

    #[test]
    fn summary_reflects_loop_state() {
        let maps = MapRegistry::new();
        maps.insert(Field(true));
        maps.insert(Field(false));
        let sessions = SessionRegistry::new();
        let pipeline = WorldPipeline::new(maps.clone(), sessions.clone());
        let mut scheduler = TickScheduler::new(Quiet, pipeline, &ServerConfig::default());
        scheduler.run_ticks(3).unwrap();

        let summary = LoopInspector::summary(&scheduler.monitor(), &maps, &sessions);
        assert_eq!(summary.tick, 3);
        assert_eq!(summary.maps_active, 1);
        assert_eq!(summary.maps_loaded, 2);
        assert!(!summary.throttled);
        assert_eq!(
            summary.to_string(),
            "tick=3 cps=0 throttle=off maps=1/2 sessions=0"
        );
    }

    #[test]
    fn display_shows_interval_when_locked() {
        let summary = LoopSummary {
            tick: 10,
            cps: 98,
            throttled: true,
            interval_ms: 10,
            maps_active: 0,
            maps_loaded: 0,
            sessions: 2,
            shutting_down: true,
        };
        let s = summary.to_string();
        assert!(s.contains("throttle=on(10ms)"));
        assert!(s.ends_with("[shutting down]"));
    }
}
