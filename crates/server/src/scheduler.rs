use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use shardloop_kernel::{PipelineReport, WorldPipeline, panic_message};
use shardloop_metrics::{Clock, CpsHandle, MonotonicClock, TickMetrics, TickTimer};
use shardloop_pacing::{PacingStrategy, Sleeper, ThrottleConfig, ThrottleController};

use crate::config::ServerConfig;
use crate::error::{NetworkError, SchedulerError};
use crate::network::NetworkPoller;
use crate::shutdown::ShutdownHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Outcome of a single tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub pipeline: PipelineReport,
    /// Time spent polling and updating, before any throttle sleep.
    pub busy: Duration,
    pub slept: Duration,
    /// Set when this tick closed a CPS window.
    pub cps_published: Option<u64>,
}

/// Totals for a `run` or `run_ticks` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub faults: u64,
    pub last_cps: u64,
    pub average_tick: Duration,
    pub max_tick: Duration,
}

/// Read/admin surface of a running scheduler, safe to use from any thread.
#[derive(Debug, Clone)]
pub struct SchedulerMonitor {
    cps: CpsHandle,
    ticks: Arc<AtomicU64>,
    throttle: ThrottleConfig,
    shutdown: ShutdownHandle,
}

impl SchedulerMonitor {
    /// Ticks measured in the last completed 1-second window.
    pub fn current_cps(&self) -> u64 {
        self.cps.current_cps()
    }

    pub fn ticks_completed(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Live rate lock; changes apply from the next tick.
    pub fn throttle(&self) -> &ThrottleConfig {
        &self.throttle
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.is_requested()
    }
}

/// The server main loop.
///
/// Owns the network poller and drives the pipeline on the calling thread.
/// Updates run only here, so maps and entities need no locking of their own
/// beyond what their registries provide.
pub struct TickScheduler<N: NetworkPoller> {
    network: N,
    pipeline: WorldPipeline,
    clock: Arc<dyn Clock>,
    metrics: TickMetrics,
    throttle: ThrottleController,
    timer: TickTimer,
    shutdown: ShutdownHandle,
    ticks: Arc<AtomicU64>,
    faults: u64,
    state: LoopState,
}

impl<N: NetworkPoller> TickScheduler<N> {
    pub fn new(network: N, pipeline: WorldPipeline, config: &ServerConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
        let throttle = ThrottleController::new(config.throttle_config())
            .with_strategy(config.throttle.strategy.strategy());
        Self {
            network,
            pipeline: pipeline.with_update_budget(config.update_budget()),
            metrics: TickMetrics::new(clock.now()),
            clock,
            throttle,
            timer: TickTimer::new(config.tick_history),
            shutdown: ShutdownHandle::new(),
            ticks: Arc::new(AtomicU64::new(0)),
            faults: 0,
            state: LoopState::Running,
        }
    }

    /// Replace the time source. Restarts the CPS window at the new clock's now.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.metrics.restart(clock.now());
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.throttle = self.throttle.with_sleeper(sleeper);
        self
    }

    pub fn with_strategy(mut self, strategy: Box<dyn PacingStrategy>) -> Self {
        self.throttle = self.throttle.with_strategy(strategy);
        self
    }

    /// Use an externally created shutdown flag, e.g. one a signal handler holds.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn monitor(&self) -> SchedulerMonitor {
        SchedulerMonitor {
            cps: self.metrics.handle(),
            ticks: Arc::clone(&self.ticks),
            throttle: self.throttle.config().clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn current_cps(&self) -> u64 {
        self.metrics.current_cps()
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    pub fn pipeline(&self) -> &WorldPipeline {
        &self.pipeline
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Run one full tick. A network failure, returned or panicked, stops the
    /// scheduler.
    pub fn tick_once(&mut self) -> Result<TickReport, SchedulerError> {
        if self.state == LoopState::Stopped {
            return Err(SchedulerError::Stopped);
        }
        let tick = self.ticks.load(Ordering::Relaxed) + 1;
        let _span = tracing::debug_span!("tick", tick).entered();
        let start = self.clock.now();

        let network = &mut self.network;
        let polled = panic::catch_unwind(AssertUnwindSafe(|| network.poll_once()))
            .unwrap_or_else(|payload| {
                Err(NetworkError::Other(format!(
                    "poll panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
        if let Err(source) = polled {
            tracing::error!(tick, error = %source, "network poll failed; stopping tick loop");
            self.state = LoopState::Stopped;
            return Err(SchedulerError::Network { tick, source });
        }

        let pipeline = self.pipeline.run_tick(tick);
        self.faults += pipeline.faults.len() as u64;

        self.metrics.record_tick();
        let now = self.clock.now();
        let cps_published = self.metrics.maybe_roll_window(now);
        let busy = now.saturating_sub(start);
        self.timer.record(busy);
        self.ticks.store(tick, Ordering::Relaxed);

        let slept = self.throttle.throttle(busy);

        Ok(TickReport {
            tick,
            pipeline,
            busy,
            slept,
            cps_published,
        })
    }

    /// Block running ticks until shutdown is requested, then stop.
    ///
    /// Returns after the in-flight tick finishes; no tick starts once the
    /// request is observed.
    pub fn run(&mut self) -> Result<RunSummary, SchedulerError> {
        if self.state == LoopState::Stopped {
            return Err(SchedulerError::Stopped);
        }
        tracing::info!(
            throttled = self.throttle.should_throttle(),
            strategy = self.throttle.strategy_name(),
            "tick loop starting"
        );
        let summary = self.drive(None)?;
        self.state = LoopState::Stopped;
        tracing::info!(
            ticks = summary.ticks,
            faults = summary.faults,
            cps = summary.last_cps,
            "tick loop stopped"
        );
        Ok(summary)
    }

    /// Run at most `count` ticks, stopping early on shutdown. The scheduler
    /// stays usable afterwards unless shutdown was requested.
    pub fn run_ticks(&mut self, count: u64) -> Result<RunSummary, SchedulerError> {
        if self.state == LoopState::Stopped {
            return Err(SchedulerError::Stopped);
        }
        let summary = self.drive(Some(count))?;
        if self.shutdown.is_requested() {
            self.state = LoopState::Stopped;
        }
        Ok(summary)
    }

    fn drive(&mut self, limit: Option<u64>) -> Result<RunSummary, SchedulerError> {
        let first = self.ticks.load(Ordering::Relaxed);
        if first == 0 {
            // measure the first window from loop entry, not construction
            self.metrics.restart(self.clock.now());
        }
        let faults_before = self.faults;
        loop {
            if self.shutdown.is_requested() {
                break;
            }
            let ran = self.ticks.load(Ordering::Relaxed) - first;
            if limit.is_some_and(|limit| ran >= limit) {
                break;
            }
            self.tick_once()?;
        }
        Ok(RunSummary {
            ticks: self.ticks.load(Ordering::Relaxed) - first,
            faults: self.faults - faults_before,
            last_cps: self.metrics.current_cps(),
            average_tick: self.timer.average(),
            max_tick: self.timer.max(),
        })
    }
}
