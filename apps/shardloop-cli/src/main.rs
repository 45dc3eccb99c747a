mod demo;

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use shardloop_kernel::{MapRegistry, SessionRegistry, WorldPipeline};
use shardloop_pacing::PacingMode;
use shardloop_server::{
    NetworkSender, QueuedNetwork, SchedulerMonitor, ServerConfig, ShutdownHandle, TickScheduler,
};
use shardloop_tools::{LoopInspector, apply_console_command, parse_console_command};
use tracing_subscriber::EnvFilter;

use crate::demo::{DemoMap, DemoSession};

#[derive(Parser)]
#[command(name = "shardloop-cli", about = "Headless shardloop tick server")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    FixedSleep,
    TargetTickDuration,
}

impl From<Strategy> for PacingMode {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::FixedSleep => PacingMode::FixedSleep,
            Strategy::TargetTickDuration => PacingMode::TargetTickDuration,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and default loop settings
    Info,
    /// Run the tick loop over demo maps and players
    Run {
        /// YAML server config
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Stop after this many ticks instead of waiting for Ctrl-C
        #[arg(short, long)]
        ticks: Option<u64>,
        /// Active maps to create
        #[arg(long, default_value = "4")]
        maps: usize,
        /// Dormant maps to create
        #[arg(long, default_value = "2")]
        inactive: usize,
        /// Players joining through the network queue
        #[arg(long, default_value = "8")]
        sessions: usize,
        /// Turn the rate lock on
        #[arg(long)]
        throttle: bool,
        /// Throttle interval in milliseconds
        #[arg(long)]
        interval_ms: Option<i64>,
        /// Pacing strategy while throttled
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
        /// Make the first map fail every N of its updates
        #[arg(long)]
        fault_every: Option<u64>,
        /// Read operator commands from stdin
        #[arg(long)]
        console: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            let defaults = ServerConfig::default();
            println!("shardloop-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "throttle: enabled={} interval={}ms strategy={:?}",
                defaults.throttle.enabled, defaults.throttle.interval_ms, defaults.throttle.strategy
            );
            println!("tick history: {}", defaults.tick_history);
        }
        Commands::Run {
            config,
            ticks,
            maps,
            inactive,
            sessions,
            throttle,
            interval_ms,
            strategy,
            fault_every,
            console,
        } => {
            let mut server_config = match config {
                Some(path) => ServerConfig::load(path)?,
                None => ServerConfig::default(),
            };
            if throttle {
                server_config.throttle.enabled = true;
            }
            if let Some(ms) = interval_ms {
                server_config.throttle.interval_ms = ms;
            }
            if let Some(strategy) = strategy {
                server_config.throttle.strategy = strategy.into();
            }
            server_config.validate()?;

            let map_registry = MapRegistry::new();
            for i in 0..maps {
                let faults = if i == 0 { fault_every } else { None };
                map_registry.insert(DemoMap::new(format!("field-{i}"), true, faults));
            }
            for i in 0..inactive {
                map_registry.insert(DemoMap::new(format!("dungeon-{i}"), false, None));
            }
            let session_registry = SessionRegistry::new();

            let (network, sender) = QueuedNetwork::new(session_registry.clone());
            let pipeline = WorldPipeline::new(map_registry.clone(), session_registry.clone());
            let shutdown = ShutdownHandle::new();
            let mut scheduler = TickScheduler::new(network, pipeline, &server_config)
                .with_shutdown(shutdown.clone());
            let monitor = scheduler.monitor();

            let on_signal = shutdown.clone();
            ctrlc::set_handler(move || on_signal.request_shutdown())?;

            spawn_lobby(sender.clone(), sessions, shutdown.clone());
            spawn_status(monitor.clone(), map_registry.clone(), session_registry.clone());
            if console {
                spawn_console(monitor.clone(), map_registry.clone(), session_registry.clone());
            }

            let summary = match ticks {
                Some(n) => scheduler.run_ticks(n)?,
                None => scheduler.run()?,
            };
            shutdown.request_shutdown();
            drop(sender);

            println!(
                "ran {} ticks, {} faults, last cps {}, avg tick {}us, max tick {}us",
                summary.ticks,
                summary.faults,
                summary.last_cps,
                summary.average_tick.as_micros(),
                summary.max_tick.as_micros()
            );
            println!(
                "{}",
                LoopInspector::summary(&monitor, &map_registry, &session_registry)
            );
        }
    }

    Ok(())
}

/// Simulated I/O thread: players handshake one by one; every third one
/// lingers on character select without an entity.
fn spawn_lobby(sender: NetworkSender, count: usize, shutdown: ShutdownHandle) {
    std::thread::spawn(move || {
        for i in 0..count {
            if shutdown.is_requested() {
                break;
            }
            let session = if i % 3 == 2 {
                DemoSession::lobby()
            } else {
                DemoSession::in_game()
            };
            if sender.connect(session).is_err() {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    });
}

fn spawn_status(monitor: SchedulerMonitor, maps: MapRegistry, sessions: SessionRegistry) {
    std::thread::spawn(move || {
        while !monitor.shutdown_requested() {
            std::thread::sleep(Duration::from_secs(1));
            tracing::info!("{}", LoopInspector::summary(&monitor, &maps, &sessions));
        }
    });
}

fn spawn_console(monitor: SchedulerMonitor, maps: MapRegistry, sessions: SessionRegistry) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_console_command(&line) {
                Ok(Some(command)) => {
                    println!("{}", apply_console_command(&command, &monitor, &maps, &sessions));
                }
                Ok(None) => {}
                Err(e) => println!("{e}"),
            }
            if monitor.shutdown_requested() {
                break;
            }
        }
    });
}
