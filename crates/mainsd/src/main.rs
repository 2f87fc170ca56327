//! mainsd - the power-loss protection service
//!
//! This is the main entry point for the mainsd service.
//! It wires together all the components:
//! - Configuration loading
//! - Marker store and episode journal
//! - ACPI power sampler and SSH executor (with startup preflight)
//! - Decision engine and shutdown dispatcher
//! - The poll / status / signal loop

use anyhow::{Context, Result};
use clap::Parser;
use mains_config::{load_config, Config};
use mains_core::{
    DecisionEngine, EngineEvent, MarkerMutation, ShutdownDispatcher, StatusReporter, TickOutcome,
};
use mains_host_api::{PowerSample, PowerSampler, RemoteExecutor};
use mains_host_linux::{AcpiSampler, SshExecutor};
use mains_store::{
    EpisodeJournal, FileMarkerStore, JournalEvent, JournalEventType, MarkerFiles, MarkerStore,
    MarkerView,
};
use mains_util::{default_config_path, format_duration, Timestamp};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Backoff after a failed power sample. A failed sample is never interpreted
/// as on-AC or on-battery; the loop just waits longer before asking again.
const SAMPLE_BACKOFF: Duration = Duration::from_secs(60);

/// mainsd - Power-loss protection service for hosts without UPS integration
#[derive(Parser, Debug)]
#[command(name = "mainsd")]
#[command(about = "Power-loss protection service for hosts without UPS integration", long_about = None)]
struct Args {
    /// Configuration file path (default: /etc/mainsd/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    config: Config,
    engine: DecisionEngine,
    dispatcher: ShutdownDispatcher,
    reporter: StatusReporter,
    store: Arc<dyn MarkerStore>,
    sampler: Arc<dyn PowerSampler>,
    journal: EpisodeJournal,
    last_sample: Option<PowerSample>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        // Load configuration once; the engine never re-reads it mid-run
        let config = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            targets = config.targets.len(),
            "Configuration loaded"
        );

        // Create marker and journal parent directories
        for path in [
            &config.battery_file,
            &config.shutdown_flag,
            &config.status_file,
            &config.ac_restore_file,
            &config.journal_file,
        ] {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create state directory {:?}", dir))?;
            }
        }

        // Collaborator preflight; any failure here is fatal, no loop entered
        let sampler: Arc<dyn PowerSampler> =
            Arc::new(AcpiSampler::locate().context("Power sampler unavailable")?);

        let executor = SshExecutor::locate().context("Remote execution tool unavailable")?;
        executor
            .check_session()
            .await
            .context("No authenticated remote session")?;
        let executor: Arc<dyn RemoteExecutor> = Arc::new(executor);

        let store: Arc<dyn MarkerStore> = Arc::new(FileMarkerStore::new(
            MarkerFiles {
                battery_onset: config.battery_file.clone(),
                shutdown_issued: config.shutdown_flag.clone(),
                ac_restore_onset: config.ac_restore_file.clone(),
                last_status: config.status_file.clone(),
            },
            config.target_ids(),
        ));

        let journal = EpisodeJournal::new(config.journal_file.clone());
        if let Err(e) = journal.append(JournalEvent::new(
            Timestamp::now(),
            JournalEventType::DaemonStarted {
                targets: config.targets.len(),
            },
        )) {
            warn!(error = %e, "Failed to append journal event");
        }

        let engine = DecisionEngine::new(&config);
        let dispatcher = ShutdownDispatcher::new(executor, store.clone());
        let reporter = StatusReporter::new(config.status_interval);

        Ok(Self {
            config,
            engine,
            dispatcher,
            reporter,
            store,
            sampler,
            journal,
            last_sample: None,
        })
    }

    async fn run(mut self) -> Result<()> {
        // Termination signals trigger the cleanup path; anything else
        // (panic, abort) leaves the markers behind so a restart resumes
        // with timers intact.
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        let mut status_timer = tokio::time::interval(self.reporter.interval());
        status_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Consume the immediate first tick so the status arm waits a full
        // interval
        status_timer.tick().await;

        let mut next_poll = Instant::now();

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Poll tick: sample -> decide -> apply -> dispatch
                _ = tokio::time::sleep_until(next_poll) => {
                    let delay = self.tick().await;
                    next_poll = Instant::now() + delay;
                }

                // Status heartbeat, independent of the decision outcome
                _ = status_timer.tick() => {
                    if let Some(sample) = &self.last_sample {
                        self.reporter.report(self.store.as_ref(), sample, Timestamp::now());
                    }
                }
            }
        }

        self.cleanup();
        Ok(())
    }

    /// One poll tick. Returns the delay before the next poll.
    async fn tick(&mut self) -> Duration {
        let sample = match self.sampler.sample().await {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    error = %e,
                    backoff_secs = SAMPLE_BACKOFF.as_secs(),
                    "Power sample failed, backing off"
                );
                return SAMPLE_BACKOFF;
            }
        };
        self.last_sample = Some(sample);

        let now = Timestamp::now();
        let view = MarkerView::read(self.store.as_ref());
        let outcome = self.engine.tick(&view, sample, now);

        self.apply_mutations(&outcome);
        self.handle_events(&outcome, now);

        if let Some(request) = &outcome.dispatch {
            let summary = self.dispatcher.dispatch(request, now).await;
            for target in &summary.issued {
                self.record(
                    now,
                    JournalEventType::ShutdownIssued {
                        target: target.clone(),
                        reason: request.reason.to_string(),
                    },
                );
            }
            for (target, error) in &summary.failed {
                self.record(
                    now,
                    JournalEventType::DispatchFailed {
                        target: target.clone(),
                        error: error.to_string(),
                    },
                );
            }
        }

        self.config.poll_interval
    }

    fn apply_mutations(&self, outcome: &TickOutcome) {
        for mutation in &outcome.mutations {
            let result = match mutation {
                MarkerMutation::Set(kind, ts) => self.store.set(*kind, *ts),
                MarkerMutation::Clear(kind) => self.store.clear(*kind),
                MarkerMutation::ClearEpisode => self.store.clear_episode(),
            };
            if let Err(e) = result {
                error!(?mutation, error = %e, "Failed to apply marker mutation");
            }
        }
    }

    fn handle_events(&self, outcome: &TickOutcome, now: Timestamp) {
        for event in &outcome.events {
            match event {
                EngineEvent::EnteredBattery { percent, grace } => {
                    warn!(
                        percent,
                        "Running on battery, shutdown pending in {}",
                        format_duration(*grace)
                    );
                    self.record(now, JournalEventType::BatteryOnset { percent: *percent });
                }
                EngineEvent::GraceCountdown { remaining } => {
                    info!("On battery, shutdown in {}", format_duration(*remaining));
                }
                EngineEvent::GraceExpired { elapsed } => {
                    warn!(
                        "Battery grace period expired after {}",
                        format_duration(*elapsed)
                    );
                }
                EngineEvent::CriticalBattery { percent } => {
                    warn!(
                        percent,
                        threshold = self.config.low_battery,
                        "Battery critically low, dispatching immediately"
                    );
                }
                EngineEvent::AcRestored { stability } => {
                    if stability.is_zero() {
                        info!("AC power restored");
                    } else {
                        info!(
                            "AC power restored, observing stability for {}",
                            format_duration(*stability)
                        );
                    }
                    self.record(now, JournalEventType::AcRestored);
                }
                EngineEvent::StabilityCountdown { remaining } => {
                    info!("On AC, cancelling shutdown in {}", format_duration(*remaining));
                }
                EngineEvent::EpisodeCancelled { stable } => {
                    info!(
                        "AC power stable for {}, shutdown cancelled",
                        format_duration(*stable)
                    );
                    self.record(now, JournalEventType::EpisodeCancelled);
                }
                EngineEvent::StabilityInterrupted => {
                    warn!("Back on battery, stability countdown cancelled");
                }
                EngineEvent::StrayMarkerCleared => {
                    debug!("Cleared stray AC-restore marker while idle");
                }
            }
        }
    }

    fn record(&self, now: Timestamp, event: JournalEventType) {
        if let Err(e) = self.journal.append(JournalEvent::new(now, event)) {
            warn!(error = %e, "Failed to append journal event");
        }
    }

    /// Intentional termination forfeits in-progress grace and stability
    /// timers: all markers are cleared so the next start begins fresh.
    /// Crash paths never reach this.
    fn cleanup(&self) {
        let now = Timestamp::now();
        self.record(now, JournalEventType::MarkersCleared);
        self.record(now, JournalEventType::DaemonStopped);

        if let Err(e) = self.store.clear_all() {
            warn!(error = %e, "Failed to clear markers during shutdown");
        }

        info!("Markers cleared, shutdown complete");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "mainsd starting");

    // Create and run the service
    let service = Service::new(&args).await?;
    service.run().await
}
