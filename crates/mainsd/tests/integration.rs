//! Integration tests for mainsd
//!
//! These drive full battery episodes through the real file-backed marker
//! store with scripted sampler and executor mocks, exercising the same
//! sample -> decide -> apply -> dispatch sequence the daemon loop runs.

use mains_config::{Config, Target};
use mains_core::{DecisionEngine, MarkerMutation, ShutdownDispatcher, TickOutcome};
use mains_host_api::{MockExecutor, PowerSample, PowerSource};
use mains_store::{FileMarkerStore, MarkerFiles, MarkerKind, MarkerStore, MarkerView};
use mains_util::{TargetId, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn make_test_config(dir: &TempDir, hosts: &[&str]) -> Config {
    Config {
        battery_file: dir.path().join("battery_onset"),
        shutdown_flag: dir.path().join("shutdown_issued"),
        status_file: dir.path().join("last_status"),
        ac_restore_file: dir.path().join("ac_restore"),
        journal_file: dir.path().join("journal.jsonl"),
        grace: Duration::from_secs(1500),
        poll_interval: Duration::from_secs(60),
        status_interval: Duration::from_secs(3600),
        low_battery: 10,
        ac_stable: Duration::from_secs(300),
        targets: hosts
            .iter()
            .map(|h| Target {
                user: "root".into(),
                host: h.to_string(),
            })
            .collect(),
    }
}

/// One sequential poll tick, the way the daemon loop runs it
struct Harness {
    engine: DecisionEngine,
    dispatcher: ShutdownDispatcher,
    store: Arc<FileMarkerStore>,
    exec: Arc<MockExecutor>,
}

impl Harness {
    fn new(config: &Config) -> Self {
        let store = Arc::new(FileMarkerStore::new(
            MarkerFiles {
                battery_onset: config.battery_file.clone(),
                shutdown_issued: config.shutdown_flag.clone(),
                ac_restore_onset: config.ac_restore_file.clone(),
                last_status: config.status_file.clone(),
            },
            config.target_ids(),
        ));
        let exec = Arc::new(MockExecutor::new());

        Self {
            engine: DecisionEngine::new(config),
            dispatcher: ShutdownDispatcher::new(exec.clone(), store.clone()),
            store,
            exec,
        }
    }

    async fn tick(&self, sample: PowerSample, now_secs: i64) -> TickOutcome {
        let now = Timestamp::from_secs(now_secs);
        let view = MarkerView::read(self.store.as_ref());
        let outcome = self.engine.tick(&view, sample, now);

        for mutation in &outcome.mutations {
            match mutation {
                MarkerMutation::Set(kind, ts) => self.store.set(*kind, *ts).unwrap(),
                MarkerMutation::Clear(kind) => self.store.clear(*kind).unwrap(),
                MarkerMutation::ClearEpisode => self.store.clear_episode().unwrap(),
            }
        }

        if let Some(request) = &outcome.dispatch {
            self.dispatcher.dispatch(request, now).await;
        }

        outcome
    }
}

fn battery(percent: u8) -> PowerSample {
    PowerSample::new(percent, PowerSource::Battery)
}

fn ac(percent: u8) -> PowerSample {
    PowerSample::new(percent, PowerSource::Ac)
}

#[tokio::test]
async fn full_episode_grace_expiry_then_ac_recovery() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(&dir, &["nas", "backup"]);
    let harness = Harness::new(&config);
    let nas = TargetId::new("root", "nas");
    let backup = TargetId::new("root", "backup");

    // t=0: power fails, episode begins
    harness.tick(battery(80), 0).await;
    assert!(harness.store.get(MarkerKind::BatteryOnset).is_some());
    assert!(harness.exec.calls().is_empty());

    // t=600: still waiting
    harness.tick(battery(70), 600).await;
    assert!(harness.exec.calls().is_empty());

    // t=1500: grace expired, both targets shut down
    harness.tick(battery(60), 1500).await;
    assert_eq!(harness.exec.call_count(&nas), 1);
    assert_eq!(harness.exec.call_count(&backup), 1);
    assert!(harness.store.get(MarkerKind::ShutdownIssued).is_some());

    // t=1560: repeated battery tick, nobody re-notified
    harness.tick(battery(55), 1560).await;
    assert_eq!(harness.exec.call_count(&nas), 1);
    assert_eq!(harness.exec.call_count(&backup), 1);

    // t=2000: AC returns, stability window opens
    harness.tick(ac(56), 2000).await;
    assert!(harness.store.get(MarkerKind::AcRestoreOnset).is_some());
    assert!(harness.store.get(MarkerKind::ShutdownIssued).is_some());

    // t=2300: stable long enough, full reset
    harness.tick(ac(60), 2300).await;
    assert!(harness.store.get(MarkerKind::BatteryOnset).is_none());
    assert!(harness.store.get(MarkerKind::ShutdownIssued).is_none());
    assert!(harness.store.get(MarkerKind::AcRestoreOnset).is_none());
    assert!(harness.store.issued_targets().is_empty());

    // A new power failure starts a fresh episode with fresh dispatches
    harness.tick(battery(50), 3000).await;
    harness.tick(battery(45), 3000 + 1500).await;
    assert_eq!(harness.exec.call_count(&nas), 2);
    assert_eq!(harness.exec.call_count(&backup), 2);
}

#[tokio::test]
async fn critical_battery_bypasses_grace_on_first_tick() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(&dir, &["nas"]);
    let harness = Harness::new(&config);
    let nas = TargetId::new("root", "nas");

    // 7% < 10% threshold: dispatch on the very first tick, no episode needed
    harness.tick(battery(7), 0).await;
    assert_eq!(harness.exec.call_count(&nas), 1);
    assert!(harness.store.get(MarkerKind::ShutdownIssued).is_some());
    assert!(harness.store.get(MarkerKind::BatteryOnset).is_none());
}

#[tokio::test]
async fn restart_mid_episode_keeps_the_original_onset() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(&dir, &["nas"]);
    let nas = TargetId::new("root", "nas");

    // First daemon instance observes the power failure
    {
        let harness = Harness::new(&config);
        harness.tick(battery(80), 0).await;
        assert!(harness.exec.calls().is_empty());
    }

    // Unplanned crash and restart: a fresh instance reads the same markers
    // and the grace clock keeps counting from t=0
    let harness = Harness::new(&config);
    harness.tick(battery(60), 1600).await;
    assert_eq!(harness.exec.call_count(&nas), 1);
}

#[tokio::test]
async fn transient_ac_does_not_reset_the_grace_clock() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(&dir, &["nas"]);
    let harness = Harness::new(&config);
    let nas = TargetId::new("root", "nas");

    harness.tick(battery(80), 0).await;

    // AC flickers back for less than ac_stable
    harness.tick(ac(80), 1000).await;
    assert!(harness.store.get(MarkerKind::AcRestoreOnset).is_some());

    // Back on battery: the stability countdown dies, the onset survives
    harness.tick(battery(75), 1100).await;
    assert!(harness.store.get(MarkerKind::AcRestoreOnset).is_none());
    assert_eq!(
        harness.store.get(MarkerKind::BatteryOnset),
        Some(Timestamp::from_secs(0))
    );

    // Grace still measures from the original onset
    harness.tick(battery(70), 1500).await;
    assert_eq!(harness.exec.call_count(&nas), 1);
}

#[tokio::test]
async fn failed_target_is_retried_until_it_succeeds() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(&dir, &["nas", "backup"]);
    let harness = Harness::new(&config);
    let nas = TargetId::new("root", "nas");
    let backup = TargetId::new("root", "backup");

    harness.exec.set_failing(backup.clone(), true);

    harness.tick(battery(80), 0).await;
    harness.tick(battery(60), 1500).await;

    // First pass: nas issued, backup failed and left unissued
    assert!(harness.store.target_issued(&nas).is_some());
    assert!(harness.store.target_issued(&backup).is_none());
    assert!(harness.store.get(MarkerKind::ShutdownIssued).is_some());

    // Next tick retries only the unissued target
    harness.tick(battery(55), 1560).await;
    assert_eq!(harness.exec.call_count(&nas), 1);
    assert_eq!(harness.exec.call_count(&backup), 2);

    // Target recovers; the retry finally lands
    harness.exec.set_failing(backup.clone(), false);
    harness.tick(battery(50), 1620).await;
    assert!(harness.store.target_issued(&backup).is_some());

    // Fully issued: later ticks are quiet
    harness.tick(battery(45), 1680).await;
    assert_eq!(harness.exec.call_count(&nas), 1);
    assert_eq!(harness.exec.call_count(&backup), 3);
}

#[tokio::test]
async fn corrupt_marker_self_heals_into_a_fresh_episode() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(&dir, &["nas"]);
    let harness = Harness::new(&config);

    std::fs::write(&config.battery_file, "garbage\n").unwrap();

    // The corrupt onset reads as absent, so this tick starts a fresh episode
    harness.tick(battery(80), 500).await;
    assert_eq!(
        harness.store.get(MarkerKind::BatteryOnset),
        Some(Timestamp::from_secs(500))
    );
}

#[tokio::test]
async fn zero_stability_cancels_immediately_on_ac() {
    let dir = TempDir::new().unwrap();
    let mut config = make_test_config(&dir, &["nas"]);
    config.ac_stable = Duration::ZERO;
    let harness = Harness::new(&config);

    harness.tick(battery(80), 0).await;
    assert!(harness.store.get(MarkerKind::BatteryOnset).is_some());

    // Single AC tick cancels the episode with no debounce
    harness.tick(ac(80), 60).await;
    assert!(harness.store.get(MarkerKind::BatteryOnset).is_none());
    assert!(harness.store.get(MarkerKind::AcRestoreOnset).is_none());
}

#[tokio::test]
async fn terminate_cleanup_forfeits_timers() {
    let dir = TempDir::new().unwrap();
    let config = make_test_config(&dir, &["nas"]);
    let harness = Harness::new(&config);
    let nas = TargetId::new("root", "nas");

    harness.tick(battery(80), 0).await;
    harness.tick(battery(60), 1500).await;
    assert_eq!(harness.exec.call_count(&nas), 1);

    // The daemon's signal path clears everything
    harness.store.clear_all().unwrap();

    // A deliberate stop-start begins fresh: the grace clock restarts
    harness.tick(battery(55), 1600).await;
    assert_eq!(
        harness.store.get(MarkerKind::BatteryOnset),
        Some(Timestamp::from_secs(1600))
    );
    assert_eq!(harness.exec.call_count(&nas), 1);
}
