//! Episode journal
//!
//! Append-only JSONL record of episode transitions, kept so a power event
//! can be reconstructed after the fact. Journal writes never influence the
//! decision path.

use mains_util::{TargetId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::StoreResult;

/// Types of journal events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEventType {
    /// Daemon started
    DaemonStarted { targets: usize },

    /// Daemon stopped via termination signal
    DaemonStopped,

    /// Battery episode began
    BatteryOnset { percent: u8 },

    /// Shutdown command succeeded against a target
    ShutdownIssued { target: TargetId, reason: String },

    /// Shutdown command failed against a target; will be retried
    DispatchFailed { target: TargetId, error: String },

    /// AC power observed again while an episode was pending
    AcRestored,

    /// Episode cancelled after AC stayed stable
    EpisodeCancelled,

    /// All markers cleared on intentional termination
    MarkersCleared,
}

/// Full journal event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEvent {
    /// Event timestamp, epoch seconds
    pub timestamp: i64,

    /// Same instant, human-readable
    pub time: String,

    /// Event type and details
    pub event: JournalEventType,
}

impl JournalEvent {
    pub fn new(ts: Timestamp, event: JournalEventType) -> Self {
        Self {
            timestamp: ts.as_secs(),
            time: ts.to_rfc3339(),
            event,
        }
    }
}

/// Append-only episode journal backed by a JSONL file
pub struct EpisodeJournal {
    path: PathBuf,
}

impl EpisodeJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one event as a single JSON line.
    pub fn append(&self, event: JournalEvent) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(&event)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Read back the most recent `limit` events. Unparsable lines are
    /// skipped rather than failing the read.
    pub fn tail(&self, limit: usize) -> StoreResult<Vec<JournalEvent>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let events: Vec<JournalEvent> = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        let skip = events.len().saturating_sub(limit);
        Ok(events.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_and_tail() {
        let dir = TempDir::new().unwrap();
        let journal = EpisodeJournal::new(dir.path().join("journal.jsonl"));

        journal
            .append(JournalEvent::new(
                Timestamp::from_secs(100),
                JournalEventType::DaemonStarted { targets: 2 },
            ))
            .unwrap();
        journal
            .append(JournalEvent::new(
                Timestamp::from_secs(160),
                JournalEventType::BatteryOnset { percent: 45 },
            ))
            .unwrap();

        let events = journal.tail(10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1].event,
            JournalEventType::BatteryOnset { percent: 45 }
        ));
    }

    #[test]
    fn tail_limits_to_most_recent() {
        let dir = TempDir::new().unwrap();
        let journal = EpisodeJournal::new(dir.path().join("journal.jsonl"));

        for i in 0..5 {
            journal
                .append(JournalEvent::new(
                    Timestamp::from_secs(i),
                    JournalEventType::AcRestored,
                ))
                .unwrap();
        }

        let events = journal.tail(2).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, 3);
        assert_eq!(events[1].timestamp, 4);
    }

    #[test]
    fn tail_of_missing_journal_is_empty() {
        let dir = TempDir::new().unwrap();
        let journal = EpisodeJournal::new(dir.path().join("nope.jsonl"));
        assert!(journal.tail(10).unwrap().is_empty());
    }

    #[test]
    fn events_round_trip_as_json_lines() {
        let event = JournalEvent::new(
            Timestamp::from_secs(1_700_000_000),
            JournalEventType::ShutdownIssued {
                target: TargetId::new("root", "nas"),
                reason: "grace_expired".into(),
            },
        );

        let line = serde_json::to_string(&event).unwrap();
        let parsed: JournalEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.timestamp, event.timestamp);
        assert!(matches!(
            parsed.event,
            JournalEventType::ShutdownIssued { .. }
        ));
    }
}
