//! Power sample types

use std::fmt;

/// Observed power source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSource {
    Ac,
    Battery,
}

impl fmt::Display for PowerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerSource::Ac => write!(f, "AC"),
            PowerSource::Battery => write!(f, "battery"),
        }
    }
}

/// One poll-tick observation of the local power state. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerSample {
    /// Battery charge, 0-100
    pub percent: u8,

    /// Current power source
    pub source: PowerSource,
}

impl PowerSample {
    pub fn new(percent: u8, source: PowerSource) -> Self {
        Self {
            percent: percent.min(100),
            source,
        }
    }

    pub fn on_battery(&self) -> bool {
        self.source == PowerSource::Battery
    }
}
