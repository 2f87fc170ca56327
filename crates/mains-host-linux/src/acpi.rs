//! ACPI-based power sampler
//!
//! Shells out to the `acpi` utility once per tick:
//! - `acpi -b` for the battery line (status word and charge percentage)
//! - `acpi -a` for the adapter line (on-line / off-line)
//!
//! The adapter reading wins when present; otherwise the source is inferred
//! from the battery status word. An unparsable charge clamps to 0 so a
//! garbled reading errs toward protecting the targets.

use async_trait::async_trait;
use mains_host_api::{PowerSample, PowerSampler, PowerSource, SampleError};
use mains_util::MainsError;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::tool::find_in_path;

/// Name of the ACPI utility on PATH
pub const ACPI_BINARY: &str = "acpi";

/// Power sampler backed by the ACPI utility
pub struct AcpiSampler {
    binary: PathBuf,
}

impl AcpiSampler {
    /// Locate the ACPI utility on PATH. Absence is a fatal startup error.
    pub fn locate() -> Result<Self, MainsError> {
        let binary = find_in_path(ACPI_BINARY)
            .ok_or_else(|| MainsError::dependency("acpi utility not found on PATH"))?;
        debug!(binary = %binary.display(), "ACPI utility located");
        Ok(Self { binary })
    }

    /// Use an explicit binary path (tests, unusual installs)
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, flag: &str) -> Result<String, SampleError> {
        let output = Command::new(&self.binary)
            .arg(flag)
            .output()
            .await
            .map_err(|e| {
                SampleError::Unavailable(format!("{}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(SampleError::Unavailable(format!(
                "acpi {} exited with {}",
                flag, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl PowerSampler for AcpiSampler {
    async fn sample(&self) -> Result<PowerSample, SampleError> {
        let battery = self.run("-b").await?;
        // Some machines report no adapter device; fall back to the battery
        // status word in that case.
        let adapter = self.run("-a").await.unwrap_or_default();
        parse_sample(&battery, &adapter)
    }
}

/// Parse `acpi -b` and `acpi -a` output into a sample.
///
/// Battery line: `Battery 0: Discharging, 45%, 01:12:44 remaining`
/// Adapter line: `Adapter 0: on-line`
fn parse_sample(battery: &str, adapter: &str) -> Result<PowerSample, SampleError> {
    let line = battery
        .lines()
        .find(|l| l.trim_start().starts_with("Battery"))
        .ok_or_else(|| SampleError::Unparsable(format!("no battery line in: {:?}", battery)))?;

    Ok(PowerSample::new(
        parse_percent(line),
        parse_source(line, adapter),
    ))
}

fn parse_percent(line: &str) -> u8 {
    let parsed = line
        .split(',')
        .map(str::trim)
        .find_map(|field| field.strip_suffix('%'))
        .and_then(|digits| digits.trim().parse::<u8>().ok());

    match parsed {
        Some(pct) => pct.min(100),
        None => {
            warn!(line, "Unparsable battery percentage, clamping to 0");
            0
        }
    }
}

fn parse_source(battery_line: &str, adapter: &str) -> PowerSource {
    if adapter.contains("on-line") {
        return PowerSource::Ac;
    }
    if adapter.contains("off-line") {
        return PowerSource::Battery;
    }

    if battery_line.contains("Discharging") {
        PowerSource::Battery
    } else {
        PowerSource::Ac
    }
}
