//! Linux collaborators for mainsd
//!
//! Provides:
//! - `AcpiSampler`: power source and charge via the `acpi` utility
//! - `SshExecutor`: remote power-off over `ssh` in batch mode, with a
//!   bounded timeout and an agent-session preflight

mod acpi;
mod ssh;
mod tool;

pub use acpi::*;
pub use ssh::*;
