//! Collaborator trait interfaces for mainsd
//!
//! This crate defines the interface between the decision core and the
//! external collaborators that read power state and perform remote
//! shutdowns. It contains no platform code itself.

mod mock;
mod sample;
mod traits;

pub use mock::*;
pub use sample::*;
pub use traits::*;
