//! tinysa-core: Core traits, types, and error definitions for tinysa.
//!
//! This crate defines the instrument-agnostic pieces every other tinysa crate
//! builds on. Applications that only post-process trace payloads can depend
//! on it without pulling in the serial stack.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`DeviceProfile`] -- per-model bound constants
//! - [`Error`] / [`ValidationError`] / [`Result`] -- error handling
//! - [`trace`] -- payload post-processing helpers

pub mod error;
pub mod profile;
pub mod trace;
pub mod transport;

// Re-export key types at crate root for ergonomic `use tinysa_core::*`.
pub use error::{Error, Result, ValidationError};
pub use profile::{DeviceProfile, FrequencyRange, LevelRange, LnaStage, ProfileBound, ScreenGeometry};
pub use transport::Transport;
