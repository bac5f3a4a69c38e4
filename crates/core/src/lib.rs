//! Core utilities for gimbal.
//!
//! This crate provides foundational types and utilities used across the workspace:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timer for delta-time driven updates

mod error;
mod logging;
mod timer;

pub use error::{Error, Result};
pub use logging::{DEFAULT_FILTER, init_logging, try_init_logging};
pub use timer::Timer;
