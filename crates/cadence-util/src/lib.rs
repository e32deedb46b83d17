//! Shared utilities for cadence.
//!
//! This crate provides common utilities used across the cadence workspace:
//! - Error handling patterns
//! - Logging setup with tracing
//! - RAII-based timing for snapshot replays and diff passes

pub mod error;
pub mod log;
pub mod timing;

pub use error::{Error, ErrorKind, Result};
pub use log::{LogConfig, LogLevel};
pub use timing::TimingGuard;
