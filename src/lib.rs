//! Library exports for reuse in the binary and tests.
/// Algorithm variants and their validated parameters.
pub mod analysis;
/// Application directory helpers.
pub mod app_dirs;
/// Tracing setup for the process.
pub mod logging;
/// Persisted analysis defaults.
pub mod settings;
/// Cross-thread status log.
pub mod status_log;
/// Background task scheduling and the blocking wait loop.
pub mod tasks;
