//! Structured observability hooks for import runs.
//!
//! This module provides:
//! - A run-scoped tracing span carrying the run id
//! - Emission functions for unit and run lifecycle events
//! - The `RunObserver` trait for extra progress reporting (console output)
//!
//! Events are emitted at `info!` level; failures at `error!`.

use std::time::Duration;

use tracing::{error, info};

use crate::engine::RunReport;
use crate::error::ImportError;

/// Span tagged with the run_id; the engine instruments the whole run with it.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("smallcopy.run", run_id = %run_id)
}

pub fn emit_run_started(run_id: &str, units: usize) {
    info!(event = "run.started", run_id = %run_id, units = units);
}

pub fn emit_unit_started(unit: &str, position: usize) {
    info!(event = "unit.started", unit = %unit, position = position);
}

pub fn emit_unit_finished(unit: &str, elapsed: Duration) {
    info!(
        event = "unit.finished",
        unit = %unit,
        duration_ms = elapsed.as_millis() as u64,
    );
}

pub fn emit_unit_failed(unit: &str, elapsed: Duration, error: &dyn std::fmt::Display) {
    error!(
        event = "unit.failed",
        unit = %unit,
        duration_ms = elapsed.as_millis() as u64,
        error = %error,
    );
}

pub fn emit_run_finished(run_id: &str, units: usize, elapsed: Duration) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        units = units,
        duration_ms = elapsed.as_millis() as u64,
    );
}

/// Progress callbacks invoked by the engine alongside its tracing events.
///
/// Observability only: observers cannot affect the outcome of a run.
pub trait RunObserver: Send + Sync {
    fn run_started(&self, _run_id: &str, _unit_names: &[&str]) {}

    fn unit_started(&self, _unit: &str) {}

    fn unit_finished(&self, _unit: &str, _elapsed: Duration) {}

    fn unit_failed(&self, _unit: &str, _elapsed: Duration, _error: &ImportError) {}

    fn run_finished(&self, _report: &RunReport) {}
}
