//! Execution engine: runs registered units strictly in registration order.
//!
//! Every unit shares the one target handle, and with it the run's single
//! transaction. The engine stops at the first failing unit and returns the
//! error; the caller then drops the handle without committing, so the
//! target never holds a partial copy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RunConfig;
use crate::error::{ImportError, ImportResult};
use crate::obs::{self, RunObserver};
use crate::registry::{RunContext, UnitRegistry};
use crate::target::TargetSchema;

/// Wall-clock time spent in one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitTiming {
    pub name: String,
    pub elapsed: Duration,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub units: Vec<UnitTiming>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn unit_names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.name.as_str()).collect()
    }

    pub fn duration_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

/// Runs a frozen [`UnitRegistry`] against a target.
#[derive(Clone, Default)]
pub struct Engine {
    observer: Option<Arc<dyn RunObserver>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report progress to `observer` in addition to the tracing events.
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Execute every unit in order.
    ///
    /// Unit *i* observes the effects of units before it and none after it.
    /// A failing unit surfaces as [`ImportError::UnitExecution`] naming it;
    /// no later unit runs.
    pub async fn run<T>(
        &self,
        registry: &UnitRegistry<T>,
        target: &mut T,
        config: &RunConfig,
    ) -> ImportResult<RunReport>
    where
        T: TargetSchema + ?Sized,
    {
        registry.verify_order()?;

        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        self.run_units(registry, target, config, run_id)
            .instrument(span)
            .await
    }

    async fn run_units<T>(
        &self,
        registry: &UnitRegistry<T>,
        target: &mut T,
        config: &RunConfig,
        run_id: String,
    ) -> ImportResult<RunReport>
    where
        T: TargetSchema + ?Sized,
    {
        let started_at = Utc::now();
        let run_start = Instant::now();
        let ctx = RunContext::new(
            config,
            registry.declared_tables(),
            registry.ignored_tables(),
        );

        obs::emit_run_started(&run_id, registry.len());
        if let Some(observer) = &self.observer {
            let names: Vec<&str> = registry.units().iter().map(|u| u.name()).collect();
            observer.run_started(&run_id, &names);
        }

        let mut units = Vec::with_capacity(registry.len());
        for (position, unit) in registry.units().iter().enumerate() {
            obs::emit_unit_started(unit.name(), position);
            if let Some(observer) = &self.observer {
                observer.unit_started(unit.name());
            }

            let unit_start = Instant::now();
            let result = unit.body().run(target, &ctx).await;
            let elapsed = unit_start.elapsed();

            if let Err(source) = result {
                let err = ImportError::UnitExecution {
                    unit: unit.name().to_string(),
                    source: Box::new(source),
                };
                obs::emit_unit_failed(unit.name(), elapsed, &err);
                if let Some(observer) = &self.observer {
                    observer.unit_failed(unit.name(), elapsed, &err);
                }
                return Err(err);
            }

            obs::emit_unit_finished(unit.name(), elapsed);
            if let Some(observer) = &self.observer {
                observer.unit_finished(unit.name(), elapsed);
            }
            units.push(UnitTiming {
                name: unit.name().to_string(),
                elapsed,
            });
        }

        let report = RunReport {
            run_id,
            started_at,
            units,
            elapsed: run_start.elapsed(),
        };
        obs::emit_run_finished(&report.run_id, report.units.len(), report.elapsed);
        if let Some(observer) = &self.observer {
            observer.run_finished(&report);
        }
        Ok(report)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_helpers() {
        let report = RunReport {
            run_id: "run-1".to_string(),
            started_at: Utc::now(),
            units: vec![
                UnitTiming {
                    name: "login".to_string(),
                    elapsed: Duration::from_millis(5),
                },
                UnitTiming {
                    name: "journal".to_string(),
                    elapsed: Duration::from_millis(7),
                },
            ],
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(report.unit_names(), vec!["login", "journal"]);
        assert_eq!(report.duration_ms(), 1500);
    }
}
