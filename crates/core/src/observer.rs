//! Post-calculation hooks.
//!
//! Observers run synchronously, in registration order, after a calculation
//! has been recorded. A failing observer is logged by the calculator and the
//! next observer still runs.

use std::sync::Arc;

use crate::error::ObserverError;
use crate::record::Calculation;
use crate::store::HistoryStore;

/// Handle returned by [`Calculator::register_observer`](crate::Calculator::register_observer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

/// What an observer sees: the new record and the history it was appended to.
#[derive(Debug, Clone, Copy)]
pub struct CalculationEvent<'a> {
    pub record: &'a Calculation,
    pub history: &'a [Calculation],
}

pub trait CalculationObserver: Send {
    /// Short name used when reporting failures.
    fn name(&self) -> &str;

    fn update(&mut self, event: &CalculationEvent<'_>) -> Result<(), ObserverError>;
}

/// Writes one INFO line per calculation through the `log` facade.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl CalculationObserver for LoggingObserver {
    fn name(&self) -> &str {
        "logging"
    }

    fn update(&mut self, event: &CalculationEvent<'_>) -> Result<(), ObserverError> {
        let record = event.record;
        log::info!(
            "Calculation: {} {} {} = {}",
            record.operand1(),
            record.operation(),
            record.operand2(),
            record.result()
        );
        Ok(())
    }
}

/// Persists the whole history after every calculation.
pub struct AutoSaveObserver {
    store: Arc<dyn HistoryStore>,
}

impl AutoSaveObserver {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        AutoSaveObserver { store }
    }
}

impl std::fmt::Debug for AutoSaveObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSaveObserver")
            .field("location", &self.store.location())
            .finish()
    }
}

impl CalculationObserver for AutoSaveObserver {
    fn name(&self) -> &str {
        "auto-save"
    }

    fn update(&mut self, event: &CalculationEvent<'_>) -> Result<(), ObserverError> {
        self.store.save(event.history)?;
        log::debug!(
            "auto-saved {} records to {}",
            event.history.len(),
            self.store.location().display()
        );
        Ok(())
    }
}
