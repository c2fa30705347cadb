//! tally-core: calculation engine for the tally calculator.
//!
//! Every computation flows through [`Calculator::calculate`]: the operation
//! name and operands are validated, the operation is resolved from the
//! [`OperationRegistry`] and executed, the result is rounded to the
//! configured precision, and a [`Calculation`] record is appended to the
//! bounded [`HistoryBuffer`]. The pre-calculation history is pushed onto the
//! [`UndoRedoStack`] first, and registered observers are notified last.
//!
//! # Public API
//!
//! - [`Calculator`] -- the orchestrator and only mutating entry point
//! - [`CalculatorConfig`] -- defaults, TOML file, `CALCULATOR_*` environment
//! - [`OperationRegistry`], [`OperationKind`] -- the fixed operation table
//! - [`HistoryStore`], [`CsvHistoryStore`] -- persistence of history
//! - [`CalcError`] and the per-concern error enums

pub mod calculator;
pub mod config;
pub mod error;
pub mod history;
pub mod memento;
pub mod numeric;
pub mod observer;
pub mod operations;
pub mod record;
pub mod store;
pub mod validate;

// ── Convenience re-exports ───────────────────────────────────────────

pub use calculator::Calculator;
pub use config::CalculatorConfig;
pub use error::{
    CalcError, ConfigError, HistoryError, ObserverError, OperationError, ValidationError,
};
pub use history::HistoryBuffer;
pub use memento::{Snapshot, UndoRedoStack};
pub use observer::{
    AutoSaveObserver, CalculationEvent, CalculationObserver, LoggingObserver, ObserverId,
};
pub use operations::{OperationDescriptor, OperationKind, OperationRegistry};
pub use record::Calculation;
pub use store::{CsvHistoryStore, HistoryStore, MemoryHistoryStore};
pub use validate::{InputValidator, ToOperand};
