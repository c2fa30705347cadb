//! The calculation orchestrator.
//!
//! [`Calculator`] owns the history buffer, the undo/redo stacks, and the
//! observer list, and is the only thing that mutates them. Each public
//! mutating method runs to completion without yielding, so a calculator
//! shared between threads only needs a single `Mutex<Calculator>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::CalculatorConfig;
use crate::error::{CalcError, HistoryError, OperationError};
use crate::history::HistoryBuffer;
use crate::memento::UndoRedoStack;
use crate::numeric;
use crate::observer::{
    AutoSaveObserver, CalculationEvent, CalculationObserver, LoggingObserver, ObserverId,
};
use crate::operations::OperationRegistry;
use crate::record::Calculation;
use crate::store::{CsvHistoryStore, HistoryStore};
use crate::validate::{InputValidator, ToOperand};

pub struct Calculator {
    config: CalculatorConfig,
    registry: OperationRegistry,
    validator: InputValidator,
    history: HistoryBuffer,
    undo_redo: UndoRedoStack,
    observers: Vec<(ObserverId, Box<dyn CalculationObserver>)>,
    next_observer_id: u64,
    store: Arc<dyn HistoryStore>,
}

impl Calculator {
    /// A calculator persisting to `config.history_file()`.
    ///
    /// The logging observer is always registered; the auto-save observer is
    /// registered when `config.auto_save` is set.
    pub fn new(config: CalculatorConfig) -> Self {
        let store = Arc::new(CsvHistoryStore::new(config.history_file()));
        Calculator::with_store(config, store)
    }

    /// Like [`new`](Self::new), with `store` as the default persistence target.
    pub fn with_store(config: CalculatorConfig, store: Arc<dyn HistoryStore>) -> Self {
        let mut calculator = Calculator {
            registry: OperationRegistry::builtin(),
            validator: InputValidator::new(config.max_input_value),
            history: HistoryBuffer::new(config.max_history_size),
            undo_redo: UndoRedoStack::new(),
            observers: Vec::new(),
            next_observer_id: 0,
            store,
            config,
        };
        calculator.register_observer(Box::new(LoggingObserver));
        if calculator.config.auto_save {
            let auto_save = AutoSaveObserver::new(Arc::clone(&calculator.store));
            calculator.register_observer(Box::new(auto_save));
        }
        calculator
    }

    // ── Calculations ─────────────────────────────────────────────────

    /// Validate, execute, round, and record one calculation.
    ///
    /// On error nothing is recorded and the undo/redo stacks are untouched.
    pub fn calculate<A, B>(
        &mut self,
        operation: &str,
        operand1: A,
        operand2: B,
    ) -> Result<f64, CalcError>
    where
        A: ToOperand,
        B: ToOperand,
    {
        let name = self.validator.validate_operation(operation)?;
        let (left, right) = self.validator.validate_operands(&operand1, &operand2)?;

        let descriptor = self.registry.create(&name)?;
        let raw = descriptor.execute(left, right)?;
        if !raw.is_finite() {
            return Err(OperationError::Failed {
                operation: descriptor.name(),
                message: format!("result is not a finite number ({})", raw),
            }
            .into());
        }

        let result = numeric::round_to(raw, self.config.precision);
        let record = Calculation::new(descriptor.kind, left, right, result);

        self.undo_redo.save_state(self.history.snapshot());
        self.history.add(record);
        self.notify_observers(&record);

        Ok(result)
    }

    fn notify_observers(&mut self, record: &Calculation) {
        let history = self.history.get_all();
        let event = CalculationEvent {
            record,
            history: &history,
        };
        for (_, observer) in self.observers.iter_mut() {
            if let Err(e) = observer.update(&event) {
                log::error!("Observer notification failed ({}): {}", observer.name(), e);
            }
        }
    }

    // ── History ──────────────────────────────────────────────────────

    /// Copy of the history, oldest first.
    pub fn get_history(&self) -> Vec<Calculation> {
        self.history.get_all()
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Empty the history. Undoable.
    pub fn clear_history(&mut self) {
        self.undo_redo.save_state(self.history.snapshot());
        self.history.clear();
        log::info!("History cleared");
    }

    /// Restore the state before the last state-changing action.
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.undo_redo.can_undo() {
            return false;
        }
        match self.undo_redo.undo(self.history.snapshot()) {
            Some(previous) => {
                self.history.restore(previous);
                log::info!("Undo performed");
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone action. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        if !self.undo_redo.can_redo() {
            return false;
        }
        match self.undo_redo.redo(self.history.snapshot()) {
            Some(next) => {
                self.history.restore(next);
                log::info!("Redo performed");
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo_redo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_redo.can_redo()
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Write the history to `path` as CSV, or to the default store.
    /// Returns where it was written.
    pub fn save_history(&self, path: Option<&Path>) -> Result<PathBuf, HistoryError> {
        let records = self.history.get_all();
        match path {
            Some(path) => {
                CsvHistoryStore::new(path).save(&records)?;
                Ok(path.to_path_buf())
            }
            None => {
                self.store.save(&records)?;
                Ok(self.store.location().to_path_buf())
            }
        }
    }

    /// Replace the history with the records stored at `path`, or in the
    /// default store. Undoable.
    ///
    /// A missing or empty file yields no records and leaves the history
    /// untouched. A header-only file is an empty saved history and clears it.
    /// Loaded records beyond `max_history_size` are dropped oldest first.
    pub fn load_history(
        &mut self,
        path: Option<&Path>,
    ) -> Result<Vec<Calculation>, HistoryError> {
        let loaded = match path {
            Some(path) => CsvHistoryStore::new(path).load_existing()?,
            None => self.store.load_existing()?,
        };
        let Some(records) = loaded else {
            return Ok(Vec::new());
        };

        self.undo_redo.save_state(self.history.snapshot());
        self.history.replace(records.clone());
        log::info!("Loaded {} calculations from history", records.len());
        Ok(records)
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn register_observer(&mut self, observer: Box<dyn CalculationObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Unregister and return the observer, if it is still registered.
    pub fn remove_observer(&mut self, id: ObserverId) -> Option<Box<dyn CalculationObserver>> {
        let index = self.observers.iter().position(|(oid, _)| *oid == id)?;
        Some(self.observers.remove(index).1)
    }

    /// Names of registered observers, in notification order.
    pub fn observer_names(&self) -> Vec<&str> {
        self.observers.iter().map(|(_, o)| o.name()).collect()
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }
}

impl std::fmt::Debug for Calculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Calculator")
            .field("config", &self.config)
            .field("history_len", &self.history.len())
            .field("undo_depth", &self.undo_redo.undo_depth())
            .field("redo_depth", &self.undo_redo.redo_depth())
            .field("observers", &self.observer_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ObserverError, ValidationError};
    use crate::operations::OperationKind;
    use crate::store::MemoryHistoryStore;

    fn config() -> CalculatorConfig {
        CalculatorConfig {
            auto_save: false,
            ..CalculatorConfig::default()
        }
    }

    fn calculator() -> Calculator {
        Calculator::with_store(config(), Arc::new(MemoryHistoryStore::new()))
    }

    fn results(calc: &Calculator) -> Vec<f64> {
        calc.get_history().iter().map(|c| c.result()).collect()
    }

    #[test]
    fn add_records_one_entry() {
        let mut calc = calculator();
        assert_eq!(calc.calculate("add", 5, 3).unwrap(), 8.0);
        let history = calc.get_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].operation(), OperationKind::Add);
        assert_eq!(history[0].operand1(), 5.0);
        assert_eq!(history[0].operand2(), 3.0);
    }

    #[test]
    fn operation_name_is_normalized() {
        let mut calc = calculator();
        assert_eq!(calc.calculate("  POWER ", 2, 8).unwrap(), 256.0);
        assert_eq!(calc.get_history()[0].operation(), OperationKind::Power);
    }

    #[test]
    fn string_operands_are_coerced() {
        let mut calc = calculator();
        assert_eq!(calc.calculate("multiply", "2.5", "4").unwrap(), 10.0);
    }

    #[test]
    fn result_is_rounded_to_precision() {
        let mut calc = Calculator::with_store(
            CalculatorConfig {
                precision: 2,
                ..config()
            },
            Arc::new(MemoryHistoryStore::new()),
        );
        assert_eq!(calc.calculate("divide", 2, 3).unwrap(), 0.67);
        assert_eq!(calc.get_history()[0].result(), 0.67);
    }

    #[test]
    fn validation_errors_leave_state_untouched() {
        let mut calc = calculator();
        assert!(matches!(
            calc.calculate("", 1, 2),
            Err(CalcError::Validation(ValidationError::EmptyOperation))
        ));
        assert!(matches!(
            calc.calculate("add", "abc", 2),
            Err(CalcError::Validation(ValidationError::InvalidNumber { .. }))
        ));
        assert!(calc.get_history().is_empty());
        assert!(!calc.can_undo());
    }

    #[test]
    fn unknown_operation_is_an_operation_error() {
        let mut calc = calculator();
        assert!(matches!(
            calc.calculate("sqrt", 4, 2),
            Err(CalcError::Operation(OperationError::UnknownOperation { .. }))
        ));
    }

    #[test]
    fn non_finite_results_are_rejected() {
        let mut calc = calculator();
        let err = calc.calculate("multiply", 1e308, 10).unwrap_err();
        assert!(matches!(
            err,
            CalcError::Operation(OperationError::Failed { operation: "multiply", .. })
        ));
        assert!(calc.get_history().is_empty());
    }

    #[test]
    fn max_input_value_is_enforced() {
        let mut calc = Calculator::with_store(
            CalculatorConfig {
                max_input_value: 100.0,
                ..config()
            },
            Arc::new(MemoryHistoryStore::new()),
        );
        assert!(matches!(
            calc.calculate("add", 101, 1),
            Err(CalcError::Validation(ValidationError::ExceedsMaximum { .. }))
        ));
    }

    #[test]
    fn undo_and_redo() {
        let mut calc = calculator();
        calc.calculate("add", 1, 1).unwrap();
        calc.calculate("add", 2, 2).unwrap();
        assert!(calc.undo());
        assert_eq!(results(&calc), vec![2.0]);
        assert!(calc.can_redo());
        assert!(calc.redo());
        assert_eq!(results(&calc), vec![2.0, 4.0]);
        assert!(!calc.redo());
    }

    #[test]
    fn undo_with_nothing_to_undo() {
        let mut calc = calculator();
        assert!(!calc.undo());
        assert!(!calc.redo());
    }

    #[test]
    fn new_calculation_discards_redo() {
        let mut calc = calculator();
        calc.calculate("add", 1, 1).unwrap();
        calc.calculate("add", 2, 2).unwrap();
        calc.undo();
        calc.undo();
        assert!(calc.can_redo());
        calc.calculate("add", 3, 3).unwrap();
        assert!(!calc.can_redo());
        assert_eq!(results(&calc), vec![6.0]);
    }

    #[test]
    fn clear_is_undoable() {
        let mut calc = calculator();
        calc.calculate("add", 1, 1).unwrap();
        calc.clear_history();
        assert!(calc.get_history().is_empty());
        assert!(calc.undo());
        assert_eq!(results(&calc), vec![2.0]);
    }

    struct Failing;

    impl CalculationObserver for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn update(&mut self, _event: &CalculationEvent<'_>) -> Result<(), ObserverError> {
            Err(ObserverError::Failed {
                observer: "failing".into(),
                message: "boom".into(),
            })
        }
    }

    #[test]
    fn failing_observer_does_not_abort_calculation() {
        let store = Arc::new(MemoryHistoryStore::new());
        let mut calc = Calculator::with_store(config(), store.clone());
        calc.register_observer(Box::new(Failing));
        calc.register_observer(Box::new(AutoSaveObserver::new(store.clone())));

        assert_eq!(calc.calculate("subtract", 5, 3).unwrap(), 2.0);
        assert_eq!(calc.get_history().len(), 1);
        // The observer after the failing one still ran.
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn default_observers_follow_auto_save() {
        let calc = calculator();
        assert_eq!(calc.observer_names(), vec!["logging"]);

        let calc = Calculator::with_store(
            CalculatorConfig::default(),
            Arc::new(MemoryHistoryStore::new()),
        );
        assert_eq!(calc.observer_names(), vec!["logging", "auto-save"]);
    }

    #[test]
    fn auto_save_runs_on_every_calculation() {
        let store = Arc::new(MemoryHistoryStore::new());
        let mut calc = Calculator::with_store(CalculatorConfig::default(), store.clone());
        calc.calculate("add", 1, 2).unwrap();
        calc.calculate("add", 3, 4).unwrap();
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.load().unwrap(), calc.get_history());
    }

    #[test]
    fn observers_can_be_removed() {
        let mut calc = calculator();
        let id = calc.register_observer(Box::new(Failing));
        assert_eq!(calc.observer_names(), vec!["logging", "failing"]);
        let removed = calc.remove_observer(id).unwrap();
        assert_eq!(removed.name(), "failing");
        assert!(calc.remove_observer(id).is_none());
        assert_eq!(calc.observer_names(), vec!["logging"]);
    }

    #[test]
    fn load_replaces_history_and_is_undoable() {
        let stored = vec![
            Calculation::new(OperationKind::Add, 1.0, 1.0, 2.0),
            Calculation::new(OperationKind::Add, 2.0, 2.0, 4.0),
        ];
        let store = Arc::new(MemoryHistoryStore::with_records(stored.clone()));
        let mut calc = Calculator::with_store(config(), store);
        calc.calculate("multiply", 3, 3).unwrap();

        let loaded = calc.load_history(None).unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(calc.get_history(), stored);

        assert!(calc.undo());
        assert_eq!(results(&calc), vec![9.0]);
    }

    #[test]
    fn load_missing_file_is_empty_and_keeps_history() {
        let mut calc = calculator();
        calc.calculate("add", 1, 1).unwrap();
        let loaded = calc
            .load_history(Some(Path::new("/nonexistent/path.csv")))
            .unwrap();
        assert!(loaded.is_empty());
        assert_eq!(results(&calc), vec![2.0]);
    }

    #[test]
    fn load_empty_file_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();

        let mut calc = calculator();
        calc.calculate("add", 1, 1).unwrap();
        let loaded = calc.load_history(Some(path.as_path())).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(results(&calc), vec![2.0]);
        // Nothing was loaded, so there is nothing extra to undo.
        assert!(calc.undo());
        assert!(!calc.can_undo());
    }

    #[test]
    fn load_header_only_file_clears_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.csv");
        std::fs::write(&path, "operation,operand1,operand2,result,timestamp\n").unwrap();

        let mut calc = calculator();
        calc.calculate("add", 1, 1).unwrap();
        assert!(calc.load_history(Some(path.as_path())).unwrap().is_empty());
        assert!(calc.get_history().is_empty());
        assert!(calc.undo());
        assert_eq!(results(&calc), vec![2.0]);
    }

    #[test]
    fn save_to_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/history.csv");
        let mut calc = calculator();
        calc.calculate("percent", 1, 4).unwrap();
        assert_eq!(calc.save_history(Some(path.as_path())).unwrap(), path);
        assert_eq!(CsvHistoryStore::new(&path).load().unwrap(), calc.get_history());
    }

    #[test]
    fn calculator_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Calculator>();
    }
}
