use std::path::PathBuf;

/// Malformed or out-of-range input. The caller is expected to retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Operation name was empty or whitespace only.
    #[error("operation name cannot be empty")]
    EmptyOperation,

    /// Operand could not be coerced to a number.
    #[error("invalid number: {input}")]
    InvalidNumber { input: String },

    /// Operand coerced to NaN or an infinity.
    #[error("number is not finite: {input}")]
    NotFinite { input: String },

    /// Operand magnitude is above the configured `max_input_value`.
    #[error("number {value} exceeds maximum allowed value: {max}")]
    ExceedsMaximum { value: f64, max: f64 },
}

/// An unknown operation, or an operation's own precondition failing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },

    #[error("{operation}: division by zero is not allowed")]
    DivisionByZero { operation: &'static str },

    #[error("root degree cannot be zero")]
    RootDegreeZero,

    #[error("cannot compute even root of negative number ({degree}th root of {value})")]
    EvenRootOfNegative { value: f64, degree: f64 },

    /// The real-valued result does not exist (e.g. negative base, fractional exponent).
    #[error("{operation}: no real result for operands {left} and {right}")]
    NonReal {
        operation: &'static str,
        left: f64,
        right: f64,
    },

    #[error("{operation}: result overflows")]
    Overflow { operation: &'static str },

    /// Generic failure for anything the operation itself did not anticipate.
    #[error("operation failed: {operation}: {message}")]
    Failed {
        operation: &'static str,
        message: String,
    },
}

/// Persistence read or write failure.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history file {} is missing required columns: {}", path.display(), missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    #[error("history file {} is malformed: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("cannot write history file {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },
}

/// Configuration could not be loaded, or a key was accessed that does not exist.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration key '{key}' not found")]
    MissingKey { key: String },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("could not read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("could not create directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure inside an observer. Never propagated out of a calculation.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    #[error("auto-save failed: {0}")]
    AutoSave(#[from] HistoryError),

    #[error("observer '{observer}' failed: {message}")]
    Failed { observer: String, message: String },
}

/// Any error surfaced by the calculator's public entry points.
#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
