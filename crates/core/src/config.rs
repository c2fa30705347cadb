//! Calculator configuration.
//!
//! Values are resolved in three layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`tally.toml` in the working directory, or an explicit path)
//! 3. `CALCULATOR_*` environment variables
//!
//! # Example
//!
//! ```toml
//! log_dir = "logs"
//! history_dir = "history"
//! max_history_size = 100
//! auto_save = true
//! precision = 10
//! max_input_value = 1e308
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::numeric::MAX_PRECISION;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

const LOG_FILE_NAME: &str = "calculator.log";
const HISTORY_FILE_NAME: &str = "calculator_history.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalculatorConfig {
    pub log_dir: PathBuf,
    pub history_dir: PathBuf,
    pub max_history_size: usize,
    pub auto_save: bool,
    /// Decimal places results are rounded to.
    pub precision: u32,
    pub max_input_value: f64,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        CalculatorConfig {
            log_dir: PathBuf::from("logs"),
            history_dir: PathBuf::from("history"),
            max_history_size: 100,
            auto_save: true,
            precision: 10,
            max_input_value: 1e308,
        }
    }
}

impl CalculatorConfig {
    /// Resolve all three layers against the process environment.
    ///
    /// With `path = None` a missing `tally.toml` is not an error; an explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => CalculatorConfig::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                CalculatorConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => CalculatorConfig::default(),
        };
        let env: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with("CALCULATOR_"))
            .collect();
        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with the TOML file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: CalculatorConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `CALCULATOR_*` variables from `env`. Unrelated keys are ignored.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<(), ConfigError> {
        if let Some(v) = env.get("CALCULATOR_LOG_DIR") {
            self.log_dir = PathBuf::from(v);
        }
        if let Some(v) = env.get("CALCULATOR_HISTORY_DIR") {
            self.history_dir = PathBuf::from(v);
        }
        if let Some(v) = env.get("CALCULATOR_MAX_HISTORY_SIZE") {
            self.max_history_size = parse_env("CALCULATOR_MAX_HISTORY_SIZE", v)?;
        }
        if let Some(v) = env.get("CALCULATOR_AUTO_SAVE") {
            self.auto_save = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = env.get("CALCULATOR_PRECISION") {
            self.precision = parse_env("CALCULATOR_PRECISION", v)?;
        }
        if let Some(v) = env.get("CALCULATOR_MAX_INPUT_VALUE") {
            self.max_input_value = parse_env("CALCULATOR_MAX_INPUT_VALUE", v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_history_size == 0 {
            return Err(invalid("max_history_size", "0", "must be at least 1"));
        }
        if self.max_input_value.is_nan() || self.max_input_value <= 0.0 {
            return Err(invalid(
                "max_input_value",
                &self.max_input_value.to_string(),
                "must be a positive number",
            ));
        }
        if self.precision > MAX_PRECISION {
            return Err(invalid(
                "precision",
                &self.precision.to_string(),
                &format!("must be at most {}", MAX_PRECISION),
            ));
        }
        Ok(())
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }

    pub fn history_file(&self) -> PathBuf {
        self.history_dir.join(HISTORY_FILE_NAME)
    }

    /// Create the log and history directories if needed.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        for dir in [&self.log_dir, &self.history_dir] {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Key-based access by environment-variable name or field name.
    ///
    /// Fails with [`ConfigError::MissingKey`] for anything else.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let name = key
            .trim()
            .to_ascii_lowercase()
            .trim_start_matches("calculator_")
            .to_string();
        let value = match name.as_str() {
            "log_dir" => self.log_dir.display().to_string(),
            "history_dir" => self.history_dir.display().to_string(),
            "log_file" => self.log_file().display().to_string(),
            "history_file" => self.history_file().display().to_string(),
            "max_history_size" => self.max_history_size.to_string(),
            "auto_save" => self.auto_save.to_string(),
            "precision" => self.precision.to_string(),
            "max_input_value" => self.max_input_value.to_string(),
            _ => {
                return Err(ConfigError::MissingKey {
                    key: key.to_string(),
                })
            }
        };
        Ok(value)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
