//! File logger setup.
//!
//! Every line has the shape `<timestamp> - calculator - <LEVEL> - <message>`
//! and is appended to the configured log file. The level filter defaults to
//! `info` and can be overridden with `CALCULATOR_LOG` (env_logger syntax).
//! Warnings and errors can also be echoed to stderr.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Builder, Env, Target, WriteStyle};
use log::Level;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub(crate) const LOG_FILTER_ENV: &str = "CALCULATOR_LOG";

/// Install the global logger, appending to `log_file`. With
/// `echo_warnings`, `warn!` and `error!` lines also go to stderr.
///
/// Calling this twice is harmless; the second logger is discarded.
pub(crate) fn init(log_file: &Path, echo_warnings: bool) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let installed = Builder::from_env(Env::new().filter_or(LOG_FILTER_ENV, "info"))
        .target(Target::Pipe(Box::new(file)))
        .write_style(WriteStyle::Never)
        .format(move |buf, record| {
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            let stamp = now.format(&Rfc3339).unwrap_or_default();
            if echo_warnings && record.level() <= Level::Warn {
                eprintln!("{}: {}", record.level().as_str().to_lowercase(), record.args());
            }
            writeln!(
                buf,
                "{} - calculator - {} - {}",
                stamp,
                record.level(),
                record.args()
            )
        })
        .try_init();

    if installed.is_err() {
        log::debug!("logger already installed; keeping the existing one");
    }
    Ok(())
}
