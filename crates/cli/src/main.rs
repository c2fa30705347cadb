mod logging;
mod repl;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tally_core::{Calculator, CalculatorConfig};

/// Output format for one-shot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Interactive arithmetic calculator with history and undo/redo.
#[derive(Parser)]
#[command(name = "tally", version, about = "Interactive arithmetic calculator")]
struct Cli {
    /// Path to a TOML configuration file (default: ./tally.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell (the default)
    Repl,

    /// Perform one calculation and record it in the saved history
    #[command(allow_negative_numbers = true)]
    Calc {
        /// Operation name (see `tally ops`)
        operation: String,
        /// First operand
        a: String,
        /// Second operand
        b: String,
    },

    /// Print the saved calculation history
    History,

    /// List the available operations
    Ops,
}

fn main() {
    let cli = Cli::parse();

    let config = match CalculatorConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report_error(&format!("error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    if let Err(e) = config.ensure_directories() {
        report_error(&format!("error: {}", e), cli.output, cli.quiet);
        process::exit(1);
    }
    if let Err(e) = logging::init(&config.log_file(), !cli.quiet) {
        if !cli.quiet {
            eprintln!(
                "warning: cannot open log file '{}': {}",
                config.log_file().display(),
                e
            );
        }
    }
    log::info!("Calculator initialized");

    let mut calculator = Calculator::new(config);

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => {
            if let Err(e) = repl::run_repl(&mut calculator) {
                report_error(&format!("error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
        Commands::Calc { operation, a, b } => {
            cmd_calc(&mut calculator, &operation, &a, &b, cli.output, cli.quiet);
        }
        Commands::History => {
            cmd_history(&mut calculator, cli.output, cli.quiet);
        }
        Commands::Ops => {
            cmd_ops(&calculator, cli.output);
        }
    }
}

fn cmd_calc(
    calculator: &mut Calculator,
    operation: &str,
    a: &str,
    b: &str,
    output: OutputFormat,
    quiet: bool,
) {
    // Auto-save rewrites the whole file, so start from what is already there.
    // A file we cannot read must not be overwritten.
    if let Err(e) = calculator.load_history(None) {
        report_error(
            &format!("error: could not load saved history: {}", e),
            output,
            quiet,
        );
        process::exit(1);
    }

    match calculator.calculate(operation, a, b) {
        Ok(result) => match output {
            OutputFormat::Text => println!("{}", result),
            OutputFormat::Json => {
                let record = calculator.history().last();
                let value = serde_json::to_value(record)
                    .unwrap_or_else(|_| serde_json::json!({ "result": result }));
                println!("{}", pretty(&value));
            }
        },
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_history(calculator: &mut Calculator, output: OutputFormat, quiet: bool) {
    let history = match calculator.load_history(None) {
        Ok(_) => calculator.get_history(),
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let value = serde_json::to_value(&history).unwrap_or_default();
            println!("{}", pretty(&value));
        }
        OutputFormat::Text => {
            if history.is_empty() {
                if !quiet {
                    println!("No calculation history");
                }
                return;
            }
            for (i, record) in history.iter().enumerate() {
                println!("{}", repl::history_line(i + 1, record));
            }
        }
    }
}

fn cmd_ops(calculator: &Calculator, output: OutputFormat) {
    let registry = calculator.registry();
    match output {
        OutputFormat::Json => {
            let ops: Vec<serde_json::Value> = registry
                .descriptors()
                .iter()
                .map(|d| serde_json::json!({ "name": d.name(), "description": d.description }))
                .collect();
            println!("{}", pretty(&serde_json::Value::Array(ops)));
        }
        OutputFormat::Text => {
            for d in registry.descriptors() {
                println!("{:<12} {}", d.name(), d.description);
            }
        }
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("serialization error: {}", e))
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => {
            use colored::Colorize;
            eprintln!("{}", msg.red());
        }
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
