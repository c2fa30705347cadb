//! `tally repl` -- interactive calculator shell.
//!
//! Each line is either an operation name followed by two operands
//! (`add 5 3`) or one of the shell commands listed by `help`. Errors are
//! printed in red and never end the session; only `exit`, `quit`, or EOF do.

use std::io::{self, BufRead, Write};
use std::path::Path;

use colored::Colorize;
use tally_core::{CalcError, Calculation, Calculator};
use time::format_description::FormatItem;
use time::macros::format_description;

const PROMPT: &str = "calc> ";

const HISTORY_STAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Shell commands other than the operations themselves, in help order.
const COMMANDS: &[(&str, &[(&str, &str)])] = &[
    (
        "History Commands",
        &[
            ("history", "Display calculation history"),
            ("clear", "Clear calculation history"),
            ("undo", "Undo the last change to the history"),
            ("redo", "Redo the last undone change"),
        ],
    ),
    (
        "File Commands",
        &[
            ("save [path]", "Save calculation history to a CSV file"),
            ("load [path]", "Load calculation history from a CSV file"),
        ],
    ),
    (
        "Other Commands",
        &[
            ("config <key>", "Show a configuration value"),
            ("help", "Display this help menu"),
            ("exit", "Exit the calculator"),
        ],
    ),
];

/// Run the shell on the process's stdin and stdout.
pub(crate) fn run_repl(calculator: &mut Calculator) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    Repl::new(calculator, stdin.lock(), stdout.lock()).run()
}

pub(crate) struct Repl<'a, R, W> {
    calculator: &'a mut Calculator,
    input: R,
    out: W,
    running: bool,
}

impl<'a, R: BufRead, W: Write> Repl<'a, R, W> {
    pub(crate) fn new(calculator: &'a mut Calculator, input: R, out: W) -> Self {
        Repl {
            calculator,
            input,
            out,
            running: true,
        }
    }

    pub(crate) fn run(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", "=== Tally Calculator ===".cyan().bold())?;
        writeln!(self.out, "{}", "Type 'help' for available commands".green())?;
        writeln!(self.out)?;

        let mut line = String::new();
        while self.running {
            write!(self.out, "{}", PROMPT.cyan())?;
            self.out.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.out)?;
                self.info("Goodbye!")?;
                break;
            }
            self.process_command(&line)?;
        }
        Ok(())
    }

    /// Handle one input line. Only I/O failures on the output are errors.
    pub(crate) fn process_command(&mut self, line: &str) -> io::Result<()> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((first, args)) = parts.split_first() else {
            return Ok(());
        };
        let cmd = first.to_lowercase();

        if self.calculator.registry().contains(&cmd) {
            return self.handle_calculation(&cmd, args);
        }

        match cmd.as_str() {
            "exit" | "quit" => {
                self.running = false;
                self.info("Goodbye!")
            }
            "help" => self.print_help(),
            "history" => self.print_history(),
            "clear" => {
                self.calculator.clear_history();
                self.success("History cleared")
            }
            "undo" => {
                if self.calculator.undo() {
                    self.success("Undo successful")
                } else {
                    self.error("Nothing to undo")
                }
            }
            "redo" => {
                if self.calculator.redo() {
                    self.success("Redo successful")
                } else {
                    self.error("Nothing to redo")
                }
            }
            "save" => match self.calculator.save_history(args.first().map(Path::new)) {
                Ok(path) => self.success(&format!("History saved to {}", path.display())),
                Err(e) => self.error(&format!("Failed to save history: {}", e)),
            },
            "load" => match self.calculator.load_history(args.first().map(Path::new)) {
                Ok(records) => self.success(&format!(
                    "Loaded {} calculations from history",
                    records.len()
                )),
                Err(e) => self.error(&format!("Failed to load history: {}", e)),
            },
            "config" => match args.first() {
                Some(key) => match self.calculator.config().get(key) {
                    Ok(value) => self.info(&format!("{} = {}", key, value)),
                    Err(e) => self.error(&e.to_string()),
                },
                None => self.error("usage: config <key>"),
            },
            _ => self.error(&format!(
                "Unknown command: {}. Type 'help' for available commands.",
                cmd
            )),
        }
    }

    fn handle_calculation(&mut self, operation: &str, args: &[&str]) -> io::Result<()> {
        let [left, right] = args else {
            return self.error("Calculation requires two operands");
        };
        match self.calculator.calculate(operation, *left, *right) {
            Ok(result) => writeln!(self.out, "{}", format!("Result: {}", result).cyan()),
            Err(CalcError::Validation(e)) => self.error(&format!("Invalid input: {}", e)),
            Err(e) => self.error(&e.to_string()),
        }
    }

    fn print_history(&mut self) -> io::Result<()> {
        let history = self.calculator.get_history();
        if history.is_empty() {
            return self.info("No calculation history");
        }
        writeln!(self.out)?;
        writeln!(self.out, "{}", "=== Calculation History ===".cyan().bold())?;
        for (i, record) in history.iter().enumerate() {
            writeln!(self.out, "{}", history_line(i + 1, record))?;
        }
        writeln!(self.out)
    }

    fn print_help(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", "=== Calculator Help ===".cyan().bold())?;
        writeln!(self.out)?;
        writeln!(self.out, "{}", "Available Operations:".yellow())?;
        for descriptor in self.calculator.registry().descriptors() {
            writeln!(
                self.out,
                "  {} - {}",
                format!("{:<12}", descriptor.name()).green(),
                descriptor.description
            )?;
        }
        for (section, entries) in COMMANDS {
            writeln!(self.out)?;
            writeln!(self.out, "{}", format!("{}:", section).yellow())?;
            for (command, description) in *entries {
                writeln!(
                    self.out,
                    "  {} - {}",
                    format!("{:<12}", command).green(),
                    description
                )?;
            }
        }
        writeln!(self.out)?;
        writeln!(self.out, "{}", "Usage Example:".cyan())?;
        writeln!(self.out, "  add 5 3      - Adds 5 and 3")?;
        writeln!(self.out, "  power 2 8    - Calculates 2 to the power of 8")?;
        writeln!(self.out)
    }

    fn error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", format!("Error: {}", message).red())
    }

    fn success(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", message.green())
    }

    fn info(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", message.yellow())
    }
}

/// `3. 5 add 3 = 8 (2024-03-01 09:00:00)`
pub(crate) fn history_line(index: usize, record: &Calculation) -> String {
    let stamp = record
        .timestamp()
        .format(HISTORY_STAMP)
        .unwrap_or_else(|_| record.timestamp().to_string());
    format!(
        "{}. {} {} {} = {} ({})",
        index,
        record.operand1(),
        record.operation(),
        record.operand2(),
        record.result().to_string().green(),
        stamp
    )
}
