// crates/substrate-cli/src/output.rs
// ============================================================================
// Module: Output Helpers
// Description: Line-oriented stdout/stderr writers used by every command.
// Purpose: `clippy::print_stdout`/`print_stderr` are denied workspace-wide,
// so every line of CLI output goes through an explicit `io::Write` handle
// here rather than `println!`/`eprintln!`.
// Dependencies: serde_json, std
// ============================================================================

use std::io::Write;

use serde::Serialize;

use crate::error::CliError;

/// Writes a single line to stdout.
pub fn write_stdout_line(message: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|error| CliError::generic(format!("stdout write failed: {error}")))
}

/// Writes a single line to stderr.
pub fn write_stderr_line(message: &str) -> Result<(), CliError> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|error| CliError::generic(format!("stderr write failed: {error}")))
}

/// Serializes `value` to one line of JSON on stdout.
pub fn write_json_line<T: Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string(value).map_err(|error| CliError::generic(format!("json serialization failed: {error}")))?;
    write_stdout_line(&text)
}
