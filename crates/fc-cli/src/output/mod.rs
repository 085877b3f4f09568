//! Output formatting utilities for the CLI
//!
//! Renders command results and operation values for the terminal. Values
//! shaped like a decoded table (`columns` + `rows`) are drawn as an ASCII
//! table; everything else is printed as JSON.

use serde_json::Value;
use tabled::{builder::Builder, settings::Style};

/// Format the words of a command result, one per line
pub fn format_words(words: &[String]) -> String {
    if words.is_empty() {
        return "OK".to_string();
    }
    words.join("\n")
}

/// Format the value returned by a named operation
pub fn format_value(value: &Value) -> String {
    if let Some(table) = format_table(value) {
        return table;
    }
    match value {
        Value::Null => "OK".to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Draw a `{ columns, rows }` value as a table
///
/// Returns `None` when the value does not have that shape.
pub fn format_table(value: &Value) -> Option<String> {
    let columns: Vec<&str> = value
        .get("columns")?
        .as_array()?
        .iter()
        .map(Value::as_str)
        .collect::<Option<_>>()?;
    let rows = value.get("rows")?.as_array()?;

    if rows.is_empty() {
        return Some("No rows".to_string());
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for row in rows {
        builder.push_record(columns.iter().map(|column| cell(row, column)));
    }

    Some(builder.build().with(Style::rounded()).to_string())
}

fn cell(row: &Value, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message to stderr in red
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message to stderr in yellow
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
///
/// Goes to stderr so that command results on stdout stay machine readable.
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
