// Output formatting for CLI

use std::io::{self, Write};

use anyhow::Result;
use serde_json::{Map, Value};

use crate::cli::config::OutputFormat;

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Output a single object or an array of objects
    pub fn output(&self, value: &Value, writer: &mut impl Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(value)?)?;
            }
            OutputFormat::KeyValue => {
                self.output_key_value(value, writer)?;
            }
            OutputFormat::Table => {
                self.output_table(value, writer)?;
            }
        }
        Ok(())
    }

    /// Output as key-value pairs, one block per record
    fn output_key_value(&self, value: &Value, writer: &mut impl Write) -> Result<()> {
        for (n, record) in records(value).into_iter().enumerate() {
            if n > 0 {
                writeln!(writer)?;
            }
            let mut items: Vec<_> = record.iter().collect();
            items.sort_by(|a, b| a.0.cmp(b.0));

            for (key, value) in items {
                writeln!(writer, "{}: {}", key, format_value(value))?;
            }
        }
        Ok(())
    }

    /// Output as table, one row per record
    fn output_table(&self, value: &Value, writer: &mut impl Write) -> Result<()> {
        let rows = records(value);
        let columns: Vec<&String> = match rows.first() {
            Some(first) => first.keys().collect(),
            None => return Ok(()),
        };

        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(*column).map(format_value).unwrap_or_default())
                    .collect()
            })
            .collect();
        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .fold(column.len(), usize::max)
            })
            .collect();
        let line_len = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);

        writeln!(writer, "{}", "=".repeat(line_len))?;
        write_row(writer, columns.iter().map(|c| c.as_str()), &widths)?;
        writeln!(writer, "{}", "-".repeat(line_len))?;
        for row in &cells {
            write_row(writer, row.iter().map(String::as_str), &widths)?;
        }
        writeln!(writer, "{}", "=".repeat(line_len))?;
        Ok(())
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}

fn records(value: &Value) -> Vec<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(obj) => vec![obj],
        _ => Vec::new(),
    }
}

fn write_row<'a>(
    writer: &mut impl Write,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> io::Result<()> {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell, width = width))
        .collect();
    writeln!(writer, "{}", line.join("  ").trim_end())
}

/// Format a JSON value for display
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "(null)".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(arr) => {
            if arr.is_empty() {
                "[]".to_string()
            } else {
                format!("[{} items]", arr.len())
            }
        }
        Value::Object(obj) => {
            if obj.is_empty() {
                "{}".to_string()
            } else {
                format!("{{{} items}}", obj.len())
            }
        }
    }
}

/// Progress indicator for batch operations
pub struct ProgressBar {
    total: usize,
    current: usize,
    show: bool,
}

impl ProgressBar {
    pub fn new(total: usize, show: bool) -> Self {
        Self {
            total,
            current: 0,
            show,
        }
    }

    pub fn increment(&mut self, label: &str) {
        self.current += 1;
        if self.show && self.total > 0 {
            let percent = (self.current * 100) / self.total;
            print!("\r[{}/{}] ({}%) {} ", self.current, self.total, percent, label);
            if self.current == self.total {
                println!();
            }
            io::stdout().flush().ok();
        }
    }
}
