use crate::backend::recording::Call;
use crate::backend::Row;
use serde_json::Value;
use std::fmt::{Display, Formatter};

pub fn render_rows(rows: &[Row]) -> String {
    format!("{}", RenderableRows(rows))
}

/// One call per line, indented like a builder chain.
pub fn render_calls(calls: &[Call]) -> String {
    let mut output = String::new();

    for call in calls {
        if !matches!(call, Call::Table(_)) {
            output.push_str("    ");
        }

        output.push_str(&call.to_string());
        output.push('\n');
    }

    output
}

struct RenderableRows<'a>(&'a [Row]);

/// Displays rows as a plain text table:
/// ```text
/// speler | datum
/// -------+-----------
/// Jan    | 2025-07-01
/// ```
/// Columns are taken from all rows, in order of first appearance.
impl Display for RenderableRows<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut columns: Vec<&str> = Vec::new();
        for row in self.0 {
            for column in row.keys() {
                if !columns.contains(&column.as_str()) {
                    columns.push(column);
                }
            }
        }

        if columns.is_empty() {
            return writeln!(f, "(no rows)");
        }

        let cells: Vec<Vec<String>> = self
            .0
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| render_cell(row.get(*column)))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                cells
                    .iter()
                    .map(|row| row[index].chars().count())
                    .chain([column.chars().count()])
                    .max()
                    .unwrap_or_default()
            })
            .collect();

        write_line(f, columns.iter().copied(), &widths)?;

        let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        writeln!(f, "{}", separator.join("-+-"))?;

        for row in &cells {
            write_line(f, row.iter().map(String::as_str), &widths)?;
        }

        Ok(())
    }
}

fn write_line<'a, I>(f: &mut Formatter<'_>, cells: I, widths: &[usize]) -> std::fmt::Result
where
    I: Iterator<Item = &'a str>,
{
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();

    writeln!(f, "{}", padded.join(" | ").trim_end())
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
