//! Plain-text rendering for terminal output (summary metrics, filter values).

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Renders `rows` under `headers` with a dashed rule. Columns whose cells are
/// all numeric are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| cell_width(h)).collect();
    let mut aligns = vec![Align::Right; headers.len()];
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(headers.len()) {
            widths[idx] = widths[idx].max(cell_width(cell));
            if !looks_numeric(cell) {
                aligns[idx] = Align::Left;
            }
        }
    }
    if rows.is_empty() {
        aligns.fill(Align::Left);
    }

    let mut output = String::new();
    let header_aligns = vec![Align::Left; headers.len()];
    let _ = writeln!(output, "{}", line(headers, &widths, &header_aligns));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    let _ = writeln!(output, "{}", line(&rule, &widths, &header_aligns));
    for row in rows {
        let _ = writeln!(output, "{}", line(row, &widths, &aligns));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn line(cells: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let rendered: Vec<String> = cells
        .iter()
        .zip(widths.iter().zip(aligns))
        .map(|(cell, (width, align))| {
            let text = flatten(cell);
            let pad = " ".repeat(width.saturating_sub(cell_width(&text)));
            match align {
                Align::Left => format!("{text}{pad}"),
                Align::Right => format!("{pad}{text}"),
            }
        })
        .collect();
    rendered.join("  ").trim_end().to_string()
}

fn cell_width(value: &str) -> usize {
    value.chars().filter(|c| !c.is_control()).count()
}

fn flatten(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.replace(',', "").parse::<f64>().is_ok()
}
