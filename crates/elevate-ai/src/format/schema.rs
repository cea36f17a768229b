//! Render `TABLE: name COLUMNS: - col | type` listings as a table block

use super::{FENCE, FenceTracker};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static SCHEMA_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)TABLE:[ \t]*(\w+)\s*COLUMNS:\s*((?:- \w+[^\n]*\n?)+)").unwrap()
});

/// Split a `- col | type | ...` line into trimmed cells
fn column_cells(line: &str) -> Vec<&str> {
    let body = line.trim().trim_start_matches('-').trim();
    body.split('|').map(str::trim).collect()
}

fn table_row(cells: &[&str], width: usize) -> String {
    let mut row = String::from("|");
    for i in 0..width {
        let cell = cells.get(i).copied().unwrap_or("");
        if cell.is_empty() {
            row.push_str(" |");
        } else {
            row.push(' ');
            row.push_str(cell);
            row.push_str(" |");
        }
    }
    row
}

fn render_schema(name: &str, columns: &str) -> String {
    let rows: Vec<Vec<&str>> = columns
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(column_cells)
        .collect();
    let width = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);

    let mut out = format!("## TABLE: {}\n\n{}\n", name, FENCE);
    out.push_str(&table_row(&["**Column**"], width));
    out.push('\n');
    out.push('|');
    out.push_str(&" --- |".repeat(width));
    out.push('\n');
    for cells in &rows {
        out.push_str(&table_row(cells, width));
        out.push('\n');
    }
    out.push_str(FENCE);
    out.push('\n');
    out
}

fn starts_inside_fence(text: &str, start: usize) -> bool {
    let mut fences = FenceTracker::default();
    for line in text[..start].lines() {
        fences.observe(line);
    }
    fences.is_open()
}

/// Rewrite schema listings into a heading plus a fenced table.
/// Listings that start inside an existing fenced block are left alone.
pub fn format_schema_blocks(text: &str) -> String {
    SCHEMA_BLOCK
        .replace_all(text, |caps: &Captures| {
            let start = caps.get(0).map_or(0, |m| m.start());
            if starts_inside_fence(text, start) {
                return caps[0].to_string();
            }
            let block = render_schema(&caps[1], &caps[2]);
            if start == 0 || text[..start].ends_with('\n') {
                block
            } else {
                format!("\n{}", block)
            }
        })
        .into_owned()
}
