//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, Width, object::Rows},
};

/// Widest a cell may grow before it is truncated
const MAX_CELL_WIDTH: usize = 60;

/// Format rows as a rounded table
pub fn format_table<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return "No results.".to_string();
    }

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Width::truncate(MAX_CELL_WIDTH).suffix("...")))
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Collapse whitespace so multi-line snippets fit a single table row
pub fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
