//! Terminal rendering of tables

use comfy_table::{ContentArrangement, Table as ComfyTable, presets::UTF8_FULL};
use tablesync_core::Table;

/// Render the first `limit` rows of `table` as a bordered grid
pub fn preview(table: &Table, limit: usize) -> ComfyTable {
    let mut grid = ComfyTable::new();
    grid.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(table.column_names());

    for row in table.rows().take(limit) {
        grid.add_row(row.into_iter().map(|value| value.to_string()).collect::<Vec<_>>());
    }
    grid
}

/// One-line shape summary, noting truncation of the preview
pub fn shape_line(table: &Table, limit: usize) -> String {
    let rows = table.row_count();
    let mut line = format!("{} rows × {} columns", rows, table.column_count());
    if rows > limit {
        line.push_str(&format!(" (showing first {})", limit));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tablesync_core::Value;

    fn sample() -> Table {
        Table::from_rows(
            ["id", "amount"],
            vec![
                vec![Value::Int32(1), Value::Decimal("100.00".into())],
                vec![Value::Int32(2), Value::Null],
                vec![Value::Int32(3), Value::Decimal("75.25".into())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_preview_limits_rows() {
        let rendered = preview(&sample(), 2).to_string();
        assert!(rendered.contains("id"));
        assert!(rendered.contains("amount"));
        assert!(rendered.contains("100.00"));
        assert!(rendered.contains("NULL"));
        assert!(!rendered.contains("75.25"));
    }

    #[test]
    fn test_shape_line() {
        assert_eq!(shape_line(&sample(), 20), "3 rows × 2 columns");
        assert_eq!(
            shape_line(&sample(), 2),
            "3 rows × 2 columns (showing first 2)"
        );
    }
}
