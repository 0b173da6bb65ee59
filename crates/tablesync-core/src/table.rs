//! Rectangular in-memory table

use crate::{TableError, Value};

/// A named column and its values, in row order
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Database-specific type name, when known
    pub data_type: Option<String>,
    values: Vec<Value>,
}

impl Column {
    /// Create an empty column
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            values: Vec::new(),
        }
    }

    /// Create an empty column carrying a type name
    pub fn with_type(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
            values: Vec::new(),
        }
    }

    /// Create a column from existing values
    pub fn from_values(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            values,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered columns of equal length.
///
/// Every constructor and mutator checks that all columns hold the same number
/// of values, so a `Table` is always rectangular.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table from columns, rejecting ragged input
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(TableError::ColumnLength {
                    column: bad.name.clone(),
                    expected,
                    actual: bad.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Build a table with the given column names and no rows
    pub fn with_columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: names.into_iter().map(Column::new).collect(),
        }
    }

    /// Build a table from row-major data
    pub fn from_rows<I, S>(names: I, rows: Vec<Vec<Value>>) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::with_columns(names);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append one row. The row must have exactly one value per column.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                row: self.row_count(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Find a column by name (first match)
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Values of one row, in column order
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Iterate rows in order
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count()).map(move |idx| self.columns.iter().map(|c| &c.values[idx]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loan_payments() -> Table {
        Table::from_rows(
            ["id", "amount"],
            vec![
                vec![Value::Int32(1), Value::Decimal("100.00".into())],
                vec![Value::Int32(2), Value::Decimal("250.50".into())],
                vec![Value::Int32(3), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_is_column_ordered() {
        let table = loan_payments();
        assert_eq!(table.column_names(), vec!["id", "amount"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(
            table.column("id").unwrap().values(),
            &[Value::Int32(1), Value::Int32(2), Value::Int32(3)]
        );
    }

    #[test]
    fn test_rows_iterate_in_insertion_order() {
        let table = loan_payments();
        let ids: Vec<&Value> = table.rows().map(|r| r[0]).collect();
        assert_eq!(ids, vec![&Value::Int32(1), &Value::Int32(2), &Value::Int32(3)]);
        assert_eq!(table.row(2).unwrap()[1], &Value::Null);
        assert!(table.row(3).is_none());
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = Table::with_columns(["a", "b"]);
        let err = table.push_row(vec![Value::Int64(1)]).unwrap_err();
        assert_eq!(
            err,
            TableError::RowWidth {
                row: 0,
                expected: 2,
                actual: 1
            }
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::from_values("a", vec![Value::Int64(1), Value::Int64(2)]),
            Column::from_values("b", vec![Value::Int64(1)]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            TableError::ColumnLength {
                column: "b".into(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_header_only_table() {
        let table = Table::with_columns(["id"]);
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.rows().count(), 0);
        assert_eq!(table.column_names(), vec!["id"]);
    }
}
