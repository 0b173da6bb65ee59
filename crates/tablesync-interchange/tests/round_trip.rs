//! Export then import through real files

use pretty_assertions::assert_eq;
use tablesync_core::{Table, Value};
use tablesync_interchange::{CsvOptions, ValueInference, read_csv, write_csv};

fn mixed_table() -> Table {
    Table::from_rows(
        ["id", "borrower", "amount", "paid", "reference"],
        vec![
            vec![
                Value::Int64(1),
                Value::String("Smith, Jane".into()),
                Value::Decimal("100.00".into()),
                Value::Bool(true),
                Value::Uuid(uuid::Uuid::nil()),
            ],
            vec![
                Value::Int64(2),
                Value::String("O\"Brien\nline two".into()),
                Value::Decimal("250.50".into()),
                Value::Bool(false),
                Value::Null,
            ],
        ],
    )
    .unwrap()
}

#[test]
fn test_round_trip_preserves_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loan_payments.csv");
    let original = mixed_table();

    let summary = write_csv(&original, &path, &CsvOptions::default()).unwrap();
    assert_eq!((summary.rows, summary.columns), (2, 5));

    let restored = read_csv(&path, &CsvOptions::default()).unwrap();

    assert_eq!(restored.column_names(), original.column_names());
    assert_eq!(restored.row_count(), original.row_count());
    for (restored_row, original_row) in restored.rows().zip(original.rows()) {
        let restored_text: Vec<String> = restored_row.iter().map(|v| v.to_string()).collect();
        let original_text: Vec<String> = original_row
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();
        assert_eq!(restored_text, original_text);
    }
}

#[test]
fn test_round_trip_with_inference() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typed.csv");
    let options = CsvOptions::default().with_inference(ValueInference::Infer);

    write_csv(&mixed_table(), &path, &options).unwrap();
    let restored = read_csv(&path, &options).unwrap();

    assert_eq!(
        restored.column("id").unwrap().values(),
        &[Value::Int64(1), Value::Int64(2)]
    );
    assert_eq!(
        restored.column("amount").unwrap().values(),
        &[Value::Float64(100.0), Value::Float64(250.5)]
    );
    assert_eq!(
        restored.column("paid").unwrap().values(),
        &[Value::Bool(true), Value::Bool(false)]
    );
    assert_eq!(restored.column("reference").unwrap().values()[1], Value::Null);
}
