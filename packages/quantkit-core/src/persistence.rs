//! CSV persistence for date-indexed tables.
//!
//! Layout: a header row starting with `Date`, followed by one column per
//! series. Dates are written as `YYYY-MM-DD`; missing values as empty cells.

use crate::types::DateTable;
use crate::{Error, Result};
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

/// Write a table to a CSV file, creating parent directories as needed.
pub fn save_csv(table: &DateTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;

    let mut header = Vec::with_capacity(table.n_cols() + 1);
    header.push("Date".to_string());
    header.extend(table.columns().iter().cloned());
    writer.write_record(&header)?;

    for (date, row) in table.index().iter().zip(table.rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        record.extend(row.iter().map(|v| {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    info!(path = %path.display(), rows = table.n_rows(), "saved table");
    Ok(())
}

/// Parse the leading `YYYY-MM-DD` of a date cell; timestamps such as
/// `2020-01-02 00:00:00-05:00` are accepted.
fn parse_date(field: &str) -> Result<NaiveDate> {
    let field = field.trim();
    let date_part = field.get(..10).unwrap_or(field);
    Ok(NaiveDate::parse_from_str(date_part, "%Y-%m-%d")?)
}

fn parse_value(field: &str, column: &str) -> Result<f64> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field.parse::<f64>().map_err(|e| {
        Error::InvalidInput(format!(
            "column {}: cannot parse {:?} as a number: {}",
            column, field, e
        ))
    })
}

/// Read a table written by [`save_csv`] (or any CSV whose first column is a date).
///
/// Rows are sorted by date; duplicate dates are rejected.
pub fn load_csv(path: &Path) -> Result<DateTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut dated_rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let date = parse_date(record.get(0).unwrap_or_default())?;
        let row = columns
            .iter()
            .enumerate()
            .map(|(j, column)| parse_value(record.get(j + 1).unwrap_or_default(), column))
            .collect::<Result<Vec<f64>>>()?;
        dated_rows.push((date, row));
    }
    dated_rows.sort_by_key(|(date, _)| *date);

    let (index, rows) = dated_rows.into_iter().unzip();
    let table = DateTable::new(index, columns, rows)?;
    info!(path = %path.display(), rows = table.n_rows(), "loaded table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("returns.csv");

        let table = DateTable::new(
            vec![day(2), day(3)],
            vec!["AAPL".to_string(), "MSFT".to_string()],
            vec![vec![0.01, -0.02], vec![f64::NAN, 0.005]],
        )
        .unwrap();

        save_csv(&table, &path).unwrap();
        assert!(path.exists());

        let loaded = load_csv(&path).unwrap();
        assert_eq!(loaded.columns(), table.columns());
        assert_eq!(loaded.index(), table.index());
        assert_eq!(loaded.rows()[0], vec![0.01, -0.02]);
        assert!(loaded.rows()[1][0].is_nan());
        assert_eq!(loaded.rows()[1][1], 0.005);
    }

    #[test]
    fn test_load_accepts_timestamps_and_unsorted_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AAPL.csv");
        std::fs::write(
            &path,
            "Date,Open,Close\n\
             2024-01-03 00:00:00-05:00,101,102\n\
             2024-01-02 00:00:00-05:00,100,101\n",
        )
        .unwrap();

        let table = load_csv(&path).unwrap();
        assert_eq!(table.index(), &[day(2), day(3)]);
        assert_eq!(table.column("Close"), Some(vec![101.0, 102.0]));
    }

    #[test]
    fn test_load_rejects_bad_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Date,Close\n2024-01-02,abc\n").unwrap();

        assert!(matches!(load_csv(&path), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_load_rejects_duplicate_dates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dup.csv");
        std::fs::write(&path, "Date,Close\n2024-01-02,1\n2024-01-02,2\n").unwrap();

        assert!(matches!(load_csv(&path), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_csv(&dir.path().join("missing.csv"));
        assert!(matches!(result, Err(Error::Csv(_))));
    }
}
