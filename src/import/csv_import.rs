//! CSV import
//!
//! Two table shapes are understood:
//!
//! ```text
//! long:  key,timestamp,value         wide:  date,mood,sleep hours
//!        mood,2024-03-01,5                  2024-03-01,5,7.5
//!        sleep,2024-03-01,7.5               2024-03-02,,8
//! ```
//!
//! In the wide shape every column except the timestamp becomes a series,
//! named after its lower-cased header with spaces replaced by `_`.

use super::timestamp::parse_timestamp;
use super::{CsvLayout, ImportError, ImportResult, RecordImporter};
use crate::stats::{Record, RecordValue};
use std::io::Read;

const KEY_HEADERS: &[&str] = &["key", "metric", "name"];
const TIMESTAMP_HEADERS: &[&str] = &["timestamp", "time", "date", "datetime"];
const VALUE_HEADERS: &[&str] = &["value", "val"];

/// Column positions for a long table
struct LongColumns {
    key: usize,
    timestamp: usize,
    value: Option<usize>,
}

/// Column positions for a wide table
struct WideColumns {
    timestamp: usize,
    series: Vec<(usize, String)>,
}

pub(super) fn read<R: Read>(
    importer: &RecordImporter,
    reader: R,
) -> Result<ImportResult, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(importer.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = if importer.has_header {
        reader
            .headers()?
            .iter()
            .map(|h| h.to_lowercase())
            .collect()
    } else {
        Vec::new()
    };

    let layout = match importer.layout {
        CsvLayout::Auto if !importer.has_header => CsvLayout::Long,
        CsvLayout::Auto => {
            if find_column(&headers, KEY_HEADERS).is_some()
                && find_column(&headers, VALUE_HEADERS).is_some()
            {
                CsvLayout::Long
            } else {
                CsvLayout::Wide
            }
        }
        layout => layout,
    };

    // Data starts on line 2 when there is a header
    let first_line = if importer.has_header { 2 } else { 1 };
    let mut result = ImportResult::default();

    match layout {
        CsvLayout::Wide => {
            let columns = wide_columns(importer, &headers)?;

            for (idx, row) in reader.records().enumerate() {
                let line = idx + first_line;
                result.rows_processed += 1;

                let row = match row {
                    Ok(r) => r,
                    Err(e) => {
                        result.fail(line, e);
                        continue;
                    }
                };

                let timestamp = match timestamp_cell(importer, &row, columns.timestamp) {
                    Ok(ts) => ts,
                    Err(e) => {
                        result.fail(line, e);
                        continue;
                    }
                };

                for (col, key) in &columns.series {
                    if let Some(cell) = row.get(*col).filter(|c| !c.is_empty()) {
                        result
                            .records
                            .push(Record::new(key.as_str(), timestamp, parse_cell(cell)));
                    }
                }
            }
        }
        _ => {
            let columns = long_columns(importer, &headers)?;

            for (idx, row) in reader.records().enumerate() {
                let line = idx + first_line;
                result.rows_processed += 1;

                let row = match row {
                    Ok(r) => r,
                    Err(e) => {
                        result.fail(line, e);
                        continue;
                    }
                };

                let key = match row.get(columns.key) {
                    Some(k) if !k.is_empty() => k,
                    _ => {
                        result.fail(line, "missing key");
                        continue;
                    }
                };

                let timestamp = match timestamp_cell(importer, &row, columns.timestamp) {
                    Ok(ts) => ts,
                    Err(e) => {
                        result.fail(line, e);
                        continue;
                    }
                };

                let value = match columns.value.and_then(|col| row.get(col)) {
                    Some(cell) if !cell.is_empty() => parse_cell(cell),
                    _ => RecordValue::default(),
                };

                result.records.push(Record::new(key, timestamp, value));
            }
        }
    }

    Ok(result)
}

fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| candidates.contains(&h.as_str()))
}

fn named_column(headers: &[String], name: &str) -> Result<usize, ImportError> {
    let name = name.to_lowercase();
    headers
        .iter()
        .position(|h| *h == name)
        .ok_or(ImportError::MissingColumn(name))
}

fn long_columns(importer: &RecordImporter, headers: &[String]) -> Result<LongColumns, ImportError> {
    if !importer.has_header {
        return Ok(LongColumns {
            key: 0,
            timestamp: 1,
            value: Some(2),
        });
    }

    let key = find_column(headers, KEY_HEADERS)
        .ok_or_else(|| ImportError::MissingColumn("key".to_string()))?;
    let timestamp = match &importer.timestamp_column {
        Some(name) => named_column(headers, name)?,
        None => find_column(headers, TIMESTAMP_HEADERS)
            .ok_or_else(|| ImportError::MissingColumn("timestamp".to_string()))?,
    };

    Ok(LongColumns {
        key,
        timestamp,
        value: find_column(headers, VALUE_HEADERS),
    })
}

fn wide_columns(importer: &RecordImporter, headers: &[String]) -> Result<WideColumns, ImportError> {
    if !importer.has_header {
        return Err(ImportError::MissingColumn(
            "header row required for wide layout".to_string(),
        ));
    }

    let timestamp = match &importer.timestamp_column {
        Some(name) => named_column(headers, name)?,
        // An exact name beats a series that merely mentions time ("screen time")
        None => find_column(headers, TIMESTAMP_HEADERS)
            .or_else(|| {
                headers
                    .iter()
                    .position(|h| h.contains("date") || h.contains("time"))
            })
            .ok_or_else(|| ImportError::MissingColumn("timestamp".to_string()))?,
    };

    let series = headers
        .iter()
        .enumerate()
        .filter(|(idx, h)| *idx != timestamp && !h.is_empty())
        .map(|(idx, h)| (idx, h.replace(' ', "_")))
        .collect();

    Ok(WideColumns { timestamp, series })
}

fn timestamp_cell(
    importer: &RecordImporter,
    row: &csv::StringRecord,
    col: usize,
) -> Result<i64, String> {
    let cell = row
        .get(col)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "missing timestamp".to_string())?;

    parse_timestamp(cell, &importer.offset).ok_or_else(|| format!("Invalid timestamp: {}", cell))
}

fn parse_cell(cell: &str) -> RecordValue {
    match cell.parse::<f64>() {
        Ok(n) => RecordValue::Number(n),
        Err(_) => RecordValue::Text(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::ImportFormat;
    use super::*;
    use chrono::FixedOffset;

    fn import(importer: &RecordImporter, data: &str) -> Result<ImportResult, ImportError> {
        importer.import_reader(data.as_bytes(), ImportFormat::Csv)
    }

    #[test]
    fn test_long_layout() {
        let data = "key,timestamp,value\n\
                    mood,2024-03-01 09:00:00,5\n\
                    mood, 2024-03-01 14:00:00 ,great\n\
                    weight,2024-03-02,\n\
                    mood,not a date,3\n";

        let result = import(&RecordImporter::new(), data).unwrap();

        assert_eq!(result.rows_processed, 4);
        assert_eq!(result.rows_failed, 1);
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.records[0].timestamp, 1709283600000);
        assert_eq!(result.records[0].value, RecordValue::Number(5.0));
        assert_eq!(result.records[1].value, RecordValue::Text("great".to_string()));
        assert!(!result.records[2].value.is_numeric());
        assert!(result.errors[0].starts_with("Row 5:"));
    }

    #[test]
    fn test_wide_layout() {
        let data = "Date,Mood,Sleep Hours\n\
                    2024-03-01,5,7.5\n\
                    2024-03-02,,8\n";

        let result = import(&RecordImporter::new(), data).unwrap();

        assert_eq!(result.rows_processed, 2);
        assert_eq!(result.rows_failed, 0);
        assert_eq!(result.records.len(), 3);

        let keys: Vec<&str> = result.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["mood", "sleep_hours", "sleep_hours"]);
        assert_eq!(result.records[2].timestamp, 1709337600000);
        assert_eq!(result.records[2].value, RecordValue::Number(8.0));
    }

    #[test]
    fn test_wide_prefers_exact_timestamp_header() {
        let data = "Mood,Screen Time,Date\n5,3.5,2024-03-01\n";

        let result = import(&RecordImporter::new(), data).unwrap();

        assert_eq!(result.rows_failed, 0);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].key, "screen_time");
        assert_eq!(result.records[1].value, RecordValue::Number(3.5));
        assert_eq!(result.records[1].timestamp, 1709251200000);
    }

    #[test]
    fn test_wide_falls_back_to_partial_timestamp_header() {
        let data = "Mood,Logged Date\n5,2024-03-01\n";

        let result = import(&RecordImporter::new(), data).unwrap();

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].key, "mood");
    }

    #[test]
    fn test_auto_layout_needs_key_and_value() {
        // A "name" column without a value column is just another series
        let data = "name,date,score\nalice,2024-03-01,5\n";

        let result = import(&RecordImporter::new(), data).unwrap();

        let keys: Vec<&str> = result.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "score"]);
        assert_eq!(result.records[0].value, RecordValue::Text("alice".to_string()));
    }

    #[test]
    fn test_explicit_timestamp_column() {
        let data = "logged,mood\n2024-03-01,4\n";
        let importer = RecordImporter::new()
            .with_layout(CsvLayout::Wide)
            .with_timestamp_column("Logged");

        let result = import(&importer, data).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].key, "mood");
    }

    #[test]
    fn test_missing_columns() {
        let err = import(&RecordImporter::new().with_layout(CsvLayout::Long), "mood,5\n").unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(_)));

        let err = import(&RecordImporter::new(), "mood,energy\n5,3\n").unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(_)));
    }

    #[test]
    fn test_headerless_long() {
        let data = "mood,1709283600000,5\nmood,1709287200000,6\n";
        let result = import(&RecordImporter::new().with_header(false), data).unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].timestamp, 1709287200000);
    }

    #[test]
    fn test_naive_timestamps_use_offset() {
        let data = "key,timestamp,value\nmood,2024-03-01 09:00:00,5\n";
        let importer = RecordImporter::new().with_offset(FixedOffset::east_opt(3600).unwrap());

        let result = import(&importer, data).unwrap();
        assert_eq!(result.records[0].timestamp, 1709283600000 - 3_600_000);
    }
}
