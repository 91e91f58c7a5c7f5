//! JSON and NDJSON import

use super::timestamp::parse_timestamp;
use super::{ImportError, ImportResult};
use crate::stats::{Record, RecordValue};
use chrono::FixedOffset;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};

/// A record as written in input documents
#[derive(Debug, Deserialize)]
struct RawRecord {
    key: String,
    timestamp: RawTimestamp,
    #[serde(default)]
    value: RecordValue,
}

/// Epoch milliseconds or a date string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Float(f64),
    Text(String),
}

impl RawRecord {
    fn into_record(self, offset: &FixedOffset) -> Result<Record, String> {
        let timestamp = match self.timestamp {
            RawTimestamp::Millis(ms) => ms,
            RawTimestamp::Float(ms) if ms.is_finite() => ms as i64,
            RawTimestamp::Float(ms) => return Err(format!("Invalid timestamp: {}", ms)),
            RawTimestamp::Text(s) => {
                parse_timestamp(&s, offset).ok_or_else(|| format!("Invalid timestamp: {}", s))?
            }
        };

        Ok(Record {
            key: self.key,
            timestamp,
            value: self.value,
        })
    }
}

/// Read a JSON array of records
pub(super) fn read_array<R: Read>(
    reader: R,
    offset: &FixedOffset,
) -> Result<ImportResult, ImportError> {
    let rows: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
    let mut result = ImportResult::default();

    for (idx, row) in rows.into_iter().enumerate() {
        result.rows_processed += 1;

        match serde_json::from_value::<RawRecord>(row)
            .map_err(|e| e.to_string())
            .and_then(|raw| raw.into_record(offset))
        {
            Ok(record) => result.records.push(record),
            Err(e) => result.fail(idx + 1, e),
        }
    }

    Ok(result)
}

/// Read newline-delimited JSON records
pub(super) fn read_lines<R: Read>(
    reader: R,
    offset: &FixedOffset,
) -> Result<ImportResult, ImportError> {
    let mut result = ImportResult::default();

    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        result.rows_processed += 1;

        match serde_json::from_str::<RawRecord>(&line)
            .map_err(|e| e.to_string())
            .and_then(|raw| raw.into_record(offset))
        {
            Ok(record) => result.records.push(record),
            Err(e) => result.fail(idx + 1, e),
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Offset, Utc};

    #[test]
    fn test_read_array() {
        let json = r#"[
            {"key": "mood", "timestamp": 1709283600000, "value": 5, "source": "app"},
            {"key": "mood", "timestamp": "2024-03-01T14:00:00Z", "value": "good"},
            {"key": "weight", "timestamp": "2024-03-02", "value": 71.5},
            {"key": "mood", "timestamp": "whenever", "value": 1},
            {"timestamp": 1709283600000, "value": 1}
        ]"#;

        let result = read_array(json.as_bytes(), &Utc.fix()).unwrap();

        assert_eq!(result.rows_processed, 5);
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.rows_failed, 2);
        assert_eq!(result.records[0].value, RecordValue::Number(5.0));
        assert_eq!(result.records[1].timestamp, 1709301600000);
        assert_eq!(result.records[1].value, RecordValue::Text("good".to_string()));
        assert_eq!(result.records[2].timestamp, 1709337600000);
        assert!(result.errors[0].starts_with("Row 4:"));
    }

    #[test]
    fn test_read_array_rejects_non_array() {
        let err = read_array(r#"{"key": "mood"}"#.as_bytes(), &Utc.fix()).unwrap_err();
        assert!(matches!(err, ImportError::Json(_)));
    }

    #[test]
    fn test_read_lines() {
        let ndjson = concat!(
            "{\"key\": \"mood\", \"timestamp\": 1709283600000, \"value\": 5}\n",
            "\n",
            "not json\n",
            "{\"key\": \"mood\", \"timestamp\": 1709301600000.0}\n",
        );

        let result = read_lines(ndjson.as_bytes(), &Utc.fix()).unwrap();

        assert_eq!(result.rows_processed, 3);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.rows_failed, 1);
        assert_eq!(result.records[1].timestamp, 1709301600000);
        assert!(!result.records[1].value.is_numeric());
        assert!(result.errors[0].starts_with("Row 3:"));
    }
}
