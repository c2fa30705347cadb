use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::operations::OperationKind;

/// Column order of the flat field mapping.
pub const FIELDS: [&str; 5] = ["operation", "operand1", "operand2", "result", "timestamp"];

/// One computed result. Immutable once constructed; every field is `Copy`, so
/// cloning a history is a full, independent copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    operation: OperationKind,
    operand1: f64,
    operand2: f64,
    result: f64,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

impl Calculation {
    /// A record stamped with the current local time (UTC if the local offset
    /// cannot be determined).
    pub fn new(operation: OperationKind, operand1: f64, operand2: f64, result: f64) -> Self {
        let timestamp = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Calculation::with_timestamp(operation, operand1, operand2, result, timestamp)
    }

    pub fn with_timestamp(
        operation: OperationKind,
        operand1: f64,
        operand2: f64,
        result: f64,
        timestamp: OffsetDateTime,
    ) -> Self {
        Calculation {
            operation,
            operand1,
            operand2,
            result,
            timestamp,
        }
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    pub fn operand1(&self) -> f64 {
        self.operand1
    }

    pub fn operand2(&self) -> f64 {
        self.operand2
    }

    pub fn result(&self) -> f64 {
        self.result
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// RFC 3339 rendering of the timestamp.
    ///
    /// RFC 3339 has no second-level offsets, so such timestamps are written
    /// in UTC. Years outside 0000-9999 cannot be written at all.
    pub fn timestamp_string(&self) -> Result<String, time::error::Format> {
        let timestamp = if self.timestamp.offset().seconds_past_minute() != 0 {
            self.timestamp.to_offset(UtcOffset::UTC)
        } else {
            self.timestamp
        };
        timestamp.format(&Rfc3339)
    }

    /// Flat `column -> text` mapping, as written by persistence.
    pub fn to_fields(&self) -> Result<BTreeMap<&'static str, String>, String> {
        let timestamp = self
            .timestamp_string()
            .map_err(|e| format!("timestamp {} cannot be written: {}", self.timestamp, e))?;
        Ok(BTreeMap::from([
            ("operation", self.operation.name().to_string()),
            ("operand1", self.operand1.to_string()),
            ("operand2", self.operand2.to_string()),
            ("result", self.result.to_string()),
            ("timestamp", timestamp),
        ]))
    }

    /// Inverse of [`to_fields`](Self::to_fields). Looks fields up through
    /// `field` so callers can back it with any row representation.
    ///
    /// Timestamps are accepted as RFC 3339 or as a naive ISO 8601 date-time,
    /// which is taken to be UTC.
    pub fn from_fields<'a, F>(field: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let get = |name: &str| field(name).ok_or_else(|| format!("missing field '{}'", name));
        let number = |name: &str| -> Result<f64, String> {
            let raw = get(name)?;
            let value = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("field '{}' is not a number: '{}'", name, raw))?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(format!("field '{}' is not finite: '{}'", name, raw))
            }
        };

        let operation = get("operation")?
            .trim()
            .parse::<OperationKind>()
            .map_err(|e| e.to_string())?;
        let operand1 = number("operand1")?;
        let operand2 = number("operand2")?;
        let result = number("result")?;
        let timestamp = parse_timestamp(get("timestamp")?)?;

        Ok(Calculation::with_timestamp(
            operation, operand1, operand2, result, timestamp,
        ))
    }
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, String> {
    let raw = raw.trim();
    OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).map(|t| t.assume_utc()))
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use time::macros::datetime;

    fn sample() -> Calculation {
        Calculation::with_timestamp(
            OperationKind::Add,
            5.0,
            3.0,
            8.0,
            datetime!(2024-03-01 12:30:45.25 UTC),
        )
    }

    #[test]
    fn fields_in_column_order() {
        let fields = sample().to_fields().unwrap();
        assert_eq!(fields.len(), FIELDS.len());
        assert_eq!(fields["operation"], "add");
        assert_eq!(fields["result"], "8");
        assert_eq!(fields["timestamp"], "2024-03-01T12:30:45.25Z");
    }

    #[test]
    fn from_fields_inverts_to_fields() {
        let calc = sample();
        let fields = calc.to_fields().unwrap();
        let parsed = Calculation::from_fields(|k| fields.get(k).map(String::as_str)).unwrap();
        assert_eq!(parsed, calc);
    }

    #[test]
    fn second_level_offsets_are_written_in_utc() {
        let offset = UtcOffset::from_hms(1, 0, 30).unwrap();
        let calc = Calculation::with_timestamp(
            OperationKind::Add,
            1.0,
            2.0,
            3.0,
            datetime!(2024-03-01 12:00:00 UTC).to_offset(offset),
        );
        assert_eq!(calc.timestamp_string().unwrap(), "2024-03-01T12:00:00Z");

        let fields = calc.to_fields().unwrap();
        let parsed = Calculation::from_fields(|k| fields.get(k).map(String::as_str)).unwrap();
        assert_eq!(parsed.timestamp(), calc.timestamp());
    }

    #[test]
    fn unwritable_timestamp_is_an_error() {
        let ancient = time::Date::from_calendar_date(-1, time::Month::January, 1)
            .unwrap()
            .midnight()
            .assume_utc();
        let calc = Calculation::with_timestamp(OperationKind::Add, 1.0, 2.0, 3.0, ancient);
        assert!(calc.timestamp_string().is_err());
        let err = calc.to_fields().unwrap_err();
        assert!(err.contains("cannot be written"), "{}", err);
    }

    #[test]
    fn naive_iso_timestamps_are_utc() {
        let row: HashMap<&str, &str> = HashMap::from([
            ("operation", "Multiply"),
            ("operand1", "2.0"),
            ("operand2", "4.5"),
            ("result", "9.0"),
            ("timestamp", "2024-01-15T08:00:00.123456"),
        ]);
        let calc = Calculation::from_fields(|k| row.get(k).copied()).unwrap();
        assert_eq!(calc.operation(), OperationKind::Multiply);
        assert_eq!(calc.result(), 9.0);
        assert_eq!(calc.timestamp(), datetime!(2024-01-15 08:00:00.123456 UTC));
    }

    #[test]
    fn from_fields_reports_bad_values() {
        let row: HashMap<&str, &str> = HashMap::from([
            ("operation", "add"),
            ("operand1", "five"),
            ("operand2", "3"),
            ("result", "8"),
            ("timestamp", "2024-01-15T08:00:00Z"),
        ]);
        let err = Calculation::from_fields(|k| row.get(k).copied()).unwrap_err();
        assert!(err.contains("operand1"), "{}", err);

        let err = Calculation::from_fields(|_| None).unwrap_err();
        assert_eq!(err, "missing field 'operation'");
    }

    #[test]
    fn serializes_with_snake_case_operation() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["operation"], "add");
        assert_eq!(json["timestamp"], "2024-03-01T12:30:45.25Z");
    }
}
