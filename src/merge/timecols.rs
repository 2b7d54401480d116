// src/merge/timecols.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use crate::merge::table::NormalizedTable;

/// Column names containing any of these (case-insensitive) are presumed to
/// hold timestamps. The upstream tools emit no schema, so the match is
/// name-based.
pub const TIME_KEYWORDS: &[&str] = &[
    "time",
    "date",
    "created",
    "modified",
    "last",
    "written",
    "timestamp",
];

/// Decides which columns get the timestamp treatment. The keyword matcher is
/// the stock implementation; a content-sniffing one can be swapped in
/// without touching the merge contract.
pub trait ColumnClassifier {
    fn is_time_column(&self, name: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct KeywordClassifier;

impl ColumnClassifier for KeywordClassifier {
    fn is_time_column(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        TIME_KEYWORDS.iter().any(|kw| lower.contains(kw))
    }
}

/// Timestamp layouts the upstream tools have been seen to emit, tried in
/// order after RFC 3339.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse one cell into a UTC instant. Values carrying an explicit zone are
/// converted; zone-less values are interpreted as already UTC (the upstream
/// tools emit UTC without saying so).
pub fn parse_timestamp_utc(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Canonical serialized form: RFC 3339, microseconds, `Z` suffix. Fixed so
/// repeated runs produce byte-identical output.
pub fn format_timestamp_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Rewrite every presumed-timestamp column of `table` in place.
///
/// Per-cell failures become the missing marker with no per-cell log noise;
/// a column where not a single non-empty cell parses is left untouched and
/// reported as a column-level conversion failure.
pub fn normalize_time_columns(
    table: &mut NormalizedTable,
    classifier: &dyn ColumnClassifier,
    label: &str,
) {
    let time_cols: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, name)| classifier.is_time_column(name))
        .map(|(idx, _)| idx)
        .collect();

    for col in time_cols {
        let mut converted: Vec<Option<String>> = Vec::with_capacity(table.rows.len());
        let mut non_empty = 0usize;
        let mut parsed = 0usize;

        for row in &table.rows {
            let cell = row.get(col).and_then(|c| c.as_deref());
            let value = match cell {
                Some(text) if !text.trim().is_empty() => {
                    non_empty += 1;
                    parse_timestamp_utc(text).map(|dt| {
                        parsed += 1;
                        format_timestamp_utc(dt)
                    })
                }
                _ => None,
            };
            converted.push(value);
        }

        if non_empty > 0 && parsed == 0 {
            warn!(
                source = label,
                column = %table.headers[col],
                cells = non_empty,
                "column matched time keywords but nothing parsed; leaving as-is"
            );
            continue;
        }

        info!(
            source = label,
            column = %table.headers[col],
            converted = parsed,
            coerced_to_missing = non_empty - parsed,
            "converted column to UTC"
        );
        for (row, value) in table.rows.iter_mut().zip(converted) {
            if col < row.len() {
                row[col] = value;
            }
        }
    }
}
