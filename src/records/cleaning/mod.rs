#[cfg(test)]
mod tests;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

use super::json::{JsonMap, safe_parse};
use super::{RecordView, Table};

const DATE_COLUMNS: [&str; 2] = ["published_date", "accessed_date"];
const CANONICAL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// A source row after type normalization and JSON field extraction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanRecord {
    pub chunk_text: Option<String>,
    pub source_url: Option<String>,
    pub tags: Option<String>,
    pub source_title: Option<String>,
    pub author_or_channel: Option<String>,
    pub entities: Option<String>,
    pub fighter_a: Option<String>,
    pub fighter_b: Option<String>,
    pub outcome: Option<String>,
    pub method: Option<String>,
    /// `None` when the source value is absent or unparsable
    pub published_date: Option<NaiveDateTime>,
    pub accessed_date: Option<NaiveDateTime>,
    pub stats: JsonMap,
    pub extras: JsonMap,
    pub fighter_a_record_at_fight: Option<String>,
    pub fighter_b_record_at_fight: Option<String>,
    pub fighter_a_age: Option<f64>,
    pub fighter_b_age: Option<f64>,
    pub fighter_a_height_cm: Option<f64>,
    pub fighter_b_height_cm: Option<f64>,
}

impl CleanRecord {
    /// Clean a single row. Never fails; bad values degrade to `None` or an empty map.
    #[inline]
    pub fn from_record(record: &RecordView<'_>) -> Self {
        let owned = |column: &str| record.get(column).map(str::to_string);

        let stats = safe_parse(record.get("stats_json"));
        let extras = safe_parse(record.get("extras_json"));

        Self {
            chunk_text: owned("chunk_text"),
            source_url: owned("source_url"),
            tags: owned("tags"),
            source_title: owned("source_title"),
            author_or_channel: owned("author_or_channel"),
            entities: owned("entities"),
            fighter_a: owned("fighter_a"),
            fighter_b: owned("fighter_b"),
            outcome: owned("outcome"),
            method: owned("method"),
            published_date: parse_date(record.get("published_date")),
            accessed_date: parse_date(record.get("accessed_date")),
            fighter_a_record_at_fight: text_field(&stats, "fighter_a_record_at_fight"),
            fighter_b_record_at_fight: text_field(&stats, "fighter_b_record_at_fight"),
            fighter_a_age: numeric_field(&extras, "fighter_a_age_at_fight_years"),
            fighter_b_age: numeric_field(&extras, "fighter_b_age_at_fight_years"),
            fighter_a_height_cm: numeric_field(&extras, "fighter_a_height_cm"),
            fighter_b_height_cm: numeric_field(&extras, "fighter_b_height_cm"),
            stats,
            extras,
        }
    }

    /// The published date as `YYYY-MM-DD`
    #[inline]
    pub fn published_day(&self) -> Option<String> {
        self.published_date
            .map(|date| date.format("%Y-%m-%d").to_string())
    }
}

/// Clean every row of an already deduplicated table
#[inline]
pub fn clean_records(table: &Table) -> Vec<CleanRecord> {
    table
        .records()
        .map(|record| CleanRecord::from_record(&record))
        .collect()
}

/// Rewrite the date columns in canonical `%Y-%m-%d %H:%M:%S` form; unparsable dates become missing.
/// Runs before duplicate removal so rows differing only in date spelling collapse.
#[inline]
pub fn normalize_dates(table: &mut Table) {
    for column in DATE_COLUMNS {
        table.map_column(column, |value| {
            parse_date(value).map(|date| date.format(CANONICAL_DATETIME).to_string())
        });
    }
}

/// Parse a date cell; unparsable values become `None` instead of failing the row
pub fn parse_date(value: Option<&str>) -> Option<NaiveDateTime> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }

    let parsed = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        });

    if parsed.is_none() {
        debug!("Unparsable date value: {:?}", value);
    }
    parsed
}

/// Scalar sub-field rendered as text; objects, arrays and nulls count as absent
pub fn text_field(map: &JsonMap, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric sub-field; numeric strings such as `"175"` or `"26.5"` are accepted
pub fn numeric_field(map: &JsonMap, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
