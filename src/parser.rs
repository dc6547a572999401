use std::io::Read;
use csv::ReaderBuilder;
use log::warn;
use serde_json::{Map, Value};

use crate::error::{Result, StatsError};
use crate::stats::{format_start_time, AllocationRecord};

/// Accepted field names per canonical field, canonical name first
const TEAM_FIELDS: &[&str] = &["team_name", "team"];
const PITCH_FIELDS: &[&str] = &["pitch_name", "pitch"];
const TIME_FIELDS: &[&str] = &["start_time", "time"];
const DATE_FIELDS: &[&str] = &["date"];

/// Content of an output file for a date without allocations
const NO_ALLOCATIONS: &str = "No allocations available.";

/// Reads a `"true"`/`"false"` flag, case-insensitive; anything else is false
fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Returns the value stored under the first of the given names that is present
/// and not null; strings are kept as delivered, numbers and booleans are
/// written out as text
fn text_field(object: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match object.get(*name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    })
}

fn preferred_field(object: &Map<String, Value>) -> bool {
    match object.get("preferred") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => parse_bool(s),
        _ => false,
    }
}

fn normalize_one(raw: &Value) -> std::result::Result<AllocationRecord, &'static str> {
    let object = raw.as_object().ok_or("not an object")?;

    let team_name = text_field(object, TEAM_FIELDS).ok_or("missing team_name")?;
    let date = text_field(object, DATE_FIELDS).ok_or("missing date")?;
    let pitch_name = text_field(object, PITCH_FIELDS).ok_or("missing pitch_name")?;
    let start_time = text_field(object, TIME_FIELDS).unwrap_or_default();

    Ok(AllocationRecord {
        team_name,
        date,
        pitch_name,
        start_time: format_start_time(&start_time).to_string(),
        preferred: preferred_field(object),
    })
}

/// Shapes raw allocation objects into canonical records
///
/// Field name variants (`team`, `pitch`, `time`) are mapped to the canonical
/// names and start times are cut to "HH:MM". A record without a team, date or
/// pitch is dropped with a warning; the rest of the batch is kept.
pub fn normalize(raw: &[Value]) -> Vec<AllocationRecord> {
    let mut records = Vec::with_capacity(raw.len());

    for (index, value) in raw.iter().enumerate() {
        match normalize_one(value) {
            Ok(record) => records.push(record),
            Err(reason) => warn!("Dropping allocation record #{}: {}", index, reason),
        }
    }

    records
}

/// Parses a JSON body holding either a bare array of allocations or `{"allocations": [...]}`
pub fn parse_allocations_json(body: &[u8]) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_slice(body)?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => match object.remove("allocations") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(StatsError::Format(
                "expected an \"allocations\" array".to_string(),
            )),
        },
        _ => Err(StatsError::Format(
            "expected an array of allocations".to_string(),
        )),
    }
}

/// Reads an allocation history CSV with a header row
/// Columns are keyed by their header, so any accepted field name works
pub fn read_allocations_csv<R: Read>(reader: R) -> Result<Vec<Value>> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let object: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(header, value)| (header.to_string(), Value::String(value.to_string())))
            .collect();
        rows.push(Value::Object(object));
    }

    Ok(rows)
}

/// Parses one allocation output file; the date comes from the file name
///
/// Each line reads `time - team - capacity - pitch - preferred`. Lines with a
/// different number of parts are skipped.
pub fn parse_output_file(date: &str, content: &str) -> Vec<Value> {
    let content = content.trim();
    if content == NO_ALLOCATIONS {
        return Vec::new();
    }

    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(" - ").collect();
            if parts.len() != 5 {
                return None;
            }
            let (time, team, pitch, preferred) = (parts[0], parts[1], parts[3], parts[4]);

            Some(serde_json::json!({
                "date": date,
                "time": time.trim(),
                "team": team.trim(),
                "pitch": pitch.trim(),
                "preferred": preferred.trim().eq_ignore_ascii_case("true"),
            }))
        })
        .collect()
}
