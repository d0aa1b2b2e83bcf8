//! Fixed-width data row decoding.
//!
//! Slices a raw data row at the column offsets of a [`Schema`], parses each
//! field per its declared kind and, for schemas with a time axis, rebuilds
//! the hour stamp of the row.

use crate::constants::fields;
use crate::error::{PostError, Result};
use crate::schema::{FieldSpec, ParseKind, Schema};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A parsed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Real(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// The fields every data row contributes to aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedRecord {
    pub x: f64,
    pub y: f64,
    pub zflag: f64,
    pub conc: f64,
    /// Hour stamp with zero-based hours; absent for schemas without a time axis
    pub timestamp: Option<NaiveDateTime>,
}

/// Decode one data row.
///
/// Fails with [`PostError::MalformedRecord`] when the row is shorter than the
/// schema's widest column, when a numeric field does not parse, or when the
/// stamp is outside the calendar.
pub fn decode(schema: &Schema, line: &str, century: i32) -> Result<DecodedRecord> {
    let width = schema.line_width();
    if line.len() < width {
        return Err(PostError::malformed(format!(
            "row has {} columns, schema '{}' needs {}",
            line.len(),
            schema.name(),
            width
        )));
    }

    let x = required_real(schema, line, fields::X)?;
    let y = required_real(schema, line, fields::Y)?;
    let zflag = required_real(schema, line, fields::ZFLAG)?;
    let conc = required_real(schema, line, fields::CONC)?;

    let timestamp = if schema.has_time_axis() {
        Some(decode_timestamp(schema, line, century)?)
    } else {
        None
    };

    Ok(DecodedRecord {
        x,
        y,
        zflag,
        conc,
        timestamp,
    })
}

/// Decode a single declared field of a row
pub fn decode_field(spec: &FieldSpec, line: &str) -> Result<FieldValue> {
    let raw = line.get(spec.start..spec.end).ok_or_else(|| {
        PostError::malformed(format!(
            "field '{}' ({}..{}) is beyond the end of a {}-column row",
            spec.name,
            spec.start,
            spec.end,
            line.len()
        ))
    })?;
    let text = raw.trim();

    match spec.kind {
        ParseKind::Integer => text.parse::<i64>().map(FieldValue::Integer).map_err(|e| {
            PostError::malformed(format!(
                "invalid integer for '{}': '{}' ({})",
                spec.name, text, e
            ))
        }),
        ParseKind::Real => text.parse::<f64>().map(FieldValue::Real).map_err(|e| {
            PostError::malformed(format!(
                "invalid number for '{}': '{}' ({})",
                spec.name, text, e
            ))
        }),
        ParseKind::Text => Ok(FieldValue::Text(text.to_string())),
    }
}

fn field_spec<'a>(schema: &'a Schema, name: &str) -> Result<&'a FieldSpec> {
    schema.field(name).ok_or_else(|| {
        PostError::malformed(format!(
            "schema '{}' does not declare field '{}'",
            schema.name(),
            name
        ))
    })
}

fn required_real(schema: &Schema, line: &str, name: &str) -> Result<f64> {
    let value = decode_field(field_spec(schema, name)?, line)?;
    value.as_f64().ok_or_else(|| {
        PostError::malformed(format!("field '{}' is not numeric", name))
    })
}

fn required_int(schema: &Schema, line: &str, name: &str) -> Result<i64> {
    let value = decode_field(field_spec(schema, name)?, line)?;
    match value {
        FieldValue::Integer(v) => Ok(v),
        FieldValue::Real(v) if v.fract() == 0.0 => Ok(v as i64),
        _ => Err(PostError::malformed(format!(
            "field '{}' is not an integer",
            name
        ))),
    }
}

/// Rebuild the stamp from two-digit year, month, day and 1-24 hour fields
fn decode_timestamp(schema: &Schema, line: &str, century: i32) -> Result<NaiveDateTime> {
    let yy = required_int(schema, line, fields::YEAR)?;
    let month = required_int(schema, line, fields::MONTH)?;
    let day = required_int(schema, line, fields::DAY)?;
    let hour = required_int(schema, line, fields::HOUR)? - 1;

    let year = i64::from(century) * 100 + yy;
    let year = i32::try_from(year)
        .map_err(|_| PostError::malformed(format!("year {} out of range", year)))?;

    let month = u32::try_from(month)
        .map_err(|_| PostError::malformed(format!("month {} out of range", month)))?;
    let day = u32::try_from(day)
        .map_err(|_| PostError::malformed(format!("day {} out of range", day)))?;
    let hour = u32::try_from(hour)
        .map_err(|_| PostError::malformed(format!("hour {} out of range", hour + 1)))?;

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        PostError::malformed(format!("invalid date {:04}-{:02}-{:02}", year, month, day))
    })?;

    date.and_hms_opt(hour, 0, 0).ok_or_else(|| {
        PostError::malformed(format!("hour {} out of range 1-24", hour + 1))
    })
}
