//! Conversion of raw header values to typed values.

use chrono::{DateTime, Utc};

use nanolab_model::{TypeTag, TypedValue};

use crate::error::{IngestError, Result};

/// Converts `raw` according to the type tag declared for `key`.
pub fn coerce(key: &str, raw: &str, type_tag: &str) -> Result<TypedValue> {
    let tag = TypeTag::parse(type_tag).ok_or_else(|| IngestError::UnsupportedType {
        key: key.to_string(),
        type_tag: type_tag.to_string(),
    })?;
    coerce_as(key, raw, tag)
}

/// Converts `raw` with an already-parsed tag.
pub fn coerce_as(key: &str, raw: &str, tag: TypeTag) -> Result<TypedValue> {
    let invalid = || IngestError::ValueParse {
        key: key.to_string(),
        value: raw.to_string(),
        type_tag: tag,
    };
    match tag {
        TypeTag::Float => raw
            .split_whitespace()
            .next()
            .and_then(parse_float)
            .map(TypedValue::Float)
            .ok_or_else(invalid),
        TypeTag::FloatNoUnit => parse_float(raw.trim())
            .map(TypedValue::Float)
            .ok_or_else(invalid),
        TypeTag::Int => raw
            .trim()
            .parse::<i64>()
            .map(TypedValue::Int)
            .map_err(|_| invalid()),
        TypeTag::Bool => Ok(TypedValue::Bool(raw == "True")),
        TypeTag::Datetime => parse_float(raw.trim())
            .and_then(epoch_seconds_to_datetime)
            .map(TypedValue::Timestamp)
            .ok_or_else(invalid),
        TypeTag::Str => Ok(TypedValue::Str(raw.to_string())),
    }
}

fn parse_float(token: &str) -> Option<f64> {
    token.parse::<f64>().ok()
}

/// Converts fractional Unix epoch seconds to a UTC timestamp.
pub fn epoch_seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let mut secs = whole as i64;
    let mut nanos = ((seconds - whole) * 1e9).round() as u32;
    if nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    DateTime::from_timestamp(secs, nanos)
}
