//! Turns loosely typed source rows into canonical records.
//!
//! Nothing in here fails: absent, blank or non-numeric fields fall back to
//! their defaults so downstream sums stay total.

use serde_json::Value;

use crate::models::{CredentialRecord, CredentialStatus, DoctorRow, SurveillanceRecord, UNKNOWN};

pub const KEY_YEAR: &str = "Year";
pub const KEY_WEEK: &str = "Week";
pub const KEY_AREA: &str = "Area";
pub const KEY_DISEASE: &str = "Disease";
pub const KEY_CASES: &str = "No of cases";
pub const KEY_DEATHS: &str = "No of deaths";
pub const KEY_UNIQUE_ID: &str = "Unique id";
pub const KEY_STATE: &str = "State";
pub const KEY_DATE_START: &str = "Date of start";
pub const KEY_DATE_REPORTING: &str = "Date of reporting";

pub fn normalize_rows(rows: &[Value]) -> Vec<SurveillanceRecord> {
    rows.iter().map(normalize_row).collect()
}

pub fn normalize_row(row: &Value) -> SurveillanceRecord {
    let field = |key: &str| row.get(key);

    SurveillanceRecord {
        year: parse_int(field(KEY_YEAR)).and_then(|v| i32::try_from(v).ok()),
        week: parse_int(field(KEY_WEEK)).and_then(|v| i32::try_from(v).ok()),
        area: label(field(KEY_AREA)),
        disease: label(field(KEY_DISEASE)),
        cases: parse_count(field(KEY_CASES)),
        deaths: parse_count(field(KEY_DEATHS)),
        unique_id: text(field(KEY_UNIQUE_ID)),
        state: text(field(KEY_STATE)),
        date_start: text(field(KEY_DATE_START)),
        date_reporting: text(field(KEY_DATE_REPORTING)),
    }
}

/// Non-negative count; anything unparsable or negative becomes 0.
pub fn parse_count(value: Option<&Value>) -> u64 {
    parse_int(value)
        .map(|v| u64::try_from(v).unwrap_or(0))
        .unwrap_or(0)
}

/// Leading-integer parse: numbers truncate toward zero, strings take an
/// optional sign followed by digits and ignore whatever trails them.
pub fn parse_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude = rest[..digits_len].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

fn label(value: Option<&Value>) -> String {
    let text = text(value);
    if text.is_empty() {
        UNKNOWN.to_string()
    } else {
        text
    }
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

pub fn normalize_credential(row: DoctorRow) -> CredentialRecord {
    CredentialRecord {
        id: row.id,
        name: row.full_name.unwrap_or_default(),
        email: row.email.unwrap_or_default(),
        license: row.license_number.unwrap_or_default(),
        specialization: row.specialization.unwrap_or_default(),
        status: row
            .status
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(CredentialStatus::Pending),
        created_at: row.created_at,
    }
}
