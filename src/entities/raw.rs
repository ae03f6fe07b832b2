//! Raw backend shapes
//!
//! The gateway's services disagree on shapes: ids arrive as numbers or
//! strings, locations as a flat address or a nested object, timestamps as
//! ISO strings or epoch numbers, and field names in camelCase or snake_case.
//! Each variant is modelled here and validated at the boundary; anything
//! that matches no variant is treated as missing.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

// ============================================================
// Shape variants
// ============================================================

/// Entity id
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(serde_json::Number),
    Text(String),
}

impl RawId {
    pub fn from_value(value: &Value) -> Option<Self> {
        RawId::deserialize(value).ok()
    }
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// Location: flat address string or nested object
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawLocation {
    Flat(String),
    Nested {
        #[serde(default)]
        lat: Option<f64>,
        #[serde(default, alias = "lon", alias = "longitude")]
        lng: Option<f64>,
        #[serde(default, alias = "name")]
        address: Option<String>,
    },
}

impl RawLocation {
    pub fn from_value(value: &Value) -> Option<Self> {
        RawLocation::deserialize(value).ok()
    }

    /// Non-blank address carried by either variant
    pub fn address(&self) -> Option<&str> {
        let addr = match self {
            Self::Flat(s) => Some(s.as_str()),
            Self::Nested { address, .. } => address.as_deref(),
        };
        addr.map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn coordinates(&self) -> (f64, f64) {
        match self {
            Self::Flat(_) => (0.0, 0.0),
            Self::Nested { lat, lng, .. } => (lat.unwrap_or(0.0), lng.unwrap_or(0.0)),
        }
    }
}

/// Timestamp: ISO-8601 text or epoch number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Epoch(f64),
    Text(String),
}

/// Epoch values above this are milliseconds rather than seconds
const EPOCH_MILLIS_THRESHOLD: f64 = 100_000_000_000.0;

impl RawTimestamp {
    pub fn from_value(value: &Value) -> Option<Self> {
        RawTimestamp::deserialize(value).ok()
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Epoch(n) if n.is_finite() => {
                let millis = if n.abs() >= EPOCH_MILLIS_THRESHOLD {
                    *n
                } else {
                    n * 1000.0
                };
                Utc.timestamp_millis_opt(millis.round() as i64).single()
            }
            Self::Epoch(_) => None,
            Self::Text(s) => parse_text_timestamp(s.trim()),
        }
    }
}

fn parse_text_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // LocalDateTime without offset, assumed UTC
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(n) = s.parse::<f64>() {
        return RawTimestamp::Epoch(n).to_datetime();
    }
    None
}

// ============================================================
// Field access
// ============================================================

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Field lookup tolerant of key casing (`lastUpdated`, `last_updated`,
/// `LastUpdated`). Null values count as absent.
pub fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    if let Some(v) = obj.get(name) {
        return Some(v).filter(|v| !v.is_null());
    }
    let wanted = normalize_key(name);
    obj.iter()
        .find(|(k, _)| normalize_key(k) == wanted)
        .map(|(_, v)| v)
        .filter(|v| !v.is_null())
}

/// Non-blank string field
pub fn text(obj: &Map<String, Value>, name: &str) -> Option<String> {
    match field(obj, name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Numeric field, numeric strings accepted
pub fn number(obj: &Map<String, Value>, name: &str) -> Option<f64> {
    match field(obj, name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Timestamp field
pub fn timestamp(obj: &Map<String, Value>, name: &str) -> Option<DateTime<Utc>> {
    RawTimestamp::from_value(field(obj, name)?)?.to_datetime()
}

// ============================================================
// Raw records
// ============================================================

/// Incident as sent by the traffic service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawIncident {
    pub id: Option<RawId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub severity: Option<String>,
    pub location: Option<RawLocation>,
    pub reported_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
}

impl RawIncident {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            id: field(obj, "id").and_then(RawId::from_value),
            title: text(obj, "title"),
            description: text(obj, "description"),
            status: text(obj, "status"),
            severity: text(obj, "severity"),
            location: field(obj, "location").and_then(RawLocation::from_value),
            reported_at: timestamp(obj, "reportedAt").or_else(|| timestamp(obj, "createdAt")),
            resolved_at: timestamp(obj, "resolvedAt"),
            assigned_to: text(obj, "assignedTo"),
            tags: string_list(field(obj, "tags")),
        }
    }
}

/// Sensor as sent by the power service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSensor {
    pub id: Option<RawId>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub value: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RawSensor {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            id: field(obj, "id").and_then(RawId::from_value),
            kind: text(obj, "type"),
            status: text(obj, "status"),
            value: number(obj, "value"),
            last_updated: timestamp(obj, "lastUpdated"),
        }
    }
}

/// Camera as sent by the CCTV service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCamera {
    pub id: Option<RawId>,
    pub name: Option<String>,
    pub location: Option<RawLocation>,
    pub status: Option<String>,
    pub stream_url: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RawCamera {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            id: field(obj, "id").and_then(RawId::from_value),
            name: text(obj, "name"),
            location: field(obj, "location").and_then(RawLocation::from_value),
            status: text(obj, "status"),
            stream_url: text(obj, "streamUrl"),
            last_updated: timestamp(obj, "lastUpdated"),
        }
    }
}

/// Alert as sent by the alert service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAlert {
    pub id: Option<RawId>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub priority: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawAlert {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            id: field(obj, "id").and_then(RawId::from_value),
            title: text(obj, "title"),
            message: text(obj, "message"),
            priority: text(obj, "priority"),
            timestamp: timestamp(obj, "timestamp"),
        }
    }
}

/// Ordered string list; scalars are stringified, nested values dropped
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
