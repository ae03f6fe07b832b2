//! Canonical entity definitions
//!
//! The dashboard-facing shapes. Every field is populated; the normalizers in
//! [`super::normalize`] substitute the documented defaults. Serialized as
//! camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed enum with a lower-case display form and an upper-case wire form.
/// Unknown input falls back to the default variant through `From<&str>`.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident (default $default:ident) {
            $($variant:ident => $text:literal / $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            /// Case-insensitive parse, `None` for unknown values
            pub fn parse(s: &str) -> Option<Self> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Backend representation
            pub fn as_wire(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::parse(s).unwrap_or_default()
            }
        }
    };
}

// ============================================================
// Closed enums
// ============================================================

closed_enum! {
    /// Incident lifecycle status
    IncidentStatus (default Active) {
        Active => "active" / "ACTIVE",
        Investigating => "investigating" / "INVESTIGATING",
        Resolved => "resolved" / "RESOLVED",
        Closed => "closed" / "CLOSED",
    }
}

closed_enum! {
    /// Incident severity
    Severity (default Medium) {
        Critical => "critical" / "CRITICAL",
        High => "high" / "HIGH",
        Medium => "medium" / "MEDIUM",
        Low => "low" / "LOW",
    }
}

closed_enum! {
    /// Alert priority
    Priority (default Medium) {
        Critical => "critical" / "CRITICAL",
        High => "high" / "HIGH",
        Medium => "medium" / "MEDIUM",
        Low => "low" / "LOW",
    }
}

closed_enum! {
    /// CCTV camera status
    CameraStatus (default Offline) {
        Online => "online" / "ONLINE",
        Offline => "offline" / "OFFLINE",
        Maintenance => "maintenance" / "MAINTENANCE",
    }
}

// ============================================================
// Sensor Status / Kind (open-ended)
// ============================================================

/// Sensor status
///
/// The power service reports health as `OK`/`NORMAL`/`ACTIVE` as well as the
/// dashboard's online/offline/maintenance. Anything else is kept lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum SensorStatus {
    Online,
    Offline,
    Maintenance,
    Ok,
    Normal,
    Active,
    Other(String),
}

impl SensorStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Maintenance => "maintenance",
            Self::Ok => "ok",
            Self::Normal => "normal",
            Self::Active => "active",
            Self::Other(s) => s,
        }
    }

    /// Backend representation
    pub fn to_wire(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Online or one of the healthy aliases
    pub fn is_reporting(&self) -> bool {
        matches!(self, Self::Online | Self::Ok | Self::Normal | Self::Active)
    }
}

impl From<&str> for SensorStatus {
    fn from(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "online" => Self::Online,
            "offline" => Self::Offline,
            "maintenance" => Self::Maintenance,
            "ok" => Self::Ok,
            "normal" => Self::Normal,
            "active" => Self::Active,
            _ => Self::Other(lower),
        }
    }
}

impl From<String> for SensorStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<SensorStatus> for String {
    fn from(s: SensorStatus) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensor type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum SensorKind {
    Traffic,
    AirQuality,
    Noise,
    Water,
    Weather,
    Other(String),
}

impl Default for SensorKind {
    fn default() -> Self {
        Self::Traffic
    }
}

impl SensorKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Traffic => "traffic",
            Self::AirQuality => "air_quality",
            Self::Noise => "noise",
            Self::Water => "water",
            Self::Weather => "weather",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for SensorKind {
    fn from(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        match lower.replace([' ', '-'], "_").as_str() {
            "traffic" => Self::Traffic,
            "air_quality" | "airquality" => Self::AirQuality,
            "noise" => Self::Noise,
            "water" => Self::Water,
            "weather" => Self::Weather,
            _ => Self::Other(lower),
        }
    }
}

impl From<String> for SensorKind {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<SensorKind> for String {
    fn from(k: SensorKind) -> Self {
        k.as_str().to_string()
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// Entities
// ============================================================

/// Geographic position with a display address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl Location {
    /// Address-only location (the backend stores no coordinates)
    pub fn address(address: impl Into<String>) -> Self {
        Self {
            lat: 0.0,
            lng: 0.0,
            address: address.into(),
        }
    }
}

/// Incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: IncidentStatus,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub location: Location,
    pub reported_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
}

impl Incident {
    pub fn is_active(&self) -> bool {
        self.status == IncidentStatus::Active
    }
}

/// Latest sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastReading {
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
}

/// Sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<SensorKind>,
    pub status: Option<SensorStatus>,
    pub value: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_reading: LastReading,
    pub location: Location,
    pub metrics: Vec<serde_json::Value>,
}

impl Sensor {
    pub fn is_reporting(&self) -> bool {
        self.status.as_ref().map(|s| s.is_reporting()).unwrap_or(false)
    }
}

/// CCTV camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub id: String,
    pub name: String,
    pub location: Location,
    pub status: CameraStatus,
    pub stream_url: String,
    pub last_updated: DateTime<Utc>,
}

impl Camera {
    pub fn is_online(&self) -> bool {
        self.status == CameraStatus::Online
    }

    pub fn has_stream(&self) -> bool {
        !self.stream_url.is_empty()
    }
}

/// Alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Critical or high priority; counted as an active alert
    pub fn is_urgent(&self) -> bool {
        matches!(self.priority, Priority::Critical | Priority::High)
    }
}
