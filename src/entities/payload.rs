//! Write payloads
//!
//! Drafts mirror the dashboard's form state; payloads are what the backend
//! services accept. Enum fields are upper-cased on the way out and blank
//! fields replaced with fixed fallbacks.

use super::normalize::defaults;
use super::types::{
    Alert, Camera, CameraStatus, Incident, IncidentStatus, Location, Priority, Sensor,
    SensorKind, SensorStatus, Severity,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Location as entered in a form: free text or a picked position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationInput {
    Text(String),
    Structured(Location),
}

impl LocationInput {
    /// Non-blank address
    pub fn address(&self) -> Option<&str> {
        let addr = match self {
            Self::Text(s) => s.as_str(),
            Self::Structured(l) => l.address.as_str(),
        };
        Some(addr.trim()).filter(|s| !s.is_empty())
    }
}

impl From<&str> for LocationInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn address_or_unknown(location: &Option<LocationInput>) -> String {
    location
        .as_ref()
        .and_then(|l| l.address())
        .unwrap_or(defaults::UNKNOWN_LOCATION)
        .to_string()
}

// ============================================================
// Incident
// ============================================================

/// Incident form state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<LocationInput>,
    pub status: Option<IncidentStatus>,
    pub severity: Option<Severity>,
}

impl From<&Incident> for IncidentDraft {
    fn from(incident: &Incident) -> Self {
        Self {
            title: Some(incident.title.clone()),
            description: Some(incident.description.clone()),
            location: Some(LocationInput::Structured(incident.location.clone())),
            status: Some(incident.status),
            severity: Some(incident.severity),
        }
    }
}

/// Body for `POST /incidents` and `PUT /incidents/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentPayload {
    pub description: String,
    pub location: String,
    pub status: String,
    pub severity: String,
}

impl IncidentPayload {
    pub fn from_draft(draft: &IncidentDraft) -> Self {
        let description = non_blank(&draft.description)
            .or_else(|| non_blank(&draft.title))
            .unwrap_or_default()
            .to_string();

        Self {
            description,
            location: address_or_unknown(&draft.location),
            status: draft.status.unwrap_or_default().as_wire().to_string(),
            severity: draft.severity.unwrap_or_default().as_wire().to_string(),
        }
    }
}

// ============================================================
// Sensor
// ============================================================

/// Sensor form state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDraft {
    #[serde(rename = "type")]
    pub kind: Option<SensorKind>,
    pub value: Option<f64>,
    /// Value shown in the last-reading field of the edit form
    pub last_reading_value: Option<f64>,
    pub status: Option<SensorStatus>,
}

impl From<&Sensor> for SensorDraft {
    fn from(sensor: &Sensor) -> Self {
        Self {
            kind: sensor.kind.clone(),
            value: sensor.value,
            last_reading_value: Some(sensor.last_reading.value),
            status: sensor.status.clone(),
        }
    }
}

/// Body for `POST /sensors` and `PUT /sensors/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    pub status: String,
    pub last_updated: DateTime<Utc>,
}

impl SensorPayload {
    pub fn from_draft(draft: &SensorDraft, now: DateTime<Utc>) -> Self {
        Self {
            kind: draft.kind.clone().unwrap_or_default().as_str().to_string(),
            value: draft.value.or(draft.last_reading_value).unwrap_or(0.0),
            status: draft
                .status
                .as_ref()
                .map(|s| s.to_wire())
                .unwrap_or_else(|| SensorStatus::Online.to_wire()),
            last_updated: now,
        }
    }
}

// ============================================================
// Camera
// ============================================================

/// Camera form state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDraft {
    pub name: Option<String>,
    pub location: Option<LocationInput>,
    pub status: Option<CameraStatus>,
    pub stream_url: Option<String>,
}

impl From<&Camera> for CameraDraft {
    fn from(camera: &Camera) -> Self {
        Self {
            name: Some(camera.name.clone()),
            location: Some(LocationInput::Structured(camera.location.clone())),
            status: Some(camera.status),
            stream_url: Some(camera.stream_url.clone()),
        }
    }
}

/// Body for `POST /cameras` and `PUT /cameras/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPayload {
    pub name: String,
    pub location: String,
    pub status: String,
    pub stream_url: String,
    pub last_updated: DateTime<Utc>,
}

impl CameraPayload {
    pub fn from_draft(draft: &CameraDraft, now: DateTime<Utc>) -> Self {
        let name = non_blank(&draft.name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Camera {}", now.timestamp_millis()));

        Self {
            name,
            location: address_or_unknown(&draft.location),
            status: draft.status.unwrap_or_default().as_wire().to_string(),
            stream_url: non_blank(&draft.stream_url).unwrap_or_default().to_string(),
            last_updated: now,
        }
    }
}

// ============================================================
// Alert
// ============================================================

/// Alert form state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDraft {
    pub title: Option<String>,
    pub message: Option<String>,
    pub priority: Option<Priority>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<&Alert> for AlertDraft {
    fn from(alert: &Alert) -> Self {
        Self {
            title: Some(alert.title.clone()),
            message: Some(alert.message.clone()),
            priority: Some(alert.priority),
            timestamp: Some(alert.timestamp),
        }
    }
}

/// Body for `POST /alerts` and `PUT /alerts/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPayload {
    pub title: String,
    pub message: String,
    pub priority: String,
    pub timestamp: DateTime<Utc>,
}

impl AlertPayload {
    pub fn from_draft(draft: &AlertDraft, now: DateTime<Utc>) -> Self {
        Self {
            title: non_blank(&draft.title)
                .unwrap_or(defaults::ALERT_TITLE)
                .to_string(),
            message: draft.message.clone().unwrap_or_default(),
            priority: draft.priority.unwrap_or_default().as_wire().to_string(),
            timestamp: draft.timestamp.unwrap_or(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::normalize::{normalize_incident, normalize_sensor};
    use chrono::TimeZone;
    use serde_json::json;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_incident_payload_defaults() {
        let draft = IncidentDraft {
            title: Some("Pothole".to_string()),
            location: Some("Main St".into()),
            ..Default::default()
        };
        let payload = serde_json::to_value(IncidentPayload::from_draft(&draft)).unwrap();
        assert_eq!(
            payload,
            json!({
                "description": "Pothole",
                "location": "Main St",
                "status": "ACTIVE",
                "severity": "MEDIUM"
            })
        );
    }

    #[test]
    fn test_incident_payload_blank_location() {
        let draft = IncidentDraft {
            description: Some("Flooding".to_string()),
            location: Some("  ".into()),
            status: Some(IncidentStatus::Resolved),
            severity: Some(Severity::Low),
            ..Default::default()
        };
        let payload = IncidentPayload::from_draft(&draft);
        assert_eq!(payload.location, "Unknown Location");
        assert_eq!(payload.status, "RESOLVED");
        assert_eq!(payload.severity, "LOW");
    }

    #[test]
    fn test_incident_round_trip_preserves_status_and_severity() {
        for (status, severity) in [
            ("ACTIVE", "HIGH"),
            ("investigating", "critical"),
            ("Resolved", "Low"),
            ("CLOSED", "medium"),
        ] {
            let raw = json!({"id": 1, "description": "d", "status": status, "severity": severity});
            let incident = normalize_incident(&raw, clock());

            let payload = IncidentPayload::from_draft(&IncidentDraft::from(&incident));
            let mut echo = serde_json::to_value(&payload).unwrap();
            echo["id"] = json!(1);
            let echoed = normalize_incident(&echo, clock());

            assert_eq!(echoed.status.as_str(), status.to_lowercase());
            assert_eq!(echoed.severity.as_str(), severity.to_lowercase());
            assert_eq!(echoed.location.address, incident.location.address);
        }
    }

    #[test]
    fn test_sensor_payload() {
        let payload = SensorPayload::from_draft(&SensorDraft::default(), clock());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "traffic");
        assert_eq!(json["value"], 0.0);
        assert_eq!(json["status"], "ONLINE");
        assert!(json.get("lastUpdated").is_some());

        let sensor = normalize_sensor(&json!({"id": 7, "status": "ok", "value": 42}), clock());
        let payload = SensorPayload::from_draft(&SensorDraft::from(&sensor), clock());
        assert_eq!(payload.status, "OK");
        assert_eq!(payload.value, 42.0);
    }

    #[test]
    fn test_sensor_payload_falls_back_to_last_reading() {
        let draft = SensorDraft {
            last_reading_value: Some(17.5),
            kind: Some(SensorKind::Noise),
            ..Default::default()
        };
        let payload = SensorPayload::from_draft(&draft, clock());
        assert_eq!(payload.value, 17.5);
        assert_eq!(payload.kind, "noise");
    }

    #[test]
    fn test_camera_payload_defaults() {
        let payload = CameraPayload::from_draft(&CameraDraft::default(), clock());
        assert_eq!(payload.name, format!("Camera {}", clock().timestamp_millis()));
        assert_eq!(payload.location, "Unknown Location");
        assert_eq!(payload.status, "OFFLINE");
        assert_eq!(payload.stream_url, "");

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("streamUrl").is_some());
    }

    #[test]
    fn test_alert_payload_defaults() {
        let payload = AlertPayload::from_draft(&AlertDraft::default(), clock());
        assert_eq!(payload.title, "Alert");
        assert_eq!(payload.message, "");
        assert_eq!(payload.priority, "MEDIUM");
        assert_eq!(payload.timestamp, clock());
    }

    #[test]
    fn test_location_input_deserializes_both_shapes() {
        let text: LocationInput = serde_json::from_value(json!("Main St")).unwrap();
        assert_eq!(text.address(), Some("Main St"));
        let structured: LocationInput =
            serde_json::from_value(json!({"lat": 1.0, "lng": 2.0, "address": "Pier 4"})).unwrap();
        assert_eq!(structured.address(), Some("Pier 4"));
    }
}
