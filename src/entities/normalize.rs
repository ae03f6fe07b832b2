//! Entity normalizers
//!
//! Pure functions from a raw backend record to a canonical entity. The clock
//! is passed in, so the same input always yields the same output. None of
//! them fail: missing or malformed fields fall back to the defaults below.

use super::raw::{RawAlert, RawCamera, RawIncident, RawSensor};
use super::types::{
    Alert, Camera, CameraStatus, Incident, IncidentStatus, LastReading, Location, Priority,
    Sensor, SensorKind, SensorStatus, Severity,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Default values substituted for missing fields
pub mod defaults {
    pub const INCIDENT_TITLE: &str = "Untitled Incident";
    pub const INCIDENT_TYPE: &str = "traffic";
    pub const UNKNOWN_LOCATION: &str = "Unknown Location";
    pub const SENSOR_LOCATION: &str = "Sensor Location";
    pub const SENSOR_UNIT: &str = "units";
    pub const ALERT_TITLE: &str = "Alert";
}

fn empty_object() -> &'static Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    EMPTY.get_or_init(Map::new)
}

fn as_object(value: &Value) -> &Map<String, Value> {
    value.as_object().unwrap_or_else(|| empty_object())
}

/// Normalize a raw incident
pub fn normalize_incident(value: &Value, now: DateTime<Utc>) -> Incident {
    let raw = RawIncident::from_object(as_object(value));

    let description = raw.description.clone().unwrap_or_default();
    let title = raw
        .title
        .or(raw.description)
        .unwrap_or_else(|| defaults::INCIDENT_TITLE.to_string());

    let (lat, lng) = raw
        .location
        .as_ref()
        .map(|l| l.coordinates())
        .unwrap_or((0.0, 0.0));
    let address = raw
        .location
        .as_ref()
        .and_then(|l| l.address())
        .unwrap_or(defaults::UNKNOWN_LOCATION)
        .to_string();

    Incident {
        id: raw.id.map(|id| id.to_string()).unwrap_or_default(),
        title,
        description,
        status: raw.status.as_deref().map(IncidentStatus::from).unwrap_or_default(),
        severity: raw.severity.as_deref().map(Severity::from).unwrap_or_default(),
        incident_type: defaults::INCIDENT_TYPE.to_string(),
        location: Location { lat, lng, address },
        reported_at: raw.reported_at.unwrap_or(now),
        resolved_at: raw.resolved_at,
        assigned_to: raw.assigned_to,
        tags: raw.tags,
    }
}

/// Normalize a raw sensor
///
/// The power service has no coordinates, so the location is a placeholder.
pub fn normalize_sensor(value: &Value, now: DateTime<Utc>) -> Sensor {
    let raw = RawSensor::from_object(as_object(value));
    let id = raw.id.map(|id| id.to_string()).unwrap_or_default();

    Sensor {
        name: format!("Sensor {}", id),
        id,
        kind: raw.kind.as_deref().map(SensorKind::from),
        status: raw.status.as_deref().map(SensorStatus::from),
        value: raw.value,
        last_updated: raw.last_updated,
        last_reading: LastReading {
            value: raw.value.unwrap_or(0.0),
            unit: defaults::SENSOR_UNIT.to_string(),
            timestamp: raw.last_updated.unwrap_or(now),
        },
        location: Location::address(defaults::SENSOR_LOCATION),
        metrics: Vec::new(),
    }
}

/// Normalize a raw camera
pub fn normalize_camera(value: &Value, now: DateTime<Utc>) -> Camera {
    let raw = RawCamera::from_object(as_object(value));
    let id = raw.id.map(|id| id.to_string()).unwrap_or_default();

    let (lat, lng) = raw
        .location
        .as_ref()
        .map(|l| l.coordinates())
        .unwrap_or((0.0, 0.0));
    let address = raw
        .location
        .as_ref()
        .and_then(|l| l.address())
        .unwrap_or(defaults::UNKNOWN_LOCATION)
        .to_string();

    Camera {
        name: raw.name.unwrap_or_else(|| format!("Camera {}", id)),
        id,
        location: Location { lat, lng, address },
        status: raw.status.as_deref().map(CameraStatus::from).unwrap_or_default(),
        stream_url: raw.stream_url.unwrap_or_default(),
        last_updated: raw.last_updated.unwrap_or(now),
    }
}

/// Normalize a raw alert
pub fn normalize_alert(value: &Value, now: DateTime<Utc>) -> Alert {
    let raw = RawAlert::from_object(as_object(value));

    Alert {
        id: raw.id.map(|id| id.to_string()).unwrap_or_default(),
        title: raw.title.unwrap_or_else(|| defaults::ALERT_TITLE.to_string()),
        message: raw.message.unwrap_or_default(),
        priority: raw.priority.as_deref().map(Priority::from).unwrap_or_default(),
        timestamp: raw.timestamp.unwrap_or(now),
    }
}

/// Normalize a list response.
///
/// Null or non-array payloads yield an empty list; non-object entries are
/// skipped.
pub fn normalize_list<T>(
    payload: Option<&Value>,
    now: DateTime<Utc>,
    normalize: impl Fn(&Value, DateTime<Utc>) -> T,
) -> Vec<T> {
    let Some(Value::Array(items)) = payload else {
        if payload.is_some() {
            debug!("List response is not an array, treating as empty");
        }
        return Vec::new();
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if item.is_object() {
            out.push(normalize(item, now));
        } else {
            debug!(item = %item, "Skipping non-object list entry");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_incident_defaults() {
        let incident = normalize_incident(&json!({"id": 12}), clock());
        assert_eq!(incident.id, "12");
        assert_eq!(incident.title, defaults::INCIDENT_TITLE);
        assert_eq!(incident.description, "");
        assert_eq!(incident.status, IncidentStatus::Active);
        assert_eq!(incident.severity, Severity::Medium);
        assert_eq!(incident.incident_type, "traffic");
        assert_eq!(incident.location, Location::address(defaults::UNKNOWN_LOCATION));
        assert_eq!(incident.reported_at, clock());
        assert!(incident.resolved_at.is_none());
        assert!(incident.assigned_to.is_none());
        assert!(incident.tags.is_empty());
    }

    #[test]
    fn test_incident_missing_severity_is_medium() {
        for raw in [
            json!({"id": 1, "status": "ACTIVE"}),
            json!({"id": 2, "severity": null}),
            json!({"id": 3, "severity": ""}),
            json!({"id": 4, "severity": 3}),
        ] {
            assert_eq!(normalize_incident(&raw, clock()).severity, Severity::Medium);
        }
    }

    #[test]
    fn test_incident_backend_shape() {
        let raw = json!({
            "id": 5,
            "description": "Signal failure at junction",
            "location": "5th Ave",
            "status": "INVESTIGATING",
            "severity": "HIGH"
        });
        let incident = normalize_incident(&raw, clock());
        assert_eq!(incident.title, "Signal failure at junction");
        assert_eq!(incident.description, "Signal failure at junction");
        assert_eq!(incident.status, IncidentStatus::Investigating);
        assert_eq!(incident.severity, Severity::High);
        assert_eq!(incident.location.address, "5th Ave");
    }

    #[test]
    fn test_incident_nested_location_and_extras() {
        let raw = json!({
            "id": "INC-1",
            "location": {"lat": 40.7, "lng": -74.0, "address": "Broadway"},
            "resolved_at": "2024-05-01T09:30:00Z",
            "assignedTo": "dispatch",
            "tags": ["flood", "road"]
        });
        let incident = normalize_incident(&raw, clock());
        assert_eq!(incident.location.lat, 40.7);
        assert_eq!(incident.location.address, "Broadway");
        assert_eq!(incident.resolved_at.unwrap().to_rfc3339(), "2024-05-01T09:30:00+00:00");
        assert_eq!(incident.assigned_to.as_deref(), Some("dispatch"));
        assert_eq!(incident.tags, vec!["flood", "road"]);
    }

    #[test]
    fn test_sensor_scenario() {
        let sensor = normalize_sensor(&json!({"id": 7, "status": "OK", "value": 42}), clock());
        assert_eq!(sensor.id, "7");
        assert_eq!(sensor.name, "Sensor 7");
        assert_eq!(sensor.status, Some(SensorStatus::Ok));
        assert_eq!(sensor.value, Some(42.0));
        assert_eq!(sensor.last_reading.value, 42.0);
        assert_eq!(sensor.last_reading.unit, "units");
        assert_eq!(sensor.last_reading.timestamp, clock());

        let json = serde_json::to_value(&sensor).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["lastReading"]["value"], 42.0);
    }

    #[test]
    fn test_sensor_missing_fields() {
        let sensor = normalize_sensor(&json!({"id": 8}), clock());
        assert!(sensor.kind.is_none());
        assert!(sensor.status.is_none());
        assert!(sensor.value.is_none());
        assert!(sensor.last_updated.is_none());
        assert_eq!(sensor.last_reading.value, 0.0);
        assert_eq!(sensor.location.address, defaults::SENSOR_LOCATION);
        assert!(!sensor.is_reporting());
    }

    #[test]
    fn test_sensor_zero_value_is_kept() {
        let sensor = normalize_sensor(&json!({"id": 9, "value": 0, "type": "AIR_QUALITY"}), clock());
        assert_eq!(sensor.value, Some(0.0));
        assert_eq!(sensor.kind, Some(SensorKind::AirQuality));
    }

    #[test]
    fn test_camera_defaults() {
        let camera = normalize_camera(&json!({"id": 3, "status": 5}), clock());
        assert_eq!(camera.name, "Camera 3");
        assert_eq!(camera.status, CameraStatus::Offline);
        assert_eq!(camera.stream_url, "");
        assert_eq!(camera.location.address, defaults::UNKNOWN_LOCATION);
        assert_eq!(camera.last_updated, clock());
    }

    #[test]
    fn test_camera_backend_shape() {
        let raw = json!({
            "id": 4,
            "name": "Gate cam",
            "location": "North Gate",
            "status": "ONLINE",
            "streamUrl": "rtsp://10.0.0.4/live",
            "lastUpdated": "2024-04-30T23:00:00Z"
        });
        let camera = normalize_camera(&raw, clock());
        assert!(camera.is_online());
        assert!(camera.has_stream());
        assert_eq!(camera.location.address, "North Gate");
        assert_ne!(camera.last_updated, clock());
    }

    #[test]
    fn test_alert_defaults() {
        let alert = normalize_alert(&json!({"id": 1, "priority": "CRITICAL"}), clock());
        assert_eq!(alert.title, "Alert");
        assert_eq!(alert.message, "");
        assert_eq!(alert.priority, Priority::Critical);
        assert_eq!(alert.timestamp, clock());

        let alert = normalize_alert(&json!({"id": 2}), clock());
        assert_eq!(alert.priority, Priority::Medium);
    }

    #[test]
    fn test_normalizers_are_deterministic() {
        let raw = json!({"id": 1, "description": "x"});
        assert_eq!(normalize_incident(&raw, clock()), normalize_incident(&raw, clock()));
    }

    #[test]
    fn test_non_object_record_gets_defaults() {
        let incident = normalize_incident(&json!("garbage"), clock());
        assert_eq!(incident.id, "");
        assert_eq!(incident.severity, Severity::Medium);
    }

    #[test]
    fn test_list_non_array_is_empty() {
        assert!(normalize_list(None, clock(), normalize_incident).is_empty());
        assert!(normalize_list(Some(&Value::Null), clock(), normalize_incident).is_empty());
        assert!(normalize_list(Some(&json!({"items": []})), clock(), normalize_sensor).is_empty());
        assert!(normalize_list(Some(&json!("text")), clock(), normalize_camera).is_empty());
    }

    #[test]
    fn test_list_skips_non_objects() {
        let payload = json!([{"id": 1}, 2, null, {"id": 3}]);
        let alerts = normalize_list(Some(&payload), clock(), normalize_alert);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[1].id, "3");
    }
}
