//! Entities Module
//!
//! Canonical dashboard entities (Incident, Sensor, Camera, Alert), the raw
//! backend shapes they are normalized from, and the payloads written back.
//!
//! ## Module layout
//! - `types`: canonical entities and status enums
//! - `raw`: tolerant raw shapes and field access
//! - `normalize`: raw → canonical
//! - `payload`: draft → backend write body

pub mod normalize;
pub mod payload;
pub mod raw;
pub mod types;

pub use normalize::{
    normalize_alert, normalize_camera, normalize_incident, normalize_list, normalize_sensor,
};
pub use payload::{
    AlertDraft, AlertPayload, CameraDraft, CameraPayload, IncidentDraft, IncidentPayload,
    LocationInput, SensorDraft, SensorPayload,
};
pub use types::*;
