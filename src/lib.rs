//! UrbanOps Gateway Adapter
//!
//! Sits between the smart-city operations dashboard and its API gateway.
//!
//! ## Components
//!
//! 1. Session - explicit session context (init / establish / clear)
//! 2. ApiClient - authenticated requests and response classification
//! 3. Entities - canonical Incident/Sensor/Camera/Alert, normalizers, write payloads
//! 4. Dashboard - all-settled page loaders, incident filtering
//! 5. Geocode - reverse geocoding for the new-incident form
//!
//! ## Error model
//!
//! - Reads degrade to empty results and keep the page rendering
//! - Writes propagate the classified error to the caller
//! - 404 on a single fetch is `None`, 401 clears the session

pub mod api_client;
pub mod config;
pub mod dashboard;
pub mod entities;
pub mod error;
pub mod geocode;
pub mod session;

pub use api_client::ApiClient;
pub use config::AppConfig;
pub use error::{Error, Result};
pub use session::{FileSessionStore, SessionContext, SessionRecord};
