//! ApiClient Module
//!
//! ## Overview
//! Adapter between the dashboard and the UrbanOps API gateway.
//!
//! ## Module layout
//! - `request`: request description and auth headers
//! - `response`: response classification
//! - `client`: `ApiClient` (auth, entity CRUD, predictions, counts)
//!
//! ## Example
//! ```rust,ignore
//! use urbanops_adapter::{ApiClient, AppConfig, SessionContext};
//!
//! let config = AppConfig::default();
//! let session = Arc::new(SessionContext::new(Arc::new(FileSessionStore::new(&config.session_file))));
//! session.init().await?;
//!
//! let client = ApiClient::new(&config, session)?;
//! client.login("operator", "secret").await?;
//! let incidents = client.list_incidents().await;
//! ```
//!
//! ## Auth headers
//! Attached to every call while a session exists:
//! - `Authorization: Bearer <token>`
//! - `X-Username: <username>`

pub mod client;
pub mod request;
pub mod response;

pub use client::{endpoints, ApiClient};
pub use request::{ApiRequest, AuthHeaders};
pub use response::{classify, Outcome, Payload};
