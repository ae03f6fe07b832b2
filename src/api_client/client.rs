//! Gateway HTTP client
//!
//! ## Overview
//! One client per dashboard process. Every authenticated call goes through
//! [`ApiClient::execute`], which attaches the session credentials, classifies
//! the response and clears the session on 401.
//!
//! ## Reads vs writes
//! Reads (`list_*`, `get_*`, `profile`, `predictions`, counts) degrade every
//! failure to an empty result so pages keep rendering; each has a `try_*`
//! twin that returns the classified error. Writes propagate.

use crate::api_client::request::{ApiRequest, AuthHeaders};
use crate::api_client::response::{classify, extract_error_message, Outcome, Payload};
use crate::config::AppConfig;
use crate::entities::{
    normalize_alert, normalize_camera, normalize_incident, normalize_list, normalize_sensor,
    Alert, AlertDraft, AlertPayload, Camera, CameraDraft, CameraPayload, Incident,
    IncidentDraft, IncidentPayload, Sensor, SensorDraft, SensorPayload,
};
use crate::error::{Error, Result, NETWORK_UNAVAILABLE_MESSAGE};
use crate::session::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    SessionContext, SessionRecord,
};
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Gateway endpoint paths
pub mod endpoints {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const PROFILE: &str = "/auth/profile";
    pub const CHANGE_PASSWORD: &str = "/auth/change-password";
    pub const INCIDENTS: &str = "/incidents";
    pub const SENSORS: &str = "/sensors";
    pub const CAMERAS: &str = "/cameras";
    pub const ALERTS: &str = "/alerts";
    pub const PREDICTIONS: &str = "/predictions";

    pub fn list(collection: &str) -> String {
        format!("{}/list", collection)
    }

    /// Item path; the id is percent-encoded as a single segment
    pub fn item(collection: &str, id: &str) -> String {
        format!("{}/{}", collection, urlencoding::encode(id.trim()))
    }
}

type Normalizer<T> = fn(&Value, DateTime<Utc>) -> T;

/// UrbanOps gateway client
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl ApiClient {
    /// Create a client for `config`, sharing `session`
    pub fn new(config: &AppConfig, session: Arc<SessionContext>) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("urbanops-adapter/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url: config.api_base().to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    // ========================================
    // Core request path
    // ========================================

    /// Send an authenticated request and classify the response.
    ///
    /// `Ok(None)` means 404.
    pub async fn execute(&self, request: ApiRequest) -> Result<Option<Payload>> {
        let auth = self
            .session
            .credentials()
            .await
            .map(|(token, username)| AuthHeaders::new(token, username));

        debug!(
            method = %request.method,
            endpoint = %request.endpoint,
            authenticated = auth.is_some(),
            "Sending gateway request"
        );

        let response = request
            .build(&self.http, &self.base_url, auth.as_ref())
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %request.endpoint, error = %e, "Gateway unreachable");
                Error::from_transport(e)
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = match response.bytes().await {
            Ok(b) => Some(b),
            Err(e) if status.is_success() => {
                warn!(endpoint = %request.endpoint, error = %e, "Response body interrupted");
                return Err(Error::NetworkUnavailable(e.to_string()));
            }
            Err(e) => {
                warn!(endpoint = %request.endpoint, error = %e, "Failed to read error body");
                None
            }
        };

        match classify(status, content_type.as_deref(), body.as_deref()) {
            Outcome::Success(payload) => {
                debug!(endpoint = %request.endpoint, status = %status, "Gateway request succeeded");
                Ok(Some(payload))
            }
            Outcome::NotFound => {
                debug!(endpoint = %request.endpoint, "Gateway returned 404");
                Ok(None)
            }
            Outcome::Unauthorized => {
                warn!(endpoint = %request.endpoint, "Gateway rejected session, clearing it");
                if let Err(e) = self.session.clear().await {
                    error!(error = %e, "Failed to clear expired session");
                }
                Err(Error::SessionExpired)
            }
            Outcome::ApiError(message) => {
                warn!(
                    endpoint = %request.endpoint,
                    status = %status,
                    message = %message,
                    "Gateway request failed"
                );
                Err(Error::Api(message))
            }
        }
    }

    fn degrade<T: Default>(endpoint: &str, result: Result<T>) -> T {
        result.unwrap_or_else(|e| {
            warn!(
                endpoint = %endpoint,
                error_code = e.code(),
                error = %e,
                "Read failed, rendering empty result"
            );
            T::default()
        })
    }

    async fn fetch_list<T>(&self, collection: &str, normalize: Normalizer<T>) -> Result<Vec<T>> {
        let payload = self.execute(ApiRequest::get(endpoints::list(collection))).await?;
        Ok(normalize_list(
            payload.as_ref().and_then(Payload::as_json),
            Utc::now(),
            normalize,
        ))
    }

    async fn fetch_one<T>(
        &self,
        collection: &str,
        id: &str,
        normalize: Normalizer<T>,
    ) -> Result<Option<T>> {
        let payload = self.execute(ApiRequest::get(Self::item_path(collection, id)?)).await?;
        Ok(Self::normalize_echo(payload, normalize))
    }

    async fn write<T>(&self, request: ApiRequest, normalize: Normalizer<T>) -> Result<Option<T>> {
        let payload = self.execute(request).await?;
        Ok(Self::normalize_echo(payload, normalize))
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<()> {
        self.execute(ApiRequest::delete(Self::item_path(collection, id)?))
            .await?;
        info!(collection = %collection, id = %id, "Deleted");
        Ok(())
    }

    /// Normalize a single-record payload; anything but a JSON object is `None`
    fn normalize_echo<T>(payload: Option<Payload>, normalize: Normalizer<T>) -> Option<T> {
        match payload {
            Some(Payload::Json(value)) if value.is_object() => Some(normalize(&value, Utc::now())),
            _ => None,
        }
    }

    /// Item path for `id`; blank and dot-segment ids are rejected
    fn item_path(collection: &str, id: &str) -> Result<String> {
        match id.trim() {
            "" | "." | ".." => Err(Error::InvalidInput(format!("Invalid id '{}'", id))),
            _ => Ok(endpoints::item(collection, id)),
        }
    }

    fn to_body<P: Serialize>(payload: &P) -> Result<Value> {
        Ok(serde_json::to_value(payload)?)
    }

    // ========================================
    // Auth
    // ========================================

    /// Unauthenticated POST used by login/register.
    ///
    /// A 401 here means bad credentials, not an expired session.
    async fn post_public<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
        fallback: &str,
    ) -> Result<Vec<u8>> {
        let url = ApiRequest::new(Method::POST, endpoint).url(&self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %endpoint, error = %e, "Auth service unreachable");
                Error::NetworkUnavailable(NETWORK_UNAVAILABLE_MESSAGE.to_string())
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| {
            warn!(endpoint = %endpoint, error = %e, "Failed to read auth response");
            Error::NetworkUnavailable(NETWORK_UNAVAILABLE_MESSAGE.to_string())
        })?;

        if !status.is_success() {
            let message = extract_error_message(content_type.as_deref(), &bytes)
                .unwrap_or_else(|| fallback.to_string());
            warn!(endpoint = %endpoint, status = %status, message = %message, "Auth request rejected");
            return Err(Error::Auth(message));
        }

        Ok(bytes.to_vec())
    }

    /// Log in and establish the session
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionRecord> {
        info!(username = %username, "Logging in");

        let body = self
            .post_public(
                endpoints::LOGIN,
                &LoginRequest { username, password },
                "Login failed",
            )
            .await?;

        let response: LoginResponse = serde_json::from_slice(&body).map_err(|e| {
            error!(error = %e, "Unexpected login response");
            Error::Auth("Login failed: unexpected response from server".to_string())
        })?;

        let record = SessionRecord::from_login(response);
        self.session.establish(record.clone()).await?;
        Ok(record)
    }

    /// Register a new account (does not log in)
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        info!(username = %request.username, "Registering account");

        let body = self
            .post_public(endpoints::REGISTER, request, "Registration failed")
            .await?;

        serde_json::from_slice(&body).map_err(|e| {
            error!(error = %e, "Unexpected registration response");
            Error::Auth("Registration failed. Please try again.".to_string())
        })
    }

    /// Drop the session
    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await
    }

    pub async fn try_profile(&self) -> Result<Option<Value>> {
        Ok(self
            .execute(ApiRequest::get(endpoints::PROFILE))
            .await?
            .and_then(Payload::into_json))
    }

    pub async fn profile(&self) -> Option<Value> {
        Self::degrade(endpoints::PROFILE, self.try_profile().await)
    }

    pub async fn update_profile(&self, updates: &Value) -> Result<Option<Payload>> {
        self.execute(ApiRequest::put(endpoints::PROFILE, updates.clone()))
            .await
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<Option<Payload>> {
        let body = Self::to_body(&ChangePasswordRequest {
            old_password,
            new_password,
        })?;
        self.execute(ApiRequest::put(endpoints::CHANGE_PASSWORD, body))
            .await
    }

    // ========================================
    // Incidents
    // ========================================

    pub async fn try_list_incidents(&self) -> Result<Vec<Incident>> {
        self.fetch_list(endpoints::INCIDENTS, normalize_incident).await
    }

    pub async fn list_incidents(&self) -> Vec<Incident> {
        Self::degrade(endpoints::INCIDENTS, self.try_list_incidents().await)
    }

    pub async fn try_get_incident(&self, id: &str) -> Result<Option<Incident>> {
        self.fetch_one(endpoints::INCIDENTS, id, normalize_incident).await
    }

    pub async fn get_incident(&self, id: &str) -> Option<Incident> {
        Self::degrade(endpoints::INCIDENTS, self.try_get_incident(id).await)
    }

    /// Create an incident; returns the normalized echo when the backend sends one
    pub async fn create_incident(&self, draft: &IncidentDraft) -> Result<Option<Incident>> {
        let body = Self::to_body(&IncidentPayload::from_draft(draft))?;
        self.write(ApiRequest::post(endpoints::INCIDENTS, body), normalize_incident)
            .await
    }

    pub async fn update_incident(&self, id: &str, draft: &IncidentDraft) -> Result<Option<Incident>> {
        let body = Self::to_body(&IncidentPayload::from_draft(draft))?;
        self.write(
            ApiRequest::put(Self::item_path(endpoints::INCIDENTS, id)?, body),
            normalize_incident,
        )
        .await
    }

    pub async fn delete_incident(&self, id: &str) -> Result<()> {
        self.remove(endpoints::INCIDENTS, id).await
    }

    pub async fn active_incidents_count(&self) -> usize {
        self.list_incidents()
            .await
            .iter()
            .filter(|i| i.is_active())
            .count()
    }

    // ========================================
    // Sensors
    // ========================================

    pub async fn try_list_sensors(&self) -> Result<Vec<Sensor>> {
        self.fetch_list(endpoints::SENSORS, normalize_sensor).await
    }

    pub async fn list_sensors(&self) -> Vec<Sensor> {
        Self::degrade(endpoints::SENSORS, self.try_list_sensors().await)
    }

    pub async fn try_get_sensor(&self, id: &str) -> Result<Option<Sensor>> {
        self.fetch_one(endpoints::SENSORS, id, normalize_sensor).await
    }

    pub async fn get_sensor(&self, id: &str) -> Option<Sensor> {
        Self::degrade(endpoints::SENSORS, self.try_get_sensor(id).await)
    }

    pub async fn create_sensor(&self, draft: &SensorDraft) -> Result<Option<Sensor>> {
        let body = Self::to_body(&SensorPayload::from_draft(draft, Utc::now()))?;
        self.write(ApiRequest::post(endpoints::SENSORS, body), normalize_sensor)
            .await
    }

    pub async fn update_sensor(&self, id: &str, draft: &SensorDraft) -> Result<Option<Sensor>> {
        let body = Self::to_body(&SensorPayload::from_draft(draft, Utc::now()))?;
        self.write(
            ApiRequest::put(Self::item_path(endpoints::SENSORS, id)?, body),
            normalize_sensor,
        )
        .await
    }

    pub async fn delete_sensor(&self, id: &str) -> Result<()> {
        self.remove(endpoints::SENSORS, id).await
    }

    /// Sensors reporting online or a healthy alias (ok/normal/active)
    pub async fn online_sensors_count(&self) -> usize {
        self.list_sensors()
            .await
            .iter()
            .filter(|s| s.is_reporting())
            .count()
    }

    // ========================================
    // Cameras
    // ========================================

    pub async fn try_list_cameras(&self) -> Result<Vec<Camera>> {
        self.fetch_list(endpoints::CAMERAS, normalize_camera).await
    }

    pub async fn list_cameras(&self) -> Vec<Camera> {
        Self::degrade(endpoints::CAMERAS, self.try_list_cameras().await)
    }

    pub async fn try_get_camera(&self, id: &str) -> Result<Option<Camera>> {
        self.fetch_one(endpoints::CAMERAS, id, normalize_camera).await
    }

    pub async fn get_camera(&self, id: &str) -> Option<Camera> {
        Self::degrade(endpoints::CAMERAS, self.try_get_camera(id).await)
    }

    pub async fn create_camera(&self, draft: &CameraDraft) -> Result<Option<Camera>> {
        let body = Self::to_body(&CameraPayload::from_draft(draft, Utc::now()))?;
        self.write(ApiRequest::post(endpoints::CAMERAS, body), normalize_camera)
            .await
    }

    pub async fn update_camera(&self, id: &str, draft: &CameraDraft) -> Result<Option<Camera>> {
        let body = Self::to_body(&CameraPayload::from_draft(draft, Utc::now()))?;
        self.write(
            ApiRequest::put(Self::item_path(endpoints::CAMERAS, id)?, body),
            normalize_camera,
        )
        .await
    }

    pub async fn delete_camera(&self, id: &str) -> Result<()> {
        self.remove(endpoints::CAMERAS, id).await
    }

    pub async fn online_cameras_count(&self) -> usize {
        self.list_cameras()
            .await
            .iter()
            .filter(|c| c.is_online())
            .count()
    }

    // ========================================
    // Alerts
    // ========================================

    pub async fn try_list_alerts(&self) -> Result<Vec<Alert>> {
        self.fetch_list(endpoints::ALERTS, normalize_alert).await
    }

    pub async fn list_alerts(&self) -> Vec<Alert> {
        Self::degrade(endpoints::ALERTS, self.try_list_alerts().await)
    }

    pub async fn try_get_alert(&self, id: &str) -> Result<Option<Alert>> {
        self.fetch_one(endpoints::ALERTS, id, normalize_alert).await
    }

    pub async fn get_alert(&self, id: &str) -> Option<Alert> {
        Self::degrade(endpoints::ALERTS, self.try_get_alert(id).await)
    }

    pub async fn create_alert(&self, draft: &AlertDraft) -> Result<Option<Alert>> {
        let body = Self::to_body(&AlertPayload::from_draft(draft, Utc::now()))?;
        self.write(ApiRequest::post(endpoints::ALERTS, body), normalize_alert)
            .await
    }

    pub async fn update_alert(&self, id: &str, draft: &AlertDraft) -> Result<Option<Alert>> {
        let body = Self::to_body(&AlertPayload::from_draft(draft, Utc::now()))?;
        self.write(
            ApiRequest::put(Self::item_path(endpoints::ALERTS, id)?, body),
            normalize_alert,
        )
        .await
    }

    pub async fn delete_alert(&self, id: &str) -> Result<()> {
        self.remove(endpoints::ALERTS, id).await
    }

    // ========================================
    // Predictions (analytics service passthrough)
    // ========================================

    pub async fn try_predictions(&self) -> Result<Vec<Value>> {
        let payload = self.execute(ApiRequest::get(endpoints::PREDICTIONS)).await?;
        Ok(match payload.and_then(Payload::into_json) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        })
    }

    pub async fn predictions(&self) -> Vec<Value> {
        Self::degrade(endpoints::PREDICTIONS, self.try_predictions().await)
    }

    pub async fn send_predictions(&self, predictions: &Value) -> Result<Option<Payload>> {
        self.execute(ApiRequest::post(endpoints::PREDICTIONS, predictions.clone()))
            .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
