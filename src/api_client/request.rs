//! Outbound request construction
//!
//! Every gateway call is described by an [`ApiRequest`] and turned into a
//! `reqwest::RequestBuilder` here. When a session is present the bearer token
//! and username headers are attached; otherwise they are omitted.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::warn;

/// Header carrying the logged-in username (read by the auth service)
pub const USERNAME_HEADER: &str = "X-Username";

/// Credentials attached to authenticated calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub token: String,
    pub username: String,
}

impl AuthHeaders {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }

    /// Header pairs; blank values are skipped
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(2);
        if !self.token.is_empty() {
            headers.push((AUTHORIZATION.to_string(), format!("Bearer {}", self.token)));
        }
        if !self.username.is_empty() {
            headers.push((USERNAME_HEADER.to_string(), self.username.clone()));
        }
        headers
    }
}

/// A gateway call: method, endpoint path, optional JSON body, extra headers
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, endpoint).with_body(body)
    }

    pub fn put(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, endpoint).with_body(body)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Reads degrade to empty results; everything else propagates
    pub fn is_read(&self) -> bool {
        self.method == Method::GET
    }

    /// Absolute URL for `base`
    pub fn url(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        if self.endpoint.starts_with('/') {
            format!("{}{}", base, self.endpoint)
        } else {
            format!("{}/{}", base, self.endpoint)
        }
    }

    /// Header set: JSON content type, then caller headers, then credentials.
    /// Later entries replace earlier ones with the same name.
    pub fn header_map(&self, auth: Option<&AuthHeaders>) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_headers = auth.map(|a| a.to_headers()).unwrap_or_default();
        for (key, value) in self.headers.iter().chain(auth_headers.iter()) {
            match (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => warn!(header = %key, "Skipping invalid header"),
            }
        }
        map
    }

    /// Build the reqwest request against `base`
    pub fn build(&self, http: &Client, base: &str, auth: Option<&AuthHeaders>) -> RequestBuilder {
        let mut builder = http
            .request(self.method.clone(), self.url(base))
            .headers(self.header_map(auth));
        if let Some(ref body) = self.body {
            builder = builder.json(body);
        }
        builder
    }
}
