//! Reverse geocoding
//!
//! Resolves device coordinates to a place name used to pre-fill the
//! new-incident form. Speaks the Nominatim `/reverse` protocol. Any failure
//! yields `None`; the form simply stays empty.

use crate::config::AppConfig;
use crate::entities::normalize::defaults::UNKNOWN_LOCATION;
use crate::error::Result;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Nominatim reverse response (fields used here only)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseResponse {
    #[serde(default)]
    pub address: Option<ReverseAddress>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseAddress {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
}

impl ReverseResponse {
    /// City, town, village, then the full display name
    pub fn place_name(&self) -> String {
        let address = self.address.as_ref();
        [
            address.and_then(|a| a.city.as_deref()),
            address.and_then(|a| a.town.as_deref()),
            address.and_then(|a| a.village.as_deref()),
            self.display_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_LOCATION)
        .to_string()
    }
}

/// Reverse geocoding client
#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    http: Client,
    base_url: String,
}

impl ReverseGeocoder {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("urbanops-adapter/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.geocode_url.trim_end_matches('/').to_string(),
        })
    }

    /// Place name for a coordinate, `None` when the lookup fails
    pub async fn place_name(&self, lat: f64, lng: f64) -> Option<String> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            warn!(lat, lng, "Coordinates out of range, skipping lookup");
            return None;
        }

        let url = format!("{}/reverse", self.base_url);
        let lat_param = lat.to_string();
        let lng_param = lng.to_string();
        let result = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat_param.as_str()),
                ("lon", lng_param.as_str()),
                ("format", "json"),
            ])
            .send()
            .await;

        let response = match result {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = %r.status(), "Reverse geocoding rejected");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Reverse geocoding unavailable");
                return None;
            }
        };

        match response.json::<ReverseResponse>().await {
            Ok(body) => {
                let place = body.place_name();
                debug!(lat, lng, place = %place, "Resolved location");
                Some(place)
            }
            Err(e) => {
                warn!(error = %e, "Unreadable reverse geocoding response");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> ReverseResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_place_name_precedence() {
        let r = parse(json!({"address": {"city": "Pune", "town": "Aundh"}, "display_name": "Aundh, Pune"}));
        assert_eq!(r.place_name(), "Pune");

        let r = parse(json!({"address": {"village": "Mulshi"}, "display_name": "Mulshi, MH"}));
        assert_eq!(r.place_name(), "Mulshi");

        let r = parse(json!({"display_name": "Somewhere at sea"}));
        assert_eq!(r.place_name(), "Somewhere at sea");

        let r = parse(json!({"address": {"city": " "}}));
        assert_eq!(r.place_name(), "Unknown Location");
    }

    mod lookup {
        use super::super::*;
        use crate::api_client::test_support::spawn_gateway;
        use axum::extract::Query;
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::{Json, Router};
        use serde_json::json;
        use std::collections::HashMap;
        use std::sync::{Arc, Mutex};

        fn geocoder(base: &str) -> ReverseGeocoder {
            let config = AppConfig {
                geocode_url: base.to_string(),
                ..AppConfig::default()
            };
            ReverseGeocoder::new(&config).unwrap()
        }

        type Queries = Arc<Mutex<Vec<HashMap<String, String>>>>;

        fn recording_router(seen: Queries) -> Router {
            Router::new().route(
                "/reverse",
                get(move |Query(query): Query<HashMap<String, String>>| {
                    let seen = seen.clone();
                    async move {
                        seen.lock().unwrap().push(query);
                        Json(json!({"address": {"city": "Pune"}, "display_name": "Pune, MH"}))
                    }
                }),
            )
        }

        #[tokio::test]
        async fn test_sends_nominatim_query() {
            let seen: Queries = Arc::default();
            let base = spawn_gateway(recording_router(seen.clone())).await;

            let place = geocoder(&base).place_name(18.52, 73.85).await;
            assert_eq!(place.as_deref(), Some("Pune"));

            let queries = seen.lock().unwrap();
            assert_eq!(queries.len(), 1);
            assert_eq!(queries[0]["lat"], "18.52");
            assert_eq!(queries[0]["lon"], "73.85");
            assert_eq!(queries[0]["format"], "json");
        }

        #[tokio::test]
        async fn test_out_of_range_skips_lookup() {
            let seen: Queries = Arc::default();
            let base = spawn_gateway(recording_router(seen.clone())).await;
            let geocoder = geocoder(&base);

            assert!(geocoder.place_name(95.0, 10.0).await.is_none());
            assert!(geocoder.place_name(10.0, -181.0).await.is_none());
            assert!(seen.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_rejected_lookup_is_none() {
            let router = Router::new().route(
                "/reverse",
                get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
            );
            let base = spawn_gateway(router).await;

            assert!(geocoder(&base).place_name(18.52, 73.85).await.is_none());
        }

        #[tokio::test]
        async fn test_unreachable_service_is_none() {
            let addr = {
                let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
                listener.local_addr().unwrap()
            };
            let base = format!("http://{}", addr);

            assert!(geocoder(&base).place_name(18.52, 73.85).await.is_none());
        }
    }
}
