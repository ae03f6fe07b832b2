//! Session Type Definitions
//!
//! The persisted session record and the login/register wire shapes.

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ============================================================
// Session Record
// ============================================================

/// Persisted credentials gating the private pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub token: String,
    /// Display name (the backend has none, username is used)
    #[serde(default)]
    pub name: String,
    /// Primary role
    #[serde(default)]
    pub role: String,
}

impl SessionRecord {
    /// Build the record stored after a successful login
    pub fn from_login(response: LoginResponse) -> Self {
        let role = response
            .roles
            .first()
            .cloned()
            .unwrap_or_else(|| "user".to_string());

        Self {
            name: response.username.clone(),
            username: response.username,
            roles: response.roles,
            token: response.token,
            role,
        }
    }

    /// Decode the JWT claims carried in the token.
    ///
    /// The signature is not verified; the gateway remains the authority.
    pub fn claims(&self) -> Option<TokenClaims> {
        let payload = self.token.split('.').nth(1)?;
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Token expiry, if the token carries one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.claims()?.exp?;
        Utc.timestamp_opt(exp, 0).single()
    }

    /// True when the token carries an expiry in the past
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|exp| exp <= now).unwrap_or(false)
    }
}

/// Subset of JWT claims issued by the auth service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub roles: Option<serde_json::Value>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
}

// ============================================================
// Auth API Structures
// ============================================================

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Login response
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub token: String,
}

/// Registration request body
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl RegisterRequest {
    pub fn new(username: &str, password: &str, email: Option<&str>, roles: Option<Vec<String>>) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            email: email.unwrap_or_default().to_string(),
            roles: roles
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| vec!["ROLE_USER".to_string()]),
        }
    }
}

/// Registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Password change body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_claims(claims: serde_json::Value) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.signature",
            engine.encode(br#"{"alg":"HS256"}"#),
            engine.encode(claims.to_string())
        )
    }

    #[test]
    fn test_from_login_uses_first_role() {
        let record = SessionRecord::from_login(LoginResponse {
            username: "operator".to_string(),
            roles: vec!["ROLE_ADMIN".to_string(), "ROLE_USER".to_string()],
            token: "t".to_string(),
        });
        assert_eq!(record.name, "operator");
        assert_eq!(record.role, "ROLE_ADMIN");
    }

    #[test]
    fn test_from_login_without_roles() {
        let record = SessionRecord::from_login(LoginResponse {
            username: "operator".to_string(),
            roles: vec![],
            token: "t".to_string(),
        });
        assert_eq!(record.role, "user");
    }

    #[test]
    fn test_claims_decoding() {
        let record = SessionRecord {
            username: "operator".to_string(),
            roles: vec![],
            token: token_with_claims(serde_json::json!({"sub": "operator", "exp": 1_700_000_000})),
            name: "operator".to_string(),
            role: "user".to_string(),
        };
        let claims = record.claims().unwrap();
        assert_eq!(claims.sub.as_deref(), Some("operator"));
        assert_eq!(record.expires_at().unwrap().timestamp(), 1_700_000_000);
        assert!(record.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_opaque_token_has_no_claims() {
        let record = SessionRecord {
            username: "operator".to_string(),
            roles: vec![],
            token: "opaque".to_string(),
            name: String::new(),
            role: String::new(),
        };
        assert!(record.claims().is_none());
        assert!(!record.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_register_request_default_roles() {
        let req = RegisterRequest::new("u", "p", None, None);
        assert_eq!(req.roles, vec!["ROLE_USER".to_string()]);
        assert_eq!(req.email, "");
    }
}
