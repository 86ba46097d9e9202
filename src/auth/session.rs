//! The authenticated user session.
//!
//! This module provides the [`Session`] type: the single authoritative record
//! of the signed-in user, persisted by the session manager.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Response body of the token endpoint for code exchange and refresh.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// The issued access token.
    pub access_token: String,
    /// The token type, normally `Bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Seconds until the access token expires.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// The refresh token, if one was issued.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// The ID token, if one was issued.
    #[serde(default)]
    pub id_token: Option<String>,
    /// The granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// The signed-in user's session.
///
/// # Thread Safety
///
/// `Session` is `Send + Sync`, making it safe to share across tasks.
///
/// # Example
///
/// ```rust
/// use synchive::Session;
/// use chrono::{Duration, Utc};
///
/// let session = Session::new("access-token", Some(Utc::now() + Duration::hours(1)));
/// assert!(session.is_active());
/// assert!(!session.expired());
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The access token sent as a bearer credential.
    pub access_token: String,

    /// The token type, normally `Bearer`.
    pub token_type: String,

    /// When the access token expires, if known.
    pub expires_at: Option<DateTime<Utc>>,

    /// The refresh token used for silent renewal.
    pub refresh_token: Option<String>,

    /// The raw ID token.
    pub id_token: Option<String>,

    /// The granted scopes.
    pub scope: Option<String>,

    /// The provider's `session_state`, if returned with the callback.
    pub session_state: Option<String>,

    /// Identity claims from the ID token.
    #[serde(default)]
    pub profile: Map<String, Value>,
}

impl Session {
    /// Creates a bearer session with no refresh material or claims.
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_at,
            refresh_token: None,
            id_token: None,
            scope: None,
            session_state: None,
            profile: Map::new(),
        }
    }

    /// Builds a session from a token endpoint response.
    ///
    /// `previous` supplies the refresh token, ID token and claims when a
    /// refresh response omits them.
    #[must_use]
    pub fn from_token_response(
        response: TokenResponse,
        profile: Option<Map<String, Value>>,
        previous: Option<&Self>,
    ) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        let refresh_token = response
            .refresh_token
            .or_else(|| previous.and_then(|p| p.refresh_token.clone()));
        let id_token = response
            .id_token
            .or_else(|| previous.and_then(|p| p.id_token.clone()));
        let profile = profile
            .or_else(|| previous.map(|p| p.profile.clone()))
            .unwrap_or_default();

        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
            refresh_token,
            id_token,
            scope: response.scope.or_else(|| previous.and_then(|p| p.scope.clone())),
            session_state: previous.and_then(|p| p.session_state.clone()),
            profile,
        }
    }

    /// Returns `true` if the access token has expired.
    ///
    /// Sessions without an expiration time never expire.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expires_at.is_some_and(|expires| Utc::now() >= expires)
    }

    /// Returns `true` if the session has an access token and has not expired.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.access_token.is_empty() && !self.expired()
    }

    /// Returns the time left before expiry, or `None` if the session never
    /// expires. Expired sessions return a non-positive duration.
    #[must_use]
    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_at.map(|expires| expires - Utc::now())
    }

    /// Returns the `sub` claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.profile.get("sub").and_then(Value::as_str)
    }

    /// Returns the granted scopes as a list.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"*****")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "*****"))
            .field("id_token", &self.id_token.as_ref().map(|_| "*****"))
            .field("scope", &self.scope)
            .field("subject", &self.subject())
            .finish_non_exhaustive()
    }
}

// Verify Session is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_response(value: Value) -> TokenResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_session_expired() {
        let expired = Session::new("token", Some(Utc::now() - Duration::hours(1)));
        assert!(expired.expired());

        let valid = Session::new("token", Some(Utc::now() + Duration::hours(1)));
        assert!(!valid.expired());

        let no_expiry = Session::new("token", None);
        assert!(!no_expiry.expired());
    }

    #[test]
    fn test_session_is_active() {
        assert!(Session::new("token", None).is_active());
        assert!(!Session::new("", None).is_active());
        assert!(!Session::new("token", Some(Utc::now() - Duration::minutes(1))).is_active());
    }

    #[test]
    fn test_from_token_response_computes_expiry() {
        let response = token_response(json!({
            "access_token": "at",
            "expires_in": 3600,
            "refresh_token": "rt",
            "scope": "openid profile"
        }));

        let session = Session::from_token_response(response, None, None);

        assert_eq!(session.token_type, "Bearer");
        assert_eq!(session.refresh_token.as_deref(), Some("rt"));
        assert_eq!(session.scopes(), vec!["openid", "profile"]);
        let remaining = session.expires_in().unwrap();
        assert!(remaining > Duration::minutes(59) && remaining <= Duration::hours(1));
    }

    #[test]
    fn test_refresh_response_keeps_previous_material() {
        let mut previous = Session::new("old", None);
        previous.refresh_token = Some("rt-1".to_string());
        previous.id_token = Some("idt".to_string());
        previous.profile.insert("sub".to_string(), json!("user-1"));

        let response = token_response(json!({"access_token": "new", "expires_in": 60}));
        let session = Session::from_token_response(response, None, Some(&previous));

        assert_eq!(session.access_token, "new");
        assert_eq!(session.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(session.id_token.as_deref(), Some("idt"));
        assert_eq!(session.subject(), Some("user-1"));
    }

    #[test]
    fn test_zero_lifetime_token_is_expired() {
        let response = token_response(json!({"access_token": "at", "expires_in": 0}));
        assert!(Session::from_token_response(response, None, None).expired());
    }

    #[test]
    fn test_debug_masks_tokens() {
        let mut session = Session::new("secret-access", None);
        session.refresh_token = Some("secret-refresh".to_string());
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
    }

    #[test]
    fn test_session_round_trips_through_json() {
        let mut session = Session::new("at", Some(Utc::now()));
        session.profile.insert("sub".to_string(), json!("u"));
        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
    }
}
