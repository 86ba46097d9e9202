//! The shape data client.
//!
//! Every request first asks the session manager for a valid session and
//! sends its access token as a bearer credential. Requests are never
//! retried.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;

use crate::auth::SessionManager;
use crate::clients::errors::{RequestError, ShapeError};
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::clients::url_builder::ShapeUrlBuilder;

/// CRUD access to SyncHive shapes (resource types).
///
/// # Thread Safety
///
/// `ShapeClient` is `Send + Sync`; clones share the HTTP connection pool
/// and the session manager.
///
/// # Example
///
/// ```rust,ignore
/// use serde_json::json;
///
/// let tasks = client.list("tasks", None).await?;
/// let created = client.create("tasks", json!({"title": "Ship it"})).await?;
/// let updated = client.update("tasks", "42", json!({"done": true})).await?;
/// ```
#[derive(Clone, Debug)]
pub struct ShapeClient {
    http: reqwest::Client,
    base_url: String,
    urls: Arc<dyn ShapeUrlBuilder>,
    sessions: Arc<SessionManager>,
}

// Verify ShapeClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShapeClient>();
};

impl ShapeClient {
    /// Creates a client for `base_url`.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        urls: Arc<dyn ShapeUrlBuilder>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            urls,
            sessions,
        }
    }

    /// Returns the data API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lists records of `shape`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if no session is available or the request fails.
    pub async fn list(
        &self,
        shape: &str,
        query: Option<HashMap<String, String>>,
    ) -> Result<Value, ShapeError> {
        let mut builder = HttpRequest::builder(HttpMethod::Get, self.urls.list(&self.base_url, shape));
        if let Some(query) = query {
            builder = builder.query(query);
        }
        self.request(builder.build()?).await
    }

    /// Fetches record `id` of `shape`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if no session is available or the request fails.
    pub async fn get(&self, shape: &str, id: &str) -> Result<Value, ShapeError> {
        let request =
            HttpRequest::builder(HttpMethod::Get, self.urls.get(&self.base_url, shape, id)).build()?;
        self.request(request).await
    }

    /// Creates a record of `shape`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if no session is available or the request fails.
    pub async fn create(&self, shape: &str, body: Value) -> Result<Value, ShapeError> {
        let request = HttpRequest::builder(HttpMethod::Post, self.urls.create(&self.base_url, shape))
            .body(body)
            .build()?;
        self.request(request).await
    }

    /// Replaces record `id` of `shape`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if no session is available or the request fails.
    pub async fn update(&self, shape: &str, id: &str, body: Value) -> Result<Value, ShapeError> {
        let request =
            HttpRequest::builder(HttpMethod::Put, self.urls.update(&self.base_url, shape, id))
                .body(body)
                .build()?;
        self.request(request).await
    }

    /// Sends an arbitrary request with the current session's credentials.
    ///
    /// A `204 No Content` response yields [`Value::Null`]. Other 2xx bodies
    /// are parsed as JSON.
    ///
    /// # Errors
    ///
    /// - [`ShapeError::InvalidRequest`] if the request fails validation
    /// - [`ShapeError::Auth`] if no valid session exists
    /// - [`ShapeError::Request`] for non-2xx responses, with the body text
    /// - [`ShapeError::Network`] for connection failures
    /// - [`ShapeError::Json`] if a 2xx body is not JSON
    pub async fn request(&self, request: HttpRequest) -> Result<Value, ShapeError> {
        request.verify()?;
        let session = self.sessions.ensure_valid_session().await?;

        let mut req_builder = match request.http_method {
            HttpMethod::Get => self.http.get(&request.url),
            HttpMethod::Post => self.http.post(&request.url),
            HttpMethod::Put => self.http.put(&request.url),
            HttpMethod::Delete => self.http.delete(&request.url),
        };
        req_builder = req_builder
            .bearer_auth(&session.access_token)
            .header("Accept", "application/json");

        if let Some(extra) = &request.extra_headers {
            for (key, value) in extra {
                req_builder = req_builder.header(key, value);
            }
        }
        if let Some(query) = &request.query {
            req_builder = req_builder.query(query);
        }
        if let Some(body) = &request.body {
            if !request.has_header("Content-Type") {
                req_builder = req_builder.header("Content-Type", "application/json");
            }
            req_builder = req_builder.body(body.to_string());
        }

        tracing::debug!(method = %request.http_method, url = %request.url, "sending shape request");
        let response = req_builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::oidc::OidcClient;
    use crate::auth::{AuthError, Session};
    use crate::clients::DefaultUrlBuilder;
    use crate::config::{OidcSettings, ResolvedOidcSettings};
    use crate::host::{KeyValueStore, MemoryStore, NamespacedStore};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, session: Option<Session>) -> ShapeClient {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let resolved = ResolvedOidcSettings {
            settings: OidcSettings::new(server.uri(), "client", "https://app.example.com"),
            user_store: NamespacedStore::new(Arc::clone(&store), "oidc.user:"),
            state_store: NamespacedStore::new(store, "oidc.state."),
        };
        let oidc = OidcClient::new(reqwest::Client::new(), resolved);
        if let Some(session) = session {
            oidc.store_user(&session).unwrap();
        }
        ShapeClient::new(
            reqwest::Client::new(),
            format!("{}/v1/shape", server.uri()),
            Arc::new(DefaultUrlBuilder),
            Arc::new(SessionManager::new(oidc, None)),
        )
    }

    fn valid_session() -> Session {
        Session::new("token-123", Some(Utc::now() + Duration::hours(1)))
    }

    #[tokio::test]
    async fn test_list_sends_bearer_and_accept_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/shape/tasks"))
            .and(query_param("limit", "5"))
            .and(header("Authorization", "Bearer token-123"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, Some(valid_session()));

        let mut query = HashMap::new();
        query.insert("limit".to_string(), "5".to_string());
        let tasks = client.list("tasks", Some(query)).await.unwrap();

        assert_eq!(tasks, json!([{"id": "1"}]));
    }

    #[tokio::test]
    async fn test_create_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/shape/tasks"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({"title": "Ship it"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "9"})))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, Some(valid_session()));

        let created = client.create("tasks", json!({"title": "Ship it"})).await.unwrap();
        assert_eq!(created["id"], "9");
    }

    #[tokio::test]
    async fn test_caller_content_type_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/shape/tasks/9"))
            .and(header("Content-Type", "application/merge-patch+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "9"})))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, Some(valid_session()));

        let request = HttpRequest::builder(HttpMethod::Put, format!("{}/v1/shape/tasks/9", server.uri()))
            .body(json!({"done": true}))
            .header("content-type", "application/merge-patch+json")
            .build()
            .unwrap();
        client.request(request).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_content_yields_null() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/shape/tasks/9"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let client = client_for(&server, Some(valid_session()));

        let result = client.update("tasks", "9", json!({"done": true})).await.unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_custom_delete_request() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/shape/tasks/9"))
            .and(header("Authorization", "Bearer token-123"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, Some(valid_session()));

        let request =
            HttpRequest::builder(HttpMethod::Delete, format!("{}/v1/shape/tasks/9", server.uri()))
                .build()
                .unwrap();

        assert_eq!(client.request(request).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_non_success_carries_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/shape/tasks/404"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such task"))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, Some(valid_session()));

        let error = client.get("tasks", "404").await.unwrap_err();
        match error {
            ShapeError::Request(e) => {
                assert_eq!(e.status, 404);
                assert_eq!(e.body, "no such task");
            }
            other => panic!("expected request error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_session_is_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let client = client_for(&server, None);

        let error = client.list("tasks", None).await.unwrap_err();
        assert!(matches!(error, ShapeError::Auth(AuthError::Unauthenticated)));
    }
}
