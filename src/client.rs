//! The top-level SyncHive client.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::auth::oidc::OidcClient;
use crate::auth::{
    sign_in_redirect, AuthError, AuthState, AuthStateBroadcaster, AuthStateChangeTrigger,
    Session, SessionManager, SignInOutcome, Subscription,
};
use crate::clients::{HttpRequest, ShapeClient, ShapeError};
use crate::config::SynchiveConfig;

/// Authentication and data access for a SyncHive app.
///
/// # Thread Safety
///
/// `SynchiveClient` is `Clone`, `Send`, and `Sync`. Clones share one
/// session manager.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use synchive::{SynchiveClient, SynchiveConfig};
///
/// let config = SynchiveConfig::builder()
///     .publishable_key("sh_publishable_...")
///     .host(Arc::new(browser_host))
///     .build()?;
/// let client = SynchiveClient::new(config);
///
/// client.initialize().await?;
/// let _subscription = client.subscribe(|state, trigger| {
///     println!("{trigger}: signed in = {}", state.is_authenticated);
/// });
///
/// let tasks = client.list("tasks", None).await?;
/// ```
#[derive(Clone, Debug)]
pub struct SynchiveClient {
    config: SynchiveConfig,
    sessions: Arc<SessionManager>,
    broadcaster: AuthStateBroadcaster,
    shapes: ShapeClient,
}

// Verify SynchiveClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SynchiveClient>();
};

impl SynchiveClient {
    /// Creates a client from a validated configuration.
    #[must_use]
    pub fn new(config: SynchiveConfig) -> Self {
        let oidc = OidcClient::new(config.http_client().clone(), config.oidc().clone());
        let sessions = Arc::new(SessionManager::new(oidc, config.host().cloned()));
        let shapes = ShapeClient::new(
            config.http_client().clone(),
            config.base_url(),
            Arc::clone(config.url_builder()),
            Arc::clone(&sessions),
        );
        Self {
            broadcaster: AuthStateBroadcaster::new(Arc::clone(&sessions)),
            config,
            sessions,
            shapes,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SynchiveConfig {
        &self.config
    }

    /// Returns the session manager.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Returns the shape data client.
    #[must_use]
    pub const fn shapes(&self) -> &ShapeClient {
        &self.shapes
    }

    /// Completes a pending sign-in or sign-out callback. Await this before
    /// relying on session state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CallbackExchange`] if the callback cannot be completed.
    pub async fn initialize(&self) -> Result<(), AuthError> {
        self.sessions.initialize().await
    }

    /// Starts a sign-in using the strategy that fits the framing context.
    ///
    /// # Errors
    ///
    /// See [`sign_in_redirect`].
    pub async fn sign_in_redirect(&self) -> Result<SignInOutcome, AuthError> {
        sign_in_redirect(&self.sessions).await
    }

    /// Signs the user out at the identity provider.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::sign_out`].
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.sessions.sign_out().await
    }

    /// Returns a valid session, renewing an expired one once.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] if no valid session results.
    pub async fn ensure_valid_session(&self) -> Result<Session, AuthError> {
        self.sessions.ensure_valid_session().await
    }

    /// Returns the stored session without renewing it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] if the store cannot be read.
    pub fn user(&self) -> Result<Option<Session>, AuthError> {
        self.sessions.user()
    }

    /// Registers an auth state listener. See [`AuthStateBroadcaster::subscribe`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(AuthState, AuthStateChangeTrigger) + Send + Sync + 'static,
    {
        self.broadcaster.subscribe(listener)
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
        self.shapes.list(shape, query).await
    }

    /// Fetches record `id` of `shape`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if no session is available or the request fails.
    pub async fn get(&self, shape: &str, id: &str) -> Result<Value, ShapeError> {
        self.shapes.get(shape, id).await
    }

    /// Creates a record of `shape`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if no session is available or the request fails.
    pub async fn create(&self, shape: &str, body: Value) -> Result<Value, ShapeError> {
        self.shapes.create(shape, body).await
    }

    /// Replaces record `id` of `shape`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if no session is available or the request fails.
    pub async fn update(&self, shape: &str, id: &str, body: Value) -> Result<Value, ShapeError> {
        self.shapes.update(shape, id, body).await
    }

    /// Sends a custom request with the current session's credentials.
    ///
    /// # Errors
    ///
    /// See [`ShapeClient::request`].
    pub async fn request(&self, request: HttpRequest) -> Result<Value, ShapeError> {
        self.shapes.request(request).await
    }
}
