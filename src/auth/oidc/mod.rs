//! The OpenID Connect protocol engine.
//!
//! [`OidcClient`] performs the authorization-code flow with PKCE against a
//! single provider: it builds authorization and end-session requests,
//! exchanges callback codes and refresh tokens at the token endpoint, and
//! persists the resulting [`Session`] in the user store.
//!
//! It knows nothing about windows or frames. Deciding *when* to sign in and
//! *where* to navigate is the session manager's job.
//!
//! # Overview
//!
//! - [`OidcClient`]: the protocol engine
//! - [`ProviderMetadata`]: discovered or static provider endpoints
//! - [`ProviderError`] / [`ProviderErrorKind`]: structured protocol failures
//! - [`AuthorizationRequestState`] / [`RequestKind`]: persisted in-flight requests

mod error;
mod id_token;
mod metadata;
pub mod pkce;
mod request_state;

pub use error::{ProviderError, ProviderErrorKind};
pub use id_token::decode_claims;
pub use metadata::ProviderMetadata;
pub use request_state::{AuthorizationRequestState, RequestKind, REQUEST_STATE_MAX_AGE_SECS};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::OnceCell;
use url::Url;

use crate::auth::callback::callback_params;
use crate::auth::session::TokenResponse;
use crate::auth::Session;
use crate::config::{OidcSettings, ResolvedOidcSettings};
use crate::host::NamespacedStore;

/// Grant type for exchanging an authorization code.
const AUTHORIZATION_CODE_GRANT_TYPE: &str = "authorization_code";

/// Grant type for silent renewal.
const REFRESH_TOKEN_GRANT_TYPE: &str = "refresh_token";

/// Form body for the authorization-code grant.
#[derive(Debug, Serialize)]
struct CodeExchangeRequest<'a> {
    grant_type: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
    client_id: &'a str,
    code_verifier: Option<&'a str>,
}

/// Form body for the refresh-token grant.
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'a str,
    refresh_token: &'a str,
    client_id: &'a str,
    scope: &'a str,
}

/// An OIDC relying party bound to one provider and one session store.
#[derive(Debug)]
pub struct OidcClient {
    http: reqwest::Client,
    settings: OidcSettings,
    user_store: NamespacedStore,
    state_store: NamespacedStore,
    metadata: OnceCell<ProviderMetadata>,
}

impl OidcClient {
    /// Creates a client for resolved settings.
    #[must_use]
    pub fn new(http: reqwest::Client, resolved: ResolvedOidcSettings) -> Self {
        let metadata = OnceCell::new_with(resolved.settings.metadata.clone());
        Self {
            http,
            settings: resolved.settings,
            user_store: resolved.user_store,
            state_store: resolved.state_store,
            metadata,
        }
    }

    /// Returns the settings this client was built with.
    #[must_use]
    pub const fn settings(&self) -> &OidcSettings {
        &self.settings
    }

    /// Returns the provider metadata, fetching the discovery document on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderErrorKind::Discovery`] or
    /// [`ProviderErrorKind::Network`] error if discovery fails. A failed
    /// fetch is retried on the next call.
    pub async fn metadata(&self) -> Result<&ProviderMetadata, ProviderError> {
        self.metadata
            .get_or_try_init(|| metadata::discover(&self.http, &self.settings.authority))
            .await
    }

    /// Builds an authorization request URL and persists its request state.
    ///
    /// A [`RequestKind::Silent`] request returns to the silent redirect URI
    /// when one is configured and always carries `prompt=none`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if discovery fails, the authorization
    /// endpoint is not a valid URL, or the state cannot be stored.
    pub async fn create_signin_request(&self, kind: RequestKind) -> Result<Url, ProviderError> {
        let metadata = self.metadata().await?;
        let mut url = parse_endpoint(&metadata.authorization_endpoint, "authorization_endpoint")?;

        let silent = kind == RequestKind::Silent;
        let redirect_uri = match &self.settings.silent_redirect_uri {
            Some(uri) if silent => uri.clone(),
            _ => self.settings.redirect_uri.clone(),
        };
        let verifier = pkce::generate_verifier();
        let state = AuthorizationRequestState {
            id: pkce::random_id(),
            kind,
            code_verifier: Some(verifier.clone()),
            nonce: Some(pkce::random_id()),
            redirect_uri,
            created_at: Utc::now(),
        };

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.client_id)
                .append_pair("redirect_uri", &state.redirect_uri)
                .append_pair("response_type", &self.settings.response_type)
                .append_pair("scope", &self.settings.scope)
                .append_pair("state", &state.id)
                .append_pair("code_challenge", &pkce::compute_challenge(&verifier))
                .append_pair("code_challenge_method", pkce::CODE_CHALLENGE_METHOD);
            if let Some(nonce) = &state.nonce {
                query.append_pair("nonce", nonce);
            }
            for (name, value) in &self.settings.extra_query_params {
                if silent && name == "prompt" {
                    continue;
                }
                query.append_pair(name, value);
            }
            if silent {
                query.append_pair("prompt", "none");
            }
        }

        state.save(&self.state_store)?;
        tracing::debug!(?kind, "created authorization request");
        Ok(url)
    }

    /// Returns the kind of request a callback URL answers, without consuming
    /// the stored state.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderErrorKind::MissingState`] if the URL carries no
    /// `state`, or [`ProviderErrorKind::StateNotFound`] if nothing matches it.
    pub fn peek_request_kind(&self, callback: &Url) -> Result<RequestKind, ProviderError> {
        let params = callback_params(callback);
        let id = params.get("state").ok_or_else(missing_state)?;
        AuthorizationRequestState::peek(&self.state_store, id).map(|state| state.kind)
    }

    /// Completes a sign-in callback: consumes the request state, exchanges
    /// the code and stores the resulting session.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the state is missing or unknown, the
    /// provider returned an error, the exchange fails, the ID token's nonce
    /// does not match the request, or the session cannot be stored.
    pub async fn process_signin_response(&self, callback: &Url) -> Result<Session, ProviderError> {
        let params = callback_params(callback);
        let id = params.get("state").ok_or_else(missing_state)?;
        let state = AuthorizationRequestState::take(&self.state_store, id)?;

        if let Some(error) = params.get("error") {
            let message = params
                .get("error_description")
                .map_or_else(|| error.clone(), |description| format!("{error}: {description}"));
            return Err(ProviderError::new(
                ProviderErrorKind::AuthorizationDenied,
                message,
            ));
        }
        let code = params.get("code").ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::InvalidResponse,
                "Authorization response has no code",
            )
        })?;

        let request = CodeExchangeRequest {
            grant_type: AUTHORIZATION_CODE_GRANT_TYPE,
            code,
            redirect_uri: &state.redirect_uri,
            client_id: &self.settings.client_id,
            code_verifier: state.code_verifier.as_deref(),
        };
        let response = self.token_request(&request).await?;

        let profile = response
            .id_token
            .as_deref()
            .map(decode_claims)
            .transpose()?;
        if let (Some(expected), Some(claims)) = (&state.nonce, &profile) {
            check_nonce(expected, claims)?;
        }
        let mut session = Session::from_token_response(response, profile, None);
        session.session_state = params.get("session_state").cloned();

        self.store_user(&session)?;
        tracing::info!(subject = ?session.subject(), "sign-in completed");
        Ok(session)
    }

    /// Exchanges the session's refresh token for a new session and stores it.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderErrorKind::MissingRefreshToken`] if the session has
    /// no refresh token, or a [`ProviderError`] if the exchange fails.
    pub async fn refresh(&self, session: &Session) -> Result<Session, ProviderError> {
        let refresh_token = session.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::MissingRefreshToken,
                "Session has no refresh token",
            )
        })?;

        let request = RefreshRequest {
            grant_type: REFRESH_TOKEN_GRANT_TYPE,
            refresh_token,
            client_id: &self.settings.client_id,
            scope: &self.settings.scope,
        };
        let response = self.token_request(&request).await?;

        let profile = response
            .id_token
            .as_deref()
            .map(decode_claims)
            .transpose()?;
        let renewed = Session::from_token_response(response, profile, Some(session));
        self.store_user(&renewed)?;
        tracing::debug!("silent renewal completed");
        Ok(renewed)
    }

    /// Builds an end-session request URL and persists its request state.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderErrorKind::MissingEndSession`] if the provider has
    /// no end-session endpoint, or a [`ProviderError`] if discovery or
    /// storage fails.
    pub async fn create_signout_request(
        &self,
        id_token_hint: Option<&str>,
    ) -> Result<Url, ProviderError> {
        let metadata = self.metadata().await?;
        let endpoint = metadata.end_session_endpoint.as_deref().ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::MissingEndSession,
                "Provider does not advertise an end_session_endpoint",
            )
        })?;
        let mut url = parse_endpoint(endpoint, "end_session_endpoint")?;

        let redirect_uri = self
            .settings
            .post_logout_redirect_uri
            .clone()
            .unwrap_or_else(|| self.settings.redirect_uri.clone());
        let state = AuthorizationRequestState {
            id: pkce::random_id(),
            kind: RequestKind::SignOut,
            code_verifier: None,
            nonce: None,
            redirect_uri,
            created_at: Utc::now(),
        };

        {
            let mut query = url.query_pairs_mut();
            if let Some(hint) = id_token_hint {
                query.append_pair("id_token_hint", hint);
            }
            query
                .append_pair("client_id", &self.settings.client_id)
                .append_pair("post_logout_redirect_uri", &state.redirect_uri)
                .append_pair("state", &state.id);
        }

        state.save(&self.state_store)?;
        Ok(url)
    }

    /// Completes a sign-out callback by consuming its request state.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the state is missing or unknown, or
    /// the provider reported an error.
    pub fn process_signout_response(&self, callback: &Url) -> Result<(), ProviderError> {
        let params = callback_params(callback);
        let id = params.get("state").ok_or_else(missing_state)?;
        AuthorizationRequestState::take(&self.state_store, id)?;
        if let Some(error) = params.get("error") {
            return Err(ProviderError::new(
                ProviderErrorKind::AuthorizationDenied,
                format!("Sign-out failed: {error}"),
            ));
        }
        tracing::info!("sign-out completed");
        Ok(())
    }

    /// Reads the stored session.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderErrorKind::Storage`] error if the store fails.
    pub fn load_user(&self) -> Result<Option<Session>, ProviderError> {
        Ok(self.user_store.get(&self.settings.user_store_key())?)
    }

    /// Replaces the stored session.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderErrorKind::Storage`] error if the store fails.
    pub fn store_user(&self, session: &Session) -> Result<(), ProviderError> {
        Ok(self.user_store.set(&self.settings.user_store_key(), session)?)
    }

    /// Removes the stored session.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderErrorKind::Storage`] error if the store fails.
    pub fn remove_user(&self) -> Result<(), ProviderError> {
        Ok(self.user_store.remove(&self.settings.user_store_key())?)
    }

    async fn token_request<T: Serialize + Sync>(
        &self,
        form: &T,
    ) -> Result<TokenResponse, ProviderError> {
        let metadata = self.metadata().await?;
        tracing::debug!(endpoint = %metadata.token_endpoint, "requesting tokens");

        let response = self
            .http
            .post(&metadata.token_endpoint)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::token_endpoint(status.as_u16(), body));
        }

        response.json().await.map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::InvalidResponse,
                format!("Failed to parse token response: {e}"),
            )
        })
    }
}

fn missing_state() -> ProviderError {
    ProviderError::new(ProviderErrorKind::MissingState, "No state in response")
}

/// Rejects an ID token whose `nonce` claim differs from the one sent with
/// the request. Tokens without the claim are accepted.
fn check_nonce(
    expected: &str,
    claims: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), ProviderError> {
    match claims.get("nonce") {
        Some(nonce) if nonce.as_str() != Some(expected) => Err(ProviderError::new(
            ProviderErrorKind::InvalidResponse,
            "ID token nonce does not match the authorization request",
        )),
        _ => Ok(()),
    }
}

fn parse_endpoint(raw: &str, name: &str) -> Result<Url, ProviderError> {
    Url::parse(raw).map_err(|e| {
        ProviderError::new(
            ProviderErrorKind::InvalidResponse,
            format!("Provider {name} '{raw}' is not a valid URL: {e}"),
        )
    })
}
