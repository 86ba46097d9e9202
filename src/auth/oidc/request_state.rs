//! Persisted state for in-flight authorization and logout requests.
//!
//! A request state is written before the browser leaves for the identity
//! provider and consumed when the callback arrives. It must survive a full
//! page reload, so it lives in the persistent store keyed by the `state`
//! parameter.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::host::NamespacedStore;

use super::error::{ProviderError, ProviderErrorKind};

/// Request states older than this are pruned.
pub const REQUEST_STATE_MAX_AGE_SECS: i64 = 15 * 60;

/// Which flow created a request state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// A full-page redirect sign-in.
    Redirect,
    /// A popup sign-in; the callback window hands the response to its opener.
    Popup,
    /// A `prompt=none` sign-in in a hidden frame; the frame hands the
    /// response to the window embedding it.
    Silent,
    /// An RP-initiated logout.
    SignOut,
}

/// A stored authorization or logout request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequestState {
    /// The `state` parameter sent to the provider.
    pub id: String,
    /// The flow that created this request.
    pub kind: RequestKind,
    /// The PKCE verifier (sign-in requests only).
    #[serde(default)]
    pub code_verifier: Option<String>,
    /// The `nonce` sent with the request (sign-in requests only).
    #[serde(default)]
    pub nonce: Option<String>,
    /// The redirect URI the code was issued for.
    pub redirect_uri: String,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

impl AuthorizationRequestState {
    /// Returns `true` if this state is older than the maximum age.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::seconds(REQUEST_STATE_MAX_AGE_SECS)
    }

    /// Persists this state, pruning stale entries first.
    pub(crate) fn save(&self, store: &NamespacedStore) -> Result<(), ProviderError> {
        prune_stale(store, Utc::now());
        store.set(&self.id, self)?;
        Ok(())
    }

    /// Reads the state for `id` without consuming it.
    pub(crate) fn peek(store: &NamespacedStore, id: &str) -> Result<Self, ProviderError> {
        store.get::<Self>(id)?.ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::StateNotFound,
                "No matching state found in storage",
            )
        })
    }

    /// Reads and removes the state for `id`.
    pub(crate) fn take(store: &NamespacedStore, id: &str) -> Result<Self, ProviderError> {
        let state = Self::peek(store, id)?;
        store.remove(id)?;
        Ok(state)
    }
}

/// Removes stale and unreadable request states. Failures are ignored; pruning
/// is best-effort housekeeping.
fn prune_stale(store: &NamespacedStore, now: DateTime<Utc>) {
    let Ok(keys) = store.keys() else {
        return;
    };
    for key in keys {
        let stale = match store.get::<AuthorizationRequestState>(&key) {
            Ok(Some(state)) => state.is_stale(now),
            Ok(None) => false,
            Err(_) => true,
        };
        if stale {
            tracing::debug!(state = %key, "pruning stale authorization request state");
            let _ = store.remove(&key);
        }
    }
}
