//! Errors from the OIDC protocol engine and the host windows it drives.
//!
//! Every failure carries a structured [`ProviderErrorKind`] next to its
//! human-readable message. Callers should branch on the kind. The message
//! checks in [`ProviderError::is_popup_unavailable`] and
//! [`ProviderError::is_state_lost`] only exist for host errors that arrive
//! as free text.

use thiserror::Error;

use crate::host::{HostError, StorageError};

/// Classification of a [`ProviderError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// The popup window could not be opened.
    PopupBlocked,
    /// The popup window was closed before completing.
    PopupClosed,
    /// A navigation request was refused by the host.
    Navigation,
    /// The callback carried no `state` parameter.
    MissingState,
    /// No stored request state matches the callback's `state`.
    StateNotFound,
    /// The provider returned an `error` in the callback.
    AuthorizationDenied,
    /// The discovery document could not be fetched or parsed.
    Discovery,
    /// The token endpoint rejected the request.
    TokenEndpoint,
    /// A response was missing required fields.
    InvalidResponse,
    /// Silent renewal was attempted without a refresh token.
    MissingRefreshToken,
    /// The provider does not advertise an end-session endpoint.
    MissingEndSession,
    /// Reading or writing the session store failed.
    Storage,
    /// A network error occurred.
    Network,
    /// Any other failure.
    Other,
}

/// An error from the OIDC protocol engine.
///
/// # Example
///
/// ```rust
/// use synchive::auth::oidc::{ProviderError, ProviderErrorKind};
///
/// let error = ProviderError::new(ProviderErrorKind::StateNotFound, "No matching state found in storage");
/// assert!(error.is_state_lost());
/// assert!(!error.is_popup_unavailable());
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    /// The structured error kind.
    pub kind: ProviderErrorKind,
    /// The human-readable message.
    pub message: String,
    /// HTTP status returned by the provider, when there was a response.
    pub status: Option<u16>,
}

impl ProviderError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Creates a [`ProviderErrorKind::TokenEndpoint`] error for an HTTP response.
    #[must_use]
    pub fn token_endpoint(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::TokenEndpoint,
            message: format!("Token endpoint returned {status}: {}", body.into()),
            status: Some(status),
        }
    }

    /// Returns `true` when a popup could not be used: it was blocked, closed,
    /// or failed to open.
    #[must_use]
    pub fn is_popup_unavailable(&self) -> bool {
        match self.kind {
            ProviderErrorKind::PopupBlocked | ProviderErrorKind::PopupClosed => true,
            ProviderErrorKind::Other | ProviderErrorKind::Navigation => {
                let message = self.message.to_lowercase();
                ["popup", "blocked", "closed", "failed to open"]
                    .iter()
                    .any(|needle| message.contains(needle))
            }
            _ => false,
        }
    }

    /// Returns `true` when a callback could not be matched to the request
    /// state that started it.
    #[must_use]
    pub fn is_state_lost(&self) -> bool {
        match self.kind {
            ProviderErrorKind::StateNotFound | ProviderErrorKind::MissingState => true,
            ProviderErrorKind::Other => {
                let message = self.message.to_lowercase();
                message.contains("no matching state") || message.contains("no state in response")
            }
            _ => false,
        }
    }
}

impl From<HostError> for ProviderError {
    fn from(error: HostError) -> Self {
        let kind = match &error {
            HostError::PopupBlocked => ProviderErrorKind::PopupBlocked,
            HostError::PopupClosed => ProviderErrorKind::PopupClosed,
            HostError::Navigation(_) => ProviderErrorKind::Navigation,
            HostError::Other(_) => ProviderErrorKind::Other,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<StorageError> for ProviderError {
    fn from(error: StorageError) -> Self {
        Self::new(ProviderErrorKind::Storage, error.to_string())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        Self::new(ProviderErrorKind::Network, format!("Network error: {error}"))
    }
}

// Verify ProviderError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ProviderError>();
};
