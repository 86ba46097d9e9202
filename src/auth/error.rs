//! Error types for session management and sign-in.
//!
//! # Error Types
//!
//! - [`AuthError::Unauthenticated`]: no valid session after one renewal attempt
//! - [`AuthError::CallbackExchange`]: completing a returned authorization failed
//! - [`AuthError::SignIn`]: a sign-in redirect could not be started
//! - [`AuthError::Provider`]: any other protocol or host failure
//! - [`AuthError::HostUnavailable`]: the operation needs a browser host
//!
//! # Example
//!
//! ```rust
//! use synchive::auth::oidc::ProviderError;
//! use synchive::auth::{AuthError, SignInError};
//! use synchive::host::HostError;
//!
//! let error = AuthError::SignIn(SignInError::EmbeddedLoginBlocked {
//!     source: ProviderError::from(HostError::Navigation("top navigation denied".to_string())),
//! });
//! assert!(error.to_string().contains("embedded"));
//! ```

use thiserror::Error;

use crate::auth::oidc::ProviderError;

/// Failures that end a sign-in attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignInError {
    /// Running inside a frame, the popup was unavailable and the top-level
    /// redirect fallback could not be built or started either.
    #[error(
        "Sign-in is blocked in this embedded context: the popup was unavailable and the top-level redirect failed ({source}). Open the app in its own tab or allow popups."
    )]
    EmbeddedLoginBlocked {
        /// Why the top-level redirect failed.
        source: ProviderError,
    },

    /// The same-window redirect to the identity provider could not be built
    /// or started.
    #[error("Sign-in redirect failed: {source}")]
    RedirectFailed {
        /// Why the redirect failed.
        source: ProviderError,
    },
}

/// Errors raised by the session manager and sign-in flows.
///
/// # Thread Safety
///
/// `AuthError` is `Send + Sync`, making it safe to use across async boundaries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No valid session exists. Call `sign_in_redirect` to start a sign-in.
    #[error("No valid session. Sign in to continue.")]
    Unauthenticated,

    /// Completing an authorization or sign-out callback failed.
    #[error("Failed to complete the sign-in callback: {0}")]
    CallbackExchange(#[source] ProviderError),

    /// A sign-in attempt could not be started.
    #[error(transparent)]
    SignIn(#[from] SignInError),

    /// A protocol, storage or host failure outside callback handling.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The operation needs a host environment and none was configured.
    #[error("This operation requires a browser host environment")]
    HostUnavailable,
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AuthError>();
    assert_send_sync::<SignInError>();
};
