//! Error types for client construction.
//!
//! This module contains the errors raised synchronously while building a
//! [`SynchiveConfig`](crate::SynchiveConfig): configuration problems and
//! malformed publishable keys.
//!
//! # Error Handling
//!
//! Both error types are fatal at construction time and never retried. Error
//! messages are designed to be clear and actionable.
//!
//! # Example
//!
//! ```rust
//! use synchive::{CredentialFormatError, PublishableKey};
//!
//! let result = PublishableKey::decode("pk_live_abc");
//! assert!(matches!(result, Err(CredentialFormatError::InvalidKey)));
//! ```

use thiserror::Error;

/// Errors that can occur while decoding a publishable key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialFormatError {
    /// The key does not start with the `sh_publishable_` prefix.
    #[error("Invalid publishable key. Expected a key starting with 'sh_publishable_'.")]
    InvalidKey,

    /// The key body is not valid base64.
    #[error("Invalid publishable key encoding: the key body is not valid base64.")]
    InvalidEncoding,

    /// The decoded key does not have the `{key}::{environment}` shape.
    #[error("Invalid publishable key payload: expected '<key>::<environment>'.")]
    InvalidPayload,
}

/// Errors that can occur during client configuration.
///
/// Each variant provides a clear, actionable error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No base API URL was supplied and none could be derived.
    #[error("Missing base URL. Provide a publishable key or set base_url explicitly.")]
    MissingBaseUrl,

    /// The base API URL could not be parsed.
    #[error("Invalid base URL '{url}'. Please provide an absolute URL (e.g., 'https://apis.dev.synchive.com/v1/shape').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// No persistent store was supplied and the host provides none.
    #[error("Missing storage. Provide a key-value store or a host environment with storage.")]
    MissingStorage,

    /// Neither explicit auth settings nor a publishable key were supplied.
    #[error("Missing auth configuration. Provide either auth settings or a publishable key.")]
    MissingAuthConfig,

    /// Settings derivation needs a browser-like host environment.
    #[error("A browser host environment is required to derive auth settings from a publishable key.")]
    BrowserRequired,

    /// An OIDC setting is malformed.
    #[error("Invalid auth setting '{field}': {reason}")]
    InvalidSetting {
        /// The name of the offending setting.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The publishable key could not be decoded.
    #[error(transparent)]
    Credential(#[from] CredentialFormatError),
}
