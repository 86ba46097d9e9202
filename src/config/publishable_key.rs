//! Publishable key decoding.
//!
//! A publishable key is the single opaque credential a SyncHive app ships
//! with. It has the form `sh_publishable_{base64("{encryptedKey}::{environment}")}`
//! and is enough to derive the identity provider and data API endpoints.

use crate::error::CredentialFormatError;
use base64::prelude::*;
use std::fmt;

/// The decoded contents of a publishable key.
///
/// # Example
///
/// ```rust
/// use synchive::PublishableKey;
///
/// // base64("abc123::dev")
/// let decoded = PublishableKey::decode("sh_publishable_YWJjMTIzOjpkZXY=").unwrap();
/// assert_eq!(decoded.encrypted_key, "abc123");
/// assert_eq!(decoded.environment, "dev");
/// assert_eq!(decoded.authority(), "https://apis.dev.synchive.com/v1/auth/");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedPublishableKey {
    /// The encrypted key segment.
    pub encrypted_key: String,
    /// The environment identifier (e.g. `dev`, `prod`).
    pub environment: String,
}

impl DecodedPublishableKey {
    /// Returns the OIDC authority URL for this environment.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("https://apis.{}.synchive.com/v1/auth/", self.environment)
    }

    /// Returns the shape data API base URL for this environment.
    #[must_use]
    pub fn api_base_url(&self) -> String {
        format!("https://apis.{}.synchive.com/v1/shape", self.environment)
    }
}

impl fmt::Debug for DecodedPublishableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedPublishableKey")
            .field("encrypted_key", &"*****")
            .field("environment", &self.environment)
            .finish()
    }
}

/// Namespace for the publishable key format.
pub struct PublishableKey;

impl PublishableKey {
    /// The literal prefix every publishable key starts with.
    pub const PREFIX: &'static str = "sh_publishable_";

    const DELIMITER: &'static str = "::";

    /// Decodes a publishable key into its encrypted key and environment.
    ///
    /// The body accepts standard base64, the URL-safe alphabet (`-`/`_`) and
    /// the pipe-substituted variant (`|` in place of `/`), with or without
    /// padding.
    ///
    /// # Errors
    ///
    /// - [`CredentialFormatError::InvalidKey`] if the prefix is missing
    /// - [`CredentialFormatError::InvalidEncoding`] if the body is not base64 text
    /// - [`CredentialFormatError::InvalidPayload`] if the text is not `key::environment`
    pub fn decode(key: &str) -> Result<DecodedPublishableKey, CredentialFormatError> {
        let body = key
            .strip_prefix(Self::PREFIX)
            .ok_or(CredentialFormatError::InvalidKey)?;

        let mut normalized: String = body
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' | '|' => '/',
                other => other,
            })
            .collect();
        while normalized.len() % 4 != 0 {
            normalized.push('=');
        }

        let bytes = BASE64_STANDARD
            .decode(normalized.as_bytes())
            .map_err(|_| CredentialFormatError::InvalidEncoding)?;
        let text = String::from_utf8(bytes).map_err(|_| CredentialFormatError::InvalidEncoding)?;

        let segments: Vec<&str> = text.split(Self::DELIMITER).collect();
        match segments.as_slice() {
            [encrypted_key, environment] if !encrypted_key.is_empty() && !environment.is_empty() => {
                Ok(DecodedPublishableKey {
                    encrypted_key: (*encrypted_key).to_string(),
                    environment: (*environment).to_string(),
                })
            }
            _ => Err(CredentialFormatError::InvalidPayload),
        }
    }
}
