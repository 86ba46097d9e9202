//! Configuration types for the SyncHive client.
//!
//! This module turns the caller's construction options into one immutable
//! [`SynchiveConfig`].
//!
//! # Overview
//!
//! - [`SynchiveConfig`]: the validated client configuration
//! - [`SynchiveConfigBuilder`]: a builder for constructing [`SynchiveConfig`] instances
//! - [`PublishableKey`] / [`DecodedPublishableKey`]: the opaque credential and its contents
//! - [`OidcSettings`] / [`OidcOverrides`]: explicit and partial auth settings
//! - [`settings::resolve_oidc_settings`]: the settings resolver
//!
//! # Auth Sources
//!
//! Either explicit [`OidcSettings`] or a publishable key must be supplied.
//! When both are present the explicit settings win; the key still provides
//! the default base URL.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use synchive::{OidcSettings, SynchiveConfig};
//! use synchive::host::MemoryStore;
//!
//! let config = SynchiveConfig::builder()
//!     .auth(OidcSettings::new(
//!         "https://id.example.com/",
//!         "my-client",
//!         "https://app.example.com",
//!     ))
//!     .base_url("https://api.example.com/v1/shape")
//!     .storage(Arc::new(MemoryStore::new()))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.base_url(), "https://api.example.com/v1/shape");
//! ```

mod publishable_key;
pub mod settings;

pub use publishable_key::{DecodedPublishableKey, PublishableKey};
pub use settings::{OidcOverrides, OidcSettings, ResolvedOidcSettings};

use std::sync::Arc;

use url::Url;

use crate::clients::{DefaultUrlBuilder, ShapeUrlBuilder};
use crate::error::ConfigError;
use crate::host::{HostEnvironment, KeyValueStore};
use settings::{resolve_oidc_settings, SettingsSources};

/// Configuration for the SyncHive client.
///
/// # Thread Safety
///
/// `SynchiveConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug)]
pub struct SynchiveConfig {
    decoded_key: Option<DecodedPublishableKey>,
    base_url: String,
    oidc: ResolvedOidcSettings,
    storage: Arc<dyn KeyValueStore>,
    host: Option<Arc<dyn HostEnvironment>>,
    http_client: reqwest::Client,
    url_builder: Arc<dyn ShapeUrlBuilder>,
}

impl SynchiveConfig {
    /// Creates a new builder for constructing a `SynchiveConfig`.
    #[must_use]
    pub fn builder() -> SynchiveConfigBuilder {
        SynchiveConfigBuilder::new()
    }

    /// Returns the decoded publishable key, if one was supplied.
    #[must_use]
    pub const fn decoded_key(&self) -> Option<&DecodedPublishableKey> {
        self.decoded_key.as_ref()
    }

    /// Returns the data API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the resolved OIDC settings and their store bindings.
    #[must_use]
    pub const fn oidc(&self) -> &ResolvedOidcSettings {
        &self.oidc
    }

    /// Returns the persistent store.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    /// Returns the host environment, if any.
    #[must_use]
    pub fn host(&self) -> Option<&Arc<dyn HostEnvironment>> {
        self.host.as_ref()
    }

    /// Returns the HTTP client used for every request.
    #[must_use]
    pub const fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Returns the shape URL builder.
    #[must_use]
    pub fn url_builder(&self) -> &Arc<dyn ShapeUrlBuilder> {
        &self.url_builder
    }
}

// Verify SynchiveConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SynchiveConfig>();
};

/// Builder for constructing [`SynchiveConfig`] instances.
///
/// # Defaults
///
/// - `base_url`: derived from the publishable key
/// - `storage`: the host's storage
/// - `overrides`: none
/// - `http_client`: a new `reqwest::Client`
/// - `url_builder`: [`DefaultUrlBuilder`]
#[derive(Debug, Default)]
pub struct SynchiveConfigBuilder {
    publishable_key: Option<String>,
    auth: Option<OidcSettings>,
    overrides: OidcOverrides,
    storage: Option<Arc<dyn KeyValueStore>>,
    host: Option<Arc<dyn HostEnvironment>>,
    http_client: Option<reqwest::Client>,
    base_url: Option<String>,
    url_builder: Option<Arc<dyn ShapeUrlBuilder>>,
}

impl SynchiveConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the publishable key.
    #[must_use]
    pub fn publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = Some(key.into());
        self
    }

    /// Sets explicit OIDC settings. These take precedence over settings
    /// derived from the publishable key.
    #[must_use]
    pub fn auth(mut self, settings: OidcSettings) -> Self {
        self.auth = Some(settings);
        self
    }

    /// Sets overrides merged over settings derived from the publishable key.
    #[must_use]
    pub fn overrides(mut self, overrides: OidcOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Sets the persistent store for sessions and request states.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the host environment.
    #[must_use]
    pub fn host(mut self, host: Arc<dyn HostEnvironment>) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the HTTP client.
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the data API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the shape URL builder.
    #[must_use]
    pub fn url_builder(mut self, builder: Arc<dyn ShapeUrlBuilder>) -> Self {
        self.url_builder = Some(builder);
        self
    }

    /// Builds the [`SynchiveConfig`].
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Credential`] if the publishable key is malformed
    /// - [`ConfigError::MissingBaseUrl`] / [`ConfigError::InvalidBaseUrl`]
    /// - [`ConfigError::MissingStorage`] if neither a store nor a host with
    ///   storage is supplied
    /// - [`ConfigError::MissingAuthConfig`], [`ConfigError::BrowserRequired`]
    ///   or [`ConfigError::InvalidSetting`] from settings resolution
    pub fn build(self) -> Result<SynchiveConfig, ConfigError> {
        let decoded_key = self
            .publishable_key
            .as_deref()
            .map(PublishableKey::decode)
            .transpose()?;

        let base_url = self
            .base_url
            .or_else(|| decoded_key.as_ref().map(DecodedPublishableKey::api_base_url))
            .ok_or(ConfigError::MissingBaseUrl)?;
        Url::parse(&base_url).map_err(|_| ConfigError::InvalidBaseUrl {
            url: base_url.clone(),
        })?;

        let storage = self
            .storage
            .or_else(|| self.host.as_ref().and_then(|host| host.storage()))
            .ok_or(ConfigError::MissingStorage)?;

        let oidc = resolve_oidc_settings(
            SettingsSources {
                explicit: self.auth.as_ref(),
                publishable_key: self.publishable_key.as_deref(),
                decoded_key: decoded_key.as_ref(),
                overrides: &self.overrides,
                host: self.host.as_deref(),
            },
            &storage,
        )?;

        let url_builder: Arc<dyn ShapeUrlBuilder> = match self.url_builder {
            Some(builder) => builder,
            None => Arc::new(DefaultUrlBuilder),
        };

        Ok(SynchiveConfig {
            decoded_key,
            base_url,
            oidc,
            storage,
            host: self.host,
            http_client: self.http_client.unwrap_or_default(),
            url_builder,
        })
    }
}
