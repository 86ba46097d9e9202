//! OIDC settings resolution.
//!
//! Turns whatever the caller supplied (explicit settings, or a publishable
//! key plus optional overrides) into one complete [`ResolvedOidcSettings`]
//! bound to the persistent store.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::oidc::ProviderMetadata;
use crate::config::DecodedPublishableKey;
use crate::error::ConfigError;
use crate::host::{HostEnvironment, KeyValueStore, NamespacedStore};

/// Scopes requested when none are configured.
pub const DEFAULT_SCOPE: &str = "openid profile offline_access";

/// Response type requested when none is configured.
pub const DEFAULT_RESPONSE_TYPE: &str = "code";

/// Key prefix for the stored user session.
pub const USER_STORE_PREFIX: &str = "oidc.user:";

/// Key prefix for in-flight authorization request states.
pub const STATE_STORE_PREFIX: &str = "oidc.state.";

/// OIDC client settings.
///
/// # Example
///
/// ```rust
/// use synchive::OidcSettings;
///
/// let settings = OidcSettings::new(
///     "https://id.example.com/",
///     "my-client",
///     "https://app.example.com",
/// );
/// assert_eq!(settings.scope, "openid profile offline_access");
/// assert_eq!(settings.response_type, "code");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcSettings {
    /// The identity provider's issuer URL.
    pub authority: String,
    /// The OAuth client identifier.
    pub client_id: String,
    /// Where the provider sends the browser after sign-in.
    pub redirect_uri: String,
    /// Redirect URI used for silent renewal, if different.
    pub silent_redirect_uri: Option<String>,
    /// Where the provider sends the browser after sign-out.
    pub post_logout_redirect_uri: Option<String>,
    /// The OAuth response type.
    pub response_type: String,
    /// Space-separated scopes.
    pub scope: String,
    /// Static provider metadata. When set, discovery is skipped.
    pub metadata: Option<ProviderMetadata>,
    /// Extra query parameters appended to authorization requests.
    pub extra_query_params: BTreeMap<String, String>,
}

impl OidcSettings {
    /// Creates settings with the default response type and scopes.
    #[must_use]
    pub fn new(
        authority: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            authority: authority.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            silent_redirect_uri: None,
            post_logout_redirect_uri: None,
            response_type: DEFAULT_RESPONSE_TYPE.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            metadata: None,
            extra_query_params: BTreeMap::new(),
        }
    }

    /// Returns the key the current user session is stored under.
    #[must_use]
    pub fn user_store_key(&self) -> String {
        format!("{}:{}", self.authority, self.client_id)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.authority).map_err(|e| ConfigError::InvalidSetting {
            field: "authority",
            reason: e.to_string(),
        })?;
        if self.client_id.is_empty() {
            return Err(ConfigError::InvalidSetting {
                field: "client_id",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Caller overrides applied on top of derived settings.
///
/// Every field that is `Some` replaces the derived value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OidcOverrides {
    /// Replaces the authority.
    pub authority: Option<String>,
    /// Replaces the client identifier.
    pub client_id: Option<String>,
    /// Replaces the redirect URI.
    pub redirect_uri: Option<String>,
    /// Replaces the silent redirect URI.
    pub silent_redirect_uri: Option<String>,
    /// Replaces the post-logout redirect URI.
    pub post_logout_redirect_uri: Option<String>,
    /// Replaces the response type.
    pub response_type: Option<String>,
    /// Replaces the scopes.
    pub scope: Option<String>,
    /// Replaces the provider metadata.
    pub metadata: Option<ProviderMetadata>,
    /// Replaces the extra authorization query parameters.
    pub extra_query_params: Option<BTreeMap<String, String>>,
}

impl OidcOverrides {
    fn apply(&self, mut settings: OidcSettings) -> OidcSettings {
        if let Some(authority) = &self.authority {
            settings.authority.clone_from(authority);
        }
        if let Some(client_id) = &self.client_id {
            settings.client_id.clone_from(client_id);
        }
        if let Some(redirect_uri) = &self.redirect_uri {
            settings.redirect_uri.clone_from(redirect_uri);
        }
        if let Some(response_type) = &self.response_type {
            settings.response_type.clone_from(response_type);
        }
        if let Some(scope) = &self.scope {
            settings.scope.clone_from(scope);
        }
        if let Some(params) = &self.extra_query_params {
            settings.extra_query_params.clone_from(params);
        }
        if self.silent_redirect_uri.is_some() {
            settings.silent_redirect_uri.clone_from(&self.silent_redirect_uri);
        }
        if self.post_logout_redirect_uri.is_some() {
            settings
                .post_logout_redirect_uri
                .clone_from(&self.post_logout_redirect_uri);
        }
        if self.metadata.is_some() {
            settings.metadata.clone_from(&self.metadata);
        }
        settings
    }
}

/// Complete OIDC settings bound to their stores.
#[derive(Clone, Debug)]
pub struct ResolvedOidcSettings {
    /// The merged settings.
    pub settings: OidcSettings,
    /// Where the current user session is stored.
    pub user_store: NamespacedStore,
    /// Where in-flight authorization request states are stored.
    pub state_store: NamespacedStore,
}

impl ResolvedOidcSettings {
    fn bind(settings: OidcSettings, store: &Arc<dyn KeyValueStore>) -> Self {
        Self {
            settings,
            user_store: NamespacedStore::new(Arc::clone(store), USER_STORE_PREFIX),
            state_store: NamespacedStore::new(Arc::clone(store), STATE_STORE_PREFIX),
        }
    }
}

/// Everything the resolver may draw on.
#[derive(Clone, Copy)]
pub struct SettingsSources<'a> {
    /// Explicit settings; when present they win outright.
    pub explicit: Option<&'a OidcSettings>,
    /// The raw publishable key.
    pub publishable_key: Option<&'a str>,
    /// The decoded publishable key.
    pub decoded_key: Option<&'a DecodedPublishableKey>,
    /// Overrides merged over derived settings.
    pub overrides: &'a OidcOverrides,
    /// The host environment, required for derivation.
    pub host: Option<&'a dyn HostEnvironment>,
}

/// Resolves complete OIDC settings.
///
/// Explicit settings are used as-is apart from the store bindings. Otherwise
/// settings are derived from the publishable key and the host's origin, then
/// the overrides are merged on top.
///
/// # Errors
///
/// - [`ConfigError::MissingAuthConfig`] if there are no explicit settings and
///   no decoded publishable key
/// - [`ConfigError::BrowserRequired`] if derivation is needed but no host is present
/// - [`ConfigError::InvalidSetting`] if the result has an unusable authority
///   or client identifier
pub fn resolve_oidc_settings(
    sources: SettingsSources<'_>,
    store: &Arc<dyn KeyValueStore>,
) -> Result<ResolvedOidcSettings, ConfigError> {
    if let Some(explicit) = sources.explicit {
        explicit.validate()?;
        return Ok(ResolvedOidcSettings::bind(explicit.clone(), store));
    }

    let (Some(key), Some(decoded)) = (sources.publishable_key, sources.decoded_key) else {
        return Err(ConfigError::MissingAuthConfig);
    };
    let host = sources.host.ok_or(ConfigError::BrowserRequired)?;

    let origin = host.origin();
    let mut derived = OidcSettings::new(decoded.authority(), key, origin.clone());
    derived.silent_redirect_uri = Some(origin.clone());
    derived.post_logout_redirect_uri = Some(origin);

    let settings = sources.overrides.apply(derived);
    settings.validate()?;
    tracing::debug!(
        authority = %settings.authority,
        environment = %decoded.environment,
        "derived auth settings from publishable key"
    );
    Ok(ResolvedOidcSettings::bind(settings, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublishableKey;
    use crate::host::{FrameAccessError, HostError, MemoryStore, RedirectTarget};
    use async_trait::async_trait;

    const KEY: &str = "sh_publishable_YWJjMTIzOjpkZXY=";

    #[derive(Debug)]
    struct OriginOnly;

    #[async_trait]
    impl HostEnvironment for OriginOnly {
        fn location(&self) -> Url {
            Url::parse("https://app.example.com/settings?tab=2#top").unwrap()
        }
        fn replace_location(&self, _url: &Url) {}
        fn is_top_level(&self) -> Result<bool, FrameAccessError> {
            Ok(true)
        }
        fn has_opener(&self) -> bool {
            false
        }
        async fn navigate(&self, _url: &Url, _target: RedirectTarget) -> Result<(), HostError> {
            Ok(())
        }
        async fn open_popup(&self, _url: &Url) -> Result<Url, HostError> {
            Err(HostError::PopupBlocked)
        }
        fn notify_opener(&self, _url: &Url) -> Result<(), HostError> {
            Ok(())
        }
        fn close_window(&self) {}
    }

    fn store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_derives_settings_from_publishable_key() {
        let decoded = PublishableKey::decode(KEY).unwrap();
        let overrides = OidcOverrides::default();
        let resolved = resolve_oidc_settings(
            SettingsSources {
                explicit: None,
                publishable_key: Some(KEY),
                decoded_key: Some(&decoded),
                overrides: &overrides,
                host: Some(&OriginOnly),
            },
            &store(),
        )
        .unwrap();

        let settings = &resolved.settings;
        assert_eq!(settings.authority, "https://apis.dev.synchive.com/v1/auth/");
        assert_eq!(settings.client_id, KEY);
        assert_eq!(settings.redirect_uri, "https://app.example.com");
        assert_eq!(
            settings.silent_redirect_uri.as_deref(),
            Some("https://app.example.com")
        );
        assert_eq!(settings.response_type, "code");
        assert_eq!(settings.scope, "openid profile offline_access");
        assert_eq!(resolved.user_store.prefix(), USER_STORE_PREFIX);
        assert_eq!(resolved.state_store.prefix(), STATE_STORE_PREFIX);
    }

    #[test]
    fn test_overrides_replace_derived_fields() {
        let decoded = PublishableKey::decode(KEY).unwrap();
        let overrides = OidcOverrides {
            scope: Some("openid".to_string()),
            redirect_uri: Some("https://app.example.com/callback".to_string()),
            ..OidcOverrides::default()
        };
        let resolved = resolve_oidc_settings(
            SettingsSources {
                explicit: None,
                publishable_key: Some(KEY),
                decoded_key: Some(&decoded),
                overrides: &overrides,
                host: Some(&OriginOnly),
            },
            &store(),
        )
        .unwrap();

        assert_eq!(resolved.settings.scope, "openid");
        assert_eq!(resolved.settings.redirect_uri, "https://app.example.com/callback");
        assert_eq!(
            resolved.settings.silent_redirect_uri.as_deref(),
            Some("https://app.example.com")
        );
    }

    #[test]
    fn test_explicit_settings_win_and_ignore_overrides() {
        let decoded = PublishableKey::decode(KEY).unwrap();
        let explicit = OidcSettings::new("https://id.example.com/", "explicit-client", "https://x");
        let overrides = OidcOverrides {
            client_id: Some("override".to_string()),
            ..OidcOverrides::default()
        };
        let resolved = resolve_oidc_settings(
            SettingsSources {
                explicit: Some(&explicit),
                publishable_key: Some(KEY),
                decoded_key: Some(&decoded),
                overrides: &overrides,
                host: None,
            },
            &store(),
        )
        .unwrap();

        assert_eq!(resolved.settings, explicit);
    }

    #[test]
    fn test_missing_key_is_missing_auth_config() {
        let overrides = OidcOverrides::default();
        let result = resolve_oidc_settings(
            SettingsSources {
                explicit: None,
                publishable_key: None,
                decoded_key: None,
                overrides: &overrides,
                host: Some(&OriginOnly),
            },
            &store(),
        );
        assert!(matches!(result, Err(ConfigError::MissingAuthConfig)));
    }

    #[test]
    fn test_derivation_without_host_requires_browser() {
        let decoded = PublishableKey::decode(KEY).unwrap();
        let overrides = OidcOverrides::default();
        let result = resolve_oidc_settings(
            SettingsSources {
                explicit: None,
                publishable_key: Some(KEY),
                decoded_key: Some(&decoded),
                overrides: &overrides,
                host: None,
            },
            &store(),
        );
        assert!(matches!(result, Err(ConfigError::BrowserRequired)));
    }

    #[test]
    fn test_invalid_explicit_authority_is_rejected() {
        let explicit = OidcSettings::new("not a url", "client", "https://x");
        let overrides = OidcOverrides::default();
        let result = resolve_oidc_settings(
            SettingsSources {
                explicit: Some(&explicit),
                publishable_key: None,
                decoded_key: None,
                overrides: &overrides,
                host: None,
            },
            &store(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidSetting { field: "authority", .. })
        ));
    }
}
