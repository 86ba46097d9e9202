//! Provider metadata and discovery.

use serde::{Deserialize, Serialize};

use super::error::{ProviderError, ProviderErrorKind};

/// The subset of the OpenID provider configuration the client uses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// The provider's issuer identifier.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Where authorization requests are sent.
    pub authorization_endpoint: String,
    /// Where codes and refresh tokens are exchanged.
    pub token_endpoint: String,
    /// Where RP-initiated logout is sent.
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    /// The user info endpoint.
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

/// Returns the discovery document URL for an authority.
pub(crate) fn discovery_url(authority: &str) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        authority.trim_end_matches('/')
    )
}

/// Fetches the discovery document for `authority`.
pub(crate) async fn discover(
    http: &reqwest::Client,
    authority: &str,
) -> Result<ProviderMetadata, ProviderError> {
    let url = discovery_url(authority);
    tracing::debug!(%url, "fetching provider metadata");

    let response = http
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError {
            kind: ProviderErrorKind::Discovery,
            message: format!("Discovery request to {url} returned {}: {body}", status.as_u16()),
            status: Some(status.as_u16()),
        });
    }

    response.json().await.map_err(|e| {
        ProviderError::new(
            ProviderErrorKind::Discovery,
            format!("Failed to parse provider metadata: {e}"),
        )
    })
}
