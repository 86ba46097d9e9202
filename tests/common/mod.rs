//! Shared fixtures for integration tests: a scriptable host environment and
//! a mock identity provider.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use synchive::auth::oidc::ProviderMetadata;
use synchive::host::{
    FrameAccessError, HostEnvironment, HostError, KeyValueStore, MemoryStore, RedirectTarget,
};
use synchive::{OidcSettings, SynchiveClient, SynchiveConfig};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REDIRECT_URI: &str = "https://app.example.com/callback";
pub const SILENT_REDIRECT_URI: &str = "https://app.example.com/silent";

/// What a popup or hidden frame does once the host loads it.
#[derive(Clone, Debug)]
pub enum WindowBehavior {
    /// Returns to the request's redirect URI with `code` and its state.
    Complete { code: String },
    /// Fails to load or never returns.
    Fail(HostError),
}

impl WindowBehavior {
    fn load(&self, request: &Url) -> Result<Url, HostError> {
        match self {
            Self::Complete { code } => {
                let redirect_uri = query_value(request, "redirect_uri").unwrap();
                let state = query_value(request, "state").unwrap();
                Ok(Url::parse(&format!("{redirect_uri}?code={code}&state={state}")).unwrap())
            }
            Self::Fail(error) => Err(error.clone()),
        }
    }
}

/// A host environment whose answers are set by the test and whose side
/// effects are recorded.
#[derive(Debug)]
pub struct MockHost {
    pub location: Mutex<Url>,
    pub top_level: Result<bool, FrameAccessError>,
    pub opener: bool,
    pub popup: WindowBehavior,
    pub silent: WindowBehavior,
    pub navigate_error: Option<HostError>,
    pub store: MemoryStore,
    pub navigations: Mutex<Vec<(Url, RedirectTarget)>>,
    pub popups: Mutex<Vec<Url>>,
    pub silent_frames: Mutex<Vec<Url>>,
    pub replaced: Mutex<Vec<Url>>,
    pub notified: Mutex<Vec<Url>>,
    pub closed: AtomicBool,
}

impl MockHost {
    pub fn top_level() -> Self {
        Self::with_frame(Ok(true))
    }

    pub fn framed() -> Self {
        Self::with_frame(Ok(false))
    }

    pub fn with_frame(top_level: Result<bool, FrameAccessError>) -> Self {
        Self {
            location: Mutex::new(Url::parse("https://app.example.com/home").unwrap()),
            top_level,
            opener: false,
            popup: WindowBehavior::Fail(HostError::PopupBlocked),
            silent: WindowBehavior::Fail(HostError::Other("login_required".to_string())),
            navigate_error: None,
            store: MemoryStore::new(),
            navigations: Mutex::new(Vec::new()),
            popups: Mutex::new(Vec::new()),
            silent_frames: Mutex::new(Vec::new()),
            replaced: Mutex::new(Vec::new()),
            notified: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn at(self, location: &str) -> Self {
        *self.location.lock().unwrap() = Url::parse(location).unwrap();
        self
    }

    #[must_use]
    pub fn popup(mut self, behavior: WindowBehavior) -> Self {
        self.popup = behavior;
        self
    }

    #[must_use]
    pub fn silent(mut self, behavior: WindowBehavior) -> Self {
        self.silent = behavior;
        self
    }

    #[must_use]
    pub fn opened_by_another_window(mut self) -> Self {
        self.opener = true;
        self
    }

    #[must_use]
    pub fn failing_navigation(mut self, error: HostError) -> Self {
        self.navigate_error = Some(error);
        self
    }

    #[must_use]
    pub fn sharing_store(mut self, store: &MemoryStore) -> Self {
        self.store = store.clone();
        self
    }

    pub fn navigations(&self) -> Vec<(Url, RedirectTarget)> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn silent_frames(&self) -> Vec<Url> {
        self.silent_frames.lock().unwrap().clone()
    }

    pub fn replaced(&self) -> Vec<Url> {
        self.replaced.lock().unwrap().clone()
    }

    pub fn notified(&self) -> Vec<Url> {
        self.notified.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn set_location(&self, location: &str) {
        *self.location.lock().unwrap() = Url::parse(location).unwrap();
    }

    /// Keys in the host store holding in-flight request state.
    pub fn pending_states(&self) -> Vec<String> {
        self.store
            .keys()
            .unwrap()
            .into_iter()
            .filter(|key| key.starts_with("oidc.state."))
            .collect()
    }
}

#[async_trait]
impl HostEnvironment for MockHost {
    fn location(&self) -> Url {
        self.location.lock().unwrap().clone()
    }

    fn replace_location(&self, url: &Url) {
        self.replaced.lock().unwrap().push(url.clone());
        *self.location.lock().unwrap() = url.clone();
    }

    fn is_top_level(&self) -> Result<bool, FrameAccessError> {
        self.top_level
    }

    fn has_opener(&self) -> bool {
        self.opener
    }

    fn storage(&self) -> Option<Arc<dyn KeyValueStore>> {
        Some(Arc::new(self.store.clone()))
    }

    async fn navigate(&self, url: &Url, target: RedirectTarget) -> Result<(), HostError> {
        if let Some(error) = &self.navigate_error {
            return Err(error.clone());
        }
        self.navigations.lock().unwrap().push((url.clone(), target));
        Ok(())
    }

    async fn open_popup(&self, url: &Url) -> Result<Url, HostError> {
        self.popups.lock().unwrap().push(url.clone());
        self.popup.load(url)
    }

    async fn silent_frame(&self, url: &Url) -> Result<Url, HostError> {
        self.silent_frames.lock().unwrap().push(url.clone());
        self.silent.load(url)
    }

    fn notify_opener(&self, url: &Url) -> Result<(), HostError> {
        self.notified.lock().unwrap().push(url.clone());
        Ok(())
    }

    fn close_window(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

pub fn metadata_for(server: &MockServer) -> ProviderMetadata {
    ProviderMetadata {
        issuer: Some(server.uri()),
        authorization_endpoint: format!("{}/authorize", server.uri()),
        token_endpoint: format!("{}/token", server.uri()),
        end_session_endpoint: Some(format!("{}/logout", server.uri())),
        userinfo_endpoint: None,
    }
}

pub fn settings_for(server: &MockServer) -> OidcSettings {
    let mut settings = OidcSettings::new(server.uri(), "app-client", REDIRECT_URI);
    settings.metadata = Some(metadata_for(server));
    settings.post_logout_redirect_uri = Some("https://app.example.com/".to_string());
    settings.silent_redirect_uri = Some(SILENT_REDIRECT_URI.to_string());
    settings
}

/// A client whose provider is discovered from `server` rather than preset.
pub fn discovering_client_for(server: &MockServer, host: Arc<MockHost>) -> SynchiveClient {
    let mut settings = settings_for(server);
    settings.metadata = None;
    let config = SynchiveConfig::builder()
        .auth(settings)
        .base_url(format!("{}/v1/shape", server.uri()))
        .host(host)
        .build()
        .unwrap();
    SynchiveClient::new(config)
}

pub fn client_for(server: &MockServer, host: Arc<MockHost>) -> SynchiveClient {
    let config = SynchiveConfig::builder()
        .auth(settings_for(server))
        .base_url(format!("{}/v1/shape", server.uri()))
        .host(host)
        .build()
        .unwrap();
    SynchiveClient::new(config)
}

pub fn id_token(sub: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &json!({"sub": sub, "email": format!("{sub}@example.com")}),
        &EncodingKey::from_secret(b"provider-secret"),
    )
    .unwrap()
}

/// Mounts a token endpoint that exchanges `code` for `access_token`.
pub async fn mount_code_exchange(server: &MockServer, code: &str, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "id_token": id_token("user-1"),
            "scope": "openid profile offline_access",
        })))
        .mount(server)
        .await;
}
