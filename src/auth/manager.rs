//! The session manager.
//!
//! [`SessionManager`] owns the one authoritative [`Session`] of a client. It
//! completes callbacks when the page loads, renews sessions once before
//! giving up, signs the user out, and publishes every transition as a
//! [`SessionEvent`].
//!
//! Renewal uses the refresh token when the session has one. Otherwise it
//! falls back to a `prompt=none` sign-in in a hidden frame provided by the
//! host, which also recovers a session the provider still holds when
//! nothing is stored locally.
//!
//! # States
//!
//! ```text
//!   NoSession ──sign-in──▶ SigningIn ──callback──▶ CallbackPending ──▶ Authenticated
//!                                                                       │
//!                   Authenticated ◀──renewed── Renewing ◀──expired── Expired
//! ```
//!
//! Callers must await [`SessionManager::initialize`] before relying on
//! session state.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use url::Url;

use crate::auth::callback::{is_callback, scrub};
use crate::auth::error::AuthError;
use crate::auth::events::{SessionEvent, SessionEvents};
use crate::auth::oidc::{OidcClient, ProviderError, RequestKind};
use crate::auth::Session;
use crate::host::{HostEnvironment, RedirectTarget};

/// Where the session manager is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// No session is stored.
    NoSession,
    /// A non-expired session is stored.
    Authenticated,
    /// The stored session has expired and renewal has not succeeded.
    Expired,
    /// A silent renewal is in flight.
    Renewing,
    /// A sign-in has been started and has not returned yet.
    SigningIn,
    /// A callback is being completed.
    CallbackPending,
}

/// Owns the client's session and drives the sign-in, renewal and sign-out
/// protocol.
///
/// # Thread Safety
///
/// `SessionManager` is `Send + Sync` and is shared behind an `Arc`.
#[derive(Debug)]
pub struct SessionManager {
    oidc: OidcClient,
    host: Option<Arc<dyn HostEnvironment>>,
    events: SessionEvents,
    status: Mutex<SessionStatus>,
}

impl SessionManager {
    /// Creates a manager. Without a host, callback handling and navigation
    /// are unavailable.
    #[must_use]
    pub fn new(oidc: OidcClient, host: Option<Arc<dyn HostEnvironment>>) -> Self {
        let manager = Self {
            oidc,
            host,
            events: SessionEvents::new(),
            status: Mutex::new(SessionStatus::NoSession),
        };
        manager.settle_status();
        manager
    }

    /// Returns the protocol engine.
    #[must_use]
    pub const fn oidc(&self) -> &OidcClient {
        &self.oidc
    }

    /// Returns the host environment, if any.
    #[must_use]
    pub fn host(&self) -> Option<&dyn HostEnvironment> {
        self.host.as_deref()
    }

    /// Returns the lifecycle channel.
    #[must_use]
    pub const fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Subscribes to lifecycle events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_status(&self, status: SessionStatus) {
        let mut current = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != status {
            tracing::debug!(from = ?*current, to = ?status, "session status changed");
            *current = status;
        }
    }

    /// Recomputes the status from the stored session.
    pub(crate) fn settle_status(&self) {
        let status = match self.oidc.load_user() {
            Ok(Some(session)) if !session.expired() => SessionStatus::Authenticated,
            Ok(Some(_)) => SessionStatus::Expired,
            Ok(None) | Err(_) => SessionStatus::NoSession,
        };
        self.set_status(status);
    }

    /// Returns the stored session without renewing it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] if the store cannot be read.
    pub fn user(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.oidc.load_user()?)
    }

    /// Removes the local session and publishes [`SessionEvent::UserUnloaded`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] if the store cannot be written.
    pub fn remove_user(&self) -> Result<(), AuthError> {
        self.oidc.remove_user()?;
        self.set_status(SessionStatus::NoSession);
        self.events.emit(SessionEvent::UserUnloaded);
        Ok(())
    }

    /// Completes a pending callback if the current page is one.
    ///
    /// Runs when the location carries authorization-response parameters or
    /// the window was opened by another window. Afterwards the parameters
    /// are scrubbed from the location in place. A popup whose request state
    /// has been lost closes itself instead of failing. Otherwise this is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CallbackExchange`] if completing the callback fails.
    pub async fn initialize(&self) -> Result<(), AuthError> {
        let Some(host) = self.host.as_deref() else {
            return Ok(());
        };
        let location = host.location();
        let has_params = is_callback(&location);
        let in_popup = host.has_opener();
        if !has_params && !in_popup {
            return Ok(());
        }

        self.set_status(SessionStatus::CallbackPending);
        match self.complete_callback(host, &location, in_popup).await {
            Ok(()) => {
                self.settle_status();
                if has_params {
                    let cleaned = scrub(&location);
                    if cleaned != location {
                        host.replace_location(&cleaned);
                    }
                }
                Ok(())
            }
            Err(error) if in_popup && error.is_state_lost() => {
                tracing::warn!(%error, "popup callback state was lost, closing the popup");
                self.settle_status();
                host.close_window();
                Ok(())
            }
            Err(error) => {
                self.settle_status();
                Err(AuthError::CallbackExchange(error))
            }
        }
    }

    async fn complete_callback(
        &self,
        host: &dyn HostEnvironment,
        location: &Url,
        in_popup: bool,
    ) -> Result<(), ProviderError> {
        match self.oidc.peek_request_kind(location)? {
            RequestKind::Popup if in_popup => {
                tracing::debug!("handing popup callback to the opener");
                host.notify_opener(location)?;
                host.close_window();
            }
            RequestKind::Silent => {
                tracing::debug!("handing silent callback to the embedding window");
                host.notify_opener(location)?;
            }
            RequestKind::SignOut => {
                self.oidc.process_signout_response(location)?;
                self.events.emit(SessionEvent::UserSignedOut);
            }
            RequestKind::Redirect | RequestKind::Popup => {
                let session = self.oidc.process_signin_response(location).await?;
                self.events.emit(SessionEvent::UserLoaded(session));
            }
        }
        Ok(())
    }

    /// Returns a non-expired session, renewing at most once.
    ///
    /// An expired session with a refresh token is refreshed. Without one, or
    /// without any stored session, a silent sign-in is attempted through the
    /// host. Renewal failures are logged and published as
    /// [`SessionEvent::SilentRenewError`], never returned.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] if no valid session results, or
    /// [`AuthError::Provider`] if the store cannot be read.
    pub async fn ensure_valid_session(&self) -> Result<Session, AuthError> {
        let current = self.oidc.load_user()?;
        match &current {
            Some(session) if !session.expired() => {
                self.set_status(SessionStatus::Authenticated);
                return Ok(session.clone());
            }
            Some(_) => {
                self.set_status(SessionStatus::Expired);
                self.events.emit(SessionEvent::AccessTokenExpired);
            }
            None => {}
        }

        let renewal = match (current.as_ref(), self.host.as_deref()) {
            (None, None) => {
                self.set_status(SessionStatus::NoSession);
                return Err(AuthError::Unauthenticated);
            }
            (Some(session), _) if session.refresh_token.is_some() => {
                self.set_status(SessionStatus::Renewing);
                self.oidc.refresh(session).await
            }
            (_, Some(host)) => {
                self.set_status(SessionStatus::Renewing);
                self.silent_sign_in(host).await
            }
            (Some(session), None) => {
                self.set_status(SessionStatus::Renewing);
                self.oidc.refresh(session).await
            }
        };

        let unrenewed = if current.is_some() {
            SessionStatus::Expired
        } else {
            SessionStatus::NoSession
        };
        match renewal {
            Ok(renewed) if !renewed.expired() => {
                self.set_status(SessionStatus::Authenticated);
                self.events.emit(SessionEvent::UserLoaded(renewed.clone()));
                Ok(renewed)
            }
            Ok(_) => {
                tracing::warn!("silent renewal returned an already expired session");
                self.set_status(unrenewed);
                Err(AuthError::Unauthenticated)
            }
            Err(error) => {
                tracing::warn!(%error, "silent renewal failed");
                self.set_status(unrenewed);
                self.events
                    .emit(SessionEvent::SilentRenewError(error.message));
                Err(AuthError::Unauthenticated)
            }
        }
    }

    async fn silent_sign_in(&self, host: &dyn HostEnvironment) -> Result<Session, ProviderError> {
        let request = self.oidc.create_signin_request(RequestKind::Silent).await?;
        let response = host.silent_frame(&request).await?;
        self.oidc.process_signin_response(&response).await
    }

    /// Signs the user out at the identity provider.
    ///
    /// The local session is removed and the window navigates to the
    /// provider's end-session endpoint. There is no retry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::HostUnavailable`] without a host, or
    /// [`AuthError::Provider`] if the request cannot be built or the
    /// navigation fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let host = self.host.as_deref().ok_or(AuthError::HostUnavailable)?;
        let id_token = self.oidc.load_user()?.and_then(|session| session.id_token);
        let url = self.oidc.create_signout_request(id_token.as_deref()).await?;

        self.remove_user()?;
        host.navigate(&url, RedirectTarget::SelfWindow)
            .await
            .map_err(ProviderError::from)?;
        Ok(())
    }
}

// Verify SessionManager is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SessionManager>();
};
