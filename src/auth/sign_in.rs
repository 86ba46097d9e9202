//! Sign-in strategy selection.
//!
//! Many identity providers refuse to render inside a frame. When the app is
//! framed, sign-in is attempted in a popup first and falls back to
//! navigating the outermost window. Outside a frame the current window is
//! redirected.
//!
//! | Context                      | Strategy                                     |
//! |------------------------------|----------------------------------------------|
//! | top-level window             | redirect `self`                              |
//! | framed, popup completes      | popup, no redirect                           |
//! | framed, popup unavailable    | redirect `top`                               |
//! | framed, other popup failure  | error propagated                             |

use crate::auth::error::{AuthError, SignInError};
use crate::auth::events::SessionEvent;
use crate::auth::manager::{SessionManager, SessionStatus};
use crate::auth::oidc::{ProviderError, RequestKind};
use crate::auth::Session;
use crate::host::{is_framed, HostEnvironment, RedirectTarget};

/// How a sign-in attempt ended.
#[derive(Clone, Debug, PartialEq)]
pub enum SignInOutcome {
    /// The popup flow completed and the session is stored.
    Completed(Session),
    /// The browser is navigating to the identity provider; the sign-in
    /// finishes in [`SessionManager::initialize`] on return.
    Redirecting(RedirectTarget),
}

/// Starts a sign-in using the strategy that fits the framing context.
///
/// # Errors
///
/// - [`AuthError::HostUnavailable`] without a host
/// - [`SignInError::EmbeddedLoginBlocked`] when framed, the popup is
///   unavailable and the top-level redirect cannot be built or started
/// - [`SignInError::RedirectFailed`] when the same-window redirect cannot be
///   built or started
/// - [`AuthError::Provider`] for any other popup or protocol failure
pub async fn sign_in_redirect(manager: &SessionManager) -> Result<SignInOutcome, AuthError> {
    let host = manager.host().ok_or(AuthError::HostUnavailable)?;
    manager.set_status(SessionStatus::SigningIn);

    let result = if is_framed(host) {
        sign_in_framed(manager, host).await
    } else {
        redirect(manager, host, RedirectTarget::SelfWindow, |source| {
            SignInError::RedirectFailed { source }
        })
        .await
    };

    if !matches!(result, Ok(SignInOutcome::Redirecting(_))) {
        manager.settle_status();
    }
    result
}

async fn sign_in_framed(
    manager: &SessionManager,
    host: &dyn HostEnvironment,
) -> Result<SignInOutcome, AuthError> {
    match sign_in_popup(manager, host).await {
        Ok(session) => Ok(SignInOutcome::Completed(session)),
        Err(error) if error.is_popup_unavailable() => {
            tracing::info!(%error, "popup sign-in unavailable, redirecting the top window");
            redirect(manager, host, RedirectTarget::Top, |source| {
                SignInError::EmbeddedLoginBlocked { source }
            })
            .await
        }
        Err(error) => Err(AuthError::Provider(error)),
    }
}

async fn sign_in_popup(
    manager: &SessionManager,
    host: &dyn HostEnvironment,
) -> Result<Session, ProviderError> {
    let oidc = manager.oidc();
    let request = oidc.create_signin_request(RequestKind::Popup).await?;
    let callback = host.open_popup(&request).await?;
    let session = oidc.process_signin_response(&callback).await?;
    manager.events().emit(SessionEvent::UserLoaded(session.clone()));
    Ok(session)
}

/// Builds a redirect request and navigates `target` to it. Any failure, in
/// building the request or in the navigation, is reported through
/// `on_failure`.
async fn redirect(
    manager: &SessionManager,
    host: &dyn HostEnvironment,
    target: RedirectTarget,
    on_failure: fn(ProviderError) -> SignInError,
) -> Result<SignInOutcome, AuthError> {
    let attempt = async {
        let request = manager
            .oidc()
            .create_signin_request(RequestKind::Redirect)
            .await?;
        tracing::debug!(%target, "redirecting to the identity provider");
        host.navigate(&request, target).await?;
        Ok::<_, ProviderError>(())
    };
    attempt.await.map_err(on_failure)?;
    Ok(SignInOutcome::Redirecting(target))
}
