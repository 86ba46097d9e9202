//! Derived authentication state delivered to subscribers.

use std::fmt;

use crate::auth::Session;

/// Why an [`AuthState`] was emitted.
///
/// The trigger is computed from the state itself, not from the lifecycle
/// event that caused the emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthStateChangeTrigger {
    /// A non-expired session exists.
    Authenticated,
    /// There is no session, or it has expired.
    Unauthenticated,
}

impl fmt::Display for AuthStateChangeTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated => f.write_str("authenticated"),
            Self::Unauthenticated => f.write_str("unauthenticated"),
        }
    }
}

/// An immutable snapshot of the authentication state.
///
/// # Example
///
/// ```rust
/// use synchive::{AuthState, AuthStateChangeTrigger, Session};
///
/// let state = AuthState::from_session(Some(Session::new("token", None)));
/// assert!(state.is_authenticated);
/// assert_eq!(state.trigger(), AuthStateChangeTrigger::Authenticated);
///
/// let state = AuthState::from_session(None);
/// assert!(!state.is_authenticated);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AuthState {
    /// The current session, if any (possibly expired).
    pub user: Option<Session>,
    /// Whether a non-expired session exists.
    pub is_authenticated: bool,
}

impl AuthState {
    /// Derives the state for an optional session.
    #[must_use]
    pub fn from_session(user: Option<Session>) -> Self {
        let is_authenticated = user.as_ref().is_some_and(|session| !session.expired());
        Self {
            user,
            is_authenticated,
        }
    }

    /// Returns the trigger that accompanies this state.
    #[must_use]
    pub const fn trigger(&self) -> AuthStateChangeTrigger {
        if self.is_authenticated {
            AuthStateChangeTrigger::Authenticated
        } else {
            AuthStateChangeTrigger::Unauthenticated
        }
    }
}
