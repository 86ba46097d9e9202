//! Session lifecycle events.
//!
//! The session manager publishes every lifecycle transition on one
//! broadcast channel as a [`SessionEvent`]. Consumers subscribe once and
//! dispatch on the variant.

use tokio::sync::broadcast;

use crate::auth::Session;

/// Capacity of the lifecycle channel. Slow receivers skip older events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A session lifecycle transition.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A session was loaded or renewed.
    UserLoaded(Session),
    /// The local session was removed.
    UserUnloaded,
    /// The user signed out at the identity provider.
    UserSignedOut,
    /// The stored access token was found to be expired.
    AccessTokenExpired,
    /// Silent renewal failed; carries the failure message.
    SilentRenewError(String),
}

impl SessionEvent {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserLoaded(_) => "user_loaded",
            Self::UserUnloaded => "user_unloaded",
            Self::UserSignedOut => "user_signed_out",
            Self::AccessTokenExpired => "access_token_expired",
            Self::SilentRenewError(_) => "silent_renew_error",
        }
    }
}

/// The sending half of the lifecycle channel.
#[derive(Clone, Debug)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    /// Creates a channel with no receivers.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publishes an event. Events published with no receivers are dropped.
    pub fn emit(&self, event: SessionEvent) {
        tracing::debug!(event = event.name(), "session event");
        let _ = self.sender.send(event);
    }

    /// Returns a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
