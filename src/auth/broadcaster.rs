//! Authentication state broadcasting.
//!
//! [`AuthStateBroadcaster::subscribe`] turns the session manager's lifecycle
//! events into [`AuthState`] snapshots for one listener:
//!
//! - an initial replay of the current state, delivered asynchronously after
//!   `subscribe` returns;
//! - one emission per lifecycle event. `UserLoaded` carries its session
//!   directly; every other event re-reads the stored session first.
//!
//! Events are not buffered or coalesced. When events race, the emission
//! reflects whichever session read happened last.
//!
//! Listeners run on the tokio runtime, so `subscribe` must be called from
//! within one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::auth::events::SessionEvent;
use crate::auth::manager::SessionManager;
use crate::auth::{AuthState, AuthStateChangeTrigger, Session};

/// Delivers [`AuthState`] changes to listeners.
#[derive(Clone, Debug)]
pub struct AuthStateBroadcaster {
    manager: Arc<SessionManager>,
}

impl AuthStateBroadcaster {
    /// Creates a broadcaster over `manager`'s lifecycle events.
    #[must_use]
    pub const fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Registers `listener` and schedules the initial replay.
    ///
    /// The returned [`Subscription`] stops delivery when unsubscribed or
    /// dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(AuthState, AuthStateChangeTrigger) + Send + Sync + 'static,
    {
        let emitter = Arc::new(Emitter {
            listener,
            unsubscribed: Arc::new(AtomicBool::new(false)),
        });
        let unsubscribed = Arc::clone(&emitter.unsubscribed);

        // Subscribe before scheduling the replay so no event falls between.
        let mut events = self.manager.subscribe();

        let replay = {
            let manager = Arc::clone(&self.manager);
            let emitter = Arc::clone(&emitter);
            tokio::spawn(async move { emitter.refetch_and_emit(&manager) })
        };

        let dispatch = {
            let manager = Arc::clone(&self.manager);
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(SessionEvent::UserLoaded(session)) => emitter.emit(Some(session)),
                        Ok(
                            SessionEvent::UserUnloaded
                            | SessionEvent::UserSignedOut
                            | SessionEvent::AccessTokenExpired
                            | SessionEvent::SilentRenewError(_),
                        ) => emitter.refetch_and_emit(&manager),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "auth state listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                    if emitter.is_unsubscribed() {
                        break;
                    }
                }
            })
        };

        Subscription {
            unsubscribed,
            tasks: Mutex::new(vec![replay, dispatch]),
        }
    }
}

struct Emitter<F> {
    listener: F,
    unsubscribed: Arc<AtomicBool>,
}

impl<F> Emitter<F>
where
    F: Fn(AuthState, AuthStateChangeTrigger),
{
    fn is_unsubscribed(&self) -> bool {
        self.unsubscribed.load(Ordering::SeqCst)
    }

    fn emit(&self, user: Option<Session>) {
        if self.is_unsubscribed() {
            return;
        }
        let state = AuthState::from_session(user);
        let trigger = state.trigger();
        (self.listener)(state, trigger);
    }

    fn refetch_and_emit(&self, manager: &SessionManager) {
        if self.is_unsubscribed() {
            return;
        }
        match manager.user() {
            Ok(user) => self.emit(user),
            Err(error) => tracing::warn!(%error, "failed to read session for auth state"),
        }
    }
}

/// A registered auth state listener.
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    unsubscribed: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Subscription {
    /// Stops delivery. Emissions already in progress observe the flag and
    /// are suppressed. Calling this more than once has no further effect.
    pub fn unsubscribe(&self) {
        if self.unsubscribed.swap(true, Ordering::SeqCst) {
            return;
        }
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            task.abort();
        }
    }

    /// Returns `true` once [`Subscription::unsubscribe`] has been called.
    #[must_use]
    pub fn is_unsubscribed(&self) -> bool {
        self.unsubscribed.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
