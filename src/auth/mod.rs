//! Authentication for SyncHive clients.
//!
//! This module owns the signed-in user's session and everything that moves
//! it between states: completing callbacks from the identity provider,
//! choosing a sign-in strategy, renewing expired sessions, signing out, and
//! broadcasting the resulting [`AuthState`] to listeners.
//!
//! # Overview
//!
//! - [`Session`]: the authoritative record of the signed-in user
//! - [`AuthState`] / [`AuthStateChangeTrigger`]: derived state for listeners
//! - [`SessionManager`]: the session state machine
//! - [`sign_in_redirect`]: redirect, popup, or popup-then-redirect sign-in
//! - [`AuthStateBroadcaster`]: listener registration with initial replay
//! - [`callback`]: detecting and scrubbing authorization responses in a URL
//! - [`oidc`]: the OpenID Connect protocol engine
//!
//! # Example
//!
//! ```rust,ignore
//! use synchive::auth::{sign_in_redirect, AuthError};
//!
//! manager.initialize().await?;
//! match manager.ensure_valid_session().await {
//!     Ok(session) => println!("signed in as {:?}", session.subject()),
//!     Err(AuthError::Unauthenticated) => {
//!         sign_in_redirect(&manager).await?;
//!     }
//!     Err(e) => return Err(e.into()),
//! }
//! ```

mod broadcaster;
pub mod callback;
mod error;
mod events;
mod manager;
pub mod oidc;
pub mod session;
mod sign_in;
mod state;

pub use broadcaster::{AuthStateBroadcaster, Subscription};
pub use error::{AuthError, SignInError};
pub use events::{SessionEvent, SessionEvents};
pub use manager::{SessionManager, SessionStatus};
pub use session::Session;
pub use sign_in::{sign_in_redirect, SignInOutcome};
pub use state::{AuthState, AuthStateChangeTrigger};
