//! # SyncHive Client
//!
//! A Rust client for SyncHive apps, providing OpenID Connect sign-in that
//! works whether the app runs top-level or embedded in a frame, session
//! renewal, auth state subscriptions, and authenticated CRUD access to
//! SyncHive shapes.
//!
//! ## Overview
//!
//! This crate provides:
//! - Configuration via [`SynchiveConfig`] and [`SynchiveConfigBuilder`]
//! - Publishable key decoding with [`PublishableKey`]
//! - Sign-in by redirect, popup, or popup-then-redirect when framed
//! - Callback completion and URL scrubbing on page load
//! - Session renewal by refresh token or silent sign-in via [`SessionManager`]
//! - [`AuthState`] subscriptions with initial replay
//! - Authenticated shape requests via [`clients::ShapeClient`]
//!
//! The platform (location, frames, popups, storage) is reached through a
//! [`host::HostEnvironment`] supplied by the embedding application.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use synchive::host::MemoryStore;
//! use synchive::{OidcSettings, SynchiveConfig};
//!
//! let config = SynchiveConfig::builder()
//!     .auth(OidcSettings::new(
//!         "https://id.example.com/",
//!         "my-client",
//!         "https://app.example.com/callback",
//!     ))
//!     .base_url("https://apis.dev.synchive.com/v1/shape")
//!     .storage(Arc::new(MemoryStore::new()))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.base_url(), "https://apis.dev.synchive.com/v1/shape");
//! ```
//!
//! ## Publishable Keys
//!
//! A publishable key encodes the tenant key and environment. Everything else
//! is derived from it:
//!
//! ```rust
//! use synchive::PublishableKey;
//!
//! // base64("abc123::dev")
//! let decoded = PublishableKey::decode("sh_publishable_YWJjMTIzOjpkZXY=").unwrap();
//! assert_eq!(decoded.environment, "dev");
//! assert_eq!(decoded.authority(), "https://apis.dev.synchive.com/v1/auth/");
//! assert_eq!(decoded.api_base_url(), "https://apis.dev.synchive.com/v1/shape");
//! ```
//!
//! ## Signing In
//!
//! ```rust,ignore
//! use synchive::{SynchiveClient, SynchiveConfig};
//! use synchive::auth::{AuthError, SignInOutcome};
//!
//! let client = SynchiveClient::new(
//!     SynchiveConfig::builder()
//!         .publishable_key("sh_publishable_...")
//!         .host(browser_host)
//!         .build()?,
//! );
//!
//! // Completes any pending callback and cleans the URL
//! client.initialize().await?;
//!
//! let _subscription = client.subscribe(|state, trigger| {
//!     render(state.user.as_ref(), trigger);
//! });
//!
//! if let Err(AuthError::Unauthenticated) = client.ensure_valid_session().await {
//!     match client.sign_in_redirect().await? {
//!         SignInOutcome::Completed(session) => println!("signed in via popup"),
//!         SignInOutcome::Redirecting(target) => println!("navigating {target}"),
//!     }
//! }
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: Keys and settings are validated on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Designed for use with Tokio async runtime
//! - **Injected host**: No browser globals, only [`host::HostEnvironment`]

pub mod auth;
pub mod client;
pub mod clients;
pub mod config;
pub mod error;
pub mod host;

// Re-export public types at crate root for convenience
pub use auth::{
    AuthError, AuthState, AuthStateChangeTrigger, Session, SessionManager, SignInError,
    SignInOutcome, Subscription,
};
pub use client::SynchiveClient;
pub use config::{
    DecodedPublishableKey, OidcOverrides, OidcSettings, PublishableKey, SynchiveConfig,
    SynchiveConfigBuilder,
};
pub use error::{ConfigError, CredentialFormatError};

// Re-export data client types
pub use clients::{
    HttpMethod, HttpRequest, HttpRequestBuilder, RequestError, ShapeClient, ShapeError,
};
