//! Host environment capabilities.
//!
//! The client never touches browser globals directly. Everything it needs
//! from the surrounding platform (the current location, in-place history
//! replacement, frame and opener introspection, navigation, popups, silent
//! frames and storage) is reached through a [`HostEnvironment`] passed in at
//! construction. A missing host is how "not running in a browser" shows up.
//!
//! # Overview
//!
//! - [`HostEnvironment`]: the capability bundle
//! - [`RedirectTarget`]: which window a full-page redirect navigates
//! - [`HostError`] / [`FrameAccessError`]: capability failures
//! - [`KeyValueStore`], [`MemoryStore`], [`NamespacedStore`]: session storage

mod storage;

pub use storage::{KeyValueStore, MemoryStore, NamespacedStore, StorageError};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Which window a full-page redirect should navigate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RedirectTarget {
    /// The current window.
    SelfWindow,
    /// The outermost window when running inside frames.
    Top,
}

impl RedirectTarget {
    /// Returns the conventional name of the target (`"self"` or `"top"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SelfWindow => "self",
            Self::Top => "top",
        }
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when comparing the current window with the top window is blocked
/// by the same-origin policy.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Blocked a frame from accessing a cross-origin frame")]
pub struct FrameAccessError;

/// Errors reported by host navigation and window capabilities.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The popup window could not be opened.
    #[error("Popup window was blocked")]
    PopupBlocked,

    /// The user closed the popup before the flow completed.
    #[error("Popup window closed")]
    PopupClosed,

    /// A navigation request was refused.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Any other host failure, described by its message.
    #[error("{0}")]
    Other(String),
}

/// The platform capabilities the client relies on.
///
/// Implementations wrap a real browser window (for example through a WASM
/// binding layer) or simulate one in tests.
#[async_trait]
pub trait HostEnvironment: Send + Sync + fmt::Debug {
    /// Returns the current location, including query and fragment.
    fn location(&self) -> Url;

    /// Replaces the current location without adding a history entry.
    fn replace_location(&self, url: &Url);

    /// Returns whether this window is the top-level window.
    ///
    /// # Errors
    ///
    /// Returns [`FrameAccessError`] when the comparison is blocked because
    /// the top window belongs to another origin.
    fn is_top_level(&self) -> Result<bool, FrameAccessError>;

    /// Returns whether this window was opened by another window.
    fn has_opener(&self) -> bool;

    /// Returns the current origin (`scheme://host[:port]`).
    fn origin(&self) -> String {
        self.location().origin().ascii_serialization()
    }

    /// Returns the platform's persistent store, if it has one.
    fn storage(&self) -> Option<Arc<dyn KeyValueStore>> {
        None
    }

    /// Navigates `target` to `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the navigation is refused.
    async fn navigate(&self, url: &Url, target: RedirectTarget) -> Result<(), HostError>;

    /// Opens `url` in a popup window and resolves with the URL the popup was
    /// redirected back to once it hands control back to this window.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::PopupBlocked`] or [`HostError::PopupClosed`]
    /// when the popup cannot complete.
    async fn open_popup(&self, url: &Url) -> Result<Url, HostError>;

    /// Loads `url` in a hidden frame and resolves with the URL the frame was
    /// redirected back to. Used for `prompt=none` silent sign-in.
    ///
    /// Hosts without hidden frames keep the default, which always fails.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the frame cannot be loaded or never
    /// returns.
    async fn silent_frame(&self, url: &Url) -> Result<Url, HostError> {
        let _ = url;
        Err(HostError::Other(
            "Silent sign-in is not supported by this host".to_string(),
        ))
    }

    /// Hands a callback URL received in a popup or silent frame to the
    /// window that opened or embeds it.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if there is no such window to notify.
    fn notify_opener(&self, url: &Url) -> Result<(), HostError>;

    /// Closes the current window.
    fn close_window(&self);
}

/// Returns whether the host is framed inside another page.
///
/// A blocked cross-origin comparison counts as framed.
pub fn is_framed(host: &dyn HostEnvironment) -> bool {
    host.is_top_level().map_or(true, |top| !top)
}
