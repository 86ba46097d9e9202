//! Error types for the shape data client.
//!
//! # Error Handling
//!
//! - [`RequestError`]: non-2xx responses, carrying the status and body text
//! - [`InvalidHttpRequestError`]: a request failed validation before sending
//! - [`ShapeError`]: unified error for every data-client call
//!
//! # Example
//!
//! ```rust,ignore
//! use synchive::clients::ShapeError;
//! use synchive::auth::AuthError;
//!
//! match client.list("tasks", None).await {
//!     Ok(tasks) => println!("{tasks}"),
//!     Err(ShapeError::Auth(AuthError::Unauthenticated)) => client.sign_in_redirect().await?,
//!     Err(ShapeError::Request(e)) => println!("API error {}: {}", e.status, e.body),
//!     Err(e) => println!("{e}"),
//! }
//! ```

use thiserror::Error;

use crate::auth::AuthError;

/// Error returned when the API answers with a non-2xx status.
///
/// # Example
///
/// ```rust
/// use synchive::clients::RequestError;
///
/// let error = RequestError {
///     status: 404,
///     body: r#"{"error":"Not found"}"#.to_string(),
/// };
/// assert!(error.to_string().contains("404"));
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Request failed with status {status}: {body}")]
pub struct RequestError {
    /// The HTTP status code of the response.
    pub status: u16,
    /// The response body text.
    pub body: String,
}

/// Error returned when a request fails validation before it is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A POST or PUT request was built without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// The request URL could not be parsed.
    #[error("Invalid request URL '{url}'")]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
    },
}

/// Unified error type for shape data requests.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// No valid session was available for the request.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The API returned a non-2xx response.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx response body was not valid JSON.
    #[error("Failed to parse response body: {0}")]
    Json(#[from] serde_json::Error),
}

// Verify ShapeError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShapeError>();
};
