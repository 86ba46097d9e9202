//! The SyncHive data client.
//!
//! This module provides CRUD access to "shapes" (resource types) on the
//! SyncHive API. Every request is authenticated with the current session's
//! access token.
//!
//! # Overview
//!
//! - [`ShapeClient`]: list, get, create and update records of a shape
//! - [`HttpRequest`]: a request for custom calls through [`ShapeClient::request`]
//! - [`HttpMethod`]: supported HTTP methods (GET, POST, PUT, DELETE)
//! - [`ShapeUrlBuilder`]: how operation URLs are built, with [`DefaultUrlBuilder`]
//! - [`ShapeError`] / [`RequestError`]: request failures
//!
//! # Response Handling
//!
//! - **2xx**: the body is parsed as JSON
//! - **204 No Content**: [`serde_json::Value::Null`]
//! - **Anything else**: [`RequestError`] with the status and body text
//!
//! Requests are sent once; there is no automatic retry.

mod errors;
mod http_request;
mod shape_client;
mod url_builder;

pub use errors::{InvalidHttpRequestError, RequestError, ShapeError};
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder};
pub use shape_client::ShapeClient;
pub use url_builder::{DefaultUrlBuilder, ShapeUrlBuilder};
