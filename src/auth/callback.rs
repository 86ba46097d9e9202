//! Detection and removal of authorization-response parameters in a URL.
//!
//! Identity providers normally return to the redirect URI with the response
//! in the query string. Some provider and client-side router combinations
//! deliver it in the hash fragment instead, either as `#/route?code=...` or as
//! a bare `#code=...&state=...`. Both locations are checked.
//!
//! # Example
//!
//! ```rust
//! use synchive::auth::callback::{is_callback, scrub};
//! use url::Url;
//!
//! let location = Url::parse("https://app.example.com/?tab=settings&code=abc&state=xyz").unwrap();
//! assert!(is_callback(&location));
//!
//! let cleaned = scrub(&location);
//! assert_eq!(cleaned.as_str(), "https://app.example.com/?tab=settings");
//! assert!(!is_callback(&cleaned));
//! ```

use std::collections::HashMap;

use url::form_urlencoded;
use url::Url;

/// Parameters whose presence marks a URL as an authorization callback.
pub const DETECTED_PARAMS: [&str; 4] = ["code", "state", "error", "id_token"];

/// Parameters removed from the URL once a callback has been handled.
pub const SCRUBBED_PARAMS: [&str; 5] = ["code", "state", "session_state", "error", "error_description"];

/// Where parameters live inside a hash fragment.
#[derive(Debug, PartialEq, Eq)]
enum FragmentParams<'a> {
    /// `#{route}?{params}`.
    Routed { route: &'a str, params: &'a str },
    /// `#{params}`.
    Bare(&'a str),
}

fn fragment_params(fragment: &str) -> Option<FragmentParams<'_>> {
    if let Some((route, params)) = fragment.split_once('?') {
        return Some(FragmentParams::Routed { route, params });
    }
    if fragment.contains("code=") || fragment.contains("state=") {
        return Some(FragmentParams::Bare(fragment));
    }
    None
}

impl<'a> FragmentParams<'a> {
    fn params(&self) -> &'a str {
        match *self {
            Self::Routed { params, .. } | Self::Bare(params) => params,
        }
    }
}

fn contains_any(params: &str, names: &[&str]) -> bool {
    form_urlencoded::parse(params.as_bytes()).any(|(key, _)| names.contains(&key.as_ref()))
}

/// Returns `true` if `location` carries authorization-response parameters in
/// its query string or, failing that, in its hash fragment.
#[must_use]
pub fn is_callback(location: &Url) -> bool {
    if location
        .query()
        .is_some_and(|query| contains_any(query, &DETECTED_PARAMS))
    {
        return true;
    }
    location
        .fragment()
        .and_then(fragment_params)
        .is_some_and(|fragment| contains_any(fragment.params(), &DETECTED_PARAMS))
}

/// Returns the authorization-response parameters of `location`.
///
/// Query parameters are used when they contain a response; otherwise the
/// hash fragment's parameters are used.
#[must_use]
pub fn callback_params(location: &Url) -> HashMap<String, String> {
    let raw = match location.query() {
        Some(query) if contains_any(query, &DETECTED_PARAMS) => Some(query),
        _ => location
            .fragment()
            .and_then(fragment_params)
            .map(|fragment| fragment.params()),
    };
    raw.map(|params| form_urlencoded::parse(params.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Removes scrubbed parameters from a raw `a=b&c=d` string, keeping every
/// other segment byte-for-byte, empty ones included. Returns an empty string
/// when only empty segments remain.
fn strip_params(raw: &str) -> String {
    let kept: Vec<&str> = raw
        .split('&')
        .filter(|segment| {
            let key = form_urlencoded::parse(segment.as_bytes())
                .next()
                .map(|(key, _)| key.into_owned())
                .unwrap_or_default();
            !SCRUBBED_PARAMS.contains(&key.as_str())
        })
        .collect();
    if kept.iter().all(|segment| segment.is_empty()) {
        return String::new();
    }
    kept.join("&")
}

/// Returns `location` with the authorization-response parameters removed
/// from its query string and hash fragment.
///
/// Unrelated query parameters, the fragment's route prefix, and its other
/// parameters are preserved verbatim.
#[must_use]
pub fn scrub(location: &Url) -> Url {
    let mut url = location.clone();

    if let Some(query) = location.query() {
        let kept = strip_params(query);
        url.set_query(if kept.is_empty() { None } else { Some(&kept) });
    }

    if let Some(fragment) = location.fragment().and_then(fragment_params) {
        let rebuilt = match fragment {
            FragmentParams::Routed { route, params } => {
                let kept = strip_params(params);
                if kept.is_empty() {
                    route.to_string()
                } else {
                    format!("{route}?{kept}")
                }
            }
            FragmentParams::Bare(params) => strip_params(params),
        };
        url.set_fragment(if rebuilt.is_empty() {
            None
        } else {
            Some(&rebuilt)
        });
    }

    url
}
