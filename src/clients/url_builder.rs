//! URL construction for shape requests.

use std::fmt;

/// Builds the URLs of the four shape operations.
///
/// Every method has a default; implement only the ones that differ for
/// your backend and pass the builder to
/// [`SynchiveConfigBuilder::url_builder`](crate::config::SynchiveConfigBuilder::url_builder).
///
/// # Example
///
/// ```rust
/// use synchive::clients::ShapeUrlBuilder;
///
/// #[derive(Debug)]
/// struct Versioned;
///
/// impl ShapeUrlBuilder for Versioned {
///     fn list(&self, base: &str, shape: &str) -> String {
///         format!("{base}/{shape}?version=2")
///     }
/// }
///
/// assert_eq!(Versioned.list("https://api", "tasks"), "https://api/tasks?version=2");
/// assert_eq!(Versioned.get("https://api", "tasks", "7"), "https://api/tasks/7");
/// ```
pub trait ShapeUrlBuilder: Send + Sync + fmt::Debug {
    /// URL for listing records of `shape`.
    fn list(&self, base: &str, shape: &str) -> String {
        format!("{}/{}", trim(base), urlencoding::encode(shape))
    }

    /// URL for fetching record `id` of `shape`.
    fn get(&self, base: &str, shape: &str, id: &str) -> String {
        format!(
            "{}/{}/{}",
            trim(base),
            urlencoding::encode(shape),
            urlencoding::encode(id)
        )
    }

    /// URL for creating a record of `shape`.
    fn create(&self, base: &str, shape: &str) -> String {
        self.list(base, shape)
    }

    /// URL for updating record `id` of `shape`.
    fn update(&self, base: &str, shape: &str, id: &str) -> String {
        self.get(base, shape, id)
    }
}

fn trim(base: &str) -> &str {
    base.trim_end_matches('/')
}

/// The default URL layout: `{base}/{shape}` and `{base}/{shape}/{id}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultUrlBuilder;

impl ShapeUrlBuilder for DefaultUrlBuilder {}
