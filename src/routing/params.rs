//! Per-request routing context handed to handlers via request extensions.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::Uri;

/// The logical path a request was dispatched under plus its parameter set.
///
/// Query-string pairs come first; template bindings are layered on top and win
/// on a name clash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    path: String,
    params: HashMap<String, String>,
}

impl RouteParams {
    pub fn new(path: impl Into<String>, params: HashMap<String, String>) -> Self {
        Self {
            path: path.into(),
            params,
        }
    }

    /// Build from a URI's path and query string.
    pub fn from_uri(uri: &Uri) -> Self {
        let params = Query::<HashMap<String, String>>::try_from_uri(uri)
            .map(|Query(params)| params)
            .unwrap_or_default();
        Self::new(uri.path(), params)
    }

    /// Rewrite the logical path and merge in template bindings.
    pub fn bind(&mut self, path: &str, bindings: HashMap<String, String>) {
        self.path = path.to_string();
        self.params.extend(bindings);
    }

    /// Logical path; the template path when one matched.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
