//! Parsing of emailed links (verification and password reset).
//!
//! A link may be absolute (`https://app.example/reset-password#...`) or a
//! bare path (`/verify-email?token=...`). Parameters can sit in the query
//! string, the fragment, or both.

use std::collections::HashMap;

use url::Url;

use crate::session::Route;

/// Placeholder origin for resolving bare paths.
const LINK_BASE: &str = "http://localhost/";

/// Why an emailed link cannot be used.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    /// The text is not a URL or path.
    #[error("malformed link: {0}")]
    Malformed(#[from] url::ParseError),

    /// A verification link without a token or with the wrong type.
    #[error("Invalid verification link")]
    InvalidVerificationLink,

    /// A reset link lacking recovery tokens.
    #[error("reset link is missing its recovery tokens")]
    MissingResetTokens,
}

/// Route and parameters carried by a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParams {
    route: Route,
    query: HashMap<String, String>,
    fragment: HashMap<String, String>,
}

impl LinkParams {
    /// Parses a full URL or a path.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Malformed`] if `link` does not parse.
    pub fn parse(link: &str) -> Result<Self, LinkError> {
        let base = Url::parse(LINK_BASE)?;
        let url = Url::options().base_url(Some(&base)).parse(link.trim())?;

        let query = url.query_pairs().into_owned().collect();
        let fragment = url
            .fragment()
            .map(|f| url::form_urlencoded::parse(f.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Ok(Self {
            route: Route::parse(url.path()),
            query,
            fragment,
        })
    }

    /// Screen the link opens.
    #[must_use]
    pub const fn route(&self) -> &Route {
        &self.route
    }

    /// A query-string parameter.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// A parameter from the fragment, falling back to the query string.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.fragment
            .get(key)
            .or_else(|| self.query.get(key))
            .map(String::as_str)
    }
}
