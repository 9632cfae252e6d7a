//! Site addressing.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ShiftError, ShiftResult};

/// A site (web) on the platform, identified by its absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Site {
    url: Url,
}

impl Site {
    /// Parse an absolute site URL such as `https://contoso.example/sites/hr`.
    pub fn parse(url: &str) -> ShiftResult<Self> {
        let url = Url::parse(url.trim_end_matches('/'))
            .map_err(|e| ShiftError::invalid_config(format!("invalid site URL '{url}': {e}")))?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(ShiftError::invalid_config(format!(
                "site URL '{url}' has no host"
            )));
        }
        Ok(Self { url })
    }

    /// The absolute site URL without trailing slash.
    pub fn url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }

    /// Scheme and authority only, e.g. `https://contoso.example`.
    pub fn root_url(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// URL of a REST endpoint below `/_api/`.
    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}/_api/{}", self.url(), endpoint.trim_start_matches('/'))
    }

    /// Absolute URI of an object given its server-relative path.
    pub fn absolute_uri(&self, server_relative_path: &str) -> String {
        if server_relative_path.starts_with('/') {
            format!("{}{}", self.root_url(), server_relative_path)
        } else {
            format!("{}/{}", self.root_url(), server_relative_path)
        }
    }
}

impl TryFrom<String> for Site {
    type Error = ShiftError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Site> for String {
    fn from(site: Site) -> Self {
        site.url().to_string()
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url())
    }
}
