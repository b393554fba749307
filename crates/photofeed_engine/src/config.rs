//! Configuration for the feed services.

use crate::endpoints::Endpoints;
use crate::error::{FeedError, FeedResult};
use std::time::Duration;
use url::Url;

/// Default API host.
pub const DEFAULT_API_BASE_URL: &str = "https://api.unsplash.com";

/// Default host serving `/oauth/token`.
pub const DEFAULT_AUTH_BASE_URL: &str = "https://unsplash.com";

/// Default browser authorization page.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://unsplash.com/oauth/authorize";

/// Out-of-band redirect used by native clients.
pub const DEFAULT_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Scopes needed to read the feed and toggle likes.
pub const DEFAULT_ACCESS_SCOPE: &str = "public read_user write_likes";

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the feed services.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL of the photo API.
    pub api_base_url: String,
    /// Base URL of the host serving `/oauth/token`.
    pub auth_base_url: String,
    /// Browser authorization page.
    pub authorize_url: String,
    /// OAuth client id.
    pub access_key: String,
    /// OAuth client secret.
    pub secret_key: String,
    /// OAuth redirect URI.
    pub redirect_uri: String,
    /// Space-separated OAuth scopes.
    pub access_scope: String,
    /// Upper bound on a single request, including the body.
    pub request_timeout: Duration,
}

impl FeedConfig {
    /// Creates a configuration for the default hosts.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            auth_base_url: DEFAULT_AUTH_BASE_URL.into(),
            authorize_url: DEFAULT_AUTHORIZE_URL.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.into(),
            access_scope: DEFAULT_ACCESS_SCOPE.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the API base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets the auth base URL.
    pub fn with_auth_base_url(mut self, url: impl Into<String>) -> Self {
        self.auth_base_url = url.into();
        self
    }

    /// Sets the browser authorization URL.
    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    /// Sets the redirect URI.
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_access_scope(mut self, scope: impl Into<String>) -> Self {
        self.access_scope = scope.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Checks every URL and bound, returning the resolved endpoints.
    ///
    /// Called once when services are built so that a malformed URL is a
    /// construction error rather than a failure on first use.
    pub fn validate(&self) -> FeedResult<Endpoints> {
        if self.request_timeout.is_zero() {
            return Err(FeedError::config("request timeout must be non-zero"));
        }
        let api_base = parse_base("api_base_url", &self.api_base_url)?;
        let auth_base = parse_base("auth_base_url", &self.auth_base_url)?;
        parse_base("authorize_url", &self.authorize_url)?;
        Ok(Endpoints::new(
            api_base,
            auth_base,
            self.access_key.clone(),
            self.secret_key.clone(),
            self.redirect_uri.clone(),
        ))
    }

    /// Builds the page the user opens in a browser to grant access.
    pub fn authorize_url(&self) -> FeedResult<Url> {
        if self.access_key.is_empty() {
            return Err(FeedError::config("access key is required"));
        }
        let mut url = parse_base("authorize_url", &self.authorize_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.access_key)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.access_scope);
        Ok(url)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::new("", "")
    }
}

fn parse_base(field: &str, raw: &str) -> FeedResult<Url> {
    let url = Url::parse(raw).map_err(|e| FeedError::config(format!("{field}: {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(FeedError::config(format!(
            "{field}: {raw} is not an http(s) base url"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_config_builder() {
        let config = FeedConfig::new("key", "secret")
            .with_api_base_url("http://127.0.0.1:9000/v1")
            .with_request_timeout(Duration::from_secs(5));

        assert_eq!(config.access_key, "key");
        assert_eq!(config.secret_key, "secret");
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000/v1");
        assert_eq!(config.auth_base_url, DEFAULT_AUTH_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn default_config_validates() {
        assert!(FeedConfig::default().validate().is_ok());
    }

    #[test]
    fn malformed_url_rejected() {
        let err = FeedConfig::default()
            .with_api_base_url("not a url")
            .validate()
            .unwrap_err();
        assert!(matches!(err, FeedError::Config(ref m) if m.starts_with("api_base_url")));

        let err = FeedConfig::default()
            .with_auth_base_url("mailto:someone@example.com")
            .validate()
            .unwrap_err();
        assert!(matches!(err, FeedError::Config(_)));
    }

    #[test]
    fn zero_timeout_rejected() {
        let result = FeedConfig::default()
            .with_request_timeout(Duration::ZERO)
            .validate();
        assert!(matches!(result, Err(FeedError::Config(_))));
    }

    #[test]
    fn authorize_url_query() {
        let url = FeedConfig::new("client-1", "s").authorize_url().unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(url.path(), "/oauth/authorize");
        assert!(pairs.contains(&("client_id".into(), "client-1".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("redirect_uri".into(), DEFAULT_REDIRECT_URI.into())));
        assert!(pairs.contains(&("scope".into(), DEFAULT_ACCESS_SCOPE.into())));
    }

    #[test]
    fn authorize_url_requires_key() {
        assert!(FeedConfig::default().authorize_url().is_err());
    }
}
