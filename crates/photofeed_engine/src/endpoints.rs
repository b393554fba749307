//! Request builders for every API call the services make.

use crate::error::{FeedError, FeedResult};
use crate::http::{HttpRequest, Method};
use url::Url;

/// Validated API endpoints. Produced by [`FeedConfig::validate`](crate::FeedConfig::validate).
#[derive(Debug, Clone)]
pub struct Endpoints {
    api_base: Url,
    auth_base: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl Endpoints {
    pub(crate) fn new(
        api_base: Url,
        auth_base: Url,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            api_base,
            auth_base,
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// `GET {base}/photos?page={page}`
    pub fn photos_page(&self, credential: &str, page: u32) -> FeedResult<HttpRequest> {
        let mut url = join(&self.api_base, &["photos"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string());
        Ok(HttpRequest::new(Method::Get, url).with_bearer(credential))
    }

    /// `POST {base}/photos/{id}/like` to like, `DELETE` to unlike.
    pub fn like(&self, credential: &str, photo_id: &str, like: bool) -> FeedResult<HttpRequest> {
        let url = join(&self.api_base, &["photos", photo_id, "like"])?;
        let method = if like { Method::Post } else { Method::Delete };
        Ok(HttpRequest::new(method, url).with_bearer(credential))
    }

    /// `GET {base}/me`
    pub fn me(&self, credential: &str) -> FeedResult<HttpRequest> {
        let url = join(&self.api_base, &["me"])?;
        Ok(HttpRequest::new(Method::Get, url).with_bearer(credential))
    }

    /// `GET {base}/users/{username}`
    pub fn user(&self, credential: &str, username: &str) -> FeedResult<HttpRequest> {
        let url = join(&self.api_base, &["users", username])?;
        Ok(HttpRequest::new(Method::Get, url).with_bearer(credential))
    }

    /// `POST {auth}/oauth/token?client_id=..&client_secret=..&redirect_uri=..&code=..&grant_type=authorization_code`
    pub fn token_exchange(&self, code: &str) -> FeedResult<HttpRequest> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(FeedError::config(
                "access key and secret key are required for token exchange",
            ));
        }
        let mut url = join(&self.auth_base, &["oauth", "token"])?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("code", code)
            .append_pair("grant_type", "authorization_code");
        Ok(HttpRequest::new(Method::Post, url))
    }
}

/// Appends percent-encoded path segments to a base URL.
fn join(base: &Url, segments: &[&str]) -> FeedResult<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| FeedError::config(format!("{base} cannot be a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedConfig;

    fn endpoints(api: &str) -> Endpoints {
        FeedConfig::new("id", "secret")
            .with_api_base_url(api)
            .validate()
            .unwrap()
    }

    #[test]
    fn photos_page_request() {
        let req = endpoints("https://api.test").photos_page("tok", 3).unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.url.as_str(), "https://api.test/photos?page=3");
        assert_eq!(req.header("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn base_path_is_kept() {
        let req = endpoints("https://api.test/v1/").me("tok").unwrap();
        assert_eq!(req.url.as_str(), "https://api.test/v1/me");

        let req = endpoints("https://api.test/v1").user("tok", "jo").unwrap();
        assert_eq!(req.url.as_str(), "https://api.test/v1/users/jo");
    }

    #[test]
    fn like_method_follows_target_state() {
        let ep = endpoints("https://api.test");
        let like = ep.like("tok", "abc", true).unwrap();
        let unlike = ep.like("tok", "abc", false).unwrap();

        assert_eq!(like.method, Method::Post);
        assert_eq!(unlike.method, Method::Delete);
        assert_eq!(like.url.path(), "/photos/abc/like");
        assert_eq!(unlike.url, like.url);
    }

    #[test]
    fn ids_are_percent_encoded() {
        let req = endpoints("https://api.test").like("tok", "a/b c", true).unwrap();
        assert_eq!(req.url.path(), "/photos/a%2Fb%20c/like");
    }

    #[test]
    fn token_exchange_request() {
        let req = endpoints("https://api.test").token_exchange("the-code").unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url.host_str(), Some("unsplash.com"));
        assert_eq!(req.url.path(), "/oauth/token");
        assert_eq!(req.query("code").as_deref(), Some("the-code"));
        assert_eq!(req.query("client_id").as_deref(), Some("id"));
        assert_eq!(req.query("client_secret").as_deref(), Some("secret"));
        assert_eq!(
            req.query("grant_type").as_deref(),
            Some("authorization_code")
        );
        assert!(req.header("Authorization").is_none());
    }

    #[test]
    fn token_exchange_requires_keys() {
        let ep = FeedConfig::default().validate().unwrap();
        assert!(matches!(ep.token_exchange("c"), Err(FeedError::Config(_))));
    }
}
