//! OAuth token response.

use serde::{Deserialize, Serialize};

/// Body of a successful `POST /oauth/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Bearer credential for subsequent API calls.
    pub access_token: String,
    /// Token type, normally `"bearer"`.
    pub token_type: String,
    /// Space-separated granted scopes.
    pub scope: String,
    /// Issue time in seconds since the Unix epoch.
    pub created_at: i64,
}

impl AccessToken {
    /// Returns the granted scopes.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_token_body() {
        let token: AccessToken = serde_json::from_str(
            r#"{"access_token":"abc123","token_type":"bearer","scope":"public read_user write_likes","created_at":1436544465}"#,
        )
        .unwrap();

        assert_eq!(token.access_token, "abc123");
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.created_at, 1_436_544_465);
        assert_eq!(
            token.scopes().collect::<Vec<_>>(),
            ["public", "read_user", "write_likes"]
        );
    }

    #[test]
    fn missing_access_token_fails() {
        let result: Result<AccessToken, _> =
            serde_json::from_str(r#"{"token_type":"bearer","scope":"","created_at":0}"#);
        assert!(result.is_err());
    }
}
