//! Profile records returned by `GET /me` and `GET /users/{username}`.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// The signed-in user as returned by `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Login handle.
    #[serde(default)]
    pub username: Option<String>,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Free-form biography.
    #[serde(default)]
    pub bio: Option<String>,
}

/// Display-ready profile. No field is ever absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Profile {
    /// Login handle, empty if the server sent none.
    pub username: String,
    /// `"first last"`.
    pub name: String,
    /// `"@username"`.
    pub login_name: String,
    /// Biography, empty if the server sent none.
    pub bio: String,
}

impl From<ProfileRecord> for Profile {
    fn from(record: ProfileRecord) -> Self {
        let username = record.username.unwrap_or_default();
        let name = format!(
            "{} {}",
            record.first_name.unwrap_or_default(),
            record.last_name.unwrap_or_default()
        );
        let login_name = format!("@{username}");
        Self {
            username,
            name,
            login_name,
            bio: record.bio.unwrap_or_default(),
        }
    }
}

/// Avatar renditions of a user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileImage {
    /// Small avatar URL.
    #[serde(default)]
    pub small: Option<String>,
    /// Medium avatar URL.
    #[serde(default)]
    pub medium: Option<String>,
    /// Large avatar URL.
    #[serde(default)]
    pub large: Option<String>,
}

/// A public user as returned by `GET /users/{username}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserRecord {
    /// Avatar renditions.
    #[serde(default)]
    pub profile_image: Option<ProfileImage>,
}

impl UserRecord {
    /// Returns the small avatar URL the client displays.
    pub fn small_avatar(&self) -> ProtocolResult<&str> {
        self.profile_image
            .as_ref()
            .and_then(|image| image.small.as_deref())
            .ok_or(ProtocolError::MissingField("profile_image.small"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_from_full_record() {
        let record: ProfileRecord = serde_json::from_str(
            r#"{"username":"ekaterina","first_name":"Ekaterina","last_name":"Novikova","bio":"Hello"}"#,
        )
        .unwrap();
        let profile = Profile::from(record);

        assert_eq!(profile.username, "ekaterina");
        assert_eq!(profile.name, "Ekaterina Novikova");
        assert_eq!(profile.login_name, "@ekaterina");
        assert_eq!(profile.bio, "Hello");
    }

    #[test]
    fn profile_defaults_blank_fields() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{"username":"solo","bio":null}"#).unwrap();
        let profile = Profile::from(record);

        assert_eq!(profile.name, " ");
        assert_eq!(profile.login_name, "@solo");
        assert_eq!(profile.bio, "");
    }

    #[test]
    fn small_avatar_present() {
        let user: UserRecord = serde_json::from_str(
            r#"{"profile_image":{"small":"https://a/s.jpg","medium":"https://a/m.jpg","large":"https://a/l.jpg"}}"#,
        )
        .unwrap();
        assert_eq!(user.small_avatar().unwrap(), "https://a/s.jpg");
    }

    #[test]
    fn small_avatar_missing() {
        let user: UserRecord = serde_json::from_str(r#"{"profile_image":{"large":"x"}}"#).unwrap();
        assert!(matches!(
            user.small_avatar(),
            Err(ProtocolError::MissingField(_))
        ));

        let bare: UserRecord = serde_json::from_str("{}").unwrap();
        assert!(bare.small_avatar().is_err());
    }
}
