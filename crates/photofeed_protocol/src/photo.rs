//! Photo records and the client-side photo model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pixel dimensions of a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Creates a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height, or `None` for a degenerate size.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height == 0 {
            None
        } else {
            Some(f64::from(self.width) / f64::from(self.height))
        }
    }
}

/// Image URLs attached to a photo record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhotoUrls {
    /// Small thumbnail rendition.
    #[serde(default)]
    pub thumb: String,
    /// Full-resolution rendition.
    #[serde(default)]
    pub full: String,
}

/// A photo as returned by `GET /photos`.
///
/// Every field except `id` tolerates being absent so that one sparse record
/// does not fail the whole page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Server-assigned identifier.
    pub id: String,
    /// Width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Height in pixels.
    #[serde(default)]
    pub height: u32,
    /// Creation timestamp as an ISO-8601 string.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Image URLs.
    #[serde(default)]
    pub urls: PhotoUrls,
    /// Whether the current user has liked the photo.
    #[serde(default)]
    pub liked_by_user: bool,
}

/// A photo in the local collection.
///
/// Photos are immutable apart from the liked flag, which is replaced by
/// building a new value with [`Photo::with_liked`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Photo {
    /// Server-assigned identifier, unique within the collection.
    pub id: String,
    /// Pixel dimensions.
    pub size: Size,
    /// Creation time, if the server sent a parseable one.
    pub created_at: Option<DateTime<Utc>>,
    /// Free-form description.
    pub description: Option<String>,
    /// Thumbnail URL.
    pub thumb_url: String,
    /// Full-resolution URL.
    pub full_url: String,
    /// Whether the current user has liked the photo.
    pub is_liked: bool,
}

impl Photo {
    /// Returns a copy of this photo with the liked flag replaced.
    #[must_use]
    pub fn with_liked(&self, is_liked: bool) -> Self {
        Self {
            is_liked,
            ..self.clone()
        }
    }
}

impl From<PhotoRecord> for Photo {
    fn from(record: PhotoRecord) -> Self {
        let created_at = record.created_at.as_deref().and_then(parse_timestamp);
        Self {
            id: record.id,
            size: Size::new(record.width, record.height),
            created_at,
            description: record.description,
            thumb_url: record.urls.thumb,
            full_url: record.urls.full,
            is_liked: record.liked_by_user,
        }
    }
}

/// Parses an ISO-8601 timestamp with an explicit offset.
///
/// Returns `None` for anything that does not parse; a bad timestamp is not
/// worth dropping the photo over.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const PAGE: &str = r#"[
        {
            "id": "LBI7cgq3pbM",
            "width": 5245,
            "height": 3497,
            "created_at": "2016-05-03T11:00:28-04:00",
            "description": "A man drinking a coffee.",
            "urls": {"thumb": "https://img/t.jpg", "full": "https://img/f.jpg", "raw": "ignored"},
            "liked_by_user": true,
            "likes": 12
        },
        {"id": "sparse"}
    ]"#;

    #[test]
    fn decode_page_and_map() {
        let records: Vec<PhotoRecord> = serde_json::from_str(PAGE).unwrap();
        let photos: Vec<Photo> = records.into_iter().map(Photo::from).collect();

        assert_eq!(photos.len(), 2);
        let first = &photos[0];
        assert_eq!(first.id, "LBI7cgq3pbM");
        assert_eq!(first.size, Size::new(5245, 3497));
        assert_eq!(first.thumb_url, "https://img/t.jpg");
        assert_eq!(first.full_url, "https://img/f.jpg");
        assert!(first.is_liked);

        let created = first.created_at.unwrap();
        assert_eq!(created.year(), 2016);
        assert_eq!(created.hour(), 15);

        let sparse = &photos[1];
        assert_eq!(sparse.size, Size::default());
        assert_eq!(sparse.created_at, None);
        assert_eq!(sparse.description, None);
        assert!(sparse.thumb_url.is_empty());
        assert!(!sparse.is_liked);
    }

    #[test]
    fn bad_timestamp_is_none() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2016-05-03").is_none());
        assert!(parse_timestamp("2024-01-02T03:04:05Z").is_some());
    }

    #[test]
    fn with_liked_only_touches_flag() {
        let records: Vec<PhotoRecord> = serde_json::from_str(PAGE).unwrap();
        let photo = Photo::from(records[0].clone());
        let unliked = photo.with_liked(false);

        assert!(!unliked.is_liked);
        assert_eq!(unliked, Photo { is_liked: false, ..photo.clone() });
        assert!(photo.is_liked);
    }

    #[test]
    fn aspect_ratio() {
        assert_eq!(Size::new(400, 200).aspect_ratio(), Some(2.0));
        assert_eq!(Size::new(400, 0).aspect_ratio(), None);
    }
}
