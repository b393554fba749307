//! Consumer-side mirror of the photo collection.
//!
//! A presentation layer keeps a [`FeedView`] and calls [`FeedView::sync`]
//! with each fresh snapshot. The returned [`ChangeEvent`] says what to
//! re-render: the appended rows when the collection grew, everything when it
//! shrank or was replaced.

use photofeed_protocol::{ChangeEvent, Photo};

/// Rendered copy of the photo collection.
#[derive(Debug, Clone, Default)]
pub struct FeedView {
    photos: Vec<Photo>,
}

impl FeedView {
    /// Creates an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the view contents with `photos` and returns the change to
    /// render, or `None` if the length did not change.
    pub fn sync(&mut self, photos: &[Photo]) -> Option<ChangeEvent> {
        let old_len = self.photos.len();
        let new_len = photos.len();
        let appended = new_len > old_len
            && self
                .photos
                .iter()
                .zip(photos)
                .all(|(old, new)| old.id == new.id);

        let event = if new_len == old_len {
            None
        } else if appended {
            Some(ChangeEvent::Inserted(old_len..new_len))
        } else {
            Some(ChangeEvent::FullReload)
        };
        self.photos = photos.to_vec();
        event
    }

    /// Applies a confirmed like state to the row at `index`.
    ///
    /// Returns false if there is no such row.
    pub fn set_liked(&mut self, index: usize, liked: bool) -> bool {
        match self.photos.get_mut(index) {
            Some(photo) => {
                *photo = photo.with_liked(liked);
                true
            }
            None => false,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// Photo at `index`.
    pub fn photo(&self, index: usize) -> Option<&Photo> {
        self.photos.get(index)
    }

    /// All rows.
    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }
}
