//! Deltas describing how the photo collection changed.

use std::ops::Range;

/// A change to the length of the photo collection.
///
/// Liked-flag updates are not change events; they are reported to the
/// caller that requested them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The collection was replaced; observers must re-read everything.
    FullReload,
    /// Photos were appended at `range` (end exclusive).
    Inserted(Range<usize>),
}

impl ChangeEvent {
    /// Creates an insert event for `count` photos appended after `start`.
    pub fn inserted(start: usize, count: usize) -> Self {
        Self::Inserted(start..start + count)
    }

    /// Number of rows this event inserts, or `None` for a full reload.
    pub fn inserted_len(&self) -> Option<usize> {
        match self {
            Self::FullReload => None,
            Self::Inserted(range) => Some(range.len()),
        }
    }

    /// Returns true if observers must discard their copy.
    pub fn is_full_reload(&self) -> bool {
        matches!(self, Self::FullReload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_range() {
        let event = ChangeEvent::inserted(10, 5);
        assert_eq!(event, ChangeEvent::Inserted(10..15));
        assert_eq!(event.inserted_len(), Some(5));
        assert!(!event.is_full_reload());
    }

    #[test]
    fn full_reload() {
        let event = ChangeEvent::FullReload;
        assert_eq!(event.inserted_len(), None);
        assert!(event.is_full_reload());
    }
}
