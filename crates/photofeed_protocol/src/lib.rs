//! # PhotoFeed Protocol
//!
//! Wire records and domain types for the PhotoFeed client.
//!
//! This crate provides:
//! - JSON records exactly as the photo API sends them (`PhotoRecord`,
//!   `ProfileRecord`, `UserRecord`, `AccessToken`)
//! - Display-ready domain types derived from them (`Photo`, `Profile`)
//! - `ChangeEvent` deltas describing how the photo collection changed
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod error;
mod photo;
mod profile;
mod token;

pub use change::ChangeEvent;
pub use error::{ProtocolError, ProtocolResult};
pub use photo::{parse_timestamp, Photo, PhotoRecord, PhotoUrls, Size};
pub use profile::{Profile, ProfileImage, ProfileRecord, UserRecord};
pub use token::AccessToken;

/// Decodes a JSON body into a wire record.
pub fn decode_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    serde_json::from_slice(bytes).map_err(ProtocolError::from)
}
