//! # PhotoFeed Engine
//!
//! Feed synchronization core for the PhotoFeed client.
//!
//! This crate provides:
//! - HTTP envelope mapping transport, status and decode failures to [`FeedError`]
//! - OAuth authorization code exchange with per-code de-duplication
//! - Paginated photo feed with like/unlike reconciliation
//! - Profile and avatar fetch
//! - Typed change notification bus
//!
//! ## Architecture
//!
//! [`Services::new`] starts one main loop task that owns all engine state.
//! The [`FeedHandle`], [`AuthHandle`] and [`ProfileHandle`] talk to it by
//! message. Network calls run on worker tasks and report back to the loop,
//! so state is only ever touched from one place and needs no locks.
//!
//! ## Key Invariants
//!
//! - At most one page fetch and one like mutation are in flight
//! - A newer request of a kind supersedes the pending one
//! - Completions of superseded or reset requests are discarded
//! - The pagination cursor only advances when a page is applied
//! - Like state changes only after the server confirms it

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bus;
mod config;
mod credential;
mod endpoints;
mod error;
mod feed;
mod http;
mod main_loop;
mod mock;
mod oauth;
mod profile;
mod single_flight;
mod view;

pub use bus::{AvatarChanged, NotificationBus, Subscription, SubscriptionSlot, Topic};
pub use config::{
    FeedConfig, DEFAULT_ACCESS_SCOPE, DEFAULT_API_BASE_URL, DEFAULT_AUTHORIZE_URL,
    DEFAULT_AUTH_BASE_URL, DEFAULT_REDIRECT_URI, DEFAULT_REQUEST_TIMEOUT,
};
pub use credential::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use endpoints::Endpoints;
pub use error::{FeedError, FeedResult};
pub use feed::{FeedHandle, FeedSnapshot, FeedState, FeedStats, PageLoaded};
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
pub use http::{HttpClient, HttpEnvelope, HttpRequest, HttpResponse, Method};
pub use main_loop::Services;
pub use mock::{MockHttpClient, PendingRequest};
pub use oauth::AuthHandle;
pub use profile::ProfileHandle;
pub use view::FeedView;

pub use photofeed_protocol::{AccessToken, ChangeEvent, Photo, Profile};
