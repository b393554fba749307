//! Photo feed synchronization.
//!
//! The engine owns the ordered photo collection and the pagination cursor.
//! It runs at most one page fetch and at most one like mutation at a time;
//! the two kinds are independent of each other. Starting a request of a kind
//! supersedes the pending one of that kind, whose caller receives
//! [`FeedError::Stale`].
//!
//! Every completion carries the token of the request that produced it. A
//! completion whose token is no longer current (superseded, or the engine
//! was reset) is discarded without touching state.

use crate::bus::{NotificationBus, Subscription};
use crate::error::{FeedError, FeedResult};
use crate::main_loop::{respond, Context, Mailbox, Message};
use crate::single_flight::{RequestToken, SingleFlight};
use photofeed_protocol::{ChangeEvent, Photo, PhotoRecord};
use serde::Serialize;
use std::ops::Range;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

type Reply<T> = Option<oneshot::Sender<FeedResult<T>>>;

/// Outcome of a page fetch that was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLoaded {
    /// The page that was loaded.
    pub page: u32,
    /// Indices of the appended photos. Empty if the page was empty.
    pub inserted: Range<usize>,
}

/// What the engine is waiting on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedState {
    /// Page number of the in-flight fetch.
    pub fetching_page: Option<u32>,
    /// Photo id of the in-flight like mutation.
    pub mutating_like: Option<String>,
}

impl FeedState {
    /// Returns true if nothing is in flight.
    pub fn is_idle(&self) -> bool {
        self.fetching_page.is_none() && self.mutating_like.is_none()
    }
}

/// A read-only copy of the engine state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedSnapshot {
    /// The photo collection, in server order.
    pub photos: Vec<Photo>,
    /// Last successfully loaded page; 0 before the first page.
    pub last_loaded_page: u32,
    /// In-flight requests.
    pub state: FeedState,
}

/// Feed statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    /// Page fetches issued.
    pub fetches_started: u64,
    /// Pages applied to the collection.
    pub pages_loaded: u64,
    /// Photos appended to the collection.
    pub photos_loaded: u64,
    /// Page fetches that failed.
    pub fetch_failures: u64,
    /// Like mutations confirmed by the server.
    pub likes_applied: u64,
    /// Like mutations that failed.
    pub like_failures: u64,
    /// Requests superseded or cancelled before completing.
    pub requests_cancelled: u64,
    /// Completions discarded because their token was no longer current.
    pub stale_discarded: u64,
    /// Last error message.
    pub last_error: Option<String>,
}

pub(crate) enum FeedMessage {
    Start {
        reply: oneshot::Sender<FeedResult<()>>,
    },
    FetchNextPage {
        reply: oneshot::Sender<FeedResult<PageLoaded>>,
    },
    WillDisplayRow {
        index: usize,
        reply: oneshot::Sender<bool>,
    },
    ToggleLike {
        index: usize,
        reply: oneshot::Sender<FeedResult<bool>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<FeedSnapshot>,
    },
    Stats {
        reply: oneshot::Sender<FeedStats>,
    },
    PageFetched {
        token: RequestToken,
        page: u32,
        result: FeedResult<Vec<PhotoRecord>>,
    },
    LikeApplied {
        token: RequestToken,
        liked: bool,
        result: FeedResult<()>,
    },
}

pub(crate) struct FeedEngine {
    photos: Vec<Photo>,
    last_loaded_page: u32,
    fetch: SingleFlight<u32, Reply<PageLoaded>>,
    like: SingleFlight<String, Reply<bool>>,
    stats: FeedStats,
}

impl FeedEngine {
    pub(crate) fn new() -> Self {
        Self {
            photos: Vec::new(),
            last_loaded_page: 0,
            fetch: SingleFlight::new(),
            like: SingleFlight::new(),
            stats: FeedStats::default(),
        }
    }

    pub(crate) fn handle(&mut self, ctx: &Context, message: FeedMessage) {
        match message {
            FeedMessage::Start { reply } => {
                let result = self.fetch_next_page(ctx, None);
                // Dropped caller, nothing to do.
                let _ = reply.send(result);
            }
            FeedMessage::FetchNextPage { reply } => {
                if let Err(e) = self.fetch_next_page(ctx, Some(reply)) {
                    debug!(error = %e, "fetch not issued");
                }
            }
            FeedMessage::WillDisplayRow { index, reply } => {
                let _ = reply.send(self.will_display_row(ctx, index));
            }
            FeedMessage::ToggleLike { index, reply } => self.toggle_like(ctx, index, reply),
            FeedMessage::Reset { reply } => {
                self.reset();
                let _ = reply.send(());
            }
            FeedMessage::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            FeedMessage::Stats { reply } => {
                let _ = reply.send(self.stats.clone());
            }
            FeedMessage::PageFetched {
                token,
                page,
                result,
            } => self.page_fetched(ctx, token, page, result),
            FeedMessage::LikeApplied {
                token,
                liked,
                result,
            } => self.like_applied(token, liked, result),
        }
    }

    /// Issues a fetch for the page after the cursor, superseding any pending
    /// fetch. Failures to issue are also sent to `reply`.
    fn fetch_next_page(
        &mut self,
        ctx: &Context,
        reply: Option<oneshot::Sender<FeedResult<PageLoaded>>>,
    ) -> FeedResult<()> {
        let page = self.last_loaded_page + 1;
        let request = ctx
            .credential()
            .and_then(|credential| ctx.endpoints.photos_page(&credential, page));
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                self.record_error(&e);
                respond(reply, Err(e.clone()));
                return Err(e);
            }
        };

        let (token, superseded) = self.fetch.begin(page, reply);
        if let Some(superseded) = superseded {
            debug!(page = superseded.key, token = %superseded.token, "superseded page fetch");
            self.stats.requests_cancelled += 1;
            respond(superseded.reply.flatten(), Err(FeedError::Stale));
        }

        let envelope = ctx.envelope.clone();
        let handle = ctx.spawn(
            async move { envelope.send_typed::<Vec<PhotoRecord>>(request).await },
            move |result| {
                Message::Feed(FeedMessage::PageFetched {
                    token,
                    page,
                    result,
                })
            },
        );
        self.fetch.attach(token, handle);
        self.stats.fetches_started += 1;
        debug!(page, %token, "fetching page");
        Ok(())
    }

    fn page_fetched(
        &mut self,
        ctx: &Context,
        token: RequestToken,
        page: u32,
        result: FeedResult<Vec<PhotoRecord>>,
    ) {
        let Some(flight) = self.fetch.complete(token) else {
            debug!(page, %token, "discarding stale page");
            self.stats.stale_discarded += 1;
            return;
        };
        let reply = flight.reply.flatten();

        let records = match result {
            Ok(records) => records,
            Err(e) => {
                // The cursor stays put so the next trigger retries this page.
                warn!(page, error = %e, "page fetch failed");
                self.stats.fetch_failures += 1;
                self.record_error(&e);
                respond(reply, Err(e));
                return;
            }
        };

        let start = self.photos.len();
        self.photos.extend(records.into_iter().map(Photo::from));
        let inserted = start..self.photos.len();
        self.last_loaded_page = page;
        self.stats.pages_loaded += 1;
        self.stats.photos_loaded += inserted.len() as u64;
        info!(page, count = inserted.len(), total = self.photos.len(), "page loaded");

        if !inserted.is_empty() {
            ctx.bus.photos.publish(ChangeEvent::Inserted(inserted.clone()));
        }
        respond(reply, Ok(PageLoaded { page, inserted }));
    }

    /// Prefetch trigger: fetches the next page when the last loaded row is
    /// about to be shown. Returns true if a fetch was issued.
    fn will_display_row(&mut self, ctx: &Context, index: usize) -> bool {
        if index + 1 != self.photos.len() {
            return false;
        }
        self.fetch_next_page(ctx, None).is_ok()
    }

    fn toggle_like(&mut self, ctx: &Context, index: usize, reply: oneshot::Sender<FeedResult<bool>>) {
        let Some(photo) = self.photos.get(index) else {
            let _ = reply.send(Err(FeedError::IndexOutOfRange {
                index,
                len: self.photos.len(),
            }));
            return;
        };
        // No local change until the server confirms.
        let liked = !photo.is_liked;
        let photo_id = photo.id.clone();

        let request = ctx
            .credential()
            .and_then(|credential| ctx.endpoints.like(&credential, &photo_id, liked));
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                self.record_error(&e);
                let _ = reply.send(Err(e));
                return;
            }
        };

        let (token, superseded) = self.like.begin(photo_id.clone(), Some(reply));
        if let Some(superseded) = superseded {
            debug!(photo = %superseded.key, token = %superseded.token, "superseded like mutation");
            self.stats.requests_cancelled += 1;
            respond(superseded.reply.flatten(), Err(FeedError::Stale));
        }

        let envelope = ctx.envelope.clone();
        let handle = ctx.spawn(
            async move { envelope.send(request).await.map(|_| ()) },
            move |result| {
                Message::Feed(FeedMessage::LikeApplied {
                    token,
                    liked,
                    result,
                })
            },
        );
        self.like.attach(token, handle);
        debug!(photo = %photo_id, liked, %token, "mutating like");
    }

    fn like_applied(&mut self, token: RequestToken, liked: bool, result: FeedResult<()>) {
        let Some(flight) = self.like.complete(token) else {
            debug!(%token, "discarding stale like mutation");
            self.stats.stale_discarded += 1;
            return;
        };
        let reply = flight.reply.flatten();

        if let Err(e) = result {
            warn!(photo = %flight.key, error = %e, "like mutation failed");
            self.stats.like_failures += 1;
            self.record_error(&e);
            respond(reply, Err(FeedError::MutationFailed(Box::new(e))));
            return;
        }

        // Located by id: the row index may not be the one the caller saw.
        match self.photos.iter().position(|p| p.id == flight.key) {
            Some(index) => {
                self.photos[index] = self.photos[index].with_liked(liked);
                self.stats.likes_applied += 1;
                info!(photo = %flight.key, liked, "like applied");
                respond(reply, Ok(liked));
            }
            None => {
                debug!(photo = %flight.key, "liked photo no longer loaded");
                respond(reply, Err(FeedError::Stale));
            }
        }
    }

    /// Clears the collection and cursor and cancels everything in flight.
    /// Publishes no change event.
    pub(crate) fn reset(&mut self) {
        if let Some(flight) = self.fetch.cancel() {
            self.stats.requests_cancelled += 1;
            respond(flight.reply.flatten(), Err(FeedError::Stale));
        }
        if let Some(flight) = self.like.cancel() {
            self.stats.requests_cancelled += 1;
            respond(flight.reply.flatten(), Err(FeedError::Stale));
        }
        self.photos.clear();
        self.last_loaded_page = 0;
        debug!("feed reset");
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            photos: self.photos.clone(),
            last_loaded_page: self.last_loaded_page,
            state: FeedState {
                fetching_page: self.fetch.key().copied(),
                mutating_like: self.like.key().cloned(),
            },
        }
    }

    fn record_error(&mut self, error: &FeedError) {
        self.stats.last_error = Some(error.to_string());
    }
}

/// Handle to the photo feed.
#[derive(Clone)]
pub struct FeedHandle {
    mailbox: Mailbox,
    bus: NotificationBus,
}

impl FeedHandle {
    pub(crate) fn new(mailbox: Mailbox, bus: NotificationBus) -> Self {
        Self { mailbox, bus }
    }

    /// Starts the feed by fetching the page after the cursor.
    ///
    /// Returns once the fetch is issued; observe the result on the photos
    /// topic.
    ///
    /// # Errors
    ///
    /// [`FeedError::NoCredential`] if no credential is stored. Nothing is
    /// fetched in that case.
    pub async fn start(&self) -> FeedResult<()> {
        self.mailbox
            .call(|reply| Message::Feed(FeedMessage::Start { reply }))
            .await?
    }

    /// Fetches the page after the cursor and waits for it to be applied.
    ///
    /// A fetch already in flight is superseded and its caller receives
    /// [`FeedError::Stale`]. On failure the cursor does not move, so the
    /// next call retries the same page.
    pub async fn fetch_next_page(&self) -> FeedResult<PageLoaded> {
        self.mailbox
            .call(|reply| Message::Feed(FeedMessage::FetchNextPage { reply }))
            .await?
    }

    /// Tells the engine row `index` is about to be shown.
    ///
    /// Fetches the next page if `index` is the last loaded row. Returns true
    /// if a fetch was issued.
    pub async fn will_display_row(&self, index: usize) -> FeedResult<bool> {
        self.mailbox
            .call(|reply| Message::Feed(FeedMessage::WillDisplayRow { index, reply }))
            .await
    }

    /// Likes or unlikes the photo at `index`, whichever flips its current
    /// state, and returns the confirmed liked state.
    ///
    /// The photo changes only after the server confirms. A mutation already
    /// in flight is superseded.
    ///
    /// # Errors
    ///
    /// [`FeedError::MutationFailed`] if the server call failed; the photo is
    /// left unchanged.
    pub async fn toggle_like(&self, index: usize) -> FeedResult<bool> {
        self.mailbox
            .call(|reply| Message::Feed(FeedMessage::ToggleLike { index, reply }))
            .await?
    }

    /// Clears the feed and cancels every in-flight request.
    pub async fn reset(&self) -> FeedResult<()> {
        self.mailbox
            .call(|reply| Message::Feed(FeedMessage::Reset { reply }))
            .await
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> FeedResult<FeedSnapshot> {
        self.mailbox
            .call(|reply| Message::Feed(FeedMessage::Snapshot { reply }))
            .await
    }

    /// Returns the current statistics.
    pub async fn stats(&self) -> FeedResult<FeedStats> {
        self.mailbox
            .call(|reply| Message::Feed(FeedMessage::Stats { reply }))
            .await
    }

    /// Subscribes to collection length changes.
    pub fn subscribe(&self) -> Subscription<ChangeEvent> {
        self.bus.photos.subscribe()
    }
}
