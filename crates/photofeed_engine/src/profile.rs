//! Profile and avatar fetch.
//!
//! Both fetches are single-flight: a new call supersedes the pending one. A
//! fetched avatar URL is also published on the avatar topic, since more than
//! one observer shows it.

use crate::bus::{AvatarChanged, NotificationBus, Subscription};
use crate::error::{FeedError, FeedResult};
use crate::main_loop::{respond, Context, Mailbox, Message};
use crate::single_flight::{RequestToken, SingleFlight};
use photofeed_protocol::{Profile, ProfileRecord, UserRecord};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

type Reply<T> = oneshot::Sender<FeedResult<T>>;

pub(crate) enum ProfileMessage {
    FetchProfile {
        reply: Reply<Profile>,
    },
    FetchAvatar {
        username: String,
        reply: Reply<String>,
    },
    Cached {
        reply: oneshot::Sender<(Option<Profile>, Option<String>)>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    ProfileFetched {
        token: RequestToken,
        result: FeedResult<ProfileRecord>,
    },
    AvatarFetched {
        token: RequestToken,
        result: FeedResult<UserRecord>,
    },
}

pub(crate) struct ProfileEngine {
    profile: Option<Profile>,
    avatar_url: Option<String>,
    profile_fetch: SingleFlight<(), Reply<Profile>>,
    avatar_fetch: SingleFlight<String, Reply<String>>,
}

impl ProfileEngine {
    pub(crate) fn new() -> Self {
        Self {
            profile: None,
            avatar_url: None,
            profile_fetch: SingleFlight::new(),
            avatar_fetch: SingleFlight::new(),
        }
    }

    pub(crate) fn handle(&mut self, ctx: &Context, message: ProfileMessage) {
        match message {
            ProfileMessage::FetchProfile { reply } => self.fetch_profile(ctx, reply),
            ProfileMessage::FetchAvatar { username, reply } => {
                self.fetch_avatar(ctx, username, reply)
            }
            ProfileMessage::Cached { reply } => {
                let _ = reply.send((self.profile.clone(), self.avatar_url.clone()));
            }
            ProfileMessage::Reset { reply } => {
                self.reset();
                let _ = reply.send(());
            }
            ProfileMessage::ProfileFetched { token, result } => self.profile_fetched(token, result),
            ProfileMessage::AvatarFetched { token, result } => {
                self.avatar_fetched(ctx, token, result)
            }
        }
    }

    fn fetch_profile(&mut self, ctx: &Context, reply: Reply<Profile>) {
        let request = match ctx.credential().and_then(|c| ctx.endpoints.me(&c)) {
            Ok(request) => request,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };

        let (token, superseded) = self.profile_fetch.begin((), reply);
        if let Some(superseded) = superseded {
            respond(superseded.reply, Err(FeedError::Stale));
        }
        let envelope = ctx.envelope.clone();
        let handle = ctx.spawn(
            async move { envelope.send_typed::<ProfileRecord>(request).await },
            move |result| Message::Profile(ProfileMessage::ProfileFetched { token, result }),
        );
        self.profile_fetch.attach(token, handle);
        debug!(%token, "fetching profile");
    }

    fn profile_fetched(&mut self, token: RequestToken, result: FeedResult<ProfileRecord>) {
        let Some(flight) = self.profile_fetch.complete(token) else {
            debug!(%token, "discarding stale profile");
            return;
        };
        let result = result.map(Profile::from);
        match &result {
            Ok(profile) => {
                info!(login = %profile.login_name, "profile loaded");
                self.profile = Some(profile.clone());
            }
            Err(e) => warn!(error = %e, "profile fetch failed"),
        }
        respond(flight.reply, result);
    }

    fn fetch_avatar(&mut self, ctx: &Context, username: String, reply: Reply<String>) {
        let request = match ctx
            .credential()
            .and_then(|c| ctx.endpoints.user(&c, &username))
        {
            Ok(request) => request,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };

        let (token, superseded) = self.avatar_fetch.begin(username, reply);
        if let Some(superseded) = superseded {
            respond(superseded.reply, Err(FeedError::Stale));
        }
        let envelope = ctx.envelope.clone();
        let handle = ctx.spawn(
            async move { envelope.send_typed::<UserRecord>(request).await },
            move |result| Message::Profile(ProfileMessage::AvatarFetched { token, result }),
        );
        self.avatar_fetch.attach(token, handle);
        debug!(%token, "fetching avatar");
    }

    fn avatar_fetched(&mut self, ctx: &Context, token: RequestToken, result: FeedResult<UserRecord>) {
        let Some(flight) = self.avatar_fetch.complete(token) else {
            debug!(%token, "discarding stale avatar");
            return;
        };
        let result = result.and_then(|user| {
            user.small_avatar()
                .map(str::to_owned)
                .map_err(|_| FeedError::MissingAvatar)
        });
        match &result {
            Ok(url) => {
                debug!(user = %flight.key, "avatar url loaded");
                self.avatar_url = Some(url.clone());
                ctx.bus.avatar.publish(AvatarChanged { url: url.clone() });
            }
            Err(e) => warn!(user = %flight.key, error = %e, "avatar fetch failed"),
        }
        respond(flight.reply, result);
    }

    /// Forgets the cached profile and cancels pending fetches.
    pub(crate) fn reset(&mut self) {
        if let Some(flight) = self.profile_fetch.cancel() {
            respond(flight.reply, Err(FeedError::Stale));
        }
        if let Some(flight) = self.avatar_fetch.cancel() {
            respond(flight.reply, Err(FeedError::Stale));
        }
        self.profile = None;
        self.avatar_url = None;
    }
}

/// Handle to the profile service.
#[derive(Clone)]
pub struct ProfileHandle {
    mailbox: Mailbox,
    bus: NotificationBus,
}

impl ProfileHandle {
    pub(crate) fn new(mailbox: Mailbox, bus: NotificationBus) -> Self {
        Self { mailbox, bus }
    }

    /// Fetches the logged-in user's profile.
    ///
    /// Missing name parts come back as empty strings, never as absent
    /// values.
    pub async fn fetch_profile(&self) -> FeedResult<Profile> {
        self.mailbox
            .call(|reply| Message::Profile(ProfileMessage::FetchProfile { reply }))
            .await?
    }

    /// Fetches the small avatar URL of `username` and publishes it on the
    /// avatar topic.
    ///
    /// # Errors
    ///
    /// [`FeedError::MissingAvatar`] if the user has no small avatar.
    pub async fn fetch_avatar_url(&self, username: impl Into<String>) -> FeedResult<String> {
        let username = username.into();
        self.mailbox
            .call(|reply| Message::Profile(ProfileMessage::FetchAvatar { username, reply }))
            .await?
    }

    /// Returns the last fetched profile.
    pub async fn profile(&self) -> FeedResult<Option<Profile>> {
        let (profile, _) = self.cached().await?;
        Ok(profile)
    }

    /// Returns the last fetched avatar URL.
    pub async fn avatar_url(&self) -> FeedResult<Option<String>> {
        let (_, avatar_url) = self.cached().await?;
        Ok(avatar_url)
    }

    /// Forgets the cached profile and avatar and cancels pending fetches.
    pub async fn reset(&self) -> FeedResult<()> {
        self.mailbox
            .call(|reply| Message::Profile(ProfileMessage::Reset { reply }))
            .await
    }

    /// Subscribes to avatar URL changes.
    pub fn subscribe_avatar(&self) -> Subscription<AvatarChanged> {
        self.bus.avatar.subscribe()
    }

    async fn cached(&self) -> FeedResult<(Option<Profile>, Option<String>)> {
        self.mailbox
            .call(|reply| Message::Profile(ProfileMessage::Cached { reply }))
            .await
    }
}
