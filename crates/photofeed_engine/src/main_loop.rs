//! The main loop and service wiring.
//!
//! All engine state lives inside one task. Handles send it messages; network
//! I/O runs on worker tasks whose completions are posted back as messages,
//! so no engine field is ever touched from two places at once.
//!
//! ```text
//!   FeedHandle ──┐                   ┌── worker task (HTTP) ──┐
//!   AuthHandle ──┼── mpsc ──► loop ──┤                        │
//!   ProfileHandle┘     ▲             └── worker task (HTTP) ──┤
//!                      └──────────── completion messages ◄────┘
//! ```

use crate::bus::NotificationBus;
use crate::config::FeedConfig;
use crate::credential::CredentialStore;
use crate::endpoints::Endpoints;
use crate::error::{FeedError, FeedResult};
use crate::feed::{FeedEngine, FeedHandle, FeedMessage};
use crate::http::{HttpClient, HttpEnvelope};
use crate::oauth::{AuthEngine, AuthHandle, AuthMessage};
use crate::profile::{ProfileEngine, ProfileHandle, ProfileMessage};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// Everything the main loop can be asked to do.
pub(crate) enum Message {
    Feed(FeedMessage),
    Auth(AuthMessage),
    Profile(ProfileMessage),
    Logout {
        reply: oneshot::Sender<FeedResult<()>>,
    },
}

/// Sends a reply if the caller is still waiting for one.
pub(crate) fn respond<T>(reply: Option<oneshot::Sender<FeedResult<T>>>, result: FeedResult<T>) {
    if let Some(reply) = reply {
        // The caller may have stopped waiting.
        let _ = reply.send(result);
    }
}

/// Sending side of the main loop, shared by every handle.
#[derive(Clone)]
pub(crate) struct Mailbox {
    tx: mpsc::UnboundedSender<Message>,
}

impl Mailbox {
    /// Posts a message and waits for the loop to reply.
    pub(crate) async fn call<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> Message,
    ) -> FeedResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(message(reply))
            .map_err(|_| FeedError::Shutdown)?;
        rx.await.map_err(|_| FeedError::Shutdown)
    }
}

/// Shared collaborators handed to every engine.
pub(crate) struct Context {
    pub(crate) endpoints: Endpoints,
    pub(crate) envelope: HttpEnvelope,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) bus: NotificationBus,
    tx: mpsc::WeakUnboundedSender<Message>,
}

impl Context {
    /// Runs `work` on a worker task and posts its outcome back to the loop.
    ///
    /// The outcome is dropped if the loop is already gone.
    pub(crate) fn spawn<T, F, D>(&self, work: F, deliver: D) -> AbortHandle
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
        D: FnOnce(T) -> Message + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = work.await;
            match tx.upgrade() {
                Some(tx) => {
                    let _ = tx.send(deliver(outcome));
                }
                None => debug!("main loop gone; dropping completion"),
            }
        })
        .abort_handle()
    }

    /// Returns the stored bearer credential.
    pub(crate) fn credential(&self) -> FeedResult<String> {
        self.credentials.get().ok_or(FeedError::NoCredential)
    }

    /// Builds a context whose completions land on the returned receiver.
    #[cfg(test)]
    pub(crate) fn for_tests(
        client: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialStore>,
    ) -> (Self, mpsc::UnboundedReceiver<Message>, mpsc::UnboundedSender<Message>) {
        let config = FeedConfig::new("id", "secret").with_api_base_url("https://api.test");
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Self {
            endpoints: config.validate().expect("test config is valid"),
            envelope: HttpEnvelope::new(client, config.request_timeout),
            credentials,
            bus: NotificationBus::new(),
            tx: tx.downgrade(),
        };
        (ctx, rx, tx)
    }
}

struct MainLoop {
    ctx: Context,
    feed: FeedEngine,
    auth: AuthEngine,
    profile: ProfileEngine,
}

impl MainLoop {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        debug!("main loop started");
        while let Some(message) = rx.recv().await {
            self.handle(message);
        }
        self.feed.reset();
        self.profile.reset();
        self.auth.cancel();
        debug!("main loop stopped");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Feed(message) => self.feed.handle(&self.ctx, message),
            Message::Auth(message) => self.auth.handle(&self.ctx, message),
            Message::Profile(message) => self.profile.handle(&self.ctx, message),
            Message::Logout { reply } => {
                self.auth.cancel();
                self.feed.reset();
                self.profile.reset();
                let result = self.ctx.credentials.clear();
                match &result {
                    Ok(()) => info!("logged out"),
                    Err(e) => warn!(error = %e, "failed to clear credential"),
                }
                respond(Some(reply), result);
            }
        }
    }
}

/// The assembled services: feed, OAuth and profile, sharing one main loop.
///
/// Construct once at startup and hand out the handles. Handles are cheap to
/// clone and may be used from any task. The loop stops once `Services` and
/// every handle have been dropped.
pub struct Services {
    mailbox: Mailbox,
    bus: NotificationBus,
    credentials: Arc<dyn CredentialStore>,
    feed: FeedHandle,
    auth: AuthHandle,
    profile: ProfileHandle,
}

impl Services {
    /// Validates `config` and starts the main loop on the current tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Config`] for an invalid configuration and
    /// [`FeedError::Runtime`] when called outside a tokio runtime.
    pub fn new(
        config: &FeedConfig,
        client: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialStore>,
    ) -> FeedResult<Self> {
        let endpoints = config.validate()?;
        let runtime = Handle::try_current().map_err(|e| FeedError::Runtime(e.to_string()))?;

        let bus = NotificationBus::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Context {
            endpoints,
            envelope: HttpEnvelope::new(client, config.request_timeout),
            credentials: Arc::clone(&credentials),
            bus: bus.clone(),
            tx: tx.downgrade(),
        };
        let main_loop = MainLoop {
            ctx,
            feed: FeedEngine::new(),
            auth: AuthEngine::new(),
            profile: ProfileEngine::new(),
        };
        runtime.spawn(main_loop.run(rx));
        info!(api = %config.api_base_url, timeout = ?config.request_timeout, "services started");

        let mailbox = Mailbox { tx };
        Ok(Self {
            feed: FeedHandle::new(mailbox.clone(), bus.clone()),
            auth: AuthHandle::new(mailbox.clone()),
            profile: ProfileHandle::new(mailbox.clone(), bus.clone()),
            mailbox,
            bus,
            credentials,
        })
    }

    /// Photo feed.
    pub fn feed(&self) -> &FeedHandle {
        &self.feed
    }

    /// OAuth token exchange.
    pub fn auth(&self) -> &AuthHandle {
        &self.auth
    }

    /// Profile and avatar.
    pub fn profile(&self) -> &ProfileHandle {
        &self.profile
    }

    /// Change notifications.
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Returns true if a bearer credential is stored.
    pub fn is_logged_in(&self) -> bool {
        self.credentials.get().is_some()
    }

    /// Ends the session: cancels every in-flight request, clears the feed and
    /// profile, and removes the stored credential.
    ///
    /// Like [`FeedHandle::reset`], this publishes no change event.
    pub async fn logout(&self) -> FeedResult<()> {
        self.mailbox
            .call(|reply| Message::Logout { reply })
            .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::MemoryCredentialStore;
    use crate::mock::MockHttpClient;

    #[test]
    fn new_requires_runtime() {
        let result = Services::new(
            &FeedConfig::default(),
            Arc::new(MockHttpClient::new()),
            Arc::new(MemoryCredentialStore::new()),
        );
        assert!(matches!(result, Err(FeedError::Runtime(_))));
    }

    #[tokio::test]
    async fn new_rejects_bad_config() {
        let result = Services::new(
            &FeedConfig::default().with_api_base_url("::nope"),
            Arc::new(MockHttpClient::new()),
            Arc::new(MemoryCredentialStore::new()),
        );
        assert!(matches!(result, Err(FeedError::Config(_))));
    }

    #[tokio::test]
    async fn logout_clears_credential() {
        let store = Arc::new(MemoryCredentialStore::with_credential("tok"));
        let services = Services::new(
            &FeedConfig::default(),
            Arc::new(MockHttpClient::new()),
            store.clone(),
        )
        .unwrap();
        assert!(services.is_logged_in());

        services.logout().await.unwrap();
        assert!(!services.is_logged_in());
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn spawn_delivers_to_loop() {
        let (ctx, mut rx, _tx) = Context::for_tests(
            Arc::new(MockHttpClient::new()),
            Arc::new(MemoryCredentialStore::new()),
        );
        let (reply, _reply_rx) = oneshot::channel();
        ctx.spawn(async { 7 }, move |_| Message::Logout { reply });
        assert!(matches!(rx.recv().await, Some(Message::Logout { .. })));
    }
}
