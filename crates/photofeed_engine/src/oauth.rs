//! OAuth authorization code exchange.
//!
//! Authorization codes are single-use upstream, so an exchange is keyed by
//! its code: asking again for a code already being exchanged fails fast with
//! [`FeedError::DuplicateRequest`] instead of burning a second request. A
//! different code supersedes the pending exchange.

use crate::error::{FeedError, FeedResult};
use crate::main_loop::{respond, Context, Mailbox, Message};
use crate::single_flight::{RequestToken, SingleFlight};
use photofeed_protocol::AccessToken;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

type Reply = oneshot::Sender<FeedResult<AccessToken>>;

pub(crate) enum AuthMessage {
    Exchange {
        code: String,
        reply: Reply,
    },
    Exchanged {
        token: RequestToken,
        result: FeedResult<AccessToken>,
    },
}

pub(crate) struct AuthEngine {
    exchange: SingleFlight<String, Reply>,
}

impl AuthEngine {
    pub(crate) fn new() -> Self {
        Self {
            exchange: SingleFlight::new(),
        }
    }

    pub(crate) fn handle(&mut self, ctx: &Context, message: AuthMessage) {
        match message {
            AuthMessage::Exchange { code, reply } => self.exchange(ctx, code, reply),
            AuthMessage::Exchanged { token, result } => self.exchanged(ctx, token, result),
        }
    }

    fn exchange(&mut self, ctx: &Context, code: String, reply: Reply) {
        if self.exchange.key() == Some(&code) {
            debug!("code already being exchanged");
            let _ = reply.send(Err(FeedError::DuplicateRequest));
            return;
        }
        let request = match ctx.endpoints.token_exchange(&code) {
            Ok(request) => request,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };

        let (token, superseded) = self.exchange.begin(code, reply);
        if let Some(superseded) = superseded {
            debug!(token = %superseded.token, "superseded code exchange");
            respond(superseded.reply, Err(FeedError::Stale));
        }

        let envelope = ctx.envelope.clone();
        let handle = ctx.spawn(
            async move { envelope.send_typed::<AccessToken>(request).await },
            move |result| Message::Auth(AuthMessage::Exchanged { token, result }),
        );
        self.exchange.attach(token, handle);
        debug!(%token, "exchanging authorization code");
    }

    fn exchanged(&mut self, ctx: &Context, token: RequestToken, result: FeedResult<AccessToken>) {
        let Some(flight) = self.exchange.complete(token) else {
            debug!(%token, "discarding stale code exchange");
            return;
        };

        let result = result.and_then(|access| {
            ctx.credentials.set(Some(access.access_token.clone()))?;
            Ok(access)
        });
        match &result {
            Ok(access) => info!(scope = %access.scope, "authorization code exchanged"),
            Err(e) => warn!(error = %e, "code exchange failed"),
        }
        respond(flight.reply, result);
    }

    /// Cancels the pending exchange, if any.
    pub(crate) fn cancel(&mut self) {
        if let Some(flight) = self.exchange.cancel() {
            respond(flight.reply, Err(FeedError::Stale));
        }
    }
}

/// Handle to the OAuth token exchange.
#[derive(Clone)]
pub struct AuthHandle {
    mailbox: Mailbox,
}

impl AuthHandle {
    pub(crate) fn new(mailbox: Mailbox) -> Self {
        Self { mailbox }
    }

    /// Exchanges an authorization code for an access token and stores the
    /// token as the bearer credential.
    ///
    /// # Errors
    ///
    /// [`FeedError::DuplicateRequest`] if `code` is already being exchanged.
    /// [`FeedError::Stale`] if a different code superseded this one.
    pub async fn exchange_code(&self, code: impl Into<String>) -> FeedResult<AccessToken> {
        let code = code.into();
        self.mailbox
            .call(|reply| Message::Auth(AuthMessage::Exchange { code, reply }))
            .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::MemoryCredentialStore;
    use crate::http::Method;
    use crate::mock::MockHttpClient;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    const TOKEN_BODY: &str = r#"{"access_token":"fresh","token_type":"bearer","scope":"public","created_at":1}"#;

    fn setup() -> (
        AuthEngine,
        Context,
        mpsc::UnboundedReceiver<Message>,
        mpsc::UnboundedSender<Message>,
        MockHttpClient,
    ) {
        let mock = MockHttpClient::new();
        let (ctx, rx, tx) =
            Context::for_tests(Arc::new(mock.clone()), Arc::new(MemoryCredentialStore::new()));
        (AuthEngine::new(), ctx, rx, tx, mock)
    }

    fn exchange(
        engine: &mut AuthEngine,
        ctx: &Context,
        code: &str,
    ) -> oneshot::Receiver<FeedResult<AccessToken>> {
        let (reply, rx) = oneshot::channel();
        engine.handle(
            ctx,
            AuthMessage::Exchange {
                code: code.into(),
                reply,
            },
        );
        rx
    }

    async fn pump(engine: &mut AuthEngine, ctx: &Context, rx: &mut mpsc::UnboundedReceiver<Message>) {
        match rx.recv().await {
            Some(Message::Auth(message)) => engine.handle(ctx, message),
            _ => panic!("expected an auth completion"),
        }
    }

    #[tokio::test]
    async fn duplicate_code_fails_fast() {
        let (mut engine, ctx, mut rx, _tx, mock) = setup();

        let first = exchange(&mut engine, &ctx, "code-1");
        let second = exchange(&mut engine, &ctx, "code-1");
        assert_eq!(second.await.unwrap(), Err(FeedError::DuplicateRequest));

        let pending = mock.next_request().await.unwrap();
        assert_eq!(pending.request.method, Method::Post);
        assert_eq!(pending.request.query("code").as_deref(), Some("code-1"));
        pending.respond(200, TOKEN_BODY);
        pump(&mut engine, &ctx, &mut rx).await;

        let token = first.await.unwrap().unwrap();
        assert_eq!(token.access_token, "fresh");
        assert_eq!(ctx.credentials.get().as_deref(), Some("fresh"));
        assert_eq!(mock.request_count(), 1);

        // The marker is cleared once the first exchange completes.
        let third = exchange(&mut engine, &ctx, "code-2");
        mock.next_request().await.unwrap().respond(200, TOKEN_BODY);
        pump(&mut engine, &ctx, &mut rx).await;
        assert!(third.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn same_code_allowed_after_failure() {
        let (mut engine, ctx, mut rx, _tx, mock) = setup();

        let first = exchange(&mut engine, &ctx, "code");
        mock.next_request().await.unwrap().respond(401, "");
        pump(&mut engine, &ctx, &mut rx).await;
        assert_eq!(first.await.unwrap(), Err(FeedError::Status(401)));
        assert_eq!(ctx.credentials.get(), None);

        let _retry = exchange(&mut engine, &ctx, "code");
        assert_eq!(mock.next_request().await.unwrap().request.query("code").as_deref(), Some("code"));
    }

    #[tokio::test]
    async fn different_code_supersedes() {
        let (mut engine, ctx, _rx, _tx, _mock) = setup();

        let first = exchange(&mut engine, &ctx, "a");
        let _second = exchange(&mut engine, &ctx, "b");
        assert_eq!(first.await.unwrap(), Err(FeedError::Stale));
        assert_eq!(engine.exchange.key().map(String::as_str), Some("b"));
    }

    #[tokio::test]
    async fn cancel_clears_marker() {
        let (mut engine, ctx, _rx, _tx, _mock) = setup();

        let first = exchange(&mut engine, &ctx, "a");
        engine.cancel();
        assert_eq!(first.await.unwrap(), Err(FeedError::Stale));
        assert!(engine.exchange.key().is_none());
    }
}
