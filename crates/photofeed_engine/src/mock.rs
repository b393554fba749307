//! Scriptable HTTP client for tests.
//!
//! [`MockHttpClient`] holds every request until the test answers it, so tests
//! can complete concurrent requests in any order.

use crate::http::{HttpClient, HttpRequest, HttpResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// A request waiting for the test to answer it.
#[derive(Debug)]
pub struct PendingRequest {
    /// The request as issued.
    pub request: HttpRequest,
    responder: oneshot::Sender<Result<HttpResponse, String>>,
}

impl PendingRequest {
    /// Answers with a response.
    ///
    /// Returns false if the caller has gone away, e.g. its task was aborted.
    pub fn respond(self, status: u16, body: impl Into<Vec<u8>>) -> bool {
        self.responder
            .send(Ok(HttpResponse::new(status, body)))
            .is_ok()
    }

    /// Fails with a transport error.
    pub fn fail(self, cause: impl Into<String>) -> bool {
        self.responder.send(Err(cause.into())).is_ok()
    }
}

struct MockInner {
    log: Mutex<Vec<HttpRequest>>,
    pending_tx: mpsc::UnboundedSender<PendingRequest>,
    pending_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<PendingRequest>>,
}

/// A mock HTTP client for testing.
#[derive(Clone)]
pub struct MockHttpClient {
    inner: Arc<MockInner>,
}

impl MockHttpClient {
    /// Creates a client with no pending requests.
    pub fn new() -> Self {
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(MockInner {
                log: Mutex::new(Vec::new()),
                pending_tx,
                pending_rx: tokio::sync::Mutex::new(pending_rx),
            }),
        }
    }

    /// Waits for the next issued request.
    pub async fn next_request(&self) -> Option<PendingRequest> {
        self.inner.pending_rx.lock().await.recv().await
    }

    /// Returns the next issued request if one is already waiting.
    pub fn try_next_request(&self) -> Option<PendingRequest> {
        self.inner.pending_rx.try_lock().ok()?.try_recv().ok()
    }

    /// Returns every request issued so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.log.lock().clone()
    }

    /// Returns the number of requests issued so far.
    pub fn request_count(&self) -> usize {
        self.inner.log.lock().len()
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        self.inner.log.lock().push(request.clone());
        let (responder, response) = oneshot::channel();
        self.inner
            .pending_tx
            .send(PendingRequest { request, responder })
            .map_err(|_| "mock client closed".to_string())?;
        response
            .await
            .map_err(|_| "request dropped without a response".to_string())?
    }
}
