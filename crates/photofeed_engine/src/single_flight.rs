//! Single-flight bookkeeping.
//!
//! A [`SingleFlight`] tracks at most one outstanding request of a kind.
//! Beginning a new request supersedes the current one: its worker task is
//! aborted and its token retired, so a completion that still arrives is
//! recognised as stale and dropped. Tokens are never reused, including
//! across resets.

use std::fmt;
use tokio::task::AbortHandle;

/// Identifies one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The request currently owning a [`SingleFlight`].
pub(crate) struct InFlight<K, R> {
    pub(crate) token: RequestToken,
    pub(crate) key: K,
    pub(crate) reply: Option<R>,
    abort: Option<AbortHandle>,
}

impl<K, R> InFlight<K, R> {
    /// Stops the worker task. Advisory: the transport may still finish.
    fn abort(&self) {
        if let Some(handle) = &self.abort {
            handle.abort();
        }
    }
}

pub(crate) struct SingleFlight<K, R = ()> {
    next_token: u64,
    current: Option<InFlight<K, R>>,
}

impl<K, R> SingleFlight<K, R> {
    pub(crate) fn new() -> Self {
        Self {
            next_token: 1,
            current: None,
        }
    }

    /// Key of the in-flight request, if any.
    pub(crate) fn key(&self) -> Option<&K> {
        self.current.as_ref().map(|flight| &flight.key)
    }

    /// Registers a new request, returning its token and the request it
    /// superseded (already aborted).
    pub(crate) fn begin(&mut self, key: K, reply: R) -> (RequestToken, Option<InFlight<K, R>>) {
        let superseded = self.cancel();
        let token = RequestToken(self.next_token);
        self.next_token += 1;
        self.current = Some(InFlight {
            token,
            key,
            reply: Some(reply),
            abort: None,
        });
        (token, superseded)
    }

    /// Attaches the worker task to the request identified by `token`.
    pub(crate) fn attach(&mut self, token: RequestToken, handle: AbortHandle) {
        match &mut self.current {
            Some(flight) if flight.token == token => flight.abort = Some(handle),
            _ => handle.abort(),
        }
    }

    /// Takes the in-flight request if `token` is still current.
    ///
    /// Returns `None` for a stale completion.
    pub(crate) fn complete(&mut self, token: RequestToken) -> Option<InFlight<K, R>> {
        match &self.current {
            Some(flight) if flight.token == token => self.current.take(),
            _ => None,
        }
    }

    /// Aborts and takes the in-flight request, if any.
    pub(crate) fn cancel(&mut self) -> Option<InFlight<K, R>> {
        let flight = self.current.take()?;
        flight.abort();
        Some(flight)
    }
}

impl<K, R> Default for SingleFlight<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_supersedes_previous() {
        let mut flight: SingleFlight<u32, &str> = SingleFlight::new();
        let (first, superseded) = flight.begin(1, "a");
        assert!(superseded.is_none());
        assert_eq!(flight.key(), Some(&1));

        let (second, superseded) = flight.begin(2, "b");
        let superseded = superseded.unwrap();
        assert_eq!(superseded.token, first);
        assert_eq!(superseded.reply, Some("a"));
        assert_ne!(first, second);
        assert_eq!(flight.key(), Some(&2));
    }

    #[test]
    fn stale_completion_is_rejected() {
        let mut flight: SingleFlight<u32> = SingleFlight::new();
        let (first, _) = flight.begin(1, ());
        let (second, _) = flight.begin(1, ());

        assert!(flight.complete(first).is_none());
        assert!(flight.key().is_some());
        assert!(flight.complete(second).is_some());
        assert!(flight.key().is_none());
        assert!(flight.complete(second).is_none());
    }

    #[test]
    fn tokens_survive_cancel() {
        let mut flight: SingleFlight<()> = SingleFlight::new();
        let (first, _) = flight.begin((), ());
        assert!(flight.cancel().is_some());
        assert!(flight.cancel().is_none());

        let (second, _) = flight.begin((), ());
        assert!(second > first);
        assert!(flight.complete(first).is_none());
    }

    #[tokio::test]
    async fn cancel_aborts_worker() {
        let mut flight: SingleFlight<()> = SingleFlight::new();
        let (token, _) = flight.begin((), ());
        let task = tokio::spawn(std::future::pending::<()>());
        flight.attach(token, task.abort_handle());

        flight.cancel();
        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn attach_to_retired_token_aborts() {
        let mut flight: SingleFlight<()> = SingleFlight::new();
        let (old, _) = flight.begin((), ());
        flight.begin((), ());

        let task = tokio::spawn(std::future::pending::<()>());
        flight.attach(old, task.abort_handle());
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
