//! Refresh state: the `is_refreshing` flag and the queue of requests waiting
//! on the in-flight refresh.
//!
//! Both live behind one mutex that is never held across an `.await`, so the
//! check-and-set that elects a refresh leader is atomic with respect to every
//! other gateway call. Only the gateway touches this module.

use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use crate::credentials::CredentialStore;
use crate::errors::{ApiError, RefreshError};
use crate::gateway::{ApiRequest, HttpResponse};

pub(crate) type Reply = Result<HttpResponse, ApiError>;

/// A request deferred until the in-flight refresh settles.
pub(crate) struct Waiter {
    pub(crate) request: ApiRequest,
    pub(crate) reply: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct Inner {
    is_refreshing: bool,
    waiters: Vec<Waiter>,
}

#[derive(Default)]
pub(crate) struct RefreshState {
    inner: Mutex<Inner>,
}

/// Outcome of a request that just received its first 401.
pub(crate) enum Claim<'a> {
    /// No refresh in flight: the caller performs it and must settle the guard.
    Lead(ApiRequest, RefreshGuard<'a>),
    /// Another refresh already committed a different token; replay with it.
    Rotated(ApiRequest, String),
    /// A refresh is in flight; the replay result arrives on the receiver.
    Queued(oneshot::Receiver<Reply>),
}

impl RefreshState {
    /// Decides, atomically, what to do with a request that got its first 401.
    /// The request is marked retried on every path.
    pub(crate) fn claim<'a>(
        &'a self,
        mut request: ApiRequest,
        sent_with: Option<&str>,
        credentials: &dyn CredentialStore,
    ) -> Claim<'a> {
        request.mark_retried();
        let mut inner = self.lock();

        if inner.is_refreshing {
            let (reply, receiver) = oneshot::channel();
            inner.waiters.push(Waiter { request, reply });
            debug!("Refresh in flight; queued request ({} waiting)", inner.waiters.len());
            return Claim::Queued(receiver);
        }

        if let Some(current) = credentials.access_token() {
            if sent_with != Some(current.as_str()) {
                return Claim::Rotated(request, current);
            }
        }

        inner.is_refreshing = true;
        Claim::Lead(request, RefreshGuard::new(self))
    }

    pub(crate) fn is_refreshing(&self) -> bool {
        self.lock().is_refreshing
    }

    pub(crate) fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Clears the flag and hands back the queue in one step.
    fn settle(&self) -> Vec<Waiter> {
        let mut inner = self.lock();
        inner.is_refreshing = false;
        mem::take(&mut inner.waiters)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held by the refresh leader. Settling it clears `is_refreshing`; dropping
/// it unsettled (the leader's future was cancelled) fails every waiter with
/// `RefreshError::Abandoned` so none of them hang.
pub(crate) struct RefreshGuard<'a> {
    state: &'a RefreshState,
    settled: bool,
}

impl<'a> RefreshGuard<'a> {
    fn new(state: &'a RefreshState) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    /// Refresh succeeded: returns the waiters, in enqueue order, for replay.
    pub(crate) fn succeed(mut self) -> Vec<Waiter> {
        self.settled = true;
        self.state.settle()
    }

    /// Refresh failed: every waiter receives `error`.
    pub(crate) fn fail(mut self, error: RefreshError) {
        self.settled = true;
        reject_all(self.state.settle(), &error);
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            reject_all(self.state.settle(), &RefreshError::Abandoned);
        }
    }
}

fn reject_all(waiters: Vec<Waiter>, error: &RefreshError) {
    for waiter in waiters {
        // Receiver gone means the caller stopped waiting.
        let _ = waiter.reply.send(Err(ApiError::Refresh(error.clone())));
    }
}
