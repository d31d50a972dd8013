//! Completion handles for in-flight requests.
//!
//! A request settles exactly once. The outcome goes to the [`Completion`]
//! future first and then, if one was registered, to the callback. Either
//! channel can be ignored without affecting the other.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{ready, FutureExt};
use tokio::sync::oneshot;

use crate::{MetricsError, Result};

/// Callback invoked once with the outcome of a request.
pub type Callback<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

/// Awaitable outcome of a `get` or `post`.
///
/// Dropping it does not cancel the request.
#[must_use = "a Completion does nothing unless awaited; drop it to ignore the outcome"]
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(self.rx.poll_unpin(cx)) {
            Ok(outcome) => Poll::Ready(outcome),
            Err(_) => Poll::Ready(Err(unsettled())),
        }
    }
}

/// Write side of a [`Completion`], held by the task doing the I/O.
///
/// Dropping it unsettled (the task panicked or was torn down) resolves both
/// channels with `MetricsError::Internal`.
pub(crate) struct Settler<T: Clone> {
    tx: Option<oneshot::Sender<Result<T>>>,
    callback: Option<Callback<T>>,
}

impl<T: Clone> Settler<T> {
    pub(crate) fn settle(mut self, outcome: Result<T>) {
        self.resolve(outcome);
    }

    fn resolve(&mut self, outcome: Result<T>) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        match self.callback.take() {
            Some(callback) => {
                // A dropped Completion is fine; the callback still observes it.
                let _ = tx.send(outcome.clone());
                callback(outcome);
            }
            None => {
                let _ = tx.send(outcome);
            }
        }
    }
}

impl<T: Clone> Drop for Settler<T> {
    fn drop(&mut self) {
        self.resolve(Err(unsettled()));
    }
}

fn unsettled() -> MetricsError {
    MetricsError::Internal("request task ended without settling".to_string())
}

pub(crate) fn channel<T: Clone>(callback: Option<Callback<T>>) -> (Settler<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    (Settler { tx: Some(tx), callback }, Completion { rx })
}
