//! Cooperative cancellation primitives.
//!
//! Cancellation is epoch-disciplined: the controller owns exactly one
//! [`EpochSource`] at a time, and every async callback checks it is still
//! operating on the source that was current when it started. Canceling an
//! old source can therefore never affect a newer request.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Result of a cancelable unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The work ran to completion.
    Completed(T),
    /// The token was canceled before the work finished.
    Canceled,
}

impl<T> Outcome<T> {
    /// Returns the completed value, if any.
    pub fn into_completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Canceled => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Outcome::Canceled)
    }
}

/// Runs `future` until it completes or `token` is canceled.
///
/// Cancellation takes precedence: if both the future and the cancellation
/// are ready on the same poll, the outcome is [`Outcome::Canceled`].
pub async fn run_cancellable<F>(token: &CancellationToken, future: F) -> Outcome<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Outcome::Canceled,
        value = future => Outcome::Completed(value),
    }
}

/// A cancellation source tagged with its validity epoch.
///
/// Starting a new request (or an explicit cancel) replaces the current
/// source; the epoch lets settle callbacks verify they still belong to the
/// request they were started for.
#[derive(Debug, Clone)]
pub struct EpochSource {
    token: CancellationToken,
    epoch: u64,
}

impl EpochSource {
    pub fn new(epoch: u64) -> Self {
        Self {
            token: CancellationToken::new(),
            epoch,
        }
    }

    /// The epoch this source belongs to.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// A token observing this source.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels this source. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
