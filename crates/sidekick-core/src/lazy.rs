//! Single-slot build-on-first-use cell.
//!
//! [`Lazy`] replaces ad hoc nullable fields for construct-on-demand values
//! that are expensive to build and must be built at most once at a time.
//! Concurrent builders share a single in-flight build (single-flight); a
//! failed build resets the cell so the next caller retries from scratch.

use std::future::Future;
use std::sync::Mutex;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::error::Result;

enum Slot<T: Clone> {
    Unbuilt,
    Building(Shared<BoxFuture<'static, Result<T>>>),
    Built(T),
}

struct Inner<T: Clone> {
    slot: Slot<T>,
    /// Bumped on `clear()` so a build that straddles a clear cannot commit.
    generation: u64,
}

/// A cell holding either "unbuilt" or "built" state plus a shared in-flight
/// build future.
pub struct Lazy<T: Clone> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone + Send + 'static> Lazy<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                slot: Slot::Unbuilt,
                generation: 0,
            }),
        }
    }

    /// Whether a value has been built and is currently held.
    pub fn has_value(&self) -> bool {
        matches!(self.inner.lock().unwrap().slot, Slot::Built(_))
    }

    /// The built value, if any. Does not trigger a build.
    pub fn value(&self) -> Option<T> {
        match &self.inner.lock().unwrap().slot {
            Slot::Built(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns the built value, starting `build` if the cell is unbuilt.
    ///
    /// Callers arriving while a build is in flight await the same build
    /// instead of starting a second one. On failure the cell resets to
    /// unbuilt and the error is propagated to every waiter.
    pub async fn get_or_build<F, Fut>(&self, build: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (shared, generation) = {
            let mut inner = self.inner.lock().unwrap();
            match &inner.slot {
                Slot::Built(value) => return Ok(value.clone()),
                Slot::Building(shared) => (shared.clone(), inner.generation),
                Slot::Unbuilt => {
                    let shared = build().boxed().shared();
                    inner.slot = Slot::Building(shared.clone());
                    (shared, inner.generation)
                }
            }
        };

        let result = shared.await;

        let mut inner = self.inner.lock().unwrap();
        // Only commit if no clear() happened while the build was in flight.
        if inner.generation == generation && matches!(inner.slot, Slot::Building(_)) {
            inner.slot = match &result {
                Ok(value) => Slot::Built(value.clone()),
                Err(_) => Slot::Unbuilt,
            };
        }
        result
    }

    /// Resets the cell to unbuilt, returning the built value if one was held.
    pub fn clear(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        inner.generation += 1;
        match std::mem::replace(&mut inner.slot, Slot::Unbuilt) {
            Slot::Built(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Clone + Send + 'static> Default for Lazy<T> {
    fn default() -> Self {
        Self::new()
    }
}
