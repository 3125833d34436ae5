//! Task spawning abstraction with shutdown draining.
//!
//! This module provides a [`TaskSpawner`] trait so services can start
//! background work without owning a runtime, and [`TokioSpawner`], which
//! tracks every task it spawns so shutdown can wait for them to finish.

use std::future::Future;

use tokio_util::task::TaskTracker;

/// Abstraction for spawning background tasks.
///
/// Allows core services to spawn asynchronous work without knowing the
/// underlying runtime.
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     spawner: TokioSpawner,
/// }
///
/// impl MyService {
///     fn start_background_work(&self) {
///         self.spawner.spawn(async {
///             // Background work here
///         });
///     }
/// }
/// ```
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner that tracks its tasks.
///
/// Clones share the same tracker, so [`TokioSpawner::drain`] waits for every
/// task spawned through any clone.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
    tracker: TaskTracker,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            tracker: TaskTracker::new(),
        }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    /// Closes the tracker and waits for all tracked tasks to complete.
    ///
    /// Tasks are not aborted; callers cancel them first (usually through a
    /// shared `CancellationToken`) and then drain.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        drop(self.tracker.spawn_on(future, &self.handle));
    }
}
