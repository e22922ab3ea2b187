use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cloneable handle through which page behaviors schedule timers and fetches.
///
/// Every task spawned with [`PageHandle::spawn`] or [`PageHandle::spawn_after`]
/// stops when the shared cancellation token fires, which is how a page is torn
/// down without waiting on outstanding timers.
#[derive(Clone)]
pub struct PageHandle {
    inner: Handle,
    cancel: CancellationToken,
}

/// Runtime that plays the role of the page's event loop.
pub struct PageRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl PageRuntime {
    /// Build a single-threaded runtime; page behaviors assume one event loop.
    ///
    /// ```
    /// use folio_runtime::PageRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = PageRuntime::build("doctest-page").expect("runtime builds");
    /// let value = runtime.block_on(async { 2 + 2 });
    /// assert_eq!(value, 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name(thread_name)
            .build()?;
        Ok(Self {
            runtime,
            cancel: CancellationToken::new(),
        })
    }

    /// Obtain a cloned handle for spawning tasks and sharing cancellation.
    ///
    /// ```
    /// use folio_runtime::PageRuntime;
    ///
    /// let runtime = PageRuntime::build("handle-example").unwrap();
    /// let handle = runtime.handle();
    /// assert!(!handle.cancellation().is_cancelled());
    /// ```
    pub fn handle(&self) -> PageHandle {
        PageHandle {
            inner: self.runtime.handle().clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Run a future to completion on the runtime.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel outstanding work and shut the runtime down.
    pub fn shutdown(self, graceful: Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

impl PageHandle {
    /// Wrap the runtime the caller is currently running on.
    ///
    /// Panics when called outside a tokio runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self {
            inner: Handle::current(),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn a future that is dropped as soon as the page is cancelled.
    ///
    /// ```
    /// use folio_runtime::PageRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = PageRuntime::build("spawn-doctest").unwrap();
    /// let handle = runtime.handle();
    /// let task = handle.spawn(async { 21 * 2 });
    /// let result = runtime.block_on(async move { task.await.unwrap() });
    /// assert_eq!(result, Some(42));
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.inner.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                out = fut => Some(out),
            }
        })
    }

    /// Run `f` once after `delay`, unless the page is cancelled or the
    /// returned handle is aborted first.
    pub fn spawn_after<F>(&self, delay: Duration, f: F) -> JoinHandle<Option<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        })
    }

    /// Clone the shared cancellation token to coordinate teardown.
    ///
    /// ```
    /// use folio_runtime::PageRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = PageRuntime::build("cancel-example").unwrap();
    /// let cancel = runtime.handle().cancellation();
    /// cancel.cancel();
    /// assert!(cancel.is_cancelled());
    /// runtime.shutdown(Duration::from_millis(5));
    /// ```
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel every task spawned through this handle or its clones.
    pub fn cancel_all(&self) {
        self.cancel.cancel();
    }
}
