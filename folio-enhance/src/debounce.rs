use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use folio_runtime::PageHandle;
use tokio::task::JoinHandle;

/// Collapses bursts of calls into one trailing call.
///
/// Each [`Debouncer::call`] aborts the pending timer and schedules a new one
/// `wait` later carrying the latest arguments, so at most one call is pending
/// at any time. Pending timers also stop when the page is cancelled.
///
/// ```
/// use folio_enhance::Debouncer;
/// use folio_runtime::PageRuntime;
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// let runtime = PageRuntime::build("debounce-doctest").unwrap();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let debounced = Debouncer::new(runtime.handle(), Duration::from_millis(20), move |q: &'static str| {
///     sink.lock().unwrap().push(q);
/// });
///
/// runtime.block_on(async {
///     debounced.call("r");
///     debounced.call("ru");
///     debounced.call("rust");
///     tokio::time::sleep(Duration::from_millis(60)).await;
/// });
/// assert_eq!(*seen.lock().unwrap(), vec!["rust"]);
/// ```
pub struct Debouncer<A> {
    func: Arc<dyn Fn(A) + Send + Sync>,
    wait: Duration,
    handle: PageHandle,
    pending: Mutex<Option<JoinHandle<Option<()>>>>,
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new<F>(handle: PageHandle, wait: Duration, func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            wait,
            handle,
            pending: Mutex::new(None),
        }
    }

    /// Restart the quiet period with `args` as the arguments of the eventual call.
    pub fn call(&self, args: A) {
        let func = self.func.clone();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(self.handle.spawn_after(self.wait, move || func(args)));
    }

    /// Drop the pending call, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = pending.take() {
            task.abort();
        }
    }
}
