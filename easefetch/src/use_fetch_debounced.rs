use crate::fetcher::box_fetcher;
use crate::use_fetch::Shared;
use crate::{
    DebounceOptions, FetchError, FetchResult, FetchState, FetcherContext, Key, StableKey, UseFetch,
};
use futures_signals::signal::MutableSignalCloned;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

struct DebounceSlot<K> {
    pending: StableKey<K>,
    delay: Duration,
    timer: Option<CancellationToken>,
    disposed: bool,
}

/// [`UseFetch`] behind a debounce timer.
///
/// The first key is fetched immediately. After that every key change restarts a
/// timer of `debounce_delay`, and only when the timer elapses does the latest
/// key reach the inner hook. Rapid key churn therefore collapses into a single
/// fetch.
pub struct UseFetchDebounced<K, T>
where
    K: Key,
    T: Clone + Send + Sync + 'static,
{
    fetch: UseFetch<K, T>,
    debounce: Mutex<DebounceSlot<K>>,
    teardown: CancellationToken,
}

impl<K, T> UseFetchDebounced<K, T>
where
    K: Key,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut, R>(
        fetcher: F,
        key: K,
        options: DebounceOptions<T>,
    ) -> Result<Self, FetchError>
    where
        F: Fn(FetcherContext<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: FetchResult<T> + 'static,
    {
        let DebounceOptions {
            debounce_delay,
            fetch,
        } = options;
        let pending = StableKey::new(key)?;
        let effective = StableKey::from_shared(pending.current())?;
        Ok(UseFetchDebounced {
            fetch: UseFetch::mount(box_fetcher(fetcher), effective, fetch),
            debounce: Mutex::new(DebounceSlot {
                pending,
                delay: debounce_delay,
                timer: None,
                disposed: false,
            }),
            teardown: CancellationToken::new(),
        })
    }

    fn lock_debounce(&self) -> MutexGuard<'_, DebounceSlot<K>> {
        self.debounce.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Observes a new key. A key that differs from the pending one restarts the
    /// debounce timer.
    pub fn set_key(&self, key: K) -> Result<(), FetchError> {
        let mut debounce = self.lock_debounce();
        if debounce.disposed {
            return Ok(());
        }
        let previous = debounce.pending.current();
        let stable = debounce.pending.stabilize(key)?;
        if !Arc::ptr_eq(&previous, &stable) {
            self.restart_timer(&mut debounce, stable);
        }
        Ok(())
    }

    /// Changes the debounce delay. A pending key change is rescheduled with the
    /// new delay.
    pub fn set_debounce_delay(&self, delay: Duration) {
        let mut debounce = self.lock_debounce();
        if debounce.disposed || debounce.delay == delay {
            return;
        }
        debounce.delay = delay;
        if debounce
            .timer
            .as_ref()
            .is_some_and(|timer| !timer.is_cancelled())
        {
            let pending = debounce.pending.current();
            self.restart_timer(&mut debounce, pending);
        }
    }

    fn restart_timer(&self, debounce: &mut DebounceSlot<K>, key: Arc<K>) {
        if let Some(timer) = debounce.timer.take() {
            timer.cancel();
        }
        let timer = self.teardown.child_token();
        debounce.timer = Some(timer.clone());

        let delay = debounce.delay;
        let fetch = self.fetch.downgrade();
        trace!("debounce timer restarted, firing in {:?}", delay);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(delay) => Self::fire(fetch, &timer, key),
            }
        });
    }

    fn fire(fetch: Weak<Shared<K, T>>, timer: &CancellationToken, key: Arc<K>) {
        if timer.is_cancelled() {
            return;
        }
        // Spent; `is_pending` reads this.
        timer.cancel();
        let Some(fetch) = fetch.upgrade() else {
            return;
        };
        debug!("debounce elapsed, forwarding key");
        if let Err(error) = Shared::observe_key(&fetch, key) {
            debug!("debounced key rejected: {}", error);
        }
    }

    /// True while a key change is waiting for the debounce timer.
    pub fn is_pending(&self) -> bool {
        self.lock_debounce()
            .timer
            .as_ref()
            .is_some_and(|timer| !timer.is_cancelled())
    }

    /// The latest key passed to [`UseFetchDebounced::set_key`].
    pub fn pending_key(&self) -> Arc<K> {
        self.lock_debounce().pending.current()
    }

    /// The key the inner hook is currently fetching for.
    pub fn key(&self) -> Arc<K> {
        self.fetch.key()
    }

    pub fn refetch(&self) {
        self.fetch.refetch();
    }

    pub fn state(&self) -> FetchState<T> {
        self.fetch.state()
    }

    pub fn data(&self) -> Option<T> {
        self.fetch.data()
    }

    pub fn error(&self) -> Option<FetchError> {
        self.fetch.error()
    }

    pub fn is_loading(&self) -> bool {
        self.fetch.is_loading()
    }

    pub fn to_signal(&self) -> MutableSignalCloned<FetchState<T>> {
        self.fetch.to_signal()
    }

    pub async fn await_settled(&self) -> Result<FetchState<T>, FetchError> {
        self.fetch.await_settled().await
    }

    /// The wrapped hook, for everything not forwarded here.
    pub fn inner(&self) -> &UseFetch<K, T> {
        &self.fetch
    }

    /// Cancels a pending key change and disposes the inner hook.
    pub fn dispose(&self) {
        {
            let mut debounce = self.lock_debounce();
            if debounce.disposed {
                return;
            }
            debounce.disposed = true;
            debounce.timer = None;
            self.teardown.cancel();
        }
        self.fetch.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.teardown.is_cancelled()
    }
}

impl<K, T> Drop for UseFetchDebounced<K, T>
where
    K: Key,
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}
