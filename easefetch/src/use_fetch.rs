use crate::fetcher::{box_fetcher, BoxedFetcher};
use crate::options::{OnError, OnLoading, OnSuccess};
use crate::{FetchError, FetchOptions, FetchResult, FetchState, FetcherContext, Key, StableKey};
use futures::StreamExt;
use futures_signals::signal::{Mutable, MutableSignalCloned, SignalExt, SignalStream};
use std::future::Future;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Bookkeeping for one in-flight attempt.
#[derive(Debug, Clone)]
struct RequestContext {
    generation: u64,
    cancellation_token: CancellationToken,
}

struct Slot<K, T> {
    key: StableKey<K>,
    fetcher: BoxedFetcher<K, T>,
    refetch_interval: Option<Duration>,
    // Last issued generation. A resolution only applies if it still matches.
    generation: u64,
    request: Option<RequestContext>,
    refetch_timer: Option<CancellationToken>,
    disposed: bool,
}

impl<K, T> Slot<K, T> {
    fn cancel_pending(&mut self) {
        if let Some(request) = self.request.take() {
            request.cancellation_token.cancel();
        }
        if let Some(timer) = self.refetch_timer.take() {
            timer.cancel();
        }
    }
}

/// Serializes callbacks against teardown. Reentrant on the owning thread, so a
/// callback may call back into the hook, dispose included.
///
/// Lock order: gate, then slot.
#[derive(Default)]
struct CallbackGate {
    owner: Mutex<Option<(ThreadId, usize)>>,
    released: Condvar,
}

impl CallbackGate {
    fn enter(&self) -> GateGuard<'_> {
        let me = thread::current().id();
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        while owner.is_some_and(|(id, _)| id != me) {
            owner = self
                .released
                .wait(owner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let depth = owner.map_or(0, |(_, depth)| depth);
        *owner = Some((me, depth + 1));
        GateGuard { gate: self }
    }
}

struct GateGuard<'a> {
    gate: &'a CallbackGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        let mut owner = self.gate.owner.lock().unwrap_or_else(PoisonError::into_inner);
        *owner = match *owner {
            Some((id, depth)) if depth > 1 => Some((id, depth - 1)),
            _ => None,
        };
        if owner.is_none() {
            self.gate.released.notify_all();
        }
    }
}

enum Settled<T> {
    Success(Option<T>),
    Failure(FetchError),
}

pub(crate) struct Shared<K, T> {
    state: Mutable<FetchState<T>>,
    slot: Mutex<Slot<K, T>>,
    // Parent of every request and timer token; cancelled on dispose.
    teardown: CancellationToken,
    callbacks: CallbackGate,
    on_error: Option<OnError>,
    on_success: Option<OnSuccess<T>>,
    on_loading: Option<OnLoading>,
}

impl<K, T> Shared<K, T>
where
    K: Key,
    T: Clone + Send + Sync + 'static,
{
    fn lock_slot(&self) -> MutexGuard<'_, Slot<K, T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `callback` unless the hook is disposed or attempt `generation` has
    /// been superseded. Holds the callback gate throughout, so once `dispose`
    /// returns no callback is running or will run.
    fn notify(&self, generation: u64, callback: impl FnOnce()) {
        let _gate = self.callbacks.enter();
        {
            let slot = self.lock_slot();
            if slot.disposed || slot.generation != generation {
                trace!("fetch #{} | callback skipped", generation);
                return;
            }
        }
        callback();
    }

    /// Starts an attempt if `key` is not structurally equal to the current one.
    pub(crate) fn observe_key(shared: &Arc<Self>, key: Arc<K>) -> Result<(), FetchError> {
        {
            let mut slot = shared.lock_slot();
            if slot.disposed {
                return Ok(());
            }
            let previous = slot.key.current();
            let stable = slot.key.stabilize_shared(key)?;
            if Arc::ptr_eq(&previous, &stable) {
                return Ok(());
            }
        }
        Self::start(shared, None);
        Ok(())
    }

    /// Enters `Loading`: cancels the previous attempt and any pending refetch,
    /// issues a new generation and spawns the fetcher.
    ///
    /// `timer` is the refetch timer that fired, if any. A timer that was
    /// cancelled after it woke up does not start anything.
    fn start(shared: &Arc<Self>, timer: Option<&CancellationToken>) {
        let (ctx, key, fetcher) = {
            let mut slot = shared.lock_slot();
            if slot.disposed || timer.is_some_and(CancellationToken::is_cancelled) {
                return;
            }
            slot.cancel_pending();
            slot.generation += 1;
            let ctx = RequestContext {
                generation: slot.generation,
                cancellation_token: shared.teardown.child_token(),
            };
            slot.request = Some(ctx.clone());
            shared.state.lock_mut().start_loading();
            (ctx, slot.key.current(), slot.fetcher.clone())
        };

        debug!("fetch #{} | started", ctx.generation);
        if let Some(on_loading) = &shared.on_loading {
            shared.notify(ctx.generation, || on_loading());
        }

        let shared = shared.clone();
        tokio::spawn(async move {
            let future = fetcher(FetcherContext {
                key,
                cancellation_token: ctx.cancellation_token.clone(),
            });
            let outcome = tokio::select! {
                biased;
                _ = ctx.cancellation_token.cancelled() => None,
                result = future => Some(result),
            };
            Self::resolve(&shared, &ctx, outcome);
        });
    }

    fn resolve(
        shared: &Arc<Self>,
        ctx: &RequestContext,
        outcome: Option<Result<Option<T>, FetchError>>,
    ) {
        let settled = {
            let mut slot = shared.lock_slot();
            if slot.disposed || slot.generation != ctx.generation {
                debug!("fetch #{} | stale, result discarded", ctx.generation);
                return;
            }
            slot.request = None;

            let outcome = match outcome {
                Some(outcome) if !ctx.cancellation_token.is_cancelled() => outcome,
                _ => {
                    debug!("fetch #{} | cancelled", ctx.generation);
                    shared.state.lock_mut().settle();
                    return;
                }
            };

            let settled = match outcome {
                Ok(data) => {
                    debug!("fetch #{} | succeeded", ctx.generation);
                    shared.state.lock_mut().succeed(data.clone());
                    Settled::Success(data)
                }
                Err(error) => {
                    debug!("fetch #{} | failed: {}", ctx.generation, error);
                    shared.state.lock_mut().fail(error.clone());
                    Settled::Failure(error)
                }
            };

            if let Some(interval) = slot.refetch_interval {
                Self::schedule_refetch(shared, &mut slot, interval);
            }
            settled
        };

        // Callbacks run outside the slot lock so they may call back into the hook.
        match settled {
            Settled::Success(data) => {
                if let Some(on_success) = &shared.on_success {
                    shared.notify(ctx.generation, || on_success(data.as_ref()));
                }
            }
            Settled::Failure(error) => {
                if let Some(on_error) = &shared.on_error {
                    shared.notify(ctx.generation, || on_error(&error));
                }
            }
        }
    }

    fn schedule_refetch(shared: &Arc<Self>, slot: &mut Slot<K, T>, interval: Duration) {
        let timer = shared.teardown.child_token();
        slot.refetch_timer = Some(timer.clone());
        let weak = Arc::downgrade(shared);
        trace!("refetch scheduled in {:?}", interval);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(interval) => {
                    if let Some(shared) = weak.upgrade() {
                        Self::start(&shared, Some(&timer));
                    }
                }
            }
        });
    }

    /// Waits for a callback running on another thread to return.
    fn dispose(&self) {
        let _gate = self.callbacks.enter();
        let mut slot = self.lock_slot();
        if slot.disposed {
            return;
        }
        slot.disposed = true;
        slot.cancel_pending();
        self.teardown.cancel();
        debug!("fetch hook disposed after {} attempt(s)", slot.generation);
    }
}

/// Fetches data for a key and refetches whenever the key changes.
///
/// Mounting happens in [`UseFetch::new`]: unless `initial_data` is given, the
/// first attempt starts right away and the state is
/// `{ data: None, error: None, is_loading: true }` when `new` returns.
/// [`UseFetch::set_key`] plays the role of a re-render; it only starts a new
/// attempt when the key serializes differently from the current one.
///
/// At most one attempt is live at a time. Starting a new one cancels the
/// previous attempt's token, and a result from any attempt other than the
/// latest is discarded whether or not the fetcher honored the token.
///
/// Dropping the hook disposes it. All methods must be called within a tokio
/// runtime.
///
/// ```
/// use easefetch::{FetchOptions, UseFetch};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let users: UseFetch<u32, String> = UseFetch::new(
///     |ctx| async move { Ok::<_, String>(format!("users?page={}", ctx.key)) },
///     1,
///     FetchOptions::new(),
/// )
/// .unwrap();
///
/// let state = users.await_settled().await.unwrap();
/// assert_eq!(state.data.as_deref(), Some("users?page=1"));
/// # }
/// ```
pub struct UseFetch<K, T>
where
    K: Key,
    T: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<K, T>>,
}

impl<K, T> UseFetch<K, T>
where
    K: Key,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut, R>(fetcher: F, key: K, options: FetchOptions<T>) -> Result<Self, FetchError>
    where
        F: Fn(FetcherContext<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: FetchResult<T> + 'static,
    {
        Ok(Self::mount(box_fetcher(fetcher), StableKey::new(key)?, options))
    }

    pub(crate) fn mount(
        fetcher: BoxedFetcher<K, T>,
        key: StableKey<K>,
        options: FetchOptions<T>,
    ) -> Self {
        let fetches_on_mount = options.fetches_on_mount();
        let FetchOptions {
            initial_data,
            refetch_interval,
            on_error,
            on_success,
            on_loading,
            ..
        } = options;

        let shared = Arc::new(Shared {
            state: Mutable::new(FetchState::with_data(initial_data)),
            slot: Mutex::new(Slot {
                key,
                fetcher,
                refetch_interval: refetch_interval.filter(|interval| !interval.is_zero()),
                generation: 0,
                request: None,
                refetch_timer: None,
                disposed: false,
            }),
            teardown: CancellationToken::new(),
            callbacks: CallbackGate::default(),
            on_error,
            on_success,
            on_loading,
        });

        if fetches_on_mount {
            Shared::start(&shared, None);
        } else {
            debug!("initial data present, skipping fetch on mount");
        }
        UseFetch { shared }
    }

    /// Observes a new key. Starts an attempt only if it differs structurally
    /// from the current key.
    pub fn set_key(&self, key: K) -> Result<(), FetchError> {
        Shared::observe_key(&self.shared, Arc::new(key))
    }

    /// Fetches again with the current key, cancelling any attempt in flight.
    pub fn refetch(&self) {
        Shared::start(&self.shared, None);
    }

    /// Replaces the fetcher used by later attempts. Does not fetch by itself.
    pub fn set_fetcher<F, Fut, R>(&self, fetcher: F)
    where
        F: Fn(FetcherContext<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: FetchResult<T> + 'static,
    {
        self.shared.lock_slot().fetcher = box_fetcher(fetcher);
    }

    /// Changes the polling interval. A different interval refetches right away
    /// with the current key; `None` or zero turns polling off.
    pub fn set_refetch_interval(&self, interval: Option<Duration>) {
        let interval = interval.filter(|interval| !interval.is_zero());
        {
            let mut slot = self.shared.lock_slot();
            if slot.disposed || slot.refetch_interval == interval {
                return;
            }
            slot.refetch_interval = interval;
        }
        Shared::start(&self.shared, None);
    }

    /// The current stabilized key.
    pub fn key(&self) -> Arc<K> {
        self.shared.lock_slot().key.current()
    }

    pub fn state(&self) -> FetchState<T> {
        self.shared.state.get_cloned()
    }

    pub fn data(&self) -> Option<T> {
        self.shared.state.lock_ref().data.clone()
    }

    pub fn error(&self) -> Option<FetchError> {
        self.shared.state.lock_ref().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.lock_ref().is_loading
    }

    pub fn to_signal(&self) -> MutableSignalCloned<FetchState<T>> {
        self.shared.state.signal_cloned()
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<FetchState<T>>> {
        self.shared.state.signal_cloned().to_stream()
    }

    /// Waits until no attempt is loading and returns that state.
    ///
    /// Returns [`FetchError::Cancelled`] if the hook is disposed first.
    pub async fn await_settled(&self) -> Result<FetchState<T>, FetchError> {
        let mut states = std::pin::pin!(self.to_stream());
        loop {
            tokio::select! {
                biased;
                _ = self.shared.teardown.cancelled() => return Err(FetchError::Cancelled),
                state = states.next() => match state {
                    Some(state) if state.is_settled() => return Ok(state),
                    Some(_) => {}
                    None => return Err(FetchError::Cancelled),
                },
            }
        }
    }

    /// Cancels the attempt in flight and any pending refetch. Once it returns,
    /// nothing mutates the state and no callback runs. A callback running on
    /// another thread is waited for. Calling it twice is harmless.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.teardown.is_cancelled()
    }

    pub(crate) fn downgrade(&self) -> Weak<Shared<K, T>> {
        Arc::downgrade(&self.shared)
    }
}

impl<K, T> Drop for UseFetch<K, T>
where
    K: Key,
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.shared.dispose();
    }
}
