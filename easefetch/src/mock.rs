//! A scriptable fetcher for tests and demos.
//!
//! [`MockFetcher`] answers after a fixed delay (10ms unless changed), first from
//! a queue of scripted responses and then from a responder function. It
//! records every key it was called with.

use crate::{FetcherContext, Key};
use futures::future::{BoxFuture, FutureExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(10);

type Responder<K, T> = Box<dyn Fn(&K) -> Result<T, String> + Send + Sync>;

struct MockInner<K, T> {
    responder: Responder<K, T>,
    queued: Mutex<VecDeque<Result<T, String>>>,
    calls: Mutex<Vec<Arc<K>>>,
    completed: AtomicUsize,
}

impl<K, T> MockInner<K, T> {
    fn lock_queued(&self) -> MutexGuard<'_, VecDeque<Result<T, String>>> {
        self.queued.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<Arc<K>>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(&self, key: &K) -> Result<T, String> {
        let queued = self.lock_queued().pop_front();
        queued.unwrap_or_else(|| (self.responder)(key))
    }
}

/// Mock fetcher. Clones share the same script and call history.
pub struct MockFetcher<K, T> {
    inner: Arc<MockInner<K, T>>,
    delay: Duration,
}

impl<K, T> Clone for MockFetcher<K, T> {
    fn clone(&self) -> Self {
        MockFetcher {
            inner: self.inner.clone(),
            delay: self.delay,
        }
    }
}

impl<K, T> MockFetcher<K, T>
where
    K: Key,
    T: Clone + Send + Sync + 'static,
{
    /// Answers every call with `responder(key)` unless a response is queued.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&K) -> Result<T, String> + Send + Sync + 'static,
    {
        MockFetcher {
            inner: Arc::new(MockInner {
                responder: Box::new(responder),
                queued: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
                completed: AtomicUsize::new(0),
            }),
            delay: DEFAULT_DELAY,
        }
    }

    pub fn resolving(value: T) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    pub fn rejecting(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_| Err(message.clone()))
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    /// Queues a response for the next call, ahead of the responder.
    pub fn push_response(&self, response: Result<T, String>) {
        self.inner.lock_queued().push_back(response);
    }

    /// Every key the fetcher was called with, oldest first.
    pub fn calls(&self) -> Vec<Arc<K>> {
        self.inner.lock_calls().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock_calls().len()
    }

    /// Calls that ran to the end of their delay and produced a response.
    pub fn completed_count(&self) -> usize {
        self.inner.completed.load(Ordering::SeqCst)
    }

    /// The fetcher to hand to [`UseFetch`](crate::UseFetch) or
    /// [`UseFetchDebounced`](crate::UseFetchDebounced).
    pub fn fetcher(
        &self,
    ) -> impl Fn(FetcherContext<K>) -> BoxFuture<'static, Result<T, String>> + Send + Sync + 'static
    {
        let inner = self.inner.clone();
        let delay = self.delay;
        move |ctx: FetcherContext<K>| {
            let inner = inner.clone();
            inner.lock_calls().push(ctx.key.clone());
            async move {
                sleep(delay).await;
                let response = inner.next_response(&ctx.key);
                inner.completed.fetch_add(1, Ordering::SeqCst);
                response
            }
            .boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn context<K>(key: K) -> FetcherContext<K> {
        FetcherContext {
            key: Arc::new(key),
            cancellation_token: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn test_resolving() {
        let mock = MockFetcher::resolving("I am a response".to_string());
        let fetcher = mock.fetcher();

        let response = fetcher(context(())).await;
        assert_eq!(response, Ok("I am a response".to_string()));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.completed_count(), 1);
    }

    #[tokio::test]
    async fn test_rejecting() {
        let mock: MockFetcher<(), u8> = MockFetcher::rejecting("Failed to fetch");
        let response = (mock.fetcher())(context(())).await;
        assert_eq!(response, Err("Failed to fetch".to_string()));
    }

    #[tokio::test]
    async fn test_queued_responses_come_first() {
        let mock = MockFetcher::new(|key: &Vec<u32>| Ok(key[0]));
        mock.push_response(Err("first".to_string()));
        mock.push_response(Ok(99));
        let fetcher = mock.fetcher();

        assert_eq!(fetcher(context(vec![1])).await, Err("first".to_string()));
        assert_eq!(fetcher(context(vec![2])).await, Ok(99));
        assert_eq!(fetcher(context(vec![3])).await, Ok(3));

        let keys: Vec<u32> = mock.calls().iter().map(|key| key[0]).collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_call_recorded_before_delay() {
        let mock = MockFetcher::resolving(1u8).with_delay(Duration::from_secs(60));
        let future = (mock.fetcher())(context("slow"));
        assert_eq!(mock.call_count(), 1);
        drop(future);
        assert_eq!(mock.completed_count(), 0);
    }
}
