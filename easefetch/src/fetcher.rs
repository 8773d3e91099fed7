use crate::{FetchError, FetchResult};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context handed to every fetcher call.
#[derive(Debug, Clone)]
pub struct FetcherContext<K> {
    /// The key this attempt was started for.
    pub key: Arc<K>,
    /// Cancelled as soon as the attempt is superseded or the hook is disposed.
    /// Honoring it is optional: stale results are discarded either way.
    pub cancellation_token: CancellationToken,
}

impl<K> FetcherContext<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}

pub(crate) type BoxedFetcher<K, T> =
    Arc<dyn Fn(FetcherContext<K>) -> BoxFuture<'static, Result<Option<T>, FetchError>> + Send + Sync>;

pub(crate) fn box_fetcher<K, T, R, F, Fut>(fetcher: F) -> BoxedFetcher<K, T>
where
    K: 'static,
    T: 'static,
    R: FetchResult<T> + 'static,
    F: Fn(FetcherContext<K>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    Arc::new(move |ctx| {
        let future = fetcher(ctx);
        async move { future.await.into_fetched() }.boxed()
    })
}
