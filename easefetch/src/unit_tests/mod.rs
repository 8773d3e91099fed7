use crate::{FetchState, Key, UseFetch};
use futures_signals::signal::SignalExt;

mod use_fetch_debounced_test;

/// Collects every observed state up to and including the first settled one.
pub async fn collect_until_settled<K, T>(hook: &UseFetch<K, T>) -> Vec<FetchState<T>>
where
    K: Key,
    T: Clone + Send + Sync + 'static,
{
    let mut state_vec = Vec::new();
    hook.to_signal()
        .stop_if(|state| state.is_settled())
        .for_each(|state| {
            state_vec.push(state);
            async {}
        })
        .await;
    state_vec
}
