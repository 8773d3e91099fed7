use easefetch::{FetchState, Key, UseFetch};
use futures_signals::signal::SignalExt;
use std::time::Duration;

/// Resolves with `response` after 10ms, like a quick network round trip.
pub async fn create_response<T>(response: T) -> Result<T, String> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(response)
}

/// Rejects with `message` after 10ms.
pub async fn create_error<T>(message: &str) -> Result<T, String> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    Err(message.to_string())
}

/// Renders a state the way a view would print it.
pub fn render<T: std::fmt::Display>(state: &FetchState<T>) -> String {
    let data = state
        .data
        .as_ref()
        .map_or("null".to_string(), |data| data.to_string());
    let error = state
        .error
        .as_ref()
        .map_or("null".to_string(), |error| error.to_string());
    format!(
        "data: {} | error: {} | isLoading: {}",
        data,
        error,
        if state.is_loading { "yes" } else { "no" }
    )
}

/// Every rendered frame until the hook settles.
pub async fn render_until_settled<K, T>(hook: &UseFetch<K, T>) -> Vec<String>
where
    K: Key,
    T: Clone + Send + Sync + std::fmt::Display + 'static,
{
    let mut frames = Vec::new();
    hook.to_signal()
        .stop_if(|state| state.is_settled())
        .for_each(|state| {
            frames.push(render(&state));
            async {}
        })
        .await;
    frames
}
