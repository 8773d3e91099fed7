use crate::mock::MockFetcher;
use crate::{DebounceOptions, FetchOptions, UseFetchDebounced};
use std::time::Duration;
use tokio::time::sleep;

fn first_element() -> MockFetcher<Vec<u32>, String> {
    MockFetcher::new(|key: &Vec<u32>| Ok(key[0].to_string()))
}

fn called_with(mock: &MockFetcher<Vec<u32>, String>) -> Vec<u32> {
    mock.calls().iter().map(|key| key[0]).collect()
}

// Test rapid key changes collapse into one fetch
#[tokio::test]
async fn test_debounce() {
    let mock = first_element();
    let hook = UseFetchDebounced::new(
        mock.fetcher(),
        vec![1],
        DebounceOptions::new(Duration::from_millis(500)),
    )
    .unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(hook.data().as_deref(), Some("1"));

    hook.set_key(vec![2]).unwrap();
    sleep(Duration::from_millis(100)).await;

    hook.set_key(vec![3]).unwrap();
    assert!(hook.is_pending());
    assert_eq!(*hook.pending_key(), vec![3]);
    assert_eq!(*hook.key(), vec![1]);

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(hook.data().as_deref(), Some("3"));
    assert!(!hook.is_pending());
    assert_eq!(*hook.key(), vec![3]);
    assert_eq!(called_with(&mock), vec![1, 3]);
}

// Test the first key is fetched without waiting
#[tokio::test]
async fn test_first_key_is_immediate() {
    let mock = first_element();
    let hook = UseFetchDebounced::new(
        mock.fetcher(),
        vec![7],
        DebounceOptions::new(Duration::from_secs(3600)),
    )
    .unwrap();

    assert!(hook.is_loading());
    let state = hook.await_settled().await.unwrap();
    assert_eq!(state.data.as_deref(), Some("7"));
}

// Test an equal key does not restart the timer
#[tokio::test]
async fn test_equal_key_is_ignored() {
    let mock = first_element();
    let hook = UseFetchDebounced::new(
        mock.fetcher(),
        vec![1],
        DebounceOptions::new(Duration::from_millis(20)),
    )
    .unwrap();
    hook.await_settled().await.unwrap();

    hook.set_key(vec![1]).unwrap();
    assert!(!hook.is_pending());
    sleep(Duration::from_millis(60)).await;
    assert_eq!(called_with(&mock), vec![1]);
}

// Test returning to the effective key within the delay fetches nothing
#[tokio::test]
async fn test_key_bounces_back() {
    let mock = first_element();
    let hook = UseFetchDebounced::new(
        mock.fetcher(),
        vec![1],
        DebounceOptions::new(Duration::from_millis(30)),
    )
    .unwrap();
    hook.await_settled().await.unwrap();

    hook.set_key(vec![2]).unwrap();
    hook.set_key(vec![1]).unwrap();
    assert!(hook.is_pending());
    sleep(Duration::from_millis(100)).await;

    assert_eq!(called_with(&mock), vec![1]);
    assert_eq!(hook.data().as_deref(), Some("1"));
}

// Test dispose cancels a pending key change
#[tokio::test]
async fn test_dispose_cancels_pending_key() {
    let mock = first_element();
    let hook = UseFetchDebounced::new(
        mock.fetcher(),
        vec![1],
        DebounceOptions::new(Duration::from_millis(30)),
    )
    .unwrap();
    hook.await_settled().await.unwrap();

    hook.set_key(vec![2]).unwrap();
    hook.dispose();
    assert!(hook.is_disposed());
    assert!(hook.inner().is_disposed());
    assert!(!hook.is_pending());

    sleep(Duration::from_millis(100)).await;
    assert_eq!(called_with(&mock), vec![1]);

    hook.set_key(vec![3]).unwrap();
    assert!(!hook.is_pending());
}

// Test drop cancels a pending key change
#[tokio::test]
async fn test_drop_cancels_pending_key() {
    let mock = first_element();
    let hook = UseFetchDebounced::new(
        mock.fetcher(),
        vec![1],
        DebounceOptions::new(Duration::from_millis(30)),
    )
    .unwrap();
    hook.await_settled().await.unwrap();

    hook.set_key(vec![2]).unwrap();
    drop(hook);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(called_with(&mock), vec![1]);
}

// Test changing the delay reschedules the pending key
#[tokio::test]
async fn test_set_debounce_delay() {
    let mock = first_element();
    let hook = UseFetchDebounced::new(
        mock.fetcher(),
        vec![1],
        DebounceOptions::new(Duration::from_secs(3600)),
    )
    .unwrap();
    hook.await_settled().await.unwrap();

    hook.set_key(vec![2]).unwrap();
    hook.set_debounce_delay(Duration::from_millis(20));
    sleep(Duration::from_millis(150)).await;

    assert_eq!(called_with(&mock), vec![1, 2]);
    assert_eq!(hook.data().as_deref(), Some("2"));
}

// Test fetch options pass through to the inner hook
#[tokio::test]
async fn test_fetch_options_pass_through() {
    let mock = first_element();
    let hook = UseFetchDebounced::new(
        mock.fetcher(),
        vec![1],
        DebounceOptions::new(Duration::from_millis(20))
            .with_fetch_options(FetchOptions::new().initial_data("ssr".to_string())),
    )
    .unwrap();

    assert!(!hook.is_loading());
    assert_eq!(hook.data().as_deref(), Some("ssr"));

    hook.refetch();
    let state = hook.await_settled().await.unwrap();
    assert_eq!(state.data.as_deref(), Some("1"));
    assert_eq!(called_with(&mock), vec![1]);
}
