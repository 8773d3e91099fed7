use crate::common::{create_error, create_response, render, render_until_settled};
use easefetch::{FetchOptions, UseFetch};
use std::time::Duration;
use tokio::time::sleep;

mod common;

#[tokio::test]
async fn should_resolve_fetcher() {
    let hook = UseFetch::new(
        |_| create_response("I am a response".to_string()),
        Vec::<u32>::new(),
        FetchOptions::new(),
    )
    .unwrap();

    let frames = render_until_settled(&hook).await;
    assert_eq!(
        frames,
        vec![
            "data: null | error: null | isLoading: yes",
            "data: I am a response | error: null | isLoading: no",
        ]
    );
}

#[tokio::test]
async fn should_reject_fetcher() {
    let hook: UseFetch<Vec<u32>, String> = UseFetch::new(
        |_| create_error("Failed to fetch"),
        Vec::new(),
        FetchOptions::new(),
    )
    .unwrap();

    let frames = render_until_settled(&hook).await;
    assert_eq!(
        frames,
        vec![
            "data: null | error: null | isLoading: yes",
            "data: null | error: Failed to fetch | isLoading: no",
        ]
    );
}

#[tokio::test]
async fn should_be_loading_when_fetcher_is_busy() {
    let hook = UseFetch::new(
        |_| create_response(String::new()),
        Vec::<u32>::new(),
        FetchOptions::new(),
    )
    .unwrap();

    assert!(hook.is_loading());
    sleep(Duration::from_millis(100)).await;
    assert!(!hook.is_loading());
}

#[tokio::test]
async fn should_start_with_initial_data() {
    let hook = UseFetch::new(
        |_| create_response("from network".to_string()),
        "user-123",
        FetchOptions::new().initial_data("from server".to_string()),
    )
    .unwrap();

    assert_eq!(
        render(&hook.state()),
        "data: from server | error: null | isLoading: no"
    );
    sleep(Duration::from_millis(50)).await;
    assert_eq!(
        render(&hook.state()),
        "data: from server | error: null | isLoading: no"
    );
}

#[tokio::test]
async fn should_follow_key_changes_in_order() {
    let hook = UseFetch::new(
        |ctx| async move {
            // Earlier pages answer later, so completions arrive out of order
            let page: u64 = *ctx.key;
            sleep(Duration::from_millis(60 - page * 10)).await;
            Ok::<_, String>(format!("page {}", page))
        },
        1u64,
        FetchOptions::new(),
    )
    .unwrap();

    hook.set_key(2).unwrap();
    hook.set_key(3).unwrap();
    let state = hook.await_settled().await.unwrap();
    assert_eq!(state.data.as_deref(), Some("page 3"));

    sleep(Duration::from_millis(100)).await;
    assert_eq!(
        render(&hook.state()),
        "data: page 3 | error: null | isLoading: no"
    );
}

#[tokio::test]
async fn should_not_mutate_after_teardown() {
    let hook = UseFetch::new(
        |_| create_response("too late".to_string()),
        (),
        FetchOptions::new(),
    )
    .unwrap();

    let frame = render(&hook.state());
    hook.dispose();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(render(&hook.state()), frame);
}
