use crate::tracing_setup::tracing_init;
use easefetch::{FetchError, FetchOptions, FetcherContext, UseFetch};
use futures_signals::signal::SignalExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

mod tracing_setup;

const PAGE_SIZE: u32 = 3;
const LAST_PAGE: u32 = 5;

#[derive(Debug, Clone)]
struct User {
    id: String,
}

/// Simulated users endpoint. Pages past the last one are rejected.
async fn fetch_users(ctx: FetcherContext<u32>) -> Result<Vec<User>, String> {
    let page = *ctx.key;
    debug!("Worker | GET /users?page={}&limit={}", page, PAGE_SIZE);
    tokio::select! {
        _ = ctx.cancellation_token.cancelled() => {
            debug!("Worker | page {} aborted", page);
            return Err("aborted".to_string());
        }
        _ = sleep(Duration::from_millis(300)) => {}
    }
    if page > LAST_PAGE {
        return Err("This is an error".to_string());
    }
    Ok((0..PAGE_SIZE)
        .map(|i| User {
            id: ((page - 1) * PAGE_SIZE + i + 1).to_string(),
        })
        .collect())
}

async fn click_through(users: &UseFetch<u32, Vec<User>>) -> Result<(), FetchError> {
    sleep(Duration::from_millis(500)).await;
    warn!("Clicks | page 2, then page 3 before page 2 arrives");
    users.set_key(2)?;
    sleep(Duration::from_millis(100)).await;
    users.set_key(3)?;

    sleep(Duration::from_millis(500)).await;
    warn!("Clicks | refresh");
    users.refetch();

    for page in 4..=LAST_PAGE + 1 {
        sleep(Duration::from_millis(500)).await;
        warn!("Clicks | page {}", page);
        users.set_key(page)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init();

    let users = Arc::new(UseFetch::new(
        fetch_users,
        1,
        FetchOptions::new()
            .on_error(|e| error!("  Main | fetch failed: {}", e))
            .on_success(|users: Option<&Vec<User>>| {
                info!("  Main | fetched {} user(s)", users.map_or(0, Vec::len))
            }),
    )?);

    let users_clone = users.clone();
    tokio::spawn(async move {
        if let Err(e) = click_through(&users_clone).await {
            error!("Clicks | {}", e);
        }
    });

    users
        .to_signal()
        .stop_if(|state| state.has_error())
        .for_each(|state| {
            let ids: Vec<&str> = state
                .data
                .iter()
                .flatten()
                .map(|user| user.id.as_str())
                .collect();
            info!(
                "  Main | isLoading: {} | data: {:?} | error: {:?}",
                if state.is_loading { "yes" } else { "no" },
                ids,
                state.error
            );
            async {}
        })
        .await;

    users.dispose();
    info!("  Main | Finish");
    Ok(())
}
