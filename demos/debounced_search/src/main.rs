use crate::tracing_setup::tracing_init;
use easefetch::{DebounceConfig, FetchError, FetcherContext, UseFetchDebounced};
use futures_signals::signal::SignalExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

mod tracing_setup;

const CRATES: &[&str] = &[
    "tokio",
    "tokio-util",
    "tokio-stream",
    "tracing",
    "tracing-subscriber",
    "futures",
    "futures-signals",
    "serde",
    "serde_json",
    "thiserror",
];

const CONFIG: &str = r#"{ "debounce_delay_secs": 0.3 }"#;

#[derive(Debug, Clone, Serialize)]
struct SearchKey {
    query: String,
    limit: usize,
}

#[derive(Debug, Clone)]
struct SearchResults {
    query: String,
    hits: Vec<&'static str>,
}

async fn search(ctx: FetcherContext<SearchKey>) -> Result<SearchResults, String> {
    let SearchKey { query, limit } = ctx.key().clone();
    debug!("Worker | searching for {:?}", query);
    sleep(Duration::from_millis(150)).await;
    let hits = CRATES
        .iter()
        .copied()
        .filter(|name| name.starts_with(query.as_str()))
        .take(limit)
        .collect();
    Ok(SearchResults { query, hits })
}

async fn type_query(
    search_box: &UseFetchDebounced<SearchKey, SearchResults>,
    final_query: &str,
) -> Result<(), FetchError> {
    sleep(Duration::from_millis(500)).await;
    let mut query = String::new();
    for c in final_query.chars() {
        query.push(c);
        warn!("Typing | {:?}", query);
        search_box.set_key(SearchKey {
            query: query.clone(),
            limit: 5,
        })?;
        sleep(Duration::from_millis(80)).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init();

    let options = DebounceConfig::from_json(CONFIG)?.into_options()?;
    let search_box = Arc::new(UseFetchDebounced::new(
        search,
        SearchKey {
            query: String::new(),
            limit: 5,
        },
        options,
    )?);

    let final_query = "tokio-";
    let search_box_clone = search_box.clone();
    tokio::spawn(async move {
        if let Err(e) = type_query(&search_box_clone, final_query).await {
            error!("Typing | {}", e);
        }
    });

    search_box
        .to_signal()
        .stop_if(|state| {
            state
                .data
                .as_ref()
                .is_some_and(|results| results.query == final_query)
        })
        .for_each(|state| {
            match &state.data {
                Some(results) if !state.is_loading => {
                    info!("  Main | {:?} -> {:?}", results.query, results.hits)
                }
                _ => info!("  Main | searching..."),
            }
            async {}
        })
        .await;

    search_box.dispose();
    info!("  Main | Finish");
    Ok(())
}
