mod fetch_error;
mod fetch_result;
mod fetch_state;
mod fetcher;
mod options;
mod stable_key;
mod use_fetch;
mod use_fetch_debounced;
pub mod mock;

#[cfg(test)]
mod unit_tests;

pub use fetch_error::*;
pub use fetch_result::*;
pub use fetch_state::*;
pub use fetcher::FetcherContext;
pub use options::*;
pub use stable_key::*;
pub use use_fetch::UseFetch;
pub use use_fetch_debounced::*;
