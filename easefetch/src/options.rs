use crate::FetchError;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type OnError = Arc<dyn Fn(&FetchError) + Send + Sync>;
pub type OnSuccess<T> = Arc<dyn Fn(Option<&T>) + Send + Sync>;
pub type OnLoading = Arc<dyn Fn() + Send + Sync>;

/// Options for [`UseFetch`](crate::UseFetch).
///
/// ```
/// use easefetch::FetchOptions;
/// use std::time::Duration;
///
/// let options = FetchOptions::new()
///     .initial_data(vec!["cached".to_string()])
///     .refetch_interval(Duration::from_secs(3))
///     .on_error(|error| eprintln!("fetch failed: {error}"));
/// assert!(!options.fetch_on_mount);
/// ```
pub struct FetchOptions<T> {
    /// Seed for `data`. Also skips the fetch on mount unless `fetch_on_mount`
    /// is set; the seed is assumed to match the initial key.
    pub initial_data: Option<T>,
    /// Fetch on mount even when `initial_data` is present.
    pub fetch_on_mount: bool,
    /// Fetch again this long after each completed attempt. Zero disables it.
    pub refetch_interval: Option<Duration>,
    pub on_error: Option<OnError>,
    pub on_success: Option<OnSuccess<T>>,
    pub on_loading: Option<OnLoading>,
}

impl<T> FetchOptions<T> {
    pub fn new() -> Self {
        FetchOptions {
            initial_data: None,
            fetch_on_mount: false,
            refetch_interval: None,
            on_error: None,
            on_success: None,
            on_loading: None,
        }
    }

    pub fn initial_data(self, data: T) -> Self {
        Self {
            initial_data: Some(data),
            ..self
        }
    }

    pub fn fetch_on_mount(self, fetch_on_mount: bool) -> Self {
        Self {
            fetch_on_mount,
            ..self
        }
    }

    pub fn refetch_interval(self, interval: Duration) -> Self {
        Self {
            refetch_interval: Some(interval),
            ..self
        }
    }

    pub fn on_error<F>(self, callback: F) -> Self
    where
        F: Fn(&FetchError) + Send + Sync + 'static,
    {
        Self {
            on_error: Some(Arc::new(callback)),
            ..self
        }
    }

    pub fn on_success<F>(self, callback: F) -> Self
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        Self {
            on_success: Some(Arc::new(callback)),
            ..self
        }
    }

    pub fn on_loading<F>(self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            on_loading: Some(Arc::new(callback)),
            ..self
        }
    }

    /// Whether mounting should start a fetch right away.
    pub(crate) fn fetches_on_mount(&self) -> bool {
        self.initial_data.is_none() || self.fetch_on_mount
    }
}

impl<T> Default for FetchOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for FetchOptions<T> {
    fn clone(&self) -> Self {
        FetchOptions {
            initial_data: self.initial_data.clone(),
            fetch_on_mount: self.fetch_on_mount,
            refetch_interval: self.refetch_interval,
            on_error: self.on_error.clone(),
            on_success: self.on_success.clone(),
            on_loading: self.on_loading.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FetchOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("initial_data", &self.initial_data)
            .field("fetch_on_mount", &self.fetch_on_mount)
            .field("refetch_interval", &self.refetch_interval)
            .field("on_error", &self.on_error.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_loading", &self.on_loading.is_some())
            .finish()
    }
}

/// Options for [`UseFetchDebounced`](crate::UseFetchDebounced).
pub struct DebounceOptions<T> {
    /// How long a key change is held before it is acted on.
    pub debounce_delay: Duration,
    pub fetch: FetchOptions<T>,
}

impl<T> DebounceOptions<T> {
    pub fn new(debounce_delay: Duration) -> Self {
        DebounceOptions {
            debounce_delay,
            fetch: FetchOptions::new(),
        }
    }

    pub fn with_fetch_options(self, fetch: FetchOptions<T>) -> Self {
        Self { fetch, ..self }
    }
}

impl<T> Default for DebounceOptions<T> {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl<T: fmt::Debug> fmt::Debug for DebounceOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceOptions")
            .field("debounce_delay", &self.debounce_delay)
            .field("fetch", &self.fetch)
            .finish()
    }
}

/// Serializable subset of [`FetchOptions`]. Intervals are in seconds.
///
/// ```
/// use easefetch::FetchConfig;
///
/// let config = FetchConfig::from_json(r#"{ "refetch_interval_secs": 2.5 }"#).unwrap();
/// let options = config.into_options::<String>().unwrap();
/// assert_eq!(options.refetch_interval, Some(std::time::Duration::from_millis(2500)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub fetch_on_mount: bool,
    pub refetch_interval_secs: Option<f64>,
}

impl FetchConfig {
    pub fn from_json(json: &str) -> Result<Self, FetchError> {
        serde_json::from_str(json).map_err(|e| FetchError::Config(e.to_string()))
    }

    pub fn into_options<T>(self) -> Result<FetchOptions<T>, FetchError> {
        let refetch_interval = match self.refetch_interval_secs {
            Some(secs) => Some(secs_to_duration("refetch_interval_secs", secs)?)
                .filter(|interval| !interval.is_zero()),
            None => None,
        };
        Ok(FetchOptions {
            fetch_on_mount: self.fetch_on_mount,
            refetch_interval,
            ..FetchOptions::new()
        })
    }
}

/// Serializable subset of [`DebounceOptions`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DebounceConfig {
    pub debounce_delay_secs: f64,
    #[serde(flatten)]
    pub fetch: FetchConfig,
}

impl DebounceConfig {
    pub fn from_json(json: &str) -> Result<Self, FetchError> {
        serde_json::from_str(json).map_err(|e| FetchError::Config(e.to_string()))
    }

    pub fn into_options<T>(self) -> Result<DebounceOptions<T>, FetchError> {
        let debounce_delay = secs_to_duration("debounce_delay_secs", self.debounce_delay_secs)?;
        Ok(DebounceOptions::new(debounce_delay).with_fetch_options(self.fetch.into_options()?))
    }
}

fn secs_to_duration(field: &str, secs: f64) -> Result<Duration, FetchError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| FetchError::Config(format!("{}: {}", field, e)))
}
