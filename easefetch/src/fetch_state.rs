use crate::FetchError;

/// The observable state of a fetch hook.
///
/// `data` keeps the last successful result (or the injected initial data) across
/// later attempts, `error` is cleared whenever a new attempt starts, and
/// `is_loading` is true exactly while the current attempt is unresolved.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub error: Option<FetchError>,
    pub is_loading: bool,
}

/// Coarse view of a [`FetchState`], mostly useful for rendering and matching.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FetchStatus {
    /// Nothing fetched yet, or the last attempt was cancelled.
    Idle,
    Loading,
    Success,
    Failure,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        FetchState {
            data: None,
            error: None,
            is_loading: false,
        }
    }
}

impl<T> FetchState<T> {
    /// A settled state seeded with `data`.
    pub fn with_data(data: Option<T>) -> Self {
        FetchState {
            data,
            error: None,
            is_loading: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// True once the current attempt has resolved, failed or been cancelled.
    pub fn is_settled(&self) -> bool {
        !self.is_loading
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn data_ref(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error_ref(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn status(&self) -> FetchStatus {
        if self.is_loading {
            FetchStatus::Loading
        } else if self.error.is_some() {
            FetchStatus::Failure
        } else if self.data.is_some() {
            FetchStatus::Success
        } else {
            FetchStatus::Idle
        }
    }

    pub(crate) fn start_loading(&mut self) {
        self.error = None;
        self.is_loading = true;
    }

    pub(crate) fn succeed(&mut self, data: Option<T>) {
        self.data = data;
        self.is_loading = false;
    }

    pub(crate) fn fail(&mut self, error: FetchError) {
        self.error = Some(error);
        self.is_loading = false;
    }

    pub(crate) fn settle(&mut self) {
        self.is_loading = false;
    }
}
