use crate::FetchError;

/// Conversion from whatever a fetcher resolves with into the hook's outcome.
///
/// `Ok(None)` is a successful fetch that produced no value; the hook's `data`
/// becomes `None` in that case.
pub trait FetchResult<T> {
    fn into_fetched(self) -> Result<Option<T>, FetchError>;
}

impl<T, E> FetchResult<T> for Result<T, E>
where
    E: ToString,
{
    fn into_fetched(self) -> Result<Option<T>, FetchError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(error) => Err(FetchError::Fetch(error.to_string())),
        }
    }
}

impl<T> FetchResult<T> for Option<T> {
    fn into_fetched(self) -> Result<Option<T>, FetchError> {
        Ok(self)
    }
}
