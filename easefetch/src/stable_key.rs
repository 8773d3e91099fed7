use crate::FetchError;
use serde::Serialize;
use std::sync::Arc;
use tracing::trace;

/// Anything that can identify a fetch: strings, tuples, vectors, structs, maps.
///
/// Keys are compared by their JSON serialization, never by address.
pub trait Key: Serialize + Send + Sync + 'static {}
impl<K> Key for K where K: Serialize + Send + Sync + 'static {}

/// Memoizes a key by structural equality.
///
/// `stabilize` hands back the previously stored `Arc` as long as the new key
/// serializes to the same JSON text, so callers can detect real changes with
/// [`Arc::ptr_eq`]. Maps that serialize in insertion order compare unequal when
/// their entries were inserted in a different order.
#[derive(Debug)]
pub struct StableKey<K> {
    current: Arc<K>,
    serialized: String,
}

impl<K: Key> StableKey<K> {
    pub fn new(key: K) -> Result<Self, FetchError> {
        Self::from_shared(Arc::new(key))
    }

    pub fn from_shared(current: Arc<K>) -> Result<Self, FetchError> {
        let serialized = serde_json::to_string(current.as_ref())?;
        Ok(StableKey {
            current,
            serialized,
        })
    }

    /// Returns the stored key if `key` is structurally equal to it, otherwise
    /// stores and returns `key`.
    pub fn stabilize(&mut self, key: K) -> Result<Arc<K>, FetchError> {
        self.stabilize_shared(Arc::new(key))
    }

    /// Same as [`StableKey::stabilize`] for a key that is already shared.
    pub fn stabilize_shared(&mut self, key: Arc<K>) -> Result<Arc<K>, FetchError> {
        if Arc::ptr_eq(&key, &self.current) {
            return Ok(key);
        }
        let serialized = serde_json::to_string(key.as_ref())?;
        if serialized == self.serialized {
            trace!("key unchanged: {}", serialized);
        } else {
            trace!("key changed: {} -> {}", self.serialized, serialized);
            self.current = key;
            self.serialized = serialized;
        }
        Ok(self.current.clone())
    }

    pub fn current(&self) -> Arc<K> {
        self.current.clone()
    }

    /// The JSON text the current key is compared by.
    pub fn serialized(&self) -> &str {
        &self.serialized
    }
}
