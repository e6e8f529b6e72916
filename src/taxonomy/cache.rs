/// Single-flight resolution cache backing the taxonomy client
use crate::Result;
use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A keyed cache where concurrent misses on one key run the loader at
/// most once; all other callers wait on the same in-flight load.
///
/// A failed load leaves the slot unpopulated, so a later call may retry.
/// Successful values are retained for the life of the cache.
pub struct SingleFlightCache<K, V> {
    slots: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Return the cached value for `key`, or run `loader` to populate it.
    pub async fn get_or_populate<F, Fut>(&self, key: K, loader: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        // Clone the slot out so the map shard lock is not held across await.
        let cell = {
            self.slots
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value()
                .clone()
        };
        let value = cell.get_or_try_init(loader).await?;
        Ok(value.clone())
    }

    /// Peek without loading.
    pub fn get(&self, key: &K) -> Option<V> {
        self.slots
            .get(key)
            .and_then(|slot| slot.get().cloned())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&self) {
        self.slots.clear();
    }
}

impl<K, V> Default for SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
