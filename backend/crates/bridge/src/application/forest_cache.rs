//! Forest Metadata Cache
//!
//! Forest schemas keyed by (client, root domain). Hits take a read lock
//! only. A miss registers one shared load per key; every caller for that
//! key awaits the same load and sees the same schema or the same error.
//! Failed loads leave nothing behind, so the next call retries.
//! Entries never expire; [`ForestCache::invalidate`] drops one on demand.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::domain::entity::forest_schema::ForestSchema;
use crate::domain::value_object::identity::Identity;
use crate::error::{BridgeError, BridgeResult};

type LoadResult = Result<Arc<ForestSchema>, Arc<BridgeError>>;
type InFlightLoad = Shared<BoxFuture<'static, LoadResult>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    client_name: String,
    root_domain: String,
}

impl CacheKey {
    fn new(client_name: &str, root_domain: &Identity) -> Self {
        Self {
            client_name: client_name.to_ascii_lowercase(),
            root_domain: root_domain.name().to_ascii_lowercase(),
        }
    }
}

#[derive(Default)]
struct Inner {
    ready: RwLock<HashMap<CacheKey, Arc<ForestSchema>>>,
    in_flight: Mutex<HashMap<CacheKey, InFlightLoad>>,
}

impl Inner {
    fn lookup(&self, key: &CacheKey) -> Option<Arc<ForestSchema>> {
        self.ready
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[derive(Clone, Default)]
pub struct ForestCache {
    inner: Arc<Inner>,
}

impl ForestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached schema, or the result of `loader` run once for this key
    pub async fn get<F, Fut>(
        &self,
        client_name: &str,
        root_domain: &Identity,
        loader: F,
    ) -> BridgeResult<Arc<ForestSchema>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BridgeResult<ForestSchema>> + Send + 'static,
    {
        let key = CacheKey::new(client_name, root_domain);

        if let Some(schema) = self.inner.lookup(&key) {
            return Ok(schema);
        }

        let load = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            // a load may have finished between the read above and this lock
            if let Some(schema) = self.inner.lookup(&key) {
                return Ok(schema);
            }

            match in_flight.get(&key) {
                Some(load) => load.clone(),
                None => {
                    tracing::debug!(
                        client = %client_name,
                        root_domain = %root_domain,
                        "Loading forest schema"
                    );
                    let load = Self::start_load(self.inner.clone(), key.clone(), loader());
                    in_flight.insert(key, load.clone());
                    load
                }
            }
        };

        load.await.map_err(|source| BridgeError::ForestUnavailable {
            root_domain: root_domain.name().to_string(),
            source,
        })
    }

    fn start_load<Fut>(inner: Arc<Inner>, key: CacheKey, load: Fut) -> InFlightLoad
    where
        Fut: Future<Output = BridgeResult<ForestSchema>> + Send + 'static,
    {
        async move {
            let result = load.await.map(Arc::new).map_err(Arc::new);

            let mut in_flight = inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Ok(schema) = &result {
                inner
                    .ready
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.clone(), schema.clone());
            }
            in_flight.remove(&key);

            result
        }
        .boxed()
        .shared()
    }

    /// Drop a cached schema so the next lookup reloads it
    pub fn invalidate(&self, client_name: &str, root_domain: &Identity) -> bool {
        let key = CacheKey::new(client_name, root_domain);
        self.inner
            .ready
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }

    /// Number of cached schemas
    pub fn len(&self) -> usize {
        self.inner
            .ready
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
