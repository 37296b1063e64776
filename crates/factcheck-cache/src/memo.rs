//! Memoization with stampede control.
//!
//! Concurrent callers that miss on the same canonical key share one
//! computation. The computation runs on its own task, so a waiter that is
//! dropped (timeout, client disconnect) never cancels it for the others.
//! Only the computation's own success or failure reaches the waiters.
//! [`CacheService::close`] waits for running computations to store their
//! results.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec;
use crate::error::CacheError;
use crate::key::{CacheKey, MemoKey};
use crate::service::CacheService;

type SharedComputation = Shared<BoxFuture<'static, Result<Arc<Vec<u8>>, CacheError>>>;

/// Canonical key → the single pending computation for it.
#[derive(Default)]
pub(crate) struct InFlightRegistry {
    pending: DashMap<String, SharedComputation>,
}

impl InFlightRegistry {
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Removes the registry entry when the computation task ends, including
/// on error or panic.
struct InFlightGuard {
    service: CacheService,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.service.inner.in_flight.pending.remove(&self.key);
    }
}

impl CacheService {
    /// Return the cached value for `key`, or run `compute` exactly once
    /// across all concurrent callers and cache its result with `ttl`.
    ///
    /// A failing computation is not cached; every waiter receives the same
    /// `CacheError::Computation`.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        namespace: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        if let Some(bytes) = self.get_raw(key, namespace).await {
            return codec::decode(&bytes);
        }

        let canonical = CacheKey::new(namespace, key)?.canonical();
        // Built outside the shard lock; dropped unpolled if another caller wins
        let work = compute();
        let computation = match self.inner.in_flight.pending.entry(canonical.clone()) {
            Entry::Occupied(pending) => {
                tracing::debug!(key = %canonical, "joining in-flight computation");
                pending.get().clone()
            }
            Entry::Vacant(slot) => {
                // A computation may have finished between our miss and here
                if let Some(entry) = self.inner.memory.peek(&canonical) {
                    drop(slot);
                    return codec::decode(&entry.value);
                }
                let computation = self.start_computation(canonical, ttl, work);
                slot.insert(computation.clone());
                computation
            }
        };

        let bytes = computation.await?;
        codec::decode(&bytes)
    }

    fn start_computation<T, Fut>(&self, canonical: String, ttl: Option<Duration>, work: Fut) -> SharedComputation
    where
        T: Serialize + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let guard = InFlightGuard {
            service: self.clone(),
            key: canonical,
        };
        // Tracked so that `close` waits for the write-back
        let handle = self.inner.tasks.spawn(async move {
            let guard = guard;
            let value = work.await.map_err(|e| {
                tracing::warn!(key = %guard.key, error = %e, "Memoized computation failed");
                CacheError::computation(e)
            })?;
            let bytes = Arc::new(codec::encode(&value)?);
            // Store before the guard drops so later callers hit the cache
            guard.service.store(&guard.key, bytes.clone(), ttl).await;
            Ok(bytes)
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(CacheError::ComputationAborted(e.to_string())),
            }
        }
        .boxed()
        .shared()
    }

    /// A memoizing wrapper for one operation.
    ///
    /// `identity` must be stable across releases (e.g. `"nlp::classify_claim"`);
    /// together with the call arguments it forms the cache key.
    pub fn cached(&self, identity: impl Into<String>, ttl: Option<Duration>, namespace: impl Into<String>) -> Memoizer {
        Memoizer {
            service: self.clone(),
            identity: identity.into(),
            ttl,
            namespace: namespace.into(),
        }
    }
}

/// Wraps an expensive operation with read-through caching.
///
/// ```no_run
/// # async fn demo(cache: factcheck_cache::CacheService) -> Result<(), factcheck_cache::CacheError> {
/// use std::time::Duration;
///
/// let classify = cache.cached("nlp::classify_claim", Some(Duration::from_secs(3600)), "nlp");
/// let text = "The moon landing was staged".to_string();
/// let label: String = classify
///     .call(&(&text.clone(), "en"), || async move { anyhow::Ok(format!("label for {text}")) })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Memoizer {
    service: CacheService,
    identity: String,
    ttl: Option<Duration>,
    namespace: String,
}

impl Memoizer {
    /// The raw key a call with `args` is cached under.
    pub fn key_for<A: Serialize + ?Sized>(&self, args: &A) -> Result<String, CacheError> {
        Ok(MemoKey::new(self.identity.as_str()).arg(args)?.finish())
    }

    pub async fn call<A, T, F, Fut>(&self, args: &A, compute: F) -> Result<T, CacheError>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let key = self.key_for(args)?;
        self.service
            .get_or_compute(&key, &self.namespace, self.ttl, compute)
            .await
    }
}
