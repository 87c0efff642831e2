// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared entity plumbing: the per-handle inspect cache, bulk reload, and
//! the scoped-lifetime protocol.

use futures::FutureExt;
use gantry_config::ClientConfig;
use gantry_error::{Error, Result};
use gantry_host::Execution;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

// ---------------------------------------------------------------------------
// InspectCache
// ---------------------------------------------------------------------------

/// Cached inspect payload with a freshness window.
///
/// The cache belongs to one entity handle. A read inside the validity
/// window returns the cached payload; a read outside it refreshes first.
/// The lock is held across the refresh so an attribute burst triggers a
/// single fetch.
#[derive(Debug)]
pub(crate) struct InspectCache<T> {
    state: Mutex<CacheState<T>>,
}

#[derive(Debug)]
struct CacheState<T> {
    payload: Option<T>,
    refreshed_at: Option<Instant>,
}

impl<T: Clone> InspectCache<T> {
    /// A cache with no payload yet; the first read fetches.
    pub(crate) fn empty() -> Self {
        Self {
            state: Mutex::new(CacheState {
                payload: None,
                refreshed_at: None,
            }),
        }
    }

    /// A cache primed with a payload fetched just now.
    pub(crate) fn primed(payload: T) -> Self {
        Self {
            state: Mutex::new(CacheState {
                payload: Some(payload),
                refreshed_at: Some(Instant::now()),
            }),
        }
    }

    /// Return the cached payload, refreshing through `fetch` when absent
    /// or stale.
    pub(crate) async fn get<F, Fut>(&self, validity: Duration, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = self.state.lock().await;
        let fresh = state
            .refreshed_at
            .is_some_and(|at| at.elapsed() < validity);
        if let (true, Some(payload)) = (fresh, &state.payload) {
            return Ok(payload.clone());
        }
        let payload = fetch().await?;
        state.payload = Some(payload.clone());
        state.refreshed_at = Some(Instant::now());
        Ok(payload)
    }

    /// Unconditionally refresh through `fetch`.
    pub(crate) async fn refresh<F, Fut>(&self, fetch: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = self.state.lock().await;
        let payload = fetch().await?;
        state.payload = Some(payload);
        state.refreshed_at = Some(Instant::now());
        Ok(())
    }

    /// Store a payload fetched elsewhere (bulk reload).
    pub(crate) async fn store(&self, payload: T) {
        let mut state = self.state.lock().await;
        state.payload = Some(payload);
        state.refreshed_at = Some(Instant::now());
    }

    /// Drop the cached payload so the next read refetches.
    pub(crate) async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.payload = None;
        state.refreshed_at = None;
    }
}

// ---------------------------------------------------------------------------
// JSON entities
// ---------------------------------------------------------------------------

/// An entity whose inspect payload comes back as a JSON array.
pub(crate) trait JsonEntity: Sized + Sync {
    /// Parsed payload type.
    type Payload: serde::de::DeserializeOwned + Clone + Send + Sync;

    /// Subcommand tokens of the inspect call, e.g. `["container", "inspect"]`.
    const INSPECT: &'static [&'static str];

    /// Owning client.
    fn client_config(&self) -> &ClientConfig;

    /// Canonical immutable id.
    fn immutable_id(&self) -> &str;

    /// This handle's cache.
    fn cache(&self) -> &InspectCache<Self::Payload>;

    /// The id carried inside a payload, under the entity's id field.
    fn payload_id(payload: &Self::Payload) -> Option<&str>;
}

/// Fetch and parse one entity's payload.
pub(crate) async fn fetch_payload<E: JsonEntity>(
    config: &ClientConfig,
    reference: &str,
) -> Result<E::Payload> {
    let mut argv = config.command_prefix().await?;
    argv.extend(E::INSPECT.iter().map(|s| s.to_string()));
    argv.push(reference.to_string());
    let output = Execution::new(argv, config.kind()).run().await?;
    gantry_models::parse_single(&output.stdout)
}

/// Refresh a homogeneous collection with a single inspect call.
///
/// The engine is asked for all ids at once; the parsed array is fanned out
/// by id, falling back to input order when the engine returned exactly one
/// payload per request. Any unmatched entity fails the whole batch.
pub(crate) async fn bulk_reload<E: JsonEntity>(entities: &[E]) -> Result<()> {
    let Some(first) = entities.first() else {
        return Ok(());
    };
    let config = first.client_config();
    if entities.iter().any(|e| e.client_config() != config) {
        return Err(Error::InvalidInput(
            "bulk reload requires all entities to share one client".to_string(),
        ));
    }

    let mut argv = config.command_prefix().await?;
    argv.extend(E::INSPECT.iter().map(|s| s.to_string()));
    argv.extend(entities.iter().map(|e| e.immutable_id().to_string()));
    let output = Execution::new(argv, config.kind()).run().await?;
    let payloads: Vec<E::Payload> = gantry_models::parse_bulk(&output.stdout)?;

    let mut by_id: HashMap<&str, &E::Payload> = HashMap::new();
    for payload in &payloads {
        if let Some(id) = E::payload_id(payload) {
            by_id.insert(id, payload);
        }
    }

    let index_fallback = payloads.len() == entities.len();
    for (index, entity) in entities.iter().enumerate() {
        let payload = by_id
            .remove(entity.immutable_id())
            .or_else(|| index_fallback.then(|| &payloads[index]))
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "bulk inspect returned no payload for {}",
                    entity.immutable_id()
                ))
            })?;
        entity.cache().store(payload.clone()).await;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scoped lifetimes
// ---------------------------------------------------------------------------

/// An entity that knows how to tear itself down at the end of a scope.
pub trait ScopedResource {
    /// Remove the underlying engine object (stop first where needed).
    fn teardown(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Run `body` against `resource`, then tear the resource down on every exit
/// path: success, error, and panic.
///
/// The body's error wins over a teardown error; a panic is resumed after
/// the teardown ran.
pub async fn scoped<T, R, F>(resource: T, body: F) -> Result<R>
where
    T: ScopedResource,
    F: AsyncFnOnce(&T) -> Result<R>,
{
    let outcome = AssertUnwindSafe(body(&resource)).catch_unwind().await;
    let teardown = resource.teardown().await;
    match outcome {
        Ok(result) => match (result, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
        },
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// A guard that owns an entity for the duration of a scope.
///
/// Call [`Scoped::finish`] to tear the entity down, or [`Scoped::release`]
/// to convert the scope into a permanent lifetime. Dropping the guard with
/// the entity still inside only logs a warning: async teardown cannot run
/// in `Drop`.
#[derive(Debug)]
pub struct Scoped<T: ScopedResource> {
    inner: Option<T>,
}

impl<T: ScopedResource> Scoped<T> {
    /// Wrap an entity.
    pub fn new(entity: T) -> Self {
        Self {
            inner: Some(entity),
        }
    }

    /// Give up the scope; the entity lives on.
    pub fn release(mut self) -> T {
        self.inner.take().expect("scoped entity already taken")
    }

    /// Tear the entity down now.
    pub async fn finish(mut self) -> Result<()> {
        match self.inner.take() {
            Some(entity) => entity.teardown().await,
            None => Ok(()),
        }
    }
}

impl<T: ScopedResource> std::ops::Deref for Scoped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.as_ref().expect("scoped entity already taken")
    }
}

impl<T: ScopedResource> Drop for Scoped<T> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            warn!("scoped entity dropped without teardown; call finish() or release()");
        }
    }
}

// ---------------------------------------------------------------------------
// Entity macro
// ---------------------------------------------------------------------------

/// Generate the shared shape of a JSON-array entity: construction from a
/// trusted id or an untrusted reference, identity semantics, the cached
/// inspect accessors, and bulk reload.
macro_rules! json_entity {
    (
        $(#[$meta:meta])*
        $name:ident {
            payload: $payload:ty,
            id_field: $id_field:ident,
            inspect: [$($inspect_tok:literal),+ $(,)?],
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            config: gantry_config::ClientConfig,
            id: String,
            cache: std::sync::Arc<$crate::entity::InspectCache<$payload>>,
        }

        impl $name {
            /// Build a handle from an id the caller vouches for; no
            /// subprocess is spawned.
            pub fn from_trusted_id(
                config: gantry_config::ClientConfig,
                id: impl Into<String>,
            ) -> Self {
                Self {
                    config,
                    id: id.into(),
                    cache: std::sync::Arc::new($crate::entity::InspectCache::empty()),
                }
            }

            /// Resolve a reference (name, short id, …) through the engine
            /// and build a handle carrying the canonical id.
            pub async fn from_reference(
                config: gantry_config::ClientConfig,
                reference: &str,
            ) -> gantry_error::Result<Self> {
                let payload =
                    $crate::entity::fetch_payload::<Self>(&config, reference).await?;
                let id = <Self as $crate::entity::JsonEntity>::payload_id(&payload)
                    .ok_or_else(|| {
                        gantry_error::Error::InvalidInput(format!(
                            "inspect payload for {reference:?} carries no id"
                        ))
                    })?
                    .to_string();
                Ok(Self {
                    config,
                    id,
                    cache: std::sync::Arc::new($crate::entity::InspectCache::primed(payload)),
                })
            }

            /// The canonical immutable id.
            pub fn id(&self) -> &str {
                &self.id
            }

            /// The owning client configuration.
            pub fn client_config(&self) -> &gantry_config::ClientConfig {
                &self.config
            }

            /// The full inspect payload, refreshed when stale.
            pub async fn inspect_result(&self) -> gantry_error::Result<$payload> {
                let config = self.config.clone();
                let id = self.id.clone();
                self.cache
                    .get(self.config.cache_validity(), move || async move {
                        $crate::entity::fetch_payload::<Self>(&config, &id).await
                    })
                    .await
            }

            /// Force one refresh now.
            pub async fn reload(&self) -> gantry_error::Result<()> {
                let config = self.config.clone();
                let id = self.id.clone();
                self.cache
                    .refresh(move || async move {
                        $crate::entity::fetch_payload::<Self>(&config, &id).await
                    })
                    .await
            }

            /// Refresh a homogeneous collection with one inspect call.
            pub async fn bulk_reload(entities: &[Self]) -> gantry_error::Result<()> {
                $crate::entity::bulk_reload(entities).await
            }

            /// Drop the cached payload so the next attribute read
            /// re-inspects.
            pub async fn invalidate(&self) {
                self.cache.invalidate().await;
            }
        }

        impl $crate::entity::JsonEntity for $name {
            type Payload = $payload;

            const INSPECT: &'static [&'static str] = &[$($inspect_tok),+];

            fn client_config(&self) -> &gantry_config::ClientConfig {
                &self.config
            }

            fn immutable_id(&self) -> &str {
                &self.id
            }

            fn cache(&self) -> &$crate::entity::InspectCache<Self::Payload> {
                &self.cache
            }

            fn payload_id(payload: &Self::Payload) -> Option<&str> {
                payload.$id_field.as_deref()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.id)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.config == other.config && self.id == other.id
            }
        }

        impl Eq for $name {}

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }
    };
}

pub(crate) use json_entity;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn cache_collapses_reads_inside_the_window() {
        let cache = InspectCache::empty();
        let fetches = AtomicUsize::new(0);
        for _ in 0..5 {
            let value = cache
                .get(Duration::from_secs(60), || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(42u32)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_refetches_after_expiry() {
        let cache = InspectCache::empty();
        let fetches = AtomicUsize::new(0);
        let fetch = || async {
            Ok(fetches.fetch_add(1, Ordering::SeqCst))
        };
        cache.get(Duration::ZERO, fetch).await.unwrap();
        cache.get(Duration::ZERO, fetch).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn primed_cache_serves_without_fetching() {
        let cache = InspectCache::primed("payload".to_string());
        let value = cache
            .get(Duration::from_secs(60), || async {
                panic!("must not fetch")
            })
            .await
            .unwrap();
        assert_eq!(value, "payload");
    }

    #[tokio::test]
    async fn invalidate_forces_the_next_read_to_fetch() {
        let cache = InspectCache::primed(1u32);
        cache.invalidate().await;
        let value = cache
            .get(Duration::from_secs(60), || async { Ok(2u32) })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    struct FakeResource {
        torn_down: std::sync::Arc<AtomicUsize>,
    }

    impl ScopedResource for FakeResource {
        async fn teardown(&self) -> Result<()> {
            self.torn_down.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn scoped_tears_down_on_success() {
        let counter = std::sync::Arc::new(AtomicUsize::new(0));
        let resource = FakeResource {
            torn_down: counter.clone(),
        };
        let value = scoped(resource, async |_| Ok(7)).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scoped_tears_down_on_error_and_keeps_the_body_error() {
        let counter = std::sync::Arc::new(AtomicUsize::new(0));
        let resource = FakeResource {
            torn_down: counter.clone(),
        };
        let err = scoped(resource, async |_| -> Result<()> {
            Err(Error::InvalidInput("body failed".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scoped_tears_down_on_panic() {
        let counter = std::sync::Arc::new(AtomicUsize::new(0));
        let resource = FakeResource {
            torn_down: counter.clone(),
        };
        let panicked = AssertUnwindSafe(scoped(resource, async |_| -> Result<()> {
            panic!("boom")
        }))
        .catch_unwind()
        .await;
        assert!(panicked.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn release_skips_teardown() {
        let counter = std::sync::Arc::new(AtomicUsize::new(0));
        let guard = Scoped::new(FakeResource {
            torn_down: counter.clone(),
        });
        let _resource = guard.release();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn finish_runs_teardown_once() {
        let counter = std::sync::Arc::new(AtomicUsize::new(0));
        let guard = Scoped::new(FakeResource {
            torn_down: counter.clone(),
        });
        guard.finish().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
