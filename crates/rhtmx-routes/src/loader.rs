//! Deferred loading of route modules
//!
//! A [`Loader`] is the capability to produce one module. Whoever asks first
//! starts the load; everyone asking while it runs awaits the same shared
//! future; once it completes the module is kept and handed out without
//! awaiting. A failed load is forgotten so the next caller retries.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::manifest::ImportRef;
use crate::metadata::MetadataSource;

/// The implementation unit behind one registry ID
///
/// The renderer owns what `payload` means; this crate only reads the
/// co-located `metadata` declaration.
#[derive(Clone)]
pub struct RouteModule {
    pub import: ImportRef,
    pub metadata: Option<MetadataSource>,
    pub payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl RouteModule {
    pub fn new(import: ImportRef) -> Self {
        Self {
            import,
            metadata: None,
            payload: None,
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataSource) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    pub fn payload<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }
}

impl fmt::Debug for RouteModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteModule")
            .field("import", &self.import)
            .field("metadata", &self.metadata)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

/// Produces the module for an import; supplied by the host application
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    async fn resolve(&self, import: &ImportRef) -> anyhow::Result<RouteModule>;
}

type LoadResult = Result<Arc<RouteModule>, LoadError>;
type LoadFuture = Shared<BoxFuture<'static, LoadResult>>;

enum LoadState {
    Unloaded,
    Loading(LoadFuture),
    Loaded(Arc<RouteModule>),
}

/// At-most-once loader for one module
///
/// The shared future is kept in the loader, not in any caller, so a caller
/// dropping out does not cancel a load that others are waiting on.
pub struct Loader {
    id: String,
    import: ImportRef,
    resolver: Option<Arc<dyn ModuleResolver>>,
    state: Mutex<LoadState>,
}

impl Loader {
    /// Lazily bound loader
    pub fn new(id: impl Into<String>, import: ImportRef, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            id: id.into(),
            import,
            resolver: Some(resolver),
            state: Mutex::new(LoadState::Unloaded),
        }
    }

    /// Eagerly bound loader over an already resolved module
    pub fn ready(id: impl Into<String>, module: RouteModule) -> Self {
        Self {
            id: id.into(),
            import: module.import.clone(),
            resolver: None,
            state: Mutex::new(LoadState::Loaded(Arc::new(module))),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn import(&self) -> &ImportRef {
        &self.import
    }

    fn lock(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The module, if a load has completed
    pub fn loaded(&self) -> Option<Arc<RouteModule>> {
        match &*self.lock() {
            LoadState::Loaded(module) => Some(module.clone()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(&*self.lock(), LoadState::Loading(_))
    }

    /// Loads the module, joining a load already in flight
    pub async fn load(&self) -> LoadResult {
        let pending = {
            let mut state = self.lock();
            match &*state {
                LoadState::Loaded(module) => return Ok(module.clone()),
                LoadState::Loading(pending) => pending.clone(),
                LoadState::Unloaded => {
                    let pending = self.start();
                    *state = LoadState::Loading(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut state = self.lock();
        // Only the load that finished may settle the state
        if let LoadState::Loading(current) = &*state {
            if current.ptr_eq(&pending) {
                *state = match &result {
                    Ok(module) => LoadState::Loaded(module.clone()),
                    Err(e) => {
                        warn!(id = %self.id, error = %e, "load failed; will retry on next request");
                        LoadState::Unloaded
                    }
                };
            }
        }
        result
    }

    fn start(&self) -> LoadFuture {
        let id = self.id.clone();
        let import = self.import.clone();
        let resolver = self.resolver.clone();
        debug!(%id, %import, "loading module");

        async move {
            let Some(resolver) = resolver else {
                return Err(LoadError::Resolve {
                    id,
                    message: "no resolver bound".to_string(),
                });
            };
            resolver
                .resolve(&import)
                .await
                .map(Arc::new)
                .map_err(|e| LoadError::Resolve {
                    id,
                    message: format!("{:#}", e),
                })
        }
        .boxed()
        .shared()
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.lock() {
            LoadState::Unloaded => "unloaded",
            LoadState::Loading(_) => "loading",
            LoadState::Loaded(_) => "loaded",
        };
        f.debug_struct("Loader")
            .field("id", &self.id)
            .field("import", &self.import)
            .field("state", &state)
            .finish()
    }
}
