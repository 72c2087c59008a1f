//! Chain resolution ("enhance")
//!
//! Turns a [`RouteMatch`] into an [`EnhancedMatch`]: the shell, layouts,
//! not-found boundaries, loaders and page of the matched entry, loaded
//! through the [`LoaderRegistry`]. A resolved chain never changes for the
//! life of the process, so it is cached per entry and shared; the
//! per-request parts (params, error) are bound fresh on every call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::try_join_all;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::LoadError;
use crate::loader::RouteModule;
use crate::manifest::{Entry, PageEntry};
use crate::matcher::{MatchStatus, RouteMatch};
use crate::metadata::{self, Metadata, MetadataContext, MetadataPriority, RouteError};
use crate::registry::LoaderRegistry;
use crate::RouteParams;

type Module = Arc<RouteModule>;

/// Loaded modules of one entry's chain, positionally aligned with the entry
#[derive(Debug)]
pub struct ResolvedChain {
    pub shell: Module,
    pub layouts: Vec<Option<Module>>,
    pub not_found: Vec<Option<Module>>,
    pub loaders: Vec<Option<Module>>,
    /// Absent for not-found matches and layout-only entries
    pub page: Option<Module>,
}

/// A match with its chain loaded, ready for the renderer
#[derive(Debug, Clone)]
pub struct EnhancedMatch {
    pub route: RouteMatch,
    pub chain: Arc<ResolvedChain>,
    pub error: Option<RouteError>,
}

impl EnhancedMatch {
    pub fn params(&self) -> &RouteParams {
        &self.route.params
    }

    /// Replaces the error, e.g. when a handler fails after matching
    pub fn with_error(mut self, error: RouteError) -> Self {
        self.error = Some(error);
        self
    }

    /// Render order: shell, then layouts with holes kept
    pub fn ui_chain(&self) -> Vec<Option<&Module>> {
        std::iter::once(Some(&self.chain.shell))
            .chain(self.chain.layouts.iter().map(Option::as_ref))
            .collect()
    }

    /// Deepest declared not-found boundary
    pub fn not_found_boundary(&self) -> Option<&Module> {
        self.chain.not_found.iter().rev().find_map(Option::as_ref)
    }

    /// Aggregated metadata for this request
    pub async fn metadata(&self) -> Metadata {
        let chain = &self.chain;
        let levels = std::iter::once((MetadataPriority::Shell, &chain.shell))
            .chain(
                chain
                    .layouts
                    .iter()
                    .flatten()
                    .map(|m| (MetadataPriority::Layout, m)),
            )
            .chain(chain.page.iter().map(|m| (MetadataPriority::Page, m)))
            .chain(
                chain
                    .not_found
                    .iter()
                    .flatten()
                    .map(|m| (MetadataPriority::NotFound, m)),
            );

        let sources = levels
            .filter_map(|(priority, module)| {
                module.metadata.clone().map(|source| (priority, source))
            })
            .collect();

        let ctx = MetadataContext {
            params: self.route.params.clone(),
            error: self.error.clone(),
        };
        metadata::collect(sources, ctx).await
    }
}

type ChainCell = Arc<OnceCell<Arc<ResolvedChain>>>;

/// Process-scoped resolver; create one per process (or per test)
pub struct ChainResolver {
    registry: Arc<LoaderRegistry>,
    cache: Mutex<HashMap<String, ChainCell>>,
}

impl ChainResolver {
    pub fn new(registry: Arc<LoaderRegistry>) -> Self {
        Self {
            registry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of entries with a resolved chain
    pub fn cached(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    fn cell(&self, key: &str) -> ChainCell {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.entry(key.to_string()).or_default().clone()
    }

    /// Loads the chain of a page match; endpoints have none and yield `None`
    ///
    /// Concurrent callers join the same in-flight module loads, so a failing
    /// module is loaded once and its error reaches each of them. A failed
    /// load leaves nothing cached, so the next request retries.
    pub async fn enhance(&self, route: &RouteMatch) -> Result<Option<EnhancedMatch>, LoadError> {
        let Entry::Page(page) = route.entry.as_ref() else {
            return Ok(None);
        };

        let with_page = route.status == MatchStatus::Found;
        let key = if with_page {
            page.id.clone()
        } else {
            format!("{}#not-found", page.id)
        };

        let cell = self.cell(&key);
        let chain = match cell.get() {
            Some(chain) => chain.clone(),
            None => {
                // Concurrent callers must meet in the loaders' shared futures
                let resolved = self.resolve(page, with_page).await?;
                cell.get_or_init(|| async { resolved }).await.clone()
            }
        };

        Ok(Some(EnhancedMatch {
            route: route.clone(),
            chain,
            error: (!with_page).then(RouteError::not_found),
        }))
    }

    /// Loads the middleware chain of a page or endpoint match, outermost first
    pub async fn interceptors(&self, route: &RouteMatch) -> Result<Vec<Module>, LoadError> {
        let ids = route.entry.interceptors().iter().flatten();
        try_join_all(ids.map(|id| self.load(id))).await
    }

    async fn resolve(&self, page: &PageEntry, with_page: bool) -> Result<Arc<ResolvedChain>, LoadError> {
        debug!(id = %page.id, path = %page.path, with_page, "resolving chain");

        let page_module = async {
            match page.page.as_deref() {
                Some(id) if with_page => self.load(id).await.map(Some),
                _ => Ok(None),
            }
        };

        let (shell, layouts, not_found, loaders, page) = futures::try_join!(
            self.load(&page.shell),
            self.load_chain(&page.layouts),
            self.load_chain(&page.not_found),
            self.load_chain(&page.loaders),
            page_module,
        )?;

        Ok(Arc::new(ResolvedChain {
            shell,
            layouts,
            not_found,
            loaders,
            page,
        }))
    }

    async fn load(&self, id: &str) -> Result<Module, LoadError> {
        self.registry.require(id)?.load().await
    }

    async fn load_chain(&self, chain: &[Option<String>]) -> Result<Vec<Option<Module>>, LoadError> {
        try_join_all(chain.iter().map(|slot| async move {
            match slot {
                Some(id) => self.load(id).await.map(Some),
                None => Ok(None),
            }
        }))
        .await
    }
}
