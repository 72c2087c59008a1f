//! Loader registry: registry ID → deferred-load capability

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::info;

use crate::error::LoadError;
use crate::loader::{Loader, ModuleResolver};
use crate::manifest::ImportTable;

/// Process-scoped set of loaders, created once at startup
#[derive(Debug, Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<Loader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every import of a build
    ///
    /// Static imports are resolved now and any failure is returned; dynamic
    /// imports resolve on first use.
    pub async fn from_imports(
        table: &ImportTable,
        resolver: Arc<dyn ModuleResolver>,
    ) -> Result<Self, LoadError> {
        let eager = table.static_imports.iter().map(|(id, import)| {
            let resolver = resolver.clone();
            async move {
                let module = resolver
                    .resolve(import)
                    .await
                    .map_err(|e| LoadError::Resolve {
                        id: id.clone(),
                        message: format!("{:#}", e),
                    })?;
                Ok::<_, LoadError>(Loader::ready(id.clone(), module))
            }
        });

        let mut registry = Self::new();
        for loader in try_join_all(eager).await? {
            registry.insert(loader);
        }
        for (id, import) in &table.dynamic_imports {
            registry.insert(Loader::new(id.clone(), import.clone(), resolver.clone()));
        }

        info!(
            eager = table.static_imports.len(),
            deferred = table.dynamic_imports.len(),
            "loader registry ready"
        );
        Ok(registry)
    }

    /// Replaces any loader already registered under the same ID
    pub fn insert(&mut self, loader: Loader) {
        self.loaders.insert(loader.id().to_string(), Arc::new(loader));
    }

    pub fn get(&self, id: &str) -> Option<Arc<Loader>> {
        self.loaders.get(id).cloned()
    }

    pub fn require(&self, id: &str) -> Result<Arc<Loader>, LoadError> {
        self.get(id).ok_or_else(|| LoadError::Unknown { id: id.to_string() })
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RouteModule;
    use crate::manifest::ImportRef;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        broken: Option<&'static str>,
    }

    #[async_trait]
    impl ModuleResolver for Counting {
        async fn resolve(&self, import: &ImportRef) -> anyhow::Result<RouteModule> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(import.as_str()) == self.broken {
                anyhow::bail!("missing module");
            }
            Ok(RouteModule::new(import.clone()))
        }
    }

    fn table() -> ImportTable {
        let mut table = ImportTable::default();
        table
            .static_imports
            .insert("m_root".into(), ImportRef::new("_root.rsx"));
        table
            .dynamic_imports
            .insert("m_page".into(), ImportRef::new("page.rsx"));
        table
            .dynamic_imports
            .insert("m_layout".into(), ImportRef::new("_layout.rsx"));
        table
    }

    #[tokio::test]
    async fn test_static_imports_resolve_eagerly() {
        let resolver = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            broken: None,
        });
        let registry = LoaderRegistry::from_imports(&table(), resolver.clone())
            .await
            .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert!(registry.get("m_root").unwrap().loaded().is_some());
        assert!(registry.get("m_page").unwrap().loaded().is_none());
    }

    #[tokio::test]
    async fn test_static_failure_is_fatal() {
        let resolver = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            broken: Some("_root.rsx"),
        });
        let err = LoaderRegistry::from_imports(&table(), resolver).await.unwrap_err();
        assert!(matches!(err, LoadError::Resolve { ref id, .. } if id == "m_root"));
    }

    #[test]
    fn test_unknown_id_is_an_error() {
        let registry = LoaderRegistry::new();
        assert_eq!(
            registry.require("m_missing").unwrap_err(),
            LoadError::Unknown {
                id: "m_missing".to_string()
            }
        );
    }
}
