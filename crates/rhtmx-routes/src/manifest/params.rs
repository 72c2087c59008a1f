//! Parameter enumeration for prerendering dynamic pages

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::RouteParams;

/// Lists the parameter sets a dynamic page should be prerendered with
#[async_trait]
pub trait ParamEnumerator: Send + Sync {
    /// `page` is the absolute path of the page file
    async fn enumerate(&self, page: &Path) -> Result<Vec<RouteParams>>;
}

/// Reads a JSON array of parameter maps stored next to the page
///
/// ```text
/// app/blog/[slug]/page.rsx
/// app/blog/[slug]/static-params.json   [{"slug": "hello"}, {"slug": "world"}]
/// ```
#[derive(Debug, Clone)]
pub struct SidecarParams {
    file_name: String,
}

impl SidecarParams {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    fn sidecar_for(&self, page: &Path) -> PathBuf {
        page.with_file_name(&self.file_name)
    }
}

impl Default for SidecarParams {
    fn default() -> Self {
        Self::new("static-params.json")
    }
}

#[async_trait]
impl ParamEnumerator for SidecarParams {
    async fn enumerate(&self, page: &Path) -> Result<Vec<RouteParams>> {
        let sidecar = self.sidecar_for(page);

        let content = tokio::fs::read_to_string(&sidecar)
            .await
            .with_context(|| format!("Failed to read parameter file: {:?}", sidecar))?;

        let params: Vec<RouteParams> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse parameter file: {:?}", sidecar))?;

        Ok(params)
    }
}

/// Enumerator for builds that never expand dynamic pages
#[derive(Debug, Clone, Copy, Default)]
pub struct NoParams;

#[async_trait]
impl ParamEnumerator for NoParams {
    async fn enumerate(&self, _page: &Path) -> Result<Vec<RouteParams>> {
        Ok(Vec::new())
    }
}
