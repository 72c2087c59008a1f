//! Manifest builder: scan result → manifest, import table, prerender set

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::id::{endpoint_id, import_path, stable_id};
use super::params::{NoParams, ParamEnumerator, SidecarParams};
use super::{BuildOutput, EndpointEntry, Entry, ImportRef, Method, PageEntry};
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::exports::{ExportCache, ExportInspector, SourceExportInspector};
use crate::route::{fill_pattern, to_canonical_route, ParsedRoute};
use crate::scan::{EndpointFile, ScanResult, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Static,
    Dynamic,
}

/// Accumulates output while segments are processed in scan order
#[derive(Default)]
struct BuildState {
    output: BuildOutput,
    /// Files already registered, and the ID they got
    ids: HashMap<PathBuf, String>,
}

impl BuildState {
    /// ID of `file`, registering its import the first time it is seen
    fn register(&mut self, file: &Path, binding: Binding) -> String {
        if let Some(id) = self.ids.get(file) {
            return id.clone();
        }

        let import = ImportRef::from_path(file);
        let id = stable_id(import.as_str());
        debug!(%id, %import, ?binding, "registered import");

        let imports = &mut self.output.imports;
        match binding {
            Binding::Static => imports.static_imports.insert(id.clone(), import),
            Binding::Dynamic => imports.dynamic_imports.insert(id.clone(), import),
        };
        self.ids.insert(file.to_path_buf(), id.clone());
        id
    }

    /// Registers a positional chain, keeping `None` holes in place
    fn register_chain(&mut self, chain: &[Option<PathBuf>]) -> Vec<Option<String>> {
        chain
            .iter()
            .map(|slot| slot.as_deref().map(|file| self.register(file, Binding::Dynamic)))
            .collect()
    }
}

/// Turns a [`ScanResult`] into a [`BuildOutput`]
///
/// ```no_run
/// use rhtmx_routes::{scan, BuildConfig, ManifestBuilder};
///
/// # async fn run() -> anyhow::Result<()> {
/// let scanned = scan("app")?;
/// let output = ManifestBuilder::from_config(&BuildConfig::default())
///     .build(&scanned)
///     .await?;
/// output.validate()?;
/// output.write_to(".rhtmx/routes")?;
/// # Ok(())
/// # }
/// ```
pub struct ManifestBuilder {
    exports: ExportCache,
    params: Arc<dyn ParamEnumerator>,
    prerender_all: bool,
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestBuilder {
    /// Source-inspecting builder that never expands dynamic pages
    pub fn new() -> Self {
        Self {
            exports: ExportCache::new(Arc::new(SourceExportInspector)),
            params: Arc::new(NoParams),
            prerender_all: false,
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new()
            .params(SidecarParams::new(config.params_file.clone()))
            .prerender_all(config.prerender_all)
    }

    pub fn inspector(mut self, inspector: impl ExportInspector + 'static) -> Self {
        self.exports = ExportCache::new(Arc::new(inspector));
        self
    }

    pub fn params(mut self, params: impl ParamEnumerator + 'static) -> Self {
        self.params = Arc::new(params);
        self
    }

    pub fn prerender_all(mut self, prerender_all: bool) -> Self {
        self.prerender_all = prerender_all;
        self
    }

    /// Builds the manifest; fails on a routable directory without a shell
    pub async fn build(&self, scan: &ScanResult) -> Result<BuildOutput, BuildError> {
        self.prefetch(scan).await;

        let mut state = BuildState::default();
        for segment in &scan.segments {
            self.add_segment(&scan.root, segment, &mut state).await?;
        }
        for endpoint in &scan.endpoints {
            self.add_endpoint(&scan.root, endpoint, &mut state).await?;
        }

        let output = state.output;
        info!(
            routes = output.manifest.len(),
            imports = output.imports.len(),
            prerender = output.prerender.len(),
            "route manifest built"
        );
        Ok(output)
    }

    /// Reads every file whose exports matter, overlapping the reads
    async fn prefetch(&self, scan: &ScanResult) {
        let mut files: BTreeSet<&PathBuf> = BTreeSet::new();
        for segment in &scan.segments {
            files.extend(segment.shell.iter());
            files.extend(segment.layouts.iter().flatten());
            files.extend(segment.page.iter());
        }
        files.extend(scan.endpoints.iter().map(|endpoint| &endpoint.file));

        let paths: Vec<PathBuf> = files.into_iter().map(|file| scan.root.join(file)).collect();
        join_all(paths.iter().map(|path| self.exports.get(path))).await;
    }

    async fn add_segment(
        &self,
        root: &Path,
        segment: &Segment,
        state: &mut BuildState,
    ) -> Result<(), BuildError> {
        let shell = segment.shell.as_deref().ok_or_else(|| BuildError::MissingShell {
            dir: segment.dir.clone(),
        })?;

        let dir = import_path(&segment.dir);
        let route = to_canonical_route(&dir);
        if !route.catch_all_is_trailing() {
            warn!(dir = %dir, pattern = %route.pattern, "catch-all must be the last segment; route skipped");
            return Ok(());
        }

        let shell = state.register(shell, Binding::Static);
        let layouts = state.register_chain(&segment.layouts);
        let not_found = state.register_chain(&segment.not_found);
        let loaders = state.register_chain(&segment.loaders);
        let interceptors = state.register_chain(&segment.interceptors);
        let page = segment
            .page
            .as_deref()
            .map(|file| state.register(file, Binding::Dynamic));

        let prerender = match segment.page.as_deref() {
            Some(file) => {
                let prerender = self.is_prerenderable(root, segment, file).await;
                if prerender {
                    self.expand_prerender(root, file, &route, &mut state.output.prerender)
                        .await;
                }
                prerender
            }
            None => false,
        };

        let entry = PageEntry {
            id: page.clone().unwrap_or_else(|| stable_id(&dir)),
            path: route.pattern,
            params: route.params,
            shell,
            page,
            layouts,
            not_found,
            loaders,
            interceptors,
            prerender,
            dynamic: route.dynamic,
            catch_all: route.catch_all,
        };
        debug!(id = %entry.id, path = %entry.path, page = entry.page.is_some(), "registered page entry");
        state.output.manifest.insert(Entry::Page(entry));
        Ok(())
    }

    /// Forced by config, or marked by the shell, any layout, or the page
    async fn is_prerenderable(&self, root: &Path, segment: &Segment, page: &Path) -> bool {
        if self.prerender_all {
            return true;
        }

        let ancestors = segment.shell.iter().chain(segment.layouts.iter().flatten());
        for file in ancestors {
            if self.exports.get(&root.join(file)).await.prerender {
                return true;
            }
        }

        self.exports.get(&root.join(page)).await.prerender
    }

    /// Adds the concrete paths of a prerenderable page
    ///
    /// Every failure here is soft: the page just gets no variants.
    async fn expand_prerender(
        &self,
        root: &Path,
        page: &Path,
        route: &ParsedRoute,
        out: &mut BTreeSet<String>,
    ) {
        if !route.dynamic {
            out.insert(route.pattern.clone());
            return;
        }

        let page = root.join(page);
        if !self.exports.get(&page).await.static_params {
            warn!(route = %route.pattern, "dynamic page declares no static_params; nothing prerendered");
            return;
        }

        let sets = match self.params.enumerate(&page).await {
            Ok(sets) => sets,
            Err(e) => {
                warn!(route = %route.pattern, error = %format!("{:#}", e), "parameter enumeration failed; nothing prerendered");
                return;
            }
        };
        if sets.is_empty() {
            warn!(route = %route.pattern, "parameter enumeration returned no sets; nothing prerendered");
            return;
        }

        for params in &sets {
            match fill_pattern(&route.pattern, params) {
                Some(path) => {
                    out.insert(path);
                }
                None => {
                    warn!(route = %route.pattern, ?params, "parameter set is missing a route parameter; variant skipped")
                }
            }
        }
    }

    async fn add_endpoint(
        &self,
        root: &Path,
        endpoint: &EndpointFile,
        state: &mut BuildState,
    ) -> Result<(), BuildError> {
        if endpoint.shell.is_none() {
            return Err(BuildError::MissingShell {
                dir: endpoint.dir.clone(),
            });
        }

        let route = to_canonical_route(&import_path(&endpoint.dir));
        if !route.catch_all_is_trailing() {
            warn!(file = ?endpoint.file, pattern = %route.pattern, "catch-all must be the last segment; endpoint skipped");
            return Ok(());
        }

        let exports = self.exports.get(&root.join(&endpoint.file)).await;
        let methods: BTreeSet<Method> = exports
            .names
            .iter()
            .filter_map(|name| {
                let method = Method::from_name(name);
                if method.is_none() {
                    warn!(file = ?endpoint.file, export = %name, "unsupported endpoint verb dropped");
                }
                method
            })
            .collect();

        if methods.is_empty() {
            warn!(file = ?endpoint.file, "endpoint exports no supported verbs; skipped");
            return Ok(());
        }

        let module = state.register(&endpoint.file, Binding::Dynamic);
        let interceptors = state.register_chain(&endpoint.interceptors);

        for method in methods {
            let entry = EndpointEntry {
                id: endpoint_id(&module, method),
                path: route.pattern.clone(),
                method,
                params: route.params.clone(),
                interceptors: interceptors.clone(),
                module: module.clone(),
            };
            debug!(id = %entry.id, path = %entry.path, %method, "registered endpoint");
            state.output.manifest.insert(Entry::Endpoint(entry));
        }
        Ok(())
    }
}

/// Builds with the default [`ManifestBuilder`]
pub async fn build(scan: &ScanResult) -> Result<BuildOutput, BuildError> {
    ManifestBuilder::new().build(scan).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(path: &str) -> PathBuf {
        PathBuf::from(path)
    }

    fn segment(dir: &str, page: Option<&str>, depth: usize) -> Segment {
        Segment {
            dir: p(dir),
            page: page.map(p),
            shell: Some(p("_root.rsx")),
            layouts: vec![None; depth],
            not_found: vec![None; depth],
            loaders: vec![None; depth],
            interceptors: vec![None; depth],
        }
    }

    fn scan_of(segments: Vec<Segment>) -> ScanResult {
        ScanResult {
            root: p("/nonexistent/app"),
            segments,
            endpoints: vec![],
        }
    }

    #[tokio::test]
    async fn test_missing_shell_is_fatal() {
        let mut orphan = segment("blog", Some("blog/page.rsx"), 2);
        orphan.shell = None;

        let err = build(&scan_of(vec![orphan])).await.unwrap_err();
        assert!(matches!(err, BuildError::MissingShell { ref dir } if dir == Path::new("blog")));
    }

    #[tokio::test]
    async fn test_shared_files_register_once() {
        let mut home = segment("", Some("page.rsx"), 1);
        home.layouts[0] = Some(p("_layout.rsx"));
        let mut about = segment("about", Some("about/page.rsx"), 2);
        about.layouts[0] = Some(p("_layout.rsx"));

        let output = build(&scan_of(vec![home, about])).await.unwrap();

        assert_eq!(output.imports.static_imports.len(), 1);
        // layout + two pages
        assert_eq!(output.imports.dynamic_imports.len(), 3);

        let about = output.manifest.get("/about")[0].as_page().unwrap();
        let home = output.manifest.get("/")[0].as_page().unwrap();
        assert_eq!(about.layouts[0], home.layouts[0]);
        assert_eq!(about.layouts[1], None);
        assert_eq!(about.shell, home.shell);
        assert!(output.validate().is_ok());
    }

    #[tokio::test]
    async fn test_layout_only_directory_uses_directory_id() {
        let mut docs = segment("docs", None, 2);
        docs.layouts[1] = Some(p("docs/_layout.rsx"));

        let output = build(&scan_of(vec![docs])).await.unwrap();
        let entry = output.manifest.get("/docs")[0].as_page().unwrap();

        assert_eq!(entry.id, stable_id("docs"));
        assert_eq!(entry.page, None);
        assert!(!entry.prerender);
    }

    #[tokio::test]
    async fn test_prerender_all_adds_static_paths_only() {
        let about = segment("about", Some("about/page.rsx"), 2);
        let user = segment("users/[id]", Some("users/[id]/page.rsx"), 3);

        let output = ManifestBuilder::new()
            .prerender_all(true)
            .build(&scan_of(vec![about, user]))
            .await
            .unwrap();

        let expected: BTreeSet<String> = ["/about".to_string()].into_iter().collect();
        assert_eq!(output.prerender, expected);
        assert!(output.manifest.get("/users/:id")[0].as_page().unwrap().prerender);
    }

    #[tokio::test]
    async fn test_misplaced_catch_all_is_skipped() {
        let bad = segment("docs/[...slug]/edit", Some("docs/[...slug]/edit/page.rsx"), 4);
        let output = build(&scan_of(vec![bad])).await.unwrap();
        assert!(output.manifest.is_empty());
        assert!(output.imports.is_empty());
    }
}
