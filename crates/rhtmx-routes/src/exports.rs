//! Export inspection for route files
//!
//! The builder only needs to know which names a file declares: a
//! `prerender` marker, a `static_params` enumeration, and the verb handlers
//! of an `api` file. Inspection happens once per unique file through
//! [`ExportCache`].

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Comments and literals, matched left to right so a `//` inside a string
/// is never taken for a comment. Raw strings and nested block comments are
/// not recognized.
static NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"(?:\\.|[^"\\])*"|'(?:\\.|[^'\\])'|/\*.*?\*/|//[^\n]*"#).unwrap()
});

static PUB_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bpub\s+(?:async\s+)?(?:fn|const|static(?:\s+mut)?|struct|enum|type)\s+([A-Za-z_][A-Za-z0-9_]*)")
        .unwrap()
});

static PUB_USE_AS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bpub\s+use\s+[^;]*?\bas\s+([A-Za-z_][A-Za-z0-9_]*)\s*;").unwrap()
});

static VERB_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)#\[\s*(get|post|put|patch|delete|head|options)\b").unwrap()
});

/// Reports the names a route file declares
pub trait ExportInspector: Send + Sync {
    /// Never fails: source it cannot make sense of yields an empty set
    fn exports(&self, source: &str) -> BTreeSet<String>;
}

/// Regex-based inspector for route sources
///
/// ```
/// use rhtmx_routes::{ExportInspector, SourceExportInspector};
///
/// let names = SourceExportInspector.exports(r#"
///     pub const PRERENDER: bool = true;
///     pub async fn get() {}
///     fn helper() {}
///     #[post]
///     async fn create() {}
/// "#);
/// assert!(names.contains("PRERENDER"));
/// assert!(names.contains("get"));
/// assert!(names.contains("post"));
/// assert!(!names.contains("helper"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceExportInspector;

impl ExportInspector for SourceExportInspector {
    fn exports(&self, source: &str) -> BTreeSet<String> {
        let source = NOISE.replace_all(source, |caps: &regex::Captures<'_>| {
            match caps[0].chars().next() {
                Some('"') => "\"\"",
                Some('\'') => "' '",
                _ => " ",
            }
        });

        let items = PUB_ITEM
            .captures_iter(&source)
            .chain(PUB_USE_AS.captures_iter(&source))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        let verbs = VERB_ATTR
            .captures_iter(&source)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase());

        items.chain(verbs).collect()
    }
}

/// Names declared by one file, plus the markers derived from them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileExports {
    pub names: BTreeSet<String>,
    /// Declares a `prerender` marker
    pub prerender: bool,
    /// Declares a `static_params` enumeration
    pub static_params: bool,
}

impl FileExports {
    pub fn new(names: BTreeSet<String>) -> Self {
        let declares = |marker: &str| names.iter().any(|n| n.eq_ignore_ascii_case(marker));
        let prerender = declares("prerender");
        let static_params = declares("static_params");

        Self {
            names,
            prerender,
            static_params,
        }
    }
}

type Cell = Arc<OnceCell<Arc<FileExports>>>;

/// Memoized export inspection, at most one read per unique file
///
/// The map lock only guards cell creation; the read itself happens inside
/// the cell, so concurrent callers for the same file await one read while
/// other files proceed.
pub struct ExportCache {
    inspector: Arc<dyn ExportInspector>,
    cells: Mutex<HashMap<PathBuf, Cell>>,
}

impl ExportCache {
    pub fn new(inspector: Arc<dyn ExportInspector>) -> Self {
        Self {
            inspector,
            cells: Mutex::new(HashMap::new()),
        }
    }

    fn cell(&self, path: &Path) -> Cell {
        let mut cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.entry(path.to_path_buf()).or_default().clone()
    }

    /// Exports of `path`, reading and inspecting it on first request
    ///
    /// An unreadable file is logged and treated as exporting nothing.
    pub async fn get(&self, path: &Path) -> Arc<FileExports> {
        let cell = self.cell(path);
        cell.get_or_init(|| async {
            let names = match tokio::fs::read_to_string(path).await {
                Ok(source) => self.inspector.exports(&source),
                Err(e) => {
                    warn!(file = ?path, error = %e, "could not read route file; assuming no exports");
                    BTreeSet::new()
                }
            };
            debug!(file = ?path, exports = names.len(), "inspected exports");
            Arc::new(FileExports::new(names))
        })
        .await
        .clone()
    }

    /// Number of distinct files inspected or being inspected
    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
