//! Scanner: walks the app directory and produces segment descriptors
//!
//! Every routable directory becomes a [`Segment`] carrying the chain of
//! layouts, not-found boundaries, loaders and middleware inherited from the
//! root down to it. Chains are positional: index `i` is always tree depth
//! `i`, with `None` where a depth declared nothing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::RoutingConfig;
use crate::error::BuildError;
use crate::role::RouteRole;

/// A routable directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Directory relative to the app root (empty for the root itself)
    pub dir: PathBuf,
    /// Page file, if the directory has one
    pub page: Option<PathBuf>,
    /// Nearest ancestor `_root` file
    pub shell: Option<PathBuf>,
    pub layouts: Vec<Option<PathBuf>>,
    pub not_found: Vec<Option<PathBuf>>,
    pub loaders: Vec<Option<PathBuf>>,
    pub interceptors: Vec<Option<PathBuf>>,
}

impl Segment {
    /// Number of directories from the app root, root included
    pub fn depth(&self) -> usize {
        self.layouts.len()
    }
}

/// An `api` file with the middleware chain active at its directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFile {
    pub dir: PathBuf,
    pub file: PathBuf,
    pub shell: Option<PathBuf>,
    pub interceptors: Vec<Option<PathBuf>>,
}

/// Output of a scan; all file paths are relative to `root`
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub root: PathBuf,
    pub segments: Vec<Segment>,
    pub endpoints: Vec<EndpointFile>,
}

/// Chains inherited from the ancestors of the directory being scanned
///
/// Passed by value into each recursive call; a child never observes
/// declarations made by a sibling.
#[derive(Debug, Clone, Default)]
struct ScanContext {
    shell: Option<PathBuf>,
    layouts: Vec<Option<PathBuf>>,
    not_found: Vec<Option<PathBuf>>,
    loaders: Vec<Option<PathBuf>>,
    interceptors: Vec<Option<PathBuf>>,
}

impl ScanContext {
    /// Opens a new depth with a `None` hole for every chained role
    fn descend(&self) -> Self {
        let mut next = self.clone();
        next.layouts.push(None);
        next.not_found.push(None);
        next.loaders.push(None);
        next.interceptors.push(None);
        next
    }

    /// Binds a role file to the current (deepest) position
    fn bind(&mut self, role: RouteRole, file: PathBuf) {
        let slot = match role {
            RouteRole::Shell => {
                self.shell = Some(file);
                return;
            }
            RouteRole::Layout => self.layouts.last_mut(),
            RouteRole::NotFound => self.not_found.last_mut(),
            RouteRole::Loader => self.loaders.last_mut(),
            RouteRole::Interceptor => self.interceptors.last_mut(),
            RouteRole::Page | RouteRole::Endpoint => None,
        };
        if let Some(slot) = slot {
            *slot = Some(file);
        }
    }

    fn segment(&self, dir: &Path, page: Option<PathBuf>) -> Segment {
        Segment {
            dir: dir.to_path_buf(),
            page,
            shell: self.shell.clone(),
            layouts: self.layouts.clone(),
            not_found: self.not_found.clone(),
            loaders: self.loaders.clone(),
            interceptors: self.interceptors.clone(),
        }
    }
}

/// Recursive app directory scanner
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    routing: RoutingConfig,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, routing: RoutingConfig) -> Self {
        Self {
            root: root.into(),
            routing,
        }
    }

    /// Walks the tree; fails only when a directory cannot be read
    pub fn scan(&self) -> Result<ScanResult, BuildError> {
        let mut result = ScanResult {
            root: self.root.clone(),
            ..ScanResult::default()
        };
        self.scan_dir(Path::new(""), ScanContext::default(), &mut result)?;

        debug!(
            segments = result.segments.len(),
            endpoints = result.endpoints.len(),
            "scan complete"
        );
        Ok(result)
    }

    fn scan_dir(
        &self,
        rel: &Path,
        inherited: ScanContext,
        out: &mut ScanResult,
    ) -> Result<(), BuildError> {
        let abs = self.root.join(rel);
        let (role_files, children) = self.read_dir(&abs, rel)?;
        debug!(dir = ?rel, files = role_files.len(), children = children.len(), "scanning");

        let mut ctx = inherited.descend();
        let mut emitted = false;

        // BTreeMap iteration follows role priority, not directory order
        for (role, file) in role_files.iter() {
            match role {
                RouteRole::Page => {
                    out.segments.push(ctx.segment(rel, Some(file.clone())));
                    emitted = true;
                }
                RouteRole::Endpoint => out.endpoints.push(EndpointFile {
                    dir: rel.to_path_buf(),
                    file: file.clone(),
                    shell: ctx.shell.clone(),
                    interceptors: ctx.interceptors.clone(),
                }),
                role => ctx.bind(*role, file.clone()),
            }
        }

        let has_layout = role_files.contains_key(&RouteRole::Layout);
        if !emitted && has_layout {
            out.segments.push(ctx.segment(rel, None));
        } else if !emitted {
            let orphans: Vec<&PathBuf> = [RouteRole::NotFound, RouteRole::Loader]
                .iter()
                .filter_map(|role| role_files.get(role))
                .collect();
            if !orphans.is_empty() {
                warn!(
                    dir = ?rel,
                    files = ?orphans,
                    "directory has no page or layout; its boundaries only apply to subdirectories"
                );
            }
        }

        for child in children {
            self.scan_dir(&rel.join(child), ctx.clone(), out)?;
        }

        Ok(())
    }

    /// Reads one directory into role files (best extension per role) and
    /// sorted child directory names
    fn read_dir(
        &self,
        abs: &Path,
        rel: &Path,
    ) -> Result<(BTreeMap<RouteRole, PathBuf>, Vec<String>), BuildError> {
        let mut ranked: BTreeMap<RouteRole, (usize, PathBuf)> = BTreeMap::new();
        let mut children = Vec::new();

        for entry in fs::read_dir(abs).map_err(|e| BuildError::io(abs, e))? {
            let entry = entry.map_err(|e| BuildError::io(abs, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().map_err(|e| BuildError::io(entry.path(), e))?;

            // Symlinks are not followed, so a link cycle cannot recurse forever
            if file_type.is_symlink() {
                warn!(dir = ?rel, entry = %name, "symbolic link skipped");
                continue;
            }
            if file_type.is_dir() {
                if !name.starts_with('.') {
                    children.push(name);
                }
                continue;
            }

            let Some((role, ext)) = RouteRole::from_file_name(&name) else {
                continue;
            };
            let Some(rank) = self.routing.extension_rank(ext) else {
                continue;
            };

            let file = rel.join(&name);
            match ranked.get(&role) {
                Some((existing_rank, existing)) if *existing_rank <= rank => {
                    warn!(kept = ?existing, shadowed = ?file, %role, "duplicate role file ignored");
                }
                Some((_, existing)) => {
                    warn!(kept = ?file, shadowed = ?existing, %role, "duplicate role file ignored");
                    ranked.insert(role, (rank, file));
                }
                None => {
                    ranked.insert(role, (rank, file));
                }
            }
        }

        children.sort();
        let role_files = ranked
            .into_iter()
            .map(|(role, (_, file))| (role, file))
            .collect();
        Ok((role_files, children))
    }
}

/// Scans `root` with the default routing configuration
pub fn scan(root: impl Into<PathBuf>) -> Result<ScanResult, BuildError> {
    Scanner::new(root, RoutingConfig::default()).scan()
}
