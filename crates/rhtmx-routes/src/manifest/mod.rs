/// Route manifest and loader import table
///
/// - `id`: stable content-derived identifiers
/// - `params`: parameter enumeration for prerendering dynamic pages
/// - `builder`: scan result → manifest, imports and prerender set
///
/// The manifest maps each canonical path to one entry, or to an array of
/// entries when several kinds or methods share a path (a `GET` page and a
/// `POST` endpoint at `/posts`).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::BuildError;

pub mod builder;
pub mod id;
pub mod params;

pub use builder::{build, ManifestBuilder};
pub use params::{NoParams, ParamEnumerator, SidecarParams};

/// HTTP verbs an endpoint file may export
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Head,
        Method::Options,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    /// Case-insensitive lookup of an exported verb name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unsupported HTTP method: {}", s))
    }
}

/// A page, or a layout-only directory kept for boundary lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub id: String,
    pub path: String,
    pub params: Vec<String>,
    pub shell: String,
    /// `None` for a layout-only directory; such entries never match a request
    pub page: Option<String>,
    pub layouts: Vec<Option<String>>,
    pub not_found: Vec<Option<String>>,
    pub loaders: Vec<Option<String>>,
    pub interceptors: Vec<Option<String>>,
    pub prerender: bool,
    pub dynamic: bool,
    pub catch_all: bool,
}

impl PageEntry {
    /// UI chain in render order: shell, then layouts (holes kept)
    pub fn ui_chain(&self) -> Vec<Option<&str>> {
        std::iter::once(Some(self.shell.as_str()))
            .chain(self.layouts.iter().map(Option::as_deref))
            .collect()
    }

    pub fn has_not_found(&self) -> bool {
        self.not_found.iter().any(Option::is_some)
    }

    /// Every registry ID this entry references
    pub fn references(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.shell.as_str())
            .chain(self.page.as_deref())
            .chain(
                self.layouts
                    .iter()
                    .chain(&self.not_found)
                    .chain(&self.loaders)
                    .chain(&self.interceptors)
                    .filter_map(Option::as_deref),
            )
    }
}

/// One verb handler of an `api` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointEntry {
    pub id: String,
    pub path: String,
    pub method: Method,
    pub params: Vec<String>,
    pub interceptors: Vec<Option<String>>,
    /// Registry ID of the `api` file that exports the handler
    pub module: String,
}

impl EndpointEntry {
    pub fn references(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.module.as_str())
            .chain(self.interceptors.iter().filter_map(Option::as_deref))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Page(PageEntry),
    Endpoint(EndpointEntry),
}

impl Entry {
    pub fn id(&self) -> &str {
        match self {
            Entry::Page(page) => &page.id,
            Entry::Endpoint(endpoint) => &endpoint.id,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Entry::Page(page) => &page.path,
            Entry::Endpoint(endpoint) => &endpoint.path,
        }
    }

    pub fn params(&self) -> &[String] {
        match self {
            Entry::Page(page) => &page.params,
            Entry::Endpoint(endpoint) => &endpoint.params,
        }
    }

    pub fn interceptors(&self) -> &[Option<String>] {
        match self {
            Entry::Page(page) => &page.interceptors,
            Entry::Endpoint(endpoint) => &endpoint.interceptors,
        }
    }

    /// Pages render for `GET`
    pub fn method(&self) -> Method {
        match self {
            Entry::Page(_) => Method::Get,
            Entry::Endpoint(endpoint) => endpoint.method,
        }
    }

    pub fn as_page(&self) -> Option<&PageEntry> {
        match self {
            Entry::Page(page) => Some(page),
            Entry::Endpoint(_) => None,
        }
    }

    fn references(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Entry::Page(page) => Box::new(page.references()),
            Entry::Endpoint(endpoint) => Box::new(endpoint.references()),
        }
    }
}

/// Entries registered under one canonical path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestSlot {
    One(Entry),
    Many(Vec<Entry>),
}

impl ManifestSlot {
    pub fn entries(&self) -> &[Entry] {
        match self {
            ManifestSlot::One(entry) => std::slice::from_ref(entry),
            ManifestSlot::Many(entries) => entries,
        }
    }

    fn push(&mut self, entry: Entry) {
        let slot = std::mem::replace(self, ManifestSlot::Many(Vec::new()));
        *self = match slot {
            ManifestSlot::One(first) => ManifestSlot::Many(vec![first, entry]),
            ManifestSlot::Many(mut entries) => {
                entries.push(entry);
                ManifestSlot::Many(entries)
            }
        };
    }
}

/// Canonical path → entry or entries, in first-seen order per path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    routes: BTreeMap<String, ManifestSlot>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry under its own path, after any already there
    pub fn insert(&mut self, entry: Entry) {
        match self.routes.get_mut(entry.path()) {
            Some(slot) => slot.push(entry),
            None => {
                self.routes
                    .insert(entry.path().to_string(), ManifestSlot::One(entry));
            }
        }
    }

    pub fn get(&self, path: &str) -> &[Entry] {
        self.routes.get(path).map(ManifestSlot::entries).unwrap_or(&[])
    }

    /// All entries, by path then registration order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.routes.values().flat_map(ManifestSlot::entries)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Number of entries, not paths
    pub fn len(&self) -> usize {
        self.routes.values().map(|slot| slot.entries().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Forward-slash import path relative to the app root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportRef(String);

impl ImportRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn from_path(relative: &Path) -> Self {
        Self(id::import_path(relative))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ID → import, split by binding time
///
/// Shells are bound eagerly at startup; everything else loads on first use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTable {
    #[serde(rename = "static")]
    pub static_imports: BTreeMap<String, ImportRef>,
    #[serde(rename = "dynamic")]
    pub dynamic_imports: BTreeMap<String, ImportRef>,
}

impl ImportTable {
    pub fn contains(&self, id: &str) -> bool {
        self.static_imports.contains_key(id) || self.dynamic_imports.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ImportRef> {
        self.static_imports
            .get(id)
            .or_else(|| self.dynamic_imports.get(id))
    }

    pub fn len(&self) -> usize {
        self.static_imports.len() + self.dynamic_imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub const MANIFEST_FILE: &str = "manifest.json";
pub const REGISTRY_FILE: &str = "registry.json";
pub const PRERENDER_FILE: &str = "prerender.json";

/// Everything a build produces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    pub manifest: Manifest,
    pub imports: ImportTable,
    /// Concrete paths to prerender
    pub prerender: BTreeSet<String>,
}

impl BuildOutput {
    /// Fails on the first ID an entry references that has no import
    pub fn validate(&self) -> Result<(), BuildError> {
        for entry in self.manifest.entries() {
            if let Some(id) = entry.references().find(|id| !self.imports.contains(id)) {
                return Err(BuildError::DanglingReference {
                    entry: entry.id().to_string(),
                    id: id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Writes `manifest.json`, `registry.json` and `prerender.json`
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<(), BuildError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;

        write_json(&dir.join(MANIFEST_FILE), &self.manifest)?;
        write_json(&dir.join(REGISTRY_FILE), &self.imports)?;
        write_json(&dir.join(PRERENDER_FILE), &self.prerender)?;
        Ok(())
    }

    /// Reads back what [`BuildOutput::write_to`] wrote
    pub fn read_from(dir: impl AsRef<Path>) -> Result<Self, BuildError> {
        let dir = dir.as_ref();
        Ok(Self {
            manifest: read_json(&dir.join(MANIFEST_FILE))?,
            imports: read_json(&dir.join(REGISTRY_FILE))?,
            prerender: read_json(&dir.join(PRERENDER_FILE))?,
        })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BuildError> {
    let mut json = serde_json::to_string_pretty(value).map_err(|e| BuildError::json(path, e))?;
    json.push('\n');
    fs::write(path, json).map_err(|e| BuildError::io(path, e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BuildError> {
    let content = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| BuildError::json(path, e))
}
