//! Document metadata collected along a route's chain
//!
//! Each level of the chain (shell, layouts, page, and not-found boundaries
//! when an error is present) may declare metadata, either as a value or as
//! a function of the request params and error. All declarations run
//! concurrently and are merged from lowest to highest priority.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::RouteParams;

/// Placeholder a title template substitutes the downstream title into
pub const TITLE_PLACEHOLDER: &str = "%s";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<MetaTag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkTag>,
}

impl Metadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_meta(mut self, tag: MetaTag) -> Self {
        self.meta.push(tag);
        self
    }

    pub fn with_link(mut self, tag: LinkTag) -> Self {
        self.links.push(tag);
        self
    }
}

/// A `<meta>` tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default, rename = "http-equiv", skip_serializing_if = "Option::is_none")]
    pub http_equiv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl MetaTag {
    pub fn named(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn property(property: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Identity used to deduplicate across levels; `None` is never merged
    pub fn key(&self) -> Option<String> {
        if let Some(name) = &self.name {
            Some(format!("name:{}", name))
        } else if let Some(property) = &self.property {
            Some(format!("property:{}", property))
        } else if let Some(http_equiv) = &self.http_equiv {
            Some(format!("http-equiv:{}", http_equiv))
        } else {
            self.charset.as_ref().map(|_| "charset".to_string())
        }
    }
}

/// A `<link>` tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTag {
    pub rel: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

impl LinkTag {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> String {
        format!("link:{}:{}", self.rel, self.href)
    }
}

/// The error a not-found boundary is rendering for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteError {
    pub status: u16,
    pub message: String,
}

impl RouteError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }
}

/// Input handed to dynamic metadata declarations
#[derive(Debug, Clone, Default)]
pub struct MetadataContext {
    pub params: RouteParams,
    pub error: Option<RouteError>,
}

pub type MetadataFuture = BoxFuture<'static, anyhow::Result<Metadata>>;
type MetadataFn = dyn Fn(MetadataContext) -> MetadataFuture + Send + Sync;

/// A metadata declaration: a plain value, or a function of the request
#[derive(Clone)]
pub enum MetadataSource {
    Static(Metadata),
    Dynamic(Arc<MetadataFn>),
}

impl MetadataSource {
    /// Wraps an async function of the request context
    ///
    /// ```
    /// use rhtmx_routes::{Metadata, MetadataSource};
    ///
    /// let source = MetadataSource::dynamic(|ctx| async move {
    ///     let id = ctx.params.get("id").cloned().unwrap_or_default();
    ///     Ok(Metadata::titled(format!("User {}", id)))
    /// });
    /// # let _ = source;
    /// ```
    pub fn dynamic<F, Fut>(f: F) -> Self
    where
        F: Fn(MetadataContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Metadata>> + Send + 'static,
    {
        MetadataSource::Dynamic(Arc::new(move |ctx| -> MetadataFuture { Box::pin(f(ctx)) }))
    }

    async fn produce(&self, ctx: MetadataContext) -> anyhow::Result<Metadata> {
        match self {
            MetadataSource::Static(metadata) => Ok(metadata.clone()),
            MetadataSource::Dynamic(f) => f(ctx).await,
        }
    }
}

impl fmt::Debug for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataSource::Static(metadata) => f.debug_tuple("Static").field(metadata).finish(),
            MetadataSource::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Merge order; later levels overwrite earlier ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataPriority {
    Shell,
    Layout,
    Page,
    NotFound,
}

/// Runs every declaration concurrently and merges the results
///
/// Not-found declarations only take part when `ctx.error` is set. A
/// failing declaration is logged and contributes nothing.
pub async fn collect(
    sources: Vec<(MetadataPriority, MetadataSource)>,
    ctx: MetadataContext,
) -> Metadata {
    let has_error = ctx.error.is_some();
    let tasks = sources
        .into_iter()
        .filter(|(priority, _)| has_error || *priority != MetadataPriority::NotFound)
        .map(|(priority, source)| {
            let ctx = ctx.clone();
            async move {
                match source.produce(ctx).await {
                    Ok(metadata) => (priority, metadata),
                    Err(e) => {
                        warn!(?priority, error = %format!("{:#}", e), "metadata declaration failed");
                        (priority, Metadata::default())
                    }
                }
            }
        });

    let mut results = join_all(tasks).await;
    results.sort_by_key(|(priority, _)| *priority);

    results
        .into_iter()
        .fold(Merge::default(), |merge, (_, metadata)| merge.apply(metadata))
        .finish()
}

/// Title resolution across levels
///
/// Plain titles are last-writer-wins. The first title containing the
/// placeholder becomes the template, and the first plain title after it
/// fills the template and fixes the result.
#[derive(Debug, Default)]
struct TitleMerge {
    template: Option<String>,
    plain: Option<String>,
    filled: Option<String>,
}

impl TitleMerge {
    fn push(&mut self, title: String) {
        if self.filled.is_some() {
            return;
        }
        if title.contains(TITLE_PLACEHOLDER) {
            if self.template.is_none() {
                self.template = Some(title);
            }
            return;
        }
        match &self.template {
            Some(template) => self.filled = Some(template.replace(TITLE_PLACEHOLDER, &title)),
            None => self.plain = Some(title),
        }
    }

    fn finish(self) -> Option<String> {
        self.filled.or(self.plain)
    }
}

/// Tags in first-seen position, later values replacing earlier ones
#[derive(Debug)]
struct KeyedTags<T> {
    tags: Vec<T>,
    positions: HashMap<String, usize>,
}

impl<T> Default for KeyedTags<T> {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T> KeyedTags<T> {
    fn push(&mut self, key: Option<String>, tag: T) {
        let Some(key) = key else {
            self.tags.push(tag);
            return;
        };
        match self.positions.get(&key) {
            Some(&pos) => self.tags[pos] = tag,
            None => {
                self.positions.insert(key, self.tags.len());
                self.tags.push(tag);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Merge {
    title: TitleMerge,
    meta: KeyedTags<MetaTag>,
    links: KeyedTags<LinkTag>,
}

impl Merge {
    fn apply(mut self, metadata: Metadata) -> Self {
        if let Some(title) = metadata.title {
            self.title.push(title);
        }
        for tag in metadata.meta {
            self.meta.push(tag.key(), tag);
        }
        for link in metadata.links {
            self.links.push(Some(link.key()), link);
        }
        self
    }

    fn finish(self) -> Metadata {
        Metadata {
            title: self.title.finish(),
            meta: self.meta.tags,
            links: self.links.tags,
        }
    }
}
