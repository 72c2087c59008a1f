//! Request matching against a built manifest
//!
//! Lookup order, first hit wins:
//!
//! 1. Exact `METHOD:path` lookup for parameterless routes
//! 2. Dynamic routes: candidates narrowed by the first path segment, best
//!    specificity score wins, ties go to the first registered
//! 3. Catch-all routes, in registration order
//!
//! On a miss the request path's ancestors are walked from most to least
//! specific, looking for the closest entry with a not-found boundary.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::manifest::{Entry, Manifest, Method};
use crate::path::{normalize_path, segments, PathHierarchy};
use crate::route::{specificity, tokenize, PatternToken};
use crate::RouteParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Found,
    /// Synthetic match on the closest not-found boundary
    NotFound,
}

impl MatchStatus {
    pub fn code(self) -> u16 {
        match self {
            MatchStatus::Found => 200,
            MatchStatus::NotFound => 404,
        }
    }
}

/// Result of matching a request
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<Entry>,
    pub params: RouteParams,
    pub status: MatchStatus,
}

impl RouteMatch {
    pub fn is_not_found(&self) -> bool {
        self.status == MatchStatus::NotFound
    }
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .unwrap_or(Cow::Borrowed(segment))
        .into_owned()
}

fn static_key(method: Method, path: &str) -> String {
    format!("{}:{}", method, path)
}

/// Binds equal-length non-catch-all tokens to path segments
fn bind(tokens: &[PatternToken], segments: &[&str]) -> Option<RouteParams> {
    let mut params = RouteParams::new();
    for (token, segment) in tokens.iter().zip(segments) {
        match token {
            PatternToken::Static(s) if s == segment => {}
            PatternToken::Dynamic(name) => {
                params.insert(name.clone(), decode(segment));
            }
            _ => return None,
        }
    }
    Some(params)
}

/// Route registration record for a parameterized pattern
#[derive(Debug)]
struct Record {
    entry: Arc<Entry>,
    method: Method,
    tokens: Vec<PatternToken>,
    score: usize,
}

impl Record {
    fn fit(&self, segments: &[&str]) -> Option<RouteParams> {
        if self.tokens.len() != segments.len() {
            return None;
        }
        bind(&self.tokens, segments)
    }

    /// A catch-all needs at least one segment past its prefix
    fn fit_catch_all(&self, segments: &[&str]) -> Option<RouteParams> {
        let (PatternToken::CatchAll(name), prefix) = self.tokens.split_last()? else {
            return None;
        };
        if segments.len() <= prefix.len() {
            return None;
        }

        let mut params = bind(prefix, &segments[..prefix.len()])?;
        let rest = segments[prefix.len()..]
            .iter()
            .map(|s| decode(s))
            .collect::<Vec<_>>()
            .join("/");
        params.insert(name.clone(), rest);
        Some(params)
    }
}

/// One set of lookup structures over a list of entries
#[derive(Debug, Default)]
struct RouteTable {
    statics: HashMap<String, Arc<Entry>>,
    dynamic: Vec<Record>,
    /// First static token → indices into `dynamic`
    by_prefix: HashMap<String, Vec<usize>>,
    /// Token count → indices into `dynamic`
    by_length: HashMap<usize, Vec<usize>>,
    catch_all: Vec<Record>,
}

impl RouteTable {
    fn register(&mut self, entry: Arc<Entry>, method: Method) {
        let tokens = tokenize(entry.path());

        if tokens.iter().all(|t| matches!(t, PatternToken::Static(_))) {
            self.statics
                .entry(static_key(method, entry.path()))
                .or_insert(entry);
            return;
        }

        let record = Record {
            score: specificity(&tokens),
            entry,
            method,
            tokens,
        };

        if matches!(record.tokens.last(), Some(PatternToken::CatchAll(_))) {
            self.catch_all.push(record);
            return;
        }

        let index = self.dynamic.len();
        if let Some(PatternToken::Static(first)) = record.tokens.first() {
            self.by_prefix.entry(first.clone()).or_default().push(index);
        }
        self.by_length
            .entry(record.tokens.len())
            .or_default()
            .push(index);
        self.dynamic.push(record);
    }

    fn lookup(&self, path: &str, method: Method) -> Option<(Arc<Entry>, RouteParams)> {
        if let Some(entry) = self.statics.get(&static_key(method, path)) {
            return Some((entry.clone(), RouteParams::new()));
        }

        let segments = segments(path);
        self.best_dynamic(&segments, method)
            .or_else(|| self.first_catch_all(&segments, method))
    }

    fn best_dynamic(&self, segments: &[&str], method: Method) -> Option<(Arc<Entry>, RouteParams)> {
        let by_prefix = segments
            .first()
            .and_then(|first| self.by_prefix.get(*first))
            .and_then(|candidates| self.best_of(candidates, segments, method));

        by_prefix.or_else(|| {
            self.by_length
                .get(&segments.len())
                .and_then(|candidates| self.best_of(candidates, segments, method))
        })
    }

    fn best_of(
        &self,
        candidates: &[usize],
        segments: &[&str],
        method: Method,
    ) -> Option<(Arc<Entry>, RouteParams)> {
        let mut best: Option<(&Record, RouteParams)> = None;

        for record in candidates.iter().map(|&i| &self.dynamic[i]) {
            if record.method != method {
                continue;
            }
            let Some(params) = record.fit(segments) else {
                continue;
            };
            // Strictly greater: the first registered keeps a tie
            if best.as_ref().map_or(true, |(current, _)| record.score > current.score) {
                best = Some((record, params));
            }
        }

        best.map(|(record, params)| (record.entry.clone(), params))
    }

    fn first_catch_all(&self, segments: &[&str], method: Method) -> Option<(Arc<Entry>, RouteParams)> {
        self.catch_all
            .iter()
            .filter(|record| record.method == method)
            .find_map(|record| {
                record
                    .fit_catch_all(segments)
                    .map(|params| (record.entry.clone(), params))
            })
    }
}

/// Immutable lookup tables built once from a manifest
///
/// Safe to share across concurrent requests; matching never mutates.
#[derive(Debug, Default)]
pub struct Matcher {
    routes: RouteTable,
    boundaries: RouteTable,
}

impl Matcher {
    pub fn new(manifest: &Manifest) -> Self {
        let mut matcher = Self::default();

        for entry in manifest.entries() {
            let (boundary, routable) = match entry {
                Entry::Page(page) => (page.has_not_found(), page.page.is_some()),
                Entry::Endpoint(_) => (false, true),
            };
            let method = entry.method();
            let entry = Arc::new(entry.clone());

            if boundary {
                matcher.boundaries.register(entry.clone(), Method::Get);
            }
            if routable {
                matcher.routes.register(entry, method);
            }
        }

        debug!(
            statics = matcher.routes.statics.len(),
            dynamic = matcher.routes.dynamic.len(),
            catch_all = matcher.routes.catch_all.len(),
            "matcher ready"
        );
        matcher
    }

    /// Best route for `path`, else the closest not-found boundary
    ///
    /// The path is normalized first; query strings are ignored.
    pub fn match_path(&self, path: &str, method: Method) -> Option<RouteMatch> {
        let path = normalize_path(path);

        match self.routes.lookup(&path, method) {
            Some((entry, params)) => Some(RouteMatch {
                entry,
                params,
                status: MatchStatus::Found,
            }),
            None => self.not_found(&path),
        }
    }

    /// Closest ancestor of `path` that declares a not-found boundary
    pub fn not_found(&self, path: &str) -> Option<RouteMatch> {
        let path = normalize_path(path);

        PathHierarchy::new(&path).find_map(|prefix| {
            self.boundaries
                .lookup(prefix, Method::Get)
                .map(|(entry, params)| RouteMatch {
                    entry,
                    params,
                    status: MatchStatus::NotFound,
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{EndpointEntry, PageEntry};
    use crate::route::to_canonical_route;
    use pretty_assertions::assert_eq;

    /// Page entry for `dir`, optionally without a page or with a boundary
    fn page_entry(dir: &str, has_page: bool, not_found: bool) -> Entry {
        let route = to_canonical_route(dir);
        let depth = dir.split('/').filter(|s| !s.is_empty()).count() + 1;
        let mut boundaries = vec![None; depth];
        if not_found {
            boundaries[depth - 1] = Some(format!("nf:{}", dir));
        }

        Entry::Page(PageEntry {
            id: format!("id:{}", dir),
            path: route.pattern,
            params: route.params,
            shell: "shell".to_string(),
            page: has_page.then(|| format!("page:{}", dir)),
            layouts: vec![None; depth],
            not_found: boundaries,
            loaders: vec![None; depth],
            interceptors: vec![None; depth],
            prerender: false,
            dynamic: route.dynamic,
            catch_all: route.catch_all,
        })
    }

    fn page(dir: &str) -> Entry {
        page_entry(dir, true, false)
    }

    fn endpoint(dir: &str, method: Method) -> Entry {
        let route = to_canonical_route(dir);
        Entry::Endpoint(EndpointEntry {
            id: format!("api:{}_{}", dir, method),
            path: route.pattern,
            method,
            params: route.params,
            interceptors: vec![],
            module: format!("api:{}", dir),
        })
    }

    fn matcher(entries: Vec<Entry>) -> Matcher {
        let mut manifest = Manifest::new();
        entries.into_iter().for_each(|e| manifest.insert(e));
        Matcher::new(&manifest)
    }

    #[test]
    fn test_static_beats_dynamic() {
        let m = matcher(vec![page("users/[id]"), page("users/settings")]);

        let found = m.match_path("/users/settings", Method::Get).unwrap();
        assert_eq!(found.entry.path(), "/users/settings");
        assert!(found.params.is_empty());

        let found = m.match_path("/users/42", Method::Get).unwrap();
        assert_eq!(found.entry.path(), "/users/:id");
        assert_eq!(found.params["id"], "42");
    }

    #[test]
    fn test_higher_specificity_wins_among_dynamic() {
        let m = matcher(vec![page("[a]/[b]/edit"), page("users/[id]/edit"), page("[a]/[b]/[c]")]);

        let found = m.match_path("/users/7/edit", Method::Get).unwrap();
        assert_eq!(found.entry.path(), "/users/:id/edit");

        let found = m.match_path("/teams/7/edit", Method::Get).unwrap();
        assert_eq!(found.entry.path(), "/:a/:b/edit");
    }

    #[test]
    fn test_prefix_miss_falls_back_to_equal_length() {
        let m = matcher(vec![page("users/[id]/edit"), page("[section]/list")]);

        let found = m.match_path("/users/list", Method::Get).unwrap();
        assert_eq!(found.entry.path(), "/:section/list");
        assert_eq!(found.params["section"], "users");
    }

    #[test]
    fn test_catch_all_takes_the_suffix() {
        let m = matcher(vec![page("files/[...path]")]);

        let found = m.match_path("/files/a/b/c", Method::Get).unwrap();
        assert_eq!(found.params["path"], "a/b/c");

        assert!(m.match_path("/files", Method::Get).is_none());
    }

    #[test]
    fn test_dynamic_segments_are_percent_decoded() {
        let m = matcher(vec![page("tags/[tag]"), page("docs/[...slug]")]);

        assert_eq!(m.match_path("/tags/rust%20lang", Method::Get).unwrap().params["tag"], "rust lang");
        assert_eq!(m.match_path("/docs/a%2Fb/c", Method::Get).unwrap().params["slug"], "a/b/c");
    }

    #[test]
    fn test_methods_are_matched_separately() {
        let m = matcher(vec![
            page("posts"),
            endpoint("posts", Method::Post),
            endpoint("posts/[id]", Method::Delete),
        ]);

        assert!(matches!(
            m.match_path("/posts", Method::Get).unwrap().entry.as_ref(),
            Entry::Page(_)
        ));
        assert_eq!(m.match_path("/posts", Method::Post).unwrap().entry.method(), Method::Post);
        assert_eq!(m.match_path("/posts/9", Method::Delete).unwrap().params["id"], "9");
        assert!(m.match_path("/posts", Method::Put).is_none());
    }

    #[test]
    fn test_normalizes_request_paths() {
        let m = matcher(vec![page("about")]);
        assert!(m.match_path("/about/?ref=nav", Method::Get).is_some());
        assert!(m.match_path("//about", Method::Get).is_some());
    }

    #[test]
    fn test_miss_falls_back_to_closest_boundary() {
        let m = matcher(vec![
            page_entry("", true, true),
            page_entry("admin", false, true),
            page("admin/users"),
        ]);

        let miss = m.match_path("/admin/nope/deeper", Method::Get).unwrap();
        assert_eq!(miss.status, MatchStatus::NotFound);
        assert_eq!(miss.status.code(), 404);
        assert_eq!(miss.entry.id(), "id:admin");

        let miss = m.match_path("/elsewhere", Method::Get).unwrap();
        assert_eq!(miss.entry.id(), "id:");
    }

    #[test]
    fn test_layout_only_entries_never_match() {
        let m = matcher(vec![page_entry("admin", false, false)]);
        assert!(m.match_path("/admin", Method::Get).is_none());
    }

    #[test]
    fn test_no_boundary_means_no_match() {
        let m = matcher(vec![page("about")]);
        assert!(m.match_path("/missing", Method::Get).is_none());
    }
}
