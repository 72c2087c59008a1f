/// Canonicalization of file-system paths into route patterns
///
/// Pure functional parsers: same input → same output, no side effects.

use super::pattern::{classify_segment, PatternToken, SegmentKind};
use crate::RouteParams;

/// A canonical route derived from a directory path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoute {
    /// URL pattern like `/users/:id`
    pub pattern: String,
    /// Tokens of the pattern, in order
    pub tokens: Vec<PatternToken>,
    /// Parameter names, in order of appearance
    pub params: Vec<String>,
    /// Whether any token is dynamic or catch-all
    pub dynamic: bool,
    /// Whether the pattern contains a catch-all token
    pub catch_all: bool,
}

impl ParsedRoute {
    /// A catch-all is only meaningful as the final token
    pub fn catch_all_is_trailing(&self) -> bool {
        match self
            .tokens
            .iter()
            .position(|t| matches!(t, PatternToken::CatchAll(_)))
        {
            Some(pos) => pos + 1 == self.tokens.len(),
            None => true,
        }
    }
}

/// Fold accumulator for [`to_canonical_route`]
#[derive(Default)]
struct ParseState {
    tokens: Vec<PatternToken>,
}

impl ParseState {
    fn with_token(mut self, token: PatternToken) -> Self {
        self.tokens.push(token);
        self
    }

    fn finalize(self) -> ParsedRoute {
        let pattern = render_pattern(&self.tokens);
        let params = self
            .tokens
            .iter()
            .filter_map(|t| t.param_name().map(str::to_string))
            .collect::<Vec<_>>();
        let catch_all = self
            .tokens
            .iter()
            .any(|t| matches!(t, PatternToken::CatchAll(_)));

        ParsedRoute {
            pattern,
            dynamic: !params.is_empty(),
            catch_all,
            params,
            tokens: self.tokens,
        }
    }
}

/// Processes one path segment (pure function: (state, segment) -> new state)
fn process_segment(state: ParseState, segment: &str) -> ParseState {
    if segment.is_empty() || segment == "." {
        return state;
    }

    match classify_segment(segment) {
        SegmentKind::Group => state,
        SegmentKind::Static(s) => state.with_token(PatternToken::Static(s)),
        SegmentKind::Dynamic(name) => state.with_token(PatternToken::Dynamic(name)),
        SegmentKind::CatchAll(name) => state.with_token(PatternToken::CatchAll(name)),
    }
}

/// Converts a directory path relative to the app root into its canonical route
///
/// Every component is a directory name, even one that looks like a role
/// file (`api.v2`). Route groups do not contribute to the pattern and
/// platform separators are accepted.
///
/// # Examples
///
/// ```
/// use rhtmx_routes::route::parser::to_canonical_route;
///
/// let route = to_canonical_route("users/[id]");
/// assert_eq!(route.pattern, "/users/:id");
/// assert_eq!(route.params, vec!["id".to_string()]);
///
/// let route = to_canonical_route("(docs)\\files\\[...path]");
/// assert_eq!(route.pattern, "/files/*path");
/// assert!(route.catch_all);
///
/// assert_eq!(to_canonical_route("").pattern, "/");
/// ```
pub fn to_canonical_route(relative_path: &str) -> ParsedRoute {
    relative_path
        .replace('\\', "/")
        .split('/')
        .fold(ParseState::default(), process_segment)
        .finalize()
}

fn render_pattern(tokens: &[PatternToken]) -> String {
    if tokens.is_empty() {
        return "/".to_string();
    }

    tokens.iter().fold(String::new(), |mut acc, token| {
        acc.push('/');
        acc.push_str(&token.canonical());
        acc
    })
}

/// Splits a canonical pattern back into tokens
///
/// ```
/// use rhtmx_routes::route::parser::tokenize;
/// use rhtmx_routes::route::PatternToken;
///
/// assert_eq!(
///     tokenize("/users/:id"),
///     vec![PatternToken::Static("users".into()), PatternToken::Dynamic("id".into())]
/// );
/// assert!(tokenize("/").is_empty());
/// ```
pub fn tokenize(pattern: &str) -> Vec<PatternToken> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                PatternToken::Dynamic(name.to_string())
            } else if let Some(name) = segment.strip_prefix('*') {
                PatternToken::CatchAll(name.to_string())
            } else {
                PatternToken::Static(segment.to_string())
            }
        })
        .collect()
}

/// Renders tokens as the directory path that would produce them
///
/// ```
/// use rhtmx_routes::route::parser::{compose_from_tokens, tokenize};
///
/// assert_eq!(compose_from_tokens(&tokenize("/users/:id/*rest")), "users/[id]/[...rest]");
/// ```
pub fn compose_from_tokens(tokens: &[PatternToken]) -> String {
    tokens
        .iter()
        .map(PatternToken::directory_name)
        .collect::<Vec<_>>()
        .join("/")
}

/// Specificity score used to rank competing matches
///
/// 2 per static token, 1 per dynamic token, 0 for a catch-all: a literal
/// route always outranks a parameterized one of the same length.
///
/// ```
/// use rhtmx_routes::route::parser::{specificity, tokenize};
///
/// assert_eq!(specificity(&tokenize("/users/settings")), 4);
/// assert_eq!(specificity(&tokenize("/users/:id")), 3);
/// ```
pub fn specificity(tokens: &[PatternToken]) -> usize {
    tokens
        .iter()
        .map(|token| match token {
            PatternToken::Static(_) => 2,
            PatternToken::Dynamic(_) => 1,
            PatternToken::CatchAll(_) => 0,
        })
        .sum()
}

/// Substitutes a parameter set into a canonical pattern
///
/// Returns `None` if any parameter of the pattern is missing or empty.
///
/// ```
/// use rhtmx_routes::route::parser::fill_pattern;
/// use std::collections::HashMap;
///
/// let params = HashMap::from([("slug".to_string(), "guide/intro".to_string())]);
/// assert_eq!(fill_pattern("/docs/*slug", &params), Some("/docs/guide/intro".to_string()));
/// assert_eq!(fill_pattern("/users/:id", &params), None);
/// ```
pub fn fill_pattern(pattern: &str, params: &RouteParams) -> Option<String> {
    let segments = tokenize(pattern)
        .into_iter()
        .map(|token| match token {
            PatternToken::Static(s) => Some(s),
            PatternToken::Dynamic(name) | PatternToken::CatchAll(name) => params
                .get(&name)
                .filter(|value| !value.is_empty())
                .map(|value| value.trim_matches('/').to_string()),
        })
        .collect::<Option<Vec<String>>>()?;

    if segments.is_empty() {
        Some("/".to_string())
    } else {
        Some(format!("/{}", segments.join("/")))
    }
}
