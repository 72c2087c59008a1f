/// Classification of directory names and canonical pattern tokens
///
/// Pure functional parsing of file-system route segments into typed segments.

use serde::{Deserialize, Serialize};

/// What a single directory name contributes to a route
///
/// # Examples
///
/// ```
/// use rhtmx_routes::route::pattern::{classify_segment, SegmentKind};
///
/// assert_eq!(classify_segment("about"), SegmentKind::Static("about".into()));
/// assert_eq!(classify_segment("[id]"), SegmentKind::Dynamic("id".into()));
/// assert_eq!(classify_segment("[...slug]"), SegmentKind::CatchAll("slug".into()));
/// assert_eq!(classify_segment("(marketing)"), SegmentKind::Group);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal text: `about`
    Static(String),
    /// Named parameter consuming exactly one segment: `[id]`
    Dynamic(String),
    /// Trailing parameter consuming the rest of the path: `[...slug]`
    CatchAll(String),
    /// Route group: `(admin)` organizes files without adding a URL segment
    Group,
}

/// Classifies a directory name (pure function)
///
/// Rules are evaluated in order:
///
/// 1. **Group**: `(name)`
/// 2. **Catch-all**: `[...name]`
/// 3. **Dynamic**: `[name]`
/// 4. **Static**: anything else
pub fn classify_segment(segment: &str) -> SegmentKind {
    if segment.len() > 2 && segment.starts_with('(') && segment.ends_with(')') {
        return SegmentKind::Group;
    }

    match segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(inner) => match inner.strip_prefix("...") {
            Some(name) if !name.is_empty() => SegmentKind::CatchAll(name.to_string()),
            None if !inner.is_empty() => SegmentKind::Dynamic(inner.to_string()),
            // `[]` and `[...]` name nothing
            _ => SegmentKind::Static(segment.to_string()),
        },
        None => SegmentKind::Static(segment.to_string()),
    }
}

/// One token of a canonical route pattern such as `/users/:id/*rest`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PatternToken {
    Static(String),
    Dynamic(String),
    CatchAll(String),
}

impl PatternToken {
    /// Renders the token in canonical pattern syntax (without the leading `/`)
    pub fn canonical(&self) -> String {
        match self {
            PatternToken::Static(s) => s.clone(),
            PatternToken::Dynamic(name) => format!(":{}", name),
            PatternToken::CatchAll(name) => format!("*{}", name),
        }
    }

    /// Renders the token as a directory name
    pub fn directory_name(&self) -> String {
        match self {
            PatternToken::Static(s) => s.clone(),
            PatternToken::Dynamic(name) => format!("[{}]", name),
            PatternToken::CatchAll(name) => format!("[...{}]", name),
        }
    }

    /// Parameter name carried by the token, if any
    pub fn param_name(&self) -> Option<&str> {
        match self {
            PatternToken::Static(_) => None,
            PatternToken::Dynamic(name) | PatternToken::CatchAll(name) => Some(name),
        }
    }
}
