/// Request path handling for the matcher
///
/// Incoming paths are brought into the same canonical form as manifest
/// keys (`/`, `/users/42`) before any lookup.

use std::borrow::Cow;

pub mod hierarchy;
pub use hierarchy::PathHierarchy;

/// Whether `path` is already canonical: leading `/`, no empty segments,
/// no backslashes, and no trailing `/` unless it is the root
///
/// ```
/// use rhtmx_routes::path::is_valid_path;
///
/// assert!(is_valid_path("/"));
/// assert!(is_valid_path("/files/a/b"));
/// assert!(!is_valid_path("files/a"));
/// assert!(!is_valid_path("/files/"));
/// ```
pub fn is_valid_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    !rest.contains('\\') && rest.split('/').all(|segment| !segment.is_empty())
}

/// Canonical form of a request path
///
/// Query strings and fragments are dropped, backslashes become `/`, and
/// empty segments disappear. Already canonical input is returned borrowed.
///
/// ```
/// use rhtmx_routes::path::normalize_path;
/// use std::borrow::Cow;
///
/// assert!(matches!(normalize_path("/users/42"), Cow::Borrowed(_)));
/// assert_eq!(normalize_path("users//42/"), "/users/42");
/// assert_eq!(normalize_path("/search?q=rust#top"), "/search");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let path = path
        .split_once(|c| c == '?' || c == '#')
        .map_or(path, |(before, _)| before);

    if is_valid_path(path) {
        return Cow::Borrowed(path);
    }

    let joined = path
        .split(|c| c == '/' || c == '\\')
        .filter(|segment| !segment.is_empty())
        .fold(String::new(), |mut acc, segment| {
            acc.push('/');
            acc.push_str(segment);
            acc
        });

    if joined.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(joined)
    }
}

/// Non-empty segments of a canonical path
///
/// ```
/// use rhtmx_routes::path::segments;
///
/// assert_eq!(segments("/files/a/b"), vec!["files", "a", "b"]);
/// assert!(segments("/").is_empty());
/// ```
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
