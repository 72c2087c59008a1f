//! Stable identifiers for route files
//!
//! IDs derive only from a file's path relative to the app root, so the same
//! tree produces the same IDs on every build regardless of scan order.

use std::path::Path;

use blake3::Hasher;

use super::Method;

/// Compute a stable ID from a forward-slash path relative to the app root
///
/// # Format
///
/// `m_{16_hex_chars}`: the first 16 hex characters (64 bits) of the blake3
/// hash of the path.
///
/// ```
/// use rhtmx_routes::manifest::id::stable_id;
///
/// let id = stable_id("users/[id]/page.rsx");
/// assert!(id.starts_with("m_"));
/// assert_eq!(id.len(), 18);
/// assert_eq!(id, stable_id("users/[id]/page.rsx"));
/// assert_ne!(id, stable_id("users/page.rsx"));
/// ```
pub fn stable_id(relative_import_path: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(relative_import_path.as_bytes());
    let hash = hasher.finalize();
    format!("m_{}", &hash.to_hex()[..16])
}

/// Forward-slash rendering of a relative path, independent of platform
pub fn import_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// One endpoint entry per verb exported by the same file
pub fn endpoint_id(file_id: &str, method: Method) -> String {
    format!("{}_{}", file_id, method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_ids_ignore_platform_separators() {
        let nested: PathBuf = ["users", "[id]", "page.rsx"].iter().collect();
        assert_eq!(import_path(&nested), "users/[id]/page.rsx");
        assert_eq!(stable_id(&import_path(&nested)), stable_id("users/[id]/page.rsx"));
    }

    #[test]
    fn test_endpoint_ids_share_file_prefix() {
        let file = stable_id("posts/api.rs");
        let get = endpoint_id(&file, Method::Get);
        let post = endpoint_id(&file, Method::Post);

        assert_eq!(get, format!("{}_GET", file));
        assert_ne!(get, post);
    }

    #[test]
    fn test_root_directory_has_an_id() {
        assert_eq!(import_path(Path::new("")), "");
        assert!(stable_id("").starts_with("m_"));
    }
}
