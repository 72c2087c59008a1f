//! Shared helpers for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use rhtmx_routes::{scan, BuildOutput, ManifestBuilder, ScanResult};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Writes `(relative path, contents)` pairs into a fresh app directory
pub fn app(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, contents) in files {
        write(dir.path(), path, contents);
    }
    dir
}

pub fn write(root: &Path, path: &str, contents: &str) {
    let file = root.join(path);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(file, contents).unwrap();
}

/// Routes scan and build warnings to the test output (`RUST_LOG=debug`)
pub fn trace() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn scan_app(dir: &TempDir) -> ScanResult {
    trace();
    scan(dir.path()).unwrap()
}

pub async fn build_app(dir: &TempDir) -> BuildOutput {
    ManifestBuilder::new().build(&scan_app(dir)).await.unwrap()
}

/// A small site: shell, home, users with a layout, settings and a profile
pub fn site() -> TempDir {
    app(&[
        ("_root.rsx", "pub fn shell() {}"),
        ("page.rsx", "pub fn page() {}"),
        ("not-found.rsx", "pub fn not_found() {}"),
        ("users/_layout.rsx", "pub fn layout() {}"),
        ("users/page.rsx", "pub fn page() {}"),
        ("users/settings/page.rsx", "pub fn page() {}"),
        ("users/[id]/page.rsx", "pub fn page() {}"),
        ("users/[id]/loading.rsx", "pub fn loading() {}"),
        ("files/[...path]/page.rsx", "pub fn page() {}"),
        ("(marketing)/about/page.rsx", "pub fn page() {}"),
        ("posts/api.rs", "pub async fn get() {}\npub async fn post() {}"),
        ("posts/page.rsx", "pub fn page() {}"),
    ])
}
