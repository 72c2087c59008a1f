//! Integration tests for scanning and manifest building
//!
//! Every test builds a real app tree in a temporary directory.

mod common;

use std::collections::BTreeSet;
use std::fs;

use common::{app, build_app, scan_app, site};
use pretty_assertions::assert_eq;
use rhtmx_routes::manifest::id::stable_id;
use rhtmx_routes::{BuildConfig, BuildError, Entry, ManifestBuilder, Method, PageEntry};

fn page<'a>(output: &'a rhtmx_routes::BuildOutput, path: &str) -> &'a PageEntry {
    output
        .manifest
        .get(path)
        .iter()
        .find_map(Entry::as_page)
        .unwrap_or_else(|| panic!("no page entry at {}", path))
}

#[tokio::test]
async fn test_chain_lengths_match_depth() {
    let dir = site();
    let output = build_app(&dir).await;
    assert!(output.validate().is_ok());

    for entry in output.manifest.entries() {
        let Entry::Page(page) = entry else { continue };
        let Some(page_id) = &page.page else { continue };

        let import = output.imports.get(page_id).unwrap();
        let depth = import.as_str().split('/').count();

        assert_eq!(page.layouts.len(), depth, "layouts of {}", page.path);
        assert_eq!(page.not_found.len(), depth, "not_found of {}", page.path);
        assert_eq!(page.loaders.len(), depth, "loaders of {}", page.path);
        assert_eq!(page.interceptors.len(), depth, "interceptors of {}", page.path);
    }
}

#[tokio::test]
async fn test_chains_keep_holes_in_place() {
    let dir = site();
    let output = build_app(&dir).await;

    let profile = page(&output, "/users/:id");
    let layout = Some(stable_id("users/_layout.rsx"));
    let not_found = Some(stable_id("not-found.rsx"));
    let loading = Some(stable_id("users/[id]/loading.rsx"));

    assert_eq!(profile.layouts, vec![None, layout.clone(), None]);
    assert_eq!(profile.not_found, vec![not_found.clone(), None, None]);
    assert_eq!(profile.loaders, vec![None, None, loading]);
    assert_eq!(profile.params, vec!["id"]);
    assert!(profile.dynamic);

    // Siblings share position 1
    let settings = page(&output, "/users/settings");
    assert_eq!(settings.layouts, vec![None, layout, None]);
    assert_eq!(settings.loaders, vec![None, None, None]);

    let home = page(&output, "/");
    assert_eq!(home.not_found, vec![not_found]);
}

#[tokio::test]
async fn test_groups_count_as_depth_but_not_path() {
    let dir = site();
    let output = build_app(&dir).await;

    let about = page(&output, "/about");
    assert_eq!(about.layouts.len(), 3);
    assert_eq!(about.shell, stable_id("_root.rsx"));
}

#[tokio::test]
async fn test_orphan_boundary_propagates_to_descendants() {
    let dir = app(&[
        ("_root.rsx", ""),
        ("shop/not-found.rsx", ""),
        ("shop/loading.rsx", ""),
        ("shop/cart/page.rsx", ""),
    ]);
    let output = build_app(&dir).await;

    assert!(output.manifest.get("/shop").is_empty());
    assert_eq!(output.manifest.len(), 1);

    let cart = page(&output, "/shop/cart");
    assert_eq!(cart.not_found, vec![None, Some(stable_id("shop/not-found.rsx")), None]);
    assert_eq!(cart.loaders, vec![None, Some(stable_id("shop/loading.rsx")), None]);
    assert!(output.validate().is_ok());
}

#[tokio::test]
async fn test_layout_only_directory_is_kept_without_page() {
    let dir = app(&[
        ("_root.rsx", ""),
        ("docs/_layout.rsx", ""),
        ("docs/not-found.rsx", ""),
        ("docs/intro/page.rsx", ""),
    ]);
    let output = build_app(&dir).await;

    let docs = page(&output, "/docs");
    assert_eq!(docs.page, None);
    assert_eq!(docs.id, stable_id("docs"));
    assert!(docs.has_not_found());

    let intro = page(&output, "/docs/intro");
    assert_eq!(intro.layouts[1], Some(stable_id("docs/_layout.rsx")));
}

#[tokio::test]
async fn test_rebuild_is_byte_identical() {
    let dir = site();
    let out = tempfile::tempdir().unwrap();

    build_app(&dir).await.write_to(out.path().join("first")).unwrap();
    build_app(&dir).await.write_to(out.path().join("second")).unwrap();

    for file in ["manifest.json", "registry.json", "prerender.json"] {
        let first = fs::read(out.path().join("first").join(file)).unwrap();
        let second = fs::read(out.path().join("second").join(file)).unwrap();
        assert_eq!(first, second, "{} differs between builds", file);
    }
}

#[tokio::test]
async fn test_ids_do_not_depend_on_location_of_app() {
    let first = build_app(&site()).await;
    let second = build_app(&site()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_shell_is_fatal() {
    let dir = app(&[("page.rsx", ""), ("blog/page.rsx", "")]);
    let err = ManifestBuilder::new()
        .build(&scan_app(&dir))
        .await
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingShell { .. }));
}

#[tokio::test]
async fn test_nested_shell_replaces_outer_shell() {
    let dir = app(&[
        ("_root.rsx", ""),
        ("page.rsx", ""),
        ("admin/_root.rsx", ""),
        ("admin/page.rsx", ""),
    ]);
    let output = build_app(&dir).await;

    assert_eq!(page(&output, "/").shell, stable_id("_root.rsx"));
    assert_eq!(page(&output, "/admin").shell, stable_id("admin/_root.rsx"));
    assert_eq!(output.imports.static_imports.len(), 2);
}

#[tokio::test]
async fn test_endpoint_per_verb_and_unsupported_dropped() {
    let dir = app(&[
        ("_root.rsx", ""),
        ("_middleware.rs", "pub fn handle() {}"),
        ("posts/page.rsx", ""),
        (
            "posts/api.rs",
            "pub async fn get() {}\npub async fn fetch() {}\n#[post]\nasync fn create() {}",
        ),
    ]);
    let output = build_app(&dir).await;

    let entries = output.manifest.get("/posts");
    let kinds: Vec<(&str, Method)> = entries
        .iter()
        .map(|e| match e {
            Entry::Page(_) => ("page", e.method()),
            Entry::Endpoint(_) => ("endpoint", e.method()),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![("page", Method::Get), ("endpoint", Method::Get), ("endpoint", Method::Post)]
    );

    let module = stable_id("posts/api.rs");
    let Entry::Endpoint(post) = &entries[2] else { panic!("expected endpoint") };
    assert_eq!(post.id, format!("{}_POST", module));
    assert_eq!(post.module, module);
    assert_eq!(post.interceptors, vec![Some(stable_id("_middleware.rs")), None]);
    assert!(output.validate().is_ok());
}

#[tokio::test]
async fn test_prerender_marker_and_parameter_expansion() {
    let dir = app(&[
        ("_root.rsx", ""),
        ("page.rsx", ""),
        ("about/page.rsx", "pub const PRERENDER: bool = true;"),
        ("blog/_layout.rsx", "pub const prerender: bool = true;"),
        ("blog/page.rsx", ""),
        ("blog/[slug]/page.rsx", "pub fn static_params() {}"),
        (
            "blog/[slug]/static-params.json",
            r#"[{"slug": "hello"}, {"slug": "world"}, {"other": "x"}]"#,
        ),
        ("blog/drafts/[id]/page.rsx", ""),
    ]);

    let output = ManifestBuilder::from_config(&BuildConfig::default())
        .build(&scan_app(&dir))
        .await
        .unwrap();

    let expected: BTreeSet<String> = ["/about", "/blog", "/blog/hello", "/blog/world"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(output.prerender, expected);

    assert!(!page(&output, "/").prerender);
    assert!(page(&output, "/blog/:slug").prerender);
    // Inherits eligibility but declares no enumeration
    assert!(page(&output, "/blog/drafts/:id").prerender);
}

#[tokio::test]
async fn test_preferred_extension_wins_within_directory() {
    let dir = app(&[
        ("_root.rsx", ""),
        ("page.rhtml", ""),
        ("page.rsx", ""),
        ("notes.txt", ""),
    ]);
    let output = build_app(&dir).await;

    let home = page(&output, "/");
    assert_eq!(home.page, Some(stable_id("page.rsx")));
    assert_eq!(output.manifest.len(), 1);
}

#[tokio::test]
async fn test_role_like_directory_names_stay_in_route() {
    let dir = app(&[
        ("_root.rsx", ""),
        ("users/page.rsx", ""),
        ("api.v2/users/page.rsx", ""),
        ("page.old/page.rsx", ""),
        ("api.v2/api.rs", "pub async fn get() {}"),
    ]);
    let output = build_app(&dir).await;

    let paths: Vec<&str> = output.manifest.paths().collect();
    assert_eq!(paths, vec!["/api.v2", "/api.v2/users", "/page.old", "/users"]);
    assert_eq!(
        page(&output, "/api.v2/users").page,
        Some(stable_id("api.v2/users/page.rsx"))
    );
    assert_eq!(page(&output, "/users").page, Some(stable_id("users/page.rsx")));
}

#[tokio::test]
async fn test_misplaced_catch_all_is_skipped() {
    let dir = app(&[
        ("_root.rsx", ""),
        ("docs/[...slug]/page.rsx", ""),
        ("docs/[...slug]/edit/page.rsx", ""),
    ]);
    let output = build_app(&dir).await;

    let paths: Vec<&str> = output.manifest.paths().collect();
    assert_eq!(paths, vec!["/docs/*slug"]);
    assert!(page(&output, "/docs/*slug").catch_all);
}

#[tokio::test]
async fn test_scan_orders_segments_deterministically() {
    let dir = site();
    let scanned = scan_app(&dir);

    let dirs: Vec<String> = scanned
        .segments
        .iter()
        .map(|s| s.dir.to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(
        dirs,
        vec![
            "",
            "(marketing)/about",
            "files/[...path]",
            "posts",
            "users",
            "users/[id]",
            "users/settings",
        ]
    );
    assert_eq!(scanned.endpoints.len(), 1);
}
