//! # RHTMX Routes
//!
//! File-system route compiler and request matcher.
//!
//! Two phases:
//!
//! - **Build**: [`scan`] walks an app directory and records, for every
//!   routable directory, the chain of `_root`, `_layout`, `not-found`,
//!   `loading` and `_middleware` files inherited from the tree root.
//!   [`ManifestBuilder`] turns that into a [`Manifest`], an [`ImportTable`]
//!   and the set of prerenderable paths.
//! - **Request**: [`Matcher`] resolves a path and method to the best entry
//!   (or the closest not-found boundary), and [`ChainResolver`] loads the
//!   entry's chain through a [`LoaderRegistry`] with at-most-once loads.
//!
//! ## File Convention
//!
//! ```text
//! app/
//!   _root.rsx            shell, wraps every route below it
//!   page.rsx             /
//!   not-found.rsx
//!   users/
//!     _layout.rsx
//!     page.rsx           /users
//!     settings/page.rsx  /users/settings
//!     [id]/page.rsx      /users/:id
//!   files/[...path]/
//!     page.rsx           /files/*path
//!   (marketing)/
//!     about/page.rsx     /about
//!   posts/api.rs         one endpoint per exported verb
//! ```
//!
//! ## Example
//!
//! ```
//! use rhtmx_routes::{scan, ManifestBuilder, Matcher, Method};
//!
//! # fn main() -> anyhow::Result<()> {
//! let app = tempfile::tempdir()?;
//! std::fs::write(app.path().join("_root.rsx"), "pub fn shell() {}")?;
//! std::fs::create_dir_all(app.path().join("users/[id]"))?;
//! std::fs::write(app.path().join("users/[id]/page.rsx"), "pub fn page() {}")?;
//!
//! let scanned = scan(app.path())?;
//! let runtime = tokio::runtime::Runtime::new()?;
//! let output = runtime.block_on(ManifestBuilder::new().build(&scanned))?;
//!
//! let matcher = Matcher::new(&output.manifest);
//! let found = matcher.match_path("/users/42", Method::Get).unwrap();
//! assert_eq!(found.entry.path(), "/users/:id");
//! assert_eq!(found.params.get("id"), Some(&"42".to_string()));
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

pub mod chain;
pub mod config;
pub mod error;
pub mod exports;
pub mod loader;
pub mod manifest;
pub mod matcher;
pub mod metadata;
pub mod path;
pub mod registry;
pub mod role;
pub mod route;
pub mod scan;

pub use chain::{ChainResolver, EnhancedMatch, ResolvedChain};
pub use config::{BuildConfig, Config, RoutingConfig};
pub use error::{BuildError, LoadError};
pub use exports::{ExportInspector, SourceExportInspector};
pub use loader::{Loader, ModuleResolver, RouteModule};
pub use manifest::{
    BuildOutput, EndpointEntry, Entry, ImportRef, ImportTable, Manifest, ManifestBuilder,
    ManifestSlot, Method, PageEntry,
};
pub use matcher::{MatchStatus, Matcher, RouteMatch};
pub use metadata::{
    LinkTag, MetaTag, Metadata, MetadataContext, MetadataPriority, MetadataSource, RouteError,
};
pub use path::{is_valid_path, normalize_path, PathHierarchy};
pub use registry::LoaderRegistry;
pub use role::RouteRole;
pub use scan::{scan, EndpointFile, ScanResult, Scanner, Segment};

/// Parameter name → value, for one request or one prerendered variant
pub type RouteParams = HashMap<String, String>;
