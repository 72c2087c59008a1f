//! File roles in the app directory

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role a file plays in the route tree, decided once from its name
///
/// | Role          | File stem     |
/// |---------------|---------------|
/// | `Shell`       | `_root`       |
/// | `Layout`      | `_layout`     |
/// | `NotFound`    | `not-found`   |
/// | `Loader`      | `loading`     |
/// | `Interceptor` | `_middleware` |
/// | `Page`        | `page`        |
/// | `Endpoint`    | `api`         |
///
/// Variants are declared in processing order: within one directory, role
/// files are bound before the page that consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteRole {
    Shell,
    Layout,
    NotFound,
    Loader,
    Interceptor,
    Page,
    Endpoint,
}

impl RouteRole {
    pub const ALL: [RouteRole; 7] = [
        RouteRole::Shell,
        RouteRole::Layout,
        RouteRole::NotFound,
        RouteRole::Loader,
        RouteRole::Interceptor,
        RouteRole::Page,
        RouteRole::Endpoint,
    ];

    /// File stem that marks this role
    pub fn stem(self) -> &'static str {
        match self {
            RouteRole::Shell => "_root",
            RouteRole::Layout => "_layout",
            RouteRole::NotFound => "not-found",
            RouteRole::Loader => "loading",
            RouteRole::Interceptor => "_middleware",
            RouteRole::Page => "page",
            RouteRole::Endpoint => "api",
        }
    }

    pub fn from_stem(stem: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.stem() == stem)
    }

    /// Classifies `stem.ext` file names; names without an extension never
    /// carry a role, so a directory called `page` stays a route segment.
    ///
    /// ```
    /// use rhtmx_routes::RouteRole;
    ///
    /// assert_eq!(RouteRole::from_file_name("page.rsx"), Some((RouteRole::Page, "rsx")));
    /// assert_eq!(RouteRole::from_file_name("not-found.rhtml"), Some((RouteRole::NotFound, "rhtml")));
    /// assert_eq!(RouteRole::from_file_name("page"), None);
    /// assert_eq!(RouteRole::from_file_name("helpers.rs"), None);
    /// ```
    pub fn from_file_name(name: &str) -> Option<(Self, &str)> {
        let (stem, ext) = name.split_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Self::from_stem(stem).map(|role| (role, ext))
    }
}

impl fmt::Display for RouteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}
