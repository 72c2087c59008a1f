// File: src/config.rs
// Purpose: Route compiler configuration from rhtmx.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Route compiler configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

/// Where routes come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Directory containing the route tree (default: "app")
    #[serde(default = "default_app_dir")]
    pub app_dir: PathBuf,

    /// Accepted role file extensions, in preference order
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

/// What the build produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Output directory for manifest.json, registry.json and prerender.json
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Treat every page as prerenderable
    #[serde(default = "default_false")]
    pub prerender_all: bool,

    /// Sidecar file holding parameter sets for dynamic prerendered pages
    #[serde(default = "default_params_file")]
    pub params_file: String,
}

// Default values
fn default_app_dir() -> PathBuf {
    PathBuf::from("app")
}

fn default_extensions() -> Vec<String> {
    vec!["rsx".to_string(), "rs".to_string(), "rhtml".to_string()]
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(".rhtmx/routes")
}

fn default_params_file() -> String {
    "static-params.json".to_string()
}

fn default_false() -> bool {
    false
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            app_dir: default_app_dir(),
            extensions: default_extensions(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            prerender_all: false,
            params_file: default_params_file(),
        }
    }
}

impl RoutingConfig {
    /// Preference rank of an extension, `None` if it is not accepted
    pub fn extension_rank(&self, ext: &str) -> Option<usize> {
        self.extensions.iter().position(|accepted| accepted == ext)
    }
}

impl Config {
    /// Load configuration from a toml file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load configuration from default path (./rhtmx.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("rhtmx.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.routing.app_dir, PathBuf::from("app"));
        assert_eq!(config.routing.extensions, vec!["rsx", "rs", "rhtml"]);
        assert_eq!(config.build.out_dir, PathBuf::from(".rhtmx/routes"));
        assert!(!config.build.prerender_all);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let toml = r#"
            [build]
            prerender_all = true
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.build.prerender_all);
        assert_eq!(config.build.params_file, "static-params.json");
        assert_eq!(config.routing.app_dir, PathBuf::from("app"));
    }

    #[test]
    fn test_extension_rank() {
        let routing = RoutingConfig::default();
        assert_eq!(routing.extension_rank("rsx"), Some(0));
        assert_eq!(routing.extension_rank("rhtml"), Some(2));
        assert_eq!(routing.extension_rank("tsx"), None);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load("definitely/not/here/rhtmx.toml").unwrap();
        assert_eq!(config.routing.app_dir, PathBuf::from("app"));
    }
}
