//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/vidigraph/config.toml` (XDG) or platform config dir
//! 2. Project config: `.vidigraph.toml`
//! 3. Environment variables: `VIDIGRAPH_*` (nested keys split on `__`)
//!
//! # Intended Usage
//!
//! **Global config** (`~/.config/vidigraph/config.toml`):
//! ```toml
//! [neo4j]
//! uri = "bolt://localhost:7687"
//! user = "neo4j"
//! password = "secret"
//!
//! [storage]
//! backend = "neo4j"
//! ```
//!
//! **Project config** (`.vidigraph.toml` next to the dataset):
//! ```toml
//! [dataset]
//! name = "friends"
//! dir = "./data"
//!
//! [context]
//! node_scale = 0.8
//! node_default_color = "#808080"
//!
//! [layouts.hairball]
//! translation = [0.0, 1.2, 0.0]
//! ```

use std::ops::Deref;
use std::path::PathBuf;

use bevy_math::Vec3;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::contexts::ContextSettings;
use crate::transformers::LayoutAnchors;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub context: ContextSettings,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub layouts: LayoutAnchors,
    #[serde(default)]
    pub bring_node: BringNodeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub neo4j: Option<Neo4jConfig>,
}

/// Dataset location.
///
/// Typically defined in project config (`.vidigraph.toml`).
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// Dataset name, the prefix of every layout file (required).
    pub name: String,
    /// Directory holding `{name}-layout.json-{variant}.json` files.
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Transition timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Duration of animated layout transitions.
    pub duration_secs: f32,
    /// Frame rate of the headless frame loop.
    pub frame_rate: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_secs: 1.0,
            frame_rate: 60,
        }
    }
}

impl AnimationConfig {
    pub fn frame_time(&self) -> f32 {
        1.0 / self.frame_rate.max(1) as f32
    }
}

/// Bring-node focus parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BringNodeConfig {
    /// Distance from the focal point nodes are pulled to.
    pub target_spread: f32,
    /// Focal point offset along the viewer's forward vector.
    pub offset: f32,
    pub viewer_position: [f32; 3],
    pub viewer_forward: [f32; 3],
}

impl Default for BringNodeConfig {
    fn default() -> Self {
        Self {
            target_spread: 2.0,
            offset: 0.2,
            viewer_position: [0.0, 0.0, 0.0],
            viewer_forward: [0.0, 0.0, 1.0],
        }
    }
}

impl BringNodeConfig {
    pub fn viewer(&self) -> (Vec3, Vec3) {
        (
            Vec3::from_array(self.viewer_position),
            Vec3::from_array(self.viewer_forward).normalize_or_zero(),
        )
    }
}

/// Persistence sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Write CSV dumps only.
    #[default]
    Dump,
    /// Write CSV dumps and bulk-load them into Neo4j.
    Neo4j,
}

/// Persistence configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for CSV dumps; a temporary directory when unset.
    pub dump_dir: Option<PathBuf>,
}

/// Neo4j connection settings.
///
/// Typically defined in global config (`~/.config/vidigraph/config.toml`).
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    #[serde(default = "default_neo4j_user")]
    pub user: String,
    pub password: Option<String>,
}

fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

impl Config {
    /// Load configuration with layered resolution.
    ///
    /// Resolution order (highest priority last):
    /// 1. User config (`~/.config/vidigraph/config.toml`)
    /// 2. Project config (`.vidigraph.toml`)
    /// 3. Environment variables (`VIDIGRAPH_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered provider stack used by [`Config::load`].
    pub fn figment() -> Figment {
        let mut figment = Figment::new();

        // Prefer XDG-style ~/.config path, fall back to platform config dir
        if let Some(home) = dirs::home_dir() {
            let xdg_config = home.join(".config").join("vidigraph").join("config.toml");
            if xdg_config.exists() {
                figment = figment.merge(Toml::file(xdg_config));
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform_config = config_dir.join("vidigraph").join("config.toml");
            if platform_config.exists() {
                figment = figment.merge(Toml::file(platform_config));
            }
        }

        figment
            .merge(Toml::file(".vidigraph.toml"))
            .merge(Env::prefixed("VIDIGRAPH_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        Ok(figment.extract()?)
    }

    /// Dataset directory and name.
    pub fn dataset_location(&self) -> (PathBuf, &str) {
        (self.dataset.dir.clone(), &self.dataset.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_project_config_with_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                ".vidigraph.toml",
                r##"
                [dataset]
                name = "friends"

                [context]
                node_scale = 0.5
                node_default_color = "#ff0000"
                "##,
            )?;

            let config = Config::from_figment(Figment::new().merge(Toml::file(".vidigraph.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.dataset.name, "friends");
            assert_eq!(config.dataset.dir, PathBuf::from("data"));
            assert_eq!(config.context.node_scale, 0.5);
            assert_eq!(config.context.link_width, 0.0025);
            assert_eq!(config.context.node_default_color.red, 1.0);
            assert_eq!(config.animation.frame_rate, 60);
            assert_eq!(config.storage.backend, StorageBackend::Dump);
            assert!(config.neo4j.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        Jail::expect_with(|jail| {
            jail.create_file(".vidigraph.toml", "[dataset]\nname = \"friends\"\n")?;
            jail.set_env("VIDIGRAPH_DATASET__NAME", "bullies");
            jail.set_env("VIDIGRAPH_CONTEXT__EDGE_BUNDLING_STRENGTH", "0.3");
            jail.set_env("VIDIGRAPH_STORAGE__BACKEND", "neo4j");

            let config = Config::from_figment(
                Figment::new()
                    .merge(Toml::file(".vidigraph.toml"))
                    .merge(Env::prefixed("VIDIGRAPH_").split("__")),
            )
            .map_err(|e| e.to_string())?;
            assert_eq!(config.dataset.name, "bullies");
            assert!((config.context.edge_bundling_strength - 0.3).abs() < 1e-6);
            assert_eq!(config.storage.backend, StorageBackend::Neo4j);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_color_is_config_error() {
        Jail::expect_with(|jail| {
            jail.create_file(
                ".vidigraph.toml",
                "[dataset]\nname = \"x\"\n[context]\nselect_color = \"shiny\"\n",
            )?;

            let result = Config::from_figment(Figment::new().merge(Toml::file(".vidigraph.toml")));
            assert!(result.is_err());
            Ok(())
        });
    }
}
