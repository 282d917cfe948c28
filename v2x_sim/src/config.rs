//! TOML run configuration for the CLI.
//!
//! ```toml
//! [index]
//! version = "v2.0"
//! scene_start = 0
//! scene_end = 4
//! agent_start = 1
//! agent_end = 6
//!
//! [selection]
//! method = "closest_k"
//! options = { k = 4 }
//!
//! [sim]
//! seed = 7
//! frames_per_scene = 40
//! ```
//!
//! Every section and key is optional.

use crate::error::{Result, SimError};
use crate::world::SimConfig;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use v2x_core::{IndexConfig, SelectionMethod, SelectionStrategy};

/// Selection method plus its open option bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub method: SelectionMethod,
    pub options: Map<String, Value>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            method: SelectionMethod::Identity,
            options: Map::new(),
        }
    }
}

impl SelectionConfig {
    /// Builds the strategy from the method and options.
    pub fn strategy(&self) -> Result<SelectionStrategy> {
        Ok(SelectionStrategy::from_options(self.method, &self.options)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub index: IndexConfig,
    pub selection: SelectionConfig,
    pub sim: SimConfig,
}

impl RunConfig {
    /// Parses a TOML document.
    pub fn from_toml(text: &str, origin: &str) -> Result<Self> {
        toml::from_str(text).map_err(|source| SimError::Toml {
            path: origin.to_string(),
            source,
        })
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text, &path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use v2x_core::CoreError;

    #[test]
    fn test_empty_document_is_default() {
        let config = RunConfig::from_toml("", "inline").unwrap();
        assert_eq!(config, RunConfig::default());
        assert!(matches!(config.selection.strategy().unwrap(), SelectionStrategy::Identity));
    }

    #[test]
    fn test_sections_override_defaults() {
        let text = r#"
            [index]
            scene_end = 4
            agent_start = 1

            [index.layout]
            position_dir = "gps"

            [selection]
            method = "velocity"
            options = { K = 2, note = "ignored" }

            [sim]
            seed = 7
        "#;
        let config = RunConfig::from_toml(text, "inline").unwrap();

        assert_eq!(config.index.scene_range(), 0..4);
        assert_eq!(config.index.agent_range(), 1..6);
        assert_eq!(config.index.layout.position_dir, "gps");
        assert_eq!(config.index.layout.inertial_dir, "imu");
        assert_eq!(config.sim.seed, 7);
        assert_eq!(config.sim.frame_interval_us, 200_000);

        match config.selection.strategy().unwrap() {
            SelectionStrategy::VelocityBased(opts) => assert_eq!(opts.k, 2),
            other => panic!("unexpected strategy {other:?}"),
        }
    }

    #[test]
    fn test_bad_documents() {
        assert!(matches!(
            RunConfig::from_toml("[selection]\nmethod = \"random\"", "inline"),
            Err(SimError::Toml { .. })
        ));

        let config = RunConfig::from_toml("[selection]\nmethod = \"closest_k\"\noptions = { k = \"three\" }", "inline").unwrap();
        assert!(matches!(
            config.selection.strategy(),
            Err(SimError::Core(CoreError::InvalidArgument(_)))
        ));

        assert!(matches!(RunConfig::load("/nonexistent/run.toml"), Err(SimError::Io { .. })));
    }
}
