//! State index configuration.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use v2x_env::PayloadLayout;

/// Configuration for one state index build.
///
/// Scene and agent ranges are half-open: `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Catalog version tag (default: "v2.0")
    pub version: String,

    pub scene_start: usize,
    pub scene_end: usize,

    pub agent_start: u32,
    pub agent_end: u32,

    /// Sensor record filename to payload path mapping
    pub layout: PayloadLayout,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            version: "v2.0".to_string(),
            scene_start: 0,
            scene_end: 1,
            agent_start: 0,
            agent_end: 6,
            layout: PayloadLayout::default(),
        }
    }
}

impl IndexConfig {
    /// Creates a configuration for the given ranges with default layout.
    pub fn new(scenes: Range<usize>, agents: Range<u32>) -> Self {
        Self {
            scene_start: scenes.start,
            scene_end: scenes.end,
            agent_start: agents.start,
            agent_end: agents.end,
            ..Default::default()
        }
    }

    pub fn scene_range(&self) -> Range<usize> {
        self.scene_start..self.scene_end
    }

    pub fn agent_range(&self) -> Range<u32> {
        self.agent_start..self.agent_end
    }

    /// Checks that both ranges are non-empty and the layout is usable.
    pub fn validate(&self) -> Result<()> {
        if self.scene_end <= self.scene_start {
            return Err(CoreError::config(format!(
                "scene range [{}, {}) is empty",
                self.scene_start, self.scene_end
            )));
        }
        if self.agent_end <= self.agent_start {
            return Err(CoreError::config(format!(
                "agent range [{}, {}) is empty",
                self.agent_start, self.agent_end
            )));
        }
        if self.layout.sweeps_dir.is_empty() {
            return Err(CoreError::config("payload layout sweeps_dir is empty"));
        }
        Ok(())
    }

    /// Checks the scene range against a catalog of `scene_count` scenes.
    pub fn validate_against(&self, scene_count: usize) -> Result<()> {
        self.validate()?;
        if self.scene_end > scene_count {
            return Err(CoreError::config(format!(
                "scene range [{}, {}) exceeds catalog of {} scenes",
                self.scene_start, self.scene_end, scene_count
            )));
        }
        Ok(())
    }
}
