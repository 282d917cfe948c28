//! JSON exporter for indexed frames.
//!
//! Exports each frame's agents, feature rows and selected indices.

use crate::error::{Result, SimError};

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v2x_core::selection::{select, SelectionStrategy};
use v2x_core::{build_state_features, AgentMeta, StateIndex};

/// A single indexed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameExport {
    pub scene_id: usize,
    pub frame_id: usize,
    pub agents: Vec<AgentMeta>,

    /// One 16-wide row per agent, in `agents` order
    pub features: Vec<Vec<f64>>,

    /// Row indices kept by the selection strategy
    pub selected: Vec<usize>,
}

/// Complete index export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexExport {
    /// Selection method tag
    pub method: String,

    pub scene_start: usize,
    pub scene_end: usize,
    pub agent_start: u32,
    pub agent_end: u32,

    pub frames: Vec<FrameExport>,
}

impl IndexExport {
    /// Exports every indexed frame.
    pub fn from_index(index: &StateIndex, strategy: &SelectionStrategy) -> Self {
        let frames = index
            .iter()
            .map(|((scene_id, frame_id), _)| export_frame(index, strategy, scene_id, frame_id))
            .collect();
        Self::with_frames(index, strategy, frames)
    }

    /// Exports the frames of one scene, or a single frame of it.
    pub fn from_scene(
        index: &StateIndex,
        strategy: &SelectionStrategy,
        scene_id: usize,
        frame_id: Option<usize>,
    ) -> Self {
        let frames = index
            .iter()
            .filter(|((scene, frame), _)| *scene == scene_id && frame_id.map_or(true, |f| f == *frame))
            .map(|((scene, frame), _)| export_frame(index, strategy, scene, frame))
            .collect();
        Self::with_frames(index, strategy, frames)
    }

    fn with_frames(index: &StateIndex, strategy: &SelectionStrategy, frames: Vec<FrameExport>) -> Self {
        let config = index.config();
        Self {
            method: strategy.method().to_string(),
            scene_start: config.scene_start,
            scene_end: config.scene_end,
            agent_start: config.agent_start,
            agent_end: config.agent_end,
            frames,
        }
    }

    /// Total agent observations across exported frames.
    pub fn observation_count(&self) -> usize {
        self.frames.iter().map(|f| f.agents.len()).sum()
    }

    /// Total selected agents across exported frames.
    pub fn selected_count(&self) -> usize {
        self.frames.iter().map(|f| f.selected.len()).sum()
    }

    /// Writes the export to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        let io_err = |source| SimError::Io {
            path: path.display().to_string(),
            source,
        };
        let mut file = File::create(path).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        Ok(())
    }
}

/// Exports one frame.
pub fn export_frame(
    index: &StateIndex,
    strategy: &SelectionStrategy,
    scene_id: usize,
    frame_id: usize,
) -> FrameExport {
    let features = build_state_features(index, scene_id, frame_id);
    let selected = select(&features, strategy);
    let rows: Vec<Vec<f64>> = features.row_iter().map(|row| row.iter().copied().collect()).collect();

    FrameExport {
        scene_id,
        frame_id,
        agents: index.get_agents_meta(scene_id, frame_id).to_vec(),
        features: rows,
        selected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioId;
    use crate::world::{SimConfig, SimWorld};
    use v2x_core::FEATURE_DIM;

    fn index() -> StateIndex {
        let config = SimConfig {
            num_scenes: 2,
            frames_per_scene: 3,
            num_agents: 2,
            ..Default::default()
        };
        let dataset = SimWorld::new(config.clone()).generate(ScenarioId::Cruise).unwrap();
        StateIndex::build(&dataset.provider, config.index_config()).unwrap()
    }

    #[test]
    fn test_export_covers_every_frame() {
        let index = index();
        let export = IndexExport::from_index(&index, &SelectionStrategy::Identity);

        assert_eq!(export.method, "identity");
        assert_eq!(export.frames.len(), 6);
        assert_eq!(export.observation_count(), 12);
        assert_eq!(export.selected_count(), 12);

        let frame = &export.frames[4];
        assert_eq!((frame.scene_id, frame.frame_id), (1, 1));
        assert_eq!(frame.features.len(), 2);
        assert!(frame.features.iter().all(|row| row.len() == FEATURE_DIM && row[0] == 1.0));
        assert_eq!(frame.features[1][1], frame.agents[1].position.x);
    }

    #[test]
    fn test_scene_and_frame_filter() {
        let index = index();
        let strategy = SelectionStrategy::with_defaults(v2x_core::SelectionMethod::ClosestK);

        assert_eq!(IndexExport::from_scene(&index, &strategy, 1, None).frames.len(), 3);
        let single = IndexExport::from_scene(&index, &strategy, 0, Some(2));
        assert_eq!(single.frames.len(), 1);
        assert_eq!(single.method, "closest_k");
        assert!(IndexExport::from_scene(&index, &strategy, 0, Some(9)).frames.is_empty());
    }

    #[test]
    fn test_write_to_file() {
        let index = index();
        let export = IndexExport::from_index(&index, &SelectionStrategy::Identity);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["method"], "identity");
        assert_eq!(value["frames"].as_array().unwrap().len(), 6);
        assert_eq!(value["frames"][0]["selected"], serde_json::json!([0, 1]));
    }

    #[test]
    fn test_write_to_missing_dir_fails() {
        let index = index();
        let export = IndexExport::from_index(&index, &SelectionStrategy::Identity);
        let dir = tempfile::tempdir().unwrap();

        let result = export.write_to_file(dir.path().join("missing").join("index.json"));
        assert!(matches!(result, Err(SimError::Io { .. })));
    }
}
