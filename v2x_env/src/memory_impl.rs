//! In-memory implementation of DatasetProvider.

use crate::convention::{inertial_channel, position_channel, PayloadLayout};
use crate::error::ProviderError;
use crate::provider::DatasetProvider;
use crate::types::{FrameRecord, SampleDataToken, SampleToken, SceneRecord, SensorRecord};
use std::collections::HashMap;

/// Dataset held entirely in memory.
///
/// Scenes, frames and channels are appended through the builder methods;
/// tokens are assigned sequentially so two providers built by the same
/// sequence of calls are identical.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    scenes: Vec<MemoryScene>,
    frames: HashMap<SampleToken, FrameRecord>,
    records: HashMap<SampleDataToken, SensorRecord>,
    payloads: HashMap<String, Vec<f64>>,
    next_sample: u64,
    next_record: u64,
}

#[derive(Debug, Clone)]
struct MemoryScene {
    name: String,
    first: Option<SampleToken>,
    last: Option<SampleToken>,
}

impl MemoryProvider {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scene and returns its catalog index.
    pub fn add_scene(&mut self, name: &str) -> usize {
        self.scenes.push(MemoryScene {
            name: name.to_string(),
            first: None,
            last: None,
        });
        self.scenes.len() - 1
    }

    /// Appends an empty frame to the end of a scene's chain.
    ///
    /// # Panics
    /// If `scene_id` was not returned by [`add_scene`](Self::add_scene).
    pub fn push_frame(&mut self, scene_id: usize) -> SampleToken {
        let token = SampleToken(format!("sample-{:06}", self.next_sample));
        self.next_sample += 1;

        self.frames.insert(
            token.clone(),
            FrameRecord {
                channels: Vec::new(),
                next: None,
            },
        );

        let scene = &mut self.scenes[scene_id];
        if let Some(prev) = scene.last.replace(token.clone()) {
            if let Some(frame) = self.frames.get_mut(&prev) {
                frame.next = Some(token.clone());
            }
        }
        if scene.first.is_none() {
            scene.first = Some(token.clone());
        }

        token
    }

    /// Adds a channel to a frame, pointing at a sensor record.
    ///
    /// # Panics
    /// If `sample` was not returned by [`push_frame`](Self::push_frame).
    pub fn add_channel(
        &mut self,
        sample: &SampleToken,
        channel: &str,
        filename: &str,
        timestamp_us: i64,
    ) -> SampleDataToken {
        let token = SampleDataToken(format!("sd-{:08}", self.next_record));
        self.next_record += 1;

        self.records
            .insert(token.clone(), SensorRecord::new(filename, timestamp_us));

        let frame = self
            .frames
            .get_mut(sample)
            .expect("add_channel on a sample that was never pushed");
        frame.channels.push((channel.to_string(), token.clone()));

        token
    }

    /// Stores a decoded payload under a filename.
    pub fn insert_payload(&mut self, filename: &str, payload: Vec<f64>) {
        self.payloads.insert(filename.to_string(), payload);
    }

    /// Adds a GNSS + IMU channel pair for one agent using the V2X-Sim
    /// naming convention, storing payloads where `layout` expects them.
    ///
    /// `inertial` is `[ax, ay, az, gx, gy, gz, compass_yaw]`.
    pub fn add_agent_observation(
        &mut self,
        sample: &SampleToken,
        layout: &PayloadLayout,
        agent_id: u32,
        timestamp_us: i64,
        position: [f64; 3],
        inertial: [f64; 7],
    ) {
        let gnss = position_channel(agent_id);
        let imu = inertial_channel(agent_id);
        let gnss_file = format!("{}/{}/{}.npy", layout.sweeps_dir, gnss, sample);
        let imu_file = format!("{}/{}/{}.npy", layout.sweeps_dir, imu, sample);

        self.add_channel(sample, &gnss, &gnss_file, timestamp_us);
        self.add_channel(sample, &imu, &imu_file, timestamp_us);
        self.insert_payload(&layout.position_path(&gnss_file), position.to_vec());
        self.insert_payload(&layout.inertial_path(&imu_file), inertial.to_vec());
    }

    /// Returns the number of frames across all scenes.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl DatasetProvider for MemoryProvider {
    fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    fn scene(&self, scene_id: usize) -> Result<SceneRecord, ProviderError> {
        let scene = self
            .scenes
            .get(scene_id)
            .ok_or(ProviderError::SceneOutOfRange {
                scene_id,
                scene_count: self.scenes.len(),
            })?;

        Ok(SceneRecord {
            name: scene.name.clone(),
            first_sample: scene.first.clone(),
        })
    }

    fn frame(&self, token: &SampleToken) -> Result<FrameRecord, ProviderError> {
        self.frames
            .get(token)
            .cloned()
            .ok_or_else(|| ProviderError::unknown("sample", token))
    }

    fn sensor_record(&self, token: &SampleDataToken) -> Result<SensorRecord, ProviderError> {
        self.records
            .get(token)
            .cloned()
            .ok_or_else(|| ProviderError::unknown("sample_data", token))
    }

    fn load_payload(&self, filename: &str) -> Result<Vec<f64>, ProviderError> {
        self.payloads
            .get(filename)
            .cloned()
            .ok_or_else(|| ProviderError::MissingPayload(filename.to_string()))
    }
}
