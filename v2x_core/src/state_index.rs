//! The State Index - per-frame agent metadata for a range of scenes.
//!
//! Built eagerly by walking every frame of every scene in range, strictly
//! in order:
//!
//! ```text
//! for scene in [scene_start, scene_end):
//!   for (frame_id, frame) in frame chain:          # frame_id = 0, 1, 2, ...
//!     for channel in frame.channels:               # discovery order
//!       GNSS_TOP_id_<a>, a in [agent_start, agent_end)
//!         ├─ GNSS payload  -> x, y, z, timestamp
//!         ├─ IMU_TOP_id_<a> payload -> accel, gyro, compass yaw
//!         └─ MotionEstimator -> vx, vy, yaw_rate
//!     index[(scene, frame)] = [AgentMeta, ...]     # empty frames kept
//! ```
//!
//! Any read failure aborts the build. After construction the index is
//! immutable.

use crate::agent_meta::{AgentMeta, AgentSlot, LidarConfig};
use crate::config::IndexConfig;
use crate::error::{CoreError, Result};
use crate::motion::MotionEstimator;

use nalgebra::{Vector2, Vector3};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use v2x_env::convention::{inertial_channel, parse_position_channel};
use v2x_env::{DatasetProvider, FrameChain, FrameRecord, NuScenesProvider};

/// Minimum GNSS payload length: x, y, z.
pub const POSITION_PAYLOAD_LEN: usize = 3;

/// Minimum IMU payload length: ax, ay, az, gx, gy, gz, compass yaw.
pub const INERTIAL_PAYLOAD_LEN: usize = 7;

/// Index of (scene, frame) to the agents observed in that frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StateIndex {
    config: IndexConfig,
    frames: BTreeMap<(usize, usize), Vec<AgentMeta>>,
    frame_counts: BTreeMap<usize, usize>,
}

impl StateIndex {
    /// Builds the index from a dataset provider.
    ///
    /// # Errors
    /// * `CoreError::Configuration` - empty ranges, or scenes past the catalog end
    /// * `CoreError::ProviderRead` - a catalog lookup or payload read failed
    /// * `CoreError::MissingChannel` - a GNSS channel has no IMU companion
    /// * `CoreError::MalformedPayload` - a payload is too short
    pub fn build<P: DatasetProvider + ?Sized>(provider: &P, config: IndexConfig) -> Result<Self> {
        config.validate_against(provider.scene_count())?;

        let mut estimator = MotionEstimator::new();
        let mut frames = BTreeMap::new();
        let mut frame_counts = BTreeMap::new();
        let mut total_agents = 0usize;

        for scene_id in config.scene_range() {
            let chain = FrameChain::for_scene(provider, scene_id)?;
            let mut scene_frames = 0usize;

            for frame in chain.frames() {
                let (frame_id, record) = frame?;
                let metas = index_frame(provider, &config, &mut estimator, scene_id, frame_id, &record)?;

                debug!(
                    "scene {} frame {}: {} agents ({} channels)",
                    scene_id,
                    frame_id,
                    metas.len(),
                    record.channel_count()
                );

                total_agents += metas.len();
                frames.insert((scene_id, frame_id), metas);
                scene_frames += 1;
            }

            info!("Indexed scene {}: {} frames", scene_id, scene_frames);
            frame_counts.insert(scene_id, scene_frames);
        }

        info!(
            "State index built: {} scenes, {} frames, {} agent observations, {} distinct agents",
            frame_counts.len(),
            frames.len(),
            total_agents,
            estimator.tracked_agents()
        );

        Ok(Self {
            config,
            frames,
            frame_counts,
        })
    }

    /// Opens a nuScenes-format dataset at `dataroot` (using the configured
    /// version tag) and builds the index from it.
    pub fn from_dataroot(dataroot: impl AsRef<Path>, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let provider = NuScenesProvider::open(dataroot, &config.version)?;
        Self::build(&provider, config)
    }

    /// Returns the agents observed in a frame, in channel-discovery order.
    ///
    /// Unindexed keys yield an empty slice.
    pub fn get_agents_meta(&self, scene_id: usize, frame_id: usize) -> &[AgentMeta] {
        self.frames
            .get(&(scene_id, frame_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns one slot per agent id in the configured agent range,
    /// `Absent` for agents not observed in the frame.
    pub fn agent_slots(&self, scene_id: usize, frame_id: usize) -> Vec<AgentSlot> {
        let metas = self.get_agents_meta(scene_id, frame_id);
        self.config
            .agent_range()
            .map(|agent_id| {
                AgentSlot::from(metas.iter().find(|meta| meta.agent_id == agent_id).cloned())
            })
            .collect()
    }

    /// Returns the number of frames indexed for a scene (0 if not indexed).
    pub fn frame_count(&self, scene_id: usize) -> usize {
        self.frame_counts.get(&scene_id).copied().unwrap_or(0)
    }

    /// Returns the indexed scene ids in ascending order.
    pub fn scene_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.frame_counts.keys().copied()
    }

    /// Iterates over all frames in (scene, frame) order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &[AgentMeta])> + '_ {
        self.frames.iter().map(|(key, metas)| (*key, metas.as_slice()))
    }

    /// Returns the number of indexed frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}

/// Extracts the in-range agents of one frame.
fn index_frame<P: DatasetProvider + ?Sized>(
    provider: &P,
    config: &IndexConfig,
    estimator: &mut MotionEstimator,
    scene_id: usize,
    frame_id: usize,
    record: &FrameRecord,
) -> Result<Vec<AgentMeta>> {
    let agents = config.agent_range();
    let mut metas = Vec::new();

    for (channel, token) in &record.channels {
        let Some(agent_id) = parse_position_channel(channel) else {
            continue;
        };
        if !agents.contains(&agent_id) {
            continue;
        }

        // GNSS
        let gnss_record = provider.sensor_record(token)?;
        let gnss_path = config.layout.position_path(&gnss_record.filename);
        let gnss = load_payload(provider, &gnss_path, POSITION_PAYLOAD_LEN)?;
        let position = Vector3::new(gnss[0], gnss[1], gnss[2]);

        // IMU
        let imu_channel = inertial_channel(agent_id);
        let imu_token = record
            .channel(&imu_channel)
            .ok_or_else(|| CoreError::MissingChannel {
                scene_id,
                frame_id,
                channel: imu_channel.clone(),
            })?;
        let imu_record = provider.sensor_record(imu_token)?;
        let imu_path = config.layout.inertial_path(&imu_record.filename);
        let imu = load_payload(provider, &imu_path, INERTIAL_PAYLOAD_LEN)?;

        let acceleration = Vector3::new(imu[0], imu[1], imu[2]);
        let angular_rate = Vector3::new(imu[3], imu[4], imu[5]);
        let yaw = imu[6];

        let timestamp = gnss_record.timestamp_secs();

        let motion = estimator.estimate(
            scene_id,
            agent_id,
            frame_id,
            Vector2::new(position.x, position.y),
            yaw,
            timestamp,
        );

        metas.push(AgentMeta {
            scene_id,
            frame_id,
            agent_id,
            timestamp,
            position,
            yaw,
            velocity: motion.velocity,
            speed: motion.speed(),
            yaw_rate: motion.yaw_rate,
            acceleration,
            angular_rate,
            lidar: LidarConfig::default(),
        });
    }

    Ok(metas)
}

fn load_payload<P: DatasetProvider + ?Sized>(
    provider: &P,
    filename: &str,
    expected: usize,
) -> Result<Vec<f64>> {
    let payload = provider.load_payload(filename)?;
    if payload.len() < expected {
        return Err(CoreError::MalformedPayload {
            filename: filename.to_string(),
            expected,
            found: payload.len(),
        });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;
    use v2x_env::{MemoryProvider, PayloadLayout, ProviderError};

    fn imu(yaw: f64) -> [f64; 7] {
        [0.1, 0.2, 9.8, 0.01, 0.02, 0.03, yaw]
    }

    /// Scene 0: three frames at 0.2s spacing.
    /// - agents 0 and 1 in frames 0 and 1, agent 1 also in frame 2
    /// - agent 9 (out of range) and a LiDAR channel in frame 0
    /// Scene 1: one frame, agent 1 only, and an empty frame.
    fn dataset() -> MemoryProvider {
        let layout = PayloadLayout::default();
        let mut p = MemoryProvider::new();

        let s0 = p.add_scene("scene_0");
        let f0 = p.push_frame(s0);
        p.add_channel(&f0, "LIDAR_TOP_id_0", "sweeps/LIDAR_TOP_id_0/f0.npy", 0);
        p.add_agent_observation(&f0, &layout, 0, 1_000_000, [0.0, 0.0, 0.5], imu(0.0));
        p.add_agent_observation(&f0, &layout, 9, 1_000_000, [50.0, 50.0, 0.5], imu(0.0));
        p.add_agent_observation(&f0, &layout, 1, 1_000_000, [10.0, 0.0, 0.5], imu(3.0));

        let f1 = p.push_frame(s0);
        p.add_agent_observation(&f1, &layout, 1, 1_200_000, [10.0, 1.0, 0.5], imu(-3.0));
        p.add_agent_observation(&f1, &layout, 0, 1_200_000, [2.0, 0.0, 0.5], imu(0.1));

        let f2 = p.push_frame(s0);
        p.add_agent_observation(&f2, &layout, 1, 1_400_000, [10.0, 2.0, 0.5], imu(-3.0));

        let s1 = p.add_scene("scene_1");
        let g0 = p.push_frame(s1);
        p.add_agent_observation(&g0, &layout, 1, 5_000_000, [-4.0, 0.0, 0.0], imu(1.0));
        p.push_frame(s1);

        p
    }

    fn build(provider: &MemoryProvider, scenes: std::ops::Range<usize>) -> StateIndex {
        StateIndex::build(provider, IndexConfig::new(scenes, 0..6)).unwrap()
    }

    #[test]
    fn test_frames_are_indexed_sequentially() {
        let index = build(&dataset(), 0..2);

        assert_eq!(index.frame_count(0), 3);
        assert_eq!(index.frame_count(1), 2);
        assert_eq!(index.len(), 5);
        assert_eq!(index.scene_ids().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_only_in_range_gnss_channels_are_kept_in_discovery_order() {
        let index = build(&dataset(), 0..1);

        let frame0: Vec<u32> = index.get_agents_meta(0, 0).iter().map(|m| m.agent_id).collect();
        assert_eq!(frame0, vec![0, 1]);

        let frame1: Vec<u32> = index.get_agents_meta(0, 1).iter().map(|m| m.agent_id).collect();
        assert_eq!(frame1, vec![1, 0]);
    }

    #[test]
    fn test_empty_frame_is_stored() {
        let index = build(&dataset(), 0..2);

        assert!(index.iter().any(|(key, metas)| key == (1, 1) && metas.is_empty()));
        assert!(index.get_agents_meta(1, 1).is_empty());
    }

    #[test]
    fn test_unindexed_key_is_empty() {
        let index = build(&dataset(), 0..1);

        assert!(index.get_agents_meta(0, 99).is_empty());
        assert!(index.get_agents_meta(7, 0).is_empty());
        assert_eq!(index.frame_count(7), 0);
    }

    #[test]
    fn test_first_observation_has_zero_motion() {
        let index = build(&dataset(), 0..2);

        for meta in index.get_agents_meta(0, 0) {
            assert_eq!(meta.velocity.x, 0.0);
            assert_eq!(meta.velocity.y, 0.0);
            assert_eq!(meta.yaw_rate, 0.0);
            assert_eq!(meta.speed, 0.0);
        }
        // First observation of agent 1 in scene 1 ignores scene 0 history
        let scene1 = &index.get_agents_meta(1, 0)[0];
        assert_eq!(scene1.velocity.x, 0.0);
        assert_eq!(scene1.yaw_rate, 0.0);
    }

    #[test]
    fn test_motion_is_finite_differenced() {
        let index = build(&dataset(), 0..1);

        let agent0 = &index.get_agents_meta(0, 1)[1];
        assert_eq!(agent0.agent_id, 0);
        assert_relative_eq!(agent0.velocity.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(agent0.velocity.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(agent0.speed, 10.0, epsilon = 1e-9);
        assert_relative_eq!(agent0.yaw_rate, 0.5, epsilon = 1e-9);

        // 3.0 -> -3.0 across ±π in 0.2s
        let agent1 = &index.get_agents_meta(0, 1)[0];
        assert_relative_eq!(agent1.velocity.y, 5.0, epsilon = 1e-9);
        assert_relative_eq!(agent1.yaw_rate, (2.0 * PI - 6.0) / 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_record_fields_come_from_payloads() {
        let index = build(&dataset(), 0..1);
        let meta = &index.get_agents_meta(0, 0)[1];

        assert_eq!(meta.scene_id, 0);
        assert_eq!(meta.frame_id, 0);
        assert_eq!(meta.agent_id, 1);
        assert_relative_eq!(meta.timestamp, 1.0, epsilon = 1e-12);
        assert_eq!(meta.position, Vector3::new(10.0, 0.0, 0.5));
        assert_eq!(meta.yaw, 3.0);
        assert_eq!(meta.acceleration, Vector3::new(0.1, 0.2, 9.8));
        assert_eq!(meta.angular_rate, Vector3::new(0.01, 0.02, 0.03));
        assert_eq!(meta.lidar, LidarConfig::default());
    }

    #[test]
    fn test_agent_slots_cover_agent_range() {
        let index = build(&dataset(), 0..1);
        let slots = index.agent_slots(0, 2);

        assert_eq!(slots.len(), 6);
        assert!(slots[1].is_present());
        assert_eq!(slots.iter().filter(|s| s.is_present()).count(), 1);
        assert_eq!(index.agent_slots(0, 99), vec![AgentSlot::Absent; 6]);
    }

    #[test]
    fn test_rebuild_is_identical() {
        let provider = dataset();
        let a = build(&provider, 0..2);
        let b = build(&provider, 0..2);

        assert_eq!(a, b);
        assert!(a.iter().eq(b.iter()));
    }

    #[test]
    fn test_invalid_ranges() {
        let provider = dataset();

        assert!(matches!(
            StateIndex::build(&provider, IndexConfig::new(1..1, 0..6)),
            Err(CoreError::Configuration(_))
        ));
        assert!(matches!(
            StateIndex::build(&provider, IndexConfig::new(0..1, 3..2)),
            Err(CoreError::Configuration(_))
        ));
        assert!(matches!(
            StateIndex::build(&provider, IndexConfig::new(0..3, 0..6)),
            Err(CoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_imu_channel_aborts() {
        let mut provider = MemoryProvider::new();
        let scene = provider.add_scene("scene_0");
        let frame = provider.push_frame(scene);
        provider.add_channel(&frame, "GNSS_TOP_id_1", "sweeps/GNSS_TOP_id_1/f.npy", 0);
        provider.insert_payload("gnss/GNSS_TOP_id_1/f.npy", vec![0.0, 0.0, 0.0]);

        let result = StateIndex::build(&provider, IndexConfig::new(0..1, 0..6));
        assert!(matches!(
            result,
            Err(CoreError::MissingChannel { ref channel, .. }) if channel == "IMU_TOP_id_1"
        ));
    }

    #[test]
    fn test_missing_payload_aborts() {
        let mut provider = MemoryProvider::new();
        let scene = provider.add_scene("scene_0");
        let frame = provider.push_frame(scene);
        provider.add_channel(&frame, "GNSS_TOP_id_1", "sweeps/GNSS_TOP_id_1/f.npy", 0);

        let result = StateIndex::build(&provider, IndexConfig::new(0..1, 0..6));
        assert!(matches!(
            result,
            Err(CoreError::ProviderRead(ProviderError::MissingPayload(_)))
        ));
    }

    #[test]
    fn test_short_payload_aborts() {
        let layout = PayloadLayout::default();
        let mut provider = MemoryProvider::new();
        let scene = provider.add_scene("scene_0");
        let frame = provider.push_frame(scene);
        provider.add_agent_observation(&frame, &layout, 1, 0, [0.0, 0.0, 0.0], imu(0.0));
        provider.insert_payload(&format!("imu/IMU_TOP_id_1/{frame}.npy"), vec![0.0; 6]);

        let result = StateIndex::build(&provider, IndexConfig::new(0..1, 0..6));
        assert!(matches!(
            result,
            Err(CoreError::MalformedPayload { expected: 7, found: 6, .. })
        ));
    }

    #[test]
    fn test_out_of_range_agent_payloads_are_never_read() {
        let mut provider = MemoryProvider::new();
        let scene = provider.add_scene("scene_0");
        let frame = provider.push_frame(scene);
        // No payload and no IMU channel: would fail if it were indexed
        provider.add_channel(&frame, "GNSS_TOP_id_42", "sweeps/GNSS_TOP_id_42/f.npy", 0);
        provider.add_channel(&frame, "GNSS_TOP_id_abc", "sweeps/GNSS_TOP_id_abc/f.npy", 0);

        let index = StateIndex::build(&provider, IndexConfig::new(0..1, 0..6)).unwrap();
        assert!(index.get_agents_meta(0, 0).is_empty());
        assert_eq!(index.len(), 1);
    }
}
