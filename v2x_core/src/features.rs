//! Fixed-width state feature matrices.
//!
//! One 16-wide row per agent slot:
//!
//! ```text
//! [present, x, y, z, yaw, vx, vy, speed, yaw_rate, ax, ay, az, gx, gy, gz, timestamp]
//! ```
//!
//! Absent slots are all zeros, including the presence flag. Values are
//! copied verbatim (no scaling or clipping).

use crate::agent_meta::{AgentMeta, AgentSlot};
use crate::state_index::StateIndex;
use nalgebra::DMatrix;

/// Number of scalars per feature row.
pub const FEATURE_DIM: usize = 16;

/// Column positions within a feature row.
pub mod column {
    pub const PRESENT: usize = 0;
    pub const X: usize = 1;
    pub const Y: usize = 2;
    pub const Z: usize = 3;
    pub const YAW: usize = 4;
    pub const VX: usize = 5;
    pub const VY: usize = 6;
    pub const SPEED: usize = 7;
    pub const YAW_RATE: usize = 8;
    pub const AX: usize = 9;
    pub const AY: usize = 10;
    pub const AZ: usize = 11;
    pub const GX: usize = 12;
    pub const GY: usize = 13;
    pub const GZ: usize = 14;
    pub const TIMESTAMP: usize = 15;
}

/// N x 16 matrix, one row per agent slot.
pub type FeatureMatrix = DMatrix<f64>;

/// Feature row of an observed agent.
pub fn feature_row(meta: &AgentMeta) -> [f64; FEATURE_DIM] {
    [
        1.0,
        meta.position.x,
        meta.position.y,
        meta.position.z,
        meta.yaw,
        meta.velocity.x,
        meta.velocity.y,
        meta.speed,
        meta.yaw_rate,
        meta.acceleration.x,
        meta.acceleration.y,
        meta.acceleration.z,
        meta.angular_rate.x,
        meta.angular_rate.y,
        meta.angular_rate.z,
        meta.timestamp,
    ]
}

/// Feature row of a slot; `Absent` is all zeros.
pub fn slot_row(slot: &AgentSlot) -> [f64; FEATURE_DIM] {
    match slot {
        AgentSlot::Present(meta) => feature_row(meta),
        AgentSlot::Absent => [0.0; FEATURE_DIM],
    }
}

/// Builds a feature matrix from slots, preserving order.
pub fn build_from_slots(slots: &[AgentSlot]) -> FeatureMatrix {
    let data: Vec<f64> = slots.iter().flat_map(slot_row).collect();
    DMatrix::from_row_slice(slots.len(), FEATURE_DIM, &data)
}

/// Builds a feature matrix from observed agents, preserving order.
pub fn build_from_metas(metas: &[AgentMeta]) -> FeatureMatrix {
    let data: Vec<f64> = metas.iter().flat_map(feature_row).collect();
    DMatrix::from_row_slice(metas.len(), FEATURE_DIM, &data)
}

/// Feature matrix of the agents stored for `(scene_id, frame_id)`.
///
/// Row count equals `get_agents_meta(scene_id, frame_id).len()`; an
/// unindexed frame gives a 0 x 16 matrix.
pub fn build_state_features(index: &StateIndex, scene_id: usize, frame_id: usize) -> FeatureMatrix {
    build_from_metas(index.get_agents_meta(scene_id, frame_id))
}

/// Feature matrix with one row per agent id in the index's agent range.
pub fn build_padded(index: &StateIndex, scene_id: usize, frame_id: usize) -> FeatureMatrix {
    build_from_slots(&index.agent_slots(scene_id, frame_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_meta::LidarConfig;
    use nalgebra::{Vector2, Vector3};

    fn meta(agent_id: u32, base: f64) -> AgentMeta {
        AgentMeta {
            scene_id: 0,
            frame_id: 4,
            agent_id,
            timestamp: base + 14.0,
            position: Vector3::new(base, base + 1.0, base + 2.0),
            yaw: base + 3.0,
            velocity: Vector2::new(base + 4.0, base + 5.0),
            speed: base + 6.0,
            yaw_rate: base + 7.0,
            acceleration: Vector3::new(base + 8.0, base + 9.0, base + 10.0),
            angular_rate: Vector3::new(base + 11.0, base + 12.0, base + 13.0),
            lidar: LidarConfig::default(),
        }
    }

    #[test]
    fn test_feature_row_order() {
        let row = feature_row(&meta(1, 100.0));

        assert_eq!(row[column::PRESENT], 1.0);
        for (col, expected) in (1..FEATURE_DIM).zip(0..) {
            assert_eq!(row[col], 100.0 + expected as f64, "column {col}");
        }
    }

    #[test]
    fn test_absent_slot_is_zero_row() {
        let slots = vec![
            AgentSlot::Present(meta(0, 10.0)),
            AgentSlot::Absent,
            AgentSlot::Present(meta(2, 30.0)),
        ];
        let features = build_from_slots(&slots);

        assert_eq!(features.nrows(), 3);
        assert_eq!(features.ncols(), FEATURE_DIM);
        assert!(features.row(1).iter().all(|&v| v == 0.0));

        for (row, m) in [(0, meta(0, 10.0)), (2, meta(2, 30.0))] {
            assert_eq!(features[(row, column::PRESENT)], 1.0);
            let expected = feature_row(&m);
            for col in 1..FEATURE_DIM {
                assert_eq!(features[(row, col)], expected[col]);
            }
        }
    }

    #[test]
    fn test_rows_follow_input_order() {
        let features = build_from_metas(&[meta(5, 50.0), meta(1, 10.0)]);

        assert_eq!(features[(0, column::X)], 50.0);
        assert_eq!(features[(1, column::X)], 10.0);
    }

    #[test]
    fn test_empty_input_is_zero_rows() {
        let features = build_from_metas(&[]);
        assert_eq!(features.shape(), (0, FEATURE_DIM));
        assert_eq!(build_from_slots(&[]).shape(), (0, FEATURE_DIM));
    }

    #[test]
    fn test_index_frame_features() {
        use crate::config::IndexConfig;
        use v2x_env::{MemoryProvider, PayloadLayout};

        let layout = PayloadLayout::default();
        let mut provider = MemoryProvider::new();
        let scene = provider.add_scene("scene_0");
        let frame = provider.push_frame(scene);
        let imu = [0.0, 0.0, 9.8, 0.0, 0.0, 0.0, 0.25];
        provider.add_agent_observation(&frame, &layout, 3, 2_000_000, [1.0, 2.0, 3.0], imu);
        provider.add_agent_observation(&frame, &layout, 1, 2_000_000, [4.0, 5.0, 6.0], imu);

        let index = StateIndex::build(&provider, IndexConfig::new(0..1, 0..4)).unwrap();

        let features = build_state_features(&index, 0, 0);
        assert_eq!(features.nrows(), 2);
        assert_eq!(features[(0, column::X)], 1.0);
        assert_eq!(features[(1, column::X)], 4.0);
        assert_eq!(features[(0, column::YAW)], 0.25);
        assert_eq!(features[(0, column::TIMESTAMP)], 2.0);

        // Padded: agents 0..4, present at ids 1 and 3
        let padded = build_padded(&index, 0, 0);
        assert_eq!(padded.nrows(), 4);
        let present: Vec<f64> = padded.column(column::PRESENT).iter().copied().collect();
        assert_eq!(present, vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(padded[(3, column::Z)], 3.0);

        assert_eq!(build_state_features(&index, 0, 5).nrows(), 0);
    }

    #[test]
    fn test_build_is_pure() {
        let slots = vec![AgentSlot::Present(meta(0, 1.0)), AgentSlot::Absent];
        assert_eq!(build_from_slots(&slots), build_from_slots(&slots));
    }
}
