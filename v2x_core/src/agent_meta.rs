//! Per-agent, per-frame state records.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// LiDAR configuration carried with every record.
///
/// Constant across V2X-Sim; not used by motion estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LidarConfig {
    pub channels: u32,
    pub max_range_m: f64,
    pub points_per_second: u32,
    pub rotation_hz: f64,
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            channels: 32,
            max_range_m: 70.0,
            points_per_second: 250_000,
            rotation_hz: 20.0,
        }
    }
}

/// One observation of one agent at one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMeta {
    pub scene_id: usize,
    pub frame_id: usize,
    pub agent_id: u32,

    /// Capture time in seconds (GNSS record timestamp)
    pub timestamp: f64,

    /// GNSS position [x, y, z]
    pub position: Vector3<f64>,

    /// Compass yaw in radians, as recorded (not wrapped)
    pub yaw: f64,

    /// Finite-difference planar velocity [vx, vy] in m/s
    pub velocity: Vector2<f64>,

    /// Euclidean norm of `velocity`
    pub speed: f64,

    /// Finite-difference yaw rate in rad/s
    pub yaw_rate: f64,

    /// IMU linear acceleration [ax, ay, az]
    pub acceleration: Vector3<f64>,

    /// IMU angular rate [gx, gy, gz]
    pub angular_rate: Vector3<f64>,

    pub lidar: LidarConfig,
}

/// One agent slot of a frame: observed, or explicitly absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentSlot {
    Present(AgentMeta),
    Absent,
}

impl AgentSlot {
    pub fn is_present(&self) -> bool {
        matches!(self, AgentSlot::Present(_))
    }
}

impl From<AgentMeta> for AgentSlot {
    fn from(meta: AgentMeta) -> Self {
        AgentSlot::Present(meta)
    }
}

impl From<Option<AgentMeta>> for AgentSlot {
    fn from(meta: Option<AgentMeta>) -> Self {
        meta.map_or(AgentSlot::Absent, AgentSlot::Present)
    }
}
