//! V2X-Sim channel naming and payload layout conventions.
//!
//! Every agent publishes one channel per sensor family, named
//! `<FAMILY>_TOP_id_<agent_id>`. Sensor records point into a `sweeps/`
//! tree; the decoded payload for each family lives in a sibling tree
//! (`gnss/`, `imu/`) with the same relative path.

use serde::{Deserialize, Serialize};

/// Prefix of per-agent position (GNSS) channels.
pub const POSITION_CHANNEL_PREFIX: &str = "GNSS_TOP_id_";

/// Prefix of per-agent inertial (IMU) channels.
pub const INERTIAL_CHANNEL_PREFIX: &str = "IMU_TOP_id_";

/// Returns the position channel name for an agent.
pub fn position_channel(agent_id: u32) -> String {
    format!("{POSITION_CHANNEL_PREFIX}{agent_id}")
}

/// Returns the inertial channel name for an agent.
pub fn inertial_channel(agent_id: u32) -> String {
    format!("{INERTIAL_CHANNEL_PREFIX}{agent_id}")
}

/// Parses the agent id out of a position channel name.
///
/// Returns `None` for any other channel, including a position prefix
/// followed by something that is not a decimal integer.
pub fn parse_position_channel(channel: &str) -> Option<u32> {
    let suffix = channel.strip_prefix(POSITION_CHANNEL_PREFIX)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Directory rewrite from sensor-record filenames to payload files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadLayout {
    /// Directory component used by sensor records
    pub sweeps_dir: String,

    /// Replacement for position payloads
    pub position_dir: String,

    /// Replacement for inertial payloads
    pub inertial_dir: String,
}

impl Default for PayloadLayout {
    fn default() -> Self {
        Self {
            sweeps_dir: "sweeps".to_string(),
            position_dir: "gnss".to_string(),
            inertial_dir: "imu".to_string(),
        }
    }
}

impl PayloadLayout {
    /// Maps a position sensor record filename to its payload path.
    pub fn position_path(&self, filename: &str) -> String {
        filename.replace(&self.sweeps_dir, &self.position_dir)
    }

    /// Maps an inertial sensor record filename to its payload path.
    pub fn inertial_path(&self, filename: &str) -> String {
        filename.replace(&self.sweeps_dir, &self.inertial_dir)
    }
}
