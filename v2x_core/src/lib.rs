//! V2X Core - per-frame agent state for cooperative perception datasets
//!
//! This library turns a V2X-Sim style dataset into model-ready agent state:
//! 1. **State Index**: (scene, frame) -> observed agents, built by walking
//!    each scene's frame chain and decoding GNSS/IMU payloads
//! 2. **Motion**: finite-difference velocity and wrapped yaw rate per agent
//! 3. **Features**: fixed 16-wide rows per agent slot
//! 4. **Selection**: pluggable policies choosing which agents to keep

pub mod agent_meta;
pub mod config;
pub mod error;
pub mod features;
pub mod motion;
pub mod selection;
pub mod state_index;

// Re-export key types for convenience
pub use agent_meta::{AgentMeta, AgentSlot, LidarConfig};
pub use config::IndexConfig;
pub use error::{CoreError, Result};
pub use features::{build_padded, build_state_features, FeatureMatrix, FEATURE_DIM};
pub use motion::{unwrap_angle, MotionEstimate, MotionEstimator};
pub use selection::{select, select_by_tag, AgentSelector, SelectionMethod, SelectionStrategy};
pub use state_index::StateIndex;
