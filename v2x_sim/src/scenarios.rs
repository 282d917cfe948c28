//! Synthetic dataset scenarios.

use crate::error::SimError;
use crate::oracle::{GroundTruthAgent, Oracle};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Straight lines at constant velocity
    Cruise,

    /// Constant-rate turns with headings crossing ±π
    Turning,

    /// Constant velocity with agents missing from random frames
    Dropout,

    /// Every third frame repeats the previous timestamp
    StaleClock,

    /// Four times as many agents as the index range covers
    Swarm,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Cruise,
            ScenarioId::Turning,
            ScenarioId::Dropout,
            ScenarioId::StaleClock,
            ScenarioId::Swarm,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Cruise => "cruise",
            ScenarioId::Turning => "turning",
            ScenarioId::Dropout => "dropout",
            ScenarioId::StaleClock => "stale_clock",
            ScenarioId::Swarm => "swarm",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Cruise => "agents on parallel lanes at constant velocity",
            ScenarioId::Turning => "agents circling at 0.8 rad/s, yaw wraps across ±π",
            ScenarioId::Dropout => "constant velocity, 30% of observations dropped",
            ScenarioId::StaleClock => "constant velocity, duplicate timestamps every 3rd frame",
            ScenarioId::Swarm => "4x agents with random headings, most outside the index range",
        }
    }

    /// Number of agents spawned per scene for an index range of `num_agents`.
    pub fn agents_spawned(&self, num_agents: u32) -> u32 {
        match self {
            ScenarioId::Swarm => num_agents.saturating_mul(4),
            _ => num_agents,
        }
    }

    /// Probability an agent is missing from a frame.
    pub fn dropout_rate(&self) -> f64 {
        match self {
            ScenarioId::Dropout => 0.3,
            _ => 0.0,
        }
    }

    /// True if `frame_id` reuses the previous frame's timestamp.
    pub fn is_stale_frame(&self, frame_id: usize) -> bool {
        matches!(self, ScenarioId::StaleClock) && frame_id > 0 && frame_id % 3 == 2
    }

    /// Spawns this scenario's agents into `oracle`.
    pub fn spawn(&self, oracle: &mut Oracle, num_agents: u32) {
        for id in 0..self.agents_spawned(num_agents) {
            let lane = id as f64;
            let agent = match self {
                ScenarioId::Cruise | ScenarioId::Dropout | ScenarioId::StaleClock => {
                    GroundTruthAgent::new(
                        id,
                        Vector3::new(-50.0 + 3.0 * lane, 4.0 * lane, 0.5),
                        Vector2::new(8.0 + lane, 0.5 * (lane - 2.0)),
                    )
                }
                ScenarioId::Turning => {
                    // Start just below +π so the first turn wraps
                    let yaw = PI - 0.1 - 0.05 * lane;
                    let speed = 6.0 + lane;
                    GroundTruthAgent::new(
                        id,
                        Vector3::new(10.0 * lane, -10.0 * lane, 0.5),
                        Vector2::new(speed * yaw.cos(), speed * yaw.sin()),
                    )
                    .with_yaw(yaw)
                    .with_yaw_rate(0.8)
                }
                ScenarioId::Swarm => {
                    let heading = 2.0 * PI * oracle.uniform() - PI;
                    let speed = 2.0 + 10.0 * oracle.uniform();
                    GroundTruthAgent::new(
                        id,
                        Vector3::new(200.0 * oracle.uniform(), 200.0 * oracle.uniform(), 0.5),
                        Vector2::new(speed * heading.cos(), speed * heading.sin()),
                    )
                }
            };
            oracle.spawn(agent);
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cruise" => Ok(ScenarioId::Cruise),
            "turning" | "turn" => Ok(ScenarioId::Turning),
            "dropout" => Ok(ScenarioId::Dropout),
            "stale_clock" | "staleclock" => Ok(ScenarioId::StaleClock),
            "swarm" => Ok(ScenarioId::Swarm),
            _ => Err(SimError::UnknownScenario(s.to_string())),
        }
    }
}
