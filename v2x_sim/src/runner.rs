//! Scenario runner - checks the state index against ground truth.
//!
//! For every indexed observation the runner expects:
//! - zero motion on an agent's first observation in a scene, and when the
//!   timestamp did not advance since its last accepted observation
//! - otherwise the ground-truth velocity (speed for turning agents, whose
//!   finite difference lags the heading by one frame) and yaw rate, within
//!   a tolerance derived from the configured sensor noise

use crate::error::Result;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimDataset, SimWorld};

use serde::Serialize;
use std::collections::HashMap;
use std::f64::consts::SQRT_2;
use tracing::{info, warn};
use v2x_core::{AgentMeta, StateIndex};

/// Tolerance floor for noise-free comparisons.
const EXACT_TOLERANCE: f64 = 1e-6;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub scenario: ScenarioId,
    pub seed: u64,
    pub passed: bool,
    pub frames: usize,

    /// Observations in the index (in-range agents only)
    pub indexed_observations: usize,

    /// Observations generated for agents outside the index range
    pub out_of_range_observations: usize,

    pub max_velocity_error: f64,
    pub max_yaw_rate_error: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Runs synthetic scenarios.
pub struct ScenarioRunner {
    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a runner with default dataset settings.
    pub fn new(seed: u64) -> Self {
        Self {
            config: SimConfig {
                seed,
                ..Default::default()
            },
        }
    }

    /// Replaces the dataset settings.
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Generates the scenario, builds its index, and checks it.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);

        let dataset = SimWorld::new(self.config.clone()).generate(scenario)?;
        let index = StateIndex::build(&dataset.provider, self.config.index_config())?;
        let result = check(&dataset, &index);

        if result.passed {
            info!(
                "{} passed: {} observations, max velocity error {:.2e}",
                scenario, result.indexed_observations, result.max_velocity_error
            );
        } else {
            warn!(
                "{} failed: {}",
                scenario,
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
        Ok(result)
    }

    /// Runs every scenario.
    pub fn run_all(&self) -> Result<Vec<ScenarioResult>> {
        ScenarioId::all().into_iter().map(|s| self.run(s)).collect()
    }
}

/// Compares an index built from `dataset` with its ground truth.
pub fn check(dataset: &SimDataset, index: &StateIndex) -> ScenarioResult {
    let config = &dataset.config;
    let dt = config.frame_interval_secs();
    let velocity_tolerance = EXACT_TOLERANCE + 8.0 * SQRT_2 * config.sensor_noise_std / dt;
    let yaw_rate_tolerance = EXACT_TOLERANCE + 8.0 * SQRT_2 * config.yaw_noise_std / dt;

    let mut failures: Vec<String> = Vec::new();
    let mut max_velocity_error = 0.0f64;
    let mut max_yaw_rate_error = 0.0f64;
    let mut indexed = 0usize;

    for scene_id in 0..config.num_scenes {
        if index.frame_count(scene_id) != config.frames_per_scene {
            failures.push(format!(
                "scene {scene_id}: {} frames indexed, expected {}",
                index.frame_count(scene_id),
                config.frames_per_scene
            ));
        }

        let mut last_accepted: HashMap<u32, i64> = HashMap::new();

        for frame_id in 0..config.frames_per_scene {
            let metas = index.get_agents_meta(scene_id, frame_id);
            indexed += metas.len();

            let expected: Vec<u32> = dataset
                .truth
                .range((scene_id, frame_id, 0)..(scene_id, frame_id, config.num_agents))
                .map(|(&(_, _, id), _)| id)
                .collect();
            let found: Vec<u32> = metas.iter().map(|m| m.agent_id).collect();
            if found != expected {
                failures.push(format!(
                    "scene {scene_id} frame {frame_id}: agents {found:?}, expected {expected:?}"
                ));
                continue;
            }

            if index.agent_slots(scene_id, frame_id).len() != config.num_agents as usize {
                failures.push(format!("scene {scene_id} frame {frame_id}: wrong slot count"));
            }

            for meta in metas {
                let Some(truth) = dataset.truth(scene_id, frame_id, meta.agent_id) else {
                    continue;
                };
                let ts = truth.timestamp_us;

                let advanced = match last_accepted.get(&meta.agent_id) {
                    None => {
                        last_accepted.insert(meta.agent_id, ts);
                        false
                    }
                    Some(&prev) if prev >= ts => false,
                    Some(_) => {
                        last_accepted.insert(meta.agent_id, ts);
                        true
                    }
                };

                if !advanced {
                    if !is_motionless(meta) {
                        failures.push(format!(
                            "scene {scene_id} frame {frame_id} agent {}: expected zero motion",
                            meta.agent_id
                        ));
                    }
                    continue;
                }

                let velocity_error = match dataset.scenario {
                    ScenarioId::Turning => (meta.speed - truth.agent.velocity.norm()).abs(),
                    _ => (meta.velocity - truth.agent.velocity).norm(),
                };
                let yaw_rate_error = (meta.yaw_rate - truth.agent.yaw_rate).abs();
                max_velocity_error = max_velocity_error.max(velocity_error);
                max_yaw_rate_error = max_yaw_rate_error.max(yaw_rate_error);

                if velocity_error > velocity_tolerance || yaw_rate_error > yaw_rate_tolerance {
                    failures.push(format!(
                        "scene {scene_id} frame {frame_id} agent {}: velocity error {velocity_error:.3e}, yaw rate error {yaw_rate_error:.3e}",
                        meta.agent_id
                    ));
                }
            }
        }
    }

    let out_of_range = dataset
        .truth
        .keys()
        .filter(|(_, _, id)| *id >= config.num_agents)
        .count();

    let failure_reason = match failures.len() {
        0 => None,
        1 => Some(failures.remove(0)),
        n => Some(format!("{} (+{} more)", failures.remove(0), n - 1)),
    };

    ScenarioResult {
        scenario: dataset.scenario,
        seed: config.seed,
        passed: failure_reason.is_none(),
        frames: index.len(),
        indexed_observations: indexed,
        out_of_range_observations: out_of_range,
        max_velocity_error,
        max_yaw_rate_error,
        failure_reason,
    }
}

fn is_motionless(meta: &AgentMeta) -> bool {
    meta.velocity.x == 0.0 && meta.velocity.y == 0.0 && meta.speed == 0.0 && meta.yaw_rate == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn small(seed: u64) -> SimConfig {
        SimConfig {
            seed,
            num_scenes: 2,
            frames_per_scene: 8,
            num_agents: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_all_scenarios_pass() {
        let results = ScenarioRunner::new(42).with_config(small(42)).run_all().unwrap();

        assert_eq!(results.len(), ScenarioId::all().len());
        for result in &results {
            assert!(result.passed, "{}: {:?}", result.scenario, result.failure_reason);
            assert_eq!(result.frames, 16);
        }
    }

    #[test]
    fn test_swarm_agents_outside_range_are_dropped() {
        let result = ScenarioRunner::new(5)
            .with_config(small(5))
            .run(ScenarioId::Swarm)
            .unwrap();

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.indexed_observations, 2 * 8 * 4);
        assert_eq!(result.out_of_range_observations, 2 * 8 * 12);
    }

    #[test]
    fn test_noisy_positions_within_tolerance() {
        let config = SimConfig {
            sensor_noise_std: 0.05,
            yaw_noise_std: 0.01,
            ..small(11)
        };
        let result = ScenarioRunner::new(11).with_config(config).run(ScenarioId::Cruise).unwrap();

        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.max_velocity_error > 0.0);
    }

    #[test]
    fn test_check_detects_wrong_range() {
        let config = small(3);
        let dataset = SimWorld::new(config.clone()).generate(ScenarioId::Cruise).unwrap();
        // Index only half the agents the truth expects
        let index = StateIndex::build(
            &dataset.provider,
            v2x_core::IndexConfig::new(0..config.num_scenes, 0..2),
        )
        .unwrap();

        let result = check(&dataset, &index);
        assert!(!result.passed);
        assert!(result.failure_reason.is_some());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_constant_velocity_recovered(seed in any::<u64>(), agents in 1u32..8) {
            let config = SimConfig { num_agents: agents, ..small(seed) };
            for scenario in [ScenarioId::Cruise, ScenarioId::Dropout, ScenarioId::StaleClock] {
                let result = ScenarioRunner::new(seed).with_config(config.clone()).run(scenario).unwrap();
                prop_assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
            }
        }

        #[test]
        fn prop_yaw_rate_recovered_across_wrap(seed in any::<u64>()) {
            let result = ScenarioRunner::new(seed)
                .with_config(small(seed))
                .run(ScenarioId::Turning)
                .unwrap();
            prop_assert!(result.passed, "{:?}", result.failure_reason);
            prop_assert!(result.max_yaw_rate_error < 1e-6);
        }

        #[test]
        fn prop_index_build_is_idempotent(seed in any::<u64>()) {
            let config = SimConfig { sensor_noise_std: 0.2, ..small(seed) };
            let dataset = SimWorld::new(config.clone()).generate(ScenarioId::Swarm).unwrap();
            let a = StateIndex::build(&dataset.provider, config.index_config()).unwrap();
            let b = StateIndex::build(&dataset.provider, config.index_config()).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
