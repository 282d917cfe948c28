//! Ground truth oracle for synthetic datasets.
//!
//! The Oracle holds the true planar state of every simulated agent,
//! advances it with a constant-turn-rate model, and produces GNSS/IMU
//! payloads with optional Gaussian noise.

use nalgebra::{Rotation2, Vector2, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use v2x_core::unwrap_angle;

use crate::error::{Result, SimError};

/// Gravity reported on the IMU z axis (m/s^2).
pub const GRAVITY: f64 = 9.81;

/// A ground truth agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthAgent {
    pub id: u32,

    /// Position [x, y, z] in meters (global frame)
    pub position: Vector3<f64>,

    /// Planar velocity [vx, vy] in m/s
    pub velocity: Vector2<f64>,

    /// Heading in [-π, π)
    pub yaw: f64,

    /// Heading rate in rad/s
    pub yaw_rate: f64,
}

impl GroundTruthAgent {
    /// Agent moving at `velocity`, heading along it.
    pub fn new(id: u32, position: Vector3<f64>, velocity: Vector2<f64>) -> Self {
        let yaw = if velocity.norm() > 0.0 {
            velocity.y.atan2(velocity.x)
        } else {
            0.0
        };
        Self {
            id,
            position,
            velocity,
            yaw: unwrap_angle(yaw),
            yaw_rate: 0.0,
        }
    }

    /// Sets a constant turn rate; velocity rotates with the heading.
    pub fn with_yaw_rate(mut self, yaw_rate: f64) -> Self {
        self.yaw_rate = yaw_rate;
        self
    }

    /// Overrides the heading without changing velocity.
    pub fn with_yaw(mut self, yaw: f64) -> Self {
        self.yaw = unwrap_angle(yaw);
        self
    }
}

/// One agent's payloads for a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub agent_id: u32,

    /// GNSS payload: x, y, z
    pub position: [f64; 3],

    /// IMU payload: ax, ay, az, gx, gy, gz, compass yaw
    pub inertial: [f64; 7],
}

/// The Oracle - maintains ground truth and generates sensor payloads.
pub struct Oracle {
    rng: ChaCha8Rng,
    agents: BTreeMap<u32, GroundTruthAgent>,
    current_time: f64,
    position_noise: Option<Normal<f64>>,
    yaw_noise: Option<Normal<f64>>,
}

impl Oracle {
    /// Creates a noise-free Oracle with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            agents: BTreeMap::new(),
            current_time: 0.0,
            position_noise: None,
            yaw_noise: None,
        }
    }

    /// Sets the GNSS position noise standard deviation (meters).
    pub fn set_position_noise(&mut self, std_dev: f64) -> Result<()> {
        self.position_noise = noise(std_dev)?;
        Ok(())
    }

    /// Sets the compass yaw noise standard deviation (radians).
    pub fn set_yaw_noise(&mut self, std_dev: f64) -> Result<()> {
        self.yaw_noise = noise(std_dev)?;
        Ok(())
    }

    /// Adds an agent, replacing any agent with the same id.
    pub fn spawn(&mut self, agent: GroundTruthAgent) {
        self.agents.insert(agent.id, agent);
    }

    /// Advances every agent by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.current_time += dt;

        for agent in self.agents.values_mut() {
            agent.position.x += agent.velocity.x * dt;
            agent.position.y += agent.velocity.y * dt;

            let turn = agent.yaw_rate * dt;
            if turn != 0.0 {
                agent.velocity = Rotation2::new(turn) * agent.velocity;
                agent.yaw = unwrap_angle(agent.yaw + turn);
            }
        }
    }

    pub fn time(&self) -> f64 {
        self.current_time
    }

    pub fn agent(&self, id: u32) -> Option<&GroundTruthAgent> {
        self.agents.get(&id)
    }

    /// Returns all agents in id order.
    pub fn agents(&self) -> impl Iterator<Item = &GroundTruthAgent> + '_ {
        self.agents.values()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Draws a uniform sample in [0, 1) from the Oracle's stream.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Generates the payloads of one agent.
    pub fn observe(&mut self, id: u32) -> Option<Observation> {
        let agent = self.agents.get(&id)?.clone();

        let position = [
            agent.position.x + draw(self.position_noise.as_ref(), &mut self.rng),
            agent.position.y + draw(self.position_noise.as_ref(), &mut self.rng),
            agent.position.z + draw(self.position_noise.as_ref(), &mut self.rng),
        ];

        // Centripetal acceleration of a constant-rate turn
        let ax = -agent.yaw_rate * agent.velocity.y;
        let ay = agent.yaw_rate * agent.velocity.x;
        let yaw = unwrap_angle(agent.yaw + draw(self.yaw_noise.as_ref(), &mut self.rng));

        Some(Observation {
            agent_id: id,
            position,
            inertial: [ax, ay, GRAVITY, 0.0, 0.0, agent.yaw_rate, yaw],
        })
    }
}

/// Zero std disables noise (and leaves the random stream untouched).
fn noise(std_dev: f64) -> Result<Option<Normal<f64>>> {
    if !std_dev.is_finite() || std_dev < 0.0 {
        return Err(SimError::InvalidNoise(std_dev));
    }
    if std_dev == 0.0 {
        return Ok(None);
    }
    Normal::new(0.0, std_dev)
        .map(Some)
        .map_err(|_| SimError::InvalidNoise(std_dev))
}

fn draw(noise: Option<&Normal<f64>>, rng: &mut ChaCha8Rng) -> f64 {
    noise.map_or(0.0, |n| n.sample(rng))
}
