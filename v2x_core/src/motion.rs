//! Finite-difference motion estimation.
//!
//! Velocity and yaw rate are derived from the change between an agent's
//! current observation and the most recent accepted one in the same scene:
//!
//! ```text
//! dt       = t - last.t
//! v        = (p - last.p) / dt
//! yaw_rate = unwrap(yaw - last.yaw) / dt,   unwrap(d) = ((d + π) mod 2π) - π
//! ```
//!
//! The estimator owns the last-observation cache for one index build and
//! must be fed observations in frame order.

use nalgebra::Vector2;
use std::collections::HashMap;
use std::f64::consts::{PI, TAU};
use tracing::debug;

/// Velocity and yaw rate for one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEstimate {
    pub velocity: Vector2<f64>,
    pub yaw_rate: f64,
}

impl MotionEstimate {
    /// No motion: zero velocity and zero yaw rate.
    pub fn zero() -> Self {
        Self {
            velocity: Vector2::zeros(),
            yaw_rate: 0.0,
        }
    }

    /// Planar speed, `hypot(vx, vy)`.
    pub fn speed(&self) -> f64 {
        self.velocity.x.hypot(self.velocity.y)
    }
}

/// Most recent accepted observation of a (scene, agent) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastObservation {
    pub frame_id: usize,
    pub timestamp: f64,
    pub position: Vector2<f64>,
    pub yaw: f64,
    pub velocity: Vector2<f64>,
    pub yaw_rate: f64,
}

/// Normalizes an angular difference to [-π, π).
///
/// Uses a floored modulo so the result takes the short way around the
/// ±π discontinuity regardless of the sign of `delta`.
pub fn unwrap_angle(delta: f64) -> f64 {
    let wrapped = (delta + PI).rem_euclid(TAU) - PI;
    // rem_euclid rounds up to TAU for inputs just below -π
    if wrapped >= PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Last-observation cache plus the finite-difference rule.
#[derive(Debug, Default)]
pub struct MotionEstimator {
    last: HashMap<(usize, u32), LastObservation>,
}

impl MotionEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimates motion for a new observation and advances the cache.
    ///
    /// - First observation of `(scene_id, agent_id)`: cached with zeroed
    ///   rates, returns zero.
    /// - `dt <= 0`: returns zero and leaves the cache as it was.
    /// - Otherwise: finite differences; the cache takes the new observation.
    pub fn estimate(
        &mut self,
        scene_id: usize,
        agent_id: u32,
        frame_id: usize,
        position: Vector2<f64>,
        yaw: f64,
        timestamp: f64,
    ) -> MotionEstimate {
        let key = (scene_id, agent_id);

        let Some(prev) = self.last.get(&key) else {
            self.last.insert(
                key,
                LastObservation {
                    frame_id,
                    timestamp,
                    position,
                    yaw,
                    velocity: Vector2::zeros(),
                    yaw_rate: 0.0,
                },
            );
            return MotionEstimate::zero();
        };

        let dt = timestamp - prev.timestamp;
        if dt <= 0.0 {
            debug!(
                "scene {} agent {} frame {}: non-positive dt {:.6}s, treating as no motion",
                scene_id, agent_id, frame_id, dt
            );
            return MotionEstimate::zero();
        }

        let velocity = (position - prev.position) / dt;
        let yaw_rate = unwrap_angle(yaw - prev.yaw) / dt;

        self.last.insert(
            key,
            LastObservation {
                frame_id,
                timestamp,
                position,
                yaw,
                velocity,
                yaw_rate,
            },
        );

        MotionEstimate { velocity, yaw_rate }
    }

    /// Returns the cached observation for a (scene, agent) pair.
    pub fn last_observation(&self, scene_id: usize, agent_id: u32) -> Option<&LastObservation> {
        self.last.get(&(scene_id, agent_id))
    }

    /// Returns the number of (scene, agent) pairs seen so far.
    pub fn tracked_agents(&self) -> usize {
        self.last.len()
    }
}
