//! Selection method vocabulary.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Selection method identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Keep every agent
    Identity,

    /// Keep the K agents nearest a reference
    ClosestK,

    /// Keep the K agents ranked by motion
    #[serde(rename = "velocity", alias = "velocity_based")]
    VelocityBased,

    /// Rule-based selection
    Heuristic,

    /// Delegate scoring to an injected model
    MlModel,

    /// Keep agents under a per-frame data budget
    #[serde(rename = "bandwidth", alias = "bandwidth_aware")]
    BandwidthAware,
}

impl SelectionMethod {
    /// Returns every method.
    pub fn all() -> Vec<SelectionMethod> {
        vec![
            SelectionMethod::Identity,
            SelectionMethod::ClosestK,
            SelectionMethod::VelocityBased,
            SelectionMethod::Heuristic,
            SelectionMethod::MlModel,
            SelectionMethod::BandwidthAware,
        ]
    }

    /// Returns the method tag.
    pub fn name(&self) -> &'static str {
        match self {
            SelectionMethod::Identity => "identity",
            SelectionMethod::ClosestK => "closest_k",
            SelectionMethod::VelocityBased => "velocity",
            SelectionMethod::Heuristic => "heuristic",
            SelectionMethod::MlModel => "ml_model",
            SelectionMethod::BandwidthAware => "bandwidth",
        }
    }

    /// Returns a description of the method.
    pub fn description(&self) -> &'static str {
        match self {
            SelectionMethod::Identity => "keep all agents",
            SelectionMethod::ClosestK => "pick K nearest agents by distance",
            SelectionMethod::VelocityBased => "pick K agents based on motion",
            SelectionMethod::Heuristic => "rule-based selection",
            SelectionMethod::MlModel => "learned model (MLP / RL policy) scores agents",
            SelectionMethod::BandwidthAware => "account for per-agent data cost",
        }
    }

    /// Returns true for methods that currently keep every agent.
    pub fn is_placeholder(&self) -> bool {
        !matches!(self, SelectionMethod::Identity)
    }
}

impl std::fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for SelectionMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "identity" => Ok(SelectionMethod::Identity),
            "closest_k" | "closestk" => Ok(SelectionMethod::ClosestK),
            "velocity" | "velocity_based" => Ok(SelectionMethod::VelocityBased),
            "heuristic" => Ok(SelectionMethod::Heuristic),
            "ml_model" | "mlmodel" => Ok(SelectionMethod::MlModel),
            "bandwidth" | "bandwidth_aware" => Ok(SelectionMethod::BandwidthAware),
            _ => Err(CoreError::invalid(format!("Unknown selection method: {s}"))),
        }
    }
}
