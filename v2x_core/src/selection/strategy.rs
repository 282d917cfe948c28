//! Selection strategies and their typed options.

use super::method::SelectionMethod;
use crate::error::{CoreError, Result};
use crate::features::FeatureMatrix;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// A rule that picks rows of a feature matrix.
///
/// Implementations return indices into `features`, each in `[0, N)`.
pub trait AgentSelector {
    fn select(&self, features: &FeatureMatrix) -> Vec<usize>;
}

/// Injected per-agent scoring model for [`MlModelOptions`].
pub trait AgentScorer: Send + Sync {
    /// Returns one score per feature row.
    fn score(&self, features: &FeatureMatrix) -> Vec<f64>;
}

fn all_rows(features: &FeatureMatrix) -> Vec<usize> {
    (0..features.nrows()).collect()
}

/// Options for `closest_k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosestKOptions {
    /// Number of agents to keep (default: 3)
    pub k: usize,
}

impl Default for ClosestKOptions {
    fn default() -> Self {
        Self { k: 3 }
    }
}

impl AgentSelector for ClosestKOptions {
    fn select(&self, features: &FeatureMatrix) -> Vec<usize> {
        // TODO: rank by distance to the ego agent once an ego reference column exists
        debug!("closest_k (k={}) keeps all {} agents", self.k, features.nrows());
        all_rows(features)
    }
}

/// Options for `velocity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityOptions {
    /// Number of agents to keep (default: 3)
    pub k: usize,
}

impl Default for VelocityOptions {
    fn default() -> Self {
        Self { k: 3 }
    }
}

impl AgentSelector for VelocityOptions {
    fn select(&self, features: &FeatureMatrix) -> Vec<usize> {
        debug!("velocity (k={}) keeps all {} agents", self.k, features.nrows());
        all_rows(features)
    }
}

/// Options for `heuristic`: every key of the option bag is a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeuristicOptions {
    #[serde(flatten)]
    pub rules: Map<String, Value>,
}

impl AgentSelector for HeuristicOptions {
    fn select(&self, features: &FeatureMatrix) -> Vec<usize> {
        debug!(
            "heuristic ({} rules) keeps all {} agents",
            self.rules.len(),
            features.nrows()
        );
        all_rows(features)
    }
}

/// Options for `ml_model`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlModelOptions {
    /// Score above which an agent is kept (default: 0.5)
    pub threshold: f64,

    /// Scoring model; cannot come from an option bag
    #[serde(skip)]
    pub model: Option<Arc<dyn AgentScorer>>,
}

impl Default for MlModelOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            model: None,
        }
    }
}

impl MlModelOptions {
    /// Attaches a scoring model.
    pub fn with_model(mut self, model: Arc<dyn AgentScorer>) -> Self {
        self.model = Some(model);
        self
    }
}

impl std::fmt::Debug for MlModelOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlModelOptions")
            .field("threshold", &self.threshold)
            .field("model", &self.model.as_ref().map(|_| "<dyn AgentScorer>"))
            .finish()
    }
}

impl AgentSelector for MlModelOptions {
    fn select(&self, features: &FeatureMatrix) -> Vec<usize> {
        debug!(
            "ml_model (threshold={}, model attached: {}) keeps all {} agents",
            self.threshold,
            self.model.is_some(),
            features.nrows()
        );
        all_rows(features)
    }
}

/// Options for `bandwidth`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandwidthOptions {
    /// Per-frame data budget; `None` means unconstrained
    pub budget: Option<f64>,
}

impl AgentSelector for BandwidthOptions {
    fn select(&self, features: &FeatureMatrix) -> Vec<usize> {
        debug!(
            "bandwidth (budget={:?}) keeps all {} agents",
            self.budget,
            features.nrows()
        );
        all_rows(features)
    }
}

/// A selection method together with its options.
#[derive(Debug, Clone, Default)]
pub enum SelectionStrategy {
    #[default]
    Identity,
    ClosestK(ClosestKOptions),
    VelocityBased(VelocityOptions),
    Heuristic(HeuristicOptions),
    MlModel(MlModelOptions),
    BandwidthAware(BandwidthOptions),
}

impl SelectionStrategy {
    /// Returns the method tag of this strategy.
    pub fn method(&self) -> SelectionMethod {
        match self {
            SelectionStrategy::Identity => SelectionMethod::Identity,
            SelectionStrategy::ClosestK(_) => SelectionMethod::ClosestK,
            SelectionStrategy::VelocityBased(_) => SelectionMethod::VelocityBased,
            SelectionStrategy::Heuristic(_) => SelectionMethod::Heuristic,
            SelectionStrategy::MlModel(_) => SelectionMethod::MlModel,
            SelectionStrategy::BandwidthAware(_) => SelectionMethod::BandwidthAware,
        }
    }

    /// Strategy for `method` with default options.
    pub fn with_defaults(method: SelectionMethod) -> Self {
        match method {
            SelectionMethod::Identity => SelectionStrategy::Identity,
            SelectionMethod::ClosestK => SelectionStrategy::ClosestK(Default::default()),
            SelectionMethod::VelocityBased => SelectionStrategy::VelocityBased(Default::default()),
            SelectionMethod::Heuristic => SelectionStrategy::Heuristic(Default::default()),
            SelectionMethod::MlModel => SelectionStrategy::MlModel(Default::default()),
            SelectionMethod::BandwidthAware => SelectionStrategy::BandwidthAware(Default::default()),
        }
    }

    /// Builds a strategy from a method and an open option bag.
    ///
    /// Each strategy reads the keys it recognizes and ignores the rest.
    /// `K` is read as `k` unless the bag also holds `k`.
    ///
    /// # Errors
    /// * `CoreError::InvalidArgument` - a recognized key has the wrong type
    pub fn from_options(method: SelectionMethod, options: &Map<String, Value>) -> Result<Self> {
        Ok(match method {
            SelectionMethod::Identity => SelectionStrategy::Identity,
            SelectionMethod::ClosestK => SelectionStrategy::ClosestK(parse_options(method, options)?),
            SelectionMethod::VelocityBased => {
                SelectionStrategy::VelocityBased(parse_options(method, options)?)
            }
            SelectionMethod::Heuristic => SelectionStrategy::Heuristic(parse_options(method, options)?),
            SelectionMethod::MlModel => SelectionStrategy::MlModel(parse_options(method, options)?),
            SelectionMethod::BandwidthAware => {
                SelectionStrategy::BandwidthAware(parse_options(method, options)?)
            }
        })
    }

    /// Builds a strategy from a method tag and an open option bag.
    ///
    /// # Errors
    /// * `CoreError::InvalidArgument` - unknown tag, or a mistyped option
    pub fn from_tag(tag: &str, options: &Map<String, Value>) -> Result<Self> {
        let method: SelectionMethod = tag.parse()?;
        Self::from_options(method, options)
    }
}

impl AgentSelector for SelectionStrategy {
    fn select(&self, features: &FeatureMatrix) -> Vec<usize> {
        match self {
            SelectionStrategy::Identity => all_rows(features),
            SelectionStrategy::ClosestK(opts) => opts.select(features),
            SelectionStrategy::VelocityBased(opts) => opts.select(features),
            SelectionStrategy::Heuristic(opts) => opts.select(features),
            SelectionStrategy::MlModel(opts) => opts.select(features),
            SelectionStrategy::BandwidthAware(opts) => opts.select(features),
        }
    }
}

fn parse_options<T: DeserializeOwned>(method: SelectionMethod, options: &Map<String, Value>) -> Result<T> {
    let mut bag = options.clone();
    if let Some(upper) = bag.remove("K") {
        bag.entry("k").or_insert(upper);
    }
    serde_json::from_value(Value::Object(bag))
        .map_err(|e| CoreError::invalid(format!("{method} options: {e}")))
}
