//! Agent selection policies.
//!
//! A policy maps an N x 16 feature matrix to the row indices to keep.
//! Methods form a closed vocabulary ([`SelectionMethod`]); each method's
//! options are a typed struct carried by its [`SelectionStrategy`]
//! variant. Adding a strategy means adding a method tag, an options type
//! implementing [`AgentSelector`], and a variant.
//!
//! | tag         | options              | status                 |
//! |-------------|----------------------|------------------------|
//! | `identity`  | -                    | keeps every row        |
//! | `closest_k` | `k` (3)              | placeholder, keeps all |
//! | `velocity`  | `k` (3)              | placeholder, keeps all |
//! | `heuristic` | any keys (rules)     | placeholder, keeps all |
//! | `ml_model`  | `threshold` (0.5), model | placeholder, keeps all |
//! | `bandwidth` | `budget` (none)      | placeholder, keeps all |

mod method;
mod strategy;

pub use method::SelectionMethod;
pub use strategy::{
    AgentScorer, AgentSelector, BandwidthOptions, ClosestKOptions, HeuristicOptions,
    MlModelOptions, SelectionStrategy, VelocityOptions,
};

use crate::error::Result;
use crate::features::FeatureMatrix;
use serde_json::{Map, Value};

/// Selects agents with a strategy.
pub fn select(features: &FeatureMatrix, strategy: &SelectionStrategy) -> Vec<usize> {
    strategy.select(features)
}

/// Selects agents by method tag with an open option bag.
///
/// # Errors
/// * `CoreError::InvalidArgument` - unknown tag or mistyped option; no
///   indices are produced
pub fn select_by_tag(
    features: &FeatureMatrix,
    tag: &str,
    options: &Map<String, Value>,
) -> Result<Vec<usize>> {
    let strategy = SelectionStrategy::from_tag(tag, options)?;
    Ok(strategy.select(features))
}
