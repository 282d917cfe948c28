//! V2X Synthetic Dataset Harness
//!
//! Deterministic V2X-Sim style datasets with known ground truth, used to
//! exercise the state index end to end.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                       SimWorld                        │
//! │  ┌────────────┐    payloads     ┌─────────────────┐   │
//! │  │   Oracle   │ ──────────────► │ MemoryProvider  │   │
//! │  │ (per scene)│   GNSS / IMU    │ (sample chains) │   │
//! │  └─────┬──────┘                 └────────┬────────┘   │
//! │        │ truth                           │            │
//! └────────┼─────────────────────────────────┼────────────┘
//!          ▼                                 ▼
//!   ┌──────────────┐   compare      ┌─────────────────┐
//!   │ScenarioRunner│ ◄───────────── │   StateIndex    │
//!   └──────────────┘                └─────────────────┘
//! ```
//!
//! All randomness derives from a single 64-bit seed.
//!
//! # Usage
//!
//! ```ignore
//! use v2x_sim::{ScenarioRunner, SimConfig};
//! use v2x_sim::scenarios::ScenarioId;
//!
//! let runner = ScenarioRunner::new(42).with_config(SimConfig {
//!     num_agents: 4,
//!     ..Default::default()
//! });
//! let result = runner.run(ScenarioId::Turning)?;
//! assert!(result.passed);
//! ```

pub mod config;
mod error;
mod exporter;
mod oracle;
mod runner;
pub mod scenarios;
mod world;

pub use config::{RunConfig, SelectionConfig};
pub use error::{Result, SimError};
pub use exporter::{export_frame, FrameExport, IndexExport};
pub use oracle::{GroundTruthAgent, Observation, Oracle};
pub use runner::{check, ScenarioResult, ScenarioRunner};
pub use world::{SimConfig, SimDataset, SimWorld, TruthSample};
