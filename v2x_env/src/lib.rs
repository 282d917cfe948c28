//! V2X Dataset Provider Layer
//!
//! This crate is the boundary between the state index and the dataset on
//! disk. The index only ever sees the [`DatasetProvider`] trait:
//!
//! - Scenes (`scene()`) and their frame chains (`frame()`, [`FrameChain`])
//! - Sensor records (`sensor_record()`) and decoded payloads (`load_payload()`)
//!
//! Two implementations ship with it: [`NuScenesProvider`] for the
//! nuScenes-format layout used by V2X-Sim, and [`MemoryProvider`] for
//! tests and synthetic datasets.
//!
//! # Example
//!
//! ```ignore
//! use v2x_env::{DatasetProvider, FrameChain, NuScenesProvider};
//!
//! let provider = NuScenesProvider::open("data/V2X-Sim-2", "v2.0")?;
//! let chain = FrameChain::for_scene(&provider, 0)?;
//! for frame in chain.frames() {
//!     let (frame_id, record) = frame?;
//!     println!("frame {frame_id}: {} channels", record.channel_count());
//! }
//! ```

mod chain;
pub mod convention;
mod error;
mod memory_impl;
mod nuscenes_impl;
mod provider;
mod types;

pub use chain::{FrameChain, FrameCursor};
pub use convention::PayloadLayout;
pub use error::ProviderError;
pub use memory_impl::MemoryProvider;
pub use nuscenes_impl::{read_npy_flat, NuScenesProvider};
pub use provider::DatasetProvider;
pub use types::{FrameRecord, SampleDataToken, SampleToken, SceneRecord, SensorRecord};
