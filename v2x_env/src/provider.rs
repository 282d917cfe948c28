//! Core dataset provider trait consumed by the state index.

use crate::error::ProviderError;
use crate::types::{FrameRecord, SampleDataToken, SampleToken, SceneRecord, SensorRecord};

/// Read-only view of a multi-agent driving dataset.
///
/// This trait abstracts the dataset catalog so that the state index can
/// run against both the on-disk nuScenes-format layout and synthetic
/// in-memory datasets.
///
/// # Implementations
///
/// - **On disk**: `NuScenesProvider` - JSON catalog tables + `.npy` payloads
/// - **In memory**: `MemoryProvider` - builder-populated tables, used by tests
///   and synthetic scenarios
///
/// # Access pattern
///
/// The provider is queried, never mutated. All calls are synchronous;
/// a failed read is reported to the caller, which decides whether it is
/// fatal.
pub trait DatasetProvider {
    /// Returns the number of scenes in the catalog.
    fn scene_count(&self) -> usize;

    /// Returns the scene record at a zero-based catalog position.
    ///
    /// # Errors
    /// * `ProviderError::SceneOutOfRange` - `scene_id >= scene_count()`
    fn scene(&self, scene_id: usize) -> Result<SceneRecord, ProviderError>;

    /// Resolves a frame reference to its channel list and chain link.
    fn frame(&self, token: &SampleToken) -> Result<FrameRecord, ProviderError>;

    /// Resolves a channel's sensor record reference.
    fn sensor_record(&self, token: &SampleDataToken) -> Result<SensorRecord, ProviderError>;

    /// Decodes the payload stored under `filename` into a flat scalar array.
    ///
    /// `filename` is relative to the dataset root.
    fn load_payload(&self, filename: &str) -> Result<Vec<f64>, ProviderError>;
}

impl<P: DatasetProvider + ?Sized> DatasetProvider for &P {
    fn scene_count(&self) -> usize {
        (**self).scene_count()
    }

    fn scene(&self, scene_id: usize) -> Result<SceneRecord, ProviderError> {
        (**self).scene(scene_id)
    }

    fn frame(&self, token: &SampleToken) -> Result<FrameRecord, ProviderError> {
        (**self).frame(token)
    }

    fn sensor_record(&self, token: &SampleDataToken) -> Result<SensorRecord, ProviderError> {
        (**self).sensor_record(token)
    }

    fn load_payload(&self, filename: &str) -> Result<Vec<f64>, ProviderError> {
        (**self).load_payload(filename)
    }
}
