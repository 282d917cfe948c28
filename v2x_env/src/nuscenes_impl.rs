//! On-disk implementation of DatasetProvider for nuScenes-format datasets.
//!
//! Expected layout (V2X-Sim uses the nuScenes devkit format):
//!
//! ```text
//! <dataroot>/
//!   <version>/
//!     scene.json              # scene token, name, first_sample_token
//!     sample.json             # sample token, next ("" at end of scene)
//!     sample_data.json        # sample_token, calibrated_sensor_token, filename, timestamp, is_key_frame
//!     calibrated_sensor.json  # token -> sensor_token
//!     sensor.json             # token -> channel
//!   sweeps/ gnss/ imu/ ...    # payload trees referenced by sample_data filenames
//! ```
//!
//! Catalog tables are read eagerly on [`NuScenesProvider::open`];
//! payloads are read lazily per call.

use crate::error::ProviderError;
use crate::provider::DatasetProvider;
use crate::types::{FrameRecord, SampleDataToken, SampleToken, SceneRecord, SensorRecord};
use ndarray::ArrayD;
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SceneRow {
    name: String,
    first_sample_token: String,
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    token: String,
    next: String,
}

#[derive(Debug, Deserialize)]
struct SampleDataRow {
    token: String,
    sample_token: String,
    calibrated_sensor_token: String,
    filename: String,
    timestamp: i64,
    #[serde(default = "default_key_frame")]
    is_key_frame: bool,
}

fn default_key_frame() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct CalibratedSensorRow {
    token: String,
    sensor_token: String,
}

#[derive(Debug, Deserialize)]
struct SensorRow {
    token: String,
    channel: String,
}

/// nuScenes-format dataset on disk.
pub struct NuScenesProvider {
    dataroot: PathBuf,
    version: String,
    scenes: Vec<SceneRecord>,
    frames: HashMap<SampleToken, FrameRecord>,
    records: HashMap<SampleDataToken, SensorRecord>,
}

impl NuScenesProvider {
    /// Opens the catalog at `<dataroot>/<version>`.
    ///
    /// # Errors
    /// * `ProviderError::Io` / `ProviderError::Json` - a table is missing or malformed
    /// * `ProviderError::UnknownToken` - a sample_data row references a
    ///   calibrated sensor or sensor that does not exist
    pub fn open(dataroot: impl AsRef<Path>, version: &str) -> Result<Self, ProviderError> {
        let dataroot = dataroot.as_ref().to_path_buf();
        let table_dir = dataroot.join(version);

        let scene_rows: Vec<SceneRow> = read_table(&table_dir, "scene")?;
        let sample_rows: Vec<SampleRow> = read_table(&table_dir, "sample")?;
        let sample_data_rows: Vec<SampleDataRow> = read_table(&table_dir, "sample_data")?;
        let calibrated: Vec<CalibratedSensorRow> = read_table(&table_dir, "calibrated_sensor")?;
        let sensors: Vec<SensorRow> = read_table(&table_dir, "sensor")?;

        let sensor_channels: HashMap<String, String> = sensors
            .into_iter()
            .map(|s| (s.token, s.channel))
            .collect();
        let calibrated_sensors: HashMap<String, String> = calibrated
            .into_iter()
            .map(|c| (c.token, c.sensor_token))
            .collect();

        let scenes = scene_rows
            .into_iter()
            .map(|row| SceneRecord {
                name: row.name,
                first_sample: SampleToken::from_raw(&row.first_sample_token),
            })
            .collect::<Vec<_>>();

        let mut frames: HashMap<SampleToken, FrameRecord> = sample_rows
            .into_iter()
            .map(|row| {
                (
                    SampleToken(row.token),
                    FrameRecord {
                        channels: Vec::new(),
                        next: SampleToken::from_raw(&row.next),
                    },
                )
            })
            .collect();

        let mut records = HashMap::with_capacity(sample_data_rows.len());
        for row in sample_data_rows {
            let token = SampleDataToken(row.token);
            records.insert(token.clone(), SensorRecord::new(row.filename, row.timestamp));

            if !row.is_key_frame {
                continue;
            }

            let sensor_token = calibrated_sensors
                .get(&row.calibrated_sensor_token)
                .ok_or_else(|| {
                    ProviderError::unknown("calibrated_sensor", &row.calibrated_sensor_token)
                })?;
            let channel = sensor_channels
                .get(sensor_token)
                .ok_or_else(|| ProviderError::unknown("sensor", sensor_token))?;

            let frame = frames
                .get_mut(&SampleToken(row.sample_token.clone()))
                .ok_or_else(|| ProviderError::unknown("sample", &row.sample_token))?;

            // A later key frame for the same channel replaces the earlier
            // token but keeps its position.
            match frame.channels.iter_mut().find(|(name, _)| name == channel) {
                Some(entry) => entry.1 = token,
                None => frame.channels.push((channel.clone(), token)),
            }
        }

        info!(
            "Opened {} ({}): {} scenes, {} samples, {} sample_data",
            dataroot.display(),
            version,
            scenes.len(),
            frames.len(),
            records.len()
        );

        Ok(Self {
            dataroot,
            version: version.to_string(),
            scenes,
            frames,
            records,
        })
    }

    /// Returns the catalog version tag.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl DatasetProvider for NuScenesProvider {
    fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    fn scene(&self, scene_id: usize) -> Result<SceneRecord, ProviderError> {
        self.scenes
            .get(scene_id)
            .cloned()
            .ok_or(ProviderError::SceneOutOfRange {
                scene_id,
                scene_count: self.scenes.len(),
            })
    }

    fn frame(&self, token: &SampleToken) -> Result<FrameRecord, ProviderError> {
        self.frames
            .get(token)
            .cloned()
            .ok_or_else(|| ProviderError::unknown("sample", token))
    }

    fn sensor_record(&self, token: &SampleDataToken) -> Result<SensorRecord, ProviderError> {
        self.records
            .get(token)
            .cloned()
            .ok_or_else(|| ProviderError::unknown("sample_data", token))
    }

    fn load_payload(&self, filename: &str) -> Result<Vec<f64>, ProviderError> {
        read_npy_flat(&self.dataroot.join(filename))
    }
}

fn read_table<T: DeserializeOwned>(table_dir: &Path, name: &str) -> Result<Vec<T>, ProviderError> {
    let path = table_dir.join(format!("{name}.json"));
    let file = File::open(&path).map_err(|e| ProviderError::io(&path, e))?;
    let rows: Vec<T> = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| ProviderError::Json {
            path: path.clone(),
            source,
        })?;
    debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Reads a numeric `.npy` array of any shape, flattened in logical order.
///
/// float64 arrays are read as-is; float32 arrays are widened.
pub fn read_npy_flat(path: &Path) -> Result<Vec<f64>, ProviderError> {
    let open = || {
        File::open(path)
            .map(BufReader::new)
            .map_err(|e| ProviderError::io(path, e))
    };

    match ArrayD::<f64>::read_npy(open()?) {
        Ok(array) => Ok(array.iter().copied().collect()),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let array = ArrayD::<f32>::read_npy(open()?).map_err(|e| npy_error(path, e))?;
            Ok(array.iter().map(|&v| f64::from(v)).collect())
        }
        Err(e) => Err(npy_error(path, e)),
    }
}

fn npy_error(path: &Path, e: ReadNpyError) -> ProviderError {
    ProviderError::Npy {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
