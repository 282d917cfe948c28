//! Record and token types exchanged across the dataset provider boundary.

use serde::{Deserialize, Serialize};

/// Opaque reference to a frame (a nuScenes `sample`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleToken(pub String);

impl SampleToken {
    /// Creates a token from any string-like value.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Converts a raw catalog token, treating the empty string as "none".
    ///
    /// nuScenes tables encode a missing link (`next`, `first_sample_token`)
    /// as `""` rather than `null`.
    pub fn from_raw(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SampleToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to a single sensor record (a nuScenes `sample_data`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleDataToken(pub String);

impl SampleDataToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SampleDataToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    /// Human-readable scene name (e.g. `scene_3`)
    pub name: String,

    /// Head of the frame chain, `None` for a scene without frames
    pub first_sample: Option<SampleToken>,
}

/// One timestep within a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Named sensor channels in discovery order
    pub channels: Vec<(String, SampleDataToken)>,

    /// Next frame in the chain, `None` at the end of the scene
    pub next: Option<SampleToken>,
}

impl FrameRecord {
    /// Looks up a channel by exact name.
    pub fn channel(&self, name: &str) -> Option<&SampleDataToken> {
        self.channels
            .iter()
            .find(|(channel, _)| channel == name)
            .map(|(_, token)| token)
    }

    /// Returns the number of channels in this frame.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Location and capture time of one sensor payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Payload path relative to the dataset root
    pub filename: String,

    /// Capture time in microseconds
    pub timestamp_us: i64,
}

impl SensorRecord {
    pub fn new(filename: impl Into<String>, timestamp_us: i64) -> Self {
        Self {
            filename: filename.into(),
            timestamp_us,
        }
    }

    /// Capture time in seconds.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_us as f64 / 1e6
    }
}
