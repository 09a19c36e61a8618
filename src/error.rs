use thiserror::Error;

use crate::audio::TrackRole;

/// Failures raised by an audio-processing graph.
///
/// None of these are fatal to playback: the signal tap logs them and reports
/// "no data" to the visualizer instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("audio processing is unavailable: {0}")]
    Unavailable(String),

    /// The platform allows a single source node per media element.
    #[error("a source node already exists for this media element")]
    SourceAlreadyCreated,

    #[error("source node is not connected")]
    NotConnected,

    #[error("failed to connect audio nodes: {0}")]
    Connection(String),
}

/// A track failed to load. Delivered through the controller's error
/// listeners, never returned from a transport call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to load {role} track '{url}': {reason}")]
pub struct LoadError {
    pub role: TrackRole,
    pub url: String,
    pub reason: String,
}

impl LoadError {
    /// Without narration nothing can play; a missing background track only
    /// drops the ambience.
    pub fn is_fatal(&self) -> bool {
        self.role == TrackRole::Narration
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
