pub mod audio;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod graphics;
pub mod playback;

#[cfg(test)]
mod testing;

pub use audio::{SignalTap, TrackController, TrackRole};
pub use config::EngineConfig;
pub use error::{ConfigError, GraphError, LoadError};
pub use graphics::{Visualizer, VisualizerConfig, VisualStyle};
pub use playback::{PlaybackSession, PlaybackSnapshot, SessionProps};
