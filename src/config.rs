use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::audio::{AnalyserOptions, VolumeState};
use crate::error::ConfigError;
use crate::graphics::VisualizerConfig;

/// Engine settings, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub narration_volume: f32,
    pub background_volume: f32,
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub visualizer: VisualizerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let analyser = AnalyserOptions::default();
        let volume = VolumeState::default();
        Self {
            narration_volume: volume.narration,
            background_volume: volume.background,
            fft_size: analyser.fft_size,
            smoothing: analyser.smoothing,
            min_decibels: analyser.min_decibels,
            max_decibels: analyser.max_decibels,
            visualizer: VisualizerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn analyser_options(&self) -> AnalyserOptions {
        AnalyserOptions {
            fft_size: self.fft_size,
            smoothing: self.smoothing,
            min_decibels: self.min_decibels,
            max_decibels: self.max_decibels,
        }
    }

    pub fn volume_state(&self) -> VolumeState {
        VolumeState::new(self.narration_volume, self.background_volume)
    }
}
