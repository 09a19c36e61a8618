pub mod analyser;
pub mod controller;
pub mod events;
pub mod platform;
pub mod rodio_backend;
pub mod tap;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use analyser::FrequencyAnalyser;
pub use controller::{ControllerState, TrackController};
pub use events::{ControllerEvents, Listeners};
pub use platform::{
    AnalyserOptions, AudioContext, AudioPlatform, ContextState, MediaBackend, MediaEvent,
    MediaEventKind, MediaNode, MediaTrack, SampleListener, SourceNode, TapPoint, TrackId,
    TrackRequest,
};
pub use rodio_backend::{RodioBackend, RodioPlatform};
pub use tap::{SharedTap, SignalTap};

/// Which of the two layered tracks a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackRole {
    Narration,
    Background,
}

impl fmt::Display for TrackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackRole::Narration => write!(f, "narration"),
            TrackRole::Background => write!(f, "background"),
        }
    }
}

/// Stored per-role volumes plus the mute flag.
///
/// The volume actually applied to a track is always derived through
/// [`VolumeState::effective`], so muting never overwrites the stored levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeState {
    pub narration: f32,
    pub background: f32,
    pub muted: bool,
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::new(0.8, 0.5)
    }
}

impl VolumeState {
    pub fn new(narration: f32, background: f32) -> Self {
        Self {
            narration: clamp_unit(narration),
            background: clamp_unit(background),
            muted: false,
        }
    }

    pub fn level(&self, role: TrackRole) -> f32 {
        match role {
            TrackRole::Narration => self.narration,
            TrackRole::Background => self.background,
        }
    }

    /// Stores a clamped level for `role` and returns what was stored.
    pub fn set(&mut self, role: TrackRole, value: f32) -> f32 {
        let value = clamp_unit(value);
        match role {
            TrackRole::Narration => self.narration = value,
            TrackRole::Background => self.background = value,
        }
        value
    }

    pub fn effective(&self, role: TrackRole) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level(role)
        }
    }
}

/// Clamps to [0, 1], mapping NaN to 0.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
