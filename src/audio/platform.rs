//! Capabilities the engine consumes from the host platform.
//!
//! Two seams: a media layer that loads and plays individual tracks
//! ([`MediaBackend`] / [`MediaTrack`]), and an audio-processing graph that can
//! splice an analyser onto a playing track ([`AudioPlatform`] /
//! [`AudioContext`]). The rodio implementation lives in `rodio_backend`; tests
//! substitute scripted fakes.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::GraphError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackRequest {
    pub url: String,
    pub volume: f32,
    pub looping: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEventKind {
    Loaded,
    LoadFailed(String),
    /// Playback started on the platform's initiative, e.g. a play request
    /// queued before the track finished loading.
    Played,
    Paused,
    Ended,
}

/// Notification from the media layer, tagged with the track it concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub track: TrackId,
    pub kind: MediaEventKind,
}

impl MediaEvent {
    pub fn new(track: TrackId, kind: MediaEventKind) -> Self {
        Self { track, kind }
    }
}

/// Receives mono samples from a tapped media element.
pub trait SampleListener: Send + Sync {
    fn push_samples(&self, samples: &[f32]);
}

/// The point on a media element where an audio graph can observe its signal.
///
/// A tap point can be claimed by exactly one source node for its whole life;
/// a second claim fails the way a browser refuses a second
/// `MediaElementAudioSourceNode` for the same element.
#[derive(Default)]
pub struct TapPoint {
    claimed: AtomicBool,
    listener: Mutex<Option<Arc<dyn SampleListener>>>,
}

impl TapPoint {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns `true` for the first caller only.
    pub fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Frees the claim and drops the listener. Only the context that owns
    /// the claiming source node calls this, when it closes.
    pub fn release_claim(&self) {
        self.detach();
        self.claimed.store(false, Ordering::Release);
    }

    pub fn attach(&self, listener: Arc<dyn SampleListener>) {
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn detach(&self) {
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_attached(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Called from the audio output thread.
    pub fn forward(&self, samples: &[f32]) {
        let guard = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(listener) = guard.as_ref() {
            listener.push_samples(samples);
        }
    }
}

/// Handle on the playable element underneath a loaded track.
#[derive(Clone)]
pub struct MediaNode {
    pub track: TrackId,
    pub tap: Arc<TapPoint>,
}

impl MediaNode {
    pub fn new(track: TrackId, tap: Arc<TapPoint>) -> Self {
        Self { track, tap }
    }
}

impl fmt::Debug for MediaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaNode")
            .field("track", &self.track)
            .field("claimed", &self.tap.is_claimed())
            .finish()
    }
}

/// One loaded (or loading) media track.
///
/// Every operation is fire-and-forget: calls on a track that has not finished
/// loading are queued or ignored by the platform, never errors.
pub trait MediaTrack {
    fn id(&self) -> TrackId;

    /// `None` until the track has loaded.
    fn node(&self) -> Option<MediaNode>;

    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn unload(&mut self);
    fn is_playing(&self) -> bool;
    fn set_volume(&mut self, volume: f32);

    /// Seconds, or `None` while metadata is unknown.
    fn duration(&self) -> Option<f64>;
    fn position(&self) -> f64;
    fn seek(&mut self, seconds: f64);
}

pub trait MediaBackend {
    type Track: MediaTrack;

    /// Starts loading `request` and returns its handle immediately. The load
    /// result arrives later as a [`MediaEventKind::Loaded`] or
    /// [`MediaEventKind::LoadFailed`] event.
    fn open(&mut self, request: TrackRequest) -> Self::Track;

    /// Drains the notifications produced since the last call.
    fn poll_events(&mut self) -> Vec<MediaEvent>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not yet allowed to process audio.
    Suspended,
    Running,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceNode(pub u64);

/// Analyser configuration. `fft_size` sets the resolution/latency trade-off:
/// larger transforms give smoother but laggier magnitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserOptions {
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyserOptions {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserOptions {
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// An audio-processing context holding a single frequency analyser.
pub trait AudioContext {
    fn state(&self) -> ContextState;
    fn resume(&mut self);
    fn create_analyser(&mut self, options: AnalyserOptions) -> Result<(), GraphError>;

    /// Fails with [`GraphError::SourceAlreadyCreated`] if `node` already has
    /// a source node.
    fn create_media_source(&mut self, node: &MediaNode) -> Result<SourceNode, GraphError>;

    /// Routes `source` through the analyser to the output.
    fn connect(&mut self, source: SourceNode) -> Result<(), GraphError>;
    fn disconnect(&mut self, source: SourceNode);

    /// Writes current magnitudes (0-255) into `out`.
    fn byte_frequency_data(&mut self, out: &mut [u8]);

    /// Shuts the context down. Every source node it created is dropped and
    /// its media element can be claimed again by a later context.
    fn close(&mut self);
}

pub trait AudioPlatform {
    fn create_context(&self) -> Result<Box<dyn AudioContext>, GraphError>;
}
