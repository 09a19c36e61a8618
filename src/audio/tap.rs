use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{AnalyserOptions, AudioContext, AudioPlatform, ContextState, MediaNode, SourceNode, TrackId};
use crate::error::GraphError;

/// One signal tap shared by every controller on the UI thread.
pub type SharedTap = Rc<RefCell<SignalTap>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    track: TrackId,
    source: SourceNode,
}

/// Owns the audio-processing context and its analyser, and taps at most one
/// track at a time for frequency data.
///
/// The context is created lazily on first use and torn down only by
/// [`SignalTap::destroy`]. Every platform failure is logged and absorbed:
/// callers see "no data", never an error.
pub struct SignalTap {
    platform: Box<dyn AudioPlatform>,
    options: AnalyserOptions,
    context: Option<Box<dyn AudioContext>>,
    buffer: Vec<u8>,
    // A media element accepts a single source node for life, so nodes are
    // kept per track and reconnected on rebind.
    sources: HashMap<TrackId, SourceNode>,
    binding: Option<Binding>,
}

impl SignalTap {
    pub fn new(platform: Box<dyn AudioPlatform>, options: AnalyserOptions) -> Self {
        Self {
            platform,
            options,
            context: None,
            buffer: Vec::new(),
            sources: HashMap::new(),
            binding: None,
        }
    }

    pub fn shared(platform: Box<dyn AudioPlatform>, options: AnalyserOptions) -> SharedTap {
        Rc::new(RefCell::new(Self::new(platform, options)))
    }

    /// Creates the context and analyser if they do not exist yet. Returns
    /// whether the tap is usable.
    pub fn initialize(&mut self) -> bool {
        if self.context.is_some() {
            return true;
        }

        let context = self.platform.create_context().and_then(|mut context| {
            context.create_analyser(self.options)?;
            Ok(context)
        });

        match context {
            Ok(context) => {
                info!(
                    "Signal tap initialized ({}-point transform, {} bins)",
                    self.options.fft_size,
                    self.options.bin_count()
                );
                self.buffer = vec![0; self.options.bin_count()];
                self.context = Some(context);
                true
            }
            Err(e) => {
                warn!("Signal tap unavailable, visualization will use placeholders: {}", e);
                false
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn bound_track(&self) -> Option<TrackId> {
        self.binding.map(|b| b.track)
    }

    /// Taps `node`, replacing any previous binding. Tapping the node that is
    /// already bound is a no-op. Returns whether `node` ends up bound.
    pub fn bind(&mut self, node: &MediaNode) -> bool {
        if !self.initialize() {
            return false;
        }
        if self.bound_track() == Some(node.track) {
            debug!("Track {} is already tapped", node.track);
            return true;
        }

        self.release();

        let Some(context) = self.context.as_mut() else {
            return false;
        };

        let source = match self.sources.get(&node.track) {
            Some(&source) => source,
            None => match context.create_media_source(node) {
                Ok(source) => {
                    self.sources.insert(node.track, source);
                    source
                }
                Err(GraphError::SourceAlreadyCreated) => {
                    // The element is already routed through the graph, which
                    // is still a valid connection.
                    warn!("Track {} already has a source node", node.track);
                    return true;
                }
                Err(e) => {
                    warn!("Failed to tap track {}: {}", node.track, e);
                    return false;
                }
            },
        };

        if let Err(e) = context.connect(source) {
            warn!("Failed to connect track {} to the analyser: {}", node.track, e);
            return false;
        }

        info!("Signal tap bound to track {}", node.track);
        self.binding = Some(Binding {
            track: node.track,
            source,
        });
        true
    }

    /// Current magnitudes, or `None` when there is no context or binding.
    /// The slice is refreshed in place on every call.
    pub fn read(&mut self) -> Option<&[u8]> {
        self.binding?;
        let context = self.context.as_mut()?;
        context.byte_frequency_data(&mut self.buffer);
        Some(&self.buffer)
    }

    /// Copies the current magnitudes into `out`. Returns `false` (leaving
    /// `out` empty) when no data is available.
    pub fn read_into(&mut self, out: &mut Vec<u8>) -> bool {
        out.clear();
        match self.read() {
            Some(frame) => {
                out.extend_from_slice(frame);
                true
            }
            None => false,
        }
    }

    /// Disconnects the current binding, if any.
    pub fn release(&mut self) {
        if let Some(binding) = self.binding.take() {
            if let Some(context) = self.context.as_mut() {
                context.disconnect(binding.source);
            }
            debug!("Signal tap released track {}", binding.track);
        }
    }

    /// Releases `track` if it holds the binding and forgets its source node.
    /// Used when a track is unloaded; leaves other controllers' bindings
    /// alone.
    pub fn release_track(&mut self, track: TrackId) {
        if self.bound_track() == Some(track) {
            self.release();
        }
        self.sources.remove(&track);
    }

    /// Platforms keep a new context suspended until a user gesture.
    pub fn resume_if_suspended(&mut self) {
        if let Some(context) = self.context.as_mut() {
            if context.state() == ContextState::Suspended {
                debug!("Resuming suspended audio context");
                context.resume();
            }
        }
    }

    pub fn context_state(&self) -> Option<ContextState> {
        self.context.as_ref().map(|c| c.state())
    }

    /// Tears the context down; the next use creates a fresh one.
    pub fn destroy(&mut self) {
        self.release();
        self.sources.clear();
        if let Some(mut context) = self.context.take() {
            context.close();
            info!("Signal tap destroyed");
        }
        self.buffer.clear();
    }
}
