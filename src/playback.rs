use log::info;
use std::cell::RefCell;
use std::rc::Rc;

use crate::audio::{clamp_unit, MediaBackend, SharedTap, TrackController, TrackRole};
use crate::config::EngineConfig;
use crate::error::LoadError;
use crate::graphics::FrequencySource;

/// Background plays at this fraction of the narration volume.
pub const BACKGROUND_RATIO: f32 = 0.6;

/// Observable playback state of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub loading: bool,
    pub playing: bool,
    pub muted: bool,
    pub volume: f32,
    pub progress: f32,
    pub error: Option<LoadError>,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            loading: true,
            playing: false,
            muted: false,
            volume: 0.8,
            progress: 0.0,
            error: None,
        }
    }
}

#[derive(Default)]
pub struct SessionProps {
    pub narration_url: Option<String>,
    pub background_url: Option<String>,
    pub on_end: Option<Box<dyn FnMut()>>,
}

impl SessionProps {
    pub fn new(narration_url: impl Into<String>) -> Self {
        Self {
            narration_url: Some(narration_url.into()),
            ..Self::default()
        }
    }

    pub fn background(mut self, url: impl Into<String>) -> Self {
        self.background_url = Some(url.into());
        self
    }

    pub fn on_end(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_end = Some(Box::new(callback));
        self
    }
}

/// Binds one [`TrackController`] to a consumer for as long as the session
/// lives. Tracks load on construction; dropping the session destroys the
/// controller.
pub struct PlaybackSession<B: MediaBackend> {
    controller: TrackController<B>,
    state: Rc<RefCell<PlaybackSnapshot>>,
    narration_url: Option<String>,
    background_url: Option<String>,
}

impl<B: MediaBackend> PlaybackSession<B> {
    pub fn new(props: SessionProps, backend: B, tap: SharedTap, config: &EngineConfig) -> Self {
        let volume = config.volume_state();
        let state = Rc::new(RefCell::new(PlaybackSnapshot {
            volume: volume.narration,
            ..PlaybackSnapshot::default()
        }));
        let mut controller = TrackController::new(backend, tap, volume);
        Self::wire(&mut controller, &state, props.on_end);

        let mut session = Self {
            controller,
            state,
            narration_url: None,
            background_url: None,
        };
        session.set_volume(volume.narration);
        session.load(props.narration_url, props.background_url);
        session
    }

    fn wire(
        controller: &mut TrackController<B>,
        state: &Rc<RefCell<PlaybackSnapshot>>,
        on_end: Option<Box<dyn FnMut()>>,
    ) {
        let s = state.clone();
        controller.on_play(move || s.borrow_mut().playing = true);

        let s = state.clone();
        controller.on_pause(move || s.borrow_mut().playing = false);

        let s = state.clone();
        controller.on_progress(move |progress| s.borrow_mut().progress = progress);

        let s = state.clone();
        controller.on_ready(move || s.borrow_mut().loading = false);

        let s = state.clone();
        controller.on_error(move |error| {
            let mut state = s.borrow_mut();
            if error.is_fatal() {
                state.loading = false;
                state.playing = false;
            }
            state.error = Some(error.clone());
        });

        let s = state.clone();
        let mut on_end = on_end;
        controller.on_end(move || {
            {
                let mut state = s.borrow_mut();
                state.playing = false;
                state.progress = 1.0;
            }
            if let Some(callback) = on_end.as_mut() {
                callback();
            }
        });
    }

    fn load(&mut self, narration: Option<String>, background: Option<String>) {
        {
            let mut state = self.state.borrow_mut();
            state.loading = narration.is_some();
            state.playing = false;
            state.progress = 0.0;
            state.error = None;
        }

        self.controller
            .load_narration(narration.as_deref().unwrap_or_default());
        self.controller
            .load_background(background.as_deref().unwrap_or_default());

        self.narration_url = narration;
        self.background_url = background;
    }

    /// Swaps in new tracks. Identical URLs leave playback untouched.
    pub fn set_sources(&mut self, narration: Option<String>, background: Option<String>) {
        if narration == self.narration_url && background == self.background_url {
            return;
        }
        info!("Session switching to {:?}", narration);
        self.load(narration, background);
    }

    pub fn toggle_play(&mut self) -> bool {
        let playing = self.controller.toggle_play();
        self.state.borrow_mut().playing = playing;
        playing
    }

    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.controller.toggle_mute();
        self.state.borrow_mut().muted = muted;
        muted
    }

    pub fn seek(&mut self, fraction: f32) {
        self.controller.seek(fraction);
        self.state.borrow_mut().progress = clamp_unit(fraction);
    }

    /// Sets narration to `value` and background to `value` x
    /// [`BACKGROUND_RATIO`].
    pub fn set_volume(&mut self, value: f32) {
        let value = clamp_unit(value);
        self.controller.set_volume(TrackRole::Narration, value);
        self.controller
            .set_volume(TrackRole::Background, value * BACKGROUND_RATIO);
        self.state.borrow_mut().volume = value;
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.borrow().clone()
    }

    /// One host frame: applies media events, then drives progress polling.
    pub fn tick(&mut self) {
        self.controller.pump_events();
        self.controller.on_animation_frame();
    }

    pub fn controller(&self) -> &TrackController<B> {
        &self.controller
    }
}

impl<B: MediaBackend> Drop for PlaybackSession<B> {
    fn drop(&mut self) {
        self.controller.destroy();
    }
}

impl<B: MediaBackend> FrequencySource for TrackController<B> {
    fn fill_frequency_data(&mut self, out: &mut Vec<u8>) -> bool {
        self.frequency_data(out)
    }
}

impl<B: MediaBackend> FrequencySource for PlaybackSession<B> {
    fn fill_frequency_data(&mut self, out: &mut Vec<u8>) -> bool {
        self.controller.frequency_data(out)
    }
}
