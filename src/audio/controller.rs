use log::{debug, error, info, warn};

use super::{
    clamp_unit, ControllerEvents, MediaBackend, MediaEvent, MediaEventKind, MediaTrack,
    SharedTap, TrackId, TrackRequest, TrackRole, VolumeState,
};
use crate::error::LoadError;
use crate::frame_loop::FrameLoop;

/// Lifecycle of a controller, driven by the narration track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Empty,
    Loading,
    Ready,
    Playing,
    Paused,
    /// Narration played to completion. Only a new load leaves this state.
    Ended,
    Destroyed,
}

struct Track<T> {
    url: String,
    role: TrackRole,
    loaded: bool,
    media: T,
}

impl<T: MediaTrack> Track<T> {
    fn release(mut self) {
        self.media.stop();
        self.media.unload();
        debug!("Released {} track '{}'", self.role, self.url);
    }
}

/// Plays a narration track and a looping background track in lockstep.
///
/// All mutation happens on the caller's thread. Media notifications are
/// pulled with [`TrackController::pump_events`], and progress is reported
/// from [`TrackController::on_animation_frame`] while narration plays.
pub struct TrackController<B: MediaBackend> {
    backend: B,
    tap: SharedTap,
    narration: Option<Track<B::Track>>,
    background: Option<Track<B::Track>>,
    volume: VolumeState,
    state: ControllerState,
    progress_loop: FrameLoop,
    events: ControllerEvents,
}

impl<B: MediaBackend> TrackController<B> {
    pub fn new(backend: B, tap: SharedTap, volume: VolumeState) -> Self {
        Self {
            backend,
            tap,
            narration: None,
            background: None,
            volume,
            state: ControllerState::Empty,
            progress_loop: FrameLoop::new(),
            events: ControllerEvents::default(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn volume(&self) -> VolumeState {
        self.volume
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == ControllerState::Destroyed
    }

    pub fn progress_pending(&self) -> bool {
        self.progress_loop.is_pending()
    }

    pub fn has_track(&self, role: TrackRole) -> bool {
        self.track(role).is_some()
    }

    pub fn track_url(&self, role: TrackRole) -> Option<&str> {
        self.track(role).map(|t| t.url.as_str())
    }

    pub fn is_loaded(&self, role: TrackRole) -> bool {
        self.track(role).map_or(false, |t| t.loaded)
    }

    fn track(&self, role: TrackRole) -> Option<&Track<B::Track>> {
        match role {
            TrackRole::Narration => self.narration.as_ref(),
            TrackRole::Background => self.background.as_ref(),
        }
    }

    fn track_mut(&mut self, role: TrackRole) -> Option<&mut Track<B::Track>> {
        match role {
            TrackRole::Narration => self.narration.as_mut(),
            TrackRole::Background => self.background.as_mut(),
        }
    }

    fn role_of(&self, id: TrackId) -> Option<TrackRole> {
        if self.narration.as_ref().map(|t| t.media.id()) == Some(id) {
            Some(TrackRole::Narration)
        } else if self.background.as_ref().map(|t| t.media.id()) == Some(id) {
            Some(TrackRole::Background)
        } else {
            None
        }
    }

    pub fn load_narration(&mut self, url: &str) {
        self.load(TrackRole::Narration, url);
    }

    pub fn load_background(&mut self, url: &str) {
        self.load(TrackRole::Background, url);
    }

    /// Replaces the track for `role`. The previous track is stopped and
    /// unloaded before the new one is created.
    pub fn load(&mut self, role: TrackRole, url: &str) {
        if self.is_destroyed() {
            warn!("Ignoring {} load on a destroyed controller", role);
            return;
        }

        self.unload(role);

        let url = url.trim();
        if url.is_empty() {
            if role == TrackRole::Narration {
                warn!("No narration URL provided");
            }
            return;
        }

        let looping = role == TrackRole::Background;
        let media = self.backend.open(TrackRequest {
            url: url.to_string(),
            volume: self.volume.effective(role),
            looping,
        });
        info!("Loading {} track '{}' as {}", role, url, media.id());

        let track = Track {
            url: url.to_string(),
            role,
            loaded: false,
            media,
        };
        match role {
            TrackRole::Narration => {
                self.narration = Some(track);
                self.state = ControllerState::Loading;
            }
            TrackRole::Background => self.background = Some(track),
        }
    }

    fn unload(&mut self, role: TrackRole) {
        let previous = match role {
            TrackRole::Narration => self.narration.take(),
            TrackRole::Background => self.background.take(),
        };
        let Some(previous) = previous else {
            return;
        };

        if role == TrackRole::Narration {
            self.progress_loop.cancel();
            self.tap.borrow_mut().release_track(previous.media.id());
            if !self.is_destroyed() {
                self.state = ControllerState::Empty;
            }
        }
        previous.release();
    }

    /// Applies every media notification received since the last call.
    /// Notifications from tracks that have since been replaced are dropped.
    pub fn pump_events(&mut self) {
        if self.is_destroyed() {
            return;
        }
        for event in self.backend.poll_events() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: MediaEvent) {
        let Some(role) = self.role_of(event.track) else {
            debug!("Dropping stale {:?} from track {}", event.kind, event.track);
            return;
        };

        match (role, event.kind) {
            (TrackRole::Narration, MediaEventKind::Loaded) => self.narration_loaded(),
            (TrackRole::Background, MediaEventKind::Loaded) => {
                if let Some(track) = self.background.as_mut() {
                    track.loaded = true;
                    info!("Background track '{}' loaded", track.url);
                }
            }
            (role, MediaEventKind::LoadFailed(reason)) => self.load_failed(role, reason),
            (TrackRole::Narration, MediaEventKind::Played) => {
                if matches!(self.state, ControllerState::Loading | ControllerState::Ready | ControllerState::Paused) {
                    self.state = ControllerState::Playing;
                    self.events.play.emit(&());
                }
                if !self.progress_loop.is_pending() {
                    self.progress_loop.schedule();
                }
            }
            (TrackRole::Narration, MediaEventKind::Paused) => {
                if self.state == ControllerState::Playing {
                    self.state = ControllerState::Paused;
                    self.events.pause.emit(&());
                }
            }
            (TrackRole::Narration, MediaEventKind::Ended) => self.narration_ended(),
            (TrackRole::Background, kind) => {
                debug!("Background track event {:?}", kind);
            }
        }
    }

    fn narration_loaded(&mut self) {
        let Some(track) = self.narration.as_mut() else {
            return;
        };
        track.loaded = true;
        info!("Narration track '{}' loaded", track.url);

        if let Some(node) = track.media.node() {
            self.tap.borrow_mut().bind(&node);
        }
        if self.state == ControllerState::Loading {
            self.state = ControllerState::Ready;
        }
        self.events.ready.emit(&());
        self.progress_loop.schedule();
    }

    fn load_failed(&mut self, role: TrackRole, reason: String) {
        let url = self.track_url(role).unwrap_or_default().to_string();
        let failure = LoadError { role, url, reason };
        error!("{}", failure);

        self.unload(role);
        self.events.error.emit(&failure);
    }

    fn narration_ended(&mut self) {
        if self.state != ControllerState::Playing {
            debug!("Ignoring narration end in state {:?}", self.state);
            return;
        }
        info!("Narration finished");
        self.state = ControllerState::Ended;
        self.progress_loop.cancel();
        if let Some(track) = self.background.as_mut() {
            track.media.pause();
        }
        self.events.end.emit(&());
    }

    /// Starts or resumes both tracks.
    pub fn play(&mut self) {
        match self.state {
            ControllerState::Destroyed | ControllerState::Ended => {
                debug!("Ignoring play in state {:?}", self.state);
                return;
            }
            _ => {}
        }

        if let Some(track) = self.narration.as_mut() {
            track.media.play();
        }
        self.tap.borrow_mut().resume_if_suspended();
        if let Some(track) = self.background.as_mut() {
            track.media.play();
        }

        if matches!(self.state, ControllerState::Ready | ControllerState::Paused) {
            self.state = ControllerState::Playing;
            self.events.play.emit(&());
            self.progress_loop.schedule();
        }
    }

    /// Pauses both tracks without unloading them.
    pub fn pause(&mut self) {
        if self.is_destroyed() {
            return;
        }
        if let Some(track) = self.narration.as_mut() {
            track.media.pause();
        }
        if let Some(track) = self.background.as_mut() {
            track.media.pause();
        }

        if self.state == ControllerState::Playing {
            self.state = ControllerState::Paused;
            self.events.pause.emit(&());
        }
    }

    /// Flips playback and returns whether narration is actually playing
    /// afterwards. The narration track's own status decides, not the
    /// controller state, so a platform-initiated stop cannot leave the two out
    /// of step. A start that is ignored (ended, destroyed, no narration) or
    /// only queued behind a load reports `false`.
    pub fn toggle_play(&mut self) -> bool {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
        self.is_playing()
    }

    pub fn is_playing(&self) -> bool {
        self.narration.as_ref().map_or(false, |t| t.media.is_playing())
    }

    /// Stores a clamped level for `role` and applies it to the live track
    /// unless muted. A missing track is not an error.
    pub fn set_volume(&mut self, role: TrackRole, value: f32) {
        self.volume.set(role, value);
        let effective = self.volume.effective(role);
        if self.volume.muted {
            return;
        }
        if let Some(track) = self.track_mut(role) {
            track.media.set_volume(effective);
        }
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.volume.muted = !self.volume.muted;
        for role in [TrackRole::Narration, TrackRole::Background] {
            let effective = self.volume.effective(role);
            if let Some(track) = self.track_mut(role) {
                track.media.set_volume(effective);
            }
        }
        self.volume.muted
    }

    /// Seeks narration to `fraction` of its duration. No-op while the
    /// duration is unknown.
    pub fn seek(&mut self, fraction: f32) {
        let fraction = clamp_unit(fraction) as f64;
        let Some(track) = self.narration.as_mut() else {
            return;
        };
        match track.media.duration() {
            Some(duration) if duration > 0.0 => track.media.seek(fraction * duration),
            _ => debug!("Seek ignored, narration duration unknown"),
        }
    }

    /// Narration position as a fraction of its duration, 0 when unknown.
    pub fn progress(&self) -> f32 {
        let Some(track) = self.narration.as_ref() else {
            return 0.0;
        };
        match track.media.duration() {
            Some(duration) if duration > 0.0 => {
                clamp_unit((track.media.position() / duration) as f32)
            }
            _ => 0.0,
        }
    }

    /// Delivers one animation frame to the progress loop. Reports progress if
    /// a frame was requested, then requests another only while narration is
    /// still playing.
    pub fn on_animation_frame(&mut self) {
        if self.progress_loop.take().is_none() || self.is_destroyed() {
            return;
        }

        let progress = self.progress();
        self.events.progress.emit(&progress);

        if self.is_playing() {
            self.progress_loop.schedule();
        }
    }

    /// Copies the live frequency frame into `out`; `false` if none.
    pub fn frequency_data(&self, out: &mut Vec<u8>) -> bool {
        self.tap.borrow_mut().read_into(out)
    }

    pub fn on_play(&mut self, mut callback: impl FnMut() + 'static) -> &mut Self {
        self.events.play.push(move |_| callback());
        self
    }

    pub fn on_pause(&mut self, mut callback: impl FnMut() + 'static) -> &mut Self {
        self.events.pause.push(move |_| callback());
        self
    }

    pub fn on_end(&mut self, mut callback: impl FnMut() + 'static) -> &mut Self {
        self.events.end.push(move |_| callback());
        self
    }

    pub fn on_progress(&mut self, callback: impl FnMut(f32) + 'static) -> &mut Self {
        let mut callback = callback;
        self.events.progress.push(move |progress| callback(*progress));
        self
    }

    pub fn on_ready(&mut self, mut callback: impl FnMut() + 'static) -> &mut Self {
        self.events.ready.push(move |_| callback());
        self
    }

    pub fn on_error(&mut self, callback: impl FnMut(&LoadError) + 'static) -> &mut Self {
        self.events.error.push(callback);
        self
    }

    /// Stops and unloads both tracks, releases the tap, cancels progress
    /// polling and drops every listener. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.is_destroyed() {
            return;
        }
        self.unload(TrackRole::Narration);
        self.unload(TrackRole::Background);
        self.progress_loop.cancel();
        self.events.clear();
        self.state = ControllerState::Destroyed;
        info!("Track controller destroyed");
    }
}

impl<B: MediaBackend> Drop for TrackController<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AnalyserOptions, SignalTap};
    use crate::testing::{FakeBackend, FakePlatform};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Fixture {
        backend: FakeBackend,
        platform: FakePlatform,
        controller: TrackController<FakeBackend>,
    }

    fn fixture() -> Fixture {
        let backend = FakeBackend::new();
        let platform = FakePlatform::new();
        let tap = SignalTap::shared(Box::new(platform.clone()), AnalyserOptions::default());
        let controller = TrackController::new(backend.clone(), tap, VolumeState::new(0.8, 0.5));
        Fixture {
            backend,
            platform,
            controller,
        }
    }

    fn loaded(narration: &str, background: Option<&str>) -> Fixture {
        let mut f = fixture();
        f.controller.load_narration(narration);
        if let Some(url) = background {
            f.controller.load_background(url);
        }
        f.backend.finish_load(narration, 60.0);
        if let Some(url) = background {
            f.backend.finish_load(url, 30.0);
        }
        f.controller.pump_events();
        f
    }

    fn counter() -> (Rc<Cell<usize>>, impl FnMut() + 'static) {
        let count = Rc::new(Cell::new(0));
        let inner = count.clone();
        (count, move || inner.set(inner.get() + 1))
    }

    #[test]
    fn new_narration_releases_the_previous_one_first() {
        let mut f = loaded("a.mp3", None);
        f.controller.play();

        f.controller.load_narration("c.mp3");

        let old = f.backend.media("a.mp3");
        assert!(old.borrow().stopped);
        assert!(old.borrow().unloaded);
        assert!(!old.borrow().playing);
        assert_eq!(f.controller.state(), ControllerState::Loading);
        assert_eq!(f.controller.track_url(TrackRole::Narration), Some("c.mp3"));
        assert!(f.platform.graph.borrow().connected.is_empty());
    }

    #[test]
    fn background_is_created_looping_with_effective_volume() {
        let mut f = fixture();
        f.controller.toggle_mute();
        f.controller.load_background("b.mp3");

        let media = f.backend.media("b.mp3");
        assert!(media.borrow().looping);
        assert_eq!(media.borrow().volume, 0.0);
    }

    #[test]
    fn load_binds_the_tap_to_narration() {
        let f = loaded("a.mp3", Some("b.mp3"));
        let graph = f.platform.graph.borrow();
        assert_eq!(graph.connected.len(), 1);
        assert_eq!(f.controller.state(), ControllerState::Ready);
        assert!(f.controller.is_loaded(TrackRole::Background));
    }

    #[test]
    fn play_starts_both_tracks_and_resumes_the_context() {
        let mut f = loaded("a.mp3", Some("b.mp3"));
        let (plays, on_play) = counter();
        f.controller.on_play(on_play);

        f.controller.play();

        assert!(f.backend.media("a.mp3").borrow().playing);
        assert!(f.backend.media("b.mp3").borrow().playing);
        assert_eq!(f.platform.graph.borrow().resumes, 1);
        assert_eq!(f.controller.state(), ControllerState::Playing);
        assert_eq!(plays.get(), 1);
    }

    #[test]
    fn pause_keeps_tracks_loaded() {
        let mut f = loaded("a.mp3", Some("b.mp3"));
        let (pauses, on_pause) = counter();
        f.controller.on_pause(on_pause);
        f.controller.play();

        f.controller.pause();

        let narration = f.backend.media("a.mp3");
        assert!(!narration.borrow().playing);
        assert!(!narration.borrow().unloaded);
        assert!(!f.backend.media("b.mp3").borrow().playing);
        assert_eq!(f.controller.state(), ControllerState::Paused);
        assert_eq!(pauses.get(), 1);
    }

    #[test]
    fn toggle_play_follows_the_narration_track() {
        let mut f = loaded("a.mp3", None);
        assert!(f.controller.toggle_play());
        assert!(!f.controller.toggle_play());

        // Playback stopped behind the controller's back.
        f.controller.play();
        f.backend.media("a.mp3").borrow_mut().playing = false;
        assert!(f.controller.toggle_play());
        assert!(f.backend.media("a.mp3").borrow().playing);
    }

    #[test]
    fn toggle_play_after_the_end_stays_stopped() {
        let mut f = loaded("a.mp3", None);
        f.controller.play();
        f.backend.advance(61.0);
        f.controller.pump_events();
        assert_eq!(f.controller.state(), ControllerState::Ended);

        assert!(!f.controller.toggle_play());
        assert!(!f.backend.media("a.mp3").borrow().playing);
        assert_eq!(f.controller.state(), ControllerState::Ended);
    }

    #[test]
    fn toggle_play_while_loading_only_queues() {
        let mut f = fixture();
        f.controller.load_narration("a.mp3");

        assert!(!f.controller.toggle_play());
        assert!(f.backend.media("a.mp3").borrow().play_queued);

        f.backend.finish_load("a.mp3", 60.0);
        f.controller.pump_events();
        assert_eq!(f.controller.state(), ControllerState::Playing);
        assert!(f.controller.is_playing());
    }

    #[test]
    fn toggle_play_without_narration_is_false() {
        let mut f = fixture();
        assert!(!f.controller.toggle_play());
        f.controller.destroy();
        assert!(!f.controller.toggle_play());
    }

    #[test]
    fn set_volume_clamps_and_applies() {
        let mut f = loaded("a.mp3", Some("b.mp3"));

        f.controller.set_volume(TrackRole::Narration, 0.3);
        assert_eq!(f.backend.media("a.mp3").borrow().volume, 0.3);

        f.controller.set_volume(TrackRole::Narration, 1.4);
        assert_eq!(f.backend.media("a.mp3").borrow().volume, 1.0);

        f.controller.set_volume(TrackRole::Background, -1.0);
        assert_eq!(f.backend.media("b.mp3").borrow().volume, 0.0);
        assert_eq!(f.controller.volume().background, 0.0);
    }

    #[test]
    fn set_volume_while_muted_only_stores() {
        let mut f = loaded("a.mp3", None);
        f.controller.toggle_mute();
        f.controller.set_volume(TrackRole::Narration, 0.4);

        assert_eq!(f.backend.media("a.mp3").borrow().volume, 0.0);
        assert_eq!(f.controller.volume().narration, 0.4);
    }

    #[test]
    fn double_mute_restores_exact_levels() {
        let mut f = loaded("a.mp3", Some("b.mp3"));
        f.controller.set_volume(TrackRole::Narration, 0.37);
        f.controller.set_volume(TrackRole::Background, 0.22);

        assert!(f.controller.toggle_mute());
        assert_eq!(f.backend.media("a.mp3").borrow().volume, 0.0);
        assert_eq!(f.backend.media("b.mp3").borrow().volume, 0.0);

        assert!(!f.controller.toggle_mute());
        assert_eq!(f.backend.media("a.mp3").borrow().volume, 0.37);
        assert_eq!(f.backend.media("b.mp3").borrow().volume, 0.22);
        assert_eq!(f.controller.volume(), VolumeState { narration: 0.37, background: 0.22, muted: false });
    }

    #[test]
    fn seek_clamps_to_the_duration() {
        let mut f = loaded("a.mp3", None);
        let media = f.backend.media("a.mp3");

        f.controller.seek(0.25);
        assert_eq!(media.borrow().position, 15.0);

        f.controller.seek(-0.5);
        assert_eq!(media.borrow().position, 0.0);

        f.controller.seek(2.0);
        assert_eq!(media.borrow().position, 60.0);
    }

    #[test]
    fn seek_without_duration_is_ignored() {
        let mut f = fixture();
        f.controller.seek(0.5);

        f.controller.load_narration("a.mp3");
        f.controller.seek(0.5);
        assert!(f.backend.media("a.mp3").borrow().seeks.is_empty());
        assert_eq!(f.controller.progress(), 0.0);
    }

    #[test]
    fn progress_rises_while_playing_and_ends_once() {
        let mut f = loaded("a.mp3", Some("b.mp3"));
        let samples = Rc::new(RefCell::new(Vec::new()));
        let sink = samples.clone();
        f.controller.on_progress(move |p| sink.borrow_mut().push(p));
        let (ends, on_end) = counter();
        f.controller.on_end(on_end);

        f.controller.play();
        for _ in 0..5 {
            f.backend.advance(10.0);
            f.controller.pump_events();
            f.controller.on_animation_frame();
        }
        assert!(samples.borrow().windows(2).all(|w| w[0] < w[1]));

        f.backend.advance(20.0);
        f.controller.pump_events();
        f.controller.on_animation_frame();

        assert!(!f.controller.is_playing());
        assert_eq!(f.controller.progress(), 1.0);
        assert_eq!(f.controller.state(), ControllerState::Ended);
        assert_eq!(ends.get(), 1);
        assert!(!f.backend.media("b.mp3").borrow().playing);

        f.backend.advance(5.0);
        f.controller.pump_events();
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn progress_loop_stops_itself_when_playback_stops() {
        let mut f = loaded("a.mp3", None);
        f.controller.play();
        f.controller.on_animation_frame();
        assert!(f.controller.progress_pending());

        f.controller.pause();
        f.controller.on_animation_frame();
        assert!(!f.controller.progress_pending());
    }

    #[test]
    fn destroy_cancels_progress_polling() {
        let mut f = loaded("a.mp3", None);
        let (reports, _) = counter();
        let sink = reports.clone();
        f.controller.on_progress(move |_| sink.set(sink.get() + 1));
        f.controller.play();
        let media = f.backend.media("a.mp3");

        f.controller.destroy();
        f.controller.destroy();
        assert!(!f.controller.progress_pending());

        media.borrow_mut().playing = true;
        f.backend.advance(5.0);
        f.controller.pump_events();
        f.controller.on_animation_frame();

        assert_eq!(reports.get(), 0);
        assert_eq!(f.controller.state(), ControllerState::Destroyed);
        assert!(media.borrow().unloaded);
        assert!(f.platform.graph.borrow().connected.is_empty());
    }

    #[test]
    fn narration_only_playback_is_valid() {
        let mut f = loaded("a.mp3", None);
        let errors = Rc::new(Cell::new(0));
        let sink = errors.clone();
        f.controller.on_error(move |_| sink.set(sink.get() + 1));

        f.controller.play();
        f.controller.set_volume(TrackRole::Background, 0.2);
        f.controller.toggle_mute();
        f.controller.toggle_mute();

        assert!(f.controller.is_playing());
        assert!(!f.controller.has_track(TrackRole::Background));
        assert_eq!(errors.get(), 0);
    }

    #[test]
    fn load_failures_are_reported_by_role() {
        let mut f = fixture();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        f.controller.on_error(move |e| sink.borrow_mut().push(e.clone()));

        f.controller.load_narration("a.mp3");
        f.controller.load_background("missing.mp3");
        f.backend.fail_load("missing.mp3", "not found");
        f.backend.finish_load("a.mp3", 60.0);
        f.controller.pump_events();

        let errors = errors.borrow();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].role, TrackRole::Background);
        assert!(!errors[0].is_fatal());
        assert_eq!(f.controller.state(), ControllerState::Ready);
        assert!(!f.controller.has_track(TrackRole::Background));
    }

    #[test]
    fn narration_failure_is_fatal() {
        let mut f = fixture();
        let fatal = Rc::new(Cell::new(false));
        let sink = fatal.clone();
        f.controller.on_error(move |e| sink.set(e.is_fatal()));

        f.controller.load_narration("bad.mp3");
        f.backend.fail_load("bad.mp3", "decode error");
        f.controller.pump_events();

        assert!(fatal.get());
        assert_eq!(f.controller.state(), ControllerState::Empty);
    }

    #[test]
    fn stale_callbacks_from_superseded_loads_are_ignored() {
        let mut f = fixture();
        let (readies, on_ready) = counter();
        f.controller.on_ready(on_ready);

        f.controller.load_narration("x.mp3");
        f.controller.load_narration("y.mp3");
        f.backend.finish_load("x.mp3", 10.0);
        f.backend.emit("x.mp3", MediaEventKind::Ended);
        f.controller.pump_events();

        assert_eq!(readies.get(), 0);
        assert_eq!(f.controller.state(), ControllerState::Loading);
        assert!(f.platform.graph.borrow().connected.is_empty());

        f.backend.finish_load("y.mp3", 20.0);
        f.controller.pump_events();

        assert_eq!(readies.get(), 1);
        assert_eq!(f.controller.track_url(TrackRole::Narration), Some("y.mp3"));
        let bound = f.backend.media("y.mp3").borrow().id;
        assert_eq!(f.controller.tap.borrow().bound_track(), Some(bound));
    }

    #[test]
    fn play_before_load_starts_once_loaded() {
        let mut f = fixture();
        let (plays, on_play) = counter();
        f.controller.on_play(on_play);

        f.controller.load_narration("a.mp3");
        f.controller.play();
        assert_eq!(plays.get(), 0);
        assert!(!f.controller.is_playing());

        f.backend.finish_load("a.mp3", 60.0);
        f.controller.pump_events();

        assert_eq!(f.controller.state(), ControllerState::Playing);
        assert_eq!(plays.get(), 1);
        assert!(f.controller.progress_pending());
    }

    #[test]
    fn listeners_all_fire_in_order() {
        let mut f = loaded("a.mp3", None);
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            let order = order.clone();
            f.controller.on_play(move || order.borrow_mut().push(tag));
        }

        f.controller.play();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn frequency_data_comes_from_the_tap() {
        let f = loaded("a.mp3", None);
        f.platform.graph.borrow_mut().level = 9;

        let mut frame = Vec::new();
        assert!(f.controller.frequency_data(&mut frame));
        assert_eq!(frame.len(), 128);
        assert!(frame.iter().all(|&b| b == 9));
    }
}
