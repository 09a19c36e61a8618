use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use rodio::source::SeekError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::BufReader;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use super::{
    AnalyserOptions, AudioContext, AudioPlatform, ContextState, FrequencyAnalyser, MediaBackend,
    MediaEvent, MediaEventKind, MediaNode, MediaTrack, SampleListener, SourceNode, TapPoint,
    TrackId, TrackRequest,
};
use crate::error::GraphError;

type FileDecoder = Decoder<BufReader<File>>;

/// Mono samples are handed to the tap in chunks of this many.
const TAP_CHUNK: usize = 128;

fn local_path(url: &str) -> &str {
    url.strip_prefix("file://").unwrap_or(url)
}

fn decode(url: &str) -> Result<FileDecoder> {
    let file = BufReader::new(File::open(local_path(url))?);
    Ok(Decoder::new(file)?)
}

struct LoadResult {
    track: TrackId,
    decoded: Result<FileDecoder, String>,
}

struct TrackSlot {
    url: String,
    volume: f32,
    looping: bool,
    wants_play: bool,
    sink: Option<Sink>,
    consumed: Arc<AtomicU64>,
    samples_per_second: f64,
    duration: Option<f64>,
    tap: Arc<TapPoint>,
    end_reported: bool,
    unloaded: bool,
}

impl TrackSlot {
    fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .map_or(false, |sink| !sink.is_paused() && !sink.empty())
    }

    fn position(&self) -> f64 {
        if self.samples_per_second <= 0.0 {
            return 0.0;
        }
        let seconds = self.consumed.load(Ordering::Relaxed) as f64 / self.samples_per_second;
        match self.duration {
            Some(duration) if !self.looping => seconds.min(duration),
            _ => seconds,
        }
    }
}

/// Media layer on top of rodio: one [`Sink`] per track, decoding on a loader
/// thread per request.
pub struct RodioBackend {
    #[allow(dead_code)]
    stream: OutputStream,
    stream_handle: OutputStreamHandle,
    next_id: u64,
    slots: HashMap<TrackId, Weak<RefCell<TrackSlot>>>,
    loaded_tx: Sender<LoadResult>,
    loaded_rx: Receiver<LoadResult>,
}

impl RodioBackend {
    pub fn new() -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()?;
        let (loaded_tx, loaded_rx) = unbounded();
        info!("Audio output stream opened");

        Ok(Self {
            stream,
            stream_handle,
            next_id: 0,
            slots: HashMap::new(),
            loaded_tx,
            loaded_rx,
        })
    }

    fn spawn_loader(&self, track: TrackId, url: String) -> Result<(), String> {
        let tx = self.loaded_tx.clone();
        thread::Builder::new()
            .name(format!("track-loader-{}", track.0))
            .spawn(move || {
                let decoded = decode(&url).map_err(|e| e.to_string());
                // The backend may be gone already; nothing to report to then.
                let _ = tx.send(LoadResult { track, decoded });
            })
            .map(|_| ())
            .map_err(|e| format!("failed to start loader thread: {}", e))
    }

    fn finish_load(&self, slot: &mut TrackSlot, track: TrackId, decoder: FileDecoder) -> Result<bool> {
        let sink = Sink::try_new(&self.stream_handle)?;
        sink.pause();
        sink.set_volume(slot.volume);

        let channels = decoder.channels().max(1);
        slot.samples_per_second = decoder.sample_rate() as f64 * channels as f64;
        slot.duration = decoder.total_duration().map(|d| d.as_secs_f64());
        slot.consumed.store(0, Ordering::Relaxed);

        if slot.looping {
            sink.append(TappedSource::new(
                decoder.repeat_infinite(),
                slot.tap.clone(),
                slot.consumed.clone(),
            ));
        } else {
            sink.append(TappedSource::new(decoder, slot.tap.clone(), slot.consumed.clone()));
        }

        info!(
            "Track {} ready: '{}' ({})",
            track,
            slot.url,
            slot.duration
                .map(|d| format!("{:.1}s", d))
                .unwrap_or_else(|| "unknown length".to_string())
        );

        let start = slot.wants_play;
        if start {
            sink.play();
        }
        slot.sink = Some(sink);
        Ok(start)
    }
}

impl MediaBackend for RodioBackend {
    type Track = RodioTrack;

    fn open(&mut self, request: TrackRequest) -> RodioTrack {
        self.next_id += 1;
        let id = TrackId(self.next_id);
        let slot = Rc::new(RefCell::new(TrackSlot {
            url: request.url.clone(),
            volume: request.volume,
            looping: request.looping,
            wants_play: false,
            sink: None,
            consumed: Arc::new(AtomicU64::new(0)),
            samples_per_second: 0.0,
            duration: None,
            tap: TapPoint::new(),
            end_reported: false,
            unloaded: false,
        }));
        self.slots.insert(id, Rc::downgrade(&slot));

        if let Err(reason) = self.spawn_loader(id, request.url) {
            warn!("{}", reason);
            let _ = self.loaded_tx.send(LoadResult {
                track: id,
                decoded: Err(reason),
            });
        }

        RodioTrack { id, slot }
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        let mut events = Vec::new();

        while let Ok(result) = self.loaded_rx.try_recv() {
            let Some(slot) = self.slots.get(&result.track).and_then(Weak::upgrade) else {
                debug!("Discarding load result for released track {}", result.track);
                continue;
            };
            let mut slot = slot.borrow_mut();
            if slot.unloaded {
                continue;
            }

            let decoder = match result.decoded {
                Ok(decoder) => decoder,
                Err(reason) => {
                    events.push(MediaEvent::new(result.track, MediaEventKind::LoadFailed(reason)));
                    continue;
                }
            };
            match self.finish_load(&mut slot, result.track, decoder) {
                Ok(started) => {
                    events.push(MediaEvent::new(result.track, MediaEventKind::Loaded));
                    if started {
                        events.push(MediaEvent::new(result.track, MediaEventKind::Played));
                    }
                }
                Err(e) => events.push(MediaEvent::new(
                    result.track,
                    MediaEventKind::LoadFailed(e.to_string()),
                )),
            }
        }

        self.slots.retain(|_, slot| slot.strong_count() > 0);
        for (&track, slot) in &self.slots {
            let Some(slot) = slot.upgrade() else {
                continue;
            };
            let mut slot = slot.borrow_mut();
            let drained = slot
                .sink
                .as_ref()
                .map_or(false, |sink| !sink.is_paused() && sink.empty());
            if drained && !slot.looping && !slot.end_reported {
                slot.end_reported = true;
                events.push(MediaEvent::new(track, MediaEventKind::Ended));
            }
        }

        events
    }
}

/// Handle on one track loaded through [`RodioBackend`].
pub struct RodioTrack {
    id: TrackId,
    slot: Rc<RefCell<TrackSlot>>,
}

impl MediaTrack for RodioTrack {
    fn id(&self) -> TrackId {
        self.id
    }

    fn node(&self) -> Option<MediaNode> {
        let slot = self.slot.borrow();
        slot.sink
            .as_ref()
            .map(|_| MediaNode::new(self.id, slot.tap.clone()))
    }

    fn play(&mut self) {
        let mut guard = self.slot.borrow_mut();
        let slot = &mut *guard;
        if slot.unloaded {
            return;
        }
        match &slot.sink {
            Some(sink) => sink.play(),
            None => slot.wants_play = true,
        }
    }

    fn pause(&mut self) {
        let mut slot = self.slot.borrow_mut();
        slot.wants_play = false;
        if let Some(sink) = &slot.sink {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        let mut slot = self.slot.borrow_mut();
        slot.wants_play = false;
        if let Some(sink) = &slot.sink {
            sink.stop();
        }
    }

    fn unload(&mut self) {
        let mut slot = self.slot.borrow_mut();
        slot.unloaded = true;
        slot.tap.detach();
        slot.sink = None;
    }

    fn is_playing(&self) -> bool {
        self.slot.borrow().is_playing()
    }

    fn set_volume(&mut self, volume: f32) {
        let mut slot = self.slot.borrow_mut();
        slot.volume = volume;
        if let Some(sink) = &slot.sink {
            sink.set_volume(volume);
        }
    }

    fn duration(&self) -> Option<f64> {
        self.slot.borrow().duration
    }

    fn position(&self) -> f64 {
        self.slot.borrow().position()
    }

    fn seek(&mut self, seconds: f64) {
        let slot = self.slot.borrow();
        let Some(sink) = &slot.sink else {
            return;
        };
        if let Err(e) = sink.try_seek(Duration::from_secs_f64(seconds.max(0.0))) {
            warn!("Seek on track {} failed: {}", self.id, e);
        }
    }
}

/// Passes samples through unchanged while counting them and copying a mono
/// mixdown to a [`TapPoint`].
pub struct TappedSource<S> {
    inner: S,
    tap: Arc<TapPoint>,
    consumed: Arc<AtomicU64>,
    channel: u16,
    mix: f32,
    chunk: Vec<f32>,
}

impl<S> TappedSource<S>
where
    S: Source<Item = i16>,
{
    pub fn new(inner: S, tap: Arc<TapPoint>, consumed: Arc<AtomicU64>) -> Self {
        Self {
            inner,
            tap,
            consumed,
            channel: 0,
            mix: 0.0,
            chunk: Vec::with_capacity(TAP_CHUNK),
        }
    }
}

impl<S> Iterator for TappedSource<S>
where
    S: Source<Item = i16>,
{
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        let sample = self.inner.next()?;
        self.consumed.fetch_add(1, Ordering::Relaxed);

        let channels = self.inner.channels().max(1);
        self.mix += sample as f32 / 32768.0;
        self.channel += 1;
        if self.channel >= channels {
            self.chunk.push(self.mix / channels as f32);
            self.mix = 0.0;
            self.channel = 0;
            if self.chunk.len() >= TAP_CHUNK {
                self.tap.forward(&self.chunk);
                self.chunk.clear();
            }
        }
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> Source for TappedSource<S>
where
    S: Source<Item = i16>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.inner.try_seek(pos)?;
        let per_second = self.inner.sample_rate() as f64 * self.inner.channels().max(1) as f64;
        self.consumed
            .store((pos.as_secs_f64() * per_second) as u64, Ordering::Relaxed);
        self.channel = 0;
        self.mix = 0.0;
        self.chunk.clear();
        Ok(())
    }
}

/// Rolling window of the most recent tapped samples.
struct SampleWindow {
    running: AtomicBool,
    capacity: usize,
    samples: Mutex<VecDeque<f32>>,
}

impl SampleWindow {
    fn new(capacity: usize) -> Self {
        Self {
            running: AtomicBool::new(false),
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn copy_into(&self, out: &mut Vec<f32>) {
        let samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        out.clear();
        out.extend(samples.iter().copied());
    }

    fn clear(&self) {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl SampleListener for SampleWindow {
    fn push_samples(&self, samples: &[f32]) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        let mut window = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        window.extend(samples.iter().copied());
        let excess = window.len().saturating_sub(self.capacity);
        window.drain(..excess);
    }
}

/// Audio graph for rodio tracks: analyses whatever the bound track's
/// [`TappedSource`] forwards.
pub struct RodioPlatform;

impl AudioPlatform for RodioPlatform {
    fn create_context(&self) -> Result<Box<dyn AudioContext>, GraphError> {
        Ok(Box::new(RodioContext::new()))
    }
}

pub struct RodioContext {
    state: ContextState,
    window: Arc<SampleWindow>,
    analyser: Option<FrequencyAnalyser>,
    sources: HashMap<SourceNode, Arc<TapPoint>>,
    connected: Option<SourceNode>,
    next_source: u64,
    scratch: Vec<f32>,
}

impl RodioContext {
    fn new() -> Self {
        Self {
            state: ContextState::Suspended,
            window: Arc::new(SampleWindow::new(AnalyserOptions::default().fft_size)),
            analyser: None,
            sources: HashMap::new(),
            connected: None,
            next_source: 0,
            scratch: Vec::new(),
        }
    }
}

impl AudioContext for RodioContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) {
        if self.state == ContextState::Suspended {
            self.state = ContextState::Running;
            self.window.running.store(true, Ordering::Release);
            info!("Audio context running");
        }
    }

    fn create_analyser(&mut self, options: AnalyserOptions) -> Result<(), GraphError> {
        let analyser = FrequencyAnalyser::new(options);
        let window = SampleWindow::new(analyser.options().fft_size);
        window
            .running
            .store(self.state == ContextState::Running, Ordering::Release);
        self.window = Arc::new(window);
        self.analyser = Some(analyser);
        Ok(())
    }

    fn create_media_source(&mut self, node: &MediaNode) -> Result<SourceNode, GraphError> {
        if !node.tap.claim() {
            return Err(GraphError::SourceAlreadyCreated);
        }
        self.next_source += 1;
        let source = SourceNode(self.next_source);
        self.sources.insert(source, node.tap.clone());
        Ok(source)
    }

    fn connect(&mut self, source: SourceNode) -> Result<(), GraphError> {
        if self.analyser.is_none() {
            return Err(GraphError::NotConnected);
        }
        let tap = self
            .sources
            .get(&source)
            .ok_or_else(|| GraphError::Connection(format!("unknown source node {}", source.0)))?;
        let listener: Arc<dyn SampleListener> = self.window.clone();
        tap.attach(listener);
        self.connected = Some(source);
        Ok(())
    }

    fn disconnect(&mut self, source: SourceNode) {
        if let Some(tap) = self.sources.get(&source) {
            tap.detach();
        }
        if self.connected == Some(source) {
            self.connected = None;
            self.window.clear();
            if let Some(analyser) = self.analyser.as_mut() {
                analyser.reset();
            }
        }
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        let Some(analyser) = self.analyser.as_mut() else {
            out.fill(0);
            return;
        };
        self.window.copy_into(&mut self.scratch);
        analyser.byte_frequency_data(&self.scratch, out);
    }

    fn close(&mut self) {
        for (_, tap) in self.sources.drain() {
            tap.release_claim();
        }
        self.connected = None;
        self.analyser = None;
        self.window.running.store(false, Ordering::Release);
        self.window.clear();
        self.state = ContextState::Closed;
        debug!("Audio context closed");
    }
}
