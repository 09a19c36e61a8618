//! Scripted stand-ins for the platform capabilities, used by unit tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::audio::{
    AnalyserOptions, AudioContext, AudioPlatform, ContextState, MediaBackend, MediaEvent,
    MediaEventKind, MediaNode, MediaTrack, SourceNode, TapPoint, TrackId, TrackRequest,
};
use crate::error::GraphError;
use crate::graphics::{Canvas, FrequencySource, Paint, Path, Point};

// Audio graph

#[derive(Debug)]
pub struct FakeGraph {
    pub available: bool,
    pub state: ContextState,
    pub contexts_created: usize,
    pub resumes: usize,
    pub closes: usize,
    pub sources_created: u64,
    pub connected: Vec<SourceNode>,
    pub analyser: Option<AnalyserOptions>,
    /// Value every bin reads as.
    pub level: u8,
    pub reads: usize,
}

impl Default for FakeGraph {
    fn default() -> Self {
        Self {
            available: true,
            state: ContextState::Suspended,
            contexts_created: 0,
            resumes: 0,
            closes: 0,
            sources_created: 0,
            connected: Vec::new(),
            analyser: None,
            level: 0,
            reads: 0,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakePlatform {
    pub graph: Rc<RefCell<FakeGraph>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        let platform = Self::default();
        platform.graph.borrow_mut().available = false;
        platform
    }
}

impl AudioPlatform for FakePlatform {
    fn create_context(&self) -> Result<Box<dyn AudioContext>, GraphError> {
        let mut graph = self.graph.borrow_mut();
        if !graph.available {
            return Err(GraphError::Unavailable("no audio device".into()));
        }
        graph.contexts_created += 1;
        graph.state = ContextState::Suspended;
        Ok(Box::new(FakeContext {
            graph: self.graph.clone(),
            taps: Vec::new(),
        }))
    }
}

pub struct FakeContext {
    graph: Rc<RefCell<FakeGraph>>,
    taps: Vec<Arc<TapPoint>>,
}

impl AudioContext for FakeContext {
    fn state(&self) -> ContextState {
        self.graph.borrow().state
    }

    fn resume(&mut self) {
        let mut graph = self.graph.borrow_mut();
        graph.resumes += 1;
        graph.state = ContextState::Running;
    }

    fn create_analyser(&mut self, options: AnalyserOptions) -> Result<(), GraphError> {
        self.graph.borrow_mut().analyser = Some(options);
        Ok(())
    }

    fn create_media_source(&mut self, node: &MediaNode) -> Result<SourceNode, GraphError> {
        if !node.tap.claim() {
            return Err(GraphError::SourceAlreadyCreated);
        }
        self.taps.push(node.tap.clone());
        let mut graph = self.graph.borrow_mut();
        graph.sources_created += 1;
        Ok(SourceNode(graph.sources_created))
    }

    fn connect(&mut self, source: SourceNode) -> Result<(), GraphError> {
        let mut graph = self.graph.borrow_mut();
        if graph.analyser.is_none() {
            return Err(GraphError::NotConnected);
        }
        if !graph.connected.contains(&source) {
            graph.connected.push(source);
        }
        Ok(())
    }

    fn disconnect(&mut self, source: SourceNode) {
        self.graph.borrow_mut().connected.retain(|s| *s != source);
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        let mut graph = self.graph.borrow_mut();
        graph.reads += 1;
        out.fill(graph.level);
    }

    fn close(&mut self) {
        for tap in self.taps.drain(..) {
            tap.release_claim();
        }
        let mut graph = self.graph.borrow_mut();
        graph.closes += 1;
        graph.connected.clear();
        graph.state = ContextState::Closed;
    }
}

// Media

pub struct FakeMedia {
    pub id: TrackId,
    pub url: String,
    pub volume: f32,
    pub looping: bool,
    pub loaded: bool,
    pub playing: bool,
    pub play_queued: bool,
    pub position: f64,
    pub duration: Option<f64>,
    pub stopped: bool,
    pub unloaded: bool,
    pub seeks: Vec<f64>,
    pub tap: Arc<TapPoint>,
}

#[derive(Default)]
struct FakeMediaLayer {
    next_id: u64,
    media: Vec<Rc<RefCell<FakeMedia>>>,
    events: Vec<MediaEvent>,
}

/// Media backend whose loads complete only when a test says so.
#[derive(Clone, Default)]
pub struct FakeBackend {
    layer: Rc<RefCell<FakeMediaLayer>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently opened track for `url`.
    pub fn media(&self, url: &str) -> Rc<RefCell<FakeMedia>> {
        self.layer
            .borrow()
            .media
            .iter()
            .rev()
            .find(|m| m.borrow().url == url)
            .cloned()
            .unwrap_or_else(|| panic!("no track opened for {url}"))
    }

    pub fn opened(&self) -> usize {
        self.layer.borrow().media.len()
    }

    pub fn emit(&self, url: &str, kind: MediaEventKind) {
        let id = self.media(url).borrow().id;
        self.layer.borrow_mut().events.push(MediaEvent::new(id, kind));
    }

    /// Completes the load of `url`. A play request made while loading starts
    /// playback now.
    pub fn finish_load(&self, url: &str, duration: f64) {
        let media = self.media(url);
        let mut media = media.borrow_mut();
        media.loaded = true;
        media.duration = Some(duration);

        let mut layer = self.layer.borrow_mut();
        layer.events.push(MediaEvent::new(media.id, MediaEventKind::Loaded));
        if media.play_queued && !media.unloaded {
            media.play_queued = false;
            media.playing = true;
            layer.events.push(MediaEvent::new(media.id, MediaEventKind::Played));
        }
    }

    pub fn fail_load(&self, url: &str, reason: &str) {
        self.emit(url, MediaEventKind::LoadFailed(reason.to_string()));
    }

    /// Moves every playing track forward. Looping tracks wrap; others stop
    /// at their duration and report the end.
    pub fn advance(&self, seconds: f64) {
        let mut layer = self.layer.borrow_mut();
        let mut ended = Vec::new();
        for media in &layer.media {
            let mut media = media.borrow_mut();
            if !media.playing {
                continue;
            }
            media.position += seconds;
            let Some(duration) = media.duration else {
                continue;
            };
            if media.looping {
                media.position %= duration;
            } else if media.position >= duration {
                media.position = duration;
                media.playing = false;
                ended.push(media.id);
            }
        }
        layer
            .events
            .extend(ended.into_iter().map(|id| MediaEvent::new(id, MediaEventKind::Ended)));
    }
}

impl MediaBackend for FakeBackend {
    type Track = FakeTrack;

    fn open(&mut self, request: TrackRequest) -> FakeTrack {
        let mut layer = self.layer.borrow_mut();
        layer.next_id += 1;
        let media = Rc::new(RefCell::new(FakeMedia {
            id: TrackId(layer.next_id),
            url: request.url,
            volume: request.volume,
            looping: request.looping,
            loaded: false,
            playing: false,
            play_queued: false,
            position: 0.0,
            duration: None,
            stopped: false,
            unloaded: false,
            seeks: Vec::new(),
            tap: TapPoint::new(),
        }));
        layer.media.push(media.clone());
        FakeTrack { media }
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        std::mem::take(&mut self.layer.borrow_mut().events)
    }
}

pub struct FakeTrack {
    media: Rc<RefCell<FakeMedia>>,
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> TrackId {
        self.media.borrow().id
    }

    fn node(&self) -> Option<MediaNode> {
        let media = self.media.borrow();
        media
            .loaded
            .then(|| MediaNode::new(media.id, media.tap.clone()))
    }

    fn play(&mut self) {
        let mut media = self.media.borrow_mut();
        if media.unloaded {
            return;
        }
        if media.loaded {
            media.playing = true;
        } else {
            media.play_queued = true;
        }
    }

    fn pause(&mut self) {
        let mut media = self.media.borrow_mut();
        media.playing = false;
        media.play_queued = false;
    }

    fn stop(&mut self) {
        let mut media = self.media.borrow_mut();
        media.playing = false;
        media.play_queued = false;
        media.position = 0.0;
        media.stopped = true;
    }

    fn unload(&mut self) {
        let mut media = self.media.borrow_mut();
        media.playing = false;
        media.loaded = false;
        media.unloaded = true;
    }

    fn is_playing(&self) -> bool {
        self.media.borrow().playing
    }

    fn set_volume(&mut self, volume: f32) {
        self.media.borrow_mut().volume = volume;
    }

    fn duration(&self) -> Option<f64> {
        let media = self.media.borrow();
        if media.loaded {
            media.duration
        } else {
            None
        }
    }

    fn position(&self) -> f64 {
        self.media.borrow().position
    }

    fn seek(&mut self, seconds: f64) {
        let mut media = self.media.borrow_mut();
        let end = media.duration.unwrap_or(0.0);
        media.position = seconds.clamp(0.0, end);
        media.seeks.push(seconds);
    }
}

// Drawing

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Resize(u32, u32),
    Scale(f32),
    Clear,
    BeginPath,
    MoveTo(Point),
    LineTo(Point),
    Quad(Point, Point),
    Arc { center: Point, radius: f32 },
    ClosePath,
    GlobalAlpha(f32),
    LineWidth(f32),
    Fill { paint: Paint, alpha: f32 },
    Stroke { paint: Paint, alpha: f32, width: f32 },
}

/// Canvas that records calls instead of drawing.
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    alpha: f32,
    line_width: f32,
    pub path: Path,
    pub ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: 1.0,
            line_width: 1.0,
            path: Path::new(),
            ops: Vec::new(),
        }
    }

    pub fn fills(&self) -> Vec<(Paint, f32)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Fill { paint, alpha } => Some((paint.clone(), *alpha)),
                _ => None,
            })
            .collect()
    }

    pub fn strokes(&self) -> Vec<(Paint, f32, f32)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Stroke { paint, alpha, width } => Some((paint.clone(), *alpha, *width)),
                _ => None,
            })
            .collect()
    }

    pub fn arcs(&self) -> Vec<(Point, f32)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Arc { center, radius } => Some((*center, *radius)),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.ops.push(DrawOp::Resize(width, height));
    }

    fn set_scale(&mut self, scale: f32) {
        self.ops.push(DrawOp::Scale(scale));
    }

    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn begin_path(&mut self) {
        self.path.clear();
        self.ops.push(DrawOp::BeginPath);
    }

    fn move_to(&mut self, p: Point) {
        self.path.move_to(p);
        self.ops.push(DrawOp::MoveTo(p));
    }

    fn line_to(&mut self, p: Point) {
        self.path.line_to(p);
        self.ops.push(DrawOp::LineTo(p));
    }

    fn quadratic_curve_to(&mut self, control: Point, to: Point) {
        self.path.quadratic_curve_to(control, to);
        self.ops.push(DrawOp::Quad(control, to));
    }

    fn arc(&mut self, center: Point, radius: f32, start: f32, end: f32) {
        self.path.arc(center, radius, start, end);
        self.ops.push(DrawOp::Arc { center, radius });
    }

    fn close_path(&mut self) {
        self.path.close();
        self.ops.push(DrawOp::ClosePath);
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
        self.ops.push(DrawOp::GlobalAlpha(alpha));
    }

    fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
        self.ops.push(DrawOp::LineWidth(width));
    }

    fn fill(&mut self, paint: &Paint) {
        self.ops.push(DrawOp::Fill {
            paint: paint.clone(),
            alpha: self.alpha,
        });
    }

    fn stroke(&mut self, paint: &Paint) {
        self.ops.push(DrawOp::Stroke {
            paint: paint.clone(),
            alpha: self.alpha,
            width: self.line_width,
        });
    }
}

/// Frequency source that counts how often it is read.
pub struct CountingSource {
    frame: Option<Vec<u8>>,
    pub reads: usize,
}

impl CountingSource {
    pub fn live(frame: Vec<u8>) -> Self {
        Self {
            frame: Some(frame),
            reads: 0,
        }
    }

    pub fn empty() -> Self {
        Self {
            frame: None,
            reads: 0,
        }
    }
}

impl FrequencySource for CountingSource {
    fn fill_frequency_data(&mut self, out: &mut Vec<u8>) -> bool {
        self.reads += 1;
        out.clear();
        match &self.frame {
            Some(frame) => {
                out.extend_from_slice(frame);
                true
            }
            None => false,
        }
    }
}
