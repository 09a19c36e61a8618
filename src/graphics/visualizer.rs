use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::canvas::Canvas;
use super::color::Rgba;
use super::styles;
use crate::frame_loop::FrameLoop;

/// Bins in a synthetic frame, matching a 256-point transform.
pub const SYNTHETIC_BINS: usize = 128;

pub const DEFAULT_COLOR: &str = "rgba(255, 255, 255, 0.5)";

/// Config files go through [`VisualStyle::from_tag`], so any tag loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum VisualStyle {
    #[default]
    Waveform,
    Radial,
    Particles,
}

impl From<String> for VisualStyle {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl VisualStyle {
    /// Unknown tags draw as a waveform.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "wave" | "waveform" => VisualStyle::Waveform,
            "circle" | "radial" => VisualStyle::Radial,
            "particles" => VisualStyle::Particles,
            other => {
                debug!("Unknown visual style '{}', using waveform", other);
                VisualStyle::Waveform
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VisualStyle::Waveform => "waveform",
            VisualStyle::Radial => "radial",
            VisualStyle::Particles => "particles",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    pub style: VisualStyle,
    pub color: String,
    pub intensity: f32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            style: VisualStyle::Waveform,
            color: DEFAULT_COLOR.to_string(),
            intensity: 0.5,
        }
    }
}

/// Anything that can supply the current frequency frame.
pub trait FrequencySource {
    /// Fills `out` with the live frame. Returns `false`, leaving `out` empty,
    /// when no data is available.
    fn fill_frequency_data(&mut self, out: &mut Vec<u8>) -> bool;
}

/// Which path a frame was drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Placeholder,
    Synthetic,
    Live,
}

/// Canvas opacity while idle, low enough to read as "stopped" while keeping
/// the placeholder visible.
pub const IDLE_OPACITY: f32 = 0.35;

/// Seconds a full fade between idle and playing takes.
pub const FADE_SECONDS: f32 = 0.5;

/// Linear opacity fade applied when the canvas is presented.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasFade {
    opacity: f32,
}

impl Default for CanvasFade {
    fn default() -> Self {
        Self {
            opacity: IDLE_OPACITY,
        }
    }
}

impl CanvasFade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Moves toward full opacity while `playing`, toward [`IDLE_OPACITY`]
    /// otherwise, and returns the new opacity.
    pub fn update(&mut self, playing: bool, elapsed: f32) -> f32 {
        let target = if playing { 1.0 } else { IDLE_OPACITY };
        let step = if elapsed.is_finite() {
            elapsed.max(0.0) * (1.0 - IDLE_OPACITY) / FADE_SECONDS
        } else {
            0.0
        };
        self.opacity = if self.opacity < target {
            (self.opacity + step).min(target)
        } else {
            (self.opacity - step).max(target)
        };
        self.opacity
    }
}

/// Render loop drawing the current frequency frame onto a [`Canvas`].
///
/// The loop redraws the whole canvas on every delivered frame while mounted.
/// Config changes and resizes cancel and resubscribe it.
pub struct Visualizer {
    config: VisualizerConfig,
    base: Rgba,
    width: f32,
    height: f32,
    frames: FrameLoop,
    mounted: bool,
    data: Vec<u8>,
    rng: StdRng,
}

impl Visualizer {
    pub fn new(config: VisualizerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic synthetic frames, for tests and benchmarks.
    pub fn with_seed(config: VisualizerConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: VisualizerConfig, rng: StdRng) -> Self {
        let config = Self::sanitize(config);
        Self {
            base: Self::base_color(&config.color),
            config,
            width: 0.0,
            height: 0.0,
            frames: FrameLoop::new(),
            mounted: false,
            data: Vec::with_capacity(SYNTHETIC_BINS),
            rng,
        }
    }

    fn sanitize(mut config: VisualizerConfig) -> VisualizerConfig {
        config.intensity = if config.intensity.is_finite() {
            config.intensity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        config
    }

    fn base_color(color: &str) -> Rgba {
        match Rgba::parse(color) {
            Some((rgba, _)) => rgba,
            None => {
                warn!("Unrecognized color '{}', using {}", color, DEFAULT_COLOR);
                Rgba::new(255, 255, 255, 0.5)
            }
        }
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    pub fn base(&self) -> Rgba {
        self.base
    }

    pub fn logical_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn frame_pending(&self) -> bool {
        self.frames.is_pending()
    }

    /// The frame drawn last, live or synthetic.
    pub fn frame(&self) -> &[u8] {
        &self.data
    }

    /// Starts the render loop.
    pub fn mount(&mut self) {
        self.mounted = true;
        self.frames.schedule();
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
        self.frames.cancel();
    }

    fn resubscribe(&mut self) {
        if self.mounted {
            self.frames.cancel();
            self.frames.schedule();
        }
    }

    pub fn set_config(&mut self, config: VisualizerConfig) {
        let config = Self::sanitize(config);
        if config == self.config {
            return;
        }
        if config.color != self.config.color {
            self.base = Self::base_color(&config.color);
        }
        debug!("Visualizer switching to {} style", config.style.name());
        self.config = config;
        self.resubscribe();
    }

    pub fn set_style(&mut self, style: VisualStyle) {
        let config = VisualizerConfig {
            style,
            ..self.config.clone()
        };
        self.set_config(config);
    }

    /// Matches the canvas' physical pixels to a `width` x `height` logical
    /// viewport at `scale` device pixels per logical pixel.
    pub fn resize(&mut self, canvas: &mut dyn Canvas, width: f32, height: f32, scale: f32) {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let physical = |logical: f32| ((logical.max(0.0) * scale).round() as u32).max(1);

        canvas.resize(physical(width), physical(height));
        canvas.set_scale(scale);
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.resubscribe();
    }

    /// Delivers one animation frame. Draws only if a frame was requested and
    /// returns how it drew; requests the next frame while mounted.
    pub fn on_animation_frame(
        &mut self,
        canvas: &mut dyn Canvas,
        source: &mut dyn FrequencySource,
        playing: bool,
        time: f64,
    ) -> Option<RenderMode> {
        self.frames.take()?;
        let mode = self.render(canvas, source, playing, time);
        if self.mounted {
            self.frames.schedule();
        }
        Some(mode)
    }

    /// Clears and redraws the whole canvas once.
    pub fn render(
        &mut self,
        canvas: &mut dyn Canvas,
        source: &mut dyn FrequencySource,
        playing: bool,
        time: f64,
    ) -> RenderMode {
        canvas.set_global_alpha(1.0);
        canvas.clear();

        let (width, height) = (self.width, self.height);
        if !playing {
            styles::draw_placeholder(canvas, width, height, self.base, time);
            return RenderMode::Placeholder;
        }

        let mode = if source.fill_frequency_data(&mut self.data) && !self.data.is_empty() {
            RenderMode::Live
        } else {
            self.data.clear();
            let rng = &mut self.rng;
            self.data
                .extend((0..SYNTHETIC_BINS).map(|_| rng.gen_range(0..100u8)));
            RenderMode::Synthetic
        };

        let intensity = self.config.intensity;
        match self.config.style {
            VisualStyle::Waveform => {
                styles::draw_waveform(canvas, &self.data, width, height, self.base, intensity)
            }
            VisualStyle::Radial => {
                styles::draw_radial(canvas, &self.data, width, height, self.base, intensity)
            }
            VisualStyle::Particles => {
                styles::draw_particles(canvas, &self.data, width, height, self.base, intensity)
            }
        }
        mode
    }
}
