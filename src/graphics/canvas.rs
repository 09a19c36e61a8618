use glam::Vec2;
use std::f32::consts::TAU;

use super::color::Rgba;

/// A point in logical (pre-scale) canvas coordinates.
pub type Point = Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba,
}

impl ColorStop {
    pub fn new(offset: f32, color: Rgba) -> Self {
        Self { offset, color }
    }
}

/// What a fill or stroke is painted with.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    LinearGradient {
        start: Point,
        end: Point,
        stops: Vec<ColorStop>,
    },
    /// Concentric radial gradient from `inner_radius` to `outer_radius`.
    RadialGradient {
        center: Point,
        inner_radius: f32,
        outer_radius: f32,
        stops: Vec<ColorStop>,
    },
}

impl Paint {
    /// Color at logical point `p`. Gradients pad with their end stops.
    pub fn color_at(&self, p: Point) -> Rgba {
        match self {
            Paint::Solid(color) => *color,
            Paint::LinearGradient { start, end, stops } => {
                let axis = *end - *start;
                let length = axis.length_squared();
                let t = if length > 0.0 {
                    (p - *start).dot(axis) / length
                } else {
                    0.0
                };
                sample_stops(stops, t)
            }
            Paint::RadialGradient {
                center,
                inner_radius,
                outer_radius,
                stops,
            } => {
                let span = outer_radius - inner_radius;
                let t = if span > 0.0 {
                    (p.distance(*center) - inner_radius) / span
                } else {
                    0.0
                };
                sample_stops(stops, t)
            }
        }
    }
}

fn sample_stops(stops: &[ColorStop], t: f32) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Rgba::TRANSPARENT;
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let local = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            return a.color.lerp(b.color, local);
        }
    }
    last.color
}

/// 2D drawing surface with an immediate-mode path API.
///
/// Coordinates are logical; `set_scale` maps them onto physical pixels so
/// that output stays sharp on high-density displays.
pub trait Canvas {
    /// Physical size in pixels.
    fn size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn set_scale(&mut self, scale: f32);

    /// Clears every pixel to transparent.
    fn clear(&mut self);

    fn begin_path(&mut self);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);
    fn quadratic_curve_to(&mut self, control: Point, to: Point);
    /// Clockwise arc from `start` to `end` radians.
    fn arc(&mut self, center: Point, radius: f32, start: f32, end: f32);
    fn close_path(&mut self);

    fn set_global_alpha(&mut self, alpha: f32);
    fn set_line_width(&mut self, width: f32);
    fn fill(&mut self, paint: &Paint);
    fn stroke(&mut self, paint: &Paint);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubPath {
    pub points: Vec<Point>,
    pub closed: bool,
}

/// Current path of a canvas, flattened to polylines as it is built.
#[derive(Debug, Clone, Default)]
pub struct Path {
    subpaths: Vec<SubPath>,
}

const CURVE_SEGMENTS: usize = 8;

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.subpaths.clear();
    }

    pub fn subpaths(&self) -> &[SubPath] {
        &self.subpaths
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.iter().all(|s| s.points.is_empty())
    }

    fn last_point(&self) -> Option<Point> {
        self.subpaths.last().and_then(|s| s.points.last().copied())
    }

    pub fn move_to(&mut self, p: Point) {
        self.subpaths.push(SubPath {
            points: vec![p],
            closed: false,
        });
    }

    pub fn line_to(&mut self, p: Point) {
        match self.subpaths.last_mut() {
            Some(sub) if !sub.closed => sub.points.push(p),
            _ => self.move_to(p),
        }
    }

    pub fn quadratic_curve_to(&mut self, control: Point, to: Point) {
        let Some(from) = self.last_point() else {
            self.move_to(to);
            return;
        };
        for i in 1..=CURVE_SEGMENTS {
            let t = i as f32 / CURVE_SEGMENTS as f32;
            let u = 1.0 - t;
            self.line_to(from * (u * u) + control * (2.0 * u * t) + to * (t * t));
        }
    }

    pub fn arc(&mut self, center: Point, radius: f32, start: f32, end: f32) {
        let sweep = (end - start).clamp(-TAU, TAU);
        let steps = ((radius.abs() * sweep.abs()) / 2.0).ceil().clamp(8.0, 128.0) as usize;
        let at = |angle: f32| center + Vec2::new(angle.cos(), angle.sin()) * radius;

        let first = at(start);
        match self.subpaths.last() {
            Some(sub) if !sub.closed && !sub.points.is_empty() => self.line_to(first),
            _ => self.move_to(first),
        }
        for i in 1..=steps {
            self.line_to(at(start + sweep * i as f32 / steps as f32));
        }
    }

    pub fn close(&mut self) {
        if let Some(sub) = self.subpaths.last_mut() {
            sub.closed = true;
        }
    }
}
