//! The drawing routines behind each visual style.
//!
//! Every routine takes the logical canvas size, the frame to draw and the
//! base color; lighter and darker shades are derived from the base with
//! [`Rgba::adjusted`].

use std::f32::consts::TAU;

use super::canvas::{Canvas, ColorStop, Paint, Point};
use super::color::Rgba;

pub const PARTICLE_COUNT: usize = 50;

/// Slow pulsing disc shown while nothing is playing.
pub fn draw_placeholder(canvas: &mut dyn Canvas, width: f32, height: f32, base: Rgba, time: f64) {
    let center = Point::new(width / 2.0, height / 2.0);
    let max_radius = width.min(height) / 6.0;
    let radius = max_radius * (0.8 + 0.2 * (time * 2.0).sin() as f32);

    canvas.begin_path();
    canvas.arc(center, radius, 0.0, TAU);
    canvas.set_global_alpha(0.2);
    canvas.fill(&Paint::Solid(base.adjusted(-30.0)));
}

/// Filled silhouette of the spectrum with an outline.
pub fn draw_waveform(
    canvas: &mut dyn Canvas,
    data: &[u8],
    width: f32,
    height: f32,
    base: Rgba,
    intensity: f32,
) {
    if data.is_empty() {
        return;
    }
    let bar_width = width / data.len() as f32;
    let top = |i: usize| height - (data[i] as f32 / 255.0) * height * intensity;

    let gradient = Paint::LinearGradient {
        start: Point::new(0.0, 0.0),
        end: Point::new(width, 0.0),
        stops: vec![
            ColorStop::new(0.0, base),
            ColorStop::new(0.5, base.adjusted(20.0)),
            ColorStop::new(1.0, base.adjusted(-20.0)),
        ],
    };

    canvas.begin_path();
    canvas.move_to(Point::new(0.0, top(0)));
    for i in 1..data.len() {
        let x = i as f32 * bar_width;
        let prev_x = (i - 1) as f32 * bar_width;
        let control = Point::new((prev_x + x) / 2.0, top(i - 1));
        canvas.quadratic_curve_to(control, Point::new(x, top(i)));
    }
    canvas.line_to(Point::new(width, height));
    canvas.line_to(Point::new(0.0, height));
    canvas.close_path();

    canvas.set_global_alpha(0.7);
    canvas.fill(&gradient);

    canvas.set_line_width(2.0);
    canvas.set_global_alpha(0.8);
    canvas.stroke(&Paint::Solid(base.adjusted(50.0)));
}

/// One dot per bin around a circle, each joined to the center by a spoke.
pub fn draw_radial(
    canvas: &mut dyn Canvas,
    data: &[u8],
    width: f32,
    height: f32,
    base: Rgba,
    intensity: f32,
) {
    let center = Point::new(width / 2.0, height / 2.0);
    let radius = width.min(height) / 4.0;

    if !data.is_empty() {
        let angle_step = TAU / data.len() as f32;
        for (i, &byte) in data.iter().enumerate() {
            let value = byte as f32 / 255.0;
            let reach = radius + value * radius * intensity;
            let angle = i as f32 * angle_step;
            let tip = center + Point::new(angle.cos(), angle.sin()) * reach;

            // The dot keeps whatever alpha the previous spoke left behind.
            canvas.begin_path();
            canvas.arc(tip, 2.0 + value * 5.0 * intensity, 0.0, TAU);
            canvas.fill(&Paint::Solid(base.adjusted(value * 30.0)));

            canvas.begin_path();
            canvas.move_to(center);
            canvas.line_to(tip);
            canvas.set_global_alpha(0.3 + value * 0.3);
            canvas.set_line_width(1.0 + value * 2.0);
            canvas.stroke(&Paint::Solid(base.adjusted(value * 20.0)));
        }
    }

    let glow = Paint::RadialGradient {
        center,
        inner_radius: radius * 0.5,
        outer_radius: radius * 2.0,
        stops: vec![
            ColorStop::new(0.0, base.adjusted(50.0)),
            ColorStop::new(0.5, base),
            ColorStop::new(1.0, Rgba::TRANSPARENT),
        ],
    };
    canvas.begin_path();
    canvas.arc(center, radius * 0.3, 0.0, TAU);
    canvas.set_global_alpha(0.7);
    canvas.fill(&glow);
}

/// Ring of points whose radius, size and opacity follow the mean level.
pub fn draw_particles(
    canvas: &mut dyn Canvas,
    data: &[u8],
    width: f32,
    height: f32,
    base: Rgba,
    intensity: f32,
) {
    let mean = mean_level(data);
    let center = Point::new(width / 2.0, height / 2.0);
    let distance = mean * 100.0 * intensity + 50.0;
    let size = 2.0 + mean * 8.0 * intensity;
    let at = |i: usize| {
        let angle = i as f32 / PARTICLE_COUNT as f32 * TAU;
        center + Point::new(angle.cos(), angle.sin()) * distance
    };

    for i in 0..PARTICLE_COUNT {
        let point = at(i);

        canvas.begin_path();
        canvas.arc(point, size, 0.0, TAU);
        canvas.set_global_alpha(0.5 + mean * 0.5);
        canvas.fill(&Paint::Solid(base.adjusted((i % 30) as f32)));

        if i > 0 {
            canvas.begin_path();
            canvas.move_to(at(i - 1));
            canvas.line_to(point);
            canvas.set_global_alpha(0.2 + mean * 0.3);
            canvas.set_line_width(1.0 + mean * 2.0 * intensity);
            canvas.stroke(&Paint::Solid(base.adjusted(-20.0)));
        }
    }
}

/// Mean bin value scaled to [0, 1]; 0 for an empty frame.
pub fn mean_level(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: u32 = data.iter().map(|&b| b as u32).sum();
    sum as f32 / data.len() as f32 / 255.0
}
