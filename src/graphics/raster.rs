use glam::Vec2;

use super::canvas::{Canvas, Paint, Path, Point};
use super::color::Rgba;

/// Software [`Canvas`] rendering into a straight-alpha RGBA8 buffer, ready
/// to upload as a texture.
pub struct RasterCanvas {
    width: u32,
    height: u32,
    scale: f32,
    pixels: Vec<u8>,
    path: Path,
    alpha: f32,
    line_width: f32,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            scale: 1.0,
            pixels: vec![0; (width * height * 4) as usize],
            path: Path::new(),
            alpha: 1.0,
            line_width: 1.0,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }

    fn fill_polygons(&mut self, polygons: &[Vec<Vec2>], paint: &Paint) {
        let mut edges = Vec::new();
        let (mut min_y, mut max_y) = (f32::MAX, f32::MIN);
        for polygon in polygons.iter().filter(|p| p.len() >= 3) {
            for (i, &a) in polygon.iter().enumerate() {
                let b = polygon[(i + 1) % polygon.len()];
                if a.y != b.y {
                    edges.push((a, b));
                }
                min_y = min_y.min(a.y);
                max_y = max_y.max(a.y);
            }
        }
        if edges.is_empty() {
            return;
        }

        let first_row = (min_y - 0.5).ceil().max(0.0) as u32;
        let last_row = ((max_y - 0.5).ceil().max(0.0) as u32).min(self.height);
        let mut crossings: Vec<(f32, i32)> = Vec::new();

        for row in first_row..last_row {
            let cy = row as f32 + 0.5;
            crossings.clear();
            for &(a, b) in &edges {
                let (top, bottom) = if a.y < b.y { (a, b) } else { (b, a) };
                if top.y <= cy && bottom.y > cy {
                    let x = top.x + (cy - top.y) / (bottom.y - top.y) * (bottom.x - top.x);
                    crossings.push((x, if b.y > a.y { 1 } else { -1 }));
                }
            }
            crossings.sort_by(|l, r| l.0.total_cmp(&r.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                if winding == 0 {
                    continue;
                }
                let start = (pair[0].0 - 0.5).ceil().max(0.0) as u32;
                let end = ((pair[1].0 - 0.5).ceil().max(0.0) as u32).min(self.width);
                for x in start..end {
                    let logical = Vec2::new(x as f32 + 0.5, cy) / self.scale;
                    self.blend(x, row, paint.color_at(logical));
                }
            }
        }
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba) {
        let src_a = (color.a * self.alpha).clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let dst_a = self.pixels[i + 3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);

        let mix = |src: u8, dst: u8| {
            let c = (src as f32 * src_a + dst as f32 * dst_a * (1.0 - src_a)) / out_a;
            c.round().clamp(0.0, 255.0) as u8
        };
        self.pixels[i] = mix(color.r, self.pixels[i]);
        self.pixels[i + 1] = mix(color.g, self.pixels[i + 1]);
        self.pixels[i + 2] = mix(color.b, self.pixels[i + 2]);
        self.pixels[i + 3] = (out_a * 255.0).round() as u8;
    }

    fn physical(&self, points: &[Point]) -> Vec<Vec2> {
        points.iter().map(|&p| p * self.scale).collect()
    }
}

impl Canvas for RasterCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.pixels = vec![0; (self.width * self.height * 4) as usize];
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn clear(&mut self) {
        self.pixels.fill(0);
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn move_to(&mut self, p: Point) {
        self.path.move_to(p);
    }

    fn line_to(&mut self, p: Point) {
        self.path.line_to(p);
    }

    fn quadratic_curve_to(&mut self, control: Point, to: Point) {
        self.path.quadratic_curve_to(control, to);
    }

    fn arc(&mut self, center: Point, radius: f32, start: f32, end: f32) {
        self.path.arc(center, radius, start, end);
    }

    fn close_path(&mut self) {
        self.path.close();
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    fn set_line_width(&mut self, width: f32) {
        if width.is_finite() && width > 0.0 {
            self.line_width = width;
        }
    }

    fn fill(&mut self, paint: &Paint) {
        let polygons: Vec<Vec<Vec2>> = self
            .path
            .subpaths()
            .iter()
            .map(|sub| self.physical(&sub.points))
            .collect();
        self.fill_polygons(&polygons, paint);
    }

    /// Each segment becomes a quad; all quads share one winding direction so
    /// overlapping joints are painted once.
    fn stroke(&mut self, paint: &Paint) {
        let half = self.line_width * self.scale / 2.0;
        let mut quads = Vec::new();

        for sub in self.path.subpaths() {
            let points = self.physical(&sub.points);
            let mut segments: Vec<(Vec2, Vec2)> = points.windows(2).map(|w| (w[0], w[1])).collect();
            if sub.closed && points.len() > 2 {
                segments.push((points[points.len() - 1], points[0]));
            }

            for (a, b) in segments {
                let direction = b - a;
                if direction.length_squared() == 0.0 {
                    continue;
                }
                let normal = direction.normalize().perp() * half;
                // perp() turns counter-clockwise, so this order is consistent.
                quads.push(vec![a - normal, b - normal, b + normal, a + normal]);
            }
        }
        self.fill_polygons(&quads, paint);
    }
}
