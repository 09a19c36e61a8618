use criterion::{black_box, criterion_group, criterion_main, Criterion};

use serene_audio::graphics::{
    FrequencySource, RasterCanvas, VisualStyle, Visualizer, VisualizerConfig,
};

struct Sweep(Vec<u8>);

impl FrequencySource for Sweep {
    fn fill_frequency_data(&mut self, out: &mut Vec<u8>) -> bool {
        out.clear();
        out.extend_from_slice(&self.0);
        true
    }
}

fn render_styles(c: &mut Criterion) {
    let mut source = Sweep((0..128).map(|i| (i * 2) as u8).collect());

    for style in [VisualStyle::Waveform, VisualStyle::Radial, VisualStyle::Particles] {
        let config = VisualizerConfig {
            style,
            ..VisualizerConfig::default()
        };
        let mut visualizer = Visualizer::with_seed(config, 7);
        let mut canvas = RasterCanvas::new(1, 1);
        visualizer.resize(&mut canvas, 480.0, 270.0, 1.0);

        c.bench_function(&format!("render_{}", style.name()), |b| {
            b.iter(|| visualizer.render(&mut canvas, &mut source, true, black_box(1.0)))
        });
    }
}

fn render_placeholder(c: &mut Criterion) {
    let mut source = Sweep(Vec::new());
    let mut visualizer = Visualizer::with_seed(VisualizerConfig::default(), 7);
    let mut canvas = RasterCanvas::new(1, 1);
    visualizer.resize(&mut canvas, 480.0, 270.0, 1.0);

    c.bench_function("render_placeholder", |b| {
        b.iter(|| visualizer.render(&mut canvas, &mut source, false, black_box(1.0)))
    });
}

criterion_group!(benches, render_styles, render_placeholder);
criterion_main!(benches);
