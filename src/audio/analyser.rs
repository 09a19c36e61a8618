use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::AnalyserOptions;

/// Fixed-size frequency analyser producing byte magnitudes.
///
/// Mirrors a browser analyser node: Blackman window, forward FFT, magnitudes
/// smoothed against the previous frame, then the decibel range
/// `[min_decibels, max_decibels]` mapped linearly onto 0-255.
pub struct FrequencyAnalyser {
    options: AnalyserOptions,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl FrequencyAnalyser {
    pub fn new(options: AnalyserOptions) -> Self {
        // Power of two, at least 32.
        let fft_size = options.fft_size.max(32).next_power_of_two();
        let options = AnalyserOptions {
            fft_size,
            smoothing: options.smoothing.clamp(0.0, 1.0),
            ..options
        };

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            options,
            fft,
            window: Self::blackman_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    fn blackman_window(size: usize) -> Vec<f32> {
        let alpha = 0.16;
        let a0 = 0.5 * (1.0 - alpha);
        let a1 = 0.5;
        let a2 = 0.5 * alpha;
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
            })
            .collect()
    }

    pub fn options(&self) -> AnalyserOptions {
        self.options
    }

    pub fn bin_count(&self) -> usize {
        self.options.bin_count()
    }

    /// Analyses the most recent `fft_size` samples (zero-padded at the front
    /// when fewer are available) and writes up to `bin_count` bytes to `out`.
    pub fn byte_frequency_data(&mut self, samples: &[f32], out: &mut [u8]) {
        let fft_size = self.options.fft_size;
        let recent = &samples[samples.len().saturating_sub(fft_size)..];
        let offset = fft_size - recent.len();

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < offset { 0.0 } else { recent[i - offset] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let tau = self.options.smoothing;
        let scale = 1.0 / fft_size as f32;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.buffer) {
            let magnitude = bin.norm() * scale;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
        }

        let min_db = self.options.min_decibels;
        let range = (self.options.max_decibels - min_db).max(f32::EPSILON);
        for (byte, &magnitude) in out.iter_mut().zip(&self.smoothed) {
            *byte = if magnitude > 0.0 {
                let db = 20.0 * magnitude.log10();
                (255.0 * (db - min_db) / range).clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }

    /// Forgets the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|m| *m = 0.0);
    }
}
