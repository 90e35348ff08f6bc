//! FFT band energy (rustfft)
//!
//! Produces a byte spectrum in the manner of a browser `AnalyserNode`:
//! Blackman window, magnitudes averaged over time, converted to decibels and
//! scaled into 0–255. Band energies are averages over that byte spectrum.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

/// Frequency band queried with [`Analyser::energy`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Band {
    Bass,
    LowMid,
    Mid,
    HighMid,
    Treble,
    /// Arbitrary range in Hz; the endpoints may be given in either order.
    Range(f32, f32),
}

impl Band {
    /// Frequency range in Hz, low end first.
    pub fn hz(self) -> (f32, f32) {
        let (a, b) = match self {
            Band::Bass => (20.0, 140.0),
            Band::LowMid => (140.0, 400.0),
            Band::Mid => (400.0, 2600.0),
            Band::HighMid => (2600.0, 5200.0),
            Band::Treble => (5200.0, 14000.0),
            Band::Range(a, b) => (a, b),
        };
        if a > b { (b, a) } else { (a, b) }
    }
}

pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    sample_rate: u32,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    /// Time-averaged magnitudes, one per bin.
    smoothed: Vec<f32>,
    /// Byte spectrum from the last [`Analyser::analyse`].
    spectrum: Vec<u8>,
}

impl Analyser {
    pub fn new(config: &AnalysisConfig, sample_rate: u32) -> Self {
        let fft_size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let bins = fft_size / 2;

        Self {
            fft,
            fft_size,
            sample_rate,
            window: (0..fft_size).map(|i| blackman_window(i, fft_size)).collect(),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothing: config.smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            smoothed: vec![0.0; bins],
            spectrum: vec![0; bins],
        }
    }

    /// Last byte spectrum (`fft_size / 2` bins). All zeros before the first analysis.
    pub fn spectrum(&self) -> &[u8] {
        &self.spectrum
    }

    /// Analyse the most recent `fft_size` samples of `samples`.
    /// Shorter input is zero padded at the start.
    pub fn analyse(&mut self, samples: &[f32]) -> &[u8] {
        let n = self.fft_size;
        let take = samples.len().min(n);
        let tail = &samples[samples.len() - take..];
        let pad = n - take;

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = if i < pad { 0.0 } else { tail[i - pad] };
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 1.0 / n as f32;
        let range = self.max_decibels - self.min_decibels;
        for (k, (avg, byte)) in self
            .smoothed
            .iter_mut()
            .zip(self.spectrum.iter_mut())
            .enumerate()
        {
            let magnitude = self.buffer[k].norm() * scale;
            let value = self.smoothing * *avg + (1.0 - self.smoothing) * magnitude;
            *avg = if value.is_finite() { value } else { 0.0 };

            let db = 20.0 * avg.log10();
            *byte = if db.is_finite() {
                (255.0 * (db - self.min_decibels) / range).floor().clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
        &self.spectrum
    }

    /// Mean byte value over `band` in the last spectrum (0.0–255.0).
    pub fn energy(&self, band: Band) -> f32 {
        let bins = self.spectrum.len();
        if bins == 0 {
            return 0.0;
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        let (low, high) = band.hz();
        let index = |f: f32| ((f / nyquist * bins as f32).round().max(0.0) as usize).min(bins - 1);
        let (lo, hi) = (index(low), index(high));

        let total: u32 = self.spectrum[lo..=hi].iter().map(|&b| b as u32).sum();
        total as f32 / (hi - lo + 1) as f32
    }
}

fn blackman_window(i: usize, n: usize) -> f32 {
    use std::f32::consts::PI;
    let x = i as f32 / n as f32;
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}

#[cfg(test)]
mod tests {
    use super::{Analyser, Band, blackman_window};
    use crate::config::AnalysisConfig;

    fn sine(freq: f32, sample_rate: u32, len: usize, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn blackman_window_range() {
        let n = 64;
        for i in 0..n {
            let w = blackman_window(i, n);
            assert!((-1e-6..=1.0).contains(&w), "blackman_window({}, {}) = {}", i, n, w);
        }
        assert!(blackman_window(0, n).abs() < 1e-6);
        assert!((blackman_window(n / 2, n) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn band_ranges_are_ordered() {
        assert_eq!(Band::Bass.hz(), (20.0, 140.0));
        assert_eq!(Band::Treble.hz(), (5200.0, 14000.0));
        assert_eq!(Band::Range(900.0, 300.0).hz(), (300.0, 900.0));
    }

    #[test]
    fn spectrum_is_zero_before_analysis() {
        let analyser = Analyser::new(&AnalysisConfig::default(), 44100);
        assert_eq!(analyser.spectrum().len(), 1024);
        assert!(analyser.spectrum().iter().all(|&b| b == 0));
        assert_eq!(analyser.energy(Band::Bass), 0.0);
    }

    #[test]
    fn silence_analyses_to_zero() {
        let mut analyser = Analyser::new(&AnalysisConfig::default(), 44100);
        let spectrum = analyser.analyse(&vec![0.0; 4096]);
        assert!(spectrum.iter().all(|&b| b == 0));
        assert_eq!(analyser.energy(Band::Treble), 0.0);
    }

    #[test]
    fn short_input_is_padded() {
        let mut analyser = Analyser::new(&AnalysisConfig::default(), 44100);
        let spectrum = analyser.analyse(&sine(440.0, 44100, 300, 0.5));
        assert_eq!(spectrum.len(), 1024);
    }

    #[test]
    fn low_tone_is_bass_heavy() {
        let mut analyser = Analyser::new(&AnalysisConfig::default(), 44100);
        let samples = sine(60.0, 44100, 2048, 0.8);
        analyser.analyse(&samples);
        let bass = analyser.energy(Band::Bass);
        let treble = analyser.energy(Band::Treble);
        assert!(bass > 0.0 && bass <= 255.0);
        assert!(bass > treble, "bass {} treble {}", bass, treble);
    }

    #[test]
    fn high_tone_is_treble_heavy() {
        let mut analyser = Analyser::new(&AnalysisConfig::default(), 44100);
        analyser.analyse(&sine(9000.0, 44100, 2048, 0.8));
        assert!(analyser.energy(Band::Treble) > analyser.energy(Band::Bass));
    }

    #[test]
    fn smoothing_decays_after_signal_stops() {
        let mut analyser = Analyser::new(&AnalysisConfig::default(), 44100);
        analyser.analyse(&sine(100.0, 44100, 2048, 0.8));
        let loud = analyser.energy(Band::Bass);
        analyser.analyse(&vec![0.0; 2048]);
        let fading = analyser.energy(Band::Bass);
        assert!(fading > 0.0, "smoothing keeps some energy");
        assert!(fading < loud);
    }

    #[test]
    fn no_smoothing_drops_immediately() {
        let config = AnalysisConfig {
            smoothing: 0.0,
            ..AnalysisConfig::default()
        };
        let mut analyser = Analyser::new(&config, 44100);
        analyser.analyse(&sine(100.0, 44100, 2048, 0.8));
        analyser.analyse(&vec![0.0; 2048]);
        assert_eq!(analyser.energy(Band::Bass), 0.0);
    }

    #[test]
    fn range_beyond_nyquist_is_clamped() {
        let mut analyser = Analyser::new(&AnalysisConfig::default(), 8000);
        analyser.analyse(&sine(3000.0, 8000, 2048, 0.8));
        let e = analyser.energy(Band::Range(3500.0, 20000.0));
        assert!(e.is_finite());
        assert!((0.0..=255.0).contains(&e));
    }
}
