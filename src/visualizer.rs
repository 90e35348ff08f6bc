//! Per-frame scene update: background hue, analysis, arc groups, title.

use tracing::debug;

use crate::analyser::{Analyser, Band};
use crate::arcs::{ArcStroke, RadialArcs, Spin, map_range};
use crate::color::Hsb;
use crate::config::{BackgroundConfig, Config, PlaybackConfig};
use crate::transport::{Schedule, Transport, samples_before_frame};

/// Everything needed to rasterize one frame.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 4],
    pub arcs: Vec<ArcStroke>,
    pub title: Title,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Title {
    pub text: String,
    /// Rotation about the canvas center (radians).
    pub angle: f32,
}

/// An arc group and the band that drives it.
struct Group {
    arcs: RadialArcs,
    band: Band,
    energy_scale: f32,
}

pub struct Visualizer {
    width: u32,
    height: u32,
    analyser: Analyser,
    groups: Vec<Group>,
    spin: Spin,
    background: BackgroundConfig,
}

impl Visualizer {
    pub fn new(config: &Config, sample_rate: u32) -> Self {
        let (width, height) = (config.video.width, config.video.height);
        let groups = config
            .groups
            .iter()
            .map(|g| Group {
                arcs: RadialArcs::new(g, width, height),
                band: g.band,
                energy_scale: g.energy_scale,
            })
            .collect();
        Self {
            width,
            height,
            analyser: Analyser::new(&config.analysis, sample_rate),
            groups,
            spin: Spin::new(&config.spin),
            background: config.background.clone(),
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = &RadialArcs> {
        self.groups.iter().map(|g| &g.arcs)
    }

    pub fn spin(&self) -> &Spin {
        &self.spin
    }

    /// Build the next frame from the latest output samples.
    ///
    /// The background is colored from the spectrum of the previous frame,
    /// before `window` is analysed; arc values only move while `playing`.
    pub fn frame(&mut self, window: &[f32], playing: bool, title: &str) -> Frame {
        let background = self.background_color();

        self.analyser.analyse(window);

        if playing {
            for group in &mut self.groups {
                let energy = self.analyser.energy(group.band);
                group
                    .arcs
                    .update(map_range(energy, 0.0, 255.0, 0.0, group.energy_scale));
            }
        }

        let arc_total: usize = self.groups.iter().map(|g| g.arcs.arcs().len() * 2).sum();
        let mut strokes = Vec::with_capacity(arc_total);
        for group in &mut self.groups {
            group.arcs.advance(&mut self.spin, playing, &mut strokes);
        }

        Frame {
            width: self.width,
            height: self.height,
            background: background.to_rgba8(),
            arcs: strokes,
            title: Title {
                text: title.to_string(),
                angle: self.spin.title_angle(),
            },
        }
    }

    fn background_color(&self) -> Hsb {
        let bg = &self.background;
        let total: f32 = bg.bands.iter().map(|&b| self.analyser.energy(b)).sum();
        let average = total / bg.bands.len().max(1) as f32;
        let hue = map_range(average, 0.0, bg.energy_span, bg.min_hue, bg.max_hue);
        Hsb::new(hue, bg.saturation, bg.brightness)
    }
}

/// A transport driven by a toggle schedule, one video frame at a time.
///
/// Toggles due at or before a frame's start time are applied before that
/// frame's audio is rendered, so a click at `t` shows on frame `ceil(t * fps)`.
pub struct Playthrough<'a> {
    transport: Transport<'a>,
    schedule: Schedule,
    toggled: usize,
    audio: Vec<f32>,
    sample_rate: u32,
    fps: u32,
    fft_size: usize,
    idle_title: String,
    playing_title: String,
}

impl<'a> Playthrough<'a> {
    pub fn new(
        track: &'a [f32],
        sample_rate: u32,
        schedule: Schedule,
        config: &Config,
        total_frames: usize,
    ) -> Self {
        let PlaybackConfig {
            fade_in_secs,
            looping,
            idle_title,
            playing_title,
        } = &config.playback;
        let fps = config.video.fps;

        let mut audio = Vec::new();
        let expected = samples_before_frame(total_frames, sample_rate, fps);
        if audio.try_reserve_exact(expected).is_err() {
            debug!(expected, "could not reserve the output buffer up front");
        }

        Self {
            transport: Transport::new(track, sample_rate, *looping, *fade_in_secs),
            schedule,
            toggled: 0,
            audio,
            sample_rate,
            fps,
            fft_size: config.analysis.fft_size,
            idle_title: idle_title.clone(),
            playing_title: playing_title.clone(),
        }
    }

    pub fn transport(&self) -> &Transport<'a> {
        &self.transport
    }

    /// Audio rendered so far.
    pub fn audio(&self) -> &[f32] {
        &self.audio
    }

    /// Apply due toggles, render the frame's audio, then build the frame.
    pub fn step(&mut self, visualizer: &mut Visualizer, frame_index: usize) -> Frame {
        let time = frame_index as f64 / self.fps.max(1) as f64;
        let due = self.schedule.due_by(time);
        while self.toggled < due {
            self.transport.toggle();
            self.toggled += 1;
            debug!(
                time,
                playing = self.transport.is_playing(),
                position = self.transport.position(),
                "toggle"
            );
        }

        let frame_samples = samples_before_frame(frame_index + 1, self.sample_rate, self.fps)
            - samples_before_frame(frame_index, self.sample_rate, self.fps);
        self.transport.render(frame_samples, &mut self.audio);

        let title = if self.transport.has_played() {
            &self.playing_title
        } else {
            &self.idle_title
        };
        let window = &self.audio[self.audio.len().saturating_sub(self.fft_size)..];
        visualizer.frame(window, self.transport.is_playing(), title)
    }
}

#[cfg(test)]
mod tests {
    use super::{Playthrough, Visualizer};
    use crate::transport::Schedule;
    use crate::color::Hsb;
    use crate::config::Config;

    fn small_config() -> Config {
        let mut config = Config::standard();
        config.video.width = 320;
        config.video.height = 180;
        config
    }

    fn tone(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.8 * (2.0 * std::f32::consts::PI * 80.0 * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn emits_two_strokes_per_arc() {
        let config = small_config();
        let mut viz = Visualizer::new(&config, 44100);
        let frame = viz.frame(&[0.0; 2048], false, "Play");
        assert_eq!(frame.arcs.len(), (60 + 100) * 2);
        assert_eq!(frame.title.text, "Play");
        assert_eq!((frame.width, frame.height), (320, 180));
    }

    #[test]
    fn silent_background_is_min_hue() {
        let config = small_config();
        let mut viz = Visualizer::new(&config, 44100);
        let frame = viz.frame(&[0.0; 2048], false, "Play");
        assert_eq!(frame.background, Hsb::new(250.0, 100.0, 25.0).to_rgba8());
    }

    #[test]
    fn paused_frames_keep_values() {
        let config = small_config();
        let mut viz = Visualizer::new(&config, 44100);
        viz.frame(&tone(2048), false, "Play");
        assert!(viz.groups().all(|g| g.arcs().iter().all(|a| a.value() == 0.0)));
        assert_eq!(viz.spin().speed(), 0.0);
    }

    #[test]
    fn playing_feeds_inner_arc() {
        let config = small_config();
        let mut viz = Visualizer::new(&config, 44100);
        viz.frame(&tone(2048), true, "Epic Sax");
        let bass = viz.groups().next().unwrap();
        let inner = bass.arcs()[0].value();
        assert!(inner > 0.0 && inner <= 1.2, "inner bass value {}", inner);
        assert_eq!(bass.arcs()[1].value(), 0.0);

        viz.frame(&tone(2048), true, "Epic Sax");
        let bass = viz.groups().next().unwrap();
        assert!(bass.arcs()[1].value() > 0.0);
        assert!(viz.spin().speed() > 0.0);
    }

    #[test]
    fn background_lags_one_frame() {
        let config = small_config();
        let mut viz = Visualizer::new(&config, 44100);
        let first = viz.frame(&tone(2048), true, "Epic Sax");
        let silent_bg = Hsb::new(250.0, 100.0, 25.0).to_rgba8();
        assert_eq!(first.background, silent_bg);
        let second = viz.frame(&tone(2048), true, "Epic Sax");
        assert_ne!(second.background, silent_bg);
    }

    #[test]
    fn title_is_idle_before_first_toggle() {
        let config = small_config();
        let track = tone(44100);
        let mut viz = Visualizer::new(&config, 44100);
        let mut run = Playthrough::new(&track, 44100, Schedule::new(vec![1.0]), &config, 60);
        for k in 0..60 {
            let frame = run.step(&mut viz, k);
            assert_eq!(frame.title.text, "Play", "frame {}", k);
        }
        assert!(!run.transport().is_playing());
        assert!(run.audio().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn title_stays_after_pause() {
        let config = small_config();
        let track = tone(44100);
        let mut viz = Visualizer::new(&config, 44100);
        // Play at 0, pause at 0.25s.
        let mut run = Playthrough::new(&track, 44100, Schedule::new(vec![0.0, 0.25]), &config, 30);
        let first = run.step(&mut viz, 0);
        assert_eq!(first.title.text, "Epic Sax");
        for k in 1..30 {
            let frame = run.step(&mut viz, k);
            assert_eq!(frame.title.text, "Epic Sax", "frame {}", k);
        }
        assert!(!run.transport().is_playing());
        assert!(run.transport().has_played());
    }

    #[test]
    fn toggle_takes_effect_on_following_frame() {
        let config = small_config();
        assert_eq!(config.video.fps, 60);
        let track = tone(44100);
        let mut viz = Visualizer::new(&config, 44100);
        let mut run = Playthrough::new(&track, 44100, Schedule::new(vec![0.5]), &config, 31);
        for k in 0..30 {
            let frame = run.step(&mut viz, k);
            assert!(!run.transport().is_playing(), "frame {}", k);
            assert_eq!(frame.title.text, "Play");
        }
        assert_eq!(run.audio().len(), 30 * 735);

        let frame = run.step(&mut viz, 30);
        assert!(run.transport().is_playing());
        assert_eq!(frame.title.text, "Epic Sax");
        assert_eq!(run.transport().position(), 735);
    }

    #[test]
    fn huge_frame_count_does_not_preallocate() {
        let config = small_config();
        let track = tone(4410);
        let mut viz = Visualizer::new(&config, 44100);
        let mut run = Playthrough::new(&track, 44100, Schedule::default(), &config, usize::MAX);
        run.step(&mut viz, 0);
        assert_eq!(run.audio().len(), 735);
    }
}
