//! Playback of the decoded track: play/pause toggles, volume fade, looping.
//!
//! The transport renders the audible output sample by sample. That output is
//! both what the analyser listens to and what ends up in the video's audio
//! track, so pauses and fades show up in the picture as well as the sound.

use tracing::debug;

/// Linear gain ramp measured in output samples.
#[derive(Clone, Copy, Debug)]
struct Ramp {
    from: f32,
    to: f32,
    start: u64,
    len: u64,
}

impl Ramp {
    fn constant(value: f32) -> Self {
        Self {
            from: value,
            to: value,
            start: 0,
            len: 0,
        }
    }

    fn gain_at(&self, clock: u64) -> f32 {
        let elapsed = clock.saturating_sub(self.start);
        if elapsed >= self.len {
            return self.to;
        }
        let t = elapsed as f32 / self.len as f32;
        self.from + (self.to - self.from) * t
    }
}

pub struct Transport<'a> {
    track: &'a [f32],
    sample_rate: u32,
    looping: bool,
    fade_in_secs: f32,
    playing: bool,
    /// Playhead into `track`.
    position: usize,
    /// Output samples rendered so far.
    clock: u64,
    volume: Ramp,
    has_played: bool,
}

impl<'a> Transport<'a> {
    /// A paused transport at the start of `track` with volume 0.
    pub fn new(track: &'a [f32], sample_rate: u32, looping: bool, fade_in_secs: f32) -> Self {
        Self {
            track,
            sample_rate,
            looping,
            fade_in_secs,
            playing: false,
            position: 0,
            clock: 0,
            volume: Ramp::constant(0.0),
            has_played: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True once playback has been started at least once.
    pub fn has_played(&self) -> bool {
        self.has_played
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Current output gain.
    pub fn volume(&self) -> f32 {
        self.volume.gain_at(self.clock)
    }

    /// Pause (muting immediately) or resume (fading in from the current volume).
    pub fn toggle(&mut self) {
        if self.playing {
            self.playing = false;
            self.volume = Ramp::constant(0.0);
            debug!(position = self.position, "paused");
        } else {
            let len = (self.fade_in_secs.max(0.0) as f64 * self.sample_rate as f64).round() as u64;
            self.volume = Ramp {
                from: self.volume(),
                to: 1.0,
                start: self.clock,
                len,
            };
            self.playing = !self.track.is_empty();
            self.has_played = true;
            debug!(position = self.position, "playing");
        }
    }

    /// Append `n` output samples to `out`.
    pub fn render(&mut self, n: usize, out: &mut Vec<f32>) {
        out.reserve(n);
        for _ in 0..n {
            let sample = if self.playing {
                let s = self.track[self.position] * self.volume.gain_at(self.clock);
                self.position += 1;
                if self.position >= self.track.len() {
                    self.position = 0;
                    if !self.looping {
                        self.playing = false;
                        debug!("track ended");
                    }
                }
                s
            } else {
                0.0
            };
            out.push(sample);
            self.clock += 1;
        }
    }
}

/// Output samples that precede video frame `frame`, saturating at `usize::MAX`.
pub fn samples_before_frame(frame: usize, sample_rate: u32, fps: u32) -> usize {
    let samples = frame as u128 * sample_rate as u128 / fps.max(1) as u128;
    usize::try_from(samples).unwrap_or(usize::MAX)
}

/// Play/pause toggle times in seconds, sorted.
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    toggles: Vec<f64>,
}

impl Default for Schedule {
    /// Start playing immediately.
    fn default() -> Self {
        Self { toggles: vec![0.0] }
    }
}

impl Schedule {
    /// Negative and non-finite times are dropped.
    pub fn new(mut toggles: Vec<f64>) -> Self {
        toggles.retain(|t| t.is_finite() && *t >= 0.0);
        toggles.sort_by(|a, b| a.total_cmp(b));
        Self { toggles }
    }

    pub fn toggles(&self) -> &[f64] {
        &self.toggles
    }

    /// Number of toggles due at or before `time`.
    pub fn due_by(&self, time: f64) -> usize {
        self.toggles.partition_point(|&t| t <= time)
    }

    /// Time at which one full pass of a `track_secs` track has been heard,
    /// or `None` if playback is paused for good before that.
    pub fn natural_duration(&self, track_secs: f64) -> Option<f64> {
        let mut played = 0.0;
        let mut playing_since: Option<f64> = None;
        for &t in &self.toggles {
            match playing_since.take() {
                Some(start) => {
                    if played + (t - start) >= track_secs {
                        return Some(start + (track_secs - played));
                    }
                    played += t - start;
                }
                None => playing_since = Some(t),
            }
        }
        playing_since.map(|start| start + (track_secs - played))
    }
}
