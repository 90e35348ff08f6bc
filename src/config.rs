//! Configuration for canvas, analysis, playback, arc groups, etc.
//!
//! Every field has a default, so a TOML file only needs the values it changes.

use std::f32::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analyser::Band;
use crate::error::{Error, Result};

/// Application configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub video: VideoConfig,
    pub analysis: AnalysisConfig,
    pub playback: PlaybackConfig,
    pub spin: SpinConfig,
    pub background: BackgroundConfig,
    pub title: TitleConfig,
    #[serde(default = "standard_groups")]
    pub groups: Vec<ArcGroupConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Output video width (pixels).
    pub width: u32,
    /// Output video height (pixels).
    pub height: u32,
    /// Frame rate (fps).
    pub fps: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 60,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// FFT window size (number of samples, power of two).
    pub fft_size: usize,
    /// Weight of the previous frame in the magnitude average (0.0–1.0).
    pub smoothing: f32,
    /// Level mapped to byte 0.
    pub min_decibels: f32,
    /// Level mapped to byte 255.
    pub max_decibels: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing: 0.6,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Volume ramp length when playback starts (seconds).
    pub fade_in_secs: f32,
    /// Restart the track when it ends.
    pub looping: bool,
    /// Title shown before the first play.
    pub idle_title: String,
    /// Title shown once playback has started.
    pub playing_title: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fade_in_secs: 4.0,
            looping: true,
            idle_title: "Play".to_string(),
            playing_title: "Epic Sax".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    /// Speed change per arc update (radians).
    pub increment: f32,
    /// Acceleration stops once the speed exceeds this.
    pub max_speed: f32,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            increment: 0.000_002_5,
            max_speed: 0.015,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Bands averaged to drive the hue.
    pub bands: Vec<Band>,
    pub min_hue: f32,
    pub max_hue: f32,
    /// Average energy mapped to `max_hue`.
    pub energy_span: f32,
    pub saturation: f32,
    pub brightness: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            bands: vec![Band::Bass, Band::Treble],
            min_hue: 250.0,
            max_hue: 360.0,
            energy_span: 510.0,
            saturation: 100.0,
            brightness: 25.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    /// Font size (pixels).
    pub size: f32,
    pub stroke_weight: f32,
    /// Fill brightness, 0–100.
    pub fill_brightness: f32,
    /// Outline brightness, 0–100.
    pub stroke_brightness: f32,
    /// TTF/OTF file; system sans-serif when unset.
    pub font: Option<PathBuf>,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            size: 25.0,
            stroke_weight: 10.0,
            fill_brightness: 100.0,
            stroke_brightness: 15.0,
            font: None,
        }
    }
}

/// One ring of arcs driven by a single frequency band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArcGroupConfig {
    pub name: String,
    pub band: Band,
    /// Band energy 255 maps to this arc value.
    pub energy_scale: f32,
    pub arc_count: usize,
    /// Innermost diameter as a fraction of canvas height.
    pub min_diameter_height_ratio: f32,
    /// Outermost diameter as a fraction of canvas width.
    pub max_diameter_width_ratio: f32,
    /// Starting angle (radians).
    pub baseline: f32,
    /// Stroke width at value 1.0.
    pub max_stroke: f32,
    pub min_hue: f32,
    pub max_hue: f32,
}

impl ArcGroupConfig {
    pub fn bass() -> Self {
        Self {
            name: "bass".to_string(),
            band: Band::Bass,
            energy_scale: 1.2,
            arc_count: 60,
            min_diameter_height_ratio: 0.25,
            max_diameter_width_ratio: 1.5,
            baseline: 0.0,
            max_stroke: 3.0,
            min_hue: 200.0,
            max_hue: 340.0,
        }
    }

    pub fn treble() -> Self {
        Self {
            name: "treble".to_string(),
            band: Band::Treble,
            energy_scale: 7.0,
            arc_count: 100,
            min_diameter_height_ratio: 0.25,
            max_diameter_width_ratio: 1.5,
            baseline: -FRAC_PI_2,
            max_stroke: 5.0,
            min_hue: 200.0,
            max_hue: 275.0,
        }
    }
}

fn standard_groups() -> Vec<ArcGroupConfig> {
    vec![ArcGroupConfig::bass(), ArcGroupConfig::treble()]
}

impl Config {
    /// Defaults with the bass and treble groups filled in.
    pub fn standard() -> Self {
        Self {
            groups: standard_groups(),
            ..Self::default()
        }
    }

    /// Load a TOML file on top of [`Config::standard`]. An absent `groups`
    /// key keeps the standard groups; an explicit empty list stays empty.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        let v = &self.video;
        if v.width == 0 || v.height == 0 {
            return Err(Error::Config("width and height must be positive".into()));
        }
        if v.fps == 0 {
            return Err(Error::Config("fps must be positive".into()));
        }

        let a = &self.analysis;
        if !a.fft_size.is_power_of_two() || !(32..=32768).contains(&a.fft_size) {
            return Err(Error::Config(format!(
                "fft_size must be a power of two in 32..=32768, got {}",
                a.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&a.smoothing) {
            return Err(Error::Config(format!(
                "smoothing must be within [0, 1], got {}",
                a.smoothing
            )));
        }
        if a.min_decibels >= a.max_decibels {
            return Err(Error::Config(
                "min_decibels must be below max_decibels".into(),
            ));
        }

        if self.playback.fade_in_secs < 0.0 {
            return Err(Error::Config("fade_in_secs must not be negative".into()));
        }
        if self.background.bands.is_empty() || self.background.energy_span <= 0.0 {
            return Err(Error::Config(
                "background needs at least one band and a positive energy_span".into(),
            ));
        }

        if self.groups.is_empty() {
            return Err(Error::Config("at least one arc group is required".into()));
        }
        for g in &self.groups {
            if g.arc_count == 0 {
                return Err(Error::Config(format!("group '{}' has no arcs", g.name)));
            }
        }
        Ok(())
    }
}
