mod analyser;
mod arcs;
mod color;
mod config;
mod decode;
mod draw;
mod encode;
mod error;
mod logging;
mod transport;
mod visualizer;
mod wav;

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use config::Config;
use decode::decode_mp3;
use draw::Renderer;
use encode::{encode_video, ensure_ffmpeg, frame_file_name};
use transport::Schedule;
use visualizer::{Playthrough, Visualizer};
use wav::write_wav;

#[derive(Parser, Debug)]
#[command(name = "radial-arcs")]
#[command(about = "Render an audio-reactive radial arc video (MP4) from an MP3 file")]
struct Args {
    /// Input MP3 file
    #[arg(required_unless_present = "print_config")]
    input: Option<PathBuf>,

    /// Output MP4 file
    #[arg(short, long, required_unless_present = "print_config")]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Resolution (e.g. 1920x1080). Overrides --width / --height when set
    #[arg(long, value_parser = parse_resolution)]
    resolution: Option<(u32, u32)>,

    /// Video width (pixels)
    #[arg(long)]
    width: Option<u32>,

    /// Video height (pixels)
    #[arg(long)]
    height: Option<u32>,

    /// Frame rate (fps)
    #[arg(long)]
    fps: Option<u32>,

    /// Play/pause toggle time in seconds; repeat for more clicks. Defaults to a single toggle at 0
    #[arg(long = "toggle", value_name = "SECS")]
    toggles: Vec<f64>,

    /// Video length in seconds. Defaults to one full pass of the track
    #[arg(long)]
    duration: Option<f64>,

    /// Title font (TTF/OTF)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Longest video `--duration` accepts (one day).
const MAX_DURATION_SECS: f64 = 86_400.0;

/// Frames needed to cover `duration` seconds at `fps`, at least one.
fn frame_count(duration: f64, fps: u32) -> anyhow::Result<usize> {
    if !(duration > 0.0) || !duration.is_finite() {
        bail!("duration must be positive, got {}", duration);
    }
    if duration > MAX_DURATION_SECS {
        bail!("duration {}s exceeds the {}s limit", duration, MAX_DURATION_SECS);
    }
    Ok((duration * fps as f64).ceil().max(1.0) as usize)
}

fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or("resolution must be WIDTHxHEIGHT (e.g. 1920x1080)")?;
    let w: u32 = w.trim().parse().map_err(|_| "invalid width")?;
    let h: u32 = h.trim().parse().map_err(|_| "invalid height")?;
    if w == 0 || h == 0 {
        return Err("width and height must be positive".to_string());
    }
    Ok((w, h))
}

/// Temporary frame/audio directory, removed on drop.
struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    fn create() -> anyhow::Result<Self> {
        let path = std::env::temp_dir().join(format!("radial-arcs-{}", std::process::id()));
        std::fs::create_dir_all(path.join("frames"))
            .with_context(|| format!("failed to create work dir {:?}", path))?;
        Ok(Self { path })
    }

    fn frames(&self) -> PathBuf {
        self.path.join("frames")
    }

    fn wav(&self) -> PathBuf {
        self.path.join("audio.wav")
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            debug!("failed to remove {:?}: {}", self.path, e);
        }
    }
}

fn build_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::standard(),
    };
    if let Some(width) = args.width {
        config.video.width = width;
    }
    if let Some(height) = args.height {
        config.video.height = height;
    }
    if let Some((width, height)) = args.resolution {
        config.video.width = width;
        config.video.height = height;
    }
    if let Some(fps) = args.fps {
        config.video.fps = fps;
    }
    if let Some(font) = &args.font {
        config.title.font = Some(font.clone());
    }
    config.validate()?;
    Ok(config)
}

fn progress_bar(len: u64, template: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    });

    if args.print_config {
        print!("{}", toml::to_string_pretty(&Config::standard())?);
        return Ok(());
    }

    let (Some(input), Some(output)) = (&args.input, &args.output) else {
        bail!("input and --output are required");
    };

    let config = build_config(&args).context("invalid configuration")?;
    ensure_ffmpeg()?;
    render(input, output, &config, &args)
}

fn render(input: &Path, output: &Path, config: &Config, args: &Args) -> anyhow::Result<()> {
    info!("decoding {:?}", input);
    let decoded = decode_mp3(input).with_context(|| format!("failed to decode {:?}", input))?;
    let track_secs = decoded.duration_secs();
    info!(
        "decoded {} samples at {} Hz ({:.1}s)",
        decoded.samples.len(),
        decoded.sample_rate,
        track_secs
    );
    if decoded.samples.is_empty() {
        bail!("{:?} contains no audio", input);
    }

    let schedule = if args.toggles.is_empty() {
        Schedule::default()
    } else {
        Schedule::new(args.toggles.clone())
    };
    let duration = match args.duration {
        Some(d) => d,
        None => schedule.natural_duration(track_secs).ok_or_else(|| {
            anyhow!("playback ends paused before the track finishes; pass --duration")
        })?,
    };

    debug!("toggles at {:?}", schedule.toggles());

    let fps = config.video.fps;
    let sample_rate = decoded.sample_rate;
    let total_frames = frame_count(duration, fps)?;
    info!(
        "rendering {} frames at {}x{}, {} fps ({:.1}s)",
        total_frames, config.video.width, config.video.height, fps, duration
    );

    let work = WorkDir::create()?;
    let frames_dir = work.frames();

    let renderer = Renderer::new(&config.title)?;
    let mut visualizer = Visualizer::new(config, sample_rate);
    for group in visualizer.groups() {
        debug!(group = group.name(), arcs = group.arcs().len(), "arc group");
    }
    let mut playthrough =
        Playthrough::new(&decoded.samples, sample_rate, schedule, config, total_frames);

    let pb_render = progress_bar(
        total_frames as u64,
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames",
    )?;
    pb_render.set_message("Rendering frames");
    for frame_index in 0..total_frames {
        let frame = playthrough.step(&mut visualizer, frame_index);
        let img = renderer.render(&frame)?;
        img.save(frames_dir.join(frame_file_name(frame_index)))?;
        pb_render.inc(1);
    }
    pb_render.finish_with_message("Rendering done");
    debug!(
        playing = playthrough.transport().is_playing(),
        position = playthrough.transport().position(),
        "playback state at end"
    );

    let wav_path = work.wav();
    info!("writing WAV: {:?}", wav_path);
    write_wav(&wav_path, playthrough.audio(), sample_rate)?;

    let pb_ffmpeg = progress_bar(
        total_frames as u64,
        "[{elapsed_precise}] {bar:40.green/black} {pos}/{len} encoding",
    )?;
    pb_ffmpeg.set_message("Encoding MP4 with ffmpeg");
    encode_video(
        &frames_dir,
        &wav_path,
        output,
        fps,
        total_frames as u64,
        &pb_ffmpeg,
    )?;
    pb_ffmpeg.finish_with_message("Encoding done");

    println!("Done: {:?}", output);
    Ok(())
}
