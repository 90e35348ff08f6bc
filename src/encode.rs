//! PNG sequence + WAV → MP4 muxing (ffmpeg subprocess)

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Name pattern of the frame files, as understood by ffmpeg.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:06}.png", index)
}

pub fn ensure_ffmpeg() -> Result<()> {
    match Command::new("ffmpeg").arg("-version").output() {
        Ok(out) if out.status.success() => Ok(()),
        _ => Err(Error::Ffmpeg(
            "ffmpeg not found. Please install ffmpeg and add it to your PATH.".into(),
        )),
    }
}

/// Encode `frames_dir` and `wav_path` into `output`, reporting progress on `pb`.
pub fn encode_video(
    frames_dir: &Path,
    wav_path: &Path,
    output: &Path,
    fps: u32,
    total_frames: u64,
    pb: &ProgressBar,
) -> Result<()> {
    let mut child = Command::new("ffmpeg")
        .args(["-y", "-framerate", &fps.to_string(), "-i"])
        .arg(frames_dir.join(FRAME_PATTERN))
        .arg("-i")
        .arg(wav_path)
        .args([
            "-c:v", "libx264", "-c:a", "aac", "-shortest", "-pix_fmt", "yuv420p",
        ])
        .arg(output)
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Ffmpeg("failed to take ffmpeg stderr".into()))?;

    let progress = pb.clone();
    let reader = std::thread::spawn(move || {
        let mut buf = [0u8; 512];
        let mut tail = Vec::<u8>::new();
        let mut last_pos = 0u64;
        while let Ok(n) = stderr.read(&mut buf) {
            if n == 0 {
                break;
            }
            tail.extend_from_slice(&buf[..n]);
            if tail.len() > 4096 {
                tail.drain(..tail.len() - 1024);
            }
            if let Some(frame) = last_reported_frame(&String::from_utf8_lossy(&tail)) {
                let pos = frame.min(total_frames);
                if pos > last_pos {
                    last_pos = pos;
                    progress.set_position(pos);
                }
            }
        }
        tail
    });

    let status = child.wait()?;
    let tail = reader.join().unwrap_or_default();

    if !status.success() {
        let log = String::from_utf8_lossy(&tail);
        debug!("ffmpeg stderr tail:\n{}", log);
        let last_line = log.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        return Err(Error::Ffmpeg(format!("exited with {}: {}", status, last_line.trim())));
    }
    info!("encoded {:?}", output);
    Ok(())
}

/// Highest `frame=` counter in an ffmpeg progress log.
fn last_reported_frame(log: &str) -> Option<u64> {
    log.match_indices("frame=")
        .filter_map(|(i, _)| {
            let digits: String = log[i + 6..]
                .chars()
                .skip_while(|c| *c == ' ')
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<u64>().ok()
        })
        .max()
}
