//! Rendered audio → WAV output (hound)

use std::path::Path;

use crate::error::Result;

/// Write mono f32 samples (-1.0 to 1.0) as 16-bit PCM. Out-of-range samples are clipped.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let mut pcm = writer.get_i16_writer(samples.len() as u32);
    for &s in samples {
        pcm.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
    }
    pcm.flush()?;
    writer.finalize()?;
    Ok(())
}
