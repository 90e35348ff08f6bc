//! Error type shared by the rendering pipeline (thiserror)

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container probing or packet demuxing failed.
    #[error("decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("no audio track found")]
    NoAudioTrack,

    #[error("missing {0} in codec parameters")]
    MissingCodecParam(&'static str),

    /// Invalid or unreadable configuration.
    #[error("config error: {0}")]
    Config(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Rasterization failed (bad canvas size, title markup).
    #[error("render error: {0}")]
    Render(String),

    #[error("ffmpeg error: {0}")]
    Ffmpeg(String),
}
