//! Video tooling (ffmpeg / ffprobe)

pub mod ffmpeg;

pub use ffmpeg::FfmpegFrameSource;
