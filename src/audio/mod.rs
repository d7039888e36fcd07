pub mod interface;
pub mod ffmpeg;

pub use interface::{ConversionError, MediaConverter};
pub use ffmpeg::FfmpegConverter;
