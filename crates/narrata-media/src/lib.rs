//! FFmpeg-backed scene clip rendering and video composition (spec §4.8
//! "Composer").

pub mod clip;
pub mod command;
pub mod probe;

pub use clip::{concat_clips, render_scene_clip};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner, MediaResult};
pub use probe::probe_duration;
