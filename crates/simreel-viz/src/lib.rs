//! Frame rendering and video output for simreel
//!
//! - [`observations_to_image`] lays the visual sensors of an observation
//!   out as one RGB frame
//! - [`overlay_frame`] draws step metrics on top of a frame
//! - [`VideoWriter`] writes frames incrementally (MP4 via `ffmpeg`, or GIF)
//! - [`images_to_video`] encodes a complete frame sequence in one call

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod ffmpeg;
pub mod render;
pub mod sink;
pub mod video;

pub use ffmpeg::quality_to_crf;
pub use render::{depth_to_rgb, format_metric_lines, observations_to_image, overlay_frame};
pub use sink::FrameSink;
pub use video::{
    ensure_output_dir, images_to_video, images_to_video_with, sanitize_video_name, VideoFormat,
    VideoOptions, VideoSummary, VideoWriter, DEFAULT_FPS,
};
