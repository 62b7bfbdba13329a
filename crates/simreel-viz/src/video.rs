//! Incremental and batch video writers
//!
//! [`VideoWriter`] accepts frames one at a time and must be closed to
//! produce a playable file. [`images_to_video`] encodes a complete frame
//! sequence in one call and only publishes the file once it is complete.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use simreel_core::{Frame, Result, SimError};

use crate::ffmpeg::{self, FfmpegPipe};
use crate::sink::FrameSink;

/// Default frame rate of the demo videos
pub const DEFAULT_FPS: u32 = 30;

/// Container / codec of a video file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    /// H.264 in MP4, encoded by `ffmpeg`
    Mp4,
    /// Animated GIF, encoded in-process
    Gif,
}

impl VideoFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mp4") => Ok(Self::Mp4),
            Some("gif") => Ok(Self::Gif),
            _ => Err(SimError::Video(format!(
                "cannot infer video format from `{}` (expected .mp4 or .gif)",
                path.display()
            ))),
        }
    }

    /// File extension without the dot
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Gif => "gif",
        }
    }
}

/// Encoding options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    /// Frames per second
    pub fps: u32,
    /// Quality on a 0–10 scale (10 = best); encoder default when unset
    pub quality: Option<u8>,
    /// Explicit format; inferred from the path when unset
    pub format: Option<VideoFormat>,
    /// `ffmpeg` executable used for MP4 output
    pub ffmpeg: String,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            quality: None,
            format: None,
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

impl VideoOptions {
    /// Options with the given frame rate and defaults otherwise
    #[must_use]
    pub fn with_fps(fps: u32) -> Self {
        Self {
            fps,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(SimError::InvalidConfig("fps must be positive".to_string()));
        }
        if let Some(quality) = self.quality {
            if quality > 10 {
                return Err(SimError::InvalidConfig(format!(
                    "quality must be within 0..=10, got {quality}"
                )));
            }
        }
        Ok(())
    }
}

/// What a closed writer produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSummary {
    /// Output file
    pub path: PathBuf,
    /// Number of frames encoded
    pub frames: usize,
    /// Frame rate
    pub fps: u32,
    /// Container format
    pub format: VideoFormat,
}

enum Backend {
    /// Spawned on the first frame, once the size is known
    Ffmpeg(Option<FfmpegPipe>),
    Gif(GifEncoder<BufWriter<File>>),
}

/// Incremental video writer.
///
/// The first appended frame fixes the video size. Dropping a writer without
/// [`close`](Self::close) finalizes it best-effort.
pub struct VideoWriter {
    path: PathBuf,
    format: VideoFormat,
    options: VideoOptions,
    backend: Option<Backend>,
    size: Option<(u32, u32)>,
    frames: usize,
}

impl VideoWriter {
    /// Open a writer at `path`, inferring the format from its extension
    pub fn open(path: impl AsRef<Path>, fps: u32) -> Result<Self> {
        Self::open_with(path, VideoOptions::with_fps(fps))
    }

    /// Open a writer with explicit options
    pub fn open_with(path: impl AsRef<Path>, options: VideoOptions) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref().to_path_buf();
        let format = match options.format {
            Some(format) => format,
            None => VideoFormat::from_path(&path)?,
        };

        let backend = match format {
            VideoFormat::Mp4 => Backend::Ffmpeg(None),
            VideoFormat::Gif => {
                let file = File::create(&path)?;
                let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), 10);
                encoder.set_repeat(Repeat::Infinite)?;
                Backend::Gif(encoder)
            }
        };

        debug!(path = %path.display(), ?format, fps = options.fps, "video writer opened");
        Ok(Self {
            path,
            format,
            options,
            backend: Some(backend),
            size: None,
            frames: 0,
        })
    }

    /// Append one frame
    pub fn append(&mut self, frame: &Frame) -> Result<()> {
        let dims = frame.dimensions();
        match self.size {
            None => self.size = Some(dims),
            Some(expected) if expected != dims => {
                return Err(SimError::dimension_mismatch(
                    format!("{}x{}", expected.0, expected.1),
                    format!("{}x{}", dims.0, dims.1),
                ));
            }
            Some(_) => {}
        }

        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| SimError::Video("writer is already closed".to_string()))?;
        match backend {
            Backend::Ffmpeg(pipe) => {
                if pipe.is_none() {
                    let args = ffmpeg::encoder_args(
                        &self.path,
                        dims.0,
                        dims.1,
                        self.options.fps,
                        self.options.quality,
                    );
                    *pipe = Some(FfmpegPipe::spawn(&self.options.ffmpeg, &args)?);
                }
                if let Some(pipe) = pipe.as_mut() {
                    pipe.write_frame(frame)?;
                }
            }
            Backend::Gif(encoder) => {
                let rgba = DynamicImage::ImageRgb8(frame.clone()).into_rgba8();
                let delay = gif_frame_delay(self.options.fps);
                encoder.encode_frame(image::Frame::from_parts(rgba, 0, 0, delay))?;
            }
        }

        self.frames += 1;
        Ok(())
    }

    /// Number of frames appended so far
    #[must_use]
    pub fn frames_written(&self) -> usize {
        self.frames
    }

    /// Output path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Finalize the container.
    ///
    /// Fails if no frame was appended; any empty file is removed.
    pub fn close(mut self) -> Result<VideoSummary> {
        let backend = self.backend.take();
        finish_backend(backend)?;

        if self.frames == 0 {
            remove_if_exists(&self.path)?;
            return Err(SimError::Video(format!(
                "no frames were appended to {}",
                self.path.display()
            )));
        }

        info!(path = %self.path.display(), frames = self.frames, "video written");
        Ok(VideoSummary {
            path: self.path.clone(),
            frames: self.frames,
            fps: self.options.fps,
            format: self.format,
        })
    }
}

impl Drop for VideoWriter {
    fn drop(&mut self) {
        if let Some(backend) = self.backend.take() {
            warn!(
                path = %self.path.display(),
                frames = self.frames,
                "video writer dropped without close, finalizing"
            );
            if let Err(err) = finish_backend(Some(backend)) {
                warn!(path = %self.path.display(), %err, "finalizing video failed");
            }
        }
    }
}

impl FrameSink for VideoWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.append(frame)
    }

    fn frames_written(&self) -> usize {
        self.frames
    }
}

/// Per-frame GIF delay for `fps`.
///
/// GIF stores delays in 10 ms units, so the rate is rounded to the nearest
/// representable one: 30 fps is written as 30 ms per frame and plays back
/// at about 33 fps. Anything above 100 fps is clamped to 10 ms.
fn gif_frame_delay(fps: u32) -> Delay {
    let centis = ((100 + fps / 2) / fps).max(1);
    Delay::from_numer_denom_ms(centis * 10, 1)
}

fn finish_backend(backend: Option<Backend>) -> Result<()> {
    match backend {
        Some(Backend::Ffmpeg(Some(pipe))) => pipe.finish(),
        // The GIF trailer is written when the encoder is dropped
        Some(Backend::Gif(encoder)) => {
            drop(encoder);
            Ok(())
        }
        Some(Backend::Ffmpeg(None)) | None => Ok(()),
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

/// Create `dir` and its parents; succeeds if it already exists
pub fn ensure_output_dir(dir: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(dir.as_ref())?;
    Ok(())
}

/// Replace characters that do not belong in a file name
#[must_use]
pub fn sanitize_video_name(name: &str) -> String {
    name.replace([' ', '\n'], "_")
}

/// Encode a complete frame sequence as `<output_dir>/<video_name>.mp4`.
///
/// `quality` is on the 0–10 scale (10 = best).
pub fn images_to_video(
    frames: &[Frame],
    output_dir: impl AsRef<Path>,
    video_name: &str,
    fps: u32,
    quality: u8,
) -> Result<PathBuf> {
    let options = VideoOptions {
        fps,
        quality: Some(quality),
        format: Some(VideoFormat::Mp4),
        ..VideoOptions::default()
    };
    images_to_video_with(frames, output_dir, video_name, &options)
}

/// Encode a complete frame sequence with explicit options.
///
/// The file appears under its final name only after encoding succeeded; a
/// failed encode leaves nothing behind.
pub fn images_to_video_with(
    frames: &[Frame],
    output_dir: impl AsRef<Path>,
    video_name: &str,
    options: &VideoOptions,
) -> Result<PathBuf> {
    if frames.is_empty() {
        return Err(SimError::Video(format!("no frames to encode for `{video_name}`")));
    }
    options.validate()?;

    let output_dir = output_dir.as_ref();
    ensure_output_dir(output_dir)?;

    let format = options.format.unwrap_or(VideoFormat::Mp4);
    let file_name = format!("{}.{}", sanitize_video_name(video_name), format.extension());
    let final_path = output_dir.join(&file_name);
    let partial_path = output_dir.join(format!(".{file_name}.partial"));

    let options = VideoOptions {
        format: Some(format),
        ..options.clone()
    };
    let encoded = encode_all(frames, &partial_path, options);
    if let Err(err) = encoded {
        let _ = fs::remove_file(&partial_path);
        return Err(err);
    }
    fs::rename(&partial_path, &final_path)?;

    info!(path = %final_path.display(), frames = frames.len(), "batch video written");
    Ok(final_path)
}

fn encode_all(frames: &[Frame], path: &Path, options: VideoOptions) -> Result<VideoSummary> {
    let mut writer = VideoWriter::open_with(path, options)?;
    for frame in frames {
        writer.append(frame)?;
    }
    writer.close()
}
