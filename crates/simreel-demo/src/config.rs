//! Demo configuration loaded from JSON

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use simreel_core::{EnvironmentConfig, Result, SimError};
use simreel_env::CARTPOLE_VISUAL;
use simreel_viz::{VideoFormat, VideoOptions, DEFAULT_FPS};

/// Settings shared by the demo programs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Registry id of the environment
    pub env_id: String,
    /// Passed to the environment constructor
    pub environment: EnvironmentConfig,
    /// Where videos are written
    pub output_dir: PathBuf,
    /// Frames per second of every video
    pub fps: u32,
    /// Quality of the batch video (0–10, 10 = best)
    pub quality: u8,
    /// Step cap of the recorded episode
    pub max_steps: usize,
    /// Step cap of the raw-sensor episode
    pub raw_max_steps: usize,
    /// Draw step metrics on the frames
    pub overlay: bool,
    /// `ffmpeg` executable used for MP4 output
    pub ffmpeg: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            env_id: CARTPOLE_VISUAL.to_string(),
            environment: EnvironmentConfig::default(),
            output_dir: PathBuf::from("./data/example_videos"),
            fps: DEFAULT_FPS,
            quality: 9,
            max_steps: 1000,
            raw_max_steps: 50,
            overlay: true,
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

impl DemoConfig {
    /// Load and validate a JSON config file; missing fields take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SimError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the driver or encoders cannot use
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(SimError::InvalidConfig("fps must be positive".to_string()));
        }
        if self.quality > 10 {
            return Err(SimError::InvalidConfig(format!(
                "quality must be within 0..=10, got {}",
                self.quality
            )));
        }
        if self.max_steps == 0 || self.raw_max_steps == 0 {
            return Err(SimError::InvalidConfig("step caps must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Options for the incremental writers
    #[must_use]
    pub fn incremental_video(&self) -> VideoOptions {
        VideoOptions {
            fps: self.fps,
            ffmpeg: self.ffmpeg.clone(),
            ..VideoOptions::default()
        }
    }

    /// Options for the batch MP4 encode
    #[must_use]
    pub fn batch_video(&self) -> VideoOptions {
        VideoOptions {
            quality: Some(self.quality),
            format: Some(VideoFormat::Mp4),
            ..self.incremental_video()
        }
    }
}
