//! Episode driver: step an environment with random actions and turn every
//! step into a video frame.

use std::path::Path;

use tracing::{debug, info};

use simreel_core::{Environment, Frame, RenderMode, Result, Reward, SimError};
use simreel_viz::{observations_to_image, overlay_frame, FrameSink, VideoOptions, VideoSummary, VideoWriter};

/// Where each frame comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    /// Lay out the step's visual sensors, optionally with a metric overlay
    Observations {
        /// Draw the step info on the frame
        overlay: bool,
    },
    /// Ask the environment for its own RGB render
    RawSensor,
}

/// Per-episode settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeOptions {
    /// Upper bound on environment steps
    pub max_steps: usize,
    /// Frame source
    pub source: FrameSource,
    /// Keep every frame in memory for a batch encode
    pub collect_frames: bool,
}

impl EpisodeOptions {
    /// Overlaid observation frames, collected for a batch encode
    #[must_use]
    pub fn overlaid(max_steps: usize) -> Self {
        Self {
            max_steps,
            source: FrameSource::Observations { overlay: true },
            collect_frames: true,
        }
    }

    /// Raw environment renders, streamed only
    #[must_use]
    pub fn raw(max_steps: usize) -> Self {
        Self {
            max_steps,
            source: FrameSource::RawSensor,
            collect_frames: false,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(SimError::InvalidConfig("max_steps must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Why the episode loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The environment reported the end of the episode
    Environment,
    /// The step cap was reached first
    StepBudget,
}

/// Result of [`run_episode`]
#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    /// Frames in step order; empty unless `collect_frames` was set
    pub frames: Vec<Frame>,
    /// Environment steps taken
    pub steps: usize,
    /// Sum of rewards
    pub total_reward: f64,
    /// Why the loop stopped
    pub termination: Termination,
}

/// Result of [`record_episode`]
#[derive(Debug, Clone)]
pub struct RecordedEpisode {
    /// Episode loop outcome
    pub outcome: EpisodeOutcome,
    /// The finalized incremental video
    pub video: VideoSummary,
}

/// Step an already-reset environment until it signals the end of the
/// episode or `max_steps` is reached, writing one frame per step to `sink`.
pub async fn run_episode<E, S>(
    env: &mut E,
    sink: &mut S,
    options: &EpisodeOptions,
) -> Result<EpisodeOutcome>
where
    E: Environment + ?Sized,
    S: FrameSink + ?Sized,
{
    options.validate()?;

    let action_space = env.action_space();
    let mut frames = Vec::new();
    let mut steps = 0;
    let mut total_reward = Reward::default();
    let mut terminal = false;

    while !terminal && steps < options.max_steps {
        let step = env.step(action_space.sample()).await?;

        let frame = match options.source {
            FrameSource::Observations { overlay } => {
                let frame = observations_to_image(&step.observation, &step.info)?;
                if overlay {
                    overlay_frame(&frame, &step.info)?
                } else {
                    frame
                }
            }
            FrameSource::RawSensor => env.render(RenderMode::RgbArray).await?,
        };

        sink.write_frame(&frame)?;
        if options.collect_frames {
            frames.push(frame);
        }

        steps += 1;
        total_reward += step.reward;
        terminal = step.is_terminal() || env.episode_over();
        debug!(step = steps, reward = step.reward.value(), terminal, "episode step");
    }

    let termination = if terminal {
        Termination::Environment
    } else {
        Termination::StepBudget
    };
    let total_reward = total_reward.value();
    info!(steps, total_reward, ?termination, "episode finished");

    Ok(EpisodeOutcome {
        frames,
        steps,
        total_reward,
        termination,
    })
}

/// Reset the environment once, record one episode into `video_path`, and
/// close the writer whether or not the episode succeeded.
pub async fn record_episode<E>(
    env: &mut E,
    video_path: impl AsRef<Path>,
    options: &EpisodeOptions,
    video: VideoOptions,
) -> Result<RecordedEpisode>
where
    E: Environment + ?Sized,
{
    options.validate()?;
    env.reset().await?;

    let mut writer = VideoWriter::open_with(video_path, video)?;
    let outcome = run_episode(env, &mut writer, options).await;
    let closed = writer.close();

    // An episode error wins over the follow-up close error
    let outcome = outcome?;
    Ok(RecordedEpisode {
        outcome,
        video: closed?,
    })
}
