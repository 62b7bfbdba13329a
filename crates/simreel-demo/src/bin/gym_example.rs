//! Example: random agent in the visual CartPole, recorded three ways
//!
//! 1. Incremental MP4 of overlaid frames
//! 2. Batch MP4 of the same frames
//! 3. Incremental MP4 of the environment's raw camera render

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use simreel_core::{Environment, EnvironmentConfig, TrackedEnvironment};
use simreel_demo::{init_tracing, record_episode, DemoConfig, EpisodeOptions};
use simreel_env::{make_env, BoxedEnv, CARTPOLE_VISUAL};
use simreel_viz::{ensure_output_dir, images_to_video_with};

const INCREMENTAL_VIDEO: &str = "example_cartpole_incremental.mp4";
const BATCH_VIDEO: &str = "example_cartpole_batch";
const RAW_VIDEO: &str = "example_cartpole_raw.mp4";

/// Stop after 100 steps for demo
const OVERLAY_STEPS: usize = 100;
/// Shorter demo for raw video
const RAW_STEPS: usize = 50;

#[derive(Parser)]
#[command(name = "gym_example")]
#[command(about = "Record random CartPole episodes to video", version)]
struct Cli {
    /// Directory the videos are written to
    #[arg(long, default_value = "./data/example_videos")]
    output_dir: PathBuf,

    /// ffmpeg executable used for MP4 encoding
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = DemoConfig {
        env_id: CARTPOLE_VISUAL.to_string(),
        output_dir: cli.output_dir,
        max_steps: OVERLAY_STEPS,
        raw_max_steps: RAW_STEPS,
        ffmpeg: cli.ffmpeg,
        ..DemoConfig::default()
    };
    config.validate()?;

    // Create output directory for videos
    ensure_output_dir(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let env = make_env(&config.env_id, EnvironmentConfig::default())
        .context("Failed to create environment")?;
    let mut env = TrackedEnvironment::new(env);
    println!("Environment creation successful");

    let result = record_all(&mut env, &config).await;
    env.close().await.context("Failed to close environment")?;
    result?;

    println!("\n✅ All videos saved in: {}", config.output_dir.display());
    println!("📁 Files created:");
    println!("  • {INCREMENTAL_VIDEO} (with overlays)");
    println!("  • {BATCH_VIDEO}.mp4 (with overlays)");
    println!("  • {RAW_VIDEO} (raw sensor data)");

    Ok(())
}

async fn record_all(env: &mut TrackedEnvironment<BoxedEnv>, config: &DemoConfig) -> Result<()> {
    println!("Agent acting inside environment.");

    // Method 1: incremental writer, frames also kept for method 2
    let incremental_path = config.output_dir.join(INCREMENTAL_VIDEO);
    let recorded = record_episode(
        env,
        &incremental_path,
        &EpisodeOptions::overlaid(config.max_steps),
        config.incremental_video(),
    )
    .await
    .context("Overlay episode failed")?;

    println!("Episode finished after {} steps.", recorded.outcome.steps);
    if let Some(episode) = env.episode_info() {
        println!("   Episode {} reward: {:.2}", episode.id, episode.total_reward);
    }
    println!("Video saved using incremental writer: {}", recorded.video.path.display());

    // Method 2: batch encode of the collected frames
    if !recorded.outcome.frames.is_empty() {
        let path = images_to_video_with(
            &recorded.outcome.frames,
            &config.output_dir,
            BATCH_VIDEO,
            &config.batch_video(),
        )
        .context("Batch encode failed")?;
        println!("Video saved using batch encoder: {}", path.display());
    }

    // Method 3: raw camera renders
    println!("Recording raw sensor video...");
    let raw_path = config.output_dir.join(RAW_VIDEO);
    let raw = record_episode(
        env,
        &raw_path,
        &EpisodeOptions::raw(config.raw_max_steps),
        config.incremental_video(),
    )
    .await
    .context("Raw sensor episode failed")?;
    println!("Raw sensor video saved: {} ({} frames)", raw.video.path.display(), raw.video.frames);

    Ok(())
}
