//! Example: environment built from a config file, recorded until the
//! episode is over or the step cap is reached

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use simreel_core::{Environment, TrackedEnvironment};
use simreel_demo::{init_tracing, record_episode, DemoConfig, EpisodeOptions, FrameSource};
use simreel_env::make_env;
use simreel_viz::{ensure_output_dir, images_to_video_with};

const INCREMENTAL_VIDEO: &str = "config_example_incremental.mp4";
const BATCH_VIDEO: &str = "config_example_batch";

#[derive(Parser)]
#[command(name = "config_example")]
#[command(about = "Record one episode of a configured environment", version)]
struct Cli {
    /// JSON config file (defaults to the bundled cartpole_visual.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the config's output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn default_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs/cartpole_visual.json")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut config = DemoConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    ensure_output_dir(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let env = make_env(&config.env_id, config.environment.clone())
        .with_context(|| format!("Failed to create {}", config.env_id))?;
    let mut env = TrackedEnvironment::new(env);
    println!("Environment creation successful: {}", config.env_id);

    let options = EpisodeOptions {
        source: FrameSource::Observations {
            overlay: config.overlay,
        },
        ..EpisodeOptions::overlaid(config.max_steps)
    };
    let result = record_episode(
        &mut env,
        config.output_dir.join(INCREMENTAL_VIDEO),
        &options,
        config.incremental_video(),
    )
    .await;
    env.close().await.context("Failed to close environment")?;
    let recorded = result.context("Episode failed")?;

    println!(
        "Episode finished after {} steps ({:?}).",
        recorded.outcome.steps, recorded.outcome.termination
    );
    println!("Video saved: {}", recorded.video.path.display());

    if !recorded.outcome.frames.is_empty() {
        let path = images_to_video_with(
            &recorded.outcome.frames,
            &config.output_dir,
            BATCH_VIDEO,
            &config.batch_video(),
        )
        .context("Batch encode failed")?;
        println!("Video saved: {}", path.display());
    }

    Ok(())
}
