//! Episode driver behaviour against a scripted environment

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use async_trait::async_trait;
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Rgb, RgbImage};
use proptest::prelude::*;

use simreel_core::{
    Action, ActionSpace, DiscreteSpace, Environment, EnvironmentConfig, Frame, Observations,
    RenderMode, Result, Reward, SensorReading, SimError, Step, StepInfo,
};
use simreel_demo::{record_episode, run_episode, EpisodeOptions, FrameSource, Termination};
use simreel_env::{make_env, CARTPOLE_VISUAL};
use simreel_viz::VideoOptions;

/// Environment that ends on a fixed step (or never) and counts its calls
#[derive(Default)]
struct ScriptedEnv {
    terminal_at: Option<usize>,
    over_at: Option<usize>,
    fail_at: Option<usize>,
    resets: usize,
    steps: usize,
    renders: std::sync::atomic::AtomicUsize,
}

impl ScriptedEnv {
    fn terminal_at(step: usize) -> Self {
        Self {
            terminal_at: Some(step),
            ..Self::default()
        }
    }

    fn camera(&self) -> Frame {
        let shade = u8::try_from(self.steps % 256).unwrap();
        RgbImage::from_pixel(8, 8, Rgb([shade, 64, 128]))
    }
}

#[async_trait]
impl Environment for ScriptedEnv {
    fn action_space(&self) -> Box<dyn ActionSpace> {
        Box::new(DiscreteSpace::new(4).unwrap())
    }

    async fn reset(&mut self) -> Result<(Observations, StepInfo)> {
        self.resets += 1;
        self.steps = 0;
        let obs = Observations::new().with("rgb", SensorReading::Color(self.camera()));
        Ok((obs, StepInfo::new()))
    }

    async fn step(&mut self, action: Action) -> Result<Step> {
        assert!(DiscreteSpace::new(4).unwrap().contains(&action));
        self.steps += 1;
        if self.fail_at == Some(self.steps) {
            return Err(SimError::Environment("simulator crashed".to_string()));
        }
        Ok(Step {
            observation: Observations::new().with("rgb", SensorReading::Color(self.camera())),
            reward: Reward(0.5),
            done: self.terminal_at == Some(self.steps),
            truncated: false,
            info: StepInfo::new(),
        })
    }

    async fn render(&self, mode: RenderMode) -> Result<Frame> {
        assert_eq!(mode, RenderMode::RgbArray);
        self.renders.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.camera())
    }

    fn episode_over(&self) -> bool {
        self.over_at.is_some_and(|n| self.steps >= n)
    }
}

fn gif_frames(path: &Path) -> usize {
    let decoder = GifDecoder::new(BufReader::new(File::open(path).unwrap())).unwrap();
    decoder.into_frames().count()
}

fn gif_options() -> VideoOptions {
    VideoOptions::with_fps(30)
}

#[tokio::test]
async fn test_step_cap_without_terminal() {
    let mut env = ScriptedEnv::default();
    let mut sink: Vec<Frame> = Vec::new();

    let outcome = run_episode(&mut env, &mut sink, &EpisodeOptions::overlaid(5))
        .await
        .unwrap();

    assert_eq!(outcome.steps, 5);
    assert_eq!(env.steps, 5);
    assert_eq!(outcome.frames.len(), 5);
    assert_eq!(sink.len(), 5);
    assert_eq!(outcome.termination, Termination::StepBudget);
    assert!((outcome.total_reward - 2.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_environment_terminal_stops_loop() {
    let mut env = ScriptedEnv::terminal_at(3);
    let mut sink: Vec<Frame> = Vec::new();

    let outcome = run_episode(&mut env, &mut sink, &EpisodeOptions::overlaid(100))
        .await
        .unwrap();

    assert_eq!(outcome.steps, 3);
    assert_eq!(env.steps, 3, "no step after the terminal one");
    assert_eq!(outcome.frames.len(), 3);
    assert_eq!(outcome.termination, Termination::Environment);
}

#[tokio::test]
async fn test_episode_over_query_stops_loop() {
    let mut env = ScriptedEnv {
        over_at: Some(2),
        ..ScriptedEnv::default()
    };
    let mut sink: Vec<Frame> = Vec::new();

    let outcome = run_episode(&mut env, &mut sink, &EpisodeOptions::overlaid(1000))
        .await
        .unwrap();

    assert_eq!(outcome.steps, 2);
    assert_eq!(outcome.termination, Termination::Environment);
}

#[tokio::test]
async fn test_terminal_on_last_allowed_step_counts_as_environment() {
    let mut env = ScriptedEnv::terminal_at(4);
    let mut sink: Vec<Frame> = Vec::new();

    let outcome = run_episode(&mut env, &mut sink, &EpisodeOptions::overlaid(4))
        .await
        .unwrap();

    assert_eq!(outcome.steps, 4);
    assert_eq!(outcome.termination, Termination::Environment);
}

#[tokio::test]
async fn test_zero_step_cap_rejected() {
    let mut env = ScriptedEnv::default();
    let dir = tempfile::tempdir().unwrap();

    let result = record_episode(
        &mut env,
        dir.path().join("never.gif"),
        &EpisodeOptions::overlaid(0),
        gif_options(),
    )
    .await;

    assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    assert_eq!(env.resets, 0);
    assert_eq!(env.steps, 0);
}

#[tokio::test]
async fn test_record_episode_resets_once_and_writes_every_frame() {
    let mut env = ScriptedEnv::default();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("episode.gif");

    let recorded = record_episode(&mut env, &path, &EpisodeOptions::overlaid(5), gif_options())
        .await
        .unwrap();

    assert_eq!(env.resets, 1);
    assert_eq!(recorded.outcome.steps, 5);
    assert_eq!(recorded.outcome.frames.len(), 5);
    assert_eq!(recorded.video.frames, 5);
    assert_eq!(recorded.video.fps, 30);
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    assert_eq!(gif_frames(&path), 5);
}

#[tokio::test]
async fn test_raw_sensor_variant_streams_renders() {
    let mut env = ScriptedEnv::terminal_at(7);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.gif");

    let recorded = record_episode(&mut env, &path, &EpisodeOptions::raw(50), gif_options())
        .await
        .unwrap();

    assert_eq!(recorded.outcome.steps, 7);
    assert!(recorded.outcome.frames.is_empty());
    assert_eq!(env.renders.load(std::sync::atomic::Ordering::SeqCst), 7);
    assert_eq!(gif_frames(&path), 7);
}

#[tokio::test]
async fn test_step_failure_propagates_and_video_is_closed() {
    let mut env = ScriptedEnv {
        fail_at: Some(4),
        ..ScriptedEnv::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crash.gif");

    let err = record_episode(&mut env, &path, &EpisodeOptions::overlaid(10), gif_options())
        .await
        .unwrap_err();

    assert!(matches!(err, SimError::Environment(_)));
    // Frames written before the failure are still a complete file
    assert_eq!(gif_frames(&path), 3);
}

#[tokio::test]
async fn test_cartpole_pipeline_end_to_end() {
    let config: EnvironmentConfig =
        serde_json::from_value(serde_json::json!({"seed": 11, "width": 48, "height": 32})).unwrap();
    let mut env = make_env(CARTPOLE_VISUAL, config).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cartpole.gif");

    let options = EpisodeOptions {
        source: FrameSource::Observations { overlay: false },
        ..EpisodeOptions::overlaid(20)
    };
    let recorded = record_episode(&mut env, &path, &options, gif_options())
        .await
        .unwrap();

    assert!(recorded.outcome.steps >= 1 && recorded.outcome.steps <= 20);
    // rgb and depth panels side by side
    assert_eq!(recorded.outcome.frames[0].dimensions(), (96, 32));
    assert_eq!(gif_frames(&path), recorded.outcome.steps);
    env.close().await.unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn loop_never_exceeds_cap(cap in 1usize..40, terminal in proptest::option::of(1usize..60)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let mut env = ScriptedEnv { terminal_at: terminal, ..ScriptedEnv::default() };
        let mut sink: Vec<Frame> = Vec::new();

        let outcome = runtime
            .block_on(run_episode(&mut env, &mut sink, &EpisodeOptions::overlaid(cap)))
            .unwrap();

        let expected = terminal.map_or(cap, |t| t.min(cap));
        prop_assert_eq!(outcome.steps, expected);
        prop_assert_eq!(env.steps, expected);
        prop_assert_eq!(outcome.frames.len(), outcome.steps);
        prop_assert_eq!(sink.len(), outcome.steps);
    }
}
