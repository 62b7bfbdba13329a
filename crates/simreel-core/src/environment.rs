//! Environment traits and types

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Action, ActionSpace, Frame, Observations, Reward, SimError};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step {
    /// Observation from the environment
    pub observation: Observations,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode is done
    pub done: bool,
    /// Whether the episode was truncated (e.g., time limit)
    pub truncated: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

impl Step {
    /// Whether this step ended the episode for any reason
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.done || self.truncated
    }
}

/// Additional information / metrics from a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl StepInfo {
    /// Create an empty info map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a metric
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a metric
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether there are no metrics
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Flatten nested objects into `parent.child` keys.
    ///
    /// Only scalars (numbers, booleans, strings) survive; arrays and nulls
    /// are dropped. Keys keep the map's iteration order.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        flatten_into(&self.fields, "", &mut out);
        out
    }
}

fn flatten_into(map: &serde_json::Map<String, Value>, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(inner, &full, out),
            Value::Number(_) | Value::Bool(_) | Value::String(_) => out.push((full, value.clone())),
            Value::Array(_) | Value::Null => {}
        }
    }
}

/// How an environment should render itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Return the raw camera image as an RGB array
    RgbArray,
    /// Display in a window
    Human,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RgbArray => f.write_str("rgb_array"),
            Self::Human => f.write_str("human"),
        }
    }
}

impl FromStr for RenderMode {
    type Err = SimError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "rgb_array" => Ok(Self::RgbArray),
            "human" => Ok(Self::Human),
            other => Err(SimError::InvalidConfig(format!("unknown render mode: {other}"))),
        }
    }
}

/// Episode information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Episode ID
    pub id: String,
    /// Total reward
    pub total_reward: f64,
    /// Number of steps
    pub steps: usize,
    /// Whether episode was truncated
    pub truncated: bool,
    /// Start time
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// End time
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Configuration for environments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Random seed
    #[serde(default)]
    pub seed: Option<u64>,
    /// Maximum episode steps
    #[serde(default)]
    pub max_steps: Option<usize>,
    /// Render mode
    #[serde(default)]
    pub render_mode: Option<RenderMode>,
    /// Additional parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, Value>,
}

impl EnvironmentConfig {
    /// Read an unsigned integer parameter
    pub fn param_u32(&self, name: &str) -> crate::Result<Option<u32>> {
        match self.params.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| {
                    SimError::InvalidConfig(format!("parameter `{name}` must be a u32, got {value}"))
                }),
        }
    }
}

/// Core environment trait
#[async_trait]
pub trait Environment: Send + Sync {
    /// Get the action space
    fn action_space(&self) -> Box<dyn ActionSpace>;

    /// Reset the environment
    async fn reset(&mut self) -> crate::Result<(Observations, StepInfo)>;

    /// Take a step in the environment
    async fn step(&mut self, action: Action) -> crate::Result<Step>;

    /// Render the current scene
    async fn render(&self, mode: RenderMode) -> crate::Result<Frame> {
        Err(SimError::Environment(format!("render mode `{mode}` is not supported")))
    }

    /// Close the environment
    async fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }

    /// Whether the current episode has ended
    fn episode_over(&self) -> bool {
        false
    }

    /// Metrics for the current episode so far
    fn metrics(&self) -> StepInfo {
        StepInfo::default()
    }

    /// Get current episode info
    fn episode_info(&self) -> Option<Episode> {
        None
    }
}

#[async_trait]
impl<E> Environment for Box<E>
where
    E: Environment + ?Sized,
{
    fn action_space(&self) -> Box<dyn ActionSpace> {
        (**self).action_space()
    }

    async fn reset(&mut self) -> crate::Result<(Observations, StepInfo)> {
        (**self).reset().await
    }

    async fn step(&mut self, action: Action) -> crate::Result<Step> {
        (**self).step(action).await
    }

    async fn render(&self, mode: RenderMode) -> crate::Result<Frame> {
        (**self).render(mode).await
    }

    async fn close(&mut self) -> crate::Result<()> {
        (**self).close().await
    }

    fn episode_over(&self) -> bool {
        (**self).episode_over()
    }

    fn metrics(&self) -> StepInfo {
        (**self).metrics()
    }

    fn episode_info(&self) -> Option<Episode> {
        (**self).episode_info()
    }
}

/// Wrapper for environments that tracks episodes
pub struct TrackedEnvironment<E> {
    /// Inner environment
    pub env: E,
    /// Current episode
    pub episode: Option<Episode>,
    /// Step counter
    pub step_count: usize,
    over: bool,
}

impl<E> TrackedEnvironment<E> {
    /// Create a new tracked environment
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode: None,
            step_count: 0,
            over: false,
        }
    }
}

#[async_trait]
impl<E> Environment for TrackedEnvironment<E>
where
    E: Environment,
{
    fn action_space(&self) -> Box<dyn ActionSpace> {
        self.env.action_space()
    }

    async fn reset(&mut self) -> crate::Result<(Observations, StepInfo)> {
        // End current episode if exists
        if let Some(ref mut episode) = self.episode {
            if episode.end_time.is_none() {
                episode.end_time = Some(chrono::Utc::now());
            }
        }

        let reset = self.env.reset().await?;

        self.episode = Some(Episode {
            id: uuid::Uuid::new_v4().to_string(),
            total_reward: 0.0,
            steps: 0,
            truncated: false,
            start_time: chrono::Utc::now(),
            end_time: None,
        });
        self.step_count = 0;
        self.over = false;

        Ok(reset)
    }

    async fn step(&mut self, action: Action) -> crate::Result<Step> {
        if self.over {
            return Err(SimError::Environment(
                "episode is over, call reset() before stepping".to_string(),
            ));
        }

        let step = self.env.step(action).await?;

        self.step_count += 1;
        if let Some(ref mut episode) = self.episode {
            episode.total_reward += step.reward.value();
            episode.steps = self.step_count;

            if step.is_terminal() {
                episode.truncated = step.truncated;
                episode.end_time = Some(chrono::Utc::now());
                tracing::debug!(
                    episode = %episode.id,
                    steps = episode.steps,
                    total_reward = episode.total_reward,
                    truncated = episode.truncated,
                    "episode ended"
                );
            }
        }
        if step.is_terminal() {
            self.over = true;
        }

        Ok(step)
    }

    async fn render(&self, mode: RenderMode) -> crate::Result<Frame> {
        self.env.render(mode).await
    }

    async fn close(&mut self) -> crate::Result<()> {
        self.env.close().await
    }

    fn episode_over(&self) -> bool {
        self.over || self.env.episode_over()
    }

    fn metrics(&self) -> StepInfo {
        self.env.metrics()
    }

    fn episode_info(&self) -> Option<Episode> {
        self.episode.clone()
    }
}
