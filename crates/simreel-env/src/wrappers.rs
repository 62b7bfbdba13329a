//! Environment wrappers

use async_trait::async_trait;

use simreel_core::{
    Action, ActionSpace, Environment, Episode, Frame, Observations, RenderMode, Step, StepInfo,
};

/// Time limit wrapper
pub struct TimeLimit<E> {
    /// Inner environment
    pub env: E,
    /// Maximum steps
    pub max_steps: usize,
    /// Current step count
    pub steps: usize,
}

impl<E> TimeLimit<E> {
    /// Create a new time limit wrapper
    pub fn new(env: E, max_steps: usize) -> Self {
        Self {
            env,
            max_steps,
            steps: 0,
        }
    }
}

#[async_trait]
impl<E> Environment for TimeLimit<E>
where
    E: Environment,
{
    fn action_space(&self) -> Box<dyn ActionSpace> {
        self.env.action_space()
    }

    async fn reset(&mut self) -> simreel_core::Result<(Observations, StepInfo)> {
        self.steps = 0;
        self.env.reset().await
    }

    async fn step(&mut self, action: Action) -> simreel_core::Result<Step> {
        self.steps += 1;
        let mut step = self.env.step(action).await?;

        if self.steps >= self.max_steps && !step.done {
            step.truncated = true;
            step.done = true;
        }

        Ok(step)
    }

    async fn render(&self, mode: RenderMode) -> simreel_core::Result<Frame> {
        self.env.render(mode).await
    }

    async fn close(&mut self) -> simreel_core::Result<()> {
        self.env.close().await
    }

    fn episode_over(&self) -> bool {
        self.steps >= self.max_steps || self.env.episode_over()
    }

    fn metrics(&self) -> StepInfo {
        self.env.metrics()
    }

    fn episode_info(&self) -> Option<Episode> {
        self.env.episode_info()
    }
}
