//! Classic control environments with camera observations

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use simreel_core::{
    Action, ActionSpace, DiscreteSpace, Environment, EnvironmentConfig, Frame, Observations,
    RenderMode, Result, Reward, SensorReading, SimError, Step, StepInfo,
};

use crate::camera::{self, SceneView};

/// Sensor name of the colour camera
pub const RGB_SENSOR: &str = "rgb";
/// Sensor name of the depth camera
pub const DEPTH_SENSOR: &str = "depth";
/// Sensor name of the raw state vector
pub const STATE_SENSOR: &str = "state";

/// Largest accepted camera side in pixels
pub const MAX_CAMERA_SIDE: u32 = 8192;

/// CartPole environment rendered through a headless camera
pub struct CartPoleEnv {
    /// Current state
    state: CartPoleState,
    /// Configuration
    config: CartPoleConfig,
    /// Step count
    steps: usize,
    rng: StdRng,
    actions: DiscreteSpace,
    last_info: StepInfo,
    over: bool,
}

#[derive(Debug, Clone, Default)]
struct CartPoleState {
    x: f64,          // Cart position
    x_dot: f64,      // Cart velocity
    theta: f64,      // Pole angle
    theta_dot: f64,  // Pole angular velocity
}

/// Physical and camera parameters of [`CartPoleEnv`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CartPoleConfig {
    /// Gravitational acceleration
    pub gravity: f64,
    /// Cart mass
    pub mass_cart: f64,
    /// Pole mass
    pub mass_pole: f64,
    /// Half the pole length
    pub length: f64,
    /// Magnitude of the push force
    pub force_mag: f64,
    /// Integration time step
    pub tau: f64,
    /// Steps before the episode is truncated
    pub max_steps: usize,
    /// Cart position at which the episode fails
    pub x_threshold: f64,
    /// Pole angle (radians) at which the episode fails
    pub theta_threshold: f64,
    /// Camera width in pixels
    pub width: u32,
    /// Camera height in pixels
    pub height: u32,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            mass_cart: 1.0,
            mass_pole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            max_steps: 500,
            x_threshold: 2.4,
            theta_threshold: 12.0_f64.to_radians(),
            width: 256,
            height: 256,
        }
    }
}

impl CartPoleEnv {
    /// Create a new CartPole environment.
    ///
    /// `width` / `height` params set the camera size and `seed` makes resets
    /// reproducible. The simulator is headless, so a `human` render mode is
    /// rejected.
    pub fn new(config: EnvironmentConfig) -> Result<Self> {
        if config.render_mode == Some(RenderMode::Human) {
            return Err(SimError::InvalidConfig(
                "CartPole runs headless; render_mode must be rgb_array".to_string(),
            ));
        }
        let mut cart = CartPoleConfig::default();
        if let Some(width) = config.param_u32("width")? {
            cart.width = width;
        }
        if let Some(height) = config.param_u32("height")? {
            cart.height = height;
        }
        Self::with_config(cart, config.seed)
    }

    /// Create from an explicit [`CartPoleConfig`]
    pub fn with_config(config: CartPoleConfig, seed: Option<u64>) -> Result<Self> {
        let side_ok = |side: u32| (1..=MAX_CAMERA_SIDE).contains(&side);
        if !side_ok(config.width) || !side_ok(config.height) {
            return Err(SimError::InvalidConfig(format!(
                "camera size must be within 1..={MAX_CAMERA_SIDE} per side, got {}x{}",
                config.width, config.height
            )));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            state: CartPoleState::default(),
            config,
            steps: 0,
            rng,
            actions: DiscreteSpace::new(2)?, // 0: push left, 1: push right
            last_info: StepInfo::default(),
            over: false,
        })
    }

    fn view(&self) -> SceneView {
        SceneView {
            x: self.state.x,
            theta: self.state.theta,
            half_length: self.config.length,
            x_threshold: self.config.x_threshold,
        }
    }

    fn get_observation(&self) -> Result<Observations> {
        let rgb = camera::render_rgb(&self.view(), self.config.width, self.config.height)?;
        let depth = camera::depth_from_rgb(&rgb);
        Ok(Observations::new()
            .with(RGB_SENSOR, SensorReading::Color(rgb))
            .with(DEPTH_SENSOR, SensorReading::Depth(depth))
            .with(
                STATE_SENSOR,
                SensorReading::Vector(vec![
                    self.state.x,
                    self.state.x_dot,
                    self.state.theta,
                    self.state.theta_dot,
                ]),
            ))
    }

    fn get_info(&self) -> StepInfo {
        StepInfo::new()
            .with("cart_position", self.state.x)
            .with("pole_angle", self.state.theta)
            .with("steps", self.steps)
            .with(
                "balance",
                json!({
                    "upright": self.state.theta.abs() < self.config.theta_threshold / 2.0,
                    "centered": self.state.x.abs() < 0.5,
                }),
            )
    }

    fn failed(&self) -> bool {
        self.state.x.abs() > self.config.x_threshold
            || self.state.theta.abs() > self.config.theta_threshold
    }
}

#[async_trait]
impl Environment for CartPoleEnv {
    fn action_space(&self) -> Box<dyn ActionSpace> {
        Box::new(self.actions.clone())
    }

    async fn reset(&mut self) -> Result<(Observations, StepInfo)> {
        self.state = CartPoleState {
            x: self.rng.gen_range(-0.05..0.05),
            x_dot: self.rng.gen_range(-0.05..0.05),
            theta: self.rng.gen_range(-0.05..0.05),
            theta_dot: self.rng.gen_range(-0.05..0.05),
        };
        self.steps = 0;
        self.over = false;
        self.last_info = self.get_info();

        Ok((self.get_observation()?, self.last_info.clone()))
    }

    async fn step(&mut self, action: Action) -> Result<Step> {
        if self.over {
            return Err(SimError::Environment(
                "episode is over, call reset() before stepping".to_string(),
            ));
        }
        let push_right = match action.as_discrete() {
            Some(1) => true,
            Some(0) => false,
            _ => return Err(SimError::InvalidAction(format!("{action:?} for CartPole"))),
        };

        // Physics simulation
        let force = if push_right {
            self.config.force_mag
        } else {
            -self.config.force_mag
        };

        let cos_theta = self.state.theta.cos();
        let sin_theta = self.state.theta.sin();

        let total_mass = self.config.mass_cart + self.config.mass_pole;
        let pole_mass_length = self.config.mass_pole * self.config.length;

        let temp = (force + pole_mass_length * self.state.theta_dot.powi(2) * sin_theta) / total_mass;
        let theta_acc = (self.config.gravity * sin_theta - cos_theta * temp)
            / (self.config.length
                * (4.0 / 3.0 - self.config.mass_pole * cos_theta.powi(2) / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        // Explicit Euler
        let dt = self.config.tau;
        self.state.x += dt * self.state.x_dot;
        self.state.x_dot += dt * x_acc;
        self.state.theta += dt * self.state.theta_dot;
        self.state.theta_dot += dt * theta_acc;

        self.steps += 1;

        let done = self.failed();
        let truncated = !done && self.steps >= self.config.max_steps;
        self.over = done || truncated;
        self.last_info = self.get_info();

        debug!(
            step = self.steps,
            x = self.state.x,
            theta = self.state.theta,
            done,
            truncated,
            "cartpole step"
        );

        Ok(Step {
            observation: self.get_observation()?,
            reward: Reward(1.0), // Reward of 1 for each step survived
            done,
            truncated,
            info: self.last_info.clone(),
        })
    }

    async fn render(&self, mode: RenderMode) -> Result<Frame> {
        match mode {
            RenderMode::RgbArray => {
                camera::render_rgb(&self.view(), self.config.width, self.config.height)
            }
            RenderMode::Human => Err(SimError::Environment(
                "CartPole runs headless; use rgb_array".to_string(),
            )),
        }
    }

    fn episode_over(&self) -> bool {
        self.over
    }

    fn metrics(&self) -> StepInfo {
        self.last_info.clone()
    }
}
