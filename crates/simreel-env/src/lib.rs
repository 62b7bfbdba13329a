//! Headless visual simulation environments for simreel
//!
//! This crate provides:
//! - A cart-pole simulator with colour, depth and state sensors
//! - An id-based registry ([`make_env`]) in the style of `gym.make`
//! - Wrappers such as [`TimeLimit`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod camera;
pub mod classic;
pub mod registry;
pub mod wrappers;

// Re-export environments
pub use classic::{CartPoleConfig, CartPoleEnv, DEPTH_SENSOR, RGB_SENSOR, STATE_SENSOR};
pub use registry::{list_envs, make_env, register_env, BoxedEnv, EnvRegistry, CARTPOLE_VISUAL};
pub use wrappers::TimeLimit;

// Re-export core types
pub use simreel_core::{
    Action, ActionSpace, Environment, EnvironmentConfig, Episode, Observations, RenderMode,
    Reward, Step, StepInfo,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{make_env, CartPoleEnv, EnvRegistry, TimeLimit, CARTPOLE_VISUAL};
    pub use simreel_core::prelude::*;
}
