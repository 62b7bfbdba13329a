//! Core environment traits and types for simreel
//!
//! This crate provides the foundational abstractions shared by the
//! simulators, the frame renderer and the episode driver: the async
//! [`Environment`] trait, action spaces, sensor observations and the
//! common error type.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod environment;
pub mod error;
pub mod observation;
pub mod reward;

// Re-export core traits and types
pub use action::{Action, ActionSpace, ContinuousSpace, DiscreteSpace};
pub use environment::{
    Environment, EnvironmentConfig, Episode, RenderMode, Step, StepInfo, TrackedEnvironment,
};
pub use error::{Result, SimError};
pub use observation::{DepthImage, Frame, Observations, SensorReading};
pub use reward::Reward;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSpace, Environment, EnvironmentConfig, Frame, Observations, RenderMode,
        Result, Reward, SensorReading, SimError, Step, StepInfo,
    };
}
