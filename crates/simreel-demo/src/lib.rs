//! Episode driver and demo programs for simreel
//!
//! [`run_episode`] steps an environment with uniformly random actions and
//! turns every step into a frame; [`record_episode`] wraps it with a reset
//! and an incremental video writer that is always closed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod driver;
pub mod logging;

pub use config::DemoConfig;
pub use driver::{
    record_episode, run_episode, EpisodeOptions, EpisodeOutcome, FrameSource, RecordedEpisode,
    Termination,
};
pub use logging::init_tracing;
