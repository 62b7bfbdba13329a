//! Environment registry for creating environments by id

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use simreel_core::{Environment, EnvironmentConfig, Result, SimError};
use tracing::info;

use crate::classic::CartPoleEnv;
use crate::wrappers::TimeLimit;

/// Type-erased environment handed out by the registry
pub type BoxedEnv = Box<dyn Environment>;

type EnvConstructor = Box<dyn Fn(EnvironmentConfig) -> Result<BoxedEnv> + Send + Sync>;

/// Id of the built-in visual cart-pole
pub const CARTPOLE_VISUAL: &str = "CartPoleVisual-v0";

lazy_static::lazy_static! {
    static ref REGISTRY: Arc<Mutex<EnvRegistry>> = Arc::new(Mutex::new(EnvRegistry::with_builtins()));
}

/// Environment registry
pub struct EnvRegistry {
    /// Registered environments
    envs: HashMap<String, EnvConstructor>,
}

impl EnvRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            envs: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in environments
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(CARTPOLE_VISUAL, |config| {
            Ok(Box::new(CartPoleEnv::new(config)?) as BoxedEnv)
        });
        registry
    }

    /// Register an environment
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(EnvironmentConfig) -> Result<BoxedEnv> + Send + Sync + 'static,
    {
        self.envs.insert(name.into(), Box::new(constructor));
    }

    /// Create an environment by name.
    ///
    /// When `config.max_steps` is set the environment is wrapped in a
    /// [`TimeLimit`].
    pub fn make(&self, name: &str, config: EnvironmentConfig) -> Result<BoxedEnv> {
        let constructor = self
            .envs
            .get(name)
            .ok_or_else(|| SimError::Environment(format!("Unknown environment: {name}")))?;
        let max_steps = config.max_steps;
        let env = constructor(config)?;

        info!(env = name, ?max_steps, "environment created");
        Ok(match max_steps {
            Some(limit) => Box::new(TimeLimit::new(env, limit)),
            None => env,
        })
    }

    /// List registered environments, sorted
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.envs.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for EnvRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn global() -> MutexGuard<'static, EnvRegistry> {
    // A panic inside a constructor must not disable the registry
    REGISTRY.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Register an environment globally
pub fn register_env<F>(name: impl Into<String>, constructor: F)
where
    F: Fn(EnvironmentConfig) -> Result<BoxedEnv> + Send + Sync + 'static,
{
    global().register(name, constructor);
}

/// Create an environment by name
pub fn make_env(name: &str, config: EnvironmentConfig) -> Result<BoxedEnv> {
    global().make(name, config)
}

/// List all registered environments
#[must_use]
pub fn list_envs() -> Vec<String> {
    global().list()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use simreel_core::Action;

    fn tiny() -> EnvironmentConfig {
        serde_json::from_value(json!({"width": 16, "height": 16, "seed": 9})).unwrap()
    }

    #[test]
    fn test_unknown_env() {
        assert!(matches!(
            make_env("NoSuchEnv-v9", EnvironmentConfig::default()),
            Err(SimError::Environment(_))
        ));
    }

    #[test]
    fn test_builtins_listed() {
        assert!(list_envs().contains(&CARTPOLE_VISUAL.to_string()));
    }

    #[tokio::test]
    async fn test_make_applies_time_limit() {
        let mut config = tiny();
        config.max_steps = Some(1);
        let mut env = make_env(CARTPOLE_VISUAL, config).unwrap();

        env.reset().await.unwrap();
        let step = env.step(Action::Discrete(0)).await.unwrap();
        assert!(step.truncated);
        assert!(env.episode_over());
    }

    #[tokio::test]
    async fn test_global_registration() {
        register_env("SmallCartPole-v0", |mut config| {
            config.params.insert("width".to_string(), json!(8));
            config.params.insert("height".to_string(), json!(8));
            Ok(Box::new(CartPoleEnv::new(config)?) as BoxedEnv)
        });
        assert!(list_envs().contains(&"SmallCartPole-v0".to_string()));

        let env = make_env("SmallCartPole-v0", EnvironmentConfig::default()).unwrap();
        let frame = env.render(simreel_core::RenderMode::RgbArray).await.unwrap();
        assert_eq!(frame.dimensions(), (8, 8));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = EnvRegistry::new();
        assert!(registry.list().is_empty());
        registry.register("Custom-v0", |config| {
            Ok(Box::new(CartPoleEnv::new(config)?) as BoxedEnv)
        });
        assert_eq!(registry.list(), vec!["Custom-v0".to_string()]);
        assert!(registry.make("Custom-v0", tiny()).is_ok());
    }
}
