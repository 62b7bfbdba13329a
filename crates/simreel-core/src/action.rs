//! Action representations and action spaces

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Action accepted by an environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Index into a discrete action set
    Discrete(usize),
    /// Continuous control vector
    Continuous(Vec<f64>),
}

impl Action {
    /// Discrete index, if this is a discrete action
    #[must_use]
    pub fn as_discrete(&self) -> Option<usize> {
        match self {
            Self::Discrete(index) => Some(*index),
            Self::Continuous(_) => None,
        }
    }
}

/// Trait for defining action spaces
pub trait ActionSpace: Debug + Send + Sync {
    /// Sample an action uniformly at random from the space
    fn sample(&self) -> Action;

    /// Check if an action is valid within this space
    fn contains(&self, action: &Action) -> bool;

    /// Get the dimensionality of the action space
    fn dim(&self) -> Option<usize>;
}

/// Discrete action space
#[derive(Debug, Clone)]
pub struct DiscreteSpace {
    n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete action space; `n` must be positive
    pub fn new(n: usize) -> crate::Result<Self> {
        if n == 0 {
            return Err(crate::SimError::InvalidConfig(
                "discrete space needs at least one action".to_string(),
            ));
        }
        Ok(Self { n })
    }

    /// Number of discrete actions
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }
}

impl ActionSpace for DiscreteSpace {
    fn sample(&self) -> Action {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Action::Discrete(rng.gen_range(0..self.n))
    }

    fn contains(&self, action: &Action) -> bool {
        matches!(action, Action::Discrete(index) if *index < self.n)
    }

    fn dim(&self) -> Option<usize> {
        Some(1)
    }
}

/// Continuous action space (box)
#[derive(Debug, Clone)]
pub struct ContinuousSpace {
    /// Lower bounds for each dimension
    pub low: Vec<f64>,
    /// Upper bounds for each dimension
    pub high: Vec<f64>,
}

impl ContinuousSpace {
    /// Create a new continuous action space
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> crate::Result<Self> {
        if low.len() != high.len() {
            return Err(crate::SimError::dimension_mismatch(low.len(), high.len()));
        }
        if low.iter().zip(&high).any(|(l, h)| l > h) {
            return Err(crate::SimError::InvalidConfig(
                "lower bound exceeds upper bound".to_string(),
            ));
        }
        Ok(Self { low, high })
    }
}

impl ActionSpace for ContinuousSpace {
    fn sample(&self) -> Action {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        let values: Vec<f64> = self
            .low
            .iter()
            .zip(&self.high)
            .map(|(l, h)| rng.gen_range(*l..=*h))
            .collect();

        Action::Continuous(values)
    }

    fn contains(&self, action: &Action) -> bool {
        match action {
            Action::Continuous(values) => {
                values.len() == self.low.len()
                    && values
                        .iter()
                        .zip(&self.low)
                        .zip(&self.high)
                        .all(|((x, l), h)| x >= l && x <= h)
            }
            Action::Discrete(_) => false,
        }
    }

    fn dim(&self) -> Option<usize> {
        Some(self.low.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_discrete_rejects_continuous() {
        let space = DiscreteSpace::new(3).unwrap();
        assert!(space.contains(&Action::Discrete(2)));
        assert!(!space.contains(&Action::Discrete(3)));
        assert!(!space.contains(&Action::Continuous(vec![0.0])));
    }

    #[test]
    fn test_empty_discrete_space_rejected() {
        assert!(matches!(
            DiscreteSpace::new(0),
            Err(crate::SimError::InvalidConfig(_))
        ));
        assert_eq!(DiscreteSpace::new(1).unwrap().n(), 1);
    }

    #[test]
    fn test_as_discrete() {
        assert_eq!(Action::Discrete(4).as_discrete(), Some(4));
        assert_eq!(Action::Continuous(vec![0.1]).as_discrete(), None);
    }

    #[test]
    fn test_continuous_bounds_validated() {
        assert!(ContinuousSpace::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(ContinuousSpace::new(vec![2.0], vec![1.0]).is_err());
        assert!(ContinuousSpace::new(vec![1.0], vec![1.0]).is_ok());
    }

    proptest! {
        #[test]
        fn discrete_samples_stay_in_space(n in 1usize..64) {
            let space = DiscreteSpace::new(n).unwrap();
            for _ in 0..16 {
                prop_assert!(space.contains(&space.sample()));
            }
        }

        #[test]
        fn continuous_samples_stay_in_space(
            bounds in proptest::collection::vec((-10.0f64..0.0, 0.0f64..10.0), 1..6)
        ) {
            let (low, high): (Vec<f64>, Vec<f64>) = bounds.into_iter().unzip();
            let space = ContinuousSpace::new(low, high).unwrap();
            prop_assert!(space.contains(&space.sample()));
        }
    }
}
