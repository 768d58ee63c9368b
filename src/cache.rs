use ndarray::Array1;

use crate::error::CacheError;
use crate::memory::ReplayMemory;
use crate::transition::Transition;

/// Transitions of the current episode, waiting for their final reward before
/// they reach the replay memory.
#[derive(Debug, Clone, Default)]
pub struct PendingCache {
    transitions: Vec<Transition>,
    feature_len: Option<usize>,
}

impl PendingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose feature length is fixed up front, e.g. to a network's
    /// input width. With `None` the first staged feature fixes it.
    pub fn with_feature_len(feature_len: Option<usize>) -> Self {
        Self {
            transitions: Vec::new(),
            feature_len,
        }
    }

    /// The first staged feature fixes the feature length for the session,
    /// unless the cache was built with one.
    pub fn stage(
        &mut self,
        feature: Array1<f64>,
        prob: f64,
        reward: f64,
    ) -> Result<(), CacheError> {
        match self.feature_len {
            Some(expected) if expected != feature.len() => {
                return Err(CacheError::FeatureShape {
                    expected,
                    found: feature.len(),
                })
            }
            Some(_) => {}
            None => self.feature_len = Some(feature.len()),
        }
        self.transitions.push(Transition::new(feature, prob, reward));
        Ok(())
    }

    /// Replaces every reward `r` with `weight * r + (1 - weight) * final_reward`.
    pub fn revise_rewards(&mut self, final_reward: f64, weight: f64) {
        self.transitions = self
            .transitions
            .drain(..)
            .map(|t| {
                let reward = weight * t.reward() + (1.0 - weight) * final_reward;
                t.with_reward(reward)
            })
            .collect();
    }

    /// Moves every staged transition into `memory`, in staging order.
    pub fn flush_to(&mut self, memory: &mut ReplayMemory) -> usize {
        let flushed = self.transitions.len();
        for transition in self.transitions.drain(..) {
            memory.push(transition);
        }
        flushed
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn feature_len(&self) -> Option<usize> {
        self.feature_len
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }
}
