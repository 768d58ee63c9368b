use std::collections::VecDeque;

use rand::{rngs::StdRng, seq::index, SeedableRng};

use crate::error::MemoryError;
use crate::transition::Transition;

/// Fixed capacity ring of transitions; the oldest one is evicted on overflow.
#[derive(Debug, Clone)]
pub struct ReplayMemory {
    transitions: VecDeque<Transition>,
    capacity: usize,
    rng: StdRng,
}

impl ReplayMemory {
    pub fn new(capacity: usize, seed: u64) -> Self {
        Self {
            transitions: VecDeque::with_capacity(capacity),
            capacity,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn push(&mut self, transition: Transition) {
        self.transitions.push_back(transition);
        if self.transitions.len() > self.capacity {
            self.transitions.pop_front();
        }
    }

    /// Draws `size` distinct transitions uniformly at random.
    pub fn sample(&mut self, size: usize) -> Result<Vec<Transition>, MemoryError> {
        if self.transitions.len() < size {
            return Err(MemoryError::InsufficientData {
                requested: size,
                available: self.transitions.len(),
            });
        }
        let indexes = index::sample(&mut self.rng, self.transitions.len(), size);
        Ok(indexes
            .into_iter()
            .map(|i| self.transitions[i].clone())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn transition(reward: f64) -> Transition {
        Transition::new(arr1(&[reward, 1.0 - reward]), 0.5, reward)
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut memory = ReplayMemory::new(3, 42);
        for i in 0..10 {
            memory.push(transition(i as f64));
            assert!(memory.len() <= 3);
        }
        assert_eq!(memory.len(), 3);
        assert_eq!(memory.capacity(), 3);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut memory = ReplayMemory::new(4, 7);
        for i in 0..5 {
            memory.push(transition(i as f64));
        }
        let rewards: Vec<f64> = memory.iter().map(|t| t.reward()).collect();
        assert_eq!(rewards, vec![1.0, 2.0, 3.0, 4.0]);

        for _ in 0..50 {
            let batch = memory.sample(4).unwrap();
            assert!(batch.iter().all(|t| t.reward() != 0.0));
        }
    }

    #[test]
    fn sample_returns_distinct_transitions() {
        let mut memory = ReplayMemory::new(10, 3);
        for i in 0..10 {
            memory.push(transition(i as f64));
        }
        for _ in 0..20 {
            let mut rewards: Vec<f64> = memory.sample(6).unwrap().iter().map(|t| t.reward()).collect();
            rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
            rewards.dedup();
            assert_eq!(rewards.len(), 6);
        }
    }

    #[test]
    fn oversized_sample_is_rejected_without_side_effects() {
        let mut memory = ReplayMemory::new(5, 11);
        memory.push(transition(0.0));
        memory.push(transition(1.0));
        let mut untouched = memory.clone();

        assert_eq!(
            memory.sample(3),
            Err(MemoryError::InsufficientData {
                requested: 3,
                available: 2
            })
        );
        assert_eq!(memory.len(), 2);
        // the rng did not advance either
        assert_eq!(memory.sample(2).unwrap(), untouched.sample(2).unwrap());
    }
}
