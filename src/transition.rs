use ndarray::Array1;

/// One scored observation: the feature fed to the policy network, the
/// probability it produced and the reward assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    feature: Array1<f64>,
    prob: f64,
    reward: f64,
}

impl Transition {
    pub fn new(feature: Array1<f64>, prob: f64, reward: f64) -> Self {
        Self {
            feature,
            prob,
            reward,
        }
    }

    pub fn feature(&self) -> &Array1<f64> {
        &self.feature
    }

    pub fn prob(&self) -> f64 {
        self.prob
    }

    pub fn reward(&self) -> f64 {
        self.reward
    }

    /// Same feature and probability, new reward.
    pub fn with_reward(self, reward: f64) -> Self {
        Self { reward, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn with_reward_keeps_feature_and_prob() {
        let t = Transition::new(arr1(&[0.1, 0.2]), 0.7, 0.3);
        let revised = t.clone().with_reward(0.9);
        assert_eq!(revised.feature(), t.feature());
        assert_eq!(revised.prob(), 0.7);
        assert_eq!(revised.reward(), 0.9);
        assert_eq!(t.reward(), 0.3);
    }
}
