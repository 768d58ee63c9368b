use std::path::PathBuf;

use log::{debug, error, info, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{rngs::StdRng, SeedableRng};

use crate::cache::PendingCache;
use crate::config::TrainerConfig;
use crate::error::{ConfigError, NetworkError, SnapshotError, TrainerError};
use crate::exploration::ExplorationSchedule;
use crate::memory::ReplayMemory;
use crate::network::loss::{smooth_l1, smooth_l1_prime};
use crate::network::optimizer::AdamW;
use crate::network::{Network, PredictionNetwork};
use crate::params::{clip_grad_value, load_snapshot, save_snapshot, soft_update};
use crate::transition::Transition;

pub const GRAD_CLIP_VALUE: f64 = 100.0;
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

/// NaN becomes [`NEUTRAL_PROBABILITY`], everything else is clamped to [0, 1].
pub fn sanitize_probability(prob: f64) -> f64 {
    if prob.is_nan() {
        warn!("{} is nan", prob);
        return NEUTRAL_PROBABILITY;
    }
    prob.clamp(0.0, 1.0)
}

#[derive(Debug)]
pub enum Checkpoint {
    Saved(PathBuf),
    Failed(SnapshotError),
}

#[derive(Debug)]
pub struct StepReport {
    pub epoch: u64,
    pub loss: f64,
    pub checkpoint: Option<Checkpoint>,
}

#[derive(Debug)]
pub enum StepOutcome {
    Skipped { available: usize, required: usize },
    Executed(StepReport),
}

pub struct Trainer<N: PredictionNetwork = Network> {
    config: TrainerConfig,
    policy_net: N,
    target_net: N,
    optimizer: AdamW,
    memory: ReplayMemory,
    cache: PendingCache,
    exploration: ExplorationSchedule,
    epoch: u64,
}

impl Trainer<Network> {
    /// Builds the default sigmoid-headed network described by `model.*`.
    pub fn new(config: TrainerConfig) -> Result<Self, TrainerError> {
        config.validate()?;
        let input_size = config.input_size.ok_or(ConfigError::Invalid {
            key: "model.input_size",
            reason: "required to build the prediction network".to_string(),
        })?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let network = Network::suspicion_predictor(
            input_size,
            &config.hidden_sizes,
            config.hidden_activation,
            &mut rng,
        );
        Self::build(config, network)
    }
}

impl<N: PredictionNetwork> Trainer<N> {
    pub fn with_network(config: TrainerConfig, network: N) -> Result<Self, TrainerError> {
        config.validate()?;
        Self::build(config, network)
    }

    fn build(config: TrainerConfig, mut policy_net: N) -> Result<Self, TrainerError> {
        debug!("Placing networks on {}", config.device);
        if config.load_model {
            if let Some(path) = &config.load_path {
                info!("Loading existing model from {}", path.display());
                let params = load_snapshot(path)?;
                policy_net
                    .load_parameters(&params)
                    .map_err(SnapshotError::from)?;
            }
        }
        let mut target_net = policy_net.clone();
        target_net.load_parameters(&policy_net.parameters())?;

        Ok(Self {
            optimizer: AdamW::new(config.learning_rate).amsgrad(true),
            memory: ReplayMemory::new(config.memory_size, config.seed),
            cache: PendingCache::with_feature_len(policy_net.input_size()),
            exploration: ExplorationSchedule::new(
                config.eps_start,
                config.eps_end,
                config.eps_decay,
            ),
            epoch: 0,
            policy_net,
            target_net,
            config,
        })
    }

    /// Probability from the policy network, guaranteed finite and in [0, 1].
    pub fn predict(&self, feature: &Array1<f64>) -> Result<f64, TrainerError> {
        let input = feature.view().insert_axis(Axis(0)).to_owned();
        let output = self.policy_net.predict(&input)?;
        let prob = output.iter().next().copied().unwrap_or(f64::NAN);
        Ok(sanitize_probability(prob))
    }

    pub fn stage(
        &mut self,
        feature: Array1<f64>,
        prob: f64,
        reward: f64,
    ) -> Result<(), TrainerError> {
        self.cache.stage(feature, prob, reward)?;
        Ok(())
    }

    /// Blends every staged reward towards `final_reward` using `training.reward_weight`.
    pub fn revise_rewards(&mut self, final_reward: f64) {
        self.cache
            .revise_rewards(final_reward, self.config.reward_weight);
    }

    /// Commits the staged transitions to the replay memory and empties the cache.
    pub fn flush_to_memory(&mut self) -> usize {
        let flushed = self.cache.flush_to(&mut self.memory);
        debug!("Flushed {} transitions, memory holds {}", flushed, self.memory.len());
        flushed
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn optimize_step(&mut self) -> Result<StepOutcome, TrainerError> {
        let required = self.config.batch_size;
        let available = self.memory.len();
        if available < required {
            info!("Not enough sample to optimize: {}/{}", available, required);
            return Ok(StepOutcome::Skipped {
                available,
                required,
            });
        }

        let transitions = self.memory.sample(required)?;
        let (feature_batch, reward_batch) = collate(&transitions)?;
        debug!("Optimizing model, epoch {}", self.epoch + 1);

        let prob_batch = self.policy_net.forward(&feature_batch)?;
        let target_prob_batch = self.target_net.predict(&feature_batch)?;
        let expected_prob = target_prob_batch * self.config.gamma + &reward_batch;
        let loss = smooth_l1(&expected_prob, &prob_batch).unwrap_or(0.0);

        let mut grads = self
            .policy_net
            .backward(smooth_l1_prime(&expected_prob, &prob_batch))?;
        clip_grad_value(&mut grads, GRAD_CLIP_VALUE);

        let mut policy_params = self.policy_net.parameters();
        self.optimizer.step(&mut policy_params, &grads)?;
        self.policy_net.load_parameters(&policy_params)?;

        let target_params = soft_update(
            &policy_params,
            &self.target_net.parameters(),
            self.config.tau,
        )?;
        self.target_net.load_parameters(&target_params)?;
        self.epoch += 1;

        let checkpoint = if self.epoch % self.config.save_interval == 0 {
            Some(match self.save_model() {
                Ok(path) => Checkpoint::Saved(path),
                Err(err) => {
                    error!("Failed to save model at epoch {}: {}", self.epoch, err);
                    Checkpoint::Failed(err)
                }
            })
        } else {
            None
        };

        Ok(StepOutcome::Executed(StepReport {
            epoch: self.epoch,
            loss,
            checkpoint,
        }))
    }

    /// Writes the policy parameters to `{output_path}/epoch_{epoch}.json`.
    pub fn save_model(&self) -> Result<PathBuf, SnapshotError> {
        let folder = &self.config.output_path;
        std::fs::create_dir_all(folder).map_err(|source| SnapshotError::Io {
            path: folder.clone(),
            source,
        })?;
        let output_file = folder.join(format!("epoch_{}.json", self.epoch));
        info!("Saving model to {}", output_file.display());
        save_snapshot(&self.policy_net.parameters(), &output_file)?;
        Ok(output_file)
    }

    pub fn is_end(&self) -> bool {
        self.epoch > self.config.epochs
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration.rate(self.epoch)
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn memory(&self) -> &ReplayMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ReplayMemory {
        &mut self.memory
    }

    pub fn cache(&self) -> &PendingCache {
        &self.cache
    }

    pub fn policy_net(&self) -> &N {
        &self.policy_net
    }

    pub fn target_net(&self) -> &N {
        &self.target_net
    }
}

fn collate(transitions: &[Transition]) -> Result<(Array2<f64>, Array2<f64>), NetworkError> {
    let features: Vec<ArrayView1<f64>> = transitions.iter().map(|t| t.feature().view()).collect();
    let feature_batch = ndarray::stack(Axis(0), &features)?;
    let rewards: Vec<f64> = transitions.iter().map(|t| t.reward()).collect();
    let reward_batch = Array2::from_shape_vec((rewards.len(), 1), rewards)?;
    Ok((feature_batch, reward_batch))
}
