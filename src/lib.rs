pub mod cache;
pub mod config;
pub mod error;
pub mod exploration;
pub mod memory;
pub mod network;
pub mod params;
pub mod trainer;
pub mod transition;
pub mod utils;

pub use cache::PendingCache;
pub use config::TrainerConfig;
pub use error::TrainerError;
pub use memory::ReplayMemory;
pub use trainer::{Checkpoint, StepOutcome, StepReport, Trainer};
pub use transition::Transition;
