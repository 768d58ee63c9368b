use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use kdam::{tqdm, BarExt};
use log::info;
use ndarray::Array1;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use plotters::style::BLUE;
use rand::{rngs::StdRng, SeedableRng};
use structopt::StructOpt;

use suspicion_trainer::utils::{moving_average, plot_moving_average};
use suspicion_trainer::{Checkpoint, StepOutcome, Trainer, TrainerConfig};

/// Drive the suspicion predictor trainer through synthetic episodes
#[derive(StructOpt, Debug)]
#[structopt(name = "suspicion_trainer")]
struct Cli {
    /// JSON file with the flat `training.*` / `model.*` keys
    #[structopt(long = "config", short = "c", parse(from_os_str))]
    config: PathBuf,

    /// Maximum number of episodes to run
    #[structopt(long = "episodes", short = "n", default_value = "1000")]
    episodes: u64,

    /// Observations staged per episode before the outcome is known
    #[structopt(long = "episode_length", default_value = "8")]
    episode_length: usize,

    /// Write a loss curve next to the checkpoints
    #[structopt(long = "plot")]
    plot: bool,

    /// Moving average window used on the loss curve
    #[structopt(long = "moving_average_window", default_value = "20")]
    moving_average_window: usize,
}

/// Hidden rule of the synthetic task: an episode is suspicious when the mean
/// of its features is above one half.
fn outcome(features: &[Array1<f64>]) -> f64 {
    let mean = features.iter().map(|f| f.mean().unwrap_or(0.0)).sum::<f64>()
        / features.len().max(1) as f64;
    if mean > 0.5 {
        1.0
    } else {
        0.0
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli: Cli = Cli::from_args();

    let config = TrainerConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let input_size = config
        .input_size
        .context("model.input_size is required by the driver")?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut trainer = Trainer::new(config)?;

    let mut losses: Vec<f64> = vec![];
    let mut pb = tqdm!(total = cli.episodes as usize);
    pb.set_description("episodes".to_string());
    let now = Instant::now();

    for _episode in 0..cli.episodes {
        let mut seen: Vec<Array1<f64>> = Vec::with_capacity(cli.episode_length);
        for _ in 0..cli.episode_length {
            let feature = Array1::random_using(input_size, Uniform::new(0.0, 1.0), &mut rng);
            let prob = trainer.predict(&feature)?;
            trainer.stage(feature.clone(), prob, prob)?;
            seen.push(feature);
        }
        trainer.revise_rewards(outcome(&seen));
        trainer.flush_to_memory();

        if let StepOutcome::Executed(report) = trainer.optimize_step()? {
            if let Some(Checkpoint::Saved(path)) = &report.checkpoint {
                info!("Checkpoint at epoch {}: {}", report.epoch, path.display());
            }
            pb.set_postfix(format!("loss={:.5}", report.loss));
            losses.push(report.loss);
        }
        pb.update(1);

        if trainer.is_end() {
            break;
        }
    }
    eprintln!();
    info!(
        "Trained {} epochs in {:.2?}, exploration rate {:.3}",
        trainer.epoch(),
        now.elapsed(),
        trainer.exploration_rate()
    );

    if cli.plot && !losses.is_empty() {
        let folder = &trainer.config().output_path;
        std::fs::create_dir_all(folder)?;
        let path = folder.join("loss.png");
        let ma_loss = moving_average(cli.moving_average_window, &losses);
        plot_moving_average(&[ma_loss], &[&BLUE], &["smooth L1 loss"], "Training Loss", &path)
            .map_err(|e| anyhow!(e.to_string()))?;
        info!("Loss curve written to {}", path.display());
    }
    Ok(())
}
