//! heat-forecast - block temperature forecasting
//!
//! Trains the linear baseline on windowed sequence dumps and evaluates it
//! with a free-running recurrent rollout.
//!
//! # Usage
//!
//! ```bash
//! # Train and write a checkpoint
//! heat-forecast train --train train.json --val val.json --out model.json
//!
//! # Roll the checkpoint out over a test dump and report block 2
//! heat-forecast rollout --data test.json --checkpoint model.json --block 2 --out block2.json
//! ```
//!
//! # Environment Variables
//!
//! - `HEAT_FORECAST_CONFIG`: Path to the TOML config (default: ./forecast.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use heat_forecast::config::ForecastConfig;
use heat_forecast::model::{LinearWindowModel, ModelCheckpoint};
use heat_forecast::rollout::{block_rollout, extract_block, rollout, SequenceSet};
use heat_forecast::training::{Adam, DataLoader, MseLoss, TrainError, Trainer};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "heat-forecast")]
#[command(about = "Recurrent rollout evaluation and training for block temperature forecasting")]
#[command(version)]
struct CliArgs {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Train the linear baseline and write a checkpoint
    Train {
        /// Training sequence dump (JSON)
        #[arg(long)]
        train: PathBuf,
        /// Validation sequence dump (JSON)
        #[arg(long)]
        val: PathBuf,
        /// Checkpoint output path
        #[arg(long)]
        out: PathBuf,
        /// Config file (overrides HEAT_FORECAST_CONFIG and ./forecast.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a recurrent rollout with a trained checkpoint
    Rollout {
        /// Sequence dump to roll out over (JSON)
        #[arg(long)]
        data: PathBuf,
        /// Checkpoint written by `train`
        #[arg(long)]
        checkpoint: PathBuf,
        /// 1-based block to report (default: rollout.block_number)
        #[arg(long)]
        block: Option<usize>,
        /// Report label, e.g. Validation or Test (default: rollout.mode)
        #[arg(long)]
        mode: Option<String>,
        /// Write the block series (or full result with --all) as JSON
        #[arg(long)]
        out: Option<PathBuf>,
        /// Report every block and write the full result sequence
        #[arg(long)]
        all: bool,
        /// Config file (overrides HEAT_FORECAST_CONFIG and ./forecast.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<ForecastConfig> {
    match path {
        Some(p) => ForecastConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(ForecastConfig::load()),
    }
}

fn load_sequences(path: &Path) -> Result<SequenceSet> {
    SequenceSet::load_json(path).with_context(|| format!("Failed to load sequence dump {}", path.display()))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote rollout output");
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn run_train(train_path: &Path, val_path: &Path, out: &Path, config: &ForecastConfig) -> Result<()> {
    let train_set = load_sequences(train_path)?;
    let val_set = load_sequences(val_path)?;

    let (first, _) = train_set
        .pairs()
        .first()
        .context("Training dump contains no windows")?;
    let t = &config.training;
    let mut model = LinearWindowModel::new(first.len(), first.width(), t.seed)?;
    info!(
        window_len = model.window_len(),
        width = model.width(),
        blocks = model.num_blocks(),
        params = model.num_params(),
        "Initialized linear model"
    );

    let mut optimizer = Adam::new(model.num_params(), t.learning_rate);
    let mut train_loader = DataLoader::new(&train_set, t.batch_size)?;
    if t.shuffle {
        train_loader = train_loader.shuffled(t.seed);
    }
    let mut val_loader = DataLoader::new(&val_set, t.batch_size)?;

    let mut scheduler = config.scheduler();
    let mut early_stopping = config.early_stopping();
    let mut trainer = Trainer::new(config.train_options());
    if let Some(s) = scheduler.as_mut() {
        trainer = trainer.with_scheduler(s);
    }
    if let Some(es) = early_stopping.as_mut() {
        trainer = trainer.with_trial(es);
    }

    let history = match trainer.fit(
        &mut model,
        &MseLoss,
        &mut optimizer,
        &mut train_loader,
        &mut val_loader,
    ) {
        Ok(history) => history,
        Err(TrainError::Pruned { epoch, history }) => {
            warn!(epoch, "Training stopped early: validation loss stopped improving");
            history
        }
        Err(e) => return Err(e).context("Training failed"),
    };

    ModelCheckpoint::new(model, &history)
        .save_to_disk(out)
        .with_context(|| format!("Failed to save checkpoint {}", out.display()))?;
    Ok(())
}

fn run_rollout(
    data_path: &Path,
    checkpoint_path: &Path,
    block: Option<usize>,
    mode: Option<String>,
    out: Option<&Path>,
    all: bool,
    config: &ForecastConfig,
) -> Result<()> {
    let data = load_sequences(data_path)?;
    let checkpoint = ModelCheckpoint::load_from_disk(checkpoint_path)
        .with_context(|| format!("Failed to load checkpoint {}", checkpoint_path.display()))?;
    if let Some((first, _)) = data.pairs().first() {
        checkpoint.check_compatible(first.len(), first.width())?;
    }

    let mode = mode.unwrap_or_else(|| config.rollout.mode.clone());
    let unscale = config.unscale;
    info!(
        mode = %mode,
        steps = data.pairs().len(),
        epochs_trained = checkpoint.metadata.epochs_trained,
        "Running recurrent rollout"
    );

    if all {
        let result = rollout(&checkpoint.model, &data, &unscale)?;
        for b in 1..=result.num_blocks() {
            let series = extract_block(&result, b)?;
            info!(mode = %mode, block = b, mae = series.mae(), rmse = series.rmse(), "Block error");
        }
        if let Some(path) = out {
            write_json(path, &result)?;
        }
    } else {
        let block = block.unwrap_or(config.rollout.block_number);
        let series = block_rollout(&checkpoint.model, &data, &unscale, block)?;
        info!(
            mode = %mode,
            block,
            steps = series.len(),
            mae = series.mae(),
            rmse = series.rmse(),
            "Block error"
        );
        if let Some(path) = out {
            write_json(path, &series)?;
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    match args.command {
        SubCommand::Train {
            train,
            val,
            out,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            run_train(&train, &val, &out, &config)
        }
        SubCommand::Rollout {
            data,
            checkpoint,
            block,
            mode,
            out,
            all,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            run_rollout(&data, &checkpoint, block, mode, out.as_deref(), all, &config)
        }
    }
}
