use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use seiir_artifact::{FsStore, Store};
use seiir_config::{
  ForecastSpecification, HoldoutSpecification, InfectionColumns, LocationId,
  RegressionSpecification, Specification,
};
use seiir_engine::ExecutionReport;
use seiir_executor::{
  ForecastStage, HoldoutSplitter, HoldoutStage, RegressionStage, SpliceInputs, ensure_success,
};

/// Seiir - staging, holdout splitting and splicing for the SEIIR pipeline
#[derive(Parser)]
#[command(name = "seiir")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Log output format
  #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
  log_format: LogFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
  Text,
  Json,
}

#[derive(Subcommand)]
enum Commands {
  /// Split one location's draws into train and validation partitions
  Split {
    /// Infectionator output root
    #[arg(long)]
    input_dir: PathBuf,

    /// Holdout output root
    #[arg(long)]
    output_dir: PathBuf,

    /// Directory of per-draw parameter files
    #[arg(long)]
    param_dir: PathBuf,

    #[arg(long)]
    location_id: LocationId,

    /// Trailing days withheld from training
    #[arg(long)]
    time_holdout: u32,
  },

  /// Splice one location's history with its forecast
  Splice {
    #[arg(long)]
    location_id: LocationId,

    /// Output root of the regression run
    #[arg(long)]
    regression_version: PathBuf,

    /// Output root of the forecast run
    #[arg(long)]
    forecast_version: PathBuf,
  },

  /// Run a holdout split for every location and draw
  Holdout {
    /// Path to the holdout specification (YAML or JSON)
    specification: PathBuf,
  },

  /// Run the beta regression stage
  Regress {
    /// Path to the regression specification (YAML or JSON)
    specification: PathBuf,
  },

  /// Run the beta forecast stage, splicing each location when its draws finish
  Forecast {
    /// Path to the forecast specification (YAML or JSON)
    specification: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.log_format)?;

  let rt = tokio::runtime::Runtime::new()?;
  let result = rt.block_on(run(cli.command));
  if let Err(ref e) = result {
    tracing::error!(error = format!("{e:#}"), "command failed");
  }
  result
}

fn init_logging(format: LogFormat) -> Result<()> {
  use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let fmt_layer = match format {
    LogFormat::Json => fmt::layer()
      .json()
      .with_writer(std::io::stderr)
      .with_target(true)
      .boxed(),
    LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt_layer)
    .try_init()
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

async fn run(command: Commands) -> Result<()> {
  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling running tasks");
      on_interrupt.cancel();
    }
  });

  match command {
    Commands::Split {
      input_dir,
      output_dir,
      param_dir,
      location_id,
      time_holdout,
    } => {
      let splitter = HoldoutSplitter::new(
        fs_store(&input_dir),
        fs_store(&output_dir),
        fs_store(&param_dir),
        InfectionColumns::default(),
        time_holdout,
      );
      let report = splitter
        .split_location(location_id)
        .await
        .with_context(|| format!("failed to split location {location_id}"))?;
      info!(
        location_id,
        written = ?report.written,
        skipped = ?report.skipped,
        "split complete"
      );
    }
    Commands::Splice {
      location_id,
      regression_version,
      forecast_version,
    } => {
      let inputs = SpliceInputs::from_versions(&regression_version, &forecast_version)
        .context("failed to resolve splice inputs")?;
      inputs
        .splice_location(location_id)
        .await
        .with_context(|| format!("failed to splice location {location_id}"))?;
    }
    Commands::Holdout { specification } => {
      let spec: HoldoutSpecification = load(&specification)?;
      let report = HoldoutStage::from_specification(spec).run(cancel).await?;
      finish(HoldoutStage::WORKFLOW, report)?;
    }
    Commands::Regress { specification } => {
      let spec: RegressionSpecification = load(&specification)?;
      let report = RegressionStage::from_specification(spec)?.run(cancel).await?;
      finish(RegressionStage::WORKFLOW, report)?;
    }
    Commands::Forecast { specification } => {
      let spec: ForecastSpecification = load(&specification)?;
      let report = ForecastStage::from_specification(spec)?.run(cancel).await?;
      finish(ForecastStage::WORKFLOW, report)?;
    }
  }

  Ok(())
}

fn fs_store(root: &Path) -> Arc<dyn Store> {
  Arc::new(FsStore::new(root))
}

fn load<S: Specification>(path: &Path) -> Result<S> {
  S::from_path(path)
    .with_context(|| format!("failed to load specification: {}", path.display()))
}

fn finish(workflow: &str, report: ExecutionReport) -> Result<()> {
  let report = ensure_success(workflow, report)?;
  info!(
    workflow,
    execution_id = %report.execution_id,
    tasks = report.tasks.len(),
    "stage completed"
  );
  Ok(())
}
