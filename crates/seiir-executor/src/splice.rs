//! History/forecast splicing for one location.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use seiir_artifact::{Store, WriteOutcome};
use seiir_config::{
  DRAW_COLUMN, FitSpecification, ForecastSpecification, InfectionColumns, LocationId,
  RegressionSpecification, Specification,
};
use seiir_paths::{ForecastPaths, InfectionPaths};
use seiir_series::{TimeSeries, splice};
use tracing::{debug, info, instrument, warn};

use crate::error::ExecutorError;
use crate::stage::fs_store;

/// Everything needed to splice a location: the infection history the fit
/// consumed and the forecast's component draws.
#[derive(Clone)]
pub struct SpliceInputs {
  infection: InfectionPaths,
  forecast: Arc<dyn Store>,
  columns: InfectionColumns,
  n_draws: u32,
}

impl SpliceInputs {
  pub fn new(
    infection: Arc<dyn Store>,
    forecast: Arc<dyn Store>,
    columns: InfectionColumns,
    n_draws: u32,
  ) -> Self {
    Self {
      infection: InfectionPaths::new(infection),
      forecast,
      columns,
      n_draws,
    }
  }

  /// Follow the specification references of a regression and a forecast
  /// version: regression → ODE fit → infection history. Column names come
  /// from the fit, which owns the infection inputs.
  pub fn from_versions(
    regression_version: &Path,
    forecast_version: &Path,
  ) -> Result<Self, ExecutorError> {
    let regression = RegressionSpecification::from_version_root(regression_version)?;
    let fit = FitSpecification::from_version_root(&regression.data.ode_fit_version)?;
    ForecastSpecification::from_version_root(forecast_version)?;

    Ok(Self::new(
      fs_store(&fit.data.infection_version),
      fs_store(forecast_version),
      fit.columns,
      regression.parameters.n_draws,
    ))
  }

  pub fn n_draws(&self) -> u32 {
    self.n_draws
  }

  async fn read_series(
    &self,
    store: &dyn Store,
    key: &str,
    location_id: LocationId,
    draw_id: u32,
  ) -> Result<TimeSeries, ExecutorError> {
    let data = store.read(key).await.map_err(|e| match e {
      seiir_artifact::Error::NotFound(key) => ExecutorError::MissingInput {
        location_id,
        draw_id,
        key,
      },
      e => ExecutorError::LocationArtifact {
        location_id,
        source: e,
      },
    })?;
    TimeSeries::from_csv(&data, &self.columns.date)
      .map_err(ExecutorError::series(location_id, draw_id))
  }

  /// Splice every draw of a location and write the combined table once.
  ///
  /// Each draw's rows are tagged with a leading `draw` column. An existing
  /// output file is kept and reported with a warning.
  #[instrument(skip(self))]
  pub async fn splice_location(&self, location_id: LocationId) -> Result<WriteOutcome, ExecutorError> {
    let folder = self.infection.resolve_location_folder(location_id).await?;

    let mut files: BTreeMap<_, _> = self
      .infection
      .draw_files(&folder)
      .await?
      .into_iter()
      .map(|file| (file.draw_id, file))
      .collect();

    let mut draws = Vec::with_capacity(self.n_draws as usize);
    for draw_id in 0..self.n_draws {
      let file = files
        .remove(&draw_id)
        .ok_or_else(|| ExecutorError::MissingInput {
          location_id,
          draw_id,
          key: format!("{folder}/draw{draw_id:04}_*"),
        })?;
      let historical = self
        .read_series(
          self.infection.store().as_ref(),
          &InfectionPaths::draw_file(&folder, &file.file_name),
          location_id,
          draw_id,
        )
        .await?;
      let forecast = self
        .read_series(
          self.forecast.as_ref(),
          &ForecastPaths::component_draw_file(location_id, draw_id),
          location_id,
          draw_id,
        )
        .await?;

      let spliced = splice(&historical, &forecast)
        .map_err(ExecutorError::series(location_id, draw_id))?
        .with_leading_column(DRAW_COLUMN, &draw_id.to_string());
      debug!(draw_id, rows = spliced.len(), "spliced draw");
      draws.push(spliced);
    }

    let key = ForecastPaths::spliced_file(location_id);
    let combined = TimeSeries::concat(&draws).ok_or_else(|| ExecutorError::MissingInput {
      location_id,
      draw_id: 0,
      key: ForecastPaths::component_draw_file(location_id, 0),
    })?;
    let data = combined
      .to_csv()
      .map_err(ExecutorError::series(location_id, 0))?;

    let outcome = self.forecast.write_if_absent(&key, Bytes::from(data)).await?;
    match outcome {
      WriteOutcome::Written => {
        info!(location_id, rows = combined.len(), key = %key, "wrote spliced output")
      }
      WriteOutcome::AlreadyExists => warn!(key = %key, "output already exists"),
    }
    Ok(outcome)
  }
}
